mod timers;

pub use timers::{TimerKind, TimerSet};

use crate::api::{ChatClient, SuggestClient};
use crate::clock::{WidgetClock, DATE_TIME_PROMPT};
use crate::config::Config;
use crate::scroll::{AutoScrollController, ScrollEffect, ViewportMetrics, GUARD_RELEASE, SCROLL_DEBOUNCE};
use crate::session::{
    DeepLinkBootstrapper, SessionController, SessionParameters, SessionUpdate, StreamStatus,
    StreamUpdate, SuggestionFetcher, SuggestionOutcome, UserTurn,
};
use crate::store::PrefsStore;
use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Commands from the presentation layer and other external inputs.
#[derive(Debug, Clone)]
pub enum SessionAction {
    Submit(UserTurn),
    Stop,
    EditTurn { index: usize, content: String },
    SetModel(String),
    SetGroup(String),
    /// A deep-link query that became available after startup.
    DeepLinkQuery(String),
    ViewportScrolled(ViewportMetrics),
    LocaleChanged(String),
    TimezoneChanged(String),
    /// The clock widget was activated: submit its canned question.
    SubmitClockPrompt,
    NewSession,
    Shutdown,
}

/// Cloneable handle for feeding actions into a running session loop.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    action_tx: mpsc::UnboundedSender<SessionAction>,
}

impl SessionHandle {
    pub fn send(&self, action: SessionAction) {
        let _ = self.action_tx.send(action);
    }

    pub fn submit_text(&self, content: impl Into<String>) {
        self.send(SessionAction::Submit(UserTurn::text(content)));
    }
}

/// The session event loop: one cooperative control thread multiplexing the
/// three event sources (stream events, viewport/timer events, user actions)
/// over the shared session state. All mutation happens here, in queue order.
pub struct App {
    controller: SessionController,
    scroll: AutoScrollController,
    clock: WidgetClock,
    bootstrap: DeepLinkBootstrapper,
    timers: TimerSet,
    last_status: StreamStatus,
    last_jump_affordance: bool,
    action_rx: mpsc::UnboundedReceiver<SessionAction>,
    stream_rx: mpsc::UnboundedReceiver<StreamUpdate>,
    suggest_rx: mpsc::UnboundedReceiver<SuggestionOutcome>,
    update_tx: mpsc::UnboundedSender<SessionUpdate>,
    should_quit: bool,
}

impl App {
    /// Wires the controller, clients and preference store together. Returns
    /// the app plus the handle and update stream for the presentation layer.
    /// `initial_query` and `fallback_query` mirror the two deep-link aliases;
    /// the first non-empty one seeds the bootstrapper.
    pub fn new(
        config: Config,
        initial_query: Option<String>,
        fallback_query: Option<String>,
    ) -> Result<(
        Self,
        SessionHandle,
        mpsc::UnboundedReceiver<SessionUpdate>,
    )> {
        let store = PrefsStore::open(&config.state_dir);
        let prefs = store.load();
        let user_id = store.ensure_user_id()?;
        let params = SessionParameters {
            model: prefs.model.unwrap_or_else(|| config.model.clone()),
            group: config.group.clone(),
            user_id,
            timezone: config.timezone.clone(),
        };

        Ok(Self::assemble(
            ChatClient::new(&config),
            SuggestClient::new(&config),
            store,
            params,
            config.locale.clone(),
            config.timezone.clone(),
            DeepLinkBootstrapper::new(initial_query, fallback_query),
        ))
    }

    #[cfg(test)]
    pub(crate) fn new_mock(
        chat_client: ChatClient,
        suggest_client: SuggestClient,
        state_dir: &std::path::Path,
        initial_query: Option<String>,
    ) -> (
        Self,
        SessionHandle,
        mpsc::UnboundedReceiver<SessionUpdate>,
    ) {
        Self::assemble(
            chat_client,
            suggest_client,
            PrefsStore::open(state_dir),
            crate::session::tests::test_parameters(),
            "en-US".to_string(),
            "UTC".to_string(),
            DeepLinkBootstrapper::new(initial_query, None),
        )
    }

    fn assemble(
        chat_client: ChatClient,
        suggest_client: SuggestClient,
        store: PrefsStore,
        params: SessionParameters,
        locale: String,
        timezone: String,
        bootstrap: DeepLinkBootstrapper,
    ) -> (
        Self,
        SessionHandle,
        mpsc::UnboundedReceiver<SessionUpdate>,
    ) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (stream_tx, stream_rx) = mpsc::unbounded_channel();
        let (suggest_tx, suggest_rx) = mpsc::unbounded_channel();

        let fetcher = SuggestionFetcher::new(suggest_client, suggest_tx);
        let controller = SessionController::new(
            chat_client,
            store,
            params,
            fetcher,
            stream_tx,
            update_tx.clone(),
        );

        let app = Self {
            controller,
            scroll: AutoScrollController::new(),
            clock: WidgetClock::new(locale, timezone),
            bootstrap,
            timers: TimerSet::new(),
            last_status: StreamStatus::Idle,
            last_jump_affordance: false,
            action_rx,
            stream_rx,
            suggest_rx,
            update_tx,
            should_quit: false,
        };
        let handle = SessionHandle { action_tx };
        (app, handle, update_rx)
    }

    /// Runs until shutdown. Mount-time work (first clock reading, deep-link
    /// check) happens here rather than in `new` so nothing fires before the
    /// loop is live to observe it.
    pub async fn run(mut self) -> Result<()> {
        self.mount();

        while !self.should_quit {
            tokio::select! {
                action = self.action_rx.recv() => match action {
                    Some(action) => self.handle_action(action),
                    None => break,
                },
                update = self.stream_rx.recv() => {
                    if let Some(update) = update {
                        self.handle_stream_update(update);
                    }
                }
                outcome = self.suggest_rx.recv() => {
                    if let Some(outcome) = outcome {
                        self.handle_suggestion_outcome(outcome);
                    }
                }
                _ = sleep_until_next(&self.timers) => {
                    self.handle_due_timers(Instant::now());
                }
            }
        }

        // Teardown: no timer callback may act on a dead session.
        self.timers.clear_all();
        Ok(())
    }

    pub fn transcript(&self) -> &[crate::types::Turn] {
        self.controller.transcript()
    }

    pub fn status(&self) -> StreamStatus {
        self.controller.status()
    }

    pub fn suggestions(&self) -> &[String] {
        self.controller.suggestions()
    }

    pub fn show_jump_to_bottom(&self) -> bool {
        self.scroll.show_jump_to_bottom()
    }

    fn mount(&mut self) {
        let first_tick = self.clock.mount();
        self.timers.set(TimerKind::ClockTick, Instant::now() + first_tick);
        if let Some(now) = self.clock.now() {
            self.emit(SessionUpdate::ClockTick(now));
        }
        self.check_bootstrap();
    }

    pub(crate) fn handle_action(&mut self, action: SessionAction) {
        match action {
            SessionAction::Submit(turn) => {
                self.controller.submit(turn);
                self.sync_status();
            }
            SessionAction::Stop => {
                self.controller.stop();
                self.sync_status();
            }
            SessionAction::EditTurn { index, content } => {
                self.controller.edit_turn(index, content);
                self.sync_status();
            }
            SessionAction::SetModel(model) => self.controller.set_model(model),
            SessionAction::SetGroup(group) => {
                if !self.controller.set_group(&group) {
                    self.emit(SessionUpdate::Notice(format!(
                        "Unknown search group '{group}'"
                    )));
                }
            }
            SessionAction::DeepLinkQuery(query) => {
                self.bootstrap.provide_query(query);
                self.check_bootstrap();
            }
            SessionAction::ViewportScrolled(metrics) => self.handle_viewport_scroll(metrics),
            SessionAction::LocaleChanged(locale) => {
                if let Some(now) = self.clock.set_locale(locale) {
                    self.emit(SessionUpdate::ClockTick(now));
                }
            }
            SessionAction::TimezoneChanged(timezone) => {
                self.controller.set_timezone(timezone.clone());
                if let Some(now) = self.clock.set_timezone(timezone) {
                    self.emit(SessionUpdate::ClockTick(now));
                }
            }
            SessionAction::SubmitClockPrompt => {
                if self.clock.is_mounted() && !self.controller.status().is_busy() {
                    self.controller.submit(UserTurn::text(DATE_TIME_PROMPT));
                    self.sync_status();
                }
            }
            SessionAction::NewSession => {
                self.controller.reset();
                self.sync_status();
            }
            SessionAction::Shutdown => self.should_quit = true,
        }
    }

    pub(crate) fn handle_stream_update(&mut self, update: StreamUpdate) {
        let is_delta = matches!(update.payload, crate::session::StreamPayload::Delta(_));
        self.controller.apply_stream_update(update);
        self.sync_status();
        if is_delta && self.controller.status() == StreamStatus::Streaming {
            self.on_content_mutation();
        }
    }

    pub(crate) fn handle_suggestion_outcome(&mut self, outcome: SuggestionOutcome) {
        self.controller.apply_suggestion_outcome(outcome);
        self.on_content_mutation();
    }

    pub(crate) fn handle_due_timers(&mut self, now: Instant) {
        for kind in self.timers.take_due(now) {
            match kind {
                TimerKind::ScrollFlush => {
                    if self.scroll.flush_due() == ScrollEffect::ScrollNow {
                        self.scroll_now(now);
                    }
                }
                TimerKind::ScrollGuardRelease => self.scroll.release_guard(),
                TimerKind::ClockTick => {
                    let (reading, next_delay) = self.clock.tick();
                    self.emit(SessionUpdate::ClockTick(reading));
                    self.timers.set(TimerKind::ClockTick, now + next_delay);
                }
            }
        }
    }

    fn handle_viewport_scroll(&mut self, metrics: ViewportMetrics) {
        if self.scroll.on_viewport_scroll(metrics) == ScrollEffect::CancelFlush {
            self.timers.clear(TimerKind::ScrollFlush);
        }
        let affordance = self.scroll.show_jump_to_bottom();
        if affordance != self.last_jump_affordance {
            self.last_jump_affordance = affordance;
            self.emit(SessionUpdate::JumpAffordanceChanged(affordance));
        }
    }

    fn check_bootstrap(&mut self) {
        if let Some(query) = self.bootstrap.poll(self.controller.transcript().is_empty()) {
            self.controller.submit(UserTurn::text(query));
            self.sync_status();
        }
    }

    /// Reacts to status transitions observed after any controller call. The
    /// scroll episode begins with streaming and ends with any exit from it.
    fn sync_status(&mut self) {
        let status = self.controller.status();
        if status == self.last_status {
            return;
        }
        self.last_status = status;

        if status == StreamStatus::Streaming {
            if self.scroll.begin_episode() == ScrollEffect::ScrollNow {
                self.scroll_now(Instant::now());
            }
        } else {
            self.scroll.end_episode();
            self.timers.clear(TimerKind::ScrollFlush);
            self.timers.clear(TimerKind::ScrollGuardRelease);
        }
    }

    fn on_content_mutation(&mut self) {
        if self.scroll.on_content_mutation() == ScrollEffect::ScheduleFlush {
            // Superseding reschedule: the previous deadline is replaced.
            self.timers
                .set(TimerKind::ScrollFlush, Instant::now() + SCROLL_DEBOUNCE);
        }
    }

    fn scroll_now(&mut self, now: Instant) {
        self.emit(SessionUpdate::ScrollToBottom);
        self.scroll.mark_programmatic();
        self.timers.clear(TimerKind::ScrollFlush);
        self.timers
            .set(TimerKind::ScrollGuardRelease, now + GUARD_RELEASE);
    }

    fn emit(&self, update: SessionUpdate) {
        let _ = self.update_tx.send(update);
    }
}

async fn sleep_until_next(timers: &TimerSet) {
    match timers.next_deadline() {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_client::{MockChatClient, MockSuggestClient};
    use crate::api::{ChatClient, SuggestClient};
    use crate::session::tests::{
        content_delta, message_start, stream_round, Script, ScriptedChat, StreamTail,
    };
    use crate::session::StreamUpdate;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct AppHarness {
        _state_dir: TempDir,
        app: App,
        update_rx: mpsc::UnboundedReceiver<SessionUpdate>,
    }

    fn mock_app(
        chat_client: ChatClient,
        suggest_responses: Vec<Result<Vec<String>, String>>,
        initial_query: Option<String>,
    ) -> AppHarness {
        let state_dir = TempDir::new().expect("temp state dir");
        let suggest_client =
            SuggestClient::new_mock(Arc::new(MockSuggestClient::new(suggest_responses)));
        let (app, _handle, update_rx) =
            App::new_mock(chat_client, suggest_client, state_dir.path(), initial_query);
        AppHarness {
            _state_dir: state_dir,
            app,
            update_rx,
        }
    }

    impl AppHarness {
        async fn next_stream_update(&mut self) -> StreamUpdate {
            tokio::time::timeout(Duration::from_secs(2), self.app.stream_rx.recv())
                .await
                .expect("stream driver stalled")
                .expect("stream channel closed")
        }

        async fn pump_one_stream_update(&mut self) {
            let update = self.next_stream_update().await;
            self.app.handle_stream_update(update);
        }

        async fn pump_stream_to_completion(&mut self) {
            while self.app.status().is_busy() {
                self.pump_one_stream_update().await;
            }
        }

        fn drain_updates(&mut self) -> Vec<SessionUpdate> {
            let mut updates = Vec::new();
            while let Ok(update) = self.update_rx.try_recv() {
                updates.push(update);
            }
            updates
        }

        fn scroll_commands(&mut self) -> usize {
            self.drain_updates()
                .iter()
                .filter(|update| matches!(update, SessionUpdate::ScrollToBottom))
                .count()
        }
    }

    fn far_from_bottom() -> ViewportMetrics {
        ViewportMetrics {
            scroll_top: 0.0,
            viewport_height: 600.0,
            content_height: 2000.0,
        }
    }

    #[tokio::test]
    async fn test_streaming_pins_the_viewport_until_the_user_overrides() {
        let producer = ScriptedChat::new(vec![Script {
            frames: vec![
                message_start("msg_1"),
                content_delta("one "),
                content_delta("two "),
                content_delta("three"),
            ],
            tail: StreamTail::Stall,
        }]);
        let mut harness = mock_app(ChatClient::new_mock(Arc::new(producer)), vec![], None);
        harness.app.mount();
        harness.drain_updates();

        harness
            .app
            .handle_action(SessionAction::Submit(UserTurn::text("go")));
        harness.pump_one_stream_update().await;
        assert_eq!(harness.app.status(), StreamStatus::Streaming);
        assert_eq!(harness.scroll_commands(), 1);

        // Let the programmatic scroll finish, then have the user scroll away.
        harness.app.scroll.release_guard();
        harness
            .app
            .handle_action(SessionAction::ViewportScrolled(far_from_bottom()));
        assert!(harness.app.show_jump_to_bottom());
        assert!(harness.app.timers.get(TimerKind::ScrollFlush).is_none());
        assert!(harness
            .drain_updates()
            .iter()
            .any(|update| matches!(update, SessionUpdate::JumpAffordanceChanged(true))));

        // Further deltas must not scroll for the rest of the episode.
        harness.pump_one_stream_update().await;
        harness.pump_one_stream_update().await;
        assert!(harness.app.timers.get(TimerKind::ScrollFlush).is_none());
        assert_eq!(harness.scroll_commands(), 0);

        harness.app.handle_action(SessionAction::Stop);
        assert_eq!(harness.app.status(), StreamStatus::Ready);
        assert!(harness.app.timers.get(TimerKind::ScrollFlush).is_none());
        assert!(harness
            .app
            .timers
            .get(TimerKind::ScrollGuardRelease)
            .is_none());
    }

    #[tokio::test]
    async fn test_undisturbed_streaming_flushes_the_debounced_scroll() {
        let producer = ScriptedChat::new(vec![Script {
            frames: vec![
                message_start("msg_1"),
                content_delta("alpha "),
                content_delta("beta"),
            ],
            tail: StreamTail::Stall,
        }]);
        let mut harness = mock_app(ChatClient::new_mock(Arc::new(producer)), vec![], None);
        harness.app.mount();
        harness.drain_updates();

        harness
            .app
            .handle_action(SessionAction::Submit(UserTurn::text("go")));
        harness.pump_one_stream_update().await;
        harness.pump_one_stream_update().await;

        let deadline = harness
            .app
            .timers
            .get(TimerKind::ScrollFlush)
            .expect("debounced flush armed");
        harness.app.handle_due_timers(deadline);

        // One immediate pin at episode start plus one debounced flush.
        assert_eq!(harness.scroll_commands(), 2);
        harness.app.handle_action(SessionAction::Stop);
    }

    #[tokio::test]
    async fn test_deep_link_query_is_submitted_exactly_once() {
        let chat = MockChatClient::new(vec![stream_round("msg_1", &["Seeded answer."], "stop")]);
        let mut harness = mock_app(
            ChatClient::new_mock(Arc::new(chat)),
            vec![Ok(vec![])],
            Some("seed question".to_string()),
        );

        harness.app.mount();
        assert_eq!(harness.app.transcript().len(), 1);
        assert_eq!(harness.app.transcript()[0].content, "seed question");

        harness.pump_stream_to_completion().await;
        assert_eq!(harness.app.transcript().len(), 2);

        // Re-announcing the same deep link must never double-submit.
        harness
            .app
            .handle_action(SessionAction::DeepLinkQuery("seed question".to_string()));
        assert_eq!(harness.app.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_late_deep_link_defers_when_the_session_already_started() {
        let producer = ScriptedChat::new(vec![Script {
            frames: vec![message_start("msg_1"), content_delta("typing")],
            tail: StreamTail::Stall,
        }]);
        let mut harness = mock_app(ChatClient::new_mock(Arc::new(producer)), vec![], None);
        harness.app.mount();

        harness
            .app
            .handle_action(SessionAction::Submit(UserTurn::text("typed first")));
        harness
            .app
            .handle_action(SessionAction::DeepLinkQuery("late deep link".to_string()));

        let transcript = harness.app.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].content, "typed first");
        harness.app.handle_action(SessionAction::Stop);
    }

    #[tokio::test]
    async fn test_clock_prompt_respects_busy_sessions() {
        let producer = ScriptedChat::new(vec![Script {
            frames: vec![message_start("msg_1"), content_delta("It is ")],
            tail: StreamTail::Stall,
        }]);
        let mut harness = mock_app(ChatClient::new_mock(Arc::new(producer)), vec![], None);
        harness.app.mount();

        harness.app.handle_action(SessionAction::SubmitClockPrompt);
        assert_eq!(harness.app.transcript().len(), 1);
        assert_eq!(harness.app.transcript()[0].content, DATE_TIME_PROMPT);

        harness.pump_one_stream_update().await;
        harness.app.handle_action(SessionAction::SubmitClockPrompt);
        assert_eq!(harness.app.transcript().len(), 2);
        harness.app.handle_action(SessionAction::Stop);
    }

    #[tokio::test]
    async fn test_clock_ticks_realign_and_locale_changes_refresh() {
        let chat = MockChatClient::new(vec![]);
        let mut harness = mock_app(ChatClient::new_mock(Arc::new(chat)), vec![], None);

        harness.app.mount();
        let mount_updates = harness.drain_updates();
        assert!(mount_updates
            .iter()
            .any(|update| matches!(update, SessionUpdate::ClockTick(_))));

        let first_beat = harness
            .app
            .timers
            .get(TimerKind::ClockTick)
            .expect("clock armed at mount");
        harness.app.handle_due_timers(first_beat);
        assert!(harness
            .drain_updates()
            .iter()
            .any(|update| matches!(update, SessionUpdate::ClockTick(_))));
        let next_beat = harness
            .app
            .timers
            .get(TimerKind::ClockTick)
            .expect("clock re-armed");
        assert!(next_beat > first_beat);

        harness
            .app
            .handle_action(SessionAction::LocaleChanged("ja-JP".to_string()));
        assert!(harness
            .drain_updates()
            .iter()
            .any(|update| matches!(update, SessionUpdate::ClockTick(_))));
    }
}
