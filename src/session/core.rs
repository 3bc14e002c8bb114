use super::state::{
    EditOutcome, FinishReason, SessionParameters, SessionUpdate, StreamPayload, StreamStatus,
    StreamUpdate, SubmitOutcome,
};
use super::suggest::{SuggestionFetcher, SuggestionOutcome};
use super::transcript::{Transcript, UserTurn};
use crate::api::logging::emit_background_error;
use crate::api::{ChatClient, StreamParser};
use crate::groups::find_group;
use crate::store::PrefsStore;
use crate::types::{ChatRequest, Role, StreamEvent, Turn};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct ActiveRequest {
    cancel: CancellationToken,
}

/// Owns the conversation transcript, streaming status, per-session
/// parameters and suggestion list; the single source of truth for a session.
///
/// All methods run on the session's event loop. Network work happens in
/// spawned driver tasks that report back through `stream_tx`; every event is
/// tagged with the request sequence so anything from a superseded request is
/// dropped without touching state.
pub struct SessionController {
    client: ChatClient,
    store: PrefsStore,
    transcript: Transcript,
    status: StreamStatus,
    params: SessionParameters,
    suggestions: Vec<String>,
    fetcher: SuggestionFetcher,
    request_seq: u64,
    active: Option<ActiveRequest>,
    stream_tx: mpsc::UnboundedSender<StreamUpdate>,
    update_tx: mpsc::UnboundedSender<SessionUpdate>,
}

impl SessionController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: ChatClient,
        store: PrefsStore,
        params: SessionParameters,
        fetcher: SuggestionFetcher,
        stream_tx: mpsc::UnboundedSender<StreamUpdate>,
        update_tx: mpsc::UnboundedSender<SessionUpdate>,
    ) -> Self {
        Self {
            client,
            store,
            transcript: Transcript::default(),
            status: StreamStatus::Idle,
            params,
            suggestions: Vec::new(),
            fetcher,
            request_seq: 0,
            active: None,
            stream_tx,
            update_tx,
        }
    }

    pub fn transcript(&self) -> &[Turn] {
        self.transcript.turns()
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn parameters(&self) -> &SessionParameters {
        &self.params
    }

    pub fn last_user_turn_index(&self) -> Option<usize> {
        self.transcript.last_user_turn_index()
    }

    /// Appends a user turn and opens a streaming request against the chat
    /// endpoint. Rejected as a no-op while a request is in flight.
    pub fn submit(&mut self, turn: UserTurn) -> SubmitOutcome {
        if self.status.is_busy() {
            return SubmitOutcome::Busy;
        }

        self.fetcher.invalidate();
        self.set_suggestions(Vec::new());
        self.transcript.push(Turn {
            role: Role::User,
            content: turn.content,
            attachments: turn.attachments,
        });
        self.emit(SessionUpdate::TranscriptChanged);
        self.start_request();
        SubmitOutcome::Accepted
    }

    /// Replaces a user turn: truncates everything from `index` onward and
    /// resubmits the new content as a fresh turn at that position.
    pub fn edit_turn(&mut self, index: usize, content: String) -> EditOutcome {
        if self.status.is_busy() {
            return EditOutcome::Busy;
        }
        let Some(existing) = self.transcript.turns().get(index) else {
            return EditOutcome::OutOfRange;
        };
        if existing.role != Role::User {
            return EditOutcome::NotUserTurn;
        }

        let attachments = existing.attachments.clone();
        self.transcript.truncate(index);
        self.emit(SessionUpdate::TranscriptChanged);
        match self.submit(UserTurn {
            content,
            attachments,
        }) {
            SubmitOutcome::Accepted => EditOutcome::Resubmitted,
            SubmitOutcome::Busy => EditOutcome::Busy,
        }
    }

    /// Cancels the in-flight request, if any. The status flips to `Ready`
    /// synchronously; no further deltas from the cancelled request are
    /// applied and no suggestion fetch is issued.
    pub fn stop(&mut self) {
        if !self.status.is_busy() {
            return;
        }
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
        // Orphan any events the cancelled driver already queued.
        self.request_seq += 1;
        self.set_status(StreamStatus::Ready);
    }

    /// Routes one event from a stream-driver task.
    pub fn apply_stream_update(&mut self, update: StreamUpdate) {
        if update.seq != self.request_seq {
            return;
        }
        match update.payload {
            StreamPayload::Delta(text) => self.append_delta(&text),
            StreamPayload::Finished(reason) => self.finalize(reason),
            StreamPayload::Failed(message) => {
                self.emit(SessionUpdate::Notice(message));
                self.finalize(FinishReason::Error);
            }
        }
    }

    /// Routes one completed suggestion fetch; superseded keys are discarded.
    pub fn apply_suggestion_outcome(&mut self, outcome: SuggestionOutcome) {
        if !self.fetcher.accept(&outcome) {
            return;
        }
        self.set_suggestions(outcome.questions);
    }

    pub fn set_model(&mut self, model: String) {
        if model == self.params.model {
            return;
        }
        self.params.model = model.clone();
        if let Err(error) = self.store.save_model(&model) {
            emit_background_error("model preference write failed", &error);
        }
    }

    /// Accepts only catalogued group ids; returns false otherwise.
    pub fn set_group(&mut self, group: &str) -> bool {
        if find_group(group).is_none() {
            return false;
        }
        self.params.group = group.to_string();
        true
    }

    pub fn set_timezone(&mut self, timezone: String) {
        self.params.timezone = timezone;
    }

    /// Starts a fresh conversation: transcript, suggestions and status are
    /// wiped. Deliberately does not touch the deep-link latch.
    pub fn reset(&mut self) {
        self.stop();
        self.fetcher.invalidate();
        self.transcript.clear();
        self.set_suggestions(Vec::new());
        self.set_status(StreamStatus::Idle);
        self.emit(SessionUpdate::TranscriptChanged);
    }

    fn start_request(&mut self) {
        self.request_seq += 1;
        let seq = self.request_seq;

        // Bind the parameters now; later set_model/set_group calls only
        // affect future submissions.
        let request = ChatRequest {
            model: self.params.model.clone(),
            group: self.params.group.clone(),
            user_id: self.params.user_id.clone(),
            timezone: self.params.timezone.clone(),
            messages: self.transcript.turns().to_vec(),
        };

        let cancel = CancellationToken::new();
        self.active = Some(ActiveRequest {
            cancel: cancel.clone(),
        });
        self.set_status(StreamStatus::Submitted);

        let client = self.client.clone();
        let stream_tx = self.stream_tx.clone();
        tokio::spawn(async move {
            drive_stream(client, request, seq, cancel, stream_tx).await;
        });
    }

    fn append_delta(&mut self, text: &str) {
        if self.status == StreamStatus::Submitted {
            self.transcript.push(Turn::assistant(""));
            self.set_status(StreamStatus::Streaming);
        }
        if self.status != StreamStatus::Streaming {
            return;
        }
        if self.transcript.append_to_open_assistant(text) {
            self.emit(SessionUpdate::StreamDelta(text.to_string()));
        }
    }

    fn finalize(&mut self, reason: FinishReason) {
        if !self.status.is_busy() {
            return;
        }
        self.active = None;
        let next = if reason == FinishReason::Error {
            StreamStatus::Errored
        } else {
            StreamStatus::Ready
        };
        self.set_status(next);

        if !reason.triggers_suggestions() {
            return;
        }
        if let Some((index, user, assistant)) = self.transcript.completed_pair() {
            if !assistant.content.is_empty() {
                let pair = vec![user.clone(), assistant.clone()];
                self.fetcher.request(index, pair);
            }
        }
    }

    fn set_status(&mut self, status: StreamStatus) {
        if status == self.status {
            return;
        }
        self.status = status;
        self.emit(SessionUpdate::StatusChanged(status));
    }

    fn set_suggestions(&mut self, suggestions: Vec<String>) {
        if suggestions == self.suggestions {
            return;
        }
        self.suggestions = suggestions.clone();
        self.emit(SessionUpdate::SuggestionsChanged(suggestions));
    }

    fn emit(&self, update: SessionUpdate) {
        let _ = self.update_tx.send(update);
    }
}

/// Reads one streaming response to completion, forwarding ordered deltas and
/// exactly one terminal event unless cancelled first. Cancellation exits
/// silently: the controller has already moved on.
async fn drive_stream(
    client: ChatClient,
    request: ChatRequest,
    seq: u64,
    cancel: CancellationToken,
    stream_tx: mpsc::UnboundedSender<StreamUpdate>,
) {
    let send = |payload: StreamPayload| {
        let _ = stream_tx.send(StreamUpdate { seq, payload });
    };

    let mut stream = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = client.create_stream(&request) => match opened {
            Ok(stream) => stream,
            Err(error) => {
                send(StreamPayload::Failed(error.to_string()));
                return;
            }
        },
    };

    let mut parser = StreamParser::new();
    let mut wire_reason: Option<FinishReason> = None;

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return,
            chunk = stream.next() => chunk,
        };
        let Some(chunk) = chunk else { break };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => {
                send(StreamPayload::Failed(error.to_string()));
                return;
            }
        };
        let events = match parser.process(&chunk) {
            Ok(events) => events,
            Err(error) => {
                send(StreamPayload::Failed(error.to_string()));
                return;
            }
        };

        for event in events {
            match event {
                StreamEvent::ContentDelta { delta } => {
                    if let Some(text) = delta.text {
                        send(StreamPayload::Delta(text));
                    }
                }
                StreamEvent::MessageDelta { delta } => {
                    if let Some(raw) = delta.finish_reason {
                        wire_reason = Some(FinishReason::from_wire(&raw));
                    }
                }
                StreamEvent::MessageStop => {
                    send(StreamPayload::Finished(
                        wire_reason.take().unwrap_or(FinishReason::Stop),
                    ));
                    return;
                }
                StreamEvent::MessageStart { .. } | StreamEvent::Unknown => {}
            }
        }
    }

    // The channel closed without a message_stop frame.
    match wire_reason {
        Some(reason) => send(StreamPayload::Finished(reason)),
        None => send(StreamPayload::Failed(
            "stream ended before completion".to_string(),
        )),
    }
}
