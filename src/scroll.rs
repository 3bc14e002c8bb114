use std::time::Duration;

/// Distance from the bottom edge, in pixels, past which a manual scroll
/// counts as leaving the tail.
pub const BOTTOM_THRESHOLD_PX: f32 = 100.0;
/// Content mutations within this window coalesce into one scroll command.
pub const SCROLL_DEBOUNCE: Duration = Duration::from_millis(100);
/// How long a programmatic scroll owns incoming viewport events before they
/// are attributed to the user again.
pub const GUARD_RELEASE: Duration = Duration::from_millis(100);

/// Viewport geometry as reported by the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportMetrics {
    pub scroll_top: f32,
    pub viewport_height: f32,
    pub content_height: f32,
}

impl ViewportMetrics {
    pub fn distance_from_bottom(&self) -> f32 {
        (self.content_height - (self.scroll_top + self.viewport_height)).max(0.0)
    }

    pub fn near_bottom(&self) -> bool {
        self.distance_from_bottom() <= BOTTOM_THRESHOLD_PX
    }

    pub fn scrollable(&self) -> bool {
        self.content_height > self.viewport_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    /// No streaming episode in progress; the viewport belongs to the user.
    Dormant,
    /// Pinned to the newest content while a response streams in.
    AutoFollowing,
    /// The user scrolled away mid-stream; hands off until the episode ends.
    UserOverridden,
}

/// What the event loop must do after feeding an input to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollEffect {
    None,
    /// (Re)arm the debounced scroll-to-bottom timer.
    ScheduleFlush,
    /// Drop any armed flush timer.
    CancelFlush,
    /// Issue a scroll-to-bottom command now.
    ScrollNow,
}

/// Keeps the viewport glued to the streaming cursor unless the user takes
/// over. All transitions are driven by the owning event loop; the controller
/// itself holds no timers, only the decisions.
#[derive(Debug)]
pub struct AutoScrollController {
    state: FollowState,
    /// Set while a self-initiated scroll is in flight so its viewport events
    /// are never misread as a manual scroll.
    guard_active: bool,
    last_metrics: ViewportMetrics,
}

impl AutoScrollController {
    pub fn new() -> Self {
        Self {
            state: FollowState::Dormant,
            guard_active: false,
            last_metrics: ViewportMetrics::default(),
        }
    }

    pub fn state(&self) -> FollowState {
        self.state
    }

    /// A streaming episode began: any prior override is forgotten and the
    /// viewport is pinned immediately.
    pub fn begin_episode(&mut self) -> ScrollEffect {
        self.state = FollowState::AutoFollowing;
        ScrollEffect::ScrollNow
    }

    /// The episode ended, whatever the reason. The caller clears the flush
    /// and guard timers alongside this.
    pub fn end_episode(&mut self) {
        self.state = FollowState::Dormant;
        self.guard_active = false;
    }

    /// Transcript or suggestion content changed during the episode.
    pub fn on_content_mutation(&mut self) -> ScrollEffect {
        match self.state {
            FollowState::AutoFollowing => ScrollEffect::ScheduleFlush,
            _ => ScrollEffect::None,
        }
    }

    /// The debounce timer fired.
    pub fn flush_due(&mut self) -> ScrollEffect {
        match self.state {
            FollowState::AutoFollowing => ScrollEffect::ScrollNow,
            _ => ScrollEffect::None,
        }
    }

    /// A scroll command was issued; viewport events are ours until the guard
    /// is released.
    pub fn mark_programmatic(&mut self) {
        self.guard_active = true;
    }

    pub fn release_guard(&mut self) {
        self.guard_active = false;
    }

    /// The presentation layer reported a viewport scroll.
    pub fn on_viewport_scroll(&mut self, metrics: ViewportMetrics) -> ScrollEffect {
        self.last_metrics = metrics;
        if self.guard_active {
            return ScrollEffect::None;
        }

        match self.state {
            FollowState::AutoFollowing if !metrics.near_bottom() => {
                self.state = FollowState::UserOverridden;
                ScrollEffect::CancelFlush
            }
            _ => ScrollEffect::None,
        }
    }

    /// Derived affordance: offer a jump-to-bottom control whenever the last
    /// reported viewport sits away from the tail of scrollable content.
    pub fn show_jump_to_bottom(&self) -> bool {
        self.last_metrics.scrollable() && !self.last_metrics.near_bottom()
    }
}

impl Default for AutoScrollController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(scroll_top: f32, viewport: f32, content: f32) -> ViewportMetrics {
        ViewportMetrics {
            scroll_top,
            viewport_height: viewport,
            content_height: content,
        }
    }

    #[test]
    fn test_episode_start_resets_a_prior_override() {
        let mut controller = AutoScrollController::new();
        assert_eq!(controller.begin_episode(), ScrollEffect::ScrollNow);
        controller.on_viewport_scroll(metrics(0.0, 600.0, 2000.0));
        assert_eq!(controller.state(), FollowState::UserOverridden);

        controller.end_episode();
        assert_eq!(controller.begin_episode(), ScrollEffect::ScrollNow);
        assert_eq!(controller.state(), FollowState::AutoFollowing);
    }

    #[test]
    fn test_content_mutations_schedule_only_while_following() {
        let mut controller = AutoScrollController::new();
        assert_eq!(controller.on_content_mutation(), ScrollEffect::None);

        controller.begin_episode();
        assert_eq!(controller.on_content_mutation(), ScrollEffect::ScheduleFlush);

        controller.on_viewport_scroll(metrics(0.0, 600.0, 2000.0));
        assert_eq!(controller.on_content_mutation(), ScrollEffect::None);
        assert_eq!(controller.flush_due(), ScrollEffect::None);
    }

    #[test]
    fn test_guarded_scroll_is_not_treated_as_user_intent() {
        let mut controller = AutoScrollController::new();
        controller.begin_episode();
        controller.mark_programmatic();

        // A smooth scroll animation passes through positions far from bottom.
        assert_eq!(
            controller.on_viewport_scroll(metrics(100.0, 600.0, 2000.0)),
            ScrollEffect::None
        );
        assert_eq!(controller.state(), FollowState::AutoFollowing);

        controller.release_guard();
        assert_eq!(
            controller.on_viewport_scroll(metrics(100.0, 600.0, 2000.0)),
            ScrollEffect::CancelFlush
        );
        assert_eq!(controller.state(), FollowState::UserOverridden);
    }

    #[test]
    fn test_scrolls_near_bottom_keep_following() {
        let mut controller = AutoScrollController::new();
        controller.begin_episode();
        assert_eq!(
            controller.on_viewport_scroll(metrics(1350.0, 600.0, 2000.0)),
            ScrollEffect::None
        );
        assert_eq!(controller.state(), FollowState::AutoFollowing);
    }

    #[test]
    fn test_override_persists_for_the_rest_of_the_episode() {
        let mut controller = AutoScrollController::new();
        controller.begin_episode();
        controller.on_viewport_scroll(metrics(0.0, 600.0, 2000.0));
        assert_eq!(controller.state(), FollowState::UserOverridden);

        // Returning to the bottom mid-episode does not re-enable following.
        controller.on_viewport_scroll(metrics(1400.0, 600.0, 2000.0));
        assert_eq!(controller.state(), FollowState::UserOverridden);

        controller.end_episode();
        assert_eq!(controller.state(), FollowState::Dormant);
    }

    #[test]
    fn test_jump_affordance_tracks_last_viewport() {
        let mut controller = AutoScrollController::new();
        assert!(!controller.show_jump_to_bottom());

        controller.begin_episode();
        controller.on_viewport_scroll(metrics(0.0, 600.0, 2000.0));
        assert!(controller.show_jump_to_bottom());

        controller.on_viewport_scroll(metrics(1400.0, 600.0, 2000.0));
        assert!(!controller.show_jump_to_bottom());

        // Content shorter than the viewport never offers the affordance.
        controller.on_viewport_scroll(metrics(0.0, 600.0, 300.0));
        assert!(!controller.show_jump_to_bottom());
    }
}
