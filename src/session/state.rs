use chrono::{DateTime, Local};

/// The single authoritative streaming status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Idle,
    Submitted,
    Streaming,
    Ready,
    Errored,
}

impl StreamStatus {
    /// A submission is already in flight; new submits are rejected.
    pub fn is_busy(self) -> bool {
        matches!(self, StreamStatus::Submitted | StreamStatus::Streaming)
    }
}

/// Terminal status of one streaming episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    Error,
    Aborted,
}

impl FinishReason {
    /// Maps the wire value from `message_delta.finish_reason`. Unrecognized
    /// values are read as a normal completion.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "length" => FinishReason::Length,
            "error" => FinishReason::Error,
            "aborted" => FinishReason::Aborted,
            _ => FinishReason::Stop,
        }
    }

    /// Only normal completions earn a follow-up suggestion fetch.
    pub fn triggers_suggestions(self) -> bool {
        matches!(self, FinishReason::Stop | FinishReason::Length)
    }
}

/// Mutable per-session configuration bound into each outgoing request. A
/// submission snapshots these; changes never affect an in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParameters {
    pub model: String,
    pub group: String,
    pub user_id: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// A request is already in flight; the submit was a silent no-op.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Resubmitted,
    Busy,
    NotUserTurn,
    OutOfRange,
}

/// Payload of one event from a stream-driver task.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPayload {
    Delta(String),
    Finished(FinishReason),
    Failed(String),
}

/// Stream event tagged with the request it belongs to. Events from a
/// superseded request are discarded by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamUpdate {
    pub seq: u64,
    pub payload: StreamPayload,
}

/// Notifications to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    StatusChanged(StreamStatus),
    StreamDelta(String),
    TranscriptChanged,
    SuggestionsChanged(Vec<String>),
    /// Smooth-scroll the viewport to the newest content.
    ScrollToBottom,
    JumpAffordanceChanged(bool),
    ClockTick(DateTime<Local>),
    /// Non-blocking error notification; the session stays usable.
    Notice(String),
}
