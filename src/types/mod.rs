mod api;

pub use api::{
    Attachment, ChatRequest, ContentDelta, MessageDelta, MessageStartData, Role, StreamEvent,
    SuggestRequest, SuggestResponse, Turn,
};
