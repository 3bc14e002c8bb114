mod bootstrap;
mod core;
mod state;
mod suggest;
mod transcript;


pub use bootstrap::DeepLinkBootstrapper;
pub use core::SessionController;
pub use state::{
    EditOutcome, FinishReason, SessionParameters, SessionUpdate, StreamPayload, StreamStatus,
    StreamUpdate, SubmitOutcome,
};
pub use suggest::{SuggestionFetcher, SuggestionOutcome};
pub use transcript::{Transcript, UserTurn};
