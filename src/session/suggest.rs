use crate::api::logging::emit_background_error;
use crate::api::SuggestClient;
use crate::types::Turn;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A completed suggestion fetch, tagged with the turn-pair index it was
/// requested for.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionOutcome {
    pub key: usize,
    pub questions: Vec<String>,
}

struct LiveFetch {
    key: usize,
    cancel: CancellationToken,
}

/// Requests follow-up questions after a normally completed assistant turn.
/// At most one fetch is live: a request for a newer turn-pair cancels the
/// older one, and late responses for superseded keys are discarded on
/// acceptance.
pub struct SuggestionFetcher {
    client: SuggestClient,
    outcome_tx: mpsc::UnboundedSender<SuggestionOutcome>,
    live: Option<LiveFetch>,
}

impl SuggestionFetcher {
    pub fn new(client: SuggestClient, outcome_tx: mpsc::UnboundedSender<SuggestionOutcome>) -> Self {
        Self {
            client,
            outcome_tx,
            live: None,
        }
    }

    /// Fetches suggestions for the (user, assistant) pair keyed by the
    /// assistant turn's transcript index.
    pub fn request(&mut self, key: usize, pair: Vec<Turn>) {
        self.invalidate();

        let cancel = CancellationToken::new();
        self.live = Some(LiveFetch {
            key,
            cancel: cancel.clone(),
        });

        let client = self.client.clone();
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = client.suggest(&pair) => result,
            };
            match result {
                Ok(questions) => {
                    let _ = outcome_tx.send(SuggestionOutcome { key, questions });
                }
                Err(error) => {
                    // Non-critical: the suggestion list simply stays empty.
                    emit_background_error("suggestion fetch failed", &error);
                }
            }
        });
    }

    /// True when the outcome belongs to the fetch that is still current;
    /// superseded responses are dropped.
    pub fn accept(&mut self, outcome: &SuggestionOutcome) -> bool {
        match &self.live {
            Some(live) if live.key == outcome.key => {
                self.live = None;
                true
            }
            _ => false,
        }
    }

    /// Cancels any in-flight fetch; its late response will not be accepted.
    pub fn invalidate(&mut self) {
        if let Some(live) = self.live.take() {
            live.cancel.cancel();
        }
    }

    pub fn live_key(&self) -> Option<usize> {
        self.live.as_ref().map(|live| live.key)
    }
}
