/// Converts an externally supplied initial query into the first user turn,
/// exactly once per session lifetime.
///
/// The latch arms on the first check that actually observes a query, not on
/// transcript emptiness alone, so a later transcript clear can never re-fire
/// it. A query that only becomes available after startup is still honored as
/// long as nothing else has started the conversation first.
#[derive(Debug)]
pub struct DeepLinkBootstrapper {
    query: Option<String>,
    latched: bool,
}

impl DeepLinkBootstrapper {
    /// `primary` wins over `fallback` when both carry a value.
    pub fn new(primary: Option<String>, fallback: Option<String>) -> Self {
        let query = non_empty(primary).or_else(|| non_empty(fallback));
        Self {
            query,
            latched: false,
        }
    }

    /// A deep-link query arrived after construction. Ignored once latched or
    /// when a query is already pending.
    pub fn provide_query(&mut self, query: String) {
        if self.latched || self.query.is_some() {
            return;
        }
        self.query = non_empty(Some(query));
    }

    /// Runs the one-shot check. Returns the query to submit when it fires.
    /// With no query available yet this stays armed; once a query is seen the
    /// latch closes for good, whether or not it fired.
    pub fn poll(&mut self, transcript_empty: bool) -> Option<String> {
        if self.latched {
            return None;
        }
        let query = self.query.clone()?;
        self.latched = true;
        if transcript_empty {
            Some(query)
        } else {
            // The session got underway by other means first; defer forever.
            None
        }
    }

    pub fn latched(&self) -> bool {
        self.latched
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
