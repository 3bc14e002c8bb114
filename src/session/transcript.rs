use crate::types::{Attachment, Role, Turn};

/// Input for a user submission.
#[derive(Debug, Clone, Default)]
pub struct UserTurn {
    pub content: String,
    pub attachments: Vec<Attachment>,
}

impl UserTurn {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachments: Vec::new(),
        }
    }
}

/// Append-only ordered sequence of turns. The only structural mutation is
/// the explicit truncate-and-replace performed by an edit.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn truncate(&mut self, len: usize) {
        self.turns.truncate(len);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Appends streamed text to the trailing assistant turn, if any.
    pub fn append_to_open_assistant(&mut self, text: &str) -> bool {
        match self.turns.last_mut() {
            Some(turn) if turn.role == Role::Assistant => {
                turn.content.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// Recomputed on read; never cached.
    pub fn last_user_turn_index(&self) -> Option<usize> {
        self.turns.iter().rposition(|turn| turn.role == Role::User)
    }

    /// The trailing (user, assistant) pair, keyed by the assistant turn's
    /// index, if the transcript currently ends with one.
    pub fn completed_pair(&self) -> Option<(usize, &Turn, &Turn)> {
        let assistant_index = self.turns.len().checked_sub(1)?;
        let user_index = assistant_index.checked_sub(1)?;
        let assistant = &self.turns[assistant_index];
        let user = &self.turns[user_index];
        if assistant.role == Role::Assistant && user.role == Role::User {
            Some((assistant_index, user, assistant))
        } else {
            None
        }
    }
}
