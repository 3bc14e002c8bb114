use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PREFS_FILE: &str = "prefs.json";

/// Preferences that survive across sessions: the last-selected model and the
/// stable per-user id sent with every request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prefs {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Durable key-value store backed by a JSON file in the state directory.
/// Reads at mount, writes on change; all failures are non-fatal to the
/// session.
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn open(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(PREFS_FILE),
        }
    }

    /// A missing or corrupt file yields defaults; startup never fails on the
    /// preference store.
    pub fn load(&self) -> Prefs {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, prefs: &Prefs) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating state dir {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(prefs)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("writing {}", self.path.display()))
    }

    pub fn save_model(&self, model: &str) -> Result<()> {
        let mut prefs = self.load();
        prefs.model = Some(model.to_string());
        self.save(&prefs)
    }

    /// Returns the stored user id, generating and persisting one on first use.
    pub fn ensure_user_id(&self) -> Result<String> {
        let mut prefs = self.load();
        if let Some(user_id) = prefs.user_id.clone() {
            return Ok(user_id);
        }
        let user_id = format!("user_{}", uuid::Uuid::new_v4().simple());
        prefs.user_id = Some(user_id.clone());
        self.save(&prefs)?;
        Ok(user_id)
    }
}
