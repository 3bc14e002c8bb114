use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::groups::find_group;
use crate::util::{env_non_empty, is_local_endpoint_url, normalize_locale};

const DEFAULT_API_URL: &str = "http://localhost:3000/api/search";
const DEFAULT_SUGGEST_URL: &str = "http://localhost:3000/api/suggest";
const DEFAULT_MODEL: &str = "quill-default";
const DEFAULT_GROUP: &str = "web";
const DEFAULT_LOCALE: &str = "en-US";
const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_url: String,
    pub suggest_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub group: String,
    pub timezone: String,
    pub locale: String,
    pub state_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url = env_non_empty("QUILL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let suggest_url =
            env_non_empty("QUILL_SUGGEST_URL").unwrap_or_else(|| DEFAULT_SUGGEST_URL.to_string());
        let api_key = env_non_empty("QUILL_API_KEY");
        let model = env_non_empty("QUILL_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let group = env_non_empty("QUILL_GROUP").unwrap_or_else(|| DEFAULT_GROUP.to_string());
        let timezone = env_non_empty("QUILL_TIMEZONE")
            .or_else(|| env_non_empty("TZ"))
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let locale = env_non_empty("QUILL_LOCALE")
            .or_else(|| env_non_empty("LANG").and_then(|raw| normalize_locale(&raw)))
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        let state_dir = env_non_empty("QUILL_STATE_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|dir| dir.join("quill")))
            .unwrap_or_else(|| PathBuf::from(".quill"));

        Ok(Self {
            api_url,
            suggest_url,
            api_key,
            model,
            group,
            timezone,
            locale,
            state_dir,
        })
    }

    pub fn validate(&self) -> Result<()> {
        for (label, url) in [("QUILL_API_URL", &self.api_url), ("QUILL_SUGGEST_URL", &self.suggest_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("Invalid {label} '{url}': expected http:// or https:// URL");
            }
        }

        if !self.is_local_endpoint() && self.api_key.is_none() {
            bail!(
                "QUILL_API_KEY must be set for non-local endpoints (url: '{}')",
                self.api_url
            );
        }

        if find_group(&self.group).is_none() {
            bail!("Unknown search group '{}'", self.group);
        }

        Ok(())
    }

    fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url) && is_local_endpoint_url(&self.suggest_url)
    }
}
