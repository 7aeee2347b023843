//! Assistant configuration.
//!
//! Precedence: env `LOOM_CONFIG` path > `config/assist.toml` > defaults, then
//! environment overrides with prefix `LOOM` and separator `__`
//! (e.g. `LOOM__ENDPOINT`, `LOOM__CREDENTIAL_POLL_MS`).
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | endpoint | http://127.0.0.1:5000/api/claude/chat | Streaming chat endpoint |
//! | credential_key | loom_anthropic_api_key | Key looked up in the credential store |
//! | credential_path | user_config.toml | TOML file holding credentials |
//! | credential_poll_ms | 1000 | Re-check interval for stores without notifications |
//! | request_timeout_secs | 60 | Whole-request timeout |
//! | panel_width / panel_height | 320 | Floating panel size |
//! | panel_padding | 8 | Minimum distance from the viewport edge |

use crate::credential::{
    ChainedCredentialStore, CredentialStore, EnvCredentialStore, FileCredentialStore,
    DEFAULT_CREDENTIAL_KEY,
};
use crate::error::AssistResult;
use crate::placement::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/api/claude/chat";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistConfig {
    pub endpoint: String,
    pub credential_key: String,
    pub credential_path: String,
    pub credential_poll_ms: u64,
    pub request_timeout_secs: u64,
    pub panel_width: f64,
    pub panel_height: f64,
    pub panel_padding: f64,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credential_key: DEFAULT_CREDENTIAL_KEY.to_string(),
            credential_path: "user_config.toml".to_string(),
            credential_poll_ms: 1000,
            request_timeout_secs: 60,
            panel_width: 320.0,
            panel_height: 320.0,
            panel_padding: 8.0,
        }
    }
}

impl AssistConfig {
    /// Load from file and environment.
    pub fn load() -> AssistResult<Self> {
        let config_path =
            std::env::var("LOOM_CONFIG").unwrap_or_else(|_| "config/assist.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load with an explicit file path; a missing file falls back to defaults.
    pub fn load_from(path: &Path) -> AssistResult<Self> {
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("endpoint", defaults.endpoint)?
            .set_default("credential_key", defaults.credential_key)?
            .set_default("credential_path", defaults.credential_path)?
            .set_default("credential_poll_ms", defaults.credential_poll_ms)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default("panel_width", defaults.panel_width)?
            .set_default("panel_height", defaults.panel_height)?
            .set_default("panel_padding", defaults.panel_padding)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("LOOM").separator("__"))
            .build()?;

        Ok(built.try_deserialize()?)
    }

    pub fn credential_poll_interval(&self) -> Duration {
        Duration::from_millis(self.credential_poll_ms.max(50))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn panel_size(&self) -> Size {
        Size::new(self.panel_width, self.panel_height)
    }

    /// Credential file first, environment second.
    pub fn credential_store(&self) -> Arc<dyn CredentialStore> {
        Arc::new(ChainedCredentialStore::new(vec![
            Arc::new(FileCredentialStore::new(&self.credential_path)) as Arc<dyn CredentialStore>,
            Arc::new(EnvCredentialStore),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssistConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.credential_key, DEFAULT_CREDENTIAL_KEY);
        assert_eq!(config.panel_size(), Size::new(320.0, 320.0));
        assert_eq!(config.credential_poll_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assist.toml");
        std::fs::write(
            &path,
            "endpoint = \"http://localhost:9000/chat\"\npanel_padding = 12.0\ncredential_poll_ms = 10\n",
        )
        .unwrap();
        let config = AssistConfig::load_from(&path).unwrap();
        assert_eq!(config.endpoint, "http://localhost:9000/chat");
        assert_eq!(config.panel_padding, 12.0);
        assert_eq!(config.credential_poll_interval(), Duration::from_millis(50));
    }
}
