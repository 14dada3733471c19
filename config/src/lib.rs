//! Application configuration, constructed once at startup and passed into
//! each component explicitly.
//!
//! Every value comes from the environment; `validate` runs after loading so
//! presence checks are not scattered through the handlers.

use errors::{DigestError, DigestResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Public base URL of this service; message destinations are formed by
    /// appending route paths to it.
    pub site_url: String,

    pub dispatch: DispatchConfig,
    pub notes: NoteStoreConfig,
    pub models: ModelConfig,
    #[serde(default)]
    pub calendar: Option<CalendarConfig>,
    pub digest: DigestConfig,

    /// Bearer secret required by the cron entry point.
    pub cron_secret: String,
    /// Development mode skips cron auth and suffixes output filenames.
    #[serde(default)]
    pub dev_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Base URL of the QStash-compatible delivery provider.
    pub base_url: String,
    pub token: String,
    pub current_signing_key: String,
    pub next_signing_key: String,
    #[serde(default = "default_queue")]
    pub queue: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteStoreConfig {
    pub owner: String,
    pub repo: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
    #[serde(default = "default_classifier_model")]
    pub classifier_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub client_email: String,
    pub private_key: String,
    pub calendar_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Leading part of the output filename, e.g. "Daily Summary".
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    /// Redis connection string for the partial-result store.
    pub redis_url: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_queue() -> String {
    "daily-note-queue".to_string()
}

fn default_summary_model() -> String {
    "claude-3-5-sonnet-20240620".to_string()
}

fn default_classifier_model() -> String {
    "gpt-4o-mini".to_string()
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn require(name: &str) -> DigestResult<String> {
    env(name).ok_or_else(|| DigestError::Config(format!("{name} is not set")))
}

impl AppConfig {
    pub fn from_env() -> DigestResult<Self> {
        let calendar = match (env("GOOGLE_CLIENT_EMAIL"), env("GOOGLE_PRIVATE_KEY")) {
            (Some(client_email), Some(private_key)) => Some(CalendarConfig {
                client_email,
                private_key,
                calendar_id: env("GOOGLE_CALENDAR_ID").unwrap_or_else(|| "primary".to_string()),
            }),
            _ => None,
        };

        let config = Self {
            bind_address: env("DAYBOOK_BIND_ADDRESS").unwrap_or_else(default_bind_address),
            port: env("DAYBOOK_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(default_port),
            site_url: require("SITE_URL")?,
            dispatch: DispatchConfig {
                base_url: require("QSTASH_URL")?,
                token: require("QSTASH_TOKEN")?,
                current_signing_key: require("QSTASH_CURRENT_SIGNING_KEY")?,
                next_signing_key: require("QSTASH_NEXT_SIGNING_KEY")?,
                queue: env("DAILY_NOTE_QUEUE").unwrap_or_else(default_queue),
            },
            notes: NoteStoreConfig {
                owner: require("GITHUB_USERNAME")?,
                repo: require("GITHUB_REPO")?,
                token: require("GITHUB_TOKEN")?,
            },
            models: ModelConfig {
                anthropic_api_key: require("ANTHROPIC_API_KEY")?,
                openai_api_key: env("OPENAI_API_KEY").unwrap_or_default(),
                summary_model: env("SUMMARY_MODEL").unwrap_or_else(default_summary_model),
                classifier_model: env("CLASSIFIER_MODEL")
                    .unwrap_or_else(default_classifier_model),
            },
            calendar,
            digest: DigestConfig {
                name: env("DAILY_SUMMARY_NAME").unwrap_or_else(|| "Daily Summary".to_string()),
                folder: env("DAILY_SUMMARY_FOLDER"),
                redis_url: require("REDIS_URL")?,
            },
            cron_secret: require("CRON_SECRET")?,
            dev_mode: env("DAYBOOK_DEV_MODE").is_some_and(|v| v == "true" || v == "1"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DigestResult<()> {
        if !self.site_url.starts_with("http") {
            return Err(DigestError::Config(format!(
                "SITE_URL must be absolute, got {}",
                self.site_url
            )));
        }
        if self.site_url.ends_with('/') {
            return Err(DigestError::Config(
                "SITE_URL must not carry a trailing slash".to_string(),
            ));
        }
        if self.dispatch.queue.is_empty() {
            return Err(DigestError::Config("queue name must not be empty".to_string()));
        }
        Ok(())
    }

    /// The daily trigger treats absent classifier credentials as "daily
    /// summaries disabled" and no-ops rather than failing.
    pub fn enumeration_enabled(&self) -> bool {
        !self.models.openai_api_key.is_empty() && !self.digest.name.is_empty()
    }
}
