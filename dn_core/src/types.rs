//! Wire and domain types shared across the pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Route paths understood by both the dispatcher and the server router.
pub mod routes {
    pub const NOTE_SUMMARIZE: &str = "/api/notes/summarize";
    pub const DIFF_SUMMARIZE: &str = "/api/notes/diffs/summarize";
    pub const URL_SCRAPE: &str = "/api/summarize/urls/scrape";
    pub const DAILY_SUMMARIZE: &str = "/api/summarize/daily";
}

/// Rendezvous key set generated once per enumeration run.
///
/// Every message fanned out by one run carries an identical copy, so the
/// partial results of that run converge on the same two hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueKeys {
    pub notes_key: String,
    pub urls_key: String,
    /// `YYYY-MM-DD` identity of the run.
    pub date: String,
}

impl QueueKeys {
    pub fn generate(queue: &str, date: NaiveDate) -> Self {
        let run = Uuid::new_v4();
        Self {
            notes_key: format!("{queue}:notes:{run}"),
            urls_key: format!("{queue}:urls:{run}"),
            date: date.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub filename: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDiff {
    pub filename: String,
    pub diff: String,
}

/// Recently-edited material fetched from the note-storage collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentNotes {
    pub files: Vec<Note>,
    pub diffs: Vec<NoteDiff>,
}

/// Stored value for a scraped URL, serialized as JSON into the urls hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlSummary {
    pub title: String,
    pub summary: String,
}

/// Structured schema the synthesis model is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub overall_summary: String,
    pub interesting_ideas: Vec<String>,
    pub common_themes: Vec<String>,
    pub questions_for_exploration: Vec<String>,
    pub next_steps: Vec<String>,
}

/// A `{title, summary}` projection handed to the synthesis prompt.
#[derive(Debug, Clone, Serialize)]
pub struct TitledSummary {
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteMessage {
    pub note: Note,
    pub keys: QueueKeys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffMessage {
    pub diff: NoteDiff,
    pub keys: QueueKeys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlMessage {
    pub url: String,
    pub keys: QueueKeys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
}

/// A fetched web page reduced to what summarization needs.
#[derive(Debug, Clone)]
pub struct Page {
    pub title: String,
    pub text: String,
}
