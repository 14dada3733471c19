//! Fan-in: read the rendezvous hashes, synthesize the digest, render and
//! persist it.

use chrono::NaiveDate;
use dn_core::types::{CalendarEvent, DailySummary, QueueKeys, TitledSummary, UrlSummary};
use errors::{DigestError, DigestResult};
use tracing::warn;

use crate::app::AppState;
use crate::prompts;

const SYNTHESIS_MAX_TOKENS: u32 = 4000;

pub enum AggregationOutcome {
    /// A day with zero notes produces no document.
    NoNotes,
    Written { filename: String },
}

pub async fn run(state: &AppState, keys: &QueueKeys) -> DigestResult<AggregationOutcome> {
    let notes = state.store.read_all(&keys.notes_key).await?;
    if notes.is_empty() {
        return Ok(AggregationOutcome::NoNotes);
    }

    let url_entries = state.store.read_all(&keys.urls_key).await?;
    let urls: Vec<(String, UrlSummary)> = url_entries
        .into_iter()
        .filter_map(|(url, raw)| match serde_json::from_str(&raw) {
            Ok(summary) => Some((url, summary)),
            Err(e) => {
                warn!(url = %url, error = %e, "discarding unparsable url entry");
                None
            }
        })
        .collect();

    let note_projection: Vec<TitledSummary> = notes
        .iter()
        .map(|(filename, summary)| TitledSummary {
            title: filename.clone(),
            summary: summary.clone(),
        })
        .collect();
    let url_projection: Vec<TitledSummary> = urls
        .iter()
        .map(|(url, entry)| TitledSummary {
            title: entry.title.clone(),
            summary: format!("{url}: {}", entry.summary),
        })
        .collect();

    let response = state
        .model
        .complete(
            &prompts::daily_synthesis(&note_projection, &url_projection),
            SYNTHESIS_MAX_TOKENS,
        )
        .await?;
    let summary = parse_synthesis(&response)?;

    let events_section = match &state.calendar {
        Some(calendar) => {
            let date = parse_date(&keys.date)?;
            let events = calendar.days_events(date).await?;
            if events.is_empty() {
                None
            } else {
                Some(format_events(&events))
            }
        }
        None => None,
    };

    let content = render_digest(&keys.date, events_section.as_deref(), &summary, &notes, &urls);

    let filename = format!(
        "{} {}{}.md",
        state.config.digest.name,
        keys.date,
        if state.config.dev_mode { "-DEV" } else { "" }
    );
    state
        .notes
        .put_document(&filename, state.config.digest.folder.as_deref(), &content)
        .await?;

    Ok(AggregationOutcome::Written { filename })
}

/// Strict parse first; models that wrap their JSON in prose get one
/// best-effort extraction attempt before the run fails.
pub fn parse_synthesis(response: &str) -> DigestResult<DailySummary> {
    match serde_json::from_str(response) {
        Ok(parsed) => Ok(parsed),
        Err(strict_err) => adapters::ai::extract_json(response).ok_or_else(|| {
            DigestError::SynthesisParseError {
                reason: strict_err.to_string(),
            }
        }),
    }
}

fn parse_date(date: &str) -> DigestResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| DigestError::Config(format!("bad run date {date}: {e}")))
}

fn display_date(date: &str) -> String {
    parse_date(date)
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

/// Clock portion of an RFC 3339 timestamp; all-day dates and anything not
/// shaped like a timestamp pass through unchanged.
fn time_part(value: &str) -> &str {
    if value.as_bytes().get(10) == Some(&b'T') {
        if let Some(clock) = value.get(11..16) {
            return clock;
        }
    }
    value
}

pub fn format_events(events: &[CalendarEvent]) -> String {
    events
        .iter()
        .map(|event| {
            let mut line = String::from("- ");
            if let (Some(start), Some(end)) = (&event.start, &event.end) {
                line.push_str(&format!("{}–{} ", time_part(start), time_part(end)));
            }
            line.push_str(&event.summary);
            if let Some(location) = &event.location {
                line.push_str(&format!(" ({location})"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fixed-template Markdown document, with raw note and URL listings
/// appended in store order.
pub fn render_digest(
    date: &str,
    events_section: Option<&str>,
    summary: &DailySummary,
    notes: &[(String, String)],
    urls: &[(String, UrlSummary)],
) -> String {
    let mut content = format!("# Daily Summary for {}\n", display_date(date));
    if let Some(events) = events_section {
        content.push_str(&format!("## Calendar\n{events}\n"));
    }
    content.push_str(&format!(
        "## Overall Summary\n{}\n",
        summary.overall_summary
    ));
    content.push_str(&format!(
        "## Interesting Ideas\n- {}\n",
        summary.interesting_ideas.join("\n- ")
    ));
    content.push_str(&format!(
        "## Common Themes\n- {}\n",
        summary.common_themes.join("\n- ")
    ));
    content.push_str(&format!(
        "## Questions for Exploration\n- {}\n",
        summary.questions_for_exploration.join("\n- ")
    ));
    content.push_str(&format!(
        "## Possible Next Steps\n- {}",
        summary.next_steps.join("\n- ")
    ));

    if !notes.is_empty() {
        let notes_list = notes
            .iter()
            .map(|(filename, summary)| {
                format!(
                    "### [[{}]]\n{}",
                    filename.strip_suffix(".md").unwrap_or(filename),
                    summary
                        .replace("<summary>", "")
                        .replace("</summary>", "")
                        .trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        content.push_str(&format!("\n---\n## Notes\n{notes_list}"));
    }
    if !urls.is_empty() {
        let urls_list = urls
            .iter()
            .map(|(url, entry)| {
                if entry.summary.is_empty() {
                    format!("- [{}]({url})", entry.title)
                } else {
                    format!("- [{}]({url}): {}", entry.title, entry.summary)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        content.push_str(&format!("\n---\n## Urls\n{urls_list}"));
    }

    content
}
