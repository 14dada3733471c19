//! Prompt construction for the summarization and synthesis calls.

use dn_core::types::TitledSummary;

pub fn note_summary(body: &str) -> String {
    format!(
        "Summarize the following note in a few sentences, keeping concrete details \
         and decisions. Respond with only the summary, wrapped in <summary> tags.\n\n\
         Note:\n{body}"
    )
}

pub fn diff_summary(diff: &str) -> String {
    format!(
        "The following is a unified diff of changes made to a personal note today. \
         Summarize what changed in a few sentences. Respond with only the summary, \
         wrapped in <summary> tags.\n\n\
         Diff:\n{diff}"
    )
}

pub fn url_summary(title: &str, text: &str) -> String {
    format!(
        "Summarize the key points of the following web page in a few sentences. \
         Respond with only the summary.\n\n\
         Title: {title}\n\nContent:\n{text}"
    )
}

/// Single synthesis call: both projections go in, one structured JSON
/// document comes out.
pub fn daily_synthesis(notes: &[TitledSummary], urls: &[TitledSummary]) -> String {
    let notes_json = serde_json::to_string_pretty(notes).unwrap_or_default();
    let urls_json = serde_json::to_string_pretty(urls).unwrap_or_default();
    format!(
        "You are given summaries of today's edited notes and of URLs referenced in \
         them. Synthesize them into a daily digest. Respond with ONLY a JSON object \
         in exactly this shape:\n\
         {{\"overallSummary\": string, \"interestingIdeas\": string[], \
         \"commonThemes\": string[], \"questionsForExploration\": string[], \
         \"nextSteps\": string[]}}\n\n\
         Notes:\n{notes_json}\n\nUrls:\n{urls_json}"
    )
}
