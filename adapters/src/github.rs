//! GitHub-backed note store.
//!
//! Notes live as Markdown files in a repository; "recent" means touched by a
//! commit in the last day. The rendered digest is written back through the
//! contents API.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Duration, Utc};
use dn_core::traits::NoteStore;
use dn_core::types::{Note, NoteDiff, RecentNotes};
use errors::{DigestError, DigestResult};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

pub const GITHUB_BASE_URL: &str = "https://api.github.com";

const RECENT_WINDOW_HOURS: i64 = 24;

pub struct GitHubNoteStore {
    client: Client,
    base_url: String,
    owner: String,
    repo: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CommitListEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    files: Vec<CommitFile>,
}

#[derive(Debug, Deserialize)]
struct CommitFile {
    filename: String,
    status: String,
    #[serde(default)]
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    sha: String,
}

impl GitHubNoteStore {
    pub fn new(owner: &str, repo: &str, token: &str, base_url: &str) -> DigestResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("daybook")
            .build()
            .map_err(DigestError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: token.to_string(),
        })
    }

    fn repo_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.base_url, self.owner, self.repo, tail
        )
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> DigestResult<T> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(response.json::<T>().await?),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(DigestError::NoteStoreApi {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn raw_contents(&self, path: &str) -> DigestResult<Option<String>> {
        let response = self
            .client
            .get(self.repo_url(&format!("/contents/{path}")))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github.raw+json")
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(Some(response.text().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(DigestError::NoteStoreApi {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// Sha of an existing file, needed for contents-API updates.
    async fn existing_sha(&self, path: &str) -> DigestResult<Option<String>> {
        let response = self
            .client
            .get(self.repo_url(&format!("/contents/{path}")))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                let entry = response.json::<ContentsEntry>().await?;
                Ok(Some(entry.sha))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(DigestError::NoteStoreApi {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl NoteStore for GitHubNoteStore {
    async fn recent_notes(&self) -> DigestResult<RecentNotes> {
        let since = (Utc::now() - Duration::hours(RECENT_WINDOW_HOURS))
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let commits: Vec<CommitListEntry> = self
            .get_json(&self.repo_url(&format!("/commits?since={since}")))
            .await?;
        debug!(count = commits.len(), "recent commits fetched");

        let mut recent = RecentNotes::default();
        let mut seen = std::collections::HashSet::new();
        for commit in &commits {
            let detail: CommitDetail = self
                .get_json(&self.repo_url(&format!("/commits/{}", commit.sha)))
                .await?;
            for file in detail.files {
                if !file.filename.ends_with(".md") || !seen.insert(file.filename.clone()) {
                    continue;
                }
                if let Some(patch) = file.patch {
                    recent.diffs.push(NoteDiff {
                        filename: file.filename.clone(),
                        diff: patch,
                    });
                }
                if file.status != "removed" {
                    if let Some(body) = self.raw_contents(&file.filename).await? {
                        recent.files.push(Note {
                            filename: file.filename,
                            body,
                        });
                    }
                }
            }
        }

        info!(
            files = recent.files.len(),
            diffs = recent.diffs.len(),
            "recent notes collected"
        );
        Ok(recent)
    }

    async fn put_document(
        &self,
        filename: &str,
        folder: Option<&str>,
        content: &str,
    ) -> DigestResult<()> {
        let path = match folder {
            Some(folder) => format!("{}/{}", folder.trim_matches('/'), filename),
            None => filename.to_string(),
        };
        let sha = self.existing_sha(&path).await?;

        let mut body = json!({
            "message": format!("Add {filename}"),
            "content": STANDARD.encode(content),
        });
        if let Some(sha) = sha {
            body["message"] = json!(format!("Update {filename}"));
            body["sha"] = json!(sha);
        }

        let response = self
            .client
            .put(self.repo_url(&format!("/contents/{path}")))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DigestError::NoteStoreApi {
                status: status.as_u16(),
                message,
            });
        }
        info!(path = %path, "digest persisted");
        Ok(())
    }
}
