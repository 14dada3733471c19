//! Google Calendar client authenticated with a service account.
//!
//! Only wired in when calendar credentials are configured; the digest simply
//! omits its events section otherwise.

use async_trait::async_trait;
use chrono::NaiveDate;
use config::CalendarConfig;
use dn_core::traits::CalendarClient;
use dn_core::types::CalendarEvent;
use errors::{DigestError, DigestResult};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_CALENDAR_URL: &str = "https://www.googleapis.com/calendar/v3";

const SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

pub struct GoogleCalendarClient {
    client: Client,
    config: CalendarConfig,
    token_url: String,
    api_url: String,
}

#[derive(Debug, Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    start: Option<EventTime>,
    #[serde(default)]
    end: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

impl EventTime {
    fn display(&self) -> Option<String> {
        self.date_time.clone().or_else(|| self.date.clone())
    }
}

impl GoogleCalendarClient {
    pub fn new(config: CalendarConfig) -> DigestResult<Self> {
        Self::with_endpoints(config, GOOGLE_TOKEN_URL, GOOGLE_CALENDAR_URL)
    }

    pub fn with_endpoints(
        config: CalendarConfig,
        token_url: &str,
        api_url: &str,
    ) -> DigestResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .map_err(DigestError::Http)?;
        Ok(Self {
            client,
            config,
            token_url: token_url.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn access_token(&self) -> DigestResult<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = TokenClaims {
            iss: &self.config.client_email,
            scope: SCOPE,
            aud: &self.token_url,
            exp: now + 3600,
            iat: now,
        };
        let key = EncodingKey::from_rsa_pem(self.config.private_key.as_bytes())
            .map_err(|e| DigestError::Calendar(format!("invalid service-account key: {e}")))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| DigestError::Calendar(format!("signing token request: {e}")))?;

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DigestError::Calendar(format!(
                "token exchange failed: {status} - {message}"
            )));
        }
        Ok(response.json::<TokenResponse>().await?.access_token)
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarClient {
    async fn days_events(&self, date: NaiveDate) -> DigestResult<Vec<CalendarEvent>> {
        let token = self.access_token().await?;
        let time_min = format!("{date}T00:00:00Z");
        let time_max = format!("{date}T23:59:59Z");

        let response = self
            .client
            .get(format!(
                "{}/calendars/{}/events",
                self.api_url, self.config.calendar_id
            ))
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DigestError::Calendar(format!(
                "event listing failed: {status} - {message}"
            )));
        }

        let list = response.json::<EventList>().await?;
        debug!(count = list.items.len(), "calendar events fetched");
        Ok(list
            .items
            .into_iter()
            .map(|item| CalendarEvent {
                summary: item.summary.unwrap_or_else(|| "(untitled)".to_string()),
                start: item.start.and_then(|t| t.display()),
                end: item.end.and_then(|t| t.display()),
                location: item.location,
            })
            .collect())
    }
}
