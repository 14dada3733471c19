//! End-to-end handler tests: requests go through the real router with the
//! real receiver and publisher; models, notes and calendar are doubles.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use config::{
    AppConfig, DigestConfig, DispatchConfig, ModelConfig, NoteStoreConfig,
};
use daybook_server::{AppState, create_router};
use dispatch::{Publisher, Receiver, sign};
use dn_core::traits::{
    CalendarClient, ChatModel, NoteStore, PageFetcher, PartialResultStore, UrlClassifier,
};
use dn_core::types::{
    CalendarEvent, Note, NoteDiff, NoteMessage, Page, QueueKeys, RecentNotes, UrlMessage,
    UrlSummary,
};
use errors::DigestResult;
use serde_json::json;
use storage::MemoryStore;
use tokio::sync::Mutex;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const CURRENT_KEY: &str = "sig_current";
const NEXT_KEY: &str = "sig_next";
const SITE: &str = "https://notes.example.com";

struct FakeModel {
    response: String,
}

#[async_trait]
impl ChatModel for FakeModel {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> DigestResult<String> {
        Ok(self.response.clone())
    }
}

struct FakeClassifier {
    useful: Vec<String>,
}

#[async_trait]
impl UrlClassifier for FakeClassifier {
    async fn useful_urls(&self, _urls: &[String]) -> DigestResult<Vec<String>> {
        Ok(self.useful.clone())
    }
}

#[derive(Default)]
struct FakeNoteStore {
    recent: RecentNotes,
    written: Mutex<Vec<(String, Option<String>, String)>>,
}

#[async_trait]
impl NoteStore for FakeNoteStore {
    async fn recent_notes(&self) -> DigestResult<RecentNotes> {
        Ok(self.recent.clone())
    }

    async fn put_document(
        &self,
        filename: &str,
        folder: Option<&str>,
        content: &str,
    ) -> DigestResult<()> {
        self.written.lock().await.push((
            filename.to_string(),
            folder.map(str::to_string),
            content.to_string(),
        ));
        Ok(())
    }
}

struct FakeFetcher;

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> DigestResult<Page> {
        Ok(Page {
            title: format!("Title of {url}"),
            text: "page text".to_string(),
        })
    }
}

struct FakeCalendar;

#[async_trait]
impl CalendarClient for FakeCalendar {
    async fn days_events(&self, _date: NaiveDate) -> DigestResult<Vec<CalendarEvent>> {
        Ok(vec![CalendarEvent {
            summary: "Standup".to_string(),
            start: Some("2026-03-14T09:00:00Z".to_string()),
            end: Some("2026-03-14T09:15:00Z".to_string()),
            location: None,
        }])
    }
}

fn test_config(dispatch_base: &str) -> AppConfig {
    AppConfig {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        site_url: SITE.to_string(),
        dispatch: DispatchConfig {
            base_url: dispatch_base.to_string(),
            token: "qstash_token".to_string(),
            current_signing_key: CURRENT_KEY.to_string(),
            next_signing_key: NEXT_KEY.to_string(),
            queue: "daily-note-queue".to_string(),
        },
        notes: NoteStoreConfig {
            owner: "me".to_string(),
            repo: "notes".to_string(),
            token: "gh".to_string(),
        },
        models: ModelConfig {
            anthropic_api_key: "ak".to_string(),
            openai_api_key: "ok".to_string(),
            summary_model: "claude-3-5-sonnet-20240620".to_string(),
            classifier_model: "gpt-4o-mini".to_string(),
        },
        calendar: None,
        digest: DigestConfig {
            name: "Daily Summary".to_string(),
            folder: Some("Inbox".to_string()),
            redis_url: "redis://unused".to_string(),
        },
        cron_secret: "cron_secret".to_string(),
        dev_mode: false,
    }
}

struct Harness {
    router: Router,
    store: Arc<MemoryStore>,
    notes: Arc<FakeNoteStore>,
}

fn harness(
    dispatch_base: &str,
    config: AppConfig,
    recent: RecentNotes,
    model_response: &str,
    useful: Vec<String>,
    calendar: Option<Arc<dyn CalendarClient>>,
) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let notes = Arc::new(FakeNoteStore {
        recent,
        written: Mutex::new(Vec::new()),
    });
    let state = AppState {
        receiver: Arc::new(Receiver::new(CURRENT_KEY, NEXT_KEY)),
        publisher: Arc::new(
            Publisher::new(dispatch_base, "qstash_token", SITE).unwrap(),
        ),
        store: store.clone(),
        notes: notes.clone(),
        model: Arc::new(FakeModel {
            response: model_response.to_string(),
        }),
        classifier: Arc::new(FakeClassifier { useful }),
        fetcher: Arc::new(FakeFetcher),
        calendar,
        config: Arc::new(config),
    };
    Harness {
        router: create_router(state),
        store,
        notes,
    }
}

fn signed_post(route: &str, body: &[u8], key: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(route)
        .header("Upstash-Signature", sign(key, body))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_vec()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn keys() -> QueueKeys {
    QueueKeys {
        notes_key: "daily-note-queue:notes:run1".to_string(),
        urls_key: "daily-note-queue:urls:run1".to_string(),
        date: "2026-03-14".to_string(),
    }
}

#[tokio::test]
async fn note_summarize_writes_partial_result() {
    let h = harness(
        "http://unused.invalid",
        test_config("http://unused.invalid"),
        RecentNotes::default(),
        "<summary>a tidy note summary</summary>",
        vec![],
        None,
    );
    let message = NoteMessage {
        note: Note {
            filename: "Ideas.md".to_string(),
            body: "raw note body".to_string(),
        },
        keys: keys(),
    };
    let body = serde_json::to_vec(&message).unwrap();

    let response = h
        .router
        .clone()
        .oneshot(signed_post("/api/notes/summarize", &body, CURRENT_KEY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");

    let entries = h.store.read_all("daily-note-queue:notes:run1").await.unwrap();
    assert_eq!(
        entries,
        vec![(
            "Ideas.md".to_string(),
            "<summary>a tidy note summary</summary>".to_string()
        )]
    );
}

#[tokio::test]
async fn next_key_signature_is_accepted() {
    let h = harness(
        "http://unused.invalid",
        test_config("http://unused.invalid"),
        RecentNotes::default(),
        "summary",
        vec![],
        None,
    );
    let message = NoteMessage {
        note: Note {
            filename: "A.md".to_string(),
            body: "b".to_string(),
        },
        keys: keys(),
    };
    let body = serde_json::to_vec(&message).unwrap();

    let response = h
        .router
        .clone()
        .oneshot(signed_post("/api/notes/summarize", &body, NEXT_KEY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn bad_signature_is_rejected_without_side_effects() {
    let h = harness(
        "http://unused.invalid",
        test_config("http://unused.invalid"),
        RecentNotes::default(),
        "summary",
        vec![],
        None,
    );
    let message = NoteMessage {
        note: Note {
            filename: "A.md".to_string(),
            body: "b".to_string(),
        },
        keys: keys(),
    };
    let body = serde_json::to_vec(&message).unwrap();

    let response = h
        .router
        .clone()
        .oneshot(signed_post("/api/notes/summarize", &body, "wrong_key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(
        h.store
            .read_all("daily-note-queue:notes:run1")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn url_scrape_stores_title_and_summary() {
    let h = harness(
        "http://unused.invalid",
        test_config("http://unused.invalid"),
        RecentNotes::default(),
        "what the page says",
        vec![],
        None,
    );
    let message = UrlMessage {
        url: "https://example.com/post".to_string(),
        keys: keys(),
    };
    let body = serde_json::to_vec(&message).unwrap();

    let response = h
        .router
        .clone()
        .oneshot(signed_post("/api/summarize/urls/scrape", &body, CURRENT_KEY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries = h.store.read_all("daily-note-queue:urls:run1").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "https://example.com/post");
    let stored: UrlSummary = serde_json::from_str(&entries[0].1).unwrap();
    assert_eq!(stored.title, "Title of https://example.com/post");
    assert_eq!(stored.summary, "what the page says");
}

#[tokio::test]
async fn daily_trigger_requires_cron_secret() {
    let h = harness(
        "http://unused.invalid",
        test_config("http://unused.invalid"),
        RecentNotes::default(),
        "x",
        vec![],
        None,
    );
    let response = h
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/summarize/daily")
                .header("Authorization", "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn daily_trigger_without_classifier_config_is_a_noop() {
    let server = MockServer::start().await;
    let mut config = test_config(&server.uri());
    config.models.openai_api_key.clear();
    let h = harness(&server.uri(), config, RecentNotes::default(), "x", vec![], None);

    let response = h
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/summarize/daily")
                .header("Authorization", "Bearer cron_secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Daily summary not configured");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn daily_trigger_fans_out_and_enqueues_aggregation_last() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let recent = RecentNotes {
        files: vec![
            Note {
                filename: "A.md".to_string(),
                body: "see https://blog.example.com/deep-dive".to_string(),
            },
            Note {
                filename: "B.md".to_string(),
                body: "plain".to_string(),
            },
        ],
        diffs: vec![NoteDiff {
            filename: "A.md".to_string(),
            diff: "@@ +new".to_string(),
        }],
    };
    let h = harness(
        &server.uri(),
        test_config(&server.uri()),
        recent,
        "x",
        vec!["https://blog.example.com/deep-dive".to_string()],
        None,
    );

    let response = h
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/summarize/daily")
                .header("Authorization", "Bearer cron_secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 2 notes + 1 diff + 1 url + 1 aggregation trigger
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 5);
    for request in &requests {
        assert!(request.url.path().starts_with("/v2/enqueue/daily-note-queue/"));
    }
    assert!(
        requests
            .last()
            .unwrap()
            .url
            .path()
            .ends_with("/api/summarize/daily")
    );

    // Every message of a run carries the identical rendezvous key set.
    let shared_keys: Vec<serde_json::Value> = requests
        .iter()
        .take(4)
        .map(|r| serde_json::from_slice::<serde_json::Value>(&r.body).unwrap()["keys"].clone())
        .collect();
    let aggregation: serde_json::Value =
        serde_json::from_slice(&requests.last().unwrap().body).unwrap();
    for keys in &shared_keys {
        assert_eq!(keys, &aggregation);
    }
}

#[tokio::test]
async fn aggregation_without_notes_produces_no_document() {
    let h = harness(
        "http://unused.invalid",
        test_config("http://unused.invalid"),
        RecentNotes::default(),
        "irrelevant",
        vec![],
        None,
    );
    let body = serde_json::to_vec(&keys()).unwrap();

    let response = h
        .router
        .clone()
        .oneshot(signed_post("/api/summarize/daily", &body, CURRENT_KEY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "No notes found");
    assert!(h.notes.written.lock().await.is_empty());
}

#[tokio::test]
async fn aggregation_renders_and_persists_the_digest() {
    let synthesis = json!({
        "overallSummary": "A focused day.",
        "interestingIdeas": ["idea"],
        "commonThemes": ["theme"],
        "questionsForExploration": ["question?"],
        "nextSteps": ["step"],
    })
    .to_string();
    let h = harness(
        "http://unused.invalid",
        test_config("http://unused.invalid"),
        RecentNotes::default(),
        &synthesis,
        vec![],
        Some(Arc::new(FakeCalendar)),
    );

    h.store
        .write_field(
            "daily-note-queue:notes:run1",
            "Ideas.md",
            "<summary>ideas summary</summary>",
        )
        .await
        .unwrap();
    h.store
        .write_field(
            "daily-note-queue:urls:run1",
            "https://example.com/post",
            &json!({ "title": "A Post", "summary": "worth reading" }).to_string(),
        )
        .await
        .unwrap();

    let body = serde_json::to_vec(&keys()).unwrap();
    let response = h
        .router
        .clone()
        .oneshot(signed_post("/api/summarize/daily", &body, CURRENT_KEY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");

    let written = h.notes.written.lock().await;
    assert_eq!(written.len(), 1);
    let (filename, folder, content) = &written[0];
    assert_eq!(filename, "Daily Summary 2026-03-14.md");
    assert_eq!(folder.as_deref(), Some("Inbox"));
    assert!(content.starts_with("# Daily Summary for March 14, 2026\n"));
    assert!(content.contains("## Calendar\n- 09:00–09:15 Standup"));
    assert!(content.contains("## Overall Summary\nA focused day."));
    assert!(content.contains("### [[Ideas]]\nideas summary"));
    assert!(content.contains("- [A Post](https://example.com/post): worth reading"));
}

#[tokio::test]
async fn dev_mode_suffixes_the_digest_filename() {
    let synthesis = json!({
        "overallSummary": "s",
        "interestingIdeas": [],
        "commonThemes": [],
        "questionsForExploration": [],
        "nextSteps": [],
    })
    .to_string();
    let mut config = test_config("http://unused.invalid");
    config.dev_mode = true;
    let h = harness(
        "http://unused.invalid",
        config,
        RecentNotes::default(),
        &synthesis,
        vec![],
        None,
    );
    h.store
        .write_field("daily-note-queue:notes:run1", "A.md", "s")
        .await
        .unwrap();

    let body = serde_json::to_vec(&keys()).unwrap();
    let response = h
        .router
        .clone()
        .oneshot(signed_post("/api/summarize/daily", &body, CURRENT_KEY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let written = h.notes.written.lock().await;
    assert_eq!(written[0].0, "Daily Summary 2026-03-14-DEV.md");
}
