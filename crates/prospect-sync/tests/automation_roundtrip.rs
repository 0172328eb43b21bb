//! Protocol tests against a mock automation tool served by axum.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};

use prospect_core::memory::MemoryStore;
use prospect_sync::{
    Error, HttpSearchTrigger, InboundStatus, IntakeOutcome, LeadIntake, LeadsPayload,
    SearchRepository, SearchService, SearchStatus, SearchStatusUpdate, SearchTrigger,
    TriggerDispatch, TriggerPayload,
};

#[derive(Clone)]
struct MockAutomation {
    received: Arc<Mutex<Vec<Value>>>,
    status: StatusCode,
    body: String,
    delay: Duration,
}

async fn receive(
    State(mock): State<MockAutomation>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    mock.received.lock().unwrap().push(body);
    if !mock.delay.is_zero() {
        tokio::time::sleep(mock.delay).await;
    }
    (mock.status, mock.body.clone())
}

/// Spawn the mock tool and return its trigger URL plus the payload log.
async fn spawn_automation(
    status: StatusCode,
    body: &str,
    delay: Duration,
) -> (String, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let mock = MockAutomation {
        received: received.clone(),
        status,
        body: body.to_string(),
        delay,
    };
    let router = Router::new()
        .route("/trigger", post(receive))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}/trigger", addr), received)
}

fn start_payload(search_id: i64) -> TriggerPayload {
    TriggerPayload {
        search_id,
        query: Some("restaurants SP".to_string()),
        next_page_token: None,
        requested_by: None,
    }
}

#[tokio::test]
async fn test_trigger_posts_json_payload() {
    let (url, received) = spawn_automation(StatusCode::OK, "accepted", Duration::ZERO).await;
    let trigger = HttpSearchTrigger::new(url, Duration::from_secs(5)).unwrap();

    trigger.fire(&start_payload(7)).await.unwrap();

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], json!({ "search_id": 7, "query": "restaurants SP" }));
}

#[tokio::test]
async fn test_trigger_reports_status_and_truncated_body() {
    let long_body = "x".repeat(2000);
    let (url, _) =
        spawn_automation(StatusCode::SERVICE_UNAVAILABLE, &long_body, Duration::ZERO).await;
    let trigger = HttpSearchTrigger::new(url, Duration::from_secs(5)).unwrap();

    let err = trigger.fire(&start_payload(1)).await.unwrap_err();
    let Error::Request(message) = err else {
        panic!("expected request error");
    };
    assert!(message.starts_with("Automation tool returned HTTP 503: "));
    assert!(message.len() < 600);
}

#[tokio::test]
async fn test_trigger_times_out() {
    let (url, _) = spawn_automation(StatusCode::OK, "", Duration::from_secs(3)).await;
    let trigger = HttpSearchTrigger::new(url, Duration::from_secs(1)).unwrap();

    let err = trigger.fire(&start_payload(1)).await.unwrap_err();
    let Error::Request(message) = err else {
        panic!("expected request error");
    };
    assert!(message.contains("did not respond within 1s"), "{}", message);
}

#[tokio::test]
async fn test_trigger_connection_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let trigger =
        HttpSearchTrigger::new(format!("http://{}/trigger", addr), Duration::from_secs(2)).unwrap();
    let err = trigger.fire(&start_payload(1)).await.unwrap_err();
    assert!(matches!(err, Error::Request(_)));
}

#[tokio::test]
async fn test_failed_trigger_leaves_search_in_error() {
    let (url, _) =
        spawn_automation(StatusCode::INTERNAL_SERVER_ERROR, "down", Duration::ZERO).await;
    let store = MemoryStore::new();
    let trigger = HttpSearchTrigger::new(url, Duration::from_secs(5)).unwrap();
    let service = SearchService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Some(Arc::new(trigger)),
        TriggerDispatch::Inline,
    );

    let err = service.start_search("cafes", None).await.unwrap_err();
    let Error::Trigger { search_id, .. } = err else {
        panic!("expected trigger error");
    };

    let search = store.get(search_id).await.unwrap().unwrap();
    assert_eq!(search.status, SearchStatus::Error);
    assert_eq!(
        search.error_message.as_deref(),
        Some("Automation tool returned HTTP 500: down")
    );
}

#[tokio::test]
async fn test_end_to_end_pagination_round() {
    let (url, received) = spawn_automation(StatusCode::OK, "ok", Duration::ZERO).await;
    let store = MemoryStore::new();
    let trigger = HttpSearchTrigger::new(url, Duration::from_secs(5)).unwrap();
    let service = SearchService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Some(Arc::new(trigger)),
        TriggerDispatch::Inline,
    );
    let intake = LeadIntake::new(Arc::new(store.clone()), Arc::new(store.clone()));

    // Start: the tool acknowledges, the search is processing.
    let search = service.start_search("restaurants SP", None).await.unwrap().search;
    assert_eq!(search.status, SearchStatus::Processing);

    // Leads: two valid, one missing its email key.
    let lead = |name: &str| {
        json!({
            "search_id": search.id,
            "nome_empresa": name,
            "contato_telefonico": "11 98888-7777",
            "email": "contato@example.com",
            "endereco": "Av. Paulista, 1000",
            "resumo_atividade": "Restaurant"
        })
    };
    let mut broken = lead("Sem Email");
    broken.as_object_mut().unwrap().remove("email");
    let body = serde_json::to_vec(&json!([lead("Bistro"), broken, lead("Trattoria")])).unwrap();

    let payload = LeadsPayload::from_slice(&body).unwrap();
    let IntakeOutcome::Batch(report) = intake.ingest(payload).await.unwrap() else {
        panic!("expected batch outcome");
    };
    assert_eq!(report.created(), 2);
    assert_eq!(report.failed(), 1);

    // The tool reports another page.
    let body = json!({
        "search_id": search.id,
        "status": "pending_next",
        "next_page_token": "abc"
    });
    let update = SearchStatusUpdate::from_slice(&serde_json::to_vec(&body).unwrap()).unwrap();
    assert_eq!(update.search_id, search.id);
    assert_eq!(update.status, InboundStatus::PendingNext);
    let applied = service.apply_remote_update(&update).await.unwrap();
    assert_eq!(applied.search.status, SearchStatus::PendingNext);

    // Next page: the token goes out, the search is processing again.
    let next = service.search_next_page(search.id, None).await.unwrap();
    assert_eq!(next.search.status, SearchStatus::Processing);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[1]["search_id"], search.id);
    assert_eq!(received[1]["next_page_token"], "abc");
}
