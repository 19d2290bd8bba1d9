//! Callback delivery over real HTTP against a local axum server.

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use idv_04_callback_delivery::{
    CallbackDeliveryApi, CallbackRequest, DeliveryConfig, DeliveryEngine, DeliveryFailure,
    DeliveryOutcome, FixedPredicate, PredicateRegistry, RecordingResponseHandler,
    ResponseHandler, ResponseHandlerRegistry, RetryPredicate, ReqwestTransport,
    MAX_RESPONSE_BYTES,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_store::InMemoryStore;
use shared_types::InMemoryMetrics;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

type Received = Arc<Mutex<Vec<Value>>>;

async fn ok(State(received): State<Received>, Json(body): Json<Value>) -> Json<Value> {
    received.lock().push(body);
    Json(json!({ "received": true }))
}

async fn spawn_endpoint() -> (SocketAddr, Received) {
    let received: Received = Arc::default();
    let oversized = MAX_RESPONSE_BYTES + 1024;
    let app = Router::new()
        .route("/ok", post(ok))
        .route(
            "/status500",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/big", post(move || async move { "x".repeat(oversized) }))
        .route(
            "/stream",
            post(move || async move {
                let chunks = (0..oversized / (64 * 1024) + 1)
                    .map(|_| Ok::<_, std::io::Error>(vec![b'x'; 64 * 1024]));
                Body::from_stream(futures::stream::iter(chunks))
            }),
        )
        .with_state(received.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, received)
}

fn engine() -> (DeliveryEngine, Arc<RecordingResponseHandler>) {
    let predicates = Arc::new(PredicateRegistry::new());
    predicates.register(
        "never",
        Arc::new(FixedPredicate::new(false)) as Arc<dyn RetryPredicate>,
    );
    let responses = Arc::new(RecordingResponseHandler::new());
    let handlers = Arc::new(ResponseHandlerRegistry::new());
    handlers.register("record", responses.clone() as Arc<dyn ResponseHandler>);

    let transport = ReqwestTransport::new(Duration::from_secs(5), MAX_RESPONSE_BYTES).unwrap();
    let engine = DeliveryEngine::new(
        DeliveryConfig::for_testing("rp-1"),
        Arc::new(InMemoryStore::new()),
        Arc::new(transport),
        predicates,
        handlers,
        Arc::new(InMemoryMetrics::new()),
    );
    (engine, responses)
}

async fn deliver(engine: &DeliveryEngine, request: CallbackRequest) -> DeliveryOutcome {
    engine.deliver(request).await.unwrap().outcome().await
}

#[tokio::test]
async fn test_json_body_reaches_endpoint() {
    let (addr, received) = spawn_endpoint().await;
    let (engine, responses) = engine();

    let outcome = deliver(
        &engine,
        CallbackRequest::new(format!("http://{}/ok", addr), json!({"status": "verified"}))
            .with_retry()
            .with_response_handler("record"),
    )
    .await;

    match outcome {
        DeliveryOutcome::Delivered(response) => {
            assert_eq!(response.status, 200);
            assert!(response.body.contains("received"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(received.lock().clone(), vec![json!({"status": "verified"})]);
    assert_eq!(responses.calls().len(), 1);
}

#[tokio::test]
async fn test_error_status_is_still_delivered() {
    let (addr, _) = spawn_endpoint().await;
    let (engine, _) = engine();

    let outcome = deliver(
        &engine,
        CallbackRequest::new(format!("http://{}/status500", addr), json!({})),
    )
    .await;

    match outcome {
        DeliveryOutcome::Delivered(response) => {
            assert_eq!(response.status, 500);
            assert_eq!(response.body, "boom");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_oversized_response_is_terminal() {
    let (addr, _) = spawn_endpoint().await;
    let (engine, responses) = engine();

    for path in ["big", "stream"] {
        let outcome = deliver(
            &engine,
            CallbackRequest::new(format!("http://{}/{}", addr, path), json!({}))
                .with_retry()
                .with_response_handler("record"),
        )
        .await;
        assert_eq!(
            outcome,
            DeliveryOutcome::Failed(DeliveryFailure::BodyTooLarge {
                limit: MAX_RESPONSE_BYTES
            }),
            "path /{}",
            path
        );
    }
    assert_eq!(responses.calls().len(), 2);
    assert!(engine.in_flight().is_empty());
}

#[tokio::test]
async fn test_unreachable_endpoint_vetoed_by_predicate() {
    let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = unused.local_addr().unwrap();
    drop(unused);
    let (engine, _) = engine();

    let outcome = deliver(
        &engine,
        CallbackRequest::new(format!("http://{}/cb", addr), json!({}))
            .with_retry()
            .with_should_retry("never"),
    )
    .await;

    assert_eq!(
        outcome,
        DeliveryOutcome::Failed(DeliveryFailure::RetryVetoed { attempts: 1 })
    );
}
