use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use perkpass_codec::BearerToken;
use perkpass_nullables::{NullClock, NullStore};
use perkpass_redemption::{RedemptionEvent, Stores, TerminalRegistry};
use perkpass_rpc::{router, EventSink, RpcState};
use perkpass_types::{
    Benefit, BenefitId, BusinessId, Clock, Member, MemberId, MembershipType, RedemptionParams,
    Timestamp,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const NOW: u64 = 1_720_000_000;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(String, RedemptionEvent)>>,
}

impl EventSink for RecordingSink {
    fn record_events(&self, terminal: &str, events: &[RedemptionEvent]) {
        let mut seen = self.events.lock().unwrap();
        seen.extend(events.iter().cloned().map(|e| (terminal.to_string(), e)));
    }
}

struct Harness {
    app: Router,
    terminals: Arc<TerminalRegistry>,
    store: Arc<NullStore>,
    clock: Arc<NullClock>,
    sink: Arc<RecordingSink>,
    business: BusinessId,
    member: Member,
}

fn harness(metrics: Option<prometheus::Registry>) -> Harness {
    let store = Arc::new(NullStore::new());
    let clock = Arc::new(NullClock::new(NOW));
    let sink = Arc::new(RecordingSink::default());
    let business = BusinessId::random();
    let member = Member::provision(
        MemberId::random(),
        "sol@example.com",
        "Sol",
        MembershipType::Tourist,
        Timestamp::new(NOW - 60),
    );
    store.put_member(member.clone());
    store.put_benefit(Benefit {
        id: BenefitId::new(3),
        business_id: business,
        description: "2x1 cocktails".into(),
        discount_percent: 50,
        usage_limit: 1,
        valid_from: None,
        valid_to: Some(Timestamp::new(NOW + 86_400)),
        active: true,
    });

    let stores = Stores::shared(Arc::clone(&store));
    let registry = TerminalRegistry::new(
        stores.clone(),
        Arc::clone(&clock) as Arc<dyn Clock>,
        RedemptionParams::default(),
    );
    let terminals = Arc::new(registry);
    let state = Arc::new(RpcState {
        started_at: clock.now(),
        clock: Arc::clone(&clock) as Arc<dyn Clock>,
        terminals: Arc::clone(&terminals),
        redemptions: stores.redemptions,
        metrics_registry: metrics,
        events: Arc::clone(&sink) as Arc<dyn EventSink>,
    });
    Harness {
        app: router(state),
        terminals,
        store,
        clock,
        sink,
        business,
        member,
    }
}

fn code_for(member: MemberId) -> String {
    perkpass_codec::encode(&BearerToken::new(member, NOW * 1_000, "zz9plq"))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

async fn register(h: &Harness, terminal: &str) {
    let (status, body) = call(
        &h.app,
        "POST",
        "/terminals",
        Some(json!({ "terminal_id": terminal, "business_id": h.business.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"], "idle");
}

#[tokio::test]
async fn submit_confirm_flow_over_http() {
    let h = harness(None);
    register(&h, "bar").await;

    let (status, verified) = call(
        &h.app,
        "POST",
        "/terminals/bar/submit",
        Some(json!({ "code": code_for(h.member.id) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["benefit"]["id"], 3);

    let (_, state) = call(&h.app, "GET", "/terminals/bar", None).await;
    assert_eq!(state["state"], "awaiting_confirmation");
    assert_eq!(state["pending"]["member_name"], "Sol");
    assert_eq!(state["pending"]["confirm_by"], NOW + 120);

    let (status, conflict) = call(
        &h.app,
        "POST",
        "/terminals/bar/submit",
        Some(json!({ "code": code_for(h.member.id) })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(conflict["error"]
        .as_str()
        .unwrap()
        .starts_with("OperationInProgress"));

    let (status, confirmed) = call(&h.app, "POST", "/terminals/bar/confirm", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["success"], true);
    assert_eq!(h.store.redemptions().len(), 1);

    let (_, done) = call(&h.app, "GET", "/terminals/bar", None).await;
    assert_eq!(done["state"], "done");
    assert_eq!(done["redemption"]["benefit_id"], 3);

    let recorded = h.sink.events.lock().unwrap();
    assert!(recorded
        .iter()
        .any(|(t, e)| t == "bar" && matches!(e, RedemptionEvent::Committed { .. })));
}

#[tokio::test]
async fn rejected_scan_is_a_structured_200() {
    let h = harness(None);
    register(&h, "door").await;

    let (status, body) = call(
        &h.app,
        "POST",
        "/terminals/door/submit",
        Some(json!({ "code": "@@not-base64@@" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert!(body["message"].as_str().unwrap().starts_with("NotBase64"));
    assert!(body.get("member").is_none());

    let (_, state) = call(&h.app, "GET", "/terminals/door", None).await;
    assert_eq!(state["state"], "rejected");

    let (_, dismissed) = call(&h.app, "POST", "/terminals/door/dismiss", None).await;
    assert_eq!(dismissed["state"], "idle");
}

#[tokio::test]
async fn cancel_and_timeout_are_reported() {
    let h = harness(None);
    register(&h, "till").await;
    let submit = json!({ "code": code_for(h.member.id), "benefit_id": 3 });

    call(&h.app, "POST", "/terminals/till/submit", Some(submit.clone())).await;
    let (status, cancelled) = call(&h.app, "POST", "/terminals/till/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["state"], "cancelled");
    assert_eq!(cancelled["reason"], "cancelled by operator");

    let (status, _) = call(&h.app, "POST", "/terminals/till/cancel", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    call(&h.app, "POST", "/terminals/till/submit", Some(submit)).await;
    h.clock.advance(121);
    let (_, state) = call(&h.app, "GET", "/terminals/till", None).await;
    assert_eq!(state["state"], "cancelled");
    assert_eq!(state["reason"], "confirmation timed out");
    assert!(h.store.redemptions().is_empty());
}

#[tokio::test]
async fn unknown_terminal_and_bad_ids() {
    let h = harness(None);
    let (status, _) = call(&h.app, "POST", "/terminals/ghost/confirm", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &h.app,
        "POST",
        "/terminals",
        Some(json!({ "terminal_id": "t", "business_id": "not-a-uuid" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    register(&h, "t").await;
    let (status, _) = call(
        &h.app,
        "POST",
        "/terminals",
        Some(json!({ "terminal_id": "t", "business_id": BusinessId::random().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&h.app, "DELETE", "/terminals/t", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&h.app, "GET", "/terminals/t", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&h.app, "GET", "/members/xyz/redemptions", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_reports_uptime_from_clock() {
    let h = harness(None);
    register(&h, "lane").await;
    h.clock.advance(42);

    let (status, body) = call(&h.app, "GET", "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["uptime_secs"], 42);
    assert_eq!(body["terminals"], 1);
    assert_eq!(body["awaiting_confirmation"], 0);
}

#[tokio::test]
async fn re_registering_a_busy_terminal_does_not_stall_the_runtime() {
    let h = harness(None);
    register(&h, "lane").await;

    let handle = h.terminals.get("lane").unwrap();
    let (locked_tx, locked_rx) = std::sync::mpsc::channel();
    let holder = std::thread::spawn(move || {
        let _terminal = perkpass_redemption::lock_terminal(&handle);
        locked_tx.send(()).unwrap();
        std::thread::sleep(Duration::from_millis(300));
    });
    locked_rx.recv().unwrap();

    let body = json!({ "terminal_id": "lane", "business_id": h.business.to_string() });
    let (registered, ticked) = tokio::join!(
        async {
            let (status, _) = call(&h.app, "POST", "/terminals", Some(body)).await;
            (status, Instant::now())
        },
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Instant::now()
        }
    );
    holder.join().unwrap();

    assert_eq!(registered.0, StatusCode::CREATED);
    assert!(ticked < registered.1);
}

#[tokio::test]
async fn business_history_is_paginated_newest_first() {
    let h = harness(None);
    register(&h, "till").await;

    for _ in 0..3 {
        let member = Member::provision(
            MemberId::random(),
            "x@example.com",
            "X",
            MembershipType::Resident,
            Timestamp::new(NOW),
        );
        h.store.put_member(member.clone());
        call(
            &h.app,
            "POST",
            "/terminals/till/submit",
            Some(json!({ "code": code_for(member.id) })),
        )
        .await;
        call(&h.app, "POST", "/terminals/till/confirm", None).await;
        h.clock.advance(10);
    }

    let uri = format!("/businesses/{}/redemptions?count=2", h.business);
    let (status, first) = call(&h.app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let items = first["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["used_at"], NOW + 20);
    assert_eq!(items[1]["used_at"], NOW + 10);

    let cursor = first["cursor"].as_str().unwrap();
    let uri = format!("/businesses/{}/redemptions?count=2&cursor={cursor}", h.business);
    let (_, second) = call(&h.app, "GET", &uri, None).await;
    assert_eq!(second["items"].as_array().unwrap().len(), 1);
    assert!(second.get("cursor").is_none());

    let uri = format!("/businesses/{}/redemptions?since={}", h.business, NOW + 15);
    let (_, recent) = call(&h.app, "GET", &uri, None).await;
    assert_eq!(recent["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn metrics_endpoint_requires_registry() {
    let h = harness(None);
    let (status, _) = call(&h.app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let registry = prometheus::Registry::new();
    let counter = prometheus::IntCounter::new("perkpass_test_total", "test").unwrap();
    registry.register(Box::new(counter.clone())).unwrap();
    counter.inc();
    let h = harness(Some(registry));
    let (status, body) = call(&h.app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("perkpass_test_total 1"));
}
