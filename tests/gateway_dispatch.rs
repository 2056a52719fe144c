//! Dispatcher behavior against an in-process backend.

use async_trait::async_trait;
use backend_gateway::secrets::MemorySecretStore;
use backend_gateway::signer::compute_tag;
use backend_gateway::transport::Transport;
use backend_gateway::{
    Envelope, Error, ErrorContext, Gateway, Identity, Operation, OperationKind, Result,
};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Box<dyn Fn(&Envelope, usize) -> Result<Value> + Send + Sync>;

/// Backend that records every envelope and answers after a fixed latency.
struct FakeBackend {
    calls: AtomicUsize,
    seen: Mutex<Vec<Envelope>>,
    latency: Duration,
    respond: Responder,
}

impl FakeBackend {
    fn new(respond: impl Fn(&Envelope, usize) -> Result<Value> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            latency: Duration::from_millis(50),
            respond: Box::new(respond),
        })
    }

    /// Echoes the call number so distinct network calls are distinguishable.
    fn counting() -> Arc<Self> {
        Self::new(|env, n| {
            Ok(json!({
                "status": "success",
                "data": { "operation": env.operation, "call": n },
                "count": 1
            }))
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn envelopes(&self) -> Vec<Envelope> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, envelope: &Envelope, request_id: &str) -> Result<Value> {
        assert!(!request_id.is_empty());
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen.lock().unwrap().push(envelope.clone());
        tokio::time::sleep(self.latency).await;
        (self.respond)(envelope, n)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn gateway(backend: &Arc<FakeBackend>, secrets: MemorySecretStore) -> Gateway {
    Gateway::builder()
        .transport(backend.clone())
        .secret_store(Arc::new(secrets))
        .build()
        .expect("gateway builds with injected transport")
}

fn transport_down() -> Error {
    Error::Transport(backend_gateway::transport::TransportError::Other(
        "connection refused".into(),
    ))
}

#[tokio::test(start_paused = true)]
async fn concurrent_identical_calls_share_one_round_trip() {
    let backend = FakeBackend::counting();
    let gw = gateway(&backend, MemorySecretStore::new());
    let op = Operation::read("GET_QUEUE");
    let who = Identity::client("client-1");

    let calls = (0..5).map(|_| gw.call(&op, json!({ "id": "abc" }), &who));
    let results = join_all(calls).await;

    assert_eq!(backend.calls(), 1);
    let first = results[0].as_ref().unwrap();
    for r in &results {
        assert_eq!(r.as_ref().unwrap(), first);
    }
    assert_eq!(gw.signals().inflight, 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_mutations_are_coalesced_too() {
    let backend = FakeBackend::counting();
    let gw = gateway(&backend, MemorySecretStore::new());
    let op = Operation::mutating("ADD_LEADS");
    let who = Identity::Admin;

    let (a, b) = tokio::join!(
        gw.call(&op, json!({ "leads": ["x"] }), &who),
        gw.call(&op, json!({ "leads": ["x"] }), &who),
    );
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn distinct_payloads_are_not_coalesced() {
    let backend = FakeBackend::counting();
    let gw = gateway(&backend, MemorySecretStore::new());
    let op = Operation::read("GET_QUEUE");
    let who = Identity::Anonymous;

    let (a, b) = tokio::join!(
        gw.call(&op, json!({ "id": "a" }), &who),
        gw.call(&op, json!({ "id": "b" }), &who),
    );
    assert_ne!(a.unwrap(), b.unwrap());
    assert_eq!(backend.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn read_results_are_cached_for_the_freshness_window() {
    let backend = FakeBackend::counting();
    let gw = gateway(&backend, MemorySecretStore::new());
    let op = Operation::read("GET_QUEUE");
    let who = Identity::client("client-1");

    let first = gw.call(&op, json!({ "id": "abc" }), &who).await.unwrap();
    tokio::time::advance(Duration::from_millis(100)).await;
    let second = gw.call(&op, json!({ "id": "abc" }), &who).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(backend.calls(), 1);

    tokio::time::advance(Duration::from_secs(6)).await;
    let third = gw.call(&op, json!({ "id": "abc" }), &who).await.unwrap();
    assert_eq!(backend.calls(), 2);
    assert_ne!(first, third);
}

#[tokio::test(start_paused = true)]
async fn freshness_boundary_is_exclusive() {
    let backend = FakeBackend::counting();
    let gw = gateway(&backend, MemorySecretStore::new());
    let op = Operation::read("GET_STATS");
    let who = Identity::Anonymous;

    gw.call(&op, Value::Null, &who).await.unwrap();
    // the entry is stamped when the response arrives
    tokio::time::advance(Duration::from_millis(4999)).await;
    gw.call(&op, Value::Null, &who).await.unwrap();
    assert_eq!(backend.calls(), 1);

    tokio::time::advance(Duration::from_millis(1)).await;
    gw.call(&op, Value::Null, &who).await.unwrap();
    assert_eq!(backend.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn mutations_never_touch_the_cache() {
    let backend = FakeBackend::counting();
    let gw = gateway(&backend, MemorySecretStore::new());
    let who = Identity::Admin;
    let payload = json!({ "id": "abc" });

    // same name and payload, so the same key, first as a read
    gw.call(&Operation::new("SYNC", OperationKind::ReadOnly), payload.clone(), &who)
        .await
        .unwrap();
    assert_eq!(gw.signals().cache.stores, 1);

    let mutate = Operation::new("SYNC", OperationKind::Mutating);
    let a = gw.call(&mutate, payload.clone(), &who).await.unwrap();
    let b = gw.call(&mutate, payload.clone(), &who).await.unwrap();
    assert_eq!(backend.calls(), 3);
    assert_ne!(a, b);
    let stats = gw.signals().cache;
    assert_eq!(stats.stores, 1);
    assert_eq!(stats.hits, 0);
}

#[tokio::test(start_paused = true)]
async fn missing_secret_still_reaches_the_backend_unsigned() {
    let backend = FakeBackend::counting();
    let gw = gateway(&backend, MemorySecretStore::new());

    let resp = gw
        .call(
            &Operation::mutating("MARK_CALLED"),
            json!({ "lead": 7 }),
            &Identity::client("no-secret"),
        )
        .await
        .unwrap();
    assert!(resp.is_success());

    let sent = backend.envelopes();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].signature, "");
    assert_eq!(sent[0].operation, "MARK_CALLED");
    assert_eq!(sent[0].payload, json!({ "lead": 7 }));
    assert!(sent[0].timestamp > 0);
}

#[tokio::test(start_paused = true)]
async fn client_calls_carry_a_verifiable_signature() {
    let backend = FakeBackend::counting();
    let gw = gateway(
        &backend,
        MemorySecretStore::new().with_secret("client-1", "s3cret"),
    );

    gw.call(
        &Operation::read("GET_QUEUE"),
        json!({ "id": "abc" }),
        &Identity::client("client-1"),
    )
    .await
    .unwrap();
    gw.call(
        &Operation::mutating("REGISTER_CLIENT"),
        json!({ "name": "new" }),
        &Identity::client("client-1"),
    )
    .await
    .unwrap();

    let sent = backend.envelopes();
    let expected = compute_tag("s3cret", "client-1", sent[0].timestamp).unwrap();
    assert_eq!(sent[0].signature, expected);
    assert_eq!(sent[1].signature, "", "registration is never signed");
}

#[tokio::test(start_paused = true)]
async fn stored_secret_is_used_by_later_calls() {
    let backend = FakeBackend::counting();
    let gw = gateway(&backend, MemorySecretStore::new());
    let who = Identity::client("client-9");

    gw.store_secret(&who, "issued").await.unwrap();
    assert!(gw.store_secret(&Identity::Admin, "x").await.is_err());
    gw.call(&Operation::mutating("ADD_LEADS"), json!({}), &who)
        .await
        .unwrap();
    assert!(gw.forget_secret(&who).await);
    gw.call(&Operation::mutating("ADD_LEADS"), json!({}), &who)
        .await
        .unwrap();

    let sent = backend.envelopes();
    assert_eq!(
        sent[0].signature,
        compute_tag("issued", "client-9", sent[0].timestamp).unwrap()
    );
    assert_eq!(sent[1].signature, "");
}

#[tokio::test(start_paused = true)]
async fn failures_are_shared_then_cleared() {
    let backend = FakeBackend::new(|_, n| {
        if n == 1 {
            Err(transport_down())
        } else {
            Ok(json!({ "status": "success", "data": n }))
        }
    });
    let gw = gateway(&backend, MemorySecretStore::new());
    let op = Operation::read("GET_QUEUE");
    let who = Identity::Anonymous;

    let (a, b) = tokio::join!(
        gw.call(&op, json!({ "id": 1 }), &who),
        gw.call(&op, json!({ "id": 1 }), &who),
    );
    let (a, b) = (a.unwrap_err(), b.unwrap_err());
    assert!(a.is_transport());
    assert_eq!(a.to_string(), b.to_string());
    assert_eq!(backend.calls(), 1);
    assert_eq!(gw.signals().inflight, 0);

    let retry = gw.call(&op, json!({ "id": 1 }), &who).await.unwrap();
    assert_eq!(retry.data, Some(json!(2)));
    assert_eq!(backend.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn non_success_status_is_returned_but_not_cached() {
    let backend = FakeBackend::new(|_, _| Ok(json!({ "status": "error", "message": "busy" })));
    let gw = gateway(&backend, MemorySecretStore::new());
    let op = Operation::read("GET_QUEUE");

    let resp = gw.call(&op, json!({}), &Identity::Anonymous).await.unwrap();
    assert!(!resp.is_success());
    assert_eq!(resp.message.as_deref(), Some("busy"));

    gw.call(&op, json!({}), &Identity::Anonymous).await.unwrap();
    assert_eq!(backend.calls(), 2);
    assert_eq!(gw.signals().cached_entries, 0);
}

#[tokio::test(start_paused = true)]
async fn malformed_envelope_is_a_decode_error() {
    let backend = FakeBackend::new(|_, _| Ok(json!({ "rows": [] })));
    let gw = gateway(&backend, MemorySecretStore::new());
    let op = Operation::read("GET_QUEUE");

    let err = gw.call(&op, json!({}), &Identity::Anonymous).await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(gw.signals().inflight, 0);
    assert_eq!(gw.signals().cached_entries, 0);
}

#[tokio::test]
async fn invalid_payload_is_rejected_before_registration() {
    let backend = FakeBackend::counting();
    let gw = gateway(&backend, MemorySecretStore::new());

    let err = gw
        .call(&Operation::read("GET_QUEUE"), json!(["abc"]), &Identity::Anonymous)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(backend.calls(), 0);
    assert_eq!(gw.signals().inflight, 0);
}

#[tokio::test(start_paused = true)]
async fn call_builder_decodes_typed_data() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Lead {
        name: String,
    }

    let backend = FakeBackend::new(|env, _| match env.operation.as_str() {
        "GET_LEADS" => Ok(json!({ "status": "success", "data": [{ "name": "Ada" }], "count": 1 })),
        _ => Ok(json!({ "status": "denied", "message": "not allowed" })),
    });
    let gw = gateway(&backend, MemorySecretStore::new());

    let leads: Vec<Lead> = gw
        .request(Operation::classify("GET_LEADS"))
        .payload(json!({ "campaign": "spring" }))
        .identity("client-1")
        .fetch()
        .await
        .unwrap();
    assert_eq!(leads, vec![Lead { name: "Ada".into() }]);

    let err = gw
        .request(Operation::classify("ADD_LEADS"))
        .fetch::<Value>()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not allowed"));
    let ctx: Option<&ErrorContext> = err.context();
    assert_eq!(ctx.and_then(|c| c.details.as_deref()), Some("denied"));
}
