//! In-process stand-ins for the external collaborators.
//!
//! * [`FakeGateway`] issues numbered payment sessions and accepts notifications signed with [`FAKE_SIGNATURE`].
//! * [`FakeProvider`] behaves like an issuer that honours idempotency keys: a repeated key returns the card issued the
//!   first time, and never issues a second one. Per-item failures can be scripted.
//! * [`FakeNotifier`] records every delivery and can be told to fail.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use serde_json::Value;

use crate::{
    catalog::Catalog,
    db_types::GiftCard,
    traits::{
        CardRequest,
        GatewayError,
        GiftCardNotifier,
        GiftCardProvider,
        NotificationStatus,
        NotifierError,
        OrderSummary,
        PaymentGateway,
        PaymentNotification,
        ProviderError,
        SessionHandle,
        SessionRequest,
    },
};

pub const FAKE_SIGNATURE: &str = "valid-test-signature";

//--------------------------------------      FakeGateway      ---------------------------------------------------------
#[derive(Clone, Default)]
pub struct FakeGateway {
    next_session: Arc<AtomicU64>,
    sessions: Arc<Mutex<Vec<SessionRequest>>>,
    unavailable: bool,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose session creation always fails
    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Self::default() }
    }

    pub fn session_requests(&self) -> Vec<SessionRequest> {
        self.sessions.lock().expect("lock poisoned").clone()
    }

    /// Builds a notification body in the shape this gateway understands
    pub fn notification(session_id: &str, status: &str) -> Vec<u8> {
        serde_json::json!({ "id": session_id, "status": status }).to_string().into_bytes()
    }
}

impl PaymentGateway for FakeGateway {
    async fn create_session(&self, request: SessionRequest) -> Result<SessionHandle, GatewayError> {
        if self.unavailable {
            return Err(GatewayError::Unavailable("connection refused".into()));
        }
        let n = self.next_session.fetch_add(1, Ordering::SeqCst) + 1;
        self.sessions.lock().expect("lock poisoned").push(request);
        Ok(SessionHandle {
            id: format!("session-{n}"),
            pay_url: format!("https://pay.example.com/invoice/{n}"),
            receive_address: Some(format!("bc1qfake{n:04}")),
        })
    }

    fn verify_notification(&self, raw: &[u8], signature: Option<&str>) -> Result<PaymentNotification, GatewayError> {
        if signature != Some(FAKE_SIGNATURE) {
            return Err(GatewayError::InvalidSignature);
        }
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| GatewayError::NotificationMalformed(e.to_string()))?;
        let field = |name: &str| {
            value
                .get(name)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .ok_or_else(|| GatewayError::NotificationMalformed(format!("missing {name}")))
        };
        let correlation_id = field("id")?;
        let status = match field("status")?.as_str() {
            "paid" => NotificationStatus::Confirmed,
            "invalid" | "expired" | "canceled" => NotificationStatus::Rejected,
            other => NotificationStatus::Ignorable(other.to_string()),
        };
        Ok(PaymentNotification { correlation_id, status })
    }
}

//--------------------------------------      FakeProvider     ---------------------------------------------------------
/// Scripted behaviour for one line item
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Every attempt is rejected
    Reject(String),
    /// The first `n` attempts fail as unavailable, then purchases succeed
    UnavailableTimes(u32),
    /// The first attempt issues the card at the "issuer" but the response takes this long to arrive
    SlowFirstResponse(Duration),
}

#[derive(Default)]
struct ProviderState {
    issued: HashMap<String, GiftCard>,
    attempts: HashMap<String, u32>,
    calls: u64,
    replays: u64,
}

#[derive(Clone)]
pub struct FakeProvider {
    catalog: Catalog,
    behaviors: Arc<HashMap<usize, Behavior>>,
    state: Arc<Mutex<ProviderState>>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProvider {
    pub fn new() -> Self {
        Self { catalog: Catalog::default(), behaviors: Arc::new(HashMap::new()), state: Arc::default() }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Scripts the behaviour for the line item at `index` of every order
    pub fn with_behavior(mut self, index: usize, behavior: Behavior) -> Self {
        let mut behaviors = (*self.behaviors).clone();
        behaviors.insert(index, behavior);
        self.behaviors = Arc::new(behaviors);
        self
    }

    /// Total number of purchase requests received, including retries
    pub fn calls(&self) -> u64 {
        self.state.lock().expect("lock poisoned").calls
    }

    /// Number of distinct gift cards actually issued
    pub fn cards_issued(&self) -> usize {
        self.state.lock().expect("lock poisoned").issued.len()
    }

    /// Number of requests answered from a previous purchase with the same idempotency key
    pub fn replays(&self) -> u64 {
        self.state.lock().expect("lock poisoned").replays
    }

    pub fn issued_card(&self, idempotency_key: &str) -> Option<GiftCard> {
        self.state.lock().expect("lock poisoned").issued.get(idempotency_key).cloned()
    }

    fn card_for(request: &CardRequest, sku: &str) -> GiftCard {
        let n = request.line_item_index;
        GiftCard::new(format!("{sku}-{}-{n}", request.order_id), Some(format!("{:04}", 1000 + n)))
    }
}

impl GiftCardProvider for FakeProvider {
    async fn purchase_card(&self, request: &CardRequest) -> Result<GiftCard, ProviderError> {
        let sku = self.catalog.sku_for(&request.brand, request.denomination)?;
        let key = request.idempotency_key.as_str().to_string();
        let behavior = self.behaviors.get(&request.line_item_index).cloned();
        let delay = {
            let mut state = self.state.lock().expect("lock poisoned");
            state.calls += 1;
            let attempt = {
                let a = state.attempts.entry(key.clone()).or_insert(0);
                *a += 1;
                *a
            };
            if let Some(card) = state.issued.get(&key).cloned() {
                state.replays += 1;
                return Ok(card);
            }
            match behavior {
                Some(Behavior::Reject(reason)) => return Err(ProviderError::Rejected(reason)),
                Some(Behavior::UnavailableTimes(n)) if attempt <= n => {
                    return Err(ProviderError::Unavailable(format!("attempt {attempt} refused")));
                },
                Some(Behavior::SlowFirstResponse(delay)) if attempt == 1 => {
                    state.issued.insert(key.clone(), Self::card_for(request, sku.as_str()));
                    Some(delay)
                },
                _ => {
                    state.issued.insert(key.clone(), Self::card_for(request, sku.as_str()));
                    None
                },
            }
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().expect("lock poisoned");
        state.issued.get(&key).cloned().ok_or_else(|| ProviderError::Unavailable("card vanished".into()))
    }
}

//--------------------------------------      FakeNotifier     ---------------------------------------------------------
#[derive(Clone, Default)]
pub struct FakeNotifier {
    deliveries: Arc<Mutex<Vec<(String, OrderSummary)>>>,
    attempts: Arc<AtomicU64>,
    failing: bool,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose deliveries always fail
    pub fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub fn deliveries(&self) -> Vec<(String, OrderSummary)> {
        self.deliveries.lock().expect("lock poisoned").clone()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl GiftCardNotifier for FakeNotifier {
    async fn deliver(&self, recipient: &str, summary: &OrderSummary) -> Result<(), NotifierError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(NotifierError::Transient("mail relay is down".into()));
        }
        self.deliveries.lock().expect("lock poisoned").push((recipient.to_string(), summary.clone()));
        Ok(())
    }
}
