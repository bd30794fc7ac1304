//! Fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::application::cart_service::CartService;
use crate::application::order_service::OrderService;
use crate::application::shipping_service::ShippingService;
use crate::client::api::{ApiError, StoreApi};
use crate::client::storage::InMemoryStore;
use crate::client::ui::{BusyFlag, Notice, NoticeLevel, Notifier};
use crate::client::ClientContext;
use crate::domain::cart::{Cart, CartItem, ItemStatus};
use crate::domain::errors::{DomainError, PaymentError};
use crate::domain::order::{OrderNumber, OrderSummary};
use crate::domain::payment::{PaymentIntent, PaymentStatus};
use crate::domain::ports::{CartRepository, PaymentProvider};
use crate::domain::pricing::to_minor_units;
use crate::domain::shipping::ShippingInfo;
use crate::handlers::cart::FinalizeResponse;
use crate::infrastructure::memory::{MemoryCartRepository, MemoryShippingRepository};
use crate::AppState;

pub fn memory_state(provider: impl Into<Arc<StubPaymentProvider>>) -> AppState {
    let provider: Arc<StubPaymentProvider> = provider.into();
    AppState::in_memory(provider, "usd")
}

/// Payment provider that keeps intents in memory. New intents start in
/// `requires_payment_method`; tests move them on with [`Self::set_status`].
#[derive(Debug, Default)]
pub struct StubPaymentProvider {
    intents: Mutex<Vec<PaymentIntent>>,
    fail_create: AtomicBool,
}

impl StubPaymentProvider {
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<PaymentIntent> {
        self.intents.lock().unwrap().clone()
    }

    pub fn set_status(&self, id: &str, status: PaymentStatus) {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents
            .iter_mut()
            .find(|i| i.id == id)
            .expect("unknown intent");
        intent.status = status;
    }
}

#[async_trait]
impl PaymentProvider for StubPaymentProvider {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        _metadata: &HashMap<String, String>,
    ) -> Result<PaymentIntent, PaymentError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PaymentError::Transport("connection refused".into()));
        }
        let mut intents = self.intents.lock().unwrap();
        let id = format!("pi_{}", intents.len() + 1);
        let intent = PaymentIntent {
            client_secret: format!("{id}_secret_test"),
            id,
            amount_minor,
            currency: currency.to_string(),
            status: PaymentStatus::RequiresPaymentMethod,
        };
        intents.push(intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(
        &self,
        id: &str,
        client_secret: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        self.intents
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id && i.client_secret == client_secret)
            .cloned()
            .ok_or_else(|| PaymentError::Rejected {
                status: 404,
                message: format!("No such payment_intent: '{id}'"),
            })
    }
}

/// In-process stand-in for the store's HTTP API, backed by the real
/// services over memory repositories.
pub struct FakeStoreApi {
    repo: Arc<MemoryCartRepository>,
    carts: CartService<Arc<MemoryCartRepository>>,
    orders: OrderService<Arc<MemoryCartRepository>>,
    shipping: ShippingService<MemoryShippingRepository>,
    payments: Arc<StubPaymentProvider>,
    offline: AtomicBool,
    drop_merge_responses: AtomicBool,
    fail_finalize: AtomicBool,
}

impl FakeStoreApi {
    pub fn new() -> Self {
        let repo = Arc::new(MemoryCartRepository::new());
        Self {
            carts: CartService::new(repo.clone()),
            orders: OrderService::new(repo.clone()),
            repo,
            shipping: ShippingService::new(MemoryShippingRepository::new()),
            payments: Arc::new(StubPaymentProvider::default()),
            offline: AtomicBool::new(false),
            drop_merge_responses: AtomicBool::new(false),
            fail_finalize: AtomicBool::new(false),
        }
    }

    pub fn payments(&self) -> Arc<StubPaymentProvider> {
        self.payments.clone()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Apply merges but report a network failure, as when the reply is lost.
    pub fn drop_merge_responses(&self, drop: bool) {
        self.drop_merge_responses.store(drop, Ordering::SeqCst);
    }

    pub fn fail_finalize(&self, fail: bool) {
        self.fail_finalize.store(fail, Ordering::SeqCst);
    }

    pub fn seed(&self, user: &str, item: CartItem) {
        self.carts.add_item(user, item).unwrap();
    }

    pub fn server_cart(&self, user: &str) -> Cart {
        self.carts.get_cart(user, ItemStatus::InCart).unwrap()
    }

    pub fn server_items(&self, user: &str, status: ItemStatus) -> Vec<CartItem> {
        self.repo.list(user, status).unwrap()
    }

    fn reachable(&self) -> Result<(), ApiError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection refused".into()));
        }
        Ok(())
    }
}

fn api_error(e: DomainError) -> ApiError {
    let status = match &e {
        DomainError::NotFound => return ApiError::NotFound,
        DomainError::InvalidInput(_) => 400,
        DomainError::Validation(_) => 422,
        DomainError::EmptyCart | DomainError::Conflict(_) => 409,
        DomainError::Internal(_) => 500,
    };
    ApiError::Status {
        status,
        message: e.to_string(),
    }
}

#[async_trait]
impl StoreApi for FakeStoreApi {
    async fn fetch_cart(&self, user: &str, status: ItemStatus) -> Result<Cart, ApiError> {
        self.reachable()?;
        self.carts.get_cart(user, status).map_err(api_error)
    }

    async fn add_item(&self, user: &str, item: &CartItem) -> Result<Cart, ApiError> {
        self.reachable()?;
        self.carts.add_item(user, item.clone()).map_err(api_error)
    }

    async fn merge_cart(
        &self,
        user: &str,
        items: &[CartItem],
        sync_token: Option<Uuid>,
    ) -> Result<Cart, ApiError> {
        self.reachable()?;
        let cart = self
            .carts
            .merge_cart(user, items.to_vec(), sync_token)
            .map_err(api_error)?;
        if self.drop_merge_responses.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection reset".into()));
        }
        Ok(cart)
    }

    async fn update_quantity(&self, user: &str, item: &CartItem) -> Result<Cart, ApiError> {
        self.reachable()?;
        self.carts
            .update_quantity(user, item.clone())
            .map_err(api_error)
    }

    async fn remove_variant(&self, user: &str, variant_id: i32) -> Result<Cart, ApiError> {
        self.reachable()?;
        self.carts
            .remove_variant(user, variant_id)
            .map(|(_, cart)| cart)
            .map_err(api_error)
    }

    async fn clear_cart(&self, user: &str) -> Result<usize, ApiError> {
        self.reachable()?;
        self.carts.clear(user).map_err(api_error)
    }

    async fn finalize(
        &self,
        user: &str,
        order_number: &OrderNumber,
        payment_intent_id: Option<&str>,
    ) -> Result<FinalizeResponse, ApiError> {
        self.reachable()?;
        if self.fail_finalize.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                message: "Internal server error".into(),
            });
        }
        let outcome = self
            .carts
            .finalize(user, order_number, payment_intent_id)
            .map_err(api_error)?;
        Ok(FinalizeResponse {
            count: outcome.updated,
            order_number: outcome.order_number,
        })
    }

    async fn fetch_shipping(&self, user: &str) -> Result<Option<ShippingInfo>, ApiError> {
        self.reachable()?;
        self.shipping.get(user).map_err(api_error)
    }

    async fn save_shipping(
        &self,
        user: &str,
        info: &ShippingInfo,
    ) -> Result<ShippingInfo, ApiError> {
        self.reachable()?;
        self.shipping.save(user, info.clone()).map_err(api_error)
    }

    async fn create_payment_intent(
        &self,
        user: &str,
        amount: &BigDecimal,
        metadata: &HashMap<String, String>,
    ) -> Result<String, ApiError> {
        self.reachable()?;
        let minor = to_minor_units(amount).map_err(|e| ApiError::Status {
            status: 400,
            message: e.to_string(),
        })?;
        let mut metadata = metadata.clone();
        metadata.insert("userId".into(), user.to_string());
        self.payments
            .create_intent(minor, "usd", &metadata)
            .await
            .map(|intent| intent.client_secret)
            .map_err(|e| ApiError::Status {
                status: 502,
                message: e.to_string(),
            })
    }

    async fn fetch_order(&self, user: &str, order_id: &str) -> Result<OrderSummary, ApiError> {
        self.reachable()?;
        self.orders.get_order(user, order_id).map_err(api_error)
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn levels(&self) -> Vec<NoticeLevel> {
        self.notices().into_iter().map(|n| n.level).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub fn client_context(api: Arc<FakeStoreApi>, notifier: Arc<RecordingNotifier>) -> ClientContext {
    ClientContext {
        api,
        local: Arc::new(InMemoryStore::new()),
        session: Arc::new(InMemoryStore::new()),
        notifier,
        busy: BusyFlag::new(),
    }
}
