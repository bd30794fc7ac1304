//! Storefront client: the guest cart, cart reconciliation and the checkout
//! state machine, talking to the store over [`api::StoreApi`].

pub mod api;
pub mod checkout;
pub mod http;
pub mod local_cart;
pub mod reconciler;
pub mod storage;
pub mod ui;

use std::sync::Arc;

use self::api::StoreApi;
use self::http::HttpStoreApi;
use self::storage::KeyValueStore;
use self::ui::{BusyFlag, Notifier};

use crate::config::ClientConfig;

/// Everything the reconciler and the checkout sequencer share.
#[derive(Clone)]
pub struct ClientContext {
    pub api: Arc<dyn StoreApi>,
    /// Survives restarts; holds the guest cart.
    pub local: Arc<dyn KeyValueStore>,
    /// Cleared with the session; holds the shipping form.
    pub session: Arc<dyn KeyValueStore>,
    pub notifier: Arc<dyn Notifier>,
    pub busy: BusyFlag,
}

impl ClientContext {
    /// Context for a client of the store at `config.store_api_url`.
    pub fn connect(
        config: &ClientConfig,
        local: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api: Arc::new(HttpStoreApi::new(config.store_api_url.as_str())),
            local,
            session,
            notifier,
            busy: BusyFlag::new(),
        }
    }
}
