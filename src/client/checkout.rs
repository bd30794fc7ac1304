//! Checkout as a linear state machine:
//! shipping, payment intent, provider confirmation, finalize.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Url;

use super::local_cart::{LocalCartStore, SessionShippingStore};
use super::reconciler::CartReconciler;
use super::storage::KeyValueStore;
use super::ui::{Notice, NoticeLevel};
use super::ClientContext;
use crate::config::ClientConfig;
use crate::domain::cart::Cart;
use crate::domain::order::OrderNumber;
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::PaymentProvider;
use crate::domain::pricing::{to_minor_units, CheckoutTotals, PricingPolicy};
use crate::infrastructure::stripe::StripeProvider;

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub pricing: PricingPolicy,
    pub currency: String,
    /// Payment-intent creation attempts allowed per checkout, first one included.
    pub max_intent_attempts: u32,
    /// How long a failure message stays up before navigating away.
    pub redirect_delay: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            currency: "usd".to_string(),
            max_intent_attempts: 3,
            redirect_delay: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Cart,
    Shipping,
    Payment,
    Confirmation,
}

/// Where to send the user, and after how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub to: Route,
    pub after: Duration,
}

impl Redirect {
    pub fn now(to: Route) -> Self {
        Self {
            to,
            after: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutFailure {
    /// The store could not create a payment intent.
    IntentCreation {
        attempts: u32,
        retryable: bool,
        message: String,
    },
    /// The provider could not be asked about the intent.
    PaymentLookup(String),
    PaymentNotSucceeded(PaymentStatus),
    EmptyCart,
    MissingShipping,
    /// Payment succeeded but the server cart could not be loaded to check it.
    CartUnavailable,
    /// Payment succeeded for a different amount than the cart now costs.
    AmountMismatch {
        charged_minor: i64,
        due_minor: Option<i64>,
    },
    /// Payment succeeded but the cart could not be finalized.
    FinalizeFailed {
        payment_intent_id: String,
        order_number: OrderNumber,
        message: String,
    },
}

impl CheckoutFailure {
    /// The customer has been charged without receiving an order.
    pub fn charged(&self) -> bool {
        matches!(
            self,
            CheckoutFailure::FinalizeFailed { .. }
                | CheckoutFailure::CartUnavailable
                | CheckoutFailure::AmountMismatch { .. }
        )
    }
}

impl fmt::Display for CheckoutFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutFailure::IntentCreation { retryable: true, .. } => {
                f.write_str("Could not start the payment. Please try again.")
            }
            CheckoutFailure::IntentCreation { retryable: false, .. } => {
                f.write_str("Could not start the payment. Please try again later.")
            }
            CheckoutFailure::PaymentLookup(_) => {
                f.write_str("Could not verify your payment. Please try again.")
            }
            CheckoutFailure::PaymentNotSucceeded(_) => f.write_str("Your payment did not go through."),
            CheckoutFailure::EmptyCart => f.write_str("Your cart is empty."),
            CheckoutFailure::MissingShipping => f.write_str("Please enter your shipping details."),
            CheckoutFailure::CartUnavailable => f.write_str(
                "Your payment was received but your cart could not be loaded. Please reload this page.",
            ),
            CheckoutFailure::AmountMismatch { .. } => f.write_str(
                "Your cart changed after payment. Please contact support before ordering again.",
            ),
            CheckoutFailure::FinalizeFailed { order_number, .. } => write!(
                f,
                "Your payment was received but order {order_number} could not be completed. Please contact support."
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutState {
    AwaitingShipping,
    AwaitingPaymentIntent {
        totals: CheckoutTotals,
    },
    AwaitingPaymentConfirmation {
        client_secret: String,
        totals: CheckoutTotals,
    },
    Finalizing {
        payment_intent_id: String,
    },
    Completed {
        order_number: OrderNumber,
    },
    Failed {
        failure: CheckoutFailure,
        redirect: Redirect,
    },
}

/// Query parameters the payment provider appends to the return URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRedirect {
    pub payment_intent: String,
    pub client_secret: String,
}

impl PaymentRedirect {
    /// `None` when the URL is malformed or either parameter is missing.
    pub fn from_url(url: &str) -> Option<Self> {
        let url = Url::parse(url).ok()?;
        let mut payment_intent = None;
        let mut client_secret = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "payment_intent" => payment_intent = Some(value.into_owned()),
                "payment_intent_client_secret" => client_secret = Some(value.into_owned()),
                _ => {}
            }
        }
        Some(Self {
            payment_intent: payment_intent.filter(|v| !v.is_empty())?,
            client_secret: client_secret.filter(|v| !v.is_empty())?,
        })
    }
}

pub struct CheckoutSequencer {
    ctx: ClientContext,
    payments: Arc<dyn PaymentProvider>,
    config: CheckoutConfig,
    carts: LocalCartStore<Arc<dyn KeyValueStore>>,
    shipping: SessionShippingStore<Arc<dyn KeyValueStore>>,
    state: CheckoutState,
    intent_attempts: u32,
}

impl CheckoutSequencer {
    /// `payments` only needs read access to intents; the client holds the
    /// publishable key.
    pub fn new(ctx: ClientContext, payments: Arc<dyn PaymentProvider>, config: CheckoutConfig) -> Self {
        let carts = LocalCartStore::new(ctx.local.clone());
        let shipping = SessionShippingStore::new(ctx.session.clone());
        Self {
            ctx,
            payments,
            config,
            carts,
            shipping,
            state: CheckoutState::AwaitingShipping,
            intent_attempts: 0,
        }
    }

    /// Sequencer that re-queries intents at the configured provider with the
    /// publishable key.
    pub fn from_config(ctx: ClientContext, config: &ClientConfig) -> Self {
        let payments = Arc::new(StripeProvider::new(
            config.payment_api_base.as_str(),
            config.payment_publishable_key.as_str(),
        ));
        Self::new(ctx, payments, config.checkout.clone())
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Enter the payment step. A missing cart or shipping form is a guard:
    /// the state stays `AwaitingShipping` and the caller gets the redirect.
    pub async fn begin_payment(&mut self, user: &str) -> Result<&CheckoutState, Redirect> {
        match self.state {
            CheckoutState::AwaitingShipping | CheckoutState::Failed { .. } => {}
            _ => return Ok(&self.state),
        }
        self.intent_attempts = 0;
        self.start_intent(user).await
    }

    /// User-initiated retry after intent creation failed. Does nothing
    /// unless the last failure is retryable.
    pub async fn retry_payment_intent(&mut self, user: &str) -> Result<&CheckoutState, Redirect> {
        let retryable = matches!(
            self.state,
            CheckoutState::Failed {
                failure: CheckoutFailure::IntentCreation { retryable: true, .. },
                ..
            }
        );
        if !retryable {
            return Ok(&self.state);
        }
        self.start_intent(user).await
    }

    /// Prices the server cart, after uploading anything still queued locally,
    /// so the intent covers exactly the lines finalize will purchase.
    async fn start_intent(&mut self, user: &str) -> Result<&CheckoutState, Redirect> {
        let Some(cart) = CartReconciler::new(self.ctx.clone()).confirmed(user).await else {
            self.state = CheckoutState::AwaitingShipping;
            return Err(Redirect::now(Route::Cart));
        };
        if cart.is_empty() {
            self.state = CheckoutState::AwaitingShipping;
            return Err(Redirect::now(Route::Cart));
        }
        let Some(shipping) = self.shipping.read() else {
            self.state = CheckoutState::AwaitingShipping;
            return Err(Redirect::now(Route::Shipping));
        };

        let totals = self.config.pricing.totals(&cart);
        self.state = CheckoutState::AwaitingPaymentIntent {
            totals: totals.clone(),
        };
        self.intent_attempts += 1;

        let metadata = HashMap::from([
            ("items".to_string(), cart.total_items().to_string()),
            ("email".to_string(), shipping.email.clone()),
        ]);
        let created = {
            let _busy = self.ctx.busy.acquire();
            self.ctx
                .api
                .create_payment_intent(user, &totals.total, &metadata)
                .await
        };

        self.state = match created {
            Ok(client_secret) => CheckoutState::AwaitingPaymentConfirmation {
                client_secret,
                totals,
            },
            Err(e) => {
                log::warn!(
                    "Payment intent attempt {} for {user} failed: {e}",
                    self.intent_attempts
                );
                self.fail(
                    CheckoutFailure::IntentCreation {
                        attempts: self.intent_attempts,
                        retryable: self.intent_attempts < self.config.max_intent_attempts,
                        message: e.to_string(),
                    },
                    Route::Payment,
                )
            }
        };
        Ok(&self.state)
    }

    /// Handle the provider's return redirect. Works on a fresh sequencer, as
    /// after a page reload; a second call once finalizing has begun is a no-op.
    pub async fn confirm(&mut self, user: &str, redirect: &PaymentRedirect) -> &CheckoutState {
        if matches!(
            self.state,
            CheckoutState::Finalizing { .. } | CheckoutState::Completed { .. }
        ) {
            return &self.state;
        }
        self.state = CheckoutState::Finalizing {
            payment_intent_id: redirect.payment_intent.clone(),
        };

        let retrieved = {
            let _busy = self.ctx.busy.acquire();
            self.payments
                .retrieve_intent(&redirect.payment_intent, &redirect.client_secret)
                .await
        };
        let intent = match retrieved {
            Ok(intent) => intent,
            Err(e) => {
                log::warn!("Could not retrieve payment intent {}: {e}", redirect.payment_intent);
                self.state = self.fail(CheckoutFailure::PaymentLookup(e.to_string()), Route::Cart);
                return &self.state;
            }
        };
        if !intent.status.is_succeeded() {
            self.state = self.fail(CheckoutFailure::PaymentNotSucceeded(intent.status), Route::Cart);
            return &self.state;
        }
        let reconciler = CartReconciler::new(self.ctx.clone());
        let Some(cart) = reconciler.confirmed(user).await else {
            self.state = self.fail(CheckoutFailure::CartUnavailable, Route::Cart);
            return &self.state;
        };
        if cart.is_empty() {
            self.state = self.fail(CheckoutFailure::EmptyCart, Route::Cart);
            return &self.state;
        }
        if self.shipping.read().is_none() {
            self.state = self.fail(CheckoutFailure::MissingShipping, Route::Shipping);
            return &self.state;
        }
        let due_minor = to_minor_units(&self.config.pricing.totals(&cart).total).ok();
        if due_minor != Some(intent.amount_minor) {
            log::error!(
                "Payment {} for {user} charged {} minor units but the cart costs {due_minor:?}",
                intent.id,
                intent.amount_minor
            );
            self.state = self.fail(
                CheckoutFailure::AmountMismatch {
                    charged_minor: intent.amount_minor,
                    due_minor,
                },
                Route::Cart,
            );
            return &self.state;
        }

        let order_number = OrderNumber::generate(Utc::now(), &mut rand::thread_rng());
        let finalized = {
            let _busy = self.ctx.busy.acquire();
            self.ctx
                .api
                .finalize(user, &order_number, Some(&intent.id))
                .await
        };

        self.state = match finalized {
            Ok(done) => {
                if done.count != cart.items().len() {
                    log::error!(
                        "Order {} for {user} finalized {} lines, {} were paid for",
                        done.order_number,
                        done.count,
                        cart.items().len()
                    );
                }
                self.verify_order(user, &done.order_number, intent.amount_minor)
                    .await;
                if reconciler.confirmed(user).await.is_none() {
                    self.forget_purchased(&cart);
                }
                self.ctx.notifier.notify(Notice::new(
                    NoticeLevel::Success,
                    format!("Order {} placed", done.order_number),
                ));
                CheckoutState::Completed {
                    order_number: done.order_number,
                }
            }
            Err(e) => {
                log::error!(
                    "Payment {} for {user} succeeded but finalizing order {order_number} failed: {e}",
                    intent.id
                );
                self.fail(
                    CheckoutFailure::FinalizeFailed {
                        payment_intent_id: intent.id,
                        order_number,
                        message: e.to_string(),
                    },
                    Route::Cart,
                )
            }
        };
        &self.state
    }

    /// Compare the purchased total with what the provider charged.
    async fn verify_order(&self, user: &str, order_number: &OrderNumber, charged_minor: i64) {
        let order = {
            let _busy = self.ctx.busy.acquire();
            self.ctx.api.fetch_order(user, order_number.as_str()).await
        };
        match order {
            Ok(order) => {
                let due_minor = to_minor_units(&self.config.pricing.totals_for(&order.total_price).total).ok();
                if due_minor != Some(charged_minor) {
                    log::error!(
                        "Order {order_number} for {user} costs {due_minor:?} minor units, {charged_minor} were charged"
                    );
                }
            }
            Err(e) => log::warn!("Could not verify order {order_number}: {e}"),
        }
    }

    /// Drop the purchased lines from the local cart when the server cart
    /// could not be mirrored after finalizing.
    fn forget_purchased(&self, purchased: &Cart) {
        let mut local = self.carts.read();
        local.cart = local.cart.without(purchased);
        if let Err(e) = self.carts.write(&local) {
            log::warn!("Could not update local cart after checkout: {e}");
        }
    }

    fn fail(&self, failure: CheckoutFailure, to: Route) -> CheckoutState {
        let level = if failure.charged() {
            NoticeLevel::Error
        } else {
            NoticeLevel::Warning
        };
        self.ctx
            .notifier
            .notify(Notice::new(level, failure.to_string()));
        CheckoutState::Failed {
            failure,
            redirect: Redirect {
                to,
                after: self.config.redirect_delay,
            },
        }
    }
}
