use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::domain::errors::PaymentError;
use crate::domain::payment::{PaymentIntent, PaymentStatus};
use crate::domain::ports::PaymentProvider;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Deserialize)]
struct IntentBody {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    amount: i64,
    currency: String,
    status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Stripe-compatible payment-intents client.
///
/// The server uses it with the secret key to create intents; the checkout
/// client uses it with the publishable key, which only permits retrieval by
/// client secret.
#[derive(Debug, Clone)]
pub struct StripeProvider {
    http: Client,
    api_base: String,
    api_key: String,
}

impl StripeProvider {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.api_base)
    }

    async fn decode(response: Response) -> Result<PaymentIntent, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: IntentBody = response
            .json()
            .await
            .map_err(|e| PaymentError::Decode(e.to_string()))?;
        Ok(PaymentIntent {
            id: body.id,
            client_secret: body.client_secret.unwrap_or_default(),
            amount_minor: body.amount,
            currency: body.currency,
            status: body.status,
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<PaymentIntent, PaymentError> {
        if amount_minor <= 0 {
            return Err(PaymentError::InvalidAmount(format!(
                "amount must be positive, got {amount_minor}"
            )));
        }

        let mut form = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), currency.to_lowercase()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        form.extend(
            metadata
                .iter()
                .map(|(k, v)| (format!("metadata[{k}]"), v.clone())),
        );

        let response = self
            .http
            .post(self.intents_url())
            .bearer_auth(&self.api_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let intent = Self::decode(response).await?;
        log::info!(
            "Created payment intent {} for {} {}",
            intent.id,
            intent.amount_minor,
            intent.currency
        );
        Ok(intent)
    }

    async fn retrieve_intent(
        &self,
        id: &str,
        client_secret: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        let response = self
            .http
            .get(format!("{}/{}", self.intents_url(), id))
            .bearer_auth(&self.api_key)
            .query(&[("client_secret", client_secret)])
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        Self::decode(response).await
    }
}
