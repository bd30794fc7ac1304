use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::cart::CartItem;
use super::errors::DomainError;

const PREFIX: &str = "ORD-";

/// Human readable order identifier of the form `ORD-########-###`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Last eight digits of the millisecond timestamp plus a three digit random suffix.
    pub fn generate<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Self {
        let stamp = now.timestamp_millis().rem_euclid(100_000_000);
        let suffix: u16 = rng.gen_range(0..1000);
        Self(format!("{PREFIX}{stamp:08}-{suffix:03}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidInput(format!("malformed order number '{s}'"));
        let rest = s.strip_prefix(PREFIX).ok_or_else(invalid)?;
        let (stamp, suffix) = rest.split_once('-').ok_or_else(invalid)?;
        let digits = |part: &str, len: usize| {
            part.len() == len && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !digits(stamp, 8) || !digits(suffix, 3) {
            return Err(invalid());
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> Self {
        value.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of transitioning a user's cart to `PURCHASED`.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeOutcome {
    pub order_number: OrderNumber,
    pub updated: usize,
    /// The payment intent had already been finalized; nothing changed.
    pub replayed: bool,
}

/// Persisted order header as stored next to its purchased rows.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order_number: OrderNumber,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CartItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: OrderNumber,
    pub items: Vec<CartItem>,
    pub total_items: i64,
    #[schema(value_type = String)]
    pub total_price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl From<OrderRecord> for OrderSummary {
    fn from(record: OrderRecord) -> Self {
        let total_items = record.items.iter().map(|i| i64::from(i.quantity)).sum();
        let total_price = record
            .items
            .iter()
            .fold(BigDecimal::zero(), |acc, i| acc + i.line_total());
        Self {
            order_id: record.order_number,
            total_items,
            total_price,
            items: record.items,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::domain::cart::tests::phone;

    #[test]
    fn generated_numbers_match_the_public_pattern() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc.timestamp_millis_opt(1_760_000_123_456).unwrap();

        let number = OrderNumber::generate(now, &mut rng);

        assert!(number.as_str().starts_with("ORD-00123456-"));
        assert_eq!(number.as_str().len(), 16);
        number.as_str().parse::<OrderNumber>().expect("round trips through parse");
    }

    #[test]
    fn short_timestamps_are_zero_padded() {
        let mut rng = StdRng::seed_from_u64(1);
        let now = Utc.timestamp_millis_opt(42).unwrap();

        let number = OrderNumber::generate(now, &mut rng);

        assert!(number.as_str().starts_with("ORD-00000042-"));
    }

    #[test]
    fn parse_rejects_malformed_numbers() {
        for bad in ["", "ORD-1234567-123", "ORD-12345678-12", "ord-12345678-123", "ORD-1234567a-123"] {
            assert!(bad.parse::<OrderNumber>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn summary_totals_come_from_items() {
        let record = OrderRecord {
            order_number: "ORD-12345678-001".parse().unwrap(),
            created_at: Utc::now(),
            items: vec![phone(42, "199.99", 1), phone(7, "50.00", 2)],
        };

        let summary = OrderSummary::from(record);

        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.total_price, BigDecimal::from_str("299.99").unwrap());
        assert_eq!(summary.items.len(), 2);
    }
}
