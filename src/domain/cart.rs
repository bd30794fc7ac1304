use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Condition {
    #[serde(alias = "new", alias = "NEW")]
    New,
    #[serde(alias = "excellent", alias = "EXCELLENT")]
    Excellent,
    #[serde(alias = "good", alias = "GOOD")]
    Good,
    #[serde(alias = "fair", alias = "FAIR")]
    Fair,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::Excellent => "Excellent",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Condition::New),
            "excellent" => Ok(Condition::Excellent),
            "good" => Ok(Condition::Good),
            "fair" => Ok(Condition::Fair),
            other => Err(DomainError::InvalidInput(format!("unknown condition '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    #[default]
    InCart,
    Purchased,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::InCart => "IN_CART",
            ItemStatus::Purchased => "PURCHASED",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_CART" => Ok(ItemStatus::InCart),
            "PURCHASED" => Ok(ItemStatus::Purchased),
            other => Err(DomainError::Internal(format!("unknown item status '{other}'"))),
        }
    }
}

/// The fields that identify one distinct cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub variant_id: i32,
    pub condition: Condition,
    pub storage: String,
    pub color: String,
    pub seller_id: Option<i32>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Variant identifier.
    pub id: i32,
    pub title: String,
    pub condition: Condition,
    pub storage: String,
    pub color: String,
    /// Unit price as a decimal string, e.g. "199.99"
    #[schema(value_type = String)]
    pub price: BigDecimal,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub seller_id: Option<i32>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
}

impl CartItem {
    pub fn key(&self) -> LineKey {
        LineKey {
            variant_id: self.id,
            condition: self.condition,
            storage: self.storage.clone(),
            color: self.color.clone(),
            seller_id: self.seller_id,
        }
    }

    pub fn line_total(&self) -> BigDecimal {
        &self.price * BigDecimal::from(self.quantity)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::InvalidInput("title must not be empty".into()));
        }
        if self.storage.trim().is_empty() || self.color.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "storage and color must not be empty".into(),
            ));
        }
        if self.quantity < 1 {
            return Err(DomainError::InvalidInput(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.price < BigDecimal::zero() {
            return Err(DomainError::InvalidInput(format!(
                "price must not be negative, got {}",
                self.price
            )));
        }
        Ok(())
    }

    /// Round the unit price to currency scale.
    pub fn normalized(mut self) -> Self {
        self.price = self.price.with_scale_round(2, RoundingMode::HalfUp);
        self
    }
}

/// Wire and storage shape of a cart. Totals are written for display and
/// dropped again on read.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total_items: i64,
    #[serde(default = "BigDecimal::zero")]
    #[schema(value_type = String)]
    pub sub_total_price: BigDecimal,
}

/// A user's `IN_CART` lines, unique per [`LineKey`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "CartSummary", from = "CartSummary")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Build a cart, folding lines that share a key. Folding past `i32::MAX`
    /// is an invalid-input error.
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Result<Self, DomainError> {
        let mut cart = Cart::default();
        for item in items {
            cart.fold(item)?;
        }
        Ok(cart)
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_items(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }

    pub fn sub_total(&self) -> BigDecimal {
        self.items
            .iter()
            .fold(BigDecimal::zero(), |acc, i| acc + i.line_total())
    }

    fn position(&self, key: &LineKey) -> Option<usize> {
        self.items.iter().position(|i| &i.key() == key)
    }

    /// Add a line, incrementing the quantity of an existing line with the same key.
    pub fn add(&mut self, item: CartItem) -> Result<(), DomainError> {
        item.validate()?;
        self.fold(item)
    }

    fn fold(&mut self, item: CartItem) -> Result<(), DomainError> {
        match self.position(&item.key()) {
            Some(idx) => {
                let line = &mut self.items[idx];
                line.quantity = line.quantity.checked_add(item.quantity).ok_or_else(|| {
                    DomainError::InvalidInput(format!("quantity overflow for variant {}", item.id))
                })?;
            }
            None => self.items.push(item),
        }
        Ok(())
    }

    /// Set the absolute quantity of a line; zero removes it. Returns whether a line matched.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: i32) -> Result<bool, DomainError> {
        if quantity < 0 {
            return Err(DomainError::InvalidInput(format!(
                "quantity must not be negative, got {quantity}"
            )));
        }
        let Some(idx) = self.position(key) else {
            return Ok(false);
        };
        if quantity == 0 {
            self.items.remove(idx);
        } else {
            self.items[idx].quantity = quantity;
        }
        Ok(true)
    }

    /// Remove every line of a variant. Returns the number of lines removed.
    pub fn remove_variant(&mut self, variant_id: i32) -> usize {
        let before = self.items.len();
        self.items.retain(|i| i.id != variant_id);
        before - self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// This cart minus every line whose key appears in `other`.
    pub fn without(&self, other: &Cart) -> Cart {
        Cart {
            items: self
                .items
                .iter()
                .filter(|i| other.position(&i.key()).is_none())
                .cloned()
                .collect(),
        }
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary {
            items: self.items.clone(),
            total_items: self.total_items(),
            sub_total_price: self.sub_total(),
        }
    }
}

impl From<Cart> for CartSummary {
    fn from(cart: Cart) -> Self {
        cart.summary()
    }
}

/// Stored carts are read leniently: an overflowing fold is clamped, not rejected.
impl From<CartSummary> for Cart {
    fn from(summary: CartSummary) -> Self {
        let mut cart = Cart::default();
        for item in summary.items {
            match cart.position(&item.key()) {
                Some(idx) => {
                    let line = &mut cart.items[idx];
                    line.quantity = line.quantity.checked_add(item.quantity).unwrap_or_else(|| {
                        log::warn!("Clamping overflowing quantity for variant {} in stored cart", item.id);
                        i32::MAX
                    });
                }
                None => cart.items.push(item),
            }
        }
        cart
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn phone(variant: i32, price: &str, quantity: i32) -> CartItem {
        CartItem {
            id: variant,
            title: "Pixel 7".to_string(),
            condition: Condition::Good,
            storage: "128GB".to_string(),
            color: "Black".to_string(),
            price: BigDecimal::from_str(price).expect("valid decimal"),
            quantity,
            image: None,
            seller_id: None,
            order_id: None,
            status: ItemStatus::InCart,
        }
    }

    #[test]
    fn repeated_adds_of_same_tuple_sum_quantities() {
        let mut cart = Cart::default();
        for qty in [1, 2, 4] {
            cart.add(phone(42, "199.99", qty)).expect("add");
        }

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 7);
    }

    #[test]
    fn differing_color_or_seller_makes_a_new_line() {
        let mut cart = Cart::default();
        cart.add(phone(42, "199.99", 1)).expect("add");

        let mut blue = phone(42, "199.99", 1);
        blue.color = "Blue".into();
        cart.add(blue).expect("add");

        let mut resold = phone(42, "199.99", 1);
        resold.seller_id = Some(9);
        cart.add(resold).expect("add");

        assert_eq!(cart.items().len(), 3);
    }

    #[test]
    fn totals_are_recomputed_from_lines() {
        let mut cart = Cart::default();
        cart.add(phone(1, "199.99", 2)).expect("add");
        cart.add(phone(2, "10.50", 3)).expect("add");

        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.sub_total(), BigDecimal::from_str("431.48").unwrap());
    }

    #[test]
    fn deserialization_ignores_stored_totals() {
        let json = r#"{
            "items": [{"id": 42, "title": "Pixel 7", "condition": "good",
                       "storage": "128GB", "color": "Black", "price": "199.99", "quantity": 2}],
            "totalItems": 99,
            "subTotalPrice": "1.00"
        }"#;
        let cart: Cart = serde_json::from_str(json).expect("parse");
        let summary = cart.summary();

        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.sub_total_price, BigDecimal::from_str("399.98").unwrap());
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let mut cart = Cart::default();
        let err = cart.add(phone(42, "199.99", 0)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn set_quantity_zero_removes_line() {
        let mut cart = Cart::default();
        cart.add(phone(42, "199.99", 3)).expect("add");
        let key = phone(42, "199.99", 1).key();

        assert!(cart.set_quantity(&key, 0).expect("set"));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity(&key, 2).expect("set"));
    }

    #[test]
    fn remove_variant_drops_all_its_lines() {
        let mut cart = Cart::default();
        cart.add(phone(42, "199.99", 1)).expect("add");
        let mut fair = phone(42, "149.99", 1);
        fair.condition = Condition::Fair;
        cart.add(fair).expect("add");
        cart.add(phone(7, "99.00", 1)).expect("add");

        assert_eq!(cart.remove_variant(42), 2);
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn folding_past_max_quantity_is_invalid_input() {
        let err = Cart::from_items([phone(42, "199.99", i32::MAX), phone(42, "199.99", 5)]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn stored_cart_with_overflowing_lines_still_loads() {
        let summary = CartSummary {
            items: vec![phone(42, "199.99", i32::MAX), phone(42, "199.99", 5)],
            total_items: 0,
            sub_total_price: BigDecimal::zero(),
        };

        let cart = Cart::from(summary);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, i32::MAX);
    }

    #[test]
    fn without_drops_matching_lines_only() {
        let mut cart = Cart::default();
        cart.add(phone(42, "199.99", 2)).expect("add");
        cart.add(phone(7, "99.00", 1)).expect("add");
        let mut bought = Cart::default();
        bought.add(phone(42, "199.99", 1)).expect("add");

        let rest = cart.without(&bought);

        assert_eq!(rest.items().len(), 1);
        assert_eq!(rest.items()[0].id, 7);
    }

    #[test]
    fn condition_parses_case_insensitively() {
        assert_eq!("EXCELLENT".parse::<Condition>().unwrap(), Condition::Excellent);
        assert_eq!(" fair ".parse::<Condition>().unwrap(), Condition::Fair);
        assert!("mint".parse::<Condition>().is_err());
    }
}
