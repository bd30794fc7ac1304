//! Mutex-guarded repositories for running without PostgreSQL.
//!
//! Each operation takes the lock once, so the multi-row operations (merge,
//! finalize) are atomic in the same sense as their database transactions.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::cart::{CartItem, ItemStatus, LineKey};
use crate::domain::errors::DomainError;
use crate::domain::order::{FinalizeOutcome, OrderNumber, OrderRecord};
use crate::domain::ports::{CartRepository, ShippingRepository};
use crate::domain::shipping::ShippingInfo;

#[derive(Debug, Clone)]
struct Row {
    user: String,
    item: CartItem,
}

#[derive(Debug, Clone)]
struct OrderHeader {
    user: String,
    payment_intent_id: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CartState {
    rows: Vec<Row>,
    syncs: HashSet<(String, Uuid)>,
    orders: HashMap<OrderNumber, OrderHeader>,
}

impl CartState {
    fn upsert(&mut self, user: &str, item: &CartItem) -> Result<(), DomainError> {
        let key = item.key();
        let existing = self.rows.iter_mut().find(|r| {
            r.user == user && r.item.status == ItemStatus::InCart && r.item.key() == key
        });
        match existing {
            Some(row) => {
                row.item.quantity = row.item.quantity.checked_add(item.quantity).ok_or_else(|| {
                    DomainError::InvalidInput(format!("quantity overflow for variant {}", item.id))
                })?;
            }
            None => {
                let mut item = item.clone();
                item.status = ItemStatus::InCart;
                item.order_id = None;
                self.rows.push(Row {
                    user: user.to_string(),
                    item,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCartRepository {
    state: Mutex<CartState>,
}

impl MemoryCartRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, CartState>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Internal("cart store lock poisoned".into()))
    }
}

impl CartRepository for MemoryCartRepository {
    fn list(&self, user: &str, status: ItemStatus) -> Result<Vec<CartItem>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .rows
            .iter()
            .filter(|r| r.user == user && r.item.status == status)
            .map(|r| r.item.clone())
            .collect())
    }

    fn upsert(&self, user: &str, item: &CartItem) -> Result<(), DomainError> {
        self.lock()?.upsert(user, item)
    }

    fn merge(
        &self,
        user: &str,
        items: &[CartItem],
        sync_token: Option<Uuid>,
    ) -> Result<bool, DomainError> {
        let mut state = self.lock()?;
        if let Some(token) = sync_token {
            if state.syncs.contains(&(user.to_string(), token)) {
                return Ok(false);
            }
        }

        // Restore the snapshot if any line fails so nothing is half-applied.
        let snapshot = state.rows.clone();
        for item in items {
            if let Err(e) = state.upsert(user, item) {
                state.rows = snapshot;
                return Err(e);
            }
        }
        if let Some(token) = sync_token {
            state.syncs.insert((user.to_string(), token));
        }
        Ok(true)
    }

    fn set_quantity(&self, user: &str, key: &LineKey, quantity: i32) -> Result<bool, DomainError> {
        let mut state = self.lock()?;
        let Some(idx) = state.rows.iter().position(|r| {
            r.user == user && r.item.status == ItemStatus::InCart && &r.item.key() == key
        }) else {
            return Ok(false);
        };
        if quantity == 0 {
            state.rows.remove(idx);
        } else {
            state.rows[idx].item.quantity = quantity;
        }
        Ok(true)
    }

    fn remove_variant(&self, user: &str, variant_id: i32) -> Result<usize, DomainError> {
        let mut state = self.lock()?;
        let before = state.rows.len();
        state.rows.retain(|r| {
            !(r.user == user && r.item.status == ItemStatus::InCart && r.item.id == variant_id)
        });
        Ok(before - state.rows.len())
    }

    fn clear(&self, user: &str) -> Result<usize, DomainError> {
        let mut state = self.lock()?;
        let before = state.rows.len();
        state
            .rows
            .retain(|r| !(r.user == user && r.item.status == ItemStatus::InCart));
        Ok(before - state.rows.len())
    }

    fn finalize(
        &self,
        user: &str,
        order_number: &OrderNumber,
        payment_intent_id: Option<&str>,
    ) -> Result<FinalizeOutcome, DomainError> {
        let mut state = self.lock()?;

        if let Some(intent) = payment_intent_id {
            let previous = state
                .orders
                .iter()
                .find(|(_, h)| h.payment_intent_id.as_deref() == Some(intent));
            if let Some((number, header)) = previous {
                if header.user != user {
                    return Err(DomainError::Conflict(format!(
                        "payment intent {intent} belongs to another order"
                    )));
                }
                return Ok(FinalizeOutcome {
                    order_number: number.clone(),
                    updated: 0,
                    replayed: true,
                });
            }
        }
        if state.orders.contains_key(order_number) {
            return Err(DomainError::Conflict(format!(
                "order number {order_number} already exists"
            )));
        }

        let mut updated = 0;
        for row in state
            .rows
            .iter_mut()
            .filter(|r| r.user == user && r.item.status == ItemStatus::InCart)
        {
            row.item.status = ItemStatus::Purchased;
            row.item.order_id = Some(order_number.to_string());
            updated += 1;
        }
        if updated == 0 {
            return Err(DomainError::EmptyCart);
        }

        state.orders.insert(
            order_number.clone(),
            OrderHeader {
                user: user.to_string(),
                payment_intent_id: payment_intent_id.map(str::to_string),
                created_at: Utc::now(),
            },
        );
        Ok(FinalizeOutcome {
            order_number: order_number.clone(),
            updated,
            replayed: false,
        })
    }

    fn find_order(
        &self,
        user: &str,
        order_number: &OrderNumber,
    ) -> Result<Option<OrderRecord>, DomainError> {
        let state = self.lock()?;
        let Some(header) = state.orders.get(order_number).filter(|h| h.user == user) else {
            return Ok(None);
        };
        let items = state
            .rows
            .iter()
            .filter(|r| {
                r.item.status == ItemStatus::Purchased
                    && r.item.order_id.as_deref() == Some(order_number.as_str())
            })
            .map(|r| r.item.clone())
            .collect();
        Ok(Some(OrderRecord {
            order_number: order_number.clone(),
            created_at: header.created_at,
            items,
        }))
    }
}

#[derive(Debug, Default)]
pub struct MemoryShippingRepository {
    rows: Mutex<HashMap<String, ShippingInfo>>,
}

impl MemoryShippingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShippingRepository for MemoryShippingRepository {
    fn find(&self, user: &str) -> Result<Option<ShippingInfo>, DomainError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| DomainError::Internal("shipping store lock poisoned".into()))?;
        Ok(rows.get(user).cloned())
    }

    fn upsert(&self, user: &str, info: &ShippingInfo) -> Result<ShippingInfo, DomainError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| DomainError::Internal("shipping store lock poisoned".into()))?;
        rows.insert(user.to_string(), info.clone());
        Ok(info.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::tests::phone;

    const USER: &str = "ada@example.com";

    fn order(n: &str) -> OrderNumber {
        n.parse().expect("valid order number")
    }

    #[test]
    fn failed_finalize_changes_nothing() {
        let repo = MemoryCartRepository::new();
        repo.upsert(USER, &phone(42, "199.99", 1)).unwrap();
        repo.finalize(USER, &order("ORD-00000001-001"), Some("pi_1"))
            .unwrap();
        repo.upsert(USER, &phone(7, "10.00", 1)).unwrap();

        // Reusing the order number is rejected before any row moves.
        let err = repo
            .finalize(USER, &order("ORD-00000001-001"), Some("pi_2"))
            .unwrap_err();

        assert!(matches!(err, DomainError::Conflict(_)));
        let in_cart = repo.list(USER, ItemStatus::InCart).unwrap();
        assert_eq!(in_cart.len(), 1);
        assert_eq!(in_cart[0].status, ItemStatus::InCart);
    }

    #[test]
    fn replayed_payment_intent_returns_first_order() {
        let repo = MemoryCartRepository::new();
        repo.upsert(USER, &phone(42, "199.99", 1)).unwrap();
        let first = repo
            .finalize(USER, &order("ORD-00000001-001"), Some("pi_1"))
            .unwrap();
        repo.upsert(USER, &phone(7, "10.00", 1)).unwrap();

        let replay = repo
            .finalize(USER, &order("ORD-00000002-002"), Some("pi_1"))
            .unwrap();

        assert!(replay.replayed);
        assert_eq!(replay.updated, 0);
        assert_eq!(replay.order_number, first.order_number);
        assert_eq!(repo.list(USER, ItemStatus::InCart).unwrap().len(), 1);
    }

    #[test]
    fn merge_failure_rolls_back_earlier_lines() {
        let repo = MemoryCartRepository::new();
        repo.upsert(USER, &phone(7, "10.00", i32::MAX)).unwrap();

        let err = repo
            .merge(USER, &[phone(42, "199.99", 1), phone(7, "10.00", 1)], None)
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidInput(_)));
        let items = repo.list(USER, ItemStatus::InCart).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 7);
    }

    #[test]
    fn carts_are_isolated_per_user() {
        let repo = MemoryCartRepository::new();
        repo.upsert(USER, &phone(42, "199.99", 1)).unwrap();

        assert!(repo.list("bob", ItemStatus::InCart).unwrap().is_empty());
        assert_eq!(repo.remove_variant("bob", 42).unwrap(), 0);
        assert_eq!(repo.list(USER, ItemStatus::InCart).unwrap().len(), 1);
    }
}
