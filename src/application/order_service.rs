use crate::domain::errors::DomainError;
use crate::domain::order::{OrderNumber, OrderSummary};
use crate::domain::ports::CartRepository;

/// Read side for finalized orders.
#[derive(Clone)]
pub struct OrderService<R> {
    repo: R,
}

impl<R: CartRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Malformed ids are reported as not found, same as unknown ones.
    pub fn get_order(&self, user: &str, order_id: &str) -> Result<OrderSummary, DomainError> {
        let Ok(number) = order_id.parse::<OrderNumber>() else {
            return Err(DomainError::NotFound);
        };
        self.repo
            .find_order(user, &number)?
            .filter(|record| !record.items.is_empty())
            .map(OrderSummary::from)
            .ok_or(DomainError::NotFound)
    }
}
