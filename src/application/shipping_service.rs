use crate::domain::errors::DomainError;
use crate::domain::ports::ShippingRepository;
use crate::domain::shipping::ShippingInfo;

#[derive(Clone)]
pub struct ShippingService<S> {
    repo: S,
}

impl<S: ShippingRepository> ShippingService<S> {
    pub fn new(repo: S) -> Self {
        Self { repo }
    }

    pub fn get(&self, user: &str) -> Result<Option<ShippingInfo>, DomainError> {
        self.repo.find(user)
    }

    pub fn save(&self, user: &str, info: ShippingInfo) -> Result<ShippingInfo, DomainError> {
        info.validate()?;
        self.repo.upsert(user, &info)
    }
}
