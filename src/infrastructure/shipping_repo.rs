use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::ShippingRepository;
use crate::domain::shipping::ShippingInfo;
use crate::schema::shipping_info;

use super::models::{ShippingChangeset, ShippingRow};

pub struct DieselShippingRepository {
    pool: DbPool,
}

impl DieselShippingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ShippingRepository for DieselShippingRepository {
    fn find(&self, user: &str) -> Result<Option<ShippingInfo>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = shipping_info::table
            .find(user)
            .select(ShippingRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(ShippingInfo::from))
    }

    fn upsert(&self, user: &str, info: &ShippingInfo) -> Result<ShippingInfo, DomainError> {
        let mut conn = self.pool.get()?;

        let changes = ShippingChangeset::new(user, info);
        let row = diesel::insert_into(shipping_info::table)
            .values(&changes)
            .on_conflict(shipping_info::user_id)
            .do_update()
            .set(&changes)
            .returning(ShippingRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }
}
