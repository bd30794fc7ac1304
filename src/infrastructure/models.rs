use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::cart::CartItem;
use crate::domain::errors::DomainError;
use crate::domain::shipping::ShippingInfo;
use crate::schema::{cart_items, cart_syncs, orders, shipping_info};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub id: Uuid,
    pub user_id: String,
    pub variant_id: i32,
    pub title: String,
    pub condition: String,
    pub storage: String,
    pub color: String,
    pub seller_id: Option<i32>,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub image: Option<String>,
    pub status: String,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = DomainError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(CartItem {
            id: row.variant_id,
            title: row.title,
            condition: row.condition.parse()?,
            storage: row.storage,
            color: row.color,
            price: row.unit_price,
            quantity: row.quantity,
            image: row.image,
            seller_id: row.seller_id,
            order_id: row.order_id,
            status: row.status.parse()?,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItemRow<'a> {
    pub id: Uuid,
    pub user_id: &'a str,
    pub variant_id: i32,
    pub title: &'a str,
    pub condition: &'a str,
    pub storage: &'a str,
    pub color: &'a str,
    pub seller_id: Option<i32>,
    pub unit_price: &'a BigDecimal,
    pub quantity: i32,
    pub image: Option<&'a str>,
    pub status: &'a str,
}

impl<'a> NewCartItemRow<'a> {
    pub fn in_cart(user_id: &'a str, item: &'a CartItem) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            variant_id: item.id,
            title: &item.title,
            condition: item.condition.as_str(),
            storage: &item.storage,
            color: &item.color,
            seller_id: item.seller_id,
            unit_price: &item.price,
            quantity: item.quantity,
            image: item.image.as_deref(),
            status: "IN_CART",
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub order_number: String,
    pub user_id: String,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow<'a> {
    pub order_number: &'a str,
    pub user_id: &'a str,
    pub payment_intent_id: Option<&'a str>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_syncs)]
pub struct NewCartSyncRow<'a> {
    pub user_id: &'a str,
    pub sync_token: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = shipping_info)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShippingRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub updated_at: DateTime<Utc>,
}

impl From<ShippingRow> for ShippingInfo {
    fn from(row: ShippingRow) -> Self {
        ShippingInfo {
            name: row.name,
            email: row.email,
            phone: row.phone,
            address_line1: row.address_line1,
            address_line2: row.address_line2,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
        }
    }
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = shipping_info)]
#[diesel(treat_none_as_null = true)]
pub struct ShippingChangeset<'a> {
    pub user_id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub address_line1: &'a str,
    pub address_line2: Option<&'a str>,
    pub city: &'a str,
    pub state: &'a str,
    pub postal_code: &'a str,
    pub country: &'a str,
    pub updated_at: DateTime<Utc>,
}

impl<'a> ShippingChangeset<'a> {
    pub fn new(user_id: &'a str, info: &'a ShippingInfo) -> Self {
        Self {
            user_id,
            name: &info.name,
            email: &info.email,
            phone: info.phone.as_deref(),
            address_line1: &info.address_line1,
            address_line2: info.address_line2.as_deref(),
            city: &info.city,
            state: &info.state,
            postal_code: &info.postal_code,
            country: &info.country,
            updated_at: Utc::now(),
        }
    }
}
