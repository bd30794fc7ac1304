pub mod cart_repo;
pub mod memory;
pub mod models;
pub mod shipping_repo;
pub mod stripe;
