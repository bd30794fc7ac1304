pub mod cart_service;
pub mod order_service;
pub mod shipping_service;
