pub mod application;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

#[cfg(test)]
pub(crate) mod test_support;

use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::order_service::OrderService;
use application::shipping_service::ShippingService;
use domain::ports::{CartRepository, PaymentProvider, ShippingRepository};
use infrastructure::memory::{MemoryCartRepository, MemoryShippingRepository};

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

/// Services shared by every worker.
pub struct AppState {
    pub carts: CartService<Arc<dyn CartRepository>>,
    pub orders: OrderService<Arc<dyn CartRepository>>,
    pub shipping: ShippingService<Arc<dyn ShippingRepository>>,
    pub payments: Arc<dyn PaymentProvider>,
    /// ISO currency code used for every payment intent.
    pub currency: String,
}

impl AppState {
    pub fn new(
        carts: Arc<dyn CartRepository>,
        shipping: Arc<dyn ShippingRepository>,
        payments: Arc<dyn PaymentProvider>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            carts: CartService::new(carts.clone()),
            orders: OrderService::new(carts),
            shipping: ShippingService::new(shipping),
            payments,
            currency: currency.into(),
        }
    }

    /// State backed by process memory; nothing survives a restart.
    pub fn in_memory(payments: Arc<dyn PaymentProvider>, currency: impl Into<String>) -> Self {
        Self::new(
            Arc::new(MemoryCartRepository::new()),
            Arc::new(MemoryShippingRepository::new()),
            payments,
            currency,
        )
    }
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let listener = TcpListener::bind((host, port))?;
    build_server_on(state, listener)
}

/// Same as [`build_server`] but on an already bound listener, which lets
/// tests bind port 0 and read back the chosen address.
pub fn build_server_on(
    state: AppState,
    listener: TcpListener,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(state);
    let openapi = handlers::ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(handlers::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .listen(listener)?
    .run())
}
