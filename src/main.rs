use std::sync::Arc;

use dotenvy::dotenv;
use refurb_store::config::AppConfig;
use refurb_store::domain::ports::{CartRepository, ShippingRepository};
use refurb_store::infrastructure::cart_repo::DieselCartRepository;
use refurb_store::infrastructure::memory::{MemoryCartRepository, MemoryShippingRepository};
use refurb_store::infrastructure::shipping_repo::DieselShippingRepository;
use refurb_store::infrastructure::stripe::StripeProvider;
use refurb_store::{build_server, create_pool, run_migrations, AppState};

fn invalid(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(invalid)?;

    let (carts, shipping): (Arc<dyn CartRepository>, Arc<dyn ShippingRepository>) =
        match &config.database_url {
            Some(url) => {
                let pool = create_pool(url).map_err(invalid)?;
                run_migrations(&pool).map_err(invalid)?;
                (
                    Arc::new(DieselCartRepository::new(pool.clone())),
                    Arc::new(DieselShippingRepository::new(pool)),
                )
            }
            None => {
                log::warn!("DATABASE_URL not set; carts are kept in memory");
                (
                    Arc::new(MemoryCartRepository::new()),
                    Arc::new(MemoryShippingRepository::new()),
                )
            }
        };
    let payments = Arc::new(StripeProvider::new(
        config.payment_api_base.as_str(),
        config.payment_secret_key.as_str(),
    ));
    let state = AppState::new(carts, shipping, payments, config.currency.as_str());

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(state, &config.host, config.port)?.await
}
