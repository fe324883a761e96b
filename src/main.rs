use std::sync::Arc;

use blogicum::config::Settings;
use blogicum::database::{connect_to_database, migrate};
use blogicum::error::Result;
use blogicum::store::{BlogStore, MemoryStore, MySqlStore};
use blogicum::{app, AppState};
use dotenv::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
                format!(
                    "{}=debug,tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    let store: Arc<dyn BlogStore> = if settings.uses_memory_store() {
        tracing::warn!("using the in-memory store, data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let pool = connect_to_database(&settings.db_url)?;
        migrate(&pool)?;
        Arc::new(MySqlStore::new(pool))
    };

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    let app = app(AppState::new(store, settings));
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
