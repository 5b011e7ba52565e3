//! Swapmeet Daemon
//!
//! Serves the exchange lifecycle API.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! cargo run -p swapmeetd
//!
//! # Start with custom environment
//! SWAPMEET_ENV=test SWAPMEET_API_PORT=8081 cargo run -p swapmeetd
//!
//! # Against Postgres
//! SWAPMEET_DATABASE_URL=postgres://localhost/swapmeet cargo run -p swapmeetd --features postgres
//! ```
//!
//! # Environment Variables
//!
//! - `SWAPMEET_ENV`: Environment (test, development, production)
//! - `SWAPMEET_API_HOST`: API host (default: 0.0.0.0)
//! - `SWAPMEET_API_PORT`: API port (default: 8080)
//! - `SWAPMEET_TX_MAX_ATTEMPTS`: Attempts per transaction (default: 5)
//! - `SWAPMEET_IN_APP_NOTIFICATIONS`: Write in-app entries (default: true)
//! - `SWAPMEET_EVENT_BUS_CAPACITY`: Notification buffer (default: 1000)
//! - `SWAPMEET_DATABASE_URL`: Postgres URL (postgres feature only)

use swapmeetd::{Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("swapmeetd=info".parse()?)
                .add_directive("swapmeet_exec=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        "Swapmeet Daemon"
    );

    run(config).await
}

#[cfg(feature = "postgres")]
async fn run(config: Config) -> anyhow::Result<()> {
    if config.database_url.is_some() {
        Daemon::new_postgres(config).await?.run().await?;
    } else {
        Daemon::new_stub(config).run().await?;
    }
    Ok(())
}

#[cfg(not(feature = "postgres"))]
async fn run(config: Config) -> anyhow::Result<()> {
    Daemon::new_stub(config).run().await?;
    Ok(())
}
