use std::env;

use stealthpayledger::{config::LedgerConfig, ledger::LedgerBuilder};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let app_env = match env::var("LEDGER_APP_ENV") {
        Ok(v) if v.trim() == "dev" => AppEnv::Dev,
        _ => AppEnv::Prod,
    };

    println!("Running in {app_env} mode");

    if app_env == AppEnv::Dev {
        match dotenvy::dotenv() {
            Ok(path) => println!(".env read successfully from {}", path.display()),
            Err(e) => panic!("Could not load .env file: {e}"),
        };
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stealthpayledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let LedgerConfig {
        encryption_key,
        server,
        database,
    } = LedgerConfig::read_config_with_defaults();

    let ledger = LedgerBuilder::new()
        .with_encryption_key(encryption_key)
        .with_server(Some(server))
        .with_db(Some(database))
        .build()
        .await?;

    stealthpayledger::server::run_server(ledger).await
}

#[derive(Debug, PartialEq, Eq)]
pub enum AppEnv {
    Dev,
    Prod,
}

impl core::fmt::Display for AppEnv {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Dev => write!(f, "dev"),
            Self::Prod => write!(f, "prod"),
        }
    }
}
