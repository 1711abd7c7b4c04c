use std::{env, net::SocketAddr};

use clap::Parser;

#[derive(Parser, Debug)]
pub struct Opts {
    #[clap(long, env = "LEDGER_ENCRYPTION_KEY")]
    pub encryption_key: String,
    #[clap(flatten)]
    pub server: ServerConfig,
    #[clap(flatten)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Parser)]
pub struct DatabaseConfig {
    #[clap(long, env = "DATABASE_URL")]
    pub db_url: String,

    #[clap(long, default_value_t = 5, env = "LEDGER_DB_MAX_CONNECTIONS")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_url: "".to_owned(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Parser)]
pub struct ServerConfig {
    #[clap(long, default_value = "[::]:3000", env = "LEDGER_HOST_PORT")]
    pub host_port: SocketAddr,
    #[clap(long, env = "LEDGER_API_PREFIX")]
    pub api_prefix: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host_port: "[::]:3000".to_string().parse().expect("invalid host port"),
            api_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LedgerConfig {
    pub encryption_key: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

impl From<Opts> for LedgerConfig {
    fn from(opts: Opts) -> Self {
        Self {
            encryption_key: opts.encryption_key,
            server: opts.server,
            database: opts.database,
        }
    }
}

impl LedgerConfig {
    pub fn read_config_with_defaults() -> Self {
        let opts: Opts = Opts::parse();
        opts.into()
    }

    pub const fn new(
        encryption_key: String,
        server: ServerConfig,
        database: DatabaseConfig,
    ) -> Self {
        Self {
            encryption_key,
            server,
            database,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildParams {
    pub commit_hash: Option<String>,
    pub build_time: Option<String>,
    pub cargo_pkg_version: Option<String>,
}

impl BuildParams {
    pub fn from_env() -> Self {
        Self {
            commit_hash: env::var("COMMITHASH").ok(),
            build_time: env::var("BUILDTIME").ok(),
            cargo_pkg_version: Some(env!("CARGO_PKG_VERSION").to_owned()),
        }
    }

    pub fn full_version(&self) -> String {
        format!(
            "stealthpay-ledger/{}-{}",
            self.cargo_pkg_version
                .as_ref()
                .unwrap_or(&"unknown".to_string()),
            self.commit_hash.as_ref().unwrap_or(&"unknown".to_string())
        )
    }
}
