//! Service configuration.
//!
//! Loaded once at startup from a TOML file layered under `NAMED_COUNTER_*`
//! environment variables (nested keys split on `__`, e.g.
//! `NAMED_COUNTER_STORE__URL`). Every field has a default, so an absent file
//! yields an in-memory development setup.

use crate::modules::counters::adapters::outbound::counter_store_sqlite::DEFAULT_TABLE_NAME;
use crate::modules::counters::use_cases::next_counter_value::retry_policy::RetryPolicy;
use crate::shared::inbound::caller_identity::DEFAULT_OWNER_ID;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_PREFIX: &str = "NAMED_COUNTER_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub counters: CountersConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory,
    Sqlite {
        /// Connection string, e.g. `sqlite://data/counters.db`.
        url: String,
        #[serde(default = "default_table")]
        table: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory
    }
}

fn default_table() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_max_connections() -> u32 {
    4
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountersConfig {
    /// Owner used for requests that carry no caller identity.
    pub default_owner_id: String,
    pub retry: RetryPolicy,
}

impl Default for CountersConfig {
    fn default() -> Self {
        Self {
            default_owner_id: DEFAULT_OWNER_ID.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }
}
