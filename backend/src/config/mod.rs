use std::fmt;

use config::{Config, ConfigError, Environment};
use dotenv::dotenv;
use serde::Deserialize;

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub db_user: String,
    pub db_password: String,
    pub db_server: String,
    pub db_name: String,
    pub db_port: u16,
    pub host: String,
    pub port: u16,
    pub pool_size: u32,
    /// Slots of each kind offered by the field catalogue.
    pub slots_per_kind: u8,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load .env file if present
        Self::from_source(Environment::default().try_parsing(true))
    }

    fn from_source(source: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("db_port", 5432)?
            .set_default("host", "127.0.0.1")?
            .set_default("port", 3000)?
            .set_default("pool_size", 10)?
            .set_default("slots_per_kind", 3)?
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_user, self.db_password, self.db_server, self.db_port, self.db_name
        )
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("db_user", &self.db_user)
            .field("db_password", &"***")
            .field("db_server", &self.db_server)
            .field("db_name", &self.db_name)
            .field("db_port", &self.db_port)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("pool_size", &self.pool_size)
            .field("slots_per_kind", &self.slots_per_kind)
            .finish()
    }
}
