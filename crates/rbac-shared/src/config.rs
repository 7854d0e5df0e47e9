//! Configuration management

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub log: LogSettings,
    pub database: DatabaseSettings,
    pub policy: PolicySettings,
    pub root: RootSettings,
    #[serde(default)]
    pub menu: MenuSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// "json" or "pretty"
    pub format: String,
    /// Daily rolling log files are written here when set
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub run_migrations: bool,
}

/// Policy engine switch. When disabled, reload signals are dropped.
#[derive(Debug, Deserialize, Clone)]
pub struct PolicySettings {
    pub enabled: bool,
    pub debug: bool,
}

/// Reserved administrative account. Its name can never be taken by a managed user.
#[derive(Debug, Deserialize, Clone)]
pub struct RootSettings {
    pub user_name: String,
    pub real_name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MenuSettings {
    /// JSON menu tree loaded on an empty database
    pub seed_file: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.name", "rbac-server")?
            .set_default("log.level", "info")?
            .set_default("log.format", "pretty")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.run_migrations", true)?
            .set_default("policy.enabled", true)?
            .set_default("policy.debug", false)?
            .set_default("root.user_name", crate::constants::DEFAULT_ROOT_USER_NAME)?
            .set_default("root.real_name", "Super Administrator")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?;
        config.try_deserialize()
    }
}
