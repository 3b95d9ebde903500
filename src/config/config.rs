use dotenv::dotenv;
use eyre::{Result, WrapErr};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub smtp_host: String,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub smtp_from: String,
    pub platform_name: String,
    /// Directory for locally stored audio artifacts.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
}

fn default_uploads_dir() -> String {
    "./uploads/audio".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        info!("Initializing configuration");
        let settings = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .wrap_err("Building configuration")?;

        settings
            .try_deserialize()
            .wrap_err("loading configuration from environment")
    }
}
