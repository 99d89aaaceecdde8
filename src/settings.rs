use std::net::SocketAddr;

use anyhow::Result;
use board_proxy::{ProxyConfig, DEFAULT_BOARD_ID, DEFAULT_ENDPOINT, DEFAULT_PAGE_SIZE, TOKEN_VAR};
use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::CLIENT_NAME;

const CONFIG_NAME: &str = "config.toml";
const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub listen: SocketAddr,
    pub monday: Monday,
}

#[derive(Debug, Deserialize)]
pub struct Monday {
    pub api_token: Option<String>,
    pub endpoint: String,
    pub board_id: u64,
    pub page_size: u32,
}

impl Settings {
    pub fn new(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut s = Config::builder()
            .set_default("listen", DEFAULT_LISTEN)?
            .set_default("monday.endpoint", DEFAULT_ENDPOINT)?
            .set_default("monday.board_id", DEFAULT_BOARD_ID as i64)?
            .set_default("monday.page_size", i64::from(DEFAULT_PAGE_SIZE))?;

        if let Some(path) = config_path {
            s = s.add_source(File::with_name(path));
        } else {
            s = s.add_source(File::with_name(&default_config_path()).required(false));
        }

        s.add_source(Environment::with_prefix("SLOTTER").separator("__"))
            .set_override_option("monday.api_token", std::env::var(TOKEN_VAR).ok())?
            .build()?
            .try_deserialize()
    }

    pub fn proxy_config(&self) -> Result<ProxyConfig> {
        Ok(ProxyConfig {
            api_token: self.monday.api_token.clone(),
            endpoint: Url::parse(&self.monday.endpoint)?,
            board_id: self.monday.board_id,
            page_size: self.monday.page_size,
        })
    }
}

pub(crate) fn default_config_path() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| std::env::temp_dir()))
        .join(CLIENT_NAME)
        .join(CONFIG_NAME)
        .display()
        .to_string()
}
