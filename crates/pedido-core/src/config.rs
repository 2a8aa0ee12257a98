//! Configuration management
//!
//! Settings are resolved with the following priority:
//! 1. Environment variables
//! 2. pedido-gateway.toml config file
//! 3. Default values
//!
//! `${VAR_NAME}` strings inside the config file are expanded from the
//! environment before parsing.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Main configuration for pedido-gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Bot message configuration
    #[serde(default)]
    pub bot: BotConfig,

    /// WhatsApp transport configuration
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port for the webhook HTTP server
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Menu link substituted into the greeting sequence
    #[serde(default = "default_menu_link")]
    pub menu_link: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            menu_link: default_menu_link(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// WebSocket URL of the WhatsApp bridge
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Path of the persisted credential state
    #[serde(default = "default_auth_path")]
    pub auth_path: String,

    /// Delay before a new session is attempted after an abnormal disconnect
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Upper bound on a single outbound send
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Pause between the welcome and menu messages of the greeting
    #[serde(default = "default_greeting_pause_ms")]
    pub greeting_pause_ms: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            auth_path: default_auth_path(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            greeting_pause_ms: default_greeting_pause_ms(),
        }
    }
}

fn default_api_port() -> u16 {
    3000
}

fn default_menu_link() -> String {
    "https://SEU-LINK-DO-CARDAPIO.com".to_string()
}

fn default_bridge_url() -> String {
    "ws://127.0.0.1:8066/session".to_string()
}

fn default_auth_path() -> String {
    "auth/creds.json".to_string()
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_greeting_pause_ms() -> u64 {
    1000
}

impl Config {
    /// Expand `${VAR_NAME}` occurrences from the environment.
    ///
    /// Unknown variables expand to the empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // consume '{'

                let mut var_name = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(chars.next().unwrap());
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file.
    ///
    /// Environment variables still take priority over file values.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let expanded_content = Self::expand_env_vars(&toml_content);

        let mut config: Config = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from the environment only.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from the default locations.
    ///
    /// Probes `./pedido-gateway.toml` first, then falls back to environment
    /// variables and defaults.
    pub fn load() -> Result<Self> {
        if Path::new("pedido-gateway.toml").exists() {
            return Self::from_toml_file("pedido-gateway.toml");
        }

        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.api.port = port;
            }
        }
        if let Ok(link) = std::env::var("LINK_CARDAPIO") {
            self.bot.menu_link = link;
        }
        if let Ok(url) = std::env::var("WA_BRIDGE_URL") {
            self.whatsapp.bridge_url = url;
        }
        if let Ok(path) = std::env::var("WA_AUTH_PATH") {
            self.whatsapp.auth_path = path;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.bot.menu_link, "https://SEU-LINK-DO-CARDAPIO.com");
        assert_eq!(config.whatsapp.reconnect_delay_secs, 5);
        assert_eq!(config.whatsapp.greeting_pause_ms, 1000);
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test-local variable, no other thread reads it
        unsafe { std::env::set_var("PEDIDO_TEST_LINK", "https://cardapio.example.com") };

        let expanded = Config::expand_env_vars("menu_link = \"${PEDIDO_TEST_LINK}\"");
        assert_eq!(expanded, "menu_link = \"https://cardapio.example.com\"");

        // unknown variables expand to empty
        let expanded = Config::expand_env_vars("${PEDIDO_TEST_MISSING_VAR}");
        assert_eq!(expanded, "");
    }

    #[test]
    fn test_parse_toml_sections() {
        let toml = r#"
            [api]
            port = 8080

            [bot]
            menu_link = "https://cardapio.example.com"

            [whatsapp]
            bridge_url = "ws://localhost:9000/session"
            reconnect_delay_secs = 2
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.bot.menu_link, "https://cardapio.example.com");
        assert_eq!(config.whatsapp.bridge_url, "ws://localhost:9000/session");
        assert_eq!(config.whatsapp.reconnect_delay_secs, 2);
        // missing keys keep their defaults
        assert_eq!(config.whatsapp.send_timeout_secs, 30);
    }
}
