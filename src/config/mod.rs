use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Externally visible base URL, used for OAuth redirects and upload URLs.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl ServerConfig {
    /// Directory uploaded files are written to and served from.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Open ID that is always promoted to admin on login.
    pub owner_open_id: Option<String>,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            owner_open_id: None,
            session_ttl_days: default_session_ttl_days(),
            cookie_name: default_cookie_name(),
        }
    }
}

fn default_session_ttl_days() -> i64 {
    365
}

fn default_cookie_name() -> String {
    "casehub_session".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    /// Provider name recorded as the user's login method.
    #[serde(default = "default_oauth_provider")]
    pub provider: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,
    /// Defaults to {public_url}/api/oauth/callback when unset.
    pub redirect_uri: Option<String>,
    #[serde(default = "default_scopes")]
    pub scopes: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            provider: default_oauth_provider(),
            client_id: String::new(),
            client_secret: String::new(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            userinfo_url: default_userinfo_url(),
            redirect_uri: None,
            scopes: default_scopes(),
        }
    }
}

fn default_oauth_provider() -> String {
    "google".to_string()
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_userinfo_url() -> String {
    "https://openidconnect.googleapis.com/v1/userinfo".to_string()
}

fn default_scopes() -> String {
    "openid email profile".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions endpoint for tag generation. Unset disables the call
    /// and tags fall back to category + tools.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub model: String,
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyConfig {
    /// Webhook receiving admin-to-owner broadcasts.
    pub owner_webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            oauth: OAuthConfig::default(),
            llm: LlmConfig::default(),
            notify: NotifyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// The OAuth redirect URI, falling back to the public URL.
    pub fn oauth_redirect_uri(&self) -> String {
        self.oauth
            .redirect_uri
            .clone()
            .unwrap_or_else(|| format!("{}/api/oauth/callback", self.server.public_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.session_ttl_days, 365);
        assert_eq!(config.oauth.provider, "google");
        assert!(config.auth.owner_open_id.is_none());
    }

    #[test]
    fn test_redirect_uri_fallback() {
        let mut config = Config::default();
        assert_eq!(
            config.oauth_redirect_uri(),
            "http://localhost:8080/api/oauth/callback"
        );
        config.oauth.redirect_uri = Some("https://example.com/cb".to_string());
        assert_eq!(config.oauth_redirect_uri(), "https://example.com/cb");
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [auth]
            owner_open_id = "owner-1"

            [server]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.auth.owner_open_id.as_deref(), Some("owner-1"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.level, "info");
    }
}
