//! Application configuration structures.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Portal access and page structure
    #[serde(default)]
    pub portal: PortalConfig,

    /// Local data locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Chat bot channel
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Mail channel
    #[serde(default)]
    pub email: EmailConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Override secrets from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(username) = env::var("POOLWATCH_PORTAL_USERNAME") {
            self.portal.username = username;
        }
        if let Ok(password) = env::var("POOLWATCH_PORTAL_PASSWORD") {
            self.portal.password = password;
        }
        if let Ok(token) = env::var("POOLWATCH_TELEGRAM_TOKEN") {
            self.telegram.token = token;
        }
        if let Ok(chat_id) = env::var("POOLWATCH_TELEGRAM_CHAT_ID") {
            match chat_id.parse() {
                Ok(id) => self.telegram.chat_id = id,
                Err(_) => log::warn!("Ignoring non-numeric POOLWATCH_TELEGRAM_CHAT_ID"),
            }
        }
        if let Ok(key) = env::var("POOLWATCH_EMAIL_API_KEY") {
            self.email.api_key = key;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let portal = &self.portal;
        if portal.base_url.trim().is_empty() {
            return Err(AppError::validation("portal.base_url is empty"));
        }
        url::Url::parse(&portal.base_url)?;
        if portal.user_agent.trim().is_empty() {
            return Err(AppError::validation("portal.user_agent is empty"));
        }
        if portal.timeout_secs == 0 {
            return Err(AppError::validation("portal.timeout_secs must be > 0"));
        }
        if portal.listing_marker.trim().is_empty() {
            return Err(AppError::validation("portal.listing_marker is empty"));
        }
        portal.selectors.validate()?;

        if self.storage.processed_file.trim().is_empty() {
            return Err(AppError::validation("storage.processed_file is empty"));
        }

        if !self.telegram.enabled && !self.email.enabled {
            return Err(AppError::validation(
                "No notification channel enabled (telegram or email)",
            ));
        }
        if self.telegram.enabled {
            if self.telegram.token.trim().is_empty() {
                return Err(AppError::validation("telegram.token is empty"));
            }
            if self.telegram.chat_id == 0 {
                return Err(AppError::validation("telegram.chat_id is not set"));
            }
        }
        if self.email.enabled {
            if self.email.api_key.trim().is_empty() {
                return Err(AppError::validation("email.api_key is empty"));
            }
            if self.email.sender_email.trim().is_empty() {
                return Err(AppError::validation("email.sender_email is empty"));
            }
            if self.email.recipients.is_empty() {
                return Err(AppError::validation("email.recipients is empty"));
            }
        }
        Ok(())
    }
}

/// Portal access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Root URL of the pool site
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Login page, relative to `base_url`
    #[serde(default = "defaults::login_path")]
    pub login_path: String,

    /// Listing overview page, relative to `base_url`
    #[serde(default = "defaults::overview_path")]
    pub overview_path: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Form field carrying the username
    #[serde(default = "defaults::username_field")]
    pub username_field: String,

    /// Form field carrying the password
    #[serde(default = "defaults::password_field")]
    pub password_field: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Query parameter that marks listing links and carries the id
    #[serde(default = "defaults::listing_marker")]
    pub listing_marker: String,

    /// The first image on a detail page is a thumbnail of the second
    #[serde(default = "defaults::skip_first_image")]
    pub skip_first_image: bool,

    /// CSS selectors for the portal pages
    #[serde(default)]
    pub selectors: PortalSelectors,
}

impl PortalConfig {
    /// Absolute URL of a page below `base_url`.
    pub fn page_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            login_path: defaults::login_path(),
            overview_path: defaults::overview_path(),
            username: String::new(),
            password: String::new(),
            username_field: defaults::username_field(),
            password_field: defaults::password_field(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            listing_marker: defaults::listing_marker(),
            skip_first_image: defaults::skip_first_image(),
            selectors: PortalSelectors::default(),
        }
    }
}

/// CSS selectors describing the portal markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSelectors {
    /// Present on the overview page once listings are rendered
    #[serde(default = "defaults::overview_ready")]
    pub overview_ready: String,

    #[serde(default = "defaults::details_container")]
    pub details_container: String,

    #[serde(default = "defaults::detail_key")]
    pub detail_key: String,

    #[serde(default = "defaults::detail_value")]
    pub detail_value: String,

    /// Holds both the description spans and the photos
    #[serde(default = "defaults::images_container")]
    pub images_container: String,

    #[serde(default = "defaults::description_item")]
    pub description_item: String,

    #[serde(default = "defaults::image")]
    pub image: String,
}

impl PortalSelectors {
    fn validate(&self) -> Result<()> {
        for selector in [
            &self.overview_ready,
            &self.details_container,
            &self.detail_key,
            &self.detail_value,
            &self.images_container,
            &self.description_item,
            &self.image,
        ] {
            Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }
        Ok(())
    }
}

impl Default for PortalSelectors {
    fn default() -> Self {
        Self {
            overview_ready: defaults::overview_ready(),
            details_container: defaults::details_container(),
            detail_key: defaults::detail_key(),
            detail_value: defaults::detail_value(),
            images_container: defaults::images_container(),
            description_item: defaults::description_item(),
            image: defaults::image(),
        }
    }
}

/// Local data locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of all local state
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,

    /// Processed-id store, relative to `data_dir`
    #[serde(default = "defaults::processed_file")]
    pub processed_file: String,
}

impl StorageConfig {
    pub fn processed_path(&self) -> PathBuf {
        self.data_dir.join(&self.processed_file)
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.data_dir.join("photos")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            processed_file: defaults::processed_file(),
        }
    }
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::telegram_api_base")]
    pub api_base: String,

    /// Bot token issued by BotFather
    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub chat_id: i64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            api_base: defaults::telegram_api_base(),
            token: String::new(),
            chat_id: 0,
        }
    }
}

/// Transactional mail API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::email_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub sender_email: String,

    #[serde(default = "defaults::sender_name")]
    pub sender_name: String,

    #[serde(default)]
    pub recipients: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            api_url: defaults::email_api_url(),
            api_key: String::new(),
            sender_email: String::new(),
            sender_name: defaults::sender_name(),
            recipients: Vec::new(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Portal defaults
    pub fn base_url() -> String {
        "https://portal.koopman.nl/PoolSite".into()
    }
    pub fn login_path() -> String {
        "/Login".into()
    }
    pub fn overview_path() -> String {
        "/".into()
    }
    pub fn username_field() -> String {
        "Input_Email".into()
    }
    pub fn password_field() -> String {
        "Input_Password".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; poolwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn listing_marker() -> String {
        "VehicleId".into()
    }
    pub fn skip_first_image() -> bool {
        true
    }

    // Selector defaults
    pub fn overview_ready() -> String {
        ".osui-accordion-item".into()
    }
    pub fn details_container() -> String {
        "#b5-Container_VoertuigDetail".into()
    }
    pub fn detail_key() -> String {
        ".item".into()
    }
    pub fn detail_value() -> String {
        ".itemvalue".into()
    }
    pub fn images_container() -> String {
        "#Container_Images".into()
    }
    pub fn description_item() -> String {
        "span".into()
    }
    pub fn image() -> String {
        "img".into()
    }

    // Storage defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn processed_file() -> String {
        "scraped.txt".into()
    }

    // Channel defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn telegram_api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn email_api_url() -> String {
        "https://api.brevo.com/v3/smtp/email".into()
    }
    pub fn sender_name() -> String {
        "poolwatch".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        let mut config = Config::default();
        config.telegram.token = "123:abc".to_string();
        config.telegram.chat_id = 123456789;
        config.email.api_key = "key".to_string();
        config.email.sender_email = "pool@example.com".to_string();
        config.email.recipients = vec!["abc@example.com".to_string()];
        config
    }

    #[test]
    fn validate_configured_ok() {
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn validate_rejects_default_without_secrets() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn validate_rejects_no_channels() {
        let mut config = configured();
        config.telegram.enabled = false;
        config.email.enabled = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_allows_single_channel() {
        let mut config = configured();
        config.email = EmailConfig {
            enabled: false,
            ..EmailConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = configured();
        config.portal.selectors.detail_key = "[[invalid".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = configured();
        config.portal.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [portal]
            username = "me@example.com"

            [storage]
            data_dir = "/var/lib/poolwatch"

            [email]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.portal.username, "me@example.com");
        assert_eq!(config.portal.listing_marker, "VehicleId");
        assert_eq!(
            config.storage.processed_path(),
            PathBuf::from("/var/lib/poolwatch/scraped.txt")
        );
        assert!(!config.email.enabled);
        assert!(config.telegram.enabled);
    }

    #[test]
    fn page_url_joins_paths() {
        let portal = PortalConfig::default();
        assert_eq!(
            portal.page_url("/Login"),
            "https://portal.koopman.nl/PoolSite/Login"
        );
        assert_eq!(portal.page_url("/"), "https://portal.koopman.nl/PoolSite/");
    }

    #[test]
    fn sample_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.storage.processed_file, "scraped.txt");
        assert_eq!(
            config.portal.selectors.details_container,
            "#b5-Container_VoertuigDetail"
        );
    }
}
