use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

/// Application configuration loaded from config.yaml, with environment
/// overrides for container deployments. Construct once at startup,
/// validate, and share read-only behind an `Arc`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// HMAC signing secret. A length of 32 bytes or more is recommended.
    #[serde(default)]
    pub secret: String,

    /// Absolute base URL including scheme, e.g. `https://example.com`.
    #[serde(default)]
    pub app_url: String,

    /// Global route prefix shared by all generated URLs, e.g. `api`.
    #[serde(default)]
    pub global_prefix: String,
}

impl AppConfig {
    /// Load configuration from a YAML file (if given), then apply the
    /// `LINKSEAL_SECRET`, `LINKSEAL_APP_URL`, and `LINKSEAL_PREFIX`
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config: Self = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                serde_yaml::from_str(&content)?
            }
            None => Self::default(),
        };

        if let Ok(secret) = std::env::var("LINKSEAL_SECRET") {
            config.secret = secret;
        }
        if let Ok(app_url) = std::env::var("LINKSEAL_APP_URL") {
            config.app_url = app_url;
        }
        if let Ok(prefix) = std::env::var("LINKSEAL_PREFIX") {
            config.global_prefix = prefix;
        }

        Ok(config)
    }

    /// Fatal startup checks. A short secret is allowed (the generator
    /// warns about it); a missing secret or a schemeless app url prevents
    /// the process from serving traffic at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.app_url.is_empty() {
            return Err(ConfigError::MissingAppUrl);
        }
        if !self.app_url.starts_with("http://") && !self.app_url.starts_with("https://") {
            return Err(ConfigError::SchemelessAppUrl(self.app_url.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(secret: &str, app_url: &str) -> AppConfig {
        AppConfig {
            secret: secret.to_string(),
            app_url: app_url.to_string(),
            global_prefix: String::new(),
        }
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(config("0123456789abcdef0123456789abcdef", "https://example.com")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let err = config("", "https://example.com").validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret));
    }

    #[test]
    fn test_validate_rejects_empty_app_url() {
        let err = config("secret", "").validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingAppUrl));
    }

    #[test]
    fn test_validate_rejects_schemeless_app_url() {
        let err = config("secret", "example.com").validate().unwrap_err();
        assert!(matches!(err, ConfigError::SchemelessAppUrl(url) if url == "example.com"));
    }

    #[test]
    fn test_parse_yaml_config() {
        let yaml = "secret: abc\napp_url: https://example.com\nglobal_prefix: api\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.secret, "abc");
        assert_eq!(config.app_url, "https://example.com");
        assert_eq!(config.global_prefix, "api");
    }

    #[test]
    fn test_parse_yaml_defaults_missing_fields() {
        let config: AppConfig = serde_yaml::from_str("app_url: https://example.com\n").unwrap();
        assert_eq!(config.secret, "");
        assert_eq!(config.global_prefix, "");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "secret: s\napp_url: https://example.com").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.app_url, "https://example.com");
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/config.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
