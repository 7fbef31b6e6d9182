use crate::core::errors::SessionError;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;

/// Identity of an authenticated dashboard session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub account_id: String,
    pub token: Secret<String>,
    pub base_url: Option<String>,
}

// Custom Serialize implementation - never expose the session token
impl Serialize for SessionConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("SessionConfig", 3)?;
        state.serialize_field("account_id", &self.account_id)?;
        state.serialize_field("token", "[REDACTED]")?;
        state.serialize_field("base_url", &self.base_url)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for SessionConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct SessionConfigHelper {
            account_id: String,
            token: String,
            base_url: Option<String>,
        }

        let helper = SessionConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            account_id: helper.account_id,
            token: Secret::new(helper.token),
            base_url: helper.base_url,
        })
    }
}

impl SessionConfig {
    /// Create a new configuration from an account id and session token
    #[must_use]
    pub fn new(account_id: String, token: String) -> Self {
        Self {
            account_id,
            token: Secret::new(token),
            base_url: None,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_ACCOUNT_ID` (e.g., `POLYGON_ACCOUNT_ID`)
    /// - `{PREFIX}_TOKEN` (e.g., `POLYGON_TOKEN`)
    /// - `{PREFIX}_BASE_URL` (optional)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let account_id_var = format!("{}_ACCOUNT_ID", prefix);
        let token_var = format!("{}_TOKEN", prefix);
        let base_url_var = format!("{}_BASE_URL", prefix);

        let account_id = env::var(&account_id_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(account_id_var))?;

        let token =
            env::var(&token_var).map_err(|_| ConfigError::MissingEnvironmentVariable(token_var))?;

        let base_url = env::var(&base_url_var).ok();

        Ok(Self {
            account_id,
            token: Secret::new(token),
            base_url,
        })
    }

    /// Create configuration from a .env file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        load_env_file(env_file_path)?;
        Self::from_env(prefix)
    }

    /// Set custom base URL
    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Check that both halves of the session identity are present
    pub fn validate(&self) -> Result<(), SessionError> {
        SessionError::require("account_id", &self.account_id)?;
        SessionError::require("token", self.token.expose_secret())
    }

    /// Get the session token (use carefully - exposes secret)
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

/// Dashboard login credentials used by the authentication handshake
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub email: String,
    pub password: Secret<String>,
}

impl LoginCredentials {
    #[must_use]
    pub fn new(email: String, password: String) -> Self {
        Self {
            email,
            password: Secret::new(password),
        }
    }

    /// Read `{PREFIX}_EMAIL` and `{PREFIX}_PASSWORD`
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let email_var = format!("{}_EMAIL", prefix);
        let password_var = format!("{}_PASSWORD", prefix);

        let email =
            env::var(&email_var).map_err(|_| ConfigError::MissingEnvironmentVariable(email_var))?;
        let password = env::var(&password_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(password_var))?;

        Ok(Self::new(email, password))
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        SessionError::require("email", &self.email)?;
        SessionError::require("password", self.password.expose_secret())
    }

    /// Get the password (use carefully - exposes secret)
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

#[cfg(feature = "env-file")]
fn load_env_file(env_file_path: &str) -> Result<(), ConfigError> {
    match dotenv::from_path(env_file_path) {
        Ok(()) => Ok(()),
        // No .env file is fine - fall back to the process environment
        Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigError::InvalidConfiguration(format!(
            "Failed to load .env file '{}': {}",
            env_file_path, e
        ))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_redacts_token() {
        let config = SessionConfig::new("acct-1".to_string(), "super-secret".to_string());
        let json = serde_json::to_string(&config).unwrap();

        assert!(json.contains("acct-1"));
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("super-secret"));
    }

    #[test]
    fn test_deserialize_wraps_token() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"account_id":"acct-1","token":"tok","base_url":null}"#)
                .unwrap();
        assert_eq!(config.token(), "tok");
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_validate_rejects_missing_identity() {
        let config = SessionConfig::new(String::new(), "tok".to_string());
        assert!(config.validate().unwrap_err().is_invalid_input());

        let config = SessionConfig::new("acct-1".to_string(), String::new());
        assert!(config.validate().unwrap_err().is_invalid_input());

        let config = SessionConfig::new("acct-1".to_string(), "tok".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env_missing_variable() {
        let err = SessionConfig::from_env("POLYGONX_UNSET_PREFIX").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvironmentVariable(var) if var == "POLYGONX_UNSET_PREFIX_ACCOUNT_ID"));
    }

    #[test]
    fn test_login_credentials_validate() {
        assert!(LoginCredentials::new(String::new(), "pw".to_string())
            .validate()
            .is_err());
        assert!(LoginCredentials::new("me@example.com".to_string(), String::new())
            .validate()
            .is_err());
        assert!(LoginCredentials::new("me@example.com".to_string(), "pw".to_string())
            .validate()
            .is_ok());
    }
}
