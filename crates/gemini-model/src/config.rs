use std::env;
use std::fmt::{self, Debug};

/// Environment variables that may carry the API key, in lookup order.
pub const CREDENTIAL_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta";

/// Errors raised while assembling the provider configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No usable API key was provided.
    #[error(
        "API key is missing or empty, set GEMINI_API_KEY or API_KEY in the environment"
    )]
    MissingCredential,
}

/// A non-empty API key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Wraps an API key, rejecting empty or blank values.
    pub fn new<S: Into<String>>(key: S) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        Ok(Self(key))
    }

    /// Reads the API key from the first set variable in [`CREDENTIAL_VARS`].
    pub fn from_env() -> Result<Self, ConfigError> {
        CREDENTIAL_VARS
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|key| !key.trim().is_empty())
            .map(Self)
            .ok_or(ConfigError::MissingCredential)
    }

    #[inline]
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Builder for [`GeminiConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GeminiConfigBuilder {
    credential: Credential,
    model: Option<String>,
    base_url: Option<String>,
}

impl GeminiConfigBuilder {
    /// Creates a builder with the given credential.
    #[inline]
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential,
            model: None,
            base_url: None,
        }
    }

    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(
        api_key: S,
    ) -> Result<Self, ConfigError> {
        Credential::new(api_key).map(Self::with_credential)
    }

    /// Creates a builder from the environment.
    ///
    /// The API key is mandatory. `GEMINI_MODEL` and `GEMINI_BASE_URL` are
    /// picked up when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::with_credential(Credential::from_env()?);
        if let Ok(model) = env::var("GEMINI_MODEL") {
            builder = builder.with_model(model);
        }
        if let Ok(base_url) = env::var("GEMINI_BASE_URL") {
            builder = builder.with_base_url(base_url);
        }
        Ok(builder)
    }

    /// Sets the default model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> GeminiConfig {
        GeminiConfig {
            credential: self.credential,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            base_url: self
                .base_url
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
        }
    }
}

/// Configuration for the Gemini provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GeminiConfig {
    pub(crate) credential: Credential,
    pub(crate) model: String,
    pub(crate) base_url: String,
}

impl GeminiConfig {
    /// Returns the default model.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the API base URL.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
