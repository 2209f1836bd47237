//! Account credentials and endpoint configuration.
//!
//! Credentials are an explicit value handed to the client, never global
//! state. `from_env` reads the same variables for binaries and tests that
//! prefer environment configuration.

use std::fmt;
use std::time::Duration;

use crate::error::ApiError;

pub const ENV_SUBDOMAIN: &str = "INVOICEXPRESS_SUBDOMAIN";
pub const ENV_API_KEY: &str = "INVOICEXPRESS_API_KEY";
/// Optional override of the API base, e.g. a local mock server.
pub const ENV_BASE_URL: &str = "INVOICEXPRESS_BASE_URL";

/// Transport timeout applied to every request unless the client overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(40);

/// The account subdomain and API key used for every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    subdomain: String,
    api_token: String,
}

impl Credentials {
    pub fn new(subdomain: impl Into<String>, api_token: impl Into<String>) -> Result<Self, ApiError> {
        let subdomain = subdomain.into().trim().to_string();
        let api_token = api_token.into().trim().to_string();
        if subdomain.is_empty() {
            return Err(ApiError::Configuration("account subdomain is empty".to_string()));
        }
        if api_token.is_empty() {
            return Err(ApiError::Configuration("API key is empty".to_string()));
        }
        Ok(Self {
            subdomain,
            api_token,
        })
    }

    pub fn from_env() -> Result<Self, ApiError> {
        let read = |name: &str| {
            std::env::var(name)
                .map_err(|_| ApiError::Configuration(format!("environment variable {name} is not set")))
        };
        Self::new(read(ENV_SUBDOMAIN)?, read(ENV_API_KEY)?)
    }

    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    /// `https://{subdomain}.app.invoicexpress.com`
    pub fn api_base_url(&self) -> String {
        format!("https://{}.app.invoicexpress.com", self.subdomain)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("subdomain", &self.subdomain)
            .field("api_token", &mask(&self.api_token))
            .finish()
    }
}

/// Mask a secret for logs, keeping at most the last four characters.
pub(crate) fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 8 {
        "*".repeat(count)
    } else {
        let tail: String = secret.chars().skip(count - 4).collect();
        format!("****{tail}")
    }
}
