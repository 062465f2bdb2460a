//! Fallback region and secret for [`Signer`](crate::Signer).

use std::fmt;

/// Environment variable holding the default region.
pub const REGION_VAR: &str = "AWS_REGION";
/// Environment variable holding the default secret access key.
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";

/// Values used when a signer is created with an empty region or secret.
///
/// Empty strings are treated the same as missing values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Defaults {
    region: Option<String>,
    secret_access_key: Option<String>,
}

impl Defaults {
    /// Create defaults from explicit values.
    pub fn new(region: Option<String>, secret_access_key: Option<String>) -> Self {
        Self {
            region: region.filter(|value| !value.is_empty()),
            secret_access_key: secret_access_key.filter(|value| !value.is_empty()),
        }
    }

    /// Read defaults from `AWS_REGION` and `AWS_SECRET_ACCESS_KEY`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var(REGION_VAR).ok(),
            std::env::var(SECRET_ACCESS_KEY_VAR).ok(),
        )
    }

    /// Get the default region, if any.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Whether a default secret access key is available.
    pub fn has_secret_access_key(&self) -> bool {
        self.secret_access_key.is_some()
    }

    /// Replace empty arguments with the defaults.
    ///
    /// Returns `(region, secret_access_key)`. When neither the argument nor
    /// the default is set the result is empty.
    pub fn resolve(&self, region: String, secret_access_key: String) -> (String, String) {
        let region = if region.is_empty() {
            self.region.clone().unwrap_or_default()
        } else {
            region
        };
        let secret_access_key = if secret_access_key.is_empty() {
            self.secret_access_key.clone().unwrap_or_default()
        } else {
            secret_access_key
        };
        (region, secret_access_key)
    }
}

impl fmt::Debug for Defaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defaults")
            .field("region", &self.region)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
