//! SigV4 signing of POST policies.
//!
//! The string to sign is the base64 encoding of the policy document. It is
//! signed with a key derived from the secret through the SigV4 chain:
//!
//! ```text
//! DateKey              = HMAC-SHA256("AWS4" + secret, "YYYYMMDD")
//! DateRegionKey        = HMAC-SHA256(DateKey, region)
//! DateRegionServiceKey = HMAC-SHA256(DateRegionKey, "s3")
//! SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
//! Signature            = Hex(HMAC-SHA256(SigningKey, StringToSign))
//! ```
//!
//! See [Calculating a signature] for the details.
//!
//! [Calculating a signature]: https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-authentication-HTTPPOST.html

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::config::Defaults;

/// Service name in the credential scope.
pub const SERVICE: &str = "s3";

/// Last element of the credential scope.
const TERMINATOR: &str = "aws4_request";

/// Errors that can occur during signing.
#[derive(Error, Debug)]
pub enum SignError {
    /// The HMAC primitive rejected a derived key.
    #[error("HMAC rejected the signing key: {0}")]
    InvalidKey(InvalidLength),
}

impl From<InvalidLength> for SignError {
    fn from(error: InvalidLength) -> Self {
        Self::InvalidKey(error)
    }
}

/// A signed policy, ready to be put in the `policy` and `x-amz-signature`
/// form fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signed {
    /// Base64 encoded policy document (the string to sign).
    pub policy: String,
    /// Lowercase hex encoded signature.
    pub signature: String,
}

/// Signs POST policies for one region with one secret access key.
///
/// `Signer` holds no mutable state, so a single instance can sign from many
/// threads at once.
#[derive(Clone)]
pub struct Signer<C = SystemClock> {
    region: String,
    secret_access_key: String,
    clock: C,
}

impl Signer {
    /// Create a signer using the system clock.
    ///
    /// If `region` or `secret_access_key` is empty, the value is taken from
    /// `AWS_REGION` or `AWS_SECRET_ACCESS_KEY` respectively. The environment
    /// is read here and never while signing.
    pub fn new(region: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        let (region, secret_access_key) = (region.into(), secret_access_key.into());
        if region.is_empty() || secret_access_key.is_empty() {
            Self::with_defaults(region, secret_access_key, &Defaults::from_env())
        } else {
            Self::with_defaults(region, secret_access_key, &Defaults::default())
        }
    }

    /// Create a signer using the system clock, filling empty arguments from
    /// `defaults`.
    pub fn with_defaults(
        region: impl Into<String>,
        secret_access_key: impl Into<String>,
        defaults: &Defaults,
    ) -> Self {
        let (region, secret_access_key) = defaults.resolve(region.into(), secret_access_key.into());
        Self {
            region,
            secret_access_key,
            clock: SystemClock,
        }
    }
}

impl<C> Signer<C> {
    /// Replace the clock used by [`Signer::sign`].
    pub fn with_clock<T: Clock>(self, clock: T) -> Signer<T> {
        Signer {
            region: self.region,
            secret_access_key: self.secret_access_key,
            clock,
        }
    }

    /// Get the region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sign a policy document as of `time`.
    ///
    /// Only the UTC date of `time` affects the signature.
    pub fn sign_at(&self, policy: &[u8], time: DateTime<Utc>) -> Result<Signed, SignError> {
        let string_to_sign = STANDARD.encode(policy);
        let key = SigningKey::derive(&self.secret_access_key, &date_stamp(time), &self.region)?;
        let signature = key.sign(string_to_sign.as_bytes());

        Ok(Signed {
            policy: string_to_sign,
            signature: signature.to_string(),
        })
    }

    /// Credential scope for `time`: `YYYYMMDD/<region>/s3/aws4_request`.
    pub fn credential_scope(&self, time: DateTime<Utc>) -> String {
        format!(
            "{}/{}/{}/{}",
            date_stamp(time),
            self.region,
            SERVICE,
            TERMINATOR
        )
    }

    /// Value of the `x-amz-credential` condition and form field.
    pub fn credential(&self, access_key_id: &str, time: DateTime<Utc>) -> String {
        format!("{}/{}", access_key_id, self.credential_scope(time))
    }
}

impl<C: Clock> Signer<C> {
    /// Sign a policy document using the current date from the clock.
    ///
    /// Returns the base64 encoded policy together with its hex signature.
    pub fn sign(&self, policy: &[u8]) -> Result<Signed, SignError> {
        self.sign_at(policy, self.clock.now())
    }
}

impl<C: fmt::Debug> fmt::Debug for Signer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("region", &self.region)
            .field("secret_access_key", &"<redacted>")
            .field("clock", &self.clock)
            .finish()
    }
}

/// Value of the `x-amz-date` condition and form field: `YYYYMMDDTHHMMSSZ`.
pub fn amz_date(time: DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

fn date_stamp(time: DateTime<Utc>) -> String {
    time.format("%Y%m%d").to_string()
}

/// AWS SigV4 signing key.
struct SigningKey(Hmac<Sha256>);

impl SigningKey {
    /// Derive a signing key for the given date and region.
    fn derive(secret_access_key: &str, date: &str, region: &str) -> Result<Self, SignError> {
        let date_key = hmac_sha256(
            format!("AWS4{}", secret_access_key).as_bytes(),
            date.as_bytes(),
        )?;
        let region_key = hmac_sha256(&date_key, region.as_bytes())?;
        let service_key = hmac_sha256(&region_key, SERVICE.as_bytes())?;
        let signing_key = hmac_sha256(&service_key, TERMINATOR.as_bytes())?;

        Ok(Self(Hmac::new_from_slice(&signing_key)?))
    }

    /// Sign a message with this key.
    fn sign(&self, message: &[u8]) -> Signature {
        let mut mac = self.0.clone();
        mac.update(message);
        Signature(mac.finalize().into_bytes().into())
    }
}

/// AWS SigV4 signature.
struct Signature([u8; 32]);

impl fmt::Display for Signature {
    /// Displays hex encoded representation of the signature
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Compute HMAC-SHA256.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; 32], InvalidLength> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}
