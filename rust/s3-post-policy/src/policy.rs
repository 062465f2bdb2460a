//! POST policy documents.
//!
//! A [`Policy`] is an expiration plus an ordered list of [`Condition`]s. It
//! serializes to the JSON grammar S3 checks the fields of a browser upload
//! form against. See [Creating a POST policy] for the rules of each condition.
//!
//! Conditions are written out in the order they were added, and S3 compares
//! the policy byte-for-byte after decoding, so the same calls always produce
//! the same document.
//!
//! [Creating a POST policy]: https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-HTTPPOSTConstructPolicy.html

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value usually given to the `x-amz-algorithm` condition.
pub const AWS4_HMAC_SHA256: &str = "AWS4-HMAC-SHA256";

/// Operator S3 uses for prefix matches.
const STARTS_WITH: &str = "starts-with";

/// Errors produced while encoding or decoding a policy document.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// The policy could not be encoded as JSON.
    #[error("failed to encode policy document: {0}")]
    Serialization(#[source] serde_json::Error),
    /// The bytes were not a valid policy document.
    #[error("failed to decode policy document: {0}")]
    Deserialization(#[source] serde_json::Error),
}

/// Name of a form field a condition applies to.
///
/// The associated constants cover the fields S3 knows about. Any other name,
/// such as `x-amz-meta-*` user metadata, can be used through [`From`]:
///
/// ```
/// use s3_post_policy::ConditionKey;
///
/// assert_eq!(ConditionKey::CONTENT_TYPE.as_str(), "Content-Type");
/// assert_eq!(ConditionKey::from("x-amz-meta-uuid").as_str(), "x-amz-meta-uuid");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConditionKey(Cow<'static, str>);

impl ConditionKey {
    pub const ACL: Self = Self::known("acl");
    pub const BUCKET: Self = Self::known("bucket");
    pub const CONTENT_LENGTH_RANGE: Self = Self::known("content-length-range");
    pub const CACHE_CONTROL: Self = Self::known("Cache-Control");
    pub const CONTENT_TYPE: Self = Self::known("Content-Type");
    pub const CONTENT_DISPOSITION: Self = Self::known("Content-Disposition");
    pub const CONTENT_ENCODING: Self = Self::known("Content-Encoding");
    pub const EXPIRES: Self = Self::known("Expires");
    pub const KEY: Self = Self::known("key");
    pub const SUCCESS_ACTION_REDIRECT: Self = Self::known("success_action_redirect");
    pub const REDIRECT: Self = Self::known("redirect");
    pub const SUCCESS_ACTION_STATUS: Self = Self::known("success_action_status");
    pub const AMZ_ALGORITHM: Self = Self::known("x-amz-algorithm");
    pub const AMZ_CREDENTIAL: Self = Self::known("x-amz-credential");
    pub const AMZ_DATE: Self = Self::known("x-amz-date");
    pub const AMZ_SECURITY_TOKEN: Self = Self::known("x-amz-security-token");

    const fn known(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Get the field name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConditionKey {
    fn from(name: &str) -> Self {
        Self(Cow::Owned(name.to_owned()))
    }
}

impl From<String> for ConditionKey {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl AsRef<str> for ConditionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How a form field is compared against a condition value.
///
/// Range matches are not listed here; they carry numeric bounds instead of a
/// value and are added with [`Policy::set_range_condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// The field must equal the value: `{"acl":"public-read"}`.
    Exact,
    /// The field must start with the value: `["starts-with","$key","user/user1/"]`.
    StartsWith,
    /// The field may hold anything: `["starts-with","$success_action_redirect",""]`.
    Any,
}

/// A single policy condition.
///
/// Every form field in an upload (except `x-amz-signature`, `file`, `policy`
/// and fields prefixed with `x-ignore-`) must be covered by at least one
/// condition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawCondition")]
pub enum Condition {
    /// Field must equal `value`.
    Exact { key: ConditionKey, value: String },
    /// Field must start with `value`.
    StartsWith { key: ConditionKey, value: String },
    /// Field accepts any value.
    Any { key: ConditionKey },
    /// Field must fall within `lower..=upper`, e.g. `content-length-range`.
    Range {
        key: ConditionKey,
        lower: u64,
        upper: u64,
    },
}

impl Condition {
    /// Get the form field this condition applies to.
    pub fn key(&self) -> &ConditionKey {
        match self {
            Self::Exact { key, .. }
            | Self::StartsWith { key, .. }
            | Self::Any { key }
            | Self::Range { key, .. } => key,
        }
    }
}

impl Serialize for Condition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Exact { key, value } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(key.as_str(), value)?;
                map.end()
            }
            Self::StartsWith { key, value } => {
                triple(serializer, STARTS_WITH, &format!("${}", key), value)
            }
            Self::Any { key } => triple(serializer, STARTS_WITH, &format!("${}", key), ""),
            // Bounds are written as decimal strings rather than JSON numbers.
            Self::Range { key, lower, upper } => triple(
                serializer,
                key.as_str(),
                &lower.to_string(),
                &upper.to_string(),
            ),
        }
    }
}

fn triple<S>(serializer: S, first: &str, second: &str, third: &str) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut tuple = serializer.serialize_tuple(3)?;
    tuple.serialize_element(first)?;
    tuple.serialize_element(second)?;
    tuple.serialize_element(third)?;
    tuple.end()
}

/// Wire shape of a condition before it is classified.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCondition {
    Exact(BTreeMap<String, String>),
    Triple(String, RawBound, RawBound),
}

/// Array element that may be a string or, for ranges, a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBound {
    Text(String),
    Number(u64),
}

impl RawBound {
    fn into_text(self) -> Result<String, String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Number(number) => Err(format!("expected a string, got {}", number)),
        }
    }

    fn into_bound(self) -> Result<u64, String> {
        match self {
            Self::Number(number) => Ok(number),
            Self::Text(text) => text
                .parse()
                .map_err(|e| format!("invalid range bound {:?}: {}", text, e)),
        }
    }
}

impl TryFrom<RawCondition> for Condition {
    type Error = String;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        match raw {
            RawCondition::Exact(entries) => {
                if entries.len() != 1 {
                    return Err(format!(
                        "exact condition must have one entry, got {}",
                        entries.len()
                    ));
                }
                let (key, value) = entries
                    .into_iter()
                    .next()
                    .ok_or_else(|| "exact condition is empty".to_string())?;
                Ok(Self::Exact {
                    key: key.into(),
                    value,
                })
            }
            RawCondition::Triple(operator, field, value) if operator == STARTS_WITH => {
                let field = field.into_text()?;
                let key = field
                    .strip_prefix('$')
                    .ok_or_else(|| format!("starts-with field must begin with '$', got {:?}", field))?;
                let value = value.into_text()?;
                if value.is_empty() {
                    Ok(Self::Any { key: key.into() })
                } else {
                    Ok(Self::StartsWith {
                        key: key.into(),
                        value,
                    })
                }
            }
            RawCondition::Triple(key, lower, upper) => Ok(Self::Range {
                key: key.into(),
                lower: lower.into_bound()?,
                upper: upper.into_bound()?,
            }),
        }
    }
}

/// An S3 POST policy.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use s3_post_policy::{ConditionKey, Match, Policy};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let expiration = Utc.with_ymd_and_hms(2007, 12, 1, 12, 0, 0).unwrap();
/// let mut policy = Policy::new(expiration);
/// policy
///     .set_condition(ConditionKey::ACL, "public-read", Match::Exact)
///     .set_condition(ConditionKey::BUCKET, "johnsmith", Match::Exact)
///     .set_condition(ConditionKey::KEY, "user/eric/", Match::StartsWith);
///
/// assert_eq!(
///     String::from_utf8(policy.to_bytes()?)?,
///     r#"{"expiration":"2007-12-01T12:00:00.000Z","conditions":[{"acl":"public-read"},{"bucket":"johnsmith"},["starts-with","$key","user/eric/"]]}"#
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "PolicyDocument")]
pub struct Policy {
    expiration: DateTime<Utc>,
    conditions: Vec<Condition>,
}

impl Policy {
    /// Create a policy that expires at `expiration` and has no conditions.
    pub fn new(expiration: DateTime<Utc>) -> Self {
        Self {
            expiration,
            conditions: Vec::new(),
        }
    }

    /// Get the expiration time.
    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    /// Get the conditions in the order they were added.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Add an exact, starts-with or match-anything condition.
    ///
    /// For [`Match::Any`] the value is ignored and an empty prefix is written.
    /// A field may be constrained by several conditions.
    pub fn set_condition(
        &mut self,
        key: impl Into<ConditionKey>,
        value: impl Into<String>,
        matching: Match,
    ) -> &mut Self {
        let key = key.into();
        let condition = match matching {
            Match::Exact => Condition::Exact {
                key,
                value: value.into(),
            },
            Match::StartsWith => Condition::StartsWith {
                key,
                value: value.into(),
            },
            Match::Any => Condition::Any { key },
        };
        self.conditions.push(condition);
        self
    }

    /// Add a condition requiring a field to fall within `lower..=upper`.
    ///
    /// The bounds are not checked here; S3 rejects an inverted range when the
    /// upload is made.
    pub fn set_range_condition(
        &mut self,
        key: impl Into<ConditionKey>,
        lower: u64,
        upper: u64,
    ) -> &mut Self {
        self.conditions.push(Condition::Range {
            key: key.into(),
            lower,
            upper,
        });
        self
    }

    /// Encode the policy document as compact JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PolicyError> {
        serde_json::to_vec(self).map_err(PolicyError::Serialization)
    }

    /// Decode a policy document.
    ///
    /// Range bounds are accepted both as strings and as JSON numbers, and a
    /// starts-with condition with an empty prefix decodes as [`Condition::Any`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PolicyError> {
        serde_json::from_slice(bytes).map_err(PolicyError::Deserialization)
    }
}

impl Serialize for Policy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("expiration", &format_expiration(&self.expiration))?;
        map.serialize_entry("conditions", &self.conditions)?;
        map.end()
    }
}

/// Deserialization helper for [`Policy`].
#[derive(Deserialize)]
struct PolicyDocument {
    expiration: String,
    conditions: Vec<Condition>,
}

impl TryFrom<PolicyDocument> for Policy {
    type Error = String;

    fn try_from(document: PolicyDocument) -> Result<Self, Self::Error> {
        let expiration = DateTime::parse_from_rfc3339(&document.expiration)
            .map_err(|e| format!("invalid expiration {:?}: {}", document.expiration, e))?
            .with_timezone(&Utc);
        Ok(Self {
            expiration,
            conditions: document.conditions,
        })
    }
}

/// Format as ISO 8601 with milliseconds and a `Z` suffix.
fn format_expiration(expiration: &DateTime<Utc>) -> String {
    expiration.to_rfc3339_opts(SecondsFormat::Millis, true)
}
