//! Browser upload form fields.

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use s3_post_policy::{
    AWS4_HMAC_SHA256, ConditionKey, Match, Policy, PolicyError, SignError, Signer, amz_date,
};

/// Errors that can occur while building a form.
#[derive(Error, Debug)]
pub enum FormError {
    /// The policy could not be encoded.
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// The policy could not be signed.
    #[error(transparent)]
    Sign(#[from] SignError),
}

/// What a browser upload is allowed to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Target bucket.
    pub bucket: String,
    /// Prefix every uploaded key must start with.
    pub key_prefix: String,
    /// Canned ACL applied to the object.
    pub acl: String,
    /// Prefix the `Content-Type` field must start with.
    pub content_type: Option<String>,
    /// Where S3 redirects the browser after a successful upload.
    pub success_redirect: Option<String>,
    /// Largest accepted upload in bytes.
    pub max_size: Option<u64>,
    /// How long the policy stays valid.
    pub expires_in: Duration,
}

impl UploadRequest {
    /// Build the policy for this request as of `now`.
    ///
    /// `credential` is the `x-amz-credential` value, which must be scoped to
    /// the same date the policy is signed with.
    pub fn policy(&self, credential: &str, now: DateTime<Utc>) -> Policy {
        let mut policy = Policy::new(now + self.expires_in);
        policy
            .set_condition(ConditionKey::BUCKET, self.bucket.as_str(), Match::Exact)
            .set_condition(ConditionKey::KEY, self.key_prefix.as_str(), Match::StartsWith)
            .set_condition(ConditionKey::ACL, self.acl.as_str(), Match::Exact);
        if let Some(redirect) = &self.success_redirect {
            policy.set_condition(
                ConditionKey::SUCCESS_ACTION_REDIRECT,
                redirect.as_str(),
                Match::Exact,
            );
        }
        if let Some(content_type) = &self.content_type {
            policy.set_condition(
                ConditionKey::CONTENT_TYPE,
                content_type.as_str(),
                Match::StartsWith,
            );
        }
        if let Some(max_size) = self.max_size {
            policy.set_range_condition(ConditionKey::CONTENT_LENGTH_RANGE, 0, max_size);
        }
        policy
            .set_condition(ConditionKey::AMZ_CREDENTIAL, credential, Match::Exact)
            .set_condition(ConditionKey::AMZ_ALGORITHM, AWS4_HMAC_SHA256, Match::Exact)
            .set_condition(ConditionKey::AMZ_DATE, amz_date(now), Match::Exact);
        policy
    }
}

/// Action URL and hidden fields of a signed upload form.
///
/// Fields are kept in the order they should appear in the form; the `file`
/// input must come after all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadForm {
    /// Form action.
    pub url: String,
    /// Form fields by name.
    pub fields: IndexMap<String, String>,
}

impl UploadForm {
    /// Build and sign the form for `request`.
    ///
    /// The credential scope, `x-amz-date` and the signing key all use `now`.
    pub fn build<C>(
        request: &UploadRequest,
        signer: &Signer<C>,
        access_key_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, FormError> {
        let credential = signer.credential(access_key_id, now);
        let policy = request.policy(&credential, now);
        let signed = signer.sign_at(&policy.to_bytes()?, now)?;

        let mut fields = IndexMap::new();
        fields.insert(
            ConditionKey::KEY.to_string(),
            format!("{}${{filename}}", request.key_prefix),
        );
        fields.insert(ConditionKey::ACL.to_string(), request.acl.clone());
        if let Some(redirect) = &request.success_redirect {
            fields.insert(
                ConditionKey::SUCCESS_ACTION_REDIRECT.to_string(),
                redirect.clone(),
            );
        }
        if let Some(content_type) = &request.content_type {
            fields.insert(ConditionKey::CONTENT_TYPE.to_string(), content_type.clone());
        }
        fields.insert(ConditionKey::AMZ_CREDENTIAL.to_string(), credential);
        fields.insert(
            ConditionKey::AMZ_ALGORITHM.to_string(),
            AWS4_HMAC_SHA256.to_string(),
        );
        fields.insert(ConditionKey::AMZ_DATE.to_string(), amz_date(now));
        fields.insert("policy".to_string(), signed.policy);
        fields.insert("x-amz-signature".to_string(), signed.signature);

        Ok(Self {
            url: format!("https://{}.s3.amazonaws.com/", request.bucket),
            fields,
        })
    }
}
