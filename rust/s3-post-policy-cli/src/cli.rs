use chrono::Duration;
use clap::Parser;

use crate::form::UploadRequest;

/// Command line of the `gen-policy` binary.
///
/// An empty `--region` or `--secret-access-key` falls back to `AWS_REGION`
/// or `AWS_SECRET_ACCESS_KEY`.
#[derive(Debug, Parser)]
#[command(name = "gen-policy")]
#[command(bin_name = "gen-policy")]
#[command(version, about = "Print signed S3 POST policy form fields", long_about = None)]
pub struct GenPolicyCli {
    /// Bucket the browser uploads into
    #[arg(short, long)]
    pub bucket: String,

    /// Prefix uploaded keys must start with
    #[arg(short, long, default_value = "")]
    pub key_prefix: String,

    /// Canned ACL applied to uploaded objects
    #[arg(long, default_value = "public-read")]
    pub acl: String,

    /// Prefix the Content-Type field must start with
    #[arg(long)]
    pub content_type: Option<String>,

    /// URL S3 redirects to after a successful upload
    #[arg(long)]
    pub success_redirect: Option<String>,

    /// Largest accepted upload in bytes
    #[arg(long)]
    pub max_size: Option<u64>,

    /// Seconds until the policy expires
    #[arg(long, default_value_t = 86_400)]
    pub expires_in: u32,

    /// Region the signing key is scoped to
    #[arg(long, default_value = "")]
    pub region: String,

    /// Access key ID placed in the credential
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub access_key_id: String,

    /// Secret access key used to sign the policy
    #[arg(long, default_value = "", hide_default_value = true)]
    pub secret_access_key: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl GenPolicyCli {
    /// Describe the upload these arguments allow.
    pub fn upload_request(&self) -> UploadRequest {
        UploadRequest {
            bucket: self.bucket.clone(),
            key_prefix: self.key_prefix.clone(),
            acl: self.acl.clone(),
            content_type: self.content_type.clone(),
            success_redirect: self.success_redirect.clone(),
            max_size: self.max_size,
            expires_in: Duration::seconds(i64::from(self.expires_in)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn it_parses_defaults() -> TestResult {
        let cli = GenPolicyCli::try_parse_from([
            "gen-policy",
            "--bucket",
            "photos",
            "--access-key-id",
            "AKIATEST",
        ])?;

        assert_eq!(cli.acl, "public-read");
        assert_eq!(cli.key_prefix, "");
        assert_eq!(cli.region, "");
        assert_eq!(cli.secret_access_key, "");
        assert_eq!(cli.log_level, "warn");
        assert_eq!(cli.upload_request().expires_in, Duration::hours(24));
        Ok(())
    }

    #[test]
    fn it_builds_an_upload_request() -> TestResult {
        let cli = GenPolicyCli::try_parse_from([
            "gen-policy",
            "-b",
            "photos",
            "-k",
            "albums/",
            "--content-type",
            "image/",
            "--success-redirect",
            "https://example.com/done",
            "--max-size",
            "1048576",
            "--expires-in",
            "600",
            "--access-key-id",
            "AKIATEST",
        ])?;
        let request = cli.upload_request();

        assert_eq!(request.bucket, "photos");
        assert_eq!(request.key_prefix, "albums/");
        assert_eq!(request.content_type.as_deref(), Some("image/"));
        assert_eq!(request.success_redirect.as_deref(), Some("https://example.com/done"));
        assert_eq!(request.max_size, Some(1048576));
        assert_eq!(request.expires_in, Duration::minutes(10));
        Ok(())
    }

    #[test]
    fn it_requires_a_bucket() {
        let result = GenPolicyCli::try_parse_from(["gen-policy", "--access-key-id", "AKIATEST"]);

        assert!(result.is_err());
    }
}
