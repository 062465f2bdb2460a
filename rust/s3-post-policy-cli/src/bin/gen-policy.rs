use anyhow::{Context, Result};
use clap::Parser;
use s3_post_policy::{Clock, Defaults, Signer, SystemClock};
use s3_post_policy_cli::cli::GenPolicyCli;
use s3_post_policy_cli::form::UploadForm;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn main() -> Result<()> {
    let cli = GenPolicyCli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let defaults = Defaults::from_env();
    if cli.region.is_empty() && defaults.region().is_none() {
        tracing::warn!("no --region given and AWS_REGION is not set; S3 will reject the signature");
    }
    if cli.secret_access_key.is_empty() && !defaults.has_secret_access_key() {
        tracing::warn!(
            "no --secret-access-key given and AWS_SECRET_ACCESS_KEY is not set; S3 will reject the signature"
        );
    }
    let signer = Signer::with_defaults(
        cli.region.as_str(),
        cli.secret_access_key.as_str(),
        &defaults,
    );

    let request = cli.upload_request();
    let now = SystemClock.now();
    tracing::debug!(
        bucket = %request.bucket,
        key_prefix = %request.key_prefix,
        region = %signer.region(),
        expires_in = request.expires_in.num_seconds(),
        "building upload policy"
    );

    let form = UploadForm::build(&request, &signer, &cli.access_key_id, now)
        .context("failed to build signed upload form")?;
    tracing::info!(url = %form.url, "signed upload policy");

    let output = serde_json::to_string_pretty(&form).context("failed to encode form fields")?;
    println!("{}", output);

    Ok(())
}
