use crate::{
    auth::{AuthConfig, AuthGate, Clock, SystemClock},
    generator::{HttpGenerator, HttpGeneratorConfig},
    mediagate::{self, MediaState},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub login_id: String,
    pub login_password: SecretString,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
    pub generator_url: Url,
    pub generator_api_key: SecretString,
    pub generator_poll_seconds: u64,
    pub generator_timeout_seconds: u64,
    pub generator_max_wait_seconds: u64,
    pub static_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub cache_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

fn non_zero_secs(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}

/// Execute the server action.
/// # Errors
/// Returns an error if the generator client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        port = args.port,
        generator_url = %args.generator_url,
        static_dir = %args.static_dir.display(),
        outputs_dir = %args.outputs_dir.display(),
        session_ttl_seconds = args.session_ttl_seconds,
        cache_ttl_seconds = args.cache_ttl_seconds,
        sweep_interval_seconds = args.sweep_interval_seconds,
        "Starting server"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let auth_config = AuthConfig::new(args.login_id, args.login_password)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_session_cookie_secure(args.cookie_secure);
    let auth = Arc::new(AuthGate::new(auth_config, clock.clone()));

    let generator = HttpGenerator::new(
        HttpGeneratorConfig::new(args.generator_url, args.generator_api_key)
            .with_poll_interval(Duration::from_secs(args.generator_poll_seconds))
            .with_request_timeout(Duration::from_secs(args.generator_timeout_seconds))
            .with_max_wait(Duration::from_secs(args.generator_max_wait_seconds)),
    )
    .context("Failed to build generation client")?;

    let media = Arc::new(MediaState::new(
        Arc::new(generator),
        clock,
        non_zero_secs(args.cache_ttl_seconds),
        args.static_dir,
        args.outputs_dir,
    ));

    mediagate::new(
        args.port,
        auth,
        media,
        non_zero_secs(args.sweep_interval_seconds),
    )
    .await
}
