//! Maps validated CLI arguments to an action.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, generator, storage, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let auth_opts = auth::Options::parse(matches)?;
    let generator_opts = generator::Options::parse(matches)?;
    let storage_opts = storage::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        login_id: auth_opts.login_id,
        login_password: auth_opts.login_password,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        cookie_secure: auth_opts.cookie_secure,
        generator_url: generator_opts.url,
        generator_api_key: generator_opts.api_key,
        generator_poll_seconds: generator_opts.poll_seconds,
        generator_timeout_seconds: generator_opts.timeout_seconds,
        generator_max_wait_seconds: generator_opts.max_wait_seconds,
        static_dir: storage_opts.static_dir,
        outputs_dir: storage_opts.outputs_dir,
        cache_ttl_seconds: storage_opts.cache_ttl_seconds,
        sweep_interval_seconds: storage_opts.sweep_interval_seconds,
    }))
}
