use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_STATIC_DIR: &str = "static-dir";
pub const ARG_OUTPUTS_DIR: &str = "outputs-dir";
pub const ARG_CACHE_TTL_SECONDS: &str = "cache-ttl-seconds";
pub const ARG_SWEEP_INTERVAL_SECONDS: &str = "sweep-interval-seconds";

#[derive(Debug)]
pub struct Options {
    pub static_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub cache_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let path = |id: &str, default: &str| {
            matches
                .get_one::<String>(id)
                .filter(|v| !v.trim().is_empty())
                .map_or_else(|| PathBuf::from(default), PathBuf::from)
        };
        let seconds = |id: &str, default: u64| matches.get_one::<u64>(id).copied().unwrap_or(default);

        Self {
            static_dir: path(ARG_STATIC_DIR, "static"),
            outputs_dir: path(ARG_OUTPUTS_DIR, "outputs"),
            cache_ttl_seconds: seconds(ARG_CACHE_TTL_SECONDS, 86_400),
            sweep_interval_seconds: seconds(ARG_SWEEP_INTERVAL_SECONDS, 300),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_STATIC_DIR)
                .long(ARG_STATIC_DIR)
                .help("Directory with index.html and static assets")
                .env("MEDIAGATE_STATIC_DIR")
                .default_value("static"),
        )
        .arg(
            Arg::new(ARG_OUTPUTS_DIR)
                .long(ARG_OUTPUTS_DIR)
                .help("Directory where generated files are written")
                .env("MEDIAGATE_OUTPUTS_DIR")
                .default_value("outputs"),
        )
        .arg(
            Arg::new(ARG_CACHE_TTL_SECONDS)
                .long(ARG_CACHE_TTL_SECONDS)
                .help("Idle lifetime of cached chats and videos in seconds, 0 disables expiry")
                .env("MEDIAGATE_CACHE_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SWEEP_INTERVAL_SECONDS)
                .long(ARG_SWEEP_INTERVAL_SECONDS)
                .help("Seconds between sweeps of expired sessions and cache entries, 0 disables")
                .env("MEDIAGATE_SWEEP_INTERVAL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        temp_env::with_vars(
            [
                ("MEDIAGATE_STATIC_DIR", None::<&str>),
                ("MEDIAGATE_OUTPUTS_DIR", None),
                ("MEDIAGATE_CACHE_TTL_SECONDS", None),
                ("MEDIAGATE_SWEEP_INTERVAL_SECONDS", None),
            ],
            || {
                let matches = with_args(Command::new("test")).get_matches_from(vec!["test"]);
                let options = Options::parse(&matches);
                assert_eq!(options.static_dir, PathBuf::from("static"));
                assert_eq!(options.outputs_dir, PathBuf::from("outputs"));
                assert_eq!(options.cache_ttl_seconds, 86_400);
                assert_eq!(options.sweep_interval_seconds, 300);
            },
        );
    }

    #[test]
    fn overrides() {
        let matches = with_args(Command::new("test")).get_matches_from(vec![
            "test",
            "--outputs-dir",
            "/var/lib/mediagate",
            "--sweep-interval-seconds",
            "0",
        ]);
        let options = Options::parse(&matches);
        assert_eq!(options.outputs_dir, PathBuf::from("/var/lib/mediagate"));
        assert_eq!(options.sweep_interval_seconds, 0);
    }
}
