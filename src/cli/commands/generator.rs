use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_GENERATOR_URL: &str = "generator-url";
pub const ARG_GENERATOR_API_KEY: &str = "generator-api-key";
pub const ARG_GENERATOR_POLL_SECONDS: &str = "generator-poll-seconds";
pub const ARG_GENERATOR_TIMEOUT_SECONDS: &str = "generator-timeout-seconds";
pub const ARG_GENERATOR_MAX_WAIT_SECONDS: &str = "generator-max-wait-seconds";

#[derive(Debug)]
pub struct Options {
    pub url: Url,
    pub api_key: SecretString,
    pub poll_seconds: u64,
    pub timeout_seconds: u64,
    pub max_wait_seconds: u64,
}

impl Options {
    /// Parse generation backend arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the API key is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let url = matches
            .get_one::<String>(ARG_GENERATOR_URL)
            .context("missing required argument: --generator-url")?;
        let url = Url::parse(url).with_context(|| format!("invalid generator URL: {url}"))?;

        let api_key = match matches.get_one::<String>(ARG_GENERATOR_API_KEY) {
            Some(key) if !key.trim().is_empty() => SecretString::from(key.clone()),
            _ => anyhow::bail!("missing required argument: --{ARG_GENERATOR_API_KEY}"),
        };

        Ok(Self {
            url,
            api_key,
            poll_seconds: matches
                .get_one::<u64>(ARG_GENERATOR_POLL_SECONDS)
                .copied()
                .unwrap_or(10)
                .max(1),
            timeout_seconds: matches
                .get_one::<u64>(ARG_GENERATOR_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(300)
                .max(1),
            max_wait_seconds: matches
                .get_one::<u64>(ARG_GENERATOR_MAX_WAIT_SECONDS)
                .copied()
                .unwrap_or(1_800)
                .max(1),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GENERATOR_URL)
                .long(ARG_GENERATOR_URL)
                .help("Base URL of the media generation gateway")
                .env("MEDIAGATE_GENERATOR_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_GENERATOR_API_KEY)
                .long(ARG_GENERATOR_API_KEY)
                .help("Bearer key for the media generation gateway")
                .env("MEDIAGATE_GENERATOR_API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_GENERATOR_POLL_SECONDS)
                .long(ARG_GENERATOR_POLL_SECONDS)
                .help("Seconds between polls of long-running video operations")
                .env("MEDIAGATE_GENERATOR_POLL_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_GENERATOR_TIMEOUT_SECONDS)
                .long(ARG_GENERATOR_TIMEOUT_SECONDS)
                .help("Timeout for a single request to the gateway")
                .env("MEDIAGATE_GENERATOR_TIMEOUT_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_GENERATOR_MAX_WAIT_SECONDS)
                .long(ARG_GENERATOR_MAX_WAIT_SECONDS)
                .help("Give up on a video operation that has not finished after this long")
                .env("MEDIAGATE_GENERATOR_MAX_WAIT_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_generator_env() -> anyhow::Result<()> {
        temp_env::with_vars(
            [
                ("MEDIAGATE_GENERATOR_URL", Some("https://media.example.com/gw")),
                ("MEDIAGATE_GENERATOR_API_KEY", Some("key")),
                ("MEDIAGATE_GENERATOR_POLL_SECONDS", Some("0")),
                ("MEDIAGATE_GENERATOR_TIMEOUT_SECONDS", None),
                ("MEDIAGATE_GENERATOR_MAX_WAIT_SECONDS", Some("600")),
            ],
            || {
                let matches = with_args(Command::new("test")).try_get_matches_from(vec!["test"])?;
                let options = Options::parse(&matches)?;
                assert_eq!(options.url.as_str(), "https://media.example.com/gw");
                assert_eq!(options.poll_seconds, 1);
                assert_eq!(options.timeout_seconds, 300);
                assert_eq!(options.max_wait_seconds, 600);
                Ok(())
            },
        )
    }

    #[test]
    fn invalid_url_is_rejected() -> anyhow::Result<()> {
        temp_env::with_vars([("MEDIAGATE_GENERATOR_URL", None::<&str>)], || {
            let matches = with_args(Command::new("test")).try_get_matches_from(vec![
                "test",
                "--generator-url",
                "not a url",
                "--generator-api-key",
                "key",
            ])?;
            assert!(Options::parse(&matches).is_err());
            Ok(())
        })
    }
}
