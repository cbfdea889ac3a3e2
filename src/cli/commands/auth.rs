use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_LOGIN_ID: &str = "login-id";
pub const ARG_LOGIN_PASSWORD: &str = "login-password";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

#[derive(Debug)]
pub struct Options {
    pub login_id: String,
    pub login_password: SecretString,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
}

impl Options {
    /// Parse login arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the credential pair is missing or blank.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let required = |id: &str| match matches.get_one::<String>(id) {
            Some(value) if !value.trim().is_empty() => Ok(value.clone()),
            _ => Err(anyhow::anyhow!("missing required argument: --{id}")),
        };

        Ok(Self {
            login_id: required(ARG_LOGIN_ID)?,
            login_password: SecretString::from(required(ARG_LOGIN_PASSWORD)?),
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(86_400),
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOGIN_ID)
                .long(ARG_LOGIN_ID)
                .help("Login ID accepted by the login form")
                .env("MEDIAGATE_LOGIN_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_LOGIN_PASSWORD)
                .long(ARG_LOGIN_PASSWORD)
                .help("Password accepted by the login form")
                .env("MEDIAGATE_LOGIN_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds, 0 keeps sessions until logout")
                .env("MEDIAGATE_SESSION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the session cookie Secure (serve over HTTPS)")
                .env("MEDIAGATE_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn parse_credentials_and_defaults() -> anyhow::Result<()> {
        temp_env::with_vars(
            [
                ("MEDIAGATE_SESSION_TTL_SECONDS", None::<&str>),
                ("MEDIAGATE_COOKIE_SECURE", None),
            ],
            || {
                let matches = with_args(Command::new("test")).try_get_matches_from(vec![
                    "test",
                    "--login-id",
                    "admin",
                    "--login-password",
                    "hunter2",
                ])?;
                let options = Options::parse(&matches)?;
                assert_eq!(options.login_id, "admin");
                assert_eq!(options.login_password.expose_secret(), "hunter2");
                assert_eq!(options.session_ttl_seconds, 86_400);
                assert!(!options.cookie_secure);
                Ok(())
            },
        )
    }

    #[test]
    fn blank_password_is_rejected() -> anyhow::Result<()> {
        temp_env::with_vars([("MEDIAGATE_LOGIN_PASSWORD", Some(" "))], || {
            let matches = with_args(Command::new("test"))
                .try_get_matches_from(vec!["test", "--login-id", "admin"])?;
            let err = Options::parse(&matches).err().map(|e| e.to_string());
            assert_eq!(
                err.as_deref(),
                Some("missing required argument: --login-password")
            );
            Ok(())
        })
    }
}
