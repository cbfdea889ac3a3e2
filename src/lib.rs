//! # Mediagate
//!
//! `mediagate` is a small web front end that lets a signed-in user send a text
//! or image prompt to a generative-media backend and get back an image, a video
//! or an audio file.
//!
//! ## Login Gate
//!
//! The application is protected by a single static credential pair. Login
//! attempts are throttled per client identifier (the first `X-Forwarded-For`
//! entry, then `X-Real-IP`, then the peer address):
//!
//! - **Attempt Window:** failures are counted over a trailing 60 second window.
//! - **Block:** the third failure inside the window blocks the identifier for
//!   300 seconds. Blocks expire lazily, on the next lookup.
//! - **Sessions:** a successful login mints an opaque, URL-safe token carried in
//!   the `session_token` cookie. Only a SHA-256 hash of the token is kept.
//!
//! ## Continuations
//!
//! Chat conversations and generated videos can be continued. Both are kept in
//! an in-memory [`cache::ObjectCache`] keyed by random UUIDs. Extending a video
//! consumes the predecessor's identifier, so every identifier is single use once
//! chained.
//!
//! All state lives in process memory; a restart drops every session, block and
//! cached continuation.

pub mod auth;
pub mod cache;
pub mod cli;
pub mod generator;
pub mod mediagate;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
