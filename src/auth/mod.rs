//! Login gate, brute-force throttling and session management.
//!
//! ## Throttling
//!
//! - **Attempt Window:** failed logins are counted per identifier over a
//!   trailing 60 second window.
//! - **Block:** 3 failures inside the window block the identifier for 300
//!   seconds from the failure that triggered it. Blocked attempts never touch
//!   the ledger.
//!
//! ## Sessions
//!
//! Session tokens carry 32 bytes of OS randomness, URL-safe base64 encoded. The
//! store is keyed by the token's SHA-256 so a memory dump does not yield usable
//! cookies. Sessions expire server-side after the configured TTL.

mod attempts;
mod block_list;
pub mod clock;
mod gate;
mod sessions;
mod state;
mod utils;

pub use attempts::AttemptLedger;
pub use block_list::BlockList;
pub use clock::{Clock, ManualClock, SystemClock};
pub use gate::{AuthError, AuthGate, IssuedSession};
pub use sessions::{Session, SessionStore};
pub use state::{AuthConfig, ATTEMPT_WINDOW, BLOCK_DURATION, MAX_FAILED_ATTEMPTS};
pub use utils::{client_identifier, generate_session_token, UNKNOWN_CLIENT};
