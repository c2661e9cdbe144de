//! Managed query sessions
//!
//! A [`ManagedQuery`] owns one engine query and drives it to completion:
//! - selects columns and dimension ranges before the first submission
//! - attaches caller buffers or synthesizes them from the schema
//! - resubmits `Incomplete` reads into the same buffers, counting cells
//!
//! Session errors name the session; engine errors pass through unchanged.

mod errors;
mod managed;
mod selector;
mod state;

pub use errors::{ErrorKind, SessionError, SessionResult};
pub use managed::{ManagedQuery, UNNAMED};
pub use selector::RangeSelector;
pub use state::SessionState;
