#![deny(warnings)]
#![deny(clippy::all)]
#![deny(missing_docs)]

//! PikPak-Plus client helpers: size/date formatting, grid columns, session
//! state over pluggable stores, token expiry checks and an authenticated
//! request wrapper.

/// Authenticated HTTP request wrapper
pub mod client;
/// Configuration types for the client
pub mod config;
/// Error types
pub mod error;
/// Size and date formatting
pub mod format;
/// Results grid columns and rows
pub mod grid;
/// Host-environment ports (appearance, clipboard)
pub mod host;
/// Session and preference accessors
pub mod session;
/// Key-value store and cookie jar ports with their backends
pub mod store;
/// Test support utilities (for use in tests)
#[doc(hidden)]
pub mod test_support;
/// Session token expiry check
pub mod token;
/// Server options, directory map and row types
pub mod types;

pub use crate::client::{ApiResponse, Client};
pub use crate::config::PikPakConfig;
pub use crate::error::{ApiErrorObject, PikPakError};
pub use crate::session::Session;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::format::*;
    pub use crate::grid::{build_column_definitions, prepare_row_data};
    pub use crate::store::{CookieJar, FileStore, KeyValueStore, MemoryCookieJar, MemoryStore};
    pub use crate::token::is_token_valid;
    pub use crate::types::*;
    pub use crate::{ApiResponse, Client, PikPakConfig, PikPakError, Session};
}
