//! Storage ports for session state and their implementations.
//!
//! Session helpers never touch a global store; they go through a
//! [`KeyValueStore`] (everything except the auth token) and a [`CookieJar`]
//! (the auth token), both injected by the caller.

mod cookies;
mod file;
mod memory;

pub use cookies::{MemoryCookieJar, format_cookie_date};
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::PikPakError;

/// String key-value persistent store
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`
    fn get(&self, key: &str) -> Option<String>;
    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), PikPakError>;
    /// Removes `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), PikPakError>;
    /// Removes every key
    fn clear(&self) -> Result<(), PikPakError>;
}

/// Cookie jar with document-cookie semantics.
///
/// Reads return every live cookie as `name=value` pairs joined by `"; "`.
/// Writes take a single assignment such as `auth=abc;expires=...;path=/`;
/// an assignment whose expiry is in the past removes the cookie.
pub trait CookieJar: Send + Sync {
    /// Live cookies as a header-style string
    fn cookie_string(&self) -> String;
    /// Applies one cookie assignment
    fn write(&self, assignment: &str) -> Result<(), PikPakError>;
}
