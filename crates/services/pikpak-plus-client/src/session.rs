//! Session and preference accessors over the injected storage ports.
//!
//! Reads treat missing or corrupt state as absence and return `None`; only
//! writes can fail, and only when the backing store does.

use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, TimeDelta, Utc};

use crate::error::PikPakError;
use crate::format::format_short_date;
use crate::host::{Appearance, DARK_CLASS};
use crate::store::{CookieJar, KeyValueStore, format_cookie_date};
use crate::types::{DirectoryMap, DriveInfo, EmailAndDirectory, ServerOptions};

/// Cookie carrying the bearer token
pub const AUTH_COOKIE: &str = "auth";
/// Store key for the account email
pub const KEY_EMAIL: &str = "email";
/// Store key for the JSON directory map
pub const KEY_DIR: &str = "dir";
/// Store key for the selected server id
pub const KEY_SELECTED_SERVER: &str = "selectedServer";
/// Store key for the JSON server options map
pub const KEY_SERVER_OPTIONS: &str = "serverOptions";
/// Store key for the dark-mode flag (`"true"`/`"false"`)
pub const KEY_DARK_MODE: &str = "darkMode";

const EXPIRED_COOKIE_DATE: &str = "Thu, 01 Jan 1970 00:00:00 UTC";

/// Handle over the persistent store and cookie jar of one client
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    cookies: Arc<dyn CookieJar>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    /// Session over the given store and cookie jar
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, cookies: Arc<dyn CookieJar>) -> Self {
        Self { store, cookies }
    }

    /// The persistent store
    #[must_use]
    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// The cookie jar
    #[must_use]
    pub fn cookies(&self) -> &dyn CookieJar {
        self.cookies.as_ref()
    }

    // ── Cookies ────────────────────────────────────────────

    /// Value of the `auth` cookie (everything after its first `=`)
    #[must_use]
    pub fn get_auth_cookie(&self) -> Option<String> {
        let prefix = format!("{AUTH_COOKIE}=");
        self.cookies
            .cookie_string()
            .split(';')
            .map(str::trim)
            .find(|c| c.starts_with(&prefix))
            .and_then(|c| c.split_once('='))
            .map(|(_, value)| value.to_string())
    }

    /// Writes `name=value` expiring `hours` from now, path `/`.
    ///
    /// Name and value are written as-is; callers pass cookie-safe text.
    /// When `hours` is not finite or lands outside years 0..=9999 the
    /// `expires` attribute is left out and the cookie lasts for the session.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_cookie(&self, name: &str, value: &str, hours: f64) -> Result<(), PikPakError> {
        let expires = Some(hours * 3_600_000.0)
            .filter(|ms| ms.is_finite())
            .and_then(|ms| TimeDelta::try_milliseconds(ms.round() as i64))
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .filter(|at| (0..=9999).contains(&at.year()));

        let assignment = match expires {
            Some(at) => format!("{name}={value};expires={};path=/", format_cookie_date(&at)),
            None => {
                tracing::debug!(
                    "Cookie {name} expiry of {hours}h is out of range; writing a session cookie"
                );
                format!("{name}={value};path=/")
            }
        };
        self.cookies.write(&assignment)
    }

    /// Expires cookie `name`
    pub fn delete_cookie(&self, name: &str) -> Result<(), PikPakError> {
        self.cookies
            .write(&format!("{name}=;expires={EXPIRED_COOKIE_DATE};path=/;"))
    }

    // ── Email & directory ──────────────────────────────────

    /// Stores `email` and the directory map (an empty map when `None`)
    pub fn set_email_and_directory(
        &self,
        email: &str,
        directory: Option<&DirectoryMap>,
    ) -> Result<(), PikPakError> {
        let dir = match directory {
            Some(map) => serde_json::to_string(map).map_err(|e| PikPakError::Serde(e.to_string()))?,
            None => "{}".to_string(),
        };
        self.store.set(KEY_EMAIL, email)?;
        self.store.set(KEY_DIR, &dir)
    }

    /// Stored email and the directory chosen on the selected server.
    ///
    /// With no server selected both are `None` and nothing else is read.
    #[must_use]
    pub fn get_email_and_directory(&self) -> EmailAndDirectory {
        let Some(server) = self.get_selected_server() else {
            return EmailAndDirectory::default();
        };

        let dirs = self.stored_directory_map();
        EmailAndDirectory {
            email: self.store.get(KEY_EMAIL),
            dir: dirs.directory_for(&server).map(str::to_string),
        }
    }

    /// Removes the stored email and directory map
    pub fn delete_email_and_directory(&self) -> Result<(), PikPakError> {
        self.store.remove(KEY_EMAIL)?;
        self.store.remove(KEY_DIR)
    }

    fn stored_directory_map(&self) -> DirectoryMap {
        self.store
            .get(KEY_DIR)
            .map(|raw| DirectoryMap::parse_lenient(&raw))
            .unwrap_or_default()
    }

    // ── Servers ────────────────────────────────────────────

    /// The selected server id, as stored
    #[must_use]
    pub fn get_selected_server(&self) -> Option<String> {
        self.store.get(KEY_SELECTED_SERVER)
    }

    /// The server options JSON, as stored
    #[must_use]
    pub fn get_server_options(&self) -> Option<String> {
        self.store.get(KEY_SERVER_OPTIONS)
    }

    fn parsed_server_options(&self) -> Option<ServerOptions> {
        ServerOptions::parse(&self.get_server_options()?)
    }

    /// Expiry date of `selected_server` as `"05 Jan 2024"`.
    ///
    /// `None` when there is no server id, no options, no entry for the server,
    /// or the entry lacks a usable `created_at`/`expiry`.
    #[must_use]
    pub fn get_server_expiry_date(&self, selected_server: Option<&str>) -> Option<String> {
        let options = self.parsed_server_options()?;
        let server = selected_server.filter(|s| !s.is_empty())?;
        let expires = options.get(server)?.expiry_date()?;
        Some(format_short_date(&expires))
    }

    /// Quota and usage of the selected server.
    ///
    /// `None` when options, the selected server's entry, or either number is
    /// missing or unparseable.
    #[must_use]
    pub fn calculate_drive_info(&self) -> Option<DriveInfo> {
        let options = self.parsed_server_options()?;
        let server = self.get_selected_server()?;
        let details = options.get(&server)?;

        Some(DriveInfo {
            limit: details.limit.as_ref()?.leading_int()?,
            used: details.drive_used.as_ref()?.leading_int()?,
        })
    }

    // ── Generic access ─────────────────────────────────────

    /// Clears the whole store, not only the keys this crate knows
    pub fn delete_all_local_state(&self) -> Result<(), PikPakError> {
        self.store.clear()
    }

    /// Raw read of any key
    #[must_use]
    pub fn get_item(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    /// Raw write of any key
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), PikPakError> {
        self.store.set(key, value)
    }

    // ── Appearance ─────────────────────────────────────────

    /// Applies the stored `darkMode` flag to the host's presentation classes
    pub fn apply_dark_mode_preference(&self, host: &dyn Appearance) {
        let enabled = self.get_item(KEY_DARK_MODE).as_deref() == Some("true");
        host.toggle_class(DARK_CLASS, enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticAppearance;
    use crate::store::{MemoryCookieJar, MemoryStore};
    use crate::types::DirectoryEntry;
    use chrono::{DateTime, NaiveDateTime};
    use serde_json::json;
    use std::sync::{Mutex, PoisonError};

    /// Jar that records every assignment and reads back nothing
    #[derive(Default)]
    struct RecordingJar {
        writes: Mutex<Vec<String>>,
    }

    impl RecordingJar {
        fn writes(&self) -> Vec<String> {
            self.writes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl CookieJar for RecordingJar {
        fn cookie_string(&self) -> String {
            String::new()
        }

        fn write(&self, assignment: &str) -> Result<(), PikPakError> {
            self.writes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(assignment.to_string());
            Ok(())
        }
    }

    fn recording_session() -> (Session, Arc<RecordingJar>) {
        let jar = Arc::new(RecordingJar::default());
        let session = Session::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&jar) as Arc<dyn CookieJar>,
        );
        (session, jar)
    }

    fn session() -> (Session, Arc<MemoryStore>, Arc<MemoryCookieJar>) {
        let store = Arc::new(MemoryStore::new());
        let cookies = Arc::new(MemoryCookieJar::new());
        let session = Session::new(
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
            Arc::clone(&cookies) as Arc<dyn CookieJar>,
        );
        (session, store, cookies)
    }

    #[test]
    fn auth_cookie_lookup() {
        let (session, _, cookies) = session();
        assert_eq!(session.get_auth_cookie(), None);

        cookies.write("theme=dark").unwrap();
        cookies.write("authority=nope").unwrap();
        assert_eq!(session.get_auth_cookie(), None);

        cookies.write("auth=eyJhbGciOi==.payload.sig").unwrap();
        assert_eq!(
            session.get_auth_cookie().as_deref(),
            Some("eyJhbGciOi==.payload.sig")
        );
    }

    #[test]
    fn set_and_delete_cookie() {
        let (session, _, cookies) = session();
        session.set_cookie("auth", "tok", 1.0).unwrap();
        assert_eq!(cookies.cookie_string(), "auth=tok");
        assert_eq!(session.get_auth_cookie().as_deref(), Some("tok"));

        session.delete_cookie("auth").unwrap();
        assert_eq!(session.get_auth_cookie(), None);
    }

    #[test]
    fn set_cookie_writes_expiry_and_path() {
        let (session, jar) = recording_session();
        let before = Utc::now();
        session.set_cookie("auth", "tok.en", 2.0).unwrap();
        let after = Utc::now();

        let writes = jar.writes();
        assert_eq!(writes.len(), 1);
        let date = writes[0]
            .strip_prefix("auth=tok.en;expires=")
            .and_then(|rest| rest.strip_suffix(";path=/"))
            .unwrap();
        assert!(date.ends_with(" GMT"), "{date}");

        let at: DateTime<Utc> = NaiveDateTime::parse_from_str(date, "%a, %d %b %Y %H:%M:%S GMT")
            .unwrap()
            .and_utc();
        let lower = before + TimeDelta::hours(2) - TimeDelta::seconds(1);
        let upper = after + TimeDelta::hours(2);
        assert!(at >= lower && at <= upper, "{at} not within [{lower}, {upper}]");
    }

    #[test]
    fn delete_cookie_writes_epoch_expiry() {
        let (session, jar) = recording_session();
        session.delete_cookie("auth").unwrap();
        assert_eq!(
            jar.writes(),
            vec!["auth=;expires=Thu, 01 Jan 1970 00:00:00 UTC;path=/;".to_string()]
        );
    }

    #[test]
    fn set_cookie_out_of_range_hours_writes_session_cookie() {
        let (recorded, jar) = recording_session();
        for hours in [1e12, -1e12, 1e300, f64::INFINITY, f64::NAN] {
            recorded.set_cookie("auth", "t", hours).unwrap();
        }
        assert!(jar.writes().iter().all(|w| w == "auth=t;path=/"));
        assert_eq!(jar.writes().len(), 5);

        let (session, _, cookies) = session();
        session.set_cookie("auth", "t", 1e12).unwrap();
        assert_eq!(cookies.cookie_string(), "auth=t");
    }

    #[test]
    fn set_cookie_with_non_positive_hours_expires_it() {
        let (session, _, cookies) = session();
        session.set_cookie("auth", "tok", 1.0).unwrap();
        session.set_cookie("auth", "tok", -1.0).unwrap();
        assert_eq!(cookies.cookie_string(), "");
    }

    #[test]
    fn email_and_directory_without_server() {
        let (session, store, _) = session();
        store.set(KEY_EMAIL, "me@example.com").unwrap();
        assert_eq!(
            session.get_email_and_directory(),
            EmailAndDirectory {
                email: None,
                dir: None
            }
        );
    }

    #[test]
    fn email_and_directory_roundtrip() {
        let (session, store, _) = session();
        let mut dirs = DirectoryMap::new();
        dirs.insert("2", DirectoryEntry::new("VN_root_2"));

        session
            .set_email_and_directory("me@example.com", Some(&dirs))
            .unwrap();
        store.set(KEY_SELECTED_SERVER, "2").unwrap();

        let got = session.get_email_and_directory();
        assert_eq!(got.email.as_deref(), Some("me@example.com"));
        assert_eq!(got.dir.as_deref(), Some("VN_root_2"));

        store.set(KEY_SELECTED_SERVER, "9").unwrap();
        let other = session.get_email_and_directory();
        assert_eq!(other.email.as_deref(), Some("me@example.com"));
        assert_eq!(other.dir, None);
    }

    #[test]
    fn missing_directory_stores_empty_object() {
        let (session, store, _) = session();
        session.set_email_and_directory("me@example.com", None).unwrap();
        assert_eq!(store.get(KEY_DIR).as_deref(), Some("{}"));
    }

    #[test]
    fn corrupt_directory_is_absent() {
        let (session, store, _) = session();
        store.set(KEY_SELECTED_SERVER, "1").unwrap();
        store.set(KEY_DIR, "{broken").unwrap();
        assert_eq!(session.get_email_and_directory().dir, None);
    }

    #[test]
    fn delete_email_and_directory_keeps_other_keys() {
        let (session, store, _) = session();
        session.set_email_and_directory("me@example.com", None).unwrap();
        store.set(KEY_SELECTED_SERVER, "1").unwrap();

        session.delete_email_and_directory().unwrap();
        assert_eq!(store.get(KEY_EMAIL), None);
        assert_eq!(store.get(KEY_DIR), None);
        assert_eq!(store.get(KEY_SELECTED_SERVER).as_deref(), Some("1"));
    }

    #[test]
    fn delete_all_local_state_clears_everything() {
        let (session, store, _) = session();
        session.set_item("custom", "x").unwrap();
        session.set_item(KEY_DARK_MODE, "true").unwrap();
        session.delete_all_local_state().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn generic_item_access() {
        let (session, _, _) = session();
        assert_eq!(session.get_item("lastSearch"), None);
        session.set_item("lastSearch", "ubuntu").unwrap();
        assert_eq!(session.get_item("lastSearch").as_deref(), Some("ubuntu"));
    }

    #[test]
    fn server_expiry_date() {
        let (session, store, _) = session();
        store
            .set(
                KEY_SERVER_OPTIONS,
                &json!({"1": {"created_at": "2023-12-06T08:00:00Z", "expiry": 30}}).to_string(),
            )
            .unwrap();

        assert_eq!(
            session.get_server_expiry_date(Some("1")).as_deref(),
            Some("05 Jan 2024")
        );
        assert_eq!(session.get_server_expiry_date(Some("2")), None);
        assert_eq!(session.get_server_expiry_date(None), None);
        assert_eq!(session.get_server_expiry_date(Some("")), None);
    }

    #[test]
    fn server_expiry_date_out_of_range_is_absent() {
        let (session, store, _) = session();
        store
            .set(
                KEY_SERVER_OPTIONS,
                r#"{"1": {"created_at": "2024-01-01T00:00:00Z", "expiry": -1e300}}"#,
            )
            .unwrap();
        assert_eq!(session.get_server_expiry_date(Some("1")), None);
    }

    #[test]
    fn server_expiry_date_without_options() {
        let (session, _, _) = session();
        assert_eq!(session.get_server_expiry_date(Some("1")), None);
    }

    #[test]
    fn drive_info_reads_selected_server() {
        let (session, store, _) = session();
        store
            .set(
                KEY_SERVER_OPTIONS,
                &json!({
                    "1": {"limit": "6597069766656", "drive_used": "1099511627776"},
                    "2": {"limit": 10, "drive_used": 4}
                })
                .to_string(),
            )
            .unwrap();
        store.set(KEY_SELECTED_SERVER, "1").unwrap();

        assert_eq!(
            session.calculate_drive_info(),
            Some(DriveInfo {
                limit: 6_597_069_766_656,
                used: 1_099_511_627_776
            })
        );

        store.set(KEY_SELECTED_SERVER, "2").unwrap();
        assert_eq!(
            session.calculate_drive_info(),
            Some(DriveInfo { limit: 10, used: 4 })
        );
    }

    #[test]
    fn drive_info_missing_data() {
        let (session, store, _) = session();
        store.set(KEY_SELECTED_SERVER, "1").unwrap();
        assert_eq!(session.calculate_drive_info(), None);

        store
            .set(KEY_SERVER_OPTIONS, r#"{"2": {"limit": "1", "drive_used": "0"}}"#)
            .unwrap();
        assert_eq!(session.calculate_drive_info(), None);

        store
            .set(KEY_SERVER_OPTIONS, r#"{"1": {"limit": "lots"}}"#)
            .unwrap();
        assert_eq!(session.calculate_drive_info(), None);

        store.remove(KEY_SELECTED_SERVER).unwrap();
        store
            .set(KEY_SERVER_OPTIONS, r#"{"1": {"limit": "1", "drive_used": "0"}}"#)
            .unwrap();
        assert_eq!(session.calculate_drive_info(), None);
    }

    #[test]
    fn apply_dark_mode_follows_stored_flag() {
        let (session, _, _) = session();
        let host = StaticAppearance::new(false);

        session.set_item(KEY_DARK_MODE, "true").unwrap();
        session.apply_dark_mode_preference(&host);
        assert!(host.has_class(DARK_CLASS));

        session.set_item(KEY_DARK_MODE, "yes").unwrap();
        session.apply_dark_mode_preference(&host);
        assert!(!host.has_class(DARK_CLASS));

        session.set_item(KEY_DARK_MODE, "true").unwrap();
        session.apply_dark_mode_preference(&host);
        session.delete_all_local_state().unwrap();
        session.apply_dark_mode_preference(&host);
        assert!(!host.has_class(DARK_CLASS));
    }
}
