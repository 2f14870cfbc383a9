//! Typed records for the JSON blobs kept in the persistent store and for
//! listing rows.
//!
//! The backend and older clients write numbers as strings and vice versa, so
//! every numeric field here accepts either form.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::format::{parse_float_prefix, parse_timestamp};

/// Prefix of the directory-map key for a server: `PP-server#<id>`
pub const SERVER_KEY_PREFIX: &str = "PP-server#";

/// A size as it arrives from the backend: a raw byte count or display text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeValue {
    /// Numeric byte count
    Bytes(f64),
    /// Textual size, either numeric (`"1048576"`) or formatted (`"1.0 MB"`)
    Text(String),
}

impl SizeValue {
    /// Strict numeric coercion of the whole value.
    ///
    /// Blank text is zero; text that is not entirely a number is `NaN`.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Bytes(n) => *n,
            Self::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return 0.0;
                }
                let unsigned = s.trim_start_matches(['+', '-']);
                if unsigned == "Infinity" {
                    return if s.starts_with('-') {
                        f64::NEG_INFINITY
                    } else {
                        f64::INFINITY
                    };
                }
                if unsigned
                    .chars()
                    .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')))
                {
                    return f64::NAN;
                }
                s.parse().unwrap_or(f64::NAN)
            }
        }
    }

    /// Leading-integer parse: `"123abc"` is 123, `"1.9"` is 1, `"abc"` is `None`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn leading_int(&self) -> Option<i64> {
        match self {
            Self::Bytes(n) if n.is_finite() => Some(n.trunc() as i64),
            Self::Bytes(_) => None,
            Self::Text(s) => parse_int_prefix(s),
        }
    }
}

impl From<u64> for SizeValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: u64) -> Self {
        Self::Bytes(n as f64)
    }
}

impl From<f64> for SizeValue {
    fn from(n: f64) -> Self {
        Self::Bytes(n)
    }
}

impl From<&str> for SizeValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SizeValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

pub(crate) fn parse_int_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Number(n)) => Some(n.to_string()),
        Some(Scalar::Text(s)) => Some(s),
        None => None,
    })
}

fn opt_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Number(n)) => n.as_f64(),
        Some(Scalar::Text(s)) => Some(parse_float_prefix(&s)).filter(|v| !v.is_nan()),
        None => None,
    })
}

/// Cached metadata for one server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerDetails {
    /// Creation timestamp (ISO-8601 or Unix milliseconds)
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub created_at: Option<String>,
    /// Lifetime in days counted from `created_at`
    #[serde(default, deserialize_with = "opt_lenient_f64")]
    pub expiry: Option<f64>,
    /// Drive quota in bytes
    #[serde(default)]
    pub limit: Option<SizeValue>,
    /// Drive usage in bytes
    #[serde(default)]
    pub drive_used: Option<SizeValue>,
}

impl ServerDetails {
    /// `created_at` plus `expiry` days.
    ///
    /// `None` if either is missing or invalid, or the sum leaves the
    /// representable date range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn expiry_date(&self) -> Option<DateTime<Utc>> {
        let created = parse_timestamp(self.created_at.as_deref()?)?;
        let days = self.expiry.filter(|d| d.is_finite())?;
        let millis = (days * 86_400_000.0).round() as i64;
        created.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
    }
}

/// Server id → [`ServerDetails`], as stored under `serverOptions`.
///
/// Entries are decoded on lookup so one malformed server does not hide the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerOptions(Map<String, Value>);

impl ServerOptions {
    /// Parses the stored JSON; `None` when it is not a JSON object
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Some(Self(map)),
            Ok(_) => {
                tracing::debug!("serverOptions is not a JSON object; ignoring");
                None
            }
            Err(e) => {
                tracing::debug!("serverOptions is not valid JSON: {e}");
                None
            }
        }
    }

    /// Details for `server_id`, if present and well-formed
    #[must_use]
    pub fn get(&self, server_id: &str) -> Option<ServerDetails> {
        let value = self.0.get(server_id)?;
        if value.is_null() {
            return None;
        }
        serde_json::from_value(value.clone())
            .map_err(|e| tracing::debug!("serverOptions[{server_id}] is malformed: {e}"))
            .ok()
    }

    /// Number of servers in the map
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no servers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Last-selected directory for one server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Backend directory id
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub directory_id: Option<String>,
    /// Fields this crate does not interpret, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DirectoryEntry {
    /// Entry pointing at `directory_id`
    #[must_use]
    pub fn new(directory_id: impl Into<String>) -> Self {
        Self {
            directory_id: Some(directory_id.into()),
            extra: Map::new(),
        }
    }
}

/// `PP-server#<id>` → [`DirectoryEntry`], as stored under `dir`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectoryMap(BTreeMap<String, DirectoryEntry>);

impl DirectoryMap {
    /// Empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key under which `server_id`'s entry is stored
    #[must_use]
    pub fn server_key(server_id: &str) -> String {
        format!("{SERVER_KEY_PREFIX}{server_id}")
    }

    /// Parses the stored JSON, skipping entries that are not objects.
    ///
    /// Anything that is not a JSON object yields an empty map.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) else {
            tracing::debug!("dir is missing or not a JSON object; treating as empty");
            return Self::default();
        };

        Self(
            map.into_iter()
                .filter_map(|(k, v)| serde_json::from_value(v).ok().map(|entry| (k, entry)))
                .collect(),
        )
    }

    /// Records `entry` for `server_id`
    pub fn insert(&mut self, server_id: &str, entry: DirectoryEntry) {
        self.0.insert(Self::server_key(server_id), entry);
    }

    /// Directory id selected on `server_id`; blank ids count as unset
    #[must_use]
    pub fn directory_for(&self, server_id: &str) -> Option<&str> {
        self.0
            .get(&Self::server_key(server_id))?
            .directory_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }

    /// Number of servers with an entry
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no server has an entry
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One torrent/file search result row.
///
/// The five display fields are required, so a row that deserializes carries
/// exactly what the backend sent; nothing is filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentRow {
    /// Display title
    #[serde(rename = "Title")]
    pub title: String,
    /// Raw byte count, or formatted size after [`prepare_row_data`](crate::grid::prepare_row_data)
    #[serde(rename = "Size")]
    pub size: SizeValue,
    /// Seeder count
    #[serde(rename = "Seeders")]
    pub seeders: u64,
    /// Peer count
    #[serde(rename = "Peers")]
    pub peers: u64,
    /// Tracker name
    #[serde(rename = "Tracker")]
    pub tracker: String,
    /// Other fields (magnet links, categories, ...) passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Drive quota for the selected server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveInfo {
    /// Quota in bytes
    pub limit: i64,
    /// Bytes used.
    ///
    /// Serialized as `available` because that is the name consumers read,
    /// even though the value is the drive usage, not the free space.
    #[serde(rename = "available")]
    pub used: i64,
}

/// Stored email plus the directory selected on the current server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAndDirectory {
    /// Account email
    pub email: Option<String>,
    /// Directory id for the selected server
    pub dir: Option<String>,
}
