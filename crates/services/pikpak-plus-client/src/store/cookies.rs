use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

use super::CookieJar;
use crate::error::PikPakError;

#[derive(Debug, Clone)]
struct Cookie {
    name: String,
    value: String,
    expires: Option<DateTime<Utc>>,
}

/// In-process [`CookieJar`] holding session cookies in insertion order
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<Vec<Cookie>>,
}

impl MemoryCookieJar {
    /// Empty jar
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Cookie>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookie_string(&self) -> String {
        let now = Utc::now();
        self.lock()
            .iter()
            .filter(|c| c.expires.is_none_or(|at| at > now))
            .map(|c| {
                if c.name.is_empty() {
                    c.value.clone()
                } else {
                    format!("{}={}", c.name, c.value)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn write(&self, assignment: &str) -> Result<(), PikPakError> {
        let mut parts = assignment.split(';');
        let pair = parts.next().unwrap_or_default();
        let (name, value) = match pair.split_once('=') {
            Some((n, v)) => (n.trim(), v.trim()),
            None => ("", pair.trim()),
        };

        let mut expires = None;
        for attr in parts {
            let Some((key, val)) = attr.split_once('=') else {
                continue;
            };
            let val = val.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "expires" => {
                    expires = Some(parse_cookie_date(val).ok_or_else(|| {
                        PikPakError::Storage(format!("Invalid cookie expiry: {val}"))
                    })?);
                }
                // max-age wins over expires regardless of order
                "max-age" => {
                    if let Ok(secs) = val.parse::<i64>() {
                        expires = Some(max_age_expiry(secs));
                        break;
                    }
                }
                _ => {}
            }
        }

        let mut cookies = self.lock();
        let existing = cookies.iter().position(|c| c.name == name);

        if expires.is_some_and(|at| at <= Utc::now()) {
            if let Some(idx) = existing {
                cookies.remove(idx);
            }
            return Ok(());
        }

        let cookie = Cookie {
            name: name.to_string(),
            value: value.to_string(),
            expires,
        };
        match existing {
            Some(idx) => cookies[idx] = cookie,
            None => cookies.push(cookie),
        }
        Ok(())
    }
}

/// Formats a cookie expiry date, e.g. `Thu, 01 Jan 1970 00:00:00 GMT`
#[must_use]
pub fn format_cookie_date(at: &DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Expiry `secs` from now, clamped to the representable date range
fn max_age_expiry(secs: i64) -> DateTime<Utc> {
    TimeDelta::try_seconds(secs)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .unwrap_or(if secs < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

fn parse_cookie_date(raw: &str) -> Option<DateTime<Utc>> {
    let stripped = raw
        .trim()
        .trim_end_matches("GMT")
        .trim_end_matches("UTC")
        .trim_end();
    NaiveDateTime::parse_from_str(stripped, "%a, %d %b %Y %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
