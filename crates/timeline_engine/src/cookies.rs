use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::types::Platform;

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("cookie file not found: {path}")]
    NotFound { path: PathBuf },
    #[error("cookie file malformed: {path}: {detail}")]
    Malformed { path: PathBuf, detail: String },
    #[error("cookie file unreadable: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// A session cookie, normalized once at the store boundary. Browser-export
/// quirks (unknown sameSite values, fractional expiry seconds, the
/// `expirationDate` spelling) never travel past this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub same_site: SameSite,
    pub expiry: Option<i64>,
}

/// Raw cookie object as found in exported JSON files.
#[derive(Debug, Deserialize)]
struct WireCookie {
    name: String,
    value: String,
    domain: String,
    path: Option<String>,
    #[serde(rename = "sameSite")]
    same_site: Option<String>,
    #[serde(alias = "expirationDate")]
    expiry: Option<f64>,
}

impl From<WireCookie> for CookieRecord {
    fn from(wire: WireCookie) -> Self {
        let same_site = match wire.same_site.as_deref() {
            Some("Strict") => SameSite::Strict,
            Some("Lax") => SameSite::Lax,
            // Anything the browser would reject collapses to None.
            _ => SameSite::None,
        };
        Self {
            name: wire.name,
            value: wire.value,
            domain: wire.domain,
            path: wire.path.unwrap_or_else(|| "/".to_string()),
            same_site,
            expiry: wire.expiry.map(|seconds| seconds as i64),
        }
    }
}

/// The one cookie a platform session cannot work without.
pub fn critical_cookie_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Twitter => "auth_token",
        Platform::LinkedIn => "li_at",
        Platform::Instagram => "sessionid",
        Platform::Facebook => "c_user",
    }
}

pub fn cookie_file_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Twitter => "cookies.json",
        Platform::LinkedIn => "linkedin_cookies.json",
        Platform::Instagram => "instagram_cookies.json",
        Platform::Facebook => "facebook_cookies.json",
    }
}

pub fn find_critical(records: &[CookieRecord], platform: Platform) -> Option<&CookieRecord> {
    let wanted = critical_cookie_name(platform);
    records.iter().find(|record| record.name == wanted)
}

/// Read-only access to per-platform cookie export files in one directory.
pub struct CookieStore {
    dir: PathBuf,
}

impl CookieStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, platform: Platform) -> PathBuf {
        self.dir.join(cookie_file_name(platform))
    }

    /// Loads and normalizes the cookie set for `platform`.
    pub fn load(&self, platform: Platform) -> Result<Vec<CookieRecord>, CookieError> {
        let path = self.path_for(platform);
        let raw = read_cookie_file(&path)?;
        let wire: Vec<WireCookie> =
            serde_json::from_str(&raw).map_err(|err| CookieError::Malformed {
                path: path.clone(),
                detail: err.to_string(),
            })?;
        Ok(wire.into_iter().map(CookieRecord::from).collect())
    }
}

fn read_cookie_file(path: &Path) -> Result<String, CookieError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(raw),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(CookieError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(err) => Err(CookieError::Io {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}
