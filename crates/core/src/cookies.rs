/// Cookie file persistence for reusing a webmail session across runs.
/// Avoids a manual login on every batch; a stale file is rejected so the
/// automation fails fast instead of driving a logged-out inbox.
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AutomationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Seconds since epoch; -1 marks a session cookie.
    #[serde(default = "default_expires")]
    pub expires: f64,
    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_same_site", rename = "sameSite")]
    pub same_site: String,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_expires() -> f64 {
    -1.0
}

fn default_same_site() -> String {
    "Lax".to_string()
}

/// On-disk shapes: either an annotated object or a bare cookie array.
/// The bare form is what early versions of the tool wrote; the loader
/// accepts both.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum CookieFile {
    Annotated {
        timestamp: f64,
        count: usize,
        cookies: Vec<CookieRecord>,
    },
    Bare(Vec<CookieRecord>),
}

/// Load cookies, returning `None` for a missing, unreadable, malformed or
/// stale file. Only I/O-level surprises are worth an error here; a bad
/// cookie file just means the operator has to log in again.
pub fn load_cookies(path: &Path, max_age_days: u64) -> Option<Vec<CookieRecord>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => {
            warn!(path = %path.display(), "cookie file not found");
            return None;
        }
    };

    let file: CookieFile = match serde_json::from_str(&raw) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid cookie file, ignoring");
            return None;
        }
    };

    let cookies = match file {
        CookieFile::Bare(cookies) => {
            info!(count = cookies.len(), "loaded cookies (legacy format)");
            cookies
        }
        CookieFile::Annotated {
            timestamp,
            count,
            cookies,
        } => {
            let age_days = (chrono::Utc::now().timestamp() as f64 - timestamp) / 86_400.0;
            info!(count, age_days = %format!("{age_days:.1}"), "loaded cookies");
            if age_days > max_age_days as f64 {
                warn!("cookies older than {max_age_days} days, treating as expired");
                return None;
            }
            cookies
        }
    };

    if cookies.is_empty() || cookies.iter().any(|c| c.name.is_empty()) {
        warn!("cookie file failed validation");
        return None;
    }

    Some(cookies)
}

/// Save cookies in the annotated format with the current timestamp.
pub fn save_cookies(path: &Path, cookies: &[CookieRecord]) -> Result<(), AutomationError> {
    if cookies.is_empty() {
        return Err(AutomationError::CookieStore(
            "no cookies to save".to_string(),
        ));
    }

    let file = CookieFile::Annotated {
        timestamp: chrono::Utc::now().timestamp() as f64,
        count: cookies.len(),
        cookies: cookies.to_vec(),
    };

    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| AutomationError::CookieStore(e.to_string()))?;
    std::fs::write(path, json)?;

    info!(count = cookies.len(), path = %path.display(), "saved cookies");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cookie(name: &str) -> CookieRecord {
        CookieRecord {
            name: name.to_string(),
            value: "v".to_string(),
            domain: ".example.test".to_string(),
            path: "/".to_string(),
            expires: -1.0,
            http_only: false,
            secure: true,
            same_site: "Lax".to_string(),
        }
    }

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn accepts_bare_list_format() {
        let file = write_temp(r#"[{"name": "aut", "value": "x", "domain": "a.test"}]"#);
        let cookies = load_cookies(file.path(), 7).unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "aut");
        assert_eq!(cookies[0].path, "/");
    }

    #[test]
    fn accepts_annotated_format_when_fresh() {
        let now = chrono::Utc::now().timestamp();
        let file = write_temp(&format!(
            r#"{{"timestamp": {now}, "count": 1, "cookies": [{{"name": "aut", "value": "x"}}]}}"#
        ));
        assert!(load_cookies(file.path(), 7).is_some());
    }

    #[test]
    fn rejects_payload_older_than_max_age() {
        let eight_days_ago = chrono::Utc::now().timestamp() - 8 * 86_400;
        let file = write_temp(&format!(
            r#"{{"timestamp": {eight_days_ago}, "count": 1, "cookies": [{{"name": "aut", "value": "x"}}]}}"#
        ));
        assert!(load_cookies(file.path(), 7).is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        let file = write_temp("{not json");
        assert!(load_cookies(file.path(), 7).is_none());
    }

    #[test]
    fn missing_file_is_none() {
        assert!(load_cookies(Path::new("/nonexistent/cookies.json"), 7).is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let file = tempfile::NamedTempFile::new().unwrap();
        save_cookies(file.path(), &[sample_cookie("aut"), sample_cookie("session")]).unwrap();
        let loaded = load_cookies(file.path(), 7).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].name, "session");
    }
}
