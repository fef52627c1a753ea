use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::AutomationError;

/// One successfully provisioned account. Written only after every pipeline
/// stage, including key extraction, has succeeded.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub email: String,
    pub password: Option<String>,
    pub api_key: String,
    pub created_at: DateTime<Local>,
}

impl AccountRecord {
    pub fn new(email: String, password: Option<String>, api_key: String) -> Self {
        Self {
            email,
            password,
            api_key,
            created_at: Local::now(),
        }
    }

    /// `email,password,api_key,YYYY-MM-DD HH:MM:SS;` with `N/A` for a
    /// missing password.
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{};\n",
            self.email,
            self.password.as_deref().unwrap_or("N/A"),
            self.api_key,
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
        )
    }
}

/// Append-only credential file. Single-writer by assumption; no locking.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, record: &AccountRecord) -> Result<(), AutomationError> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(record.to_line().as_bytes())?;

        info!(
            email = %record.email,
            path = %self.path.display(),
            "credential record saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format_matches_documented_shape() {
        let record = AccountRecord::new(
            "user123-ab12cd34@2925.com".to_string(),
            Some("Secret1!".to_string()),
            "tvly-abcdef".to_string(),
        );
        let line = record.to_line();
        assert!(line.starts_with("user123-ab12cd34@2925.com,Secret1!,tvly-abcdef,"));
        assert!(line.ends_with(";\n"));

        let timestamp = line
            .trim_end_matches(";\n")
            .rsplit(',')
            .next()
            .unwrap();
        assert_eq!(timestamp.len(), "2026-01-01 00:00:00".len());
    }

    #[test]
    fn missing_password_written_as_na() {
        let record =
            AccountRecord::new("a@b.test".to_string(), None, "tvly-x".to_string());
        assert!(record.to_line().contains(",N/A,"));
    }

    #[test]
    fn append_adds_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.md");
        let store = CredentialStore::new(&path);

        store
            .append(&AccountRecord::new(
                "a@b.test".to_string(),
                None,
                "tvly-1".to_string(),
            ))
            .unwrap();
        store
            .append(&AccountRecord::new(
                "c@d.test".to_string(),
                Some("pw".to_string()),
                "tvly-2".to_string(),
            ))
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().nth(1).unwrap().starts_with("c@d.test,pw,tvly-2,"));
    }
}
