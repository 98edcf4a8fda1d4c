//! Persistent session storage.
//!
//! Holds the bearer token, the cached user record and the "remember me"
//! email in a small JSON file next to the config. Every accessor goes to
//! disk so that state written by one command is seen by the next, and by
//! the REST client right before each request.

use crate::models::SessionUser;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_data: Option<SessionUser>,
    #[serde(default)]
    remember_me: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_email: Option<String>,
}

/// File-backed key/value store for authentication state
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location (`session.json` in the config dir)
    pub fn default_location() -> Self {
        Self::new(crate::utils::get_session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<SessionData> {
        if !self.path.exists() {
            return Ok(SessionData::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {:?}", self.path))?;
        if content.trim().is_empty() {
            return Ok(SessionData::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {:?}", self.path))
    }

    fn store(&self, data: &SessionData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create session directory: {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(data).context("Failed to serialize session")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write session file: {:?}", self.path))?;

        // 600: the file holds a bearer token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.path)
                .with_context(|| format!("Failed to get file metadata: {:?}", self.path))?
                .permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .with_context(|| format!("Failed to set file permissions: {:?}", self.path))?;
        }

        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut SessionData)) -> Result<()> {
        let mut data = self.load()?;
        apply(&mut data);
        self.store(&data)
    }

    pub fn token(&self) -> Result<Option<String>> {
        Ok(self.load()?.auth_token.filter(|t| !t.is_empty()))
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        let token = token.to_string();
        self.update(|data| data.auth_token = Some(token))
    }

    pub fn user(&self) -> Result<Option<SessionUser>> {
        Ok(self.load()?.user_data)
    }

    pub fn set_user(&self, user: &SessionUser) -> Result<()> {
        let user = user.clone();
        self.update(|data| data.user_data = Some(user))
    }

    /// Drop token and cached user, keeping the remembered email
    pub fn clear_auth(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|data| {
            data.auth_token = None;
            data.user_data = None;
        })
    }

    pub fn remember_email(&self, email: &str) -> Result<()> {
        let email = email.to_string();
        self.update(|data| {
            data.remember_me = true;
            data.saved_email = Some(email);
        })
    }

    pub fn forget_email(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|data| {
            data.remember_me = false;
            data.saved_email = None;
        })
    }

    /// The remembered email, only while "remember me" is on
    pub fn saved_email(&self) -> Result<Option<String>> {
        let data = self.load()?;
        if data.remember_me {
            Ok(data.saved_email)
        } else {
            Ok(None)
        }
    }
}

/// Shorten a token for logs: first and last four characters
pub fn token_preview(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_user() -> SessionUser {
        SessionUser {
            id: 7,
            name: "Ana".to_string(),
            email: "ana@acme.mx".to_string(),
            company_id: Some(3),
            company: None,
        }
    }

    #[test]
    fn test_empty_store_has_no_token() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path().join("session.json"));
        assert_eq!(store.token().unwrap(), None);
        assert_eq!(store.user().unwrap(), None);
        assert_eq!(store.saved_email().unwrap(), None);
    }

    #[test]
    fn test_token_and_user_round_trip_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path().join("session.json"));

        store.set_token("tok_123456789").unwrap();
        store.set_user(&sample_user()).unwrap();
        store.remember_email("ana@acme.mx").unwrap();

        // a second handle on the same file sees the same state
        let other = SessionStore::new(store.path().to_path_buf());
        assert_eq!(other.token().unwrap().as_deref(), Some("tok_123456789"));
        assert_eq!(other.user().unwrap(), Some(sample_user()));

        other.clear_auth().unwrap();
        assert_eq!(store.token().unwrap(), None);
        assert_eq!(store.user().unwrap(), None);
        assert_eq!(store.saved_email().unwrap().as_deref(), Some("ana@acme.mx"));
    }

    #[test]
    fn test_forget_email() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path().join("session.json"));
        store.remember_email("ana@acme.mx").unwrap();
        store.forget_email().unwrap();
        assert_eq!(store.saved_email().unwrap(), None);
    }

    #[test]
    fn test_token_preview_masks_middle() {
        assert_eq!(token_preview("abcd1234efgh5678"), "abcd...5678");
        assert_eq!(token_preview("short"), "***");
    }
}
