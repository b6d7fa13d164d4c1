use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("scratch store I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("scratch store contains invalid data: {0}")]
    Json(#[from] serde_json::Error),
}

// Mystery-challenge state that survives restarts, one record per user.
// Expiry is checked by the reading code (mystery.rs), not by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MysteryScratch {
    pub assigned_skill_id: Option<i64>,
    pub session_start: Option<String>,
    pub refresh_count: u32,
    pub shown_skill_ids: Vec<i64>,
    pub complete_until: Option<String>,
}

// Small file-backed key-value scratch space next to the database: per-user
// mystery session files plus the current-login pointer.
pub struct Scratch {
    root: PathBuf,
}

impl Scratch {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn mystery_file(&self, user_id: &str) -> PathBuf {
        self.root.join(format!("{}_mystery.json", user_id))
    }

    fn session_file(&self) -> PathBuf {
        self.root.join("session")
    }

    pub fn load_mystery(&self, user_id: &str) -> Result<Option<MysteryScratch>, StoreError> {
        let path = self.mystery_file(user_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn save_mystery(&self, user_id: &str, state: &MysteryScratch) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(state)?;
        fs::write(self.mystery_file(user_id), raw)?;
        Ok(())
    }

    pub fn clear_mystery(&self, user_id: &str) -> Result<(), StoreError> {
        let path = self.mystery_file(user_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn current_user(&self) -> Result<Option<String>, StoreError> {
        let path = self.session_file();
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }

    pub fn set_current_user(&self, user_id: &str) -> Result<(), StoreError> {
        fs::write(self.session_file(), user_id)?;
        Ok(())
    }

    pub fn clear_current_user(&self) -> Result<(), StoreError> {
        let path = self.session_file();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Scratch) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let scratch = Scratch::open(dir.path().join("scratch")).expect("Failed to open scratch");
        (dir, scratch)
    }

    mod mystery_scratch_tests {
        use super::*;

        #[test]
        fn load_missing_returns_none() {
            let (_dir, scratch) = setup();
            assert_eq!(scratch.load_mystery("u1").unwrap(), None);
        }

        #[test]
        fn save_then_load_round_trips() {
            let (_dir, scratch) = setup();
            let state = MysteryScratch {
                assigned_skill_id: Some(7),
                session_start: Some("2024-01-03T12:00:00+00:00".to_string()),
                refresh_count: 1,
                shown_skill_ids: vec![3, 7],
                complete_until: None,
            };

            scratch.save_mystery("u1", &state).unwrap();
            assert_eq!(scratch.load_mystery("u1").unwrap(), Some(state));
        }

        #[test]
        fn users_do_not_share_state() {
            let (_dir, scratch) = setup();
            let state = MysteryScratch {
                assigned_skill_id: Some(1),
                ..Default::default()
            };

            scratch.save_mystery("u1", &state).unwrap();
            assert_eq!(scratch.load_mystery("u2").unwrap(), None);
        }

        #[test]
        fn clear_removes_state() {
            let (_dir, scratch) = setup();
            scratch
                .save_mystery("u1", &MysteryScratch::default())
                .unwrap();

            scratch.clear_mystery("u1").unwrap();
            assert_eq!(scratch.load_mystery("u1").unwrap(), None);
        }

        #[test]
        fn clear_missing_is_a_noop() {
            let (_dir, scratch) = setup();
            scratch.clear_mystery("nobody").unwrap();
        }

        #[test]
        fn corrupted_file_is_an_error_not_a_panic() {
            let (_dir, scratch) = setup();
            std::fs::write(scratch.mystery_file("u1"), "{ not json").unwrap();

            assert!(matches!(
                scratch.load_mystery("u1"),
                Err(StoreError::Json(_))
            ));
        }
    }

    mod session_tests {
        use super::*;

        #[test]
        fn no_session_by_default() {
            let (_dir, scratch) = setup();
            assert_eq!(scratch.current_user().unwrap(), None);
        }

        #[test]
        fn set_and_read_current_user() {
            let (_dir, scratch) = setup();
            scratch.set_current_user("u42").unwrap();
            assert_eq!(scratch.current_user().unwrap(), Some("u42".to_string()));
        }

        #[test]
        fn logout_clears_session() {
            let (_dir, scratch) = setup();
            scratch.set_current_user("u42").unwrap();
            scratch.clear_current_user().unwrap();
            assert_eq!(scratch.current_user().unwrap(), None);
        }

        #[test]
        fn login_replaces_previous_session() {
            let (_dir, scratch) = setup();
            scratch.set_current_user("u1").unwrap();
            scratch.set_current_user("u2").unwrap();
            assert_eq!(scratch.current_user().unwrap(), Some("u2".to_string()));
        }
    }
}
