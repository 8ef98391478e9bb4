use crate::state::{PersistedState, SCHEMA_VERSION};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn data_dir() -> PathBuf {
    home_dir().join(".ragdesk")
}

pub fn state_path() -> PathBuf {
    data_dir().join("state.json")
}

fn read_state_file(path: &Path) -> Result<PersistedState, String> {
    let data = fs::read(path).map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    let state: PersistedState = serde_json::from_slice(&data)
        .map_err(|err| format!("failed to parse {}: {err}", path.display()))?;
    if state.schema_version != SCHEMA_VERSION {
        return Err(format!(
            "unknown schema_version in {}: {}",
            path.display(),
            state.schema_version
        ));
    }
    Ok(state)
}

/// Loads persisted state from the default location. A missing file means a
/// first run and yields fresh state without a warning; unreadable or
/// unparsable state also yields fresh state, with a warning.
pub fn load() -> (PersistedState, Vec<String>) {
    load_from(&state_path())
}

pub fn load_from(path: &Path) -> (PersistedState, Vec<String>) {
    if !path.exists() {
        return (PersistedState::new(), Vec::new());
    }
    match read_state_file(path) {
        Ok(state) => (state, Vec::new()),
        Err(err) => (PersistedState::new(), vec![err]),
    }
}

/// Atomic write: serialize to a sibling tmp file, then rename over the
/// target.
pub fn save_to(path: &Path, state: &PersistedState) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let tmp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(state)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;

    fs::write(&tmp_path, bytes)?;
    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if path.exists() {
                fs::remove_file(path)?;
                fs::rename(&tmp_path, path)?;
                Ok(())
            } else {
                Err(rename_err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{load_from, read_state_file, save_to};
    use crate::state::{PersistedState, SessionInfo, UploadOutcome, UploadRecord};
    use chrono::Utc;

    #[test]
    fn save_then_load_round_trips_state() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("state.json");

        let mut state = PersistedState::new();
        state.session = Some(SessionInfo {
            username: "alice".to_string(),
        });
        state.push_history(UploadRecord {
            file_name: "report.pdf".to_string(),
            timestamp: Utc::now(),
            outcome: UploadOutcome::Error {
                message: "backend returned 500".to_string(),
            },
        });

        save_to(&path, &state).expect("state should save");
        let (loaded, warnings) = load_from(&path);
        assert!(warnings.is_empty());
        assert!(loaded.is_authenticated());
        assert_eq!(loaded.upload_history.len(), 1);
        assert!(loaded.upload_history[0].is_error());
    }

    #[test]
    fn load_from_missing_file_yields_fresh_state() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let (state, warnings) = load_from(&dir.path().join("absent.json"));
        assert!(warnings.is_empty());
        assert!(!state.is_authenticated());
        assert!(state.upload_history.is_empty());
    }

    #[test]
    fn load_from_corrupt_file_warns_and_yields_fresh_state() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").expect("fixture should write");

        let (state, warnings) = load_from(&path);
        assert!(!state.is_authenticated());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("failed to parse"));
    }

    #[test]
    fn read_state_file_rejects_unknown_schema() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("state.json");
        let data = r#"{
  "schema_version": 99,
  "session": null,
  "upload_history": [],
  "last_repo": null
}"#;
        std::fs::write(&path, data).expect("fixture should write");

        let error = read_state_file(&path).expect_err("unknown schema should fail");
        assert!(error.contains("unknown schema_version"));
    }
}
