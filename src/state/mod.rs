use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod store;

pub const SCHEMA_VERSION: u32 = 1;

/// Upload history keeps only the most recent entries.
pub const HISTORY_LIMIT: usize = 5;

/// Everything that survives an application restart, written through to disk
/// on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistedState {
    pub schema_version: u32,
    pub session: Option<SessionInfo>,
    pub upload_history: Vec<UploadRecord>,
    pub last_repo: Option<RepoSummary>,
}

impl PersistedState {
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            ..Self::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Appends a record, evicting the oldest entries beyond [`HISTORY_LIMIT`].
    pub fn push_history(&mut self, record: UploadRecord) {
        self.upload_history.push(record);
        if self.upload_history.len() > HISTORY_LIMIT {
            let excess = self.upload_history.len() - HISTORY_LIMIT;
            self.upload_history.drain(..excess);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub file_name: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: UploadOutcome,
}

impl UploadRecord {
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, UploadOutcome::Error { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    Success { chunks: u64, validation: String },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepoSummary {
    pub repo_name: String,
    pub files_processed: u64,
    pub repo_summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::{PersistedState, UploadOutcome, UploadRecord, HISTORY_LIMIT};
    use chrono::Utc;

    fn record(name: &str) -> UploadRecord {
        UploadRecord {
            file_name: name.to_string(),
            timestamp: Utc::now(),
            outcome: UploadOutcome::Success {
                chunks: 1,
                validation: "ok".to_string(),
            },
        }
    }

    #[test]
    fn push_history_evicts_oldest_first() {
        let mut state = PersistedState::new();
        for i in 0..8 {
            state.push_history(record(&format!("file{i}.pdf")));
        }

        assert_eq!(state.upload_history.len(), HISTORY_LIMIT);
        let names: Vec<&str> = state
            .upload_history
            .iter()
            .map(|r| r.file_name.as_str())
            .collect();
        assert_eq!(
            names,
            ["file3.pdf", "file4.pdf", "file5.pdf", "file6.pdf", "file7.pdf"]
        );
    }

    #[test]
    fn push_history_preserves_insertion_order_under_the_limit() {
        let mut state = PersistedState::new();
        state.push_history(record("one.pdf"));
        state.push_history(record("two.pdf"));

        let names: Vec<&str> = state
            .upload_history
            .iter()
            .map(|r| r.file_name.as_str())
            .collect();
        assert_eq!(names, ["one.pdf", "two.pdf"]);
    }
}
