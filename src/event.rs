use crate::state::{RepoSummary, UploadRecord};

/// Messages sent from backend tasks to the UI thread.
#[derive(Debug, Clone)]
pub enum AppEvent {
    UploadStarted { file_name: String },
    UploadProgress { file_name: String, percent: u8 },
    UploadFinished(UploadRecord),
    BatchFinished,
    RepoIngested(RepoSummary),
    RepoIngestFailed(String),
    RepoIngestTimedOut,
    ChatAnswered(String),
    ChatFailed(String),
}
