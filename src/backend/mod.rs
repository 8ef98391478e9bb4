use crate::event::AppEvent;
use crate::state::{RepoSummary, UploadOutcome, UploadRecord};
use crate::upload::SelectedFile;
use chrono::Utc;
use futures::stream;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;

/// Repository ingestion is expected to be slow; the request is aborted after
/// this window and reported as timed out.
pub const REPO_INGEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Granularity of the streamed upload body; one progress event per chunk.
const PROGRESS_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Backend(String),
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    chunks: u64,
    #[serde(default)]
    validation: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    answer: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Clone-able handle to the ingestion/query backend. Every operation spawns
/// one task on the shared runtime and reports its outcome to the UI thread
/// as [`AppEvent`]s; nothing here blocks the caller.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    tx: mpsc::Sender<AppEvent>,
    runtime: Handle,
}

impl BackendClient {
    pub fn new(
        base_url: String,
        tx: mpsc::Sender<AppEvent>,
        runtime: Handle,
    ) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url,
            tx,
            runtime,
        })
    }

    /// Uploads a batch strictly sequentially: the next file starts only after
    /// the previous request resolved. Emits `UploadStarted`, `UploadProgress`
    /// and `UploadFinished` per file, then a single `BatchFinished`.
    pub fn upload_batch(&self, files: Vec<SelectedFile>) {
        let client = self.clone();
        self.runtime.spawn(async move {
            for file in files {
                let _ = client.tx.send(AppEvent::UploadStarted {
                    file_name: file.name.clone(),
                });

                let outcome = match client.upload_file(&file).await {
                    Ok(response) => {
                        log::debug!("uploaded {} ({} chunks)", file.name, response.chunks);
                        UploadOutcome::Success {
                            chunks: response.chunks,
                            validation: response.validation,
                        }
                    }
                    Err(err) => {
                        log::warn!("upload of {} failed: {err}", file.name);
                        UploadOutcome::Error {
                            message: err.to_string(),
                        }
                    }
                };

                let _ = client.tx.send(AppEvent::UploadFinished(UploadRecord {
                    file_name: file.name,
                    timestamp: Utc::now(),
                    outcome,
                }));
            }
            let _ = client.tx.send(AppEvent::BatchFinished);
        });
    }

    async fn upload_file(&self, file: &SelectedFile) -> Result<UploadResponse, BackendError> {
        let bytes =
            tokio::fs::read(&file.path)
                .await
                .map_err(|source| BackendError::FileRead {
                    path: file.path.display().to_string(),
                    source,
                })?;
        let total = bytes.len();

        let tx = self.tx.clone();
        let file_name = file.name.clone();
        let mut sent = 0usize;
        let chunks: Vec<Vec<u8>> = bytes
            .chunks(PROGRESS_CHUNK_SIZE)
            .map(|chunk| chunk.to_vec())
            .collect();
        let body = reqwest::Body::wrap_stream(stream::iter(chunks.into_iter().map(
            move |chunk| {
                sent += chunk.len();
                let _ = tx.send(AppEvent::UploadProgress {
                    file_name: file_name.clone(),
                    percent: progress_percent(sent, total),
                });
                Ok::<Vec<u8>, std::io::Error>(chunk)
            },
        )));

        let part = Part::stream_with_length(body, total as u64)
            .file_name(file.name.clone())
            .mime_str(file.kind.mime_type())?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/files", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<UploadResponse>().await?)
    }

    /// Submits a repository URL for ingestion. Bounded by
    /// [`REPO_INGEST_TIMEOUT`]; dropping the request future on timeout aborts
    /// the in-flight call.
    pub fn ingest_repository(&self, repo_url: String) {
        let client = self.clone();
        self.runtime.spawn(async move {
            let request = async {
                let response = client
                    .http
                    .post(format!("{}/repositories", client.base_url))
                    .json(&json!({ "repo_url": repo_url, "branch": "main" }))
                    .send()
                    .await?;
                let response = check_status(response).await?;
                Ok::<RepoSummary, BackendError>(response.json::<RepoSummary>().await?)
            };

            let event = match tokio::time::timeout(REPO_INGEST_TIMEOUT, request).await {
                Ok(Ok(summary)) => AppEvent::RepoIngested(summary),
                Ok(Err(err)) => {
                    log::warn!("repository ingestion failed: {err}");
                    AppEvent::RepoIngestFailed(err.to_string())
                }
                Err(_) => {
                    log::warn!("repository ingestion timed out");
                    AppEvent::RepoIngestTimedOut
                }
            };
            let _ = client.tx.send(event);
        });
    }

    /// Sends a question to the query endpoint.
    pub fn ask(&self, question: String) {
        let client = self.clone();
        self.runtime.spawn(async move {
            let request = async {
                let response = client
                    .http
                    .post(format!("{}/query", client.base_url))
                    .json(&json!({ "question": question }))
                    .send()
                    .await?;
                let response = check_status(response).await?;
                Ok::<QueryResponse, BackendError>(response.json::<QueryResponse>().await?)
            };

            let event = match request.await {
                Ok(response) => AppEvent::ChatAnswered(response.answer),
                Err(err) => {
                    log::warn!("query failed: {err}");
                    AppEvent::ChatFailed(err.to_string())
                }
            };
            let _ = client.tx.send(event);
        });
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    Err(BackendError::Backend(error_detail(status, &body)))
}

/// Backend errors carry a human-readable `detail` field; anything else falls
/// back to the status line.
fn error_detail(status: StatusCode, body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) if !parsed.detail.trim().is_empty() => parsed.detail,
        _ => format!("backend returned {status}"),
    }
}

fn progress_percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as f64 * 100.0) / total as f64).round() as u8
}

#[cfg(test)]
mod tests {
    use super::{error_detail, progress_percent};
    use reqwest::StatusCode;

    #[test]
    fn progress_percent_rounds_to_nearest_integer() {
        assert_eq!(progress_percent(0, 1000), 0);
        assert_eq!(progress_percent(333, 1000), 33);
        assert_eq!(progress_percent(335, 1000), 34);
        assert_eq!(progress_percent(1000, 1000), 100);
    }

    #[test]
    fn progress_percent_treats_empty_files_as_complete() {
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn error_detail_prefers_the_backend_detail_field() {
        let body = br#"{"detail": "file is not a valid PDF"}"#;
        assert_eq!(
            error_detail(StatusCode::UNPROCESSABLE_ENTITY, body),
            "file is not a valid PDF"
        );
    }

    #[test]
    fn error_detail_falls_back_on_missing_or_malformed_bodies() {
        assert_eq!(
            error_detail(StatusCode::INTERNAL_SERVER_ERROR, b"oops"),
            "backend returned 500 Internal Server Error"
        );
        assert_eq!(
            error_detail(StatusCode::BAD_GATEWAY, br#"{"detail": "  "}"#),
            "backend returned 502 Bad Gateway"
        );
    }
}
