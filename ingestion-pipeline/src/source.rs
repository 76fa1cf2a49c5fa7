use async_trait::async_trait;
use tracing::info;

use common::error::AppError;

/// Collaborator boundary for obtaining the raw dialogue of a content item.
/// The pipeline never talks to the subtitle service directly; it sees only
/// this trait, which keeps builds testable without a network.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch_dialogue(&self, content_id: &str, title: &str) -> Result<String, AppError>;
}

/// Fetches dialogue from the subtitle HTTP service as plain text.
pub struct SubtitleApiSource {
    client: reqwest::Client,
    base_url: String,
}

impl SubtitleApiSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl TranscriptSource for SubtitleApiSource {
    async fn fetch_dialogue(&self, content_id: &str, title: &str) -> Result<String, AppError> {
        let url = format!("{}/dialogue/{}", self.base_url, content_id);
        info!(content_id, title, url, "Fetching dialogue transcript");

        let response = self
            .client
            .get(&url)
            .query(&[("title", title)])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}

/// In-memory source returning a fixed transcript, for tests.
#[cfg(any(test, feature = "test-utils"))]
pub struct StaticTranscriptSource {
    transcript: String,
    fetch_count: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl StaticTranscriptSource {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            fetch_count: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl TranscriptSource for StaticTranscriptSource {
    async fn fetch_dialogue(&self, _content_id: &str, _title: &str) -> Result<String, AppError> {
        self.fetch_count
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self.transcript.clone())
    }
}

/// Source that sleeps before answering, for exercising fetch timeouts.
#[cfg(any(test, feature = "test-utils"))]
pub struct SlowTranscriptSource {
    transcript: String,
    delay: std::time::Duration,
}

#[cfg(any(test, feature = "test-utils"))]
impl SlowTranscriptSource {
    pub fn new(transcript: impl Into<String>, delay: std::time::Duration) -> Self {
        Self {
            transcript: transcript.into(),
            delay,
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl TranscriptSource for SlowTranscriptSource {
    async fn fetch_dialogue(&self, _content_id: &str, _title: &str) -> Result<String, AppError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.transcript.clone())
    }
}
