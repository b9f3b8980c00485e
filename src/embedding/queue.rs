//! Bounded inference queue for models that cannot run concurrently.
//!
//! One dedicated OS thread owns the model. Async callers send a job over a
//! bounded `mpsc` channel and await the reply on a `oneshot`. When the
//! channel is full, callers wait for capacity, so at most `depth` requests
//! are ever pending in front of the model.

use anyhow::Result;
use journal_search_core::SearchError;
use tokio::sync::{mpsc, oneshot};

/// A synchronous embedding model that requires exclusive access.
pub trait BlockingEmbedder: Send + 'static {
    fn embed(&mut self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

struct Job {
    texts: Vec<String>,
    reply: oneshot::Sender<Result<Vec<Vec<f32>>>>,
}

/// Handle to a worker thread running one [`BlockingEmbedder`].
///
/// Dropping the last handle closes the channel and the worker exits once
/// queued jobs are done.
#[derive(Debug, Clone)]
pub struct InferenceQueue {
    tx: mpsc::Sender<Job>,
}

impl InferenceQueue {
    /// Start the worker thread.
    pub fn spawn<E: BlockingEmbedder>(name: &str, depth: usize, mut embedder: E) -> Result<Self> {
        let (tx, mut rx) = mpsc::channel::<Job>(depth.max(1));

        std::thread::Builder::new()
            .name(format!("{}-inference", name))
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    let result = embedder.embed(job.texts);
                    // The caller may have given up (timeout); nothing to do then.
                    let _ = job.reply.send(result);
                }
                tracing::debug!("inference queue closed");
            })?;

        Ok(Self { tx })
    }

    /// Queue `texts` and wait for the model's answer.
    pub async fn embed(&self, texts: Vec<String>) -> journal_search_core::Result<Vec<Vec<f32>>> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Job { texts, reply })
            .await
            .map_err(|_| SearchError::Embedding("inference worker has stopped".to_string()))?;

        response
            .await
            .map_err(|_| SearchError::Embedding("inference worker dropped the request".to_string()))?
            .map_err(|e| SearchError::Embedding(format!("{:#}", e)))
    }
}
