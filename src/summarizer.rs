use crate::capabilities::{Summarizer, SummaryVerdict};
use crate::queue::SuggestionQueue;
use crate::types::{ProcessOutcome, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How many suggestions one processing batch pulls.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Drives the external summarization capability over the queue's
/// unprocessed pending suggestions, one bounded batch per call.
///
/// Safe to re-invoke: each call resumes with the next unprocessed batch.
/// A returned `processed` count smaller than the batch size tells the
/// caller there is no more work.
pub struct SummarizerAdapter {
    queue: SuggestionQueue,
    summarizer: Arc<dyn Summarizer>,
}

impl SummarizerAdapter {
    pub fn new(queue: SuggestionQueue, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { queue, summarizer }
    }

    pub async fn process_pending_batch(&self, batch_size: usize) -> Result<ProcessOutcome> {
        let batch = self.queue.next_unprocessed(batch_size).await?;
        debug!("Processing batch of {} suggestions", batch.len());

        let mut outcome = ProcessOutcome::default();

        for suggestion in batch {
            match self
                .summarizer
                .summarize(&suggestion.original_title, &suggestion.original_content)
                .await
            {
                Ok(SummaryVerdict::Post(draft)) => {
                    self.queue.apply_summary(suggestion.id, &draft).await?;
                    outcome.processed += 1;
                }
                Ok(SummaryVerdict::Rejected { reason }) => {
                    debug!("Summarizer rejected {}: {}", suggestion.id, reason);
                    self.queue
                        .mark_auto_rejected(suggestion.id, &suggestion.original_title)
                        .await?;
                    outcome.processed += 1;
                }
                Err(e) => {
                    // The item stays unprocessed and will be retried on a
                    // later batch; the batch itself keeps going.
                    warn!("Summarizer failed for {}: {}", suggestion.id, e);
                    outcome
                        .errors
                        .push(format!("{}: {}", suggestion.id, e));
                }
            }
        }

        info!(
            "Batch done: {} processed, {} errors",
            outcome.processed,
            outcome.errors.len()
        );
        Ok(outcome)
    }
}
