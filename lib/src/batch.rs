//! Batch runner: bounded-parallel verification of many addresses with
//! an aggregate summary.

use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::orchestrator::{VerificationError, VerificationResult, VerifyConfig, verify_email};

/// Aggregate counts over a batch run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub errors: usize,
    pub processing_time: Duration,
}

/// The output of [`verify_email_batch`]: one result per input address, plus
/// the aggregate summary.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchResult {
    pub results: Vec<VerificationResult>,
    pub summary: BatchSummary,
}

/// Verify every address in `emails`, running at most `concurrency`
/// verifications at a time. Chunks of at most `concurrency` addresses are
/// built up front and driven one chunk after another, so the number of
/// in-flight verifications never exceeds `concurrency` even across chunk
/// boundaries.
pub async fn verify_email_batch(emails: &[String], concurrency: usize, config: &VerifyConfig) -> BatchResult {
    let start = Instant::now();
    let concurrency = concurrency.max(1);

    let mut results = Vec::with_capacity(emails.len());
    for chunk in emails.chunks(concurrency) {
        let futures = chunk.iter().map(|email| verify_email(email, config));
        results.extend(join_all(futures).await);
    }

    let mut valid = 0;
    let mut invalid = 0;
    let mut errors = 0;
    for result in &results {
        match &result.metadata.error {
            None => valid += 1,
            Some(VerificationError::SmtpConnectionFailed) => errors += 1,
            Some(_) => invalid += 1,
        }
    }

    BatchResult {
        summary: BatchSummary {
            total: results.len(),
            valid,
            invalid,
            errors,
            processing_time: start.elapsed(),
        },
        results,
    }
}
