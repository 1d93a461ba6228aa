//! Ordered stack of pending cleanup continuations.

use crate::error::CleanupFailure;
use crate::registration::{AsyncCleanupFn, SyncCleanupFn};

/// A captured release continuation, sync or async.
pub(crate) enum CleanupStep {
    Sync(SyncCleanupFn),
    Async(AsyncCleanupFn),
}

/// One pending cleanup, named after the service it releases.
pub(crate) struct CleanupEntry {
    pub(crate) service: &'static str,
    pub(crate) step: CleanupStep,
}

/// Cleanup stack in acquisition order.
///
/// Sync and async entries share one sequence so that mixed acquisitions drain
/// in exact reverse acquisition order, regardless of which path captured each
/// entry.
#[derive(Default)]
pub(crate) struct CleanupBag {
    entries: Vec<CleanupEntry>,
}

impl CleanupBag {
    pub(crate) fn push(&mut self, service: &'static str, step: CleanupStep) {
        self.entries.push(CleanupEntry { service, step });
    }

    /// Number of queued async entries.
    pub(crate) fn pending_async(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.step, CleanupStep::Async(_)))
            .count()
    }

    /// Takes the whole stack, leaving the bag empty.
    pub(crate) fn take(&mut self) -> Vec<CleanupEntry> {
        std::mem::take(&mut self.entries)
    }
}

/// Runs sync entries in reverse order, collecting failures. Async entries
/// cannot run here; each is skipped with a warning and counted.
pub(crate) fn drain_sync(entries: Vec<CleanupEntry>) -> (Vec<CleanupFailure>, usize) {
    let mut failures = Vec::new();
    let mut skipped = 0;
    for entry in entries.into_iter().rev() {
        match entry.step {
            CleanupStep::Sync(f) => {
                if let Err(source) = f() {
                    tracing::warn!(service = entry.service, error = %source, "cleanup failed");
                    failures.push(CleanupFailure {
                        service: entry.service,
                        source,
                    });
                }
            }
            CleanupStep::Async(_) => {
                tracing::warn!(
                    service = entry.service,
                    "async cleanup skipped on synchronous teardown"
                );
                skipped += 1;
            }
        }
    }
    (failures, skipped)
}

/// Runs every entry in reverse order, awaiting async ones, collecting
/// failures without stopping the drain.
pub(crate) async fn drain_all(entries: Vec<CleanupEntry>) -> Vec<CleanupFailure> {
    let mut failures = Vec::new();
    for entry in entries.into_iter().rev() {
        let result = match entry.step {
            CleanupStep::Sync(f) => f(),
            CleanupStep::Async(f) => f().await,
        };
        if let Err(source) = result {
            tracing::warn!(service = entry.service, error = %source, "cleanup failed");
            failures.push(CleanupFailure {
                service: entry.service,
                source,
            });
        }
    }
    failures
}
