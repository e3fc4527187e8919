//! Contention tests for optimistic concurrency.
//!
//! These helpers race several writers against one record and report how
//! many attempts won, conflicted, or failed for another reason.

use docstore_core::{ConcurrentWriter, CoreError, DocumentStore, FieldChanges, RecordId};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a contention run.
#[derive(Debug, Clone)]
pub struct ContentionResult {
    /// Updates that were applied.
    pub won: usize,
    /// Updates rejected with a version conflict.
    pub conflicted: usize,
    /// Updates that failed for any other reason.
    pub failed: usize,
    /// Wall-clock duration.
    pub duration: Duration,
}

impl ContentionResult {
    /// Total attempts.
    pub fn attempts(&self) -> usize {
        self.won + self.conflicted + self.failed
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Attempts: {}", self.attempts());
        println!("Won: {}", self.won);
        println!("Conflicted: {}", self.conflicted);
        println!("Failed: {}", self.failed);
        println!("Duration: {:?}", self.duration);
    }
}

/// Configuration for contention runs.
#[derive(Debug, Clone)]
pub struct ContentionConfig {
    /// Number of writer threads.
    pub writers: usize,
    /// Rounds each writer plays.
    pub rounds: usize,
}

impl Default for ContentionConfig {
    fn default() -> Self {
        Self {
            writers: 8,
            rounds: 1,
        }
    }
}

/// Every writer reads the same version, then all update at once.
///
/// With a correct store exactly one writer per round wins.
pub fn race_same_version<S>(
    writer: Arc<ConcurrentWriter<S>>,
    id: RecordId,
    changes: FieldChanges,
    config: &ContentionConfig,
) -> ContentionResult
where
    S: DocumentStore + ?Sized + 'static,
{
    let start = Instant::now();
    let mut result = ContentionResult {
        won: 0,
        conflicted: 0,
        failed: 0,
        duration: Duration::ZERO,
    };

    for _ in 0..config.rounds {
        let version = match writer.get(id) {
            Ok(record) => record.version,
            Err(_) => {
                result.failed += config.writers;
                continue;
            }
        };
        let barrier = Arc::new(Barrier::new(config.writers));
        let handles: Vec<_> = (0..config.writers)
            .map(|_| {
                let writer = Arc::clone(&writer);
                let barrier = Arc::clone(&barrier);
                let changes = changes.clone();
                thread::spawn(move || {
                    barrier.wait();
                    writer.update(id, version, &changes)
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(Ok(_)) => result.won += 1,
                Ok(Err(CoreError::VersionConflict { .. })) => result.conflicted += 1,
                Ok(Err(_)) | Err(_) => result.failed += 1,
            }
        }
    }

    result.duration = start.elapsed();
    result
}

/// Each writer loops read-then-update, retrying on conflict, until it has
/// landed `rounds` updates. Returns the final version.
pub fn retry_until_applied<S>(
    writer: Arc<ConcurrentWriter<S>>,
    id: RecordId,
    changes: FieldChanges,
    config: &ContentionConfig,
) -> ContentionResult
where
    S: DocumentStore + ?Sized + 'static,
{
    let start = Instant::now();
    let handles: Vec<_> = (0..config.writers)
        .map(|_| {
            let writer = Arc::clone(&writer);
            let changes = changes.clone();
            let rounds = config.rounds;
            thread::spawn(move || {
                let (mut won, mut conflicted, mut failed) = (0, 0, 0);
                while won < rounds {
                    let version = match writer.get(id) {
                        Ok(record) => record.version,
                        Err(_) => {
                            failed += 1;
                            break;
                        }
                    };
                    match writer.update(id, version, &changes) {
                        Ok(_) => won += 1,
                        Err(CoreError::VersionConflict { .. }) => conflicted += 1,
                        Err(_) => {
                            failed += 1;
                            break;
                        }
                    }
                }
                (won, conflicted, failed)
            })
        })
        .collect();

    let mut result = ContentionResult {
        won: 0,
        conflicted: 0,
        failed: 0,
        duration: Duration::ZERO,
    };
    for handle in handles {
        match handle.join() {
            Ok((won, conflicted, failed)) => {
                result.won += won;
                result.conflicted += conflicted;
                result.failed += failed;
            }
            Err(_) => result.failed += 1,
        }
    }
    result.duration = start.elapsed();
    result
}
