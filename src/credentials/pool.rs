//! Quota-aware credential pool with round-robin checkout
//!
//! The pool keeps credential state in an arena (`Vec<Credential>`) and drives
//! rotation order through a ring of indices (`VecDeque<usize>`), both behind a
//! single async mutex. A checkout pass scans the ring once, pessimistically
//! decrementing each visited credential and moving it to the back, so two
//! concurrent callers can never double-spend the same unit of quota. Waiting
//! for a quota reset never holds the lock.

use crate::credentials::{Credential, PoolError, QuotaProbe, RateLimit};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Extra margin added past the earliest known reset time before resyncing
const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// How far out a quota report's reset time defaults when the caller has none
const DEFAULT_RESET_TTL_SECS: i64 = 3600;

struct Inner {
    /// Credential arena; indices are stable for the pool's lifetime
    credentials: Vec<Credential>,

    /// Rotation ring of arena indices; front is the next candidate
    rotation: VecDeque<usize>,
}

/// Pool of rate-limited API credentials
///
/// Serves quota-aware checkout to many concurrent callers and reconciles
/// asynchronous, possibly out-of-order quota reports. Never empty after
/// successful construction.
pub struct CredentialPool {
    inner: Mutex<Inner>,
    probe: Arc<dyn QuotaProbe>,
    grace: Duration,
}

impl CredentialPool {
    /// Creates a pool from already-probed credentials
    ///
    /// # Arguments
    ///
    /// * `credentials` - Initial credential states; must be non-empty
    /// * `probe` - Source of authoritative quota observations for resync
    ///
    /// # Returns
    ///
    /// * `Ok(CredentialPool)` - Pool ready to serve checkouts
    /// * `Err(PoolError::Empty)` - No credentials were provided
    pub fn new(
        credentials: Vec<Credential>,
        probe: Arc<dyn QuotaProbe>,
    ) -> Result<Self, PoolError> {
        if credentials.is_empty() {
            return Err(PoolError::Empty);
        }

        let rotation = (0..credentials.len()).collect();
        Ok(Self {
            inner: Mutex::new(Inner {
                credentials,
                rotation,
            }),
            probe,
            grace: DEFAULT_GRACE,
        })
    }

    /// Overrides the post-reset grace margin (tests use short margins)
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Loads a pool from a credential file, one API key per line
    ///
    /// Every listed key is probed once; keys that fail the probe are skipped
    /// with a warning. Construction fails if no key passes.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the key file
    /// * `probe` - Source of quota observations, also kept for resync
    ///
    /// # Returns
    ///
    /// * `Ok(CredentialPool)` - At least one key passed its initial probe
    /// * `Err(PoolError)` - File unreadable or zero usable keys
    pub async fn load(path: &Path, probe: Arc<dyn QuotaProbe>) -> Result<Self, PoolError> {
        let content = tokio::fs::read_to_string(path).await?;

        let mut credentials = Vec::new();
        for line in content.lines() {
            let key = line.trim();
            if key.is_empty() {
                continue;
            }

            match probe.probe(key).await {
                Ok(limit) => {
                    tracing::info!(
                        "Credential accepted (remaining: {}, resets at {})",
                        limit.remaining,
                        limit.reset_at
                    );
                    credentials.push(Credential::new(key, limit));
                }
                Err(e) => {
                    tracing::warn!("Skipping credential that failed its initial probe: {}", e);
                }
            }
        }

        if credentials.is_empty() {
            return Err(PoolError::NoUsableCredentials {
                path: path.display().to_string(),
            });
        }

        Self::new(credentials, probe)
    }

    /// Checks out a usable API key, suspending until one is available
    ///
    /// Scans the rotation once per attempt. Each visited credential is
    /// decremented and moved to the back regardless of outcome; the key is
    /// returned when the pre-decrement remaining was positive. If a full pass
    /// finds nothing, the caller sleeps until the earliest known reset time
    /// plus the grace margin, resyncs every credential from the probe, and
    /// scans again. This loops indefinitely; it only ever returns a key.
    pub async fn checkout(&self) -> String {
        loop {
            let (found, min_reset) = {
                let mut inner = self.inner.lock().await;
                let mut min_reset: Option<DateTime<Utc>> = None;
                let mut found = None;

                for _ in 0..inner.rotation.len() {
                    let Some(idx) = inner.rotation.pop_front() else {
                        break;
                    };
                    inner.rotation.push_back(idx);

                    let cred = &mut inner.credentials[idx];
                    let before = cred.remaining;
                    cred.remaining -= 1;

                    min_reset = Some(match min_reset {
                        Some(m) => m.min(cred.reset_at),
                        None => cred.reset_at,
                    });

                    if before > 0 {
                        found = Some(cred.key.clone());
                        break;
                    }
                }

                (found, min_reset)
            };

            if let Some(key) = found {
                return key;
            }

            // Construction guarantees a non-empty rotation, so a fruitless
            // pass always observed at least one reset time.
            let Some(min_reset) = min_reset else {
                tokio::time::sleep(self.grace).await;
                continue;
            };

            let grace = ChronoDuration::from_std(self.grace).unwrap_or(ChronoDuration::zero());
            if let Ok(wait) = (min_reset - Utc::now() + grace).to_std() {
                tracing::debug!(
                    "All credentials exhausted, waiting {:?} for the earliest reset",
                    wait
                );
                tokio::time::sleep(wait).await;
            }

            self.resync().await;
        }
    }

    /// Applies an authoritative quota report for one key
    ///
    /// Reports may arrive concurrently and out of order, so reconciliation is
    /// conservative: remaining takes the minimum of reported and stored (local
    /// decrements already reserved quota ahead of confirmation), reset takes
    /// the maximum. The rule is commutative and idempotent under arbitrary
    /// interleaving.
    ///
    /// # Arguments
    ///
    /// * `key` - The credential the report is about
    /// * `remaining` - Quota observed in a real API response
    /// * `reset_at` - Observed reset time; defaults to one hour out if absent
    pub async fn report(&self, key: &str, remaining: i64, reset_at: Option<DateTime<Utc>>) {
        let reset_at =
            reset_at.unwrap_or_else(|| Utc::now() + ChronoDuration::seconds(DEFAULT_RESET_TTL_SECS));

        let mut inner = self.inner.lock().await;
        match inner.credentials.iter_mut().find(|c| c.key == key) {
            Some(cred) => {
                cred.remaining = cred.remaining.min(remaining);
                cred.reset_at = cred.reset_at.max(reset_at);
            }
            None => {
                tracing::warn!("Ignoring quota report for a key not in the pool");
            }
        }
    }

    /// Refreshes every credential's quota from the authoritative probe
    ///
    /// Probe failures leave the stale entry in place; keys are never removed
    /// after construction.
    pub async fn resync(&self) {
        let keys: Vec<(usize, String)> = {
            let inner = self.inner.lock().await;
            inner
                .credentials
                .iter()
                .enumerate()
                .map(|(idx, c)| (idx, c.key.clone()))
                .collect()
        };

        for (idx, key) in keys {
            match self.probe.probe(&key).await {
                Ok(limit) => {
                    let mut inner = self.inner.lock().await;
                    let cred = &mut inner.credentials[idx];
                    cred.remaining = limit.remaining;
                    cred.reset_at = limit.reset_at;
                }
                Err(e) => {
                    tracing::warn!("Quota resync failed for a credential: {}", e);
                }
            }
        }
    }

    /// Returns a copy of every credential's current state
    pub async fn snapshot(&self) -> Vec<Credential> {
        self.inner.lock().await.credentials.clone()
    }

    /// Sums the known remaining quota across all credentials
    pub async fn total_remaining(&self) -> i64 {
        self.inner
            .lock()
            .await
            .credentials
            .iter()
            .map(|c| c.remaining)
            .sum()
    }

    /// Number of credentials in the pool
    pub async fn len(&self) -> usize {
        self.inner.lock().await.credentials.len()
    }

    /// Always false after successful construction
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.credentials.is_empty()
    }
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}
