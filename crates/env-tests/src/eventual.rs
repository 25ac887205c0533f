//! Eventual consistency helpers for timing-dependent tests.
//!
//! Pod lifecycle changes (scheduling, deletion, informer caches) are not
//! visible immediately after the API call returns. These helpers poll a
//! condition with exponential backoff until a category-specific deadline.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Categories of eventual consistency, each with its own deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyCategory {
    /// Object visible to a subsequent read (10s)
    ApiPropagation,

    /// Pod bound to its node and container started (60s)
    PodStartup,

    /// Pod removed after a graceful delete (45s, default grace period is 30s)
    PodDeletion,
}

impl ConsistencyCategory {
    /// Deadline for this category.
    pub fn timeout(&self) -> Duration {
        match self {
            ConsistencyCategory::ApiPropagation => Duration::from_secs(10),
            ConsistencyCategory::PodStartup => Duration::from_secs(60),
            ConsistencyCategory::PodDeletion => Duration::from_secs(45),
        }
    }

    fn initial_delay(&self) -> Duration {
        Duration::from_millis(250)
    }
}

/// Wait until `condition` returns true or the category deadline passes.
///
/// Backoff starts at 250ms, doubles each round, and never sleeps past the
/// deadline.
///
/// # Example
///
/// ```no_run
/// use env_tests::eventual::{assert_eventually, ConsistencyCategory};
///
/// # async fn example(cluster: &env_tests::cluster::ClusterConnection) {
/// assert_eventually(ConsistencyCategory::PodDeletion, || async move {
///     matches!(cluster.get_pod("captured-gnb-042").await, Ok(None))
/// })
/// .await
/// .expect("mirror pod should be gone");
/// # }
/// ```
pub async fn assert_eventually<F, Fut>(
    category: ConsistencyCategory,
    mut condition: F,
) -> Result<(), String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let timeout = category.timeout();
    let mut delay = category.initial_delay();
    let start = Instant::now();

    loop {
        if condition().await {
            return Ok(());
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(format!(
                "Condition not met within {:?} ({:?})",
                timeout, category
            ));
        }

        sleep(delay.min(timeout.saturating_sub(elapsed))).await;
        delay = delay.saturating_mul(2);
    }
}
