use std::{future::Future, time::Duration};

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::{Error, Result};

/// A point in time every nested operation must finish by, plus a token that
/// lets an owner stop the work early.
///
/// Children derived with [`Deadline::child`] are never later than their parent,
/// and cancelling a parent cancels every child.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    token: CancellationToken,
}

impl Deadline {
    /// A root deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self { at: Instant::now() + timeout, token: CancellationToken::new() }
    }

    /// A child bounded by both `timeout` from now and this deadline.
    pub fn child(&self, timeout: Duration) -> Self {
        let at = (Instant::now() + timeout).min(self.at);
        Self { at, token: self.token.child_token() }
    }

    /// A child with the same instant, cancellable on its own.
    pub fn scope(&self) -> Self {
        Self { at: self.at, token: self.token.child_token() }
    }

    pub fn at(&self) -> Instant {
        self.at
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.at
    }

    /// Fails with [`Error::DeadlineExceeded`] once the deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.is_expired() { Err(Error::DeadlineExceeded) } else { Ok(()) }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancels this deadline when the guard is dropped.
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Resolves when the instant is reached or the token is cancelled.
    pub async fn expired(&self) {
        tokio::select! {
            _ = tokio::time::sleep_until(self.at) => {}
            _ = self.token.cancelled() => {}
        }
    }

    /// Runs `fut` but gives up with [`Error::DeadlineExceeded`] on expiry.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.expired() => Err(Error::DeadlineExceeded),
            res = fut => res,
        }
    }

    /// Sleeps for `duration`, cut short by expiry.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.run(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn child_never_outlives_parent() {
        let parent = Deadline::after(Duration::from_secs(1));
        let child = parent.child(Duration::from_secs(10));

        assert_eq!(child.at(), parent.at());

        let tighter = parent.child(Duration::from_millis(200));
        assert!(tighter.at() < parent.at());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_parent_expires_child() {
        let parent = Deadline::after(Duration::from_secs(5));
        let child = parent.scope();

        assert!(!child.is_expired());
        parent.cancel();
        assert!(child.is_expired());
        assert!(matches!(child.check(), Err(Error::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_child_leaves_parent_alone() {
        let parent = Deadline::after(Duration::from_secs(5));
        let child = parent.scope();

        child.cancel();
        assert!(child.is_expired());
        assert!(!parent.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn run_is_cut_short_on_expiry() {
        let deadline = Deadline::after(Duration::from_secs(1));
        let started = Instant::now();

        let res = deadline
            .run(async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Ok(42)
            })
            .await;

        assert!(matches!(res, Err(Error::DeadlineExceeded)));
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_within_budget_completes() {
        let deadline = Deadline::after(Duration::from_secs(1));

        deadline.sleep(Duration::from_millis(300)).await.expect("sleep should complete");
        assert_eq!(deadline.remaining(), Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn drop_guard_cancels_on_drop() {
        let parent = Deadline::after(Duration::from_secs(5));
        let scope = parent.scope();

        {
            let _guard = scope.drop_guard();
            assert!(!scope.is_expired());
        }

        assert!(scope.is_expired());
        assert!(!parent.is_expired());
    }
}
