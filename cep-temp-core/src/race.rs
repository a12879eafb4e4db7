//! Run several candidates concurrently and keep the first success.

use std::future::Future;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    deadline::Deadline,
    error::{Error, Result},
};

type Operation<T> = Box<dyn FnOnce(Deadline) -> BoxFuture<'static, Result<T>> + Send>;

/// One named contender in a race.
pub struct Candidate<T> {
    source: String,
    op: Operation<T>,
}

impl<T> Candidate<T> {
    /// `op` receives the race's deadline; it is cancelled once another candidate wins.
    pub fn new<F, Fut>(source: impl Into<String>, op: F) -> Self
    where
        F: FnOnce(Deadline) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self { source: source.into(), op: Box::new(move |deadline| Box::pin(op(deadline))) }
    }
}

impl<T> std::fmt::Debug for Candidate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate").field("source", &self.source).finish_non_exhaustive()
    }
}

/// What a single candidate produced.
#[derive(Debug)]
pub struct RaceOutcome<T> {
    pub source: String,
    pub result: Result<T>,
}

/// Returns the first successful value among `candidates`.
///
/// Outcomes are consumed in completion order. When every candidate fails the
/// last error received is reported as [`Error::AllCandidatesFailed`]; when the
/// deadline passes first the result is [`Error::DeadlineExceeded`]. Once the
/// race is decided the remaining candidates are cancelled.
pub async fn race<T>(candidates: Vec<Candidate<T>>, deadline: &Deadline) -> Result<T>
where
    T: Send + 'static,
{
    if candidates.is_empty() {
        return Err(Error::NoCandidates);
    }

    let scope = deadline.scope();
    // also fires if this future is dropped before the race is decided
    let _cancel_on_exit = scope.drop_guard();
    let attempted = candidates.len();
    let (tx, mut rx) = mpsc::channel(attempted);

    for Candidate { source, op } in candidates {
        let tx = tx.clone();
        let scope = scope.clone();
        tokio::spawn(async move {
            let result = op(scope).await;
            // the receiver is gone once the race is decided
            let _ = tx.send(RaceOutcome { source, result }).await;
        });
    }
    drop(tx);

    collect(&mut rx, attempted, &scope).await
}

async fn collect<T>(
    rx: &mut mpsc::Receiver<RaceOutcome<T>>,
    attempted: usize,
    scope: &Deadline,
) -> Result<T> {
    let mut last: Option<(String, Error)> = None;

    for _ in 0..attempted {
        let outcome = tokio::select! {
            biased;
            _ = scope.expired() => {
                warn!(attempted, "deadline expired before any source answered");
                return Err(Error::DeadlineExceeded);
            }
            outcome = rx.recv() => outcome,
        };

        let Some(RaceOutcome { source, result }) = outcome else {
            break;
        };

        match result {
            Ok(value) => {
                info!(%source, "source answered first");
                return Ok(value);
            }
            Err(err) => {
                debug!(%source, error = %err, "source failed");
                last = Some((source, err));
            }
        }
    }

    if scope.is_expired() {
        return Err(Error::DeadlineExceeded);
    }

    match last {
        Some((source_name, last)) => {
            warn!(attempted, source = %source_name, error = %last, "all sources failed");
            Err(Error::AllCandidatesFailed { attempted, source_name, last: Box::new(last) })
        }
        None => Err(Error::NoCandidates),
    }
}
