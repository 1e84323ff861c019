//! Deadline and cancellation for persistence calls.
//!
//! A [`PersistCtx`] travels with every save and load. The work runs inside
//! [`PersistCtx::run`], which races it against the deadline and the cancel
//! signal. Losing the race drops the work future, and with it any open
//! transaction, which rolls the transaction back.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::DbError;

/// Deadline plus optional cancel signal for one persistence call.
#[derive(Debug, Clone)]
pub struct PersistCtx {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl PersistCtx {
    /// A context with no deadline that cannot be cancelled.
    pub const fn background() -> Self {
        Self {
            deadline: None,
            cancel: None,
        }
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancel: None,
        }
    }

    /// Attach a cancel signal. Sending `true` cancels.
    #[must_use]
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// A context with a fresh cancel signal and the sender that fires it.
    pub fn cancellable(timeout: Option<Duration>) -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let base = timeout.map_or_else(Self::background, Self::with_timeout);
        (base.with_cancel(rx), tx)
    }

    /// Fail fast if the context is already cancelled or expired.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cancelled`] or [`DbError::DeadlineExceeded`].
    pub fn check(&self) -> Result<(), DbError> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Err(DbError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(DbError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Run `work` unless the deadline passes or the signal fires first.
    ///
    /// # Errors
    ///
    /// Returns the error of `work`, or [`DbError::Cancelled`] /
    /// [`DbError::DeadlineExceeded`] if the race is lost.
    pub async fn run<T, F>(&self, work: F) -> Result<T, DbError>
    where
        F: Future<Output = Result<T, DbError>>,
    {
        self.check()?;
        let mut cancel = self.cancel.clone();
        tokio::select! {
            result = work => result,
            () = expired(self.deadline) => Err(DbError::DeadlineExceeded),
            () = cancelled(cancel.as_mut()) => Err(DbError::Cancelled),
        }
    }
}

impl Default for PersistCtx {
    fn default() -> Self {
        Self::background()
    }
}

async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn cancelled(cancel: Option<&mut watch::Receiver<bool>>) {
    let Some(rx) = cancel else {
        return std::future::pending().await;
    };
    if rx.wait_for(|c| *c).await.is_err() {
        // Sender gone: never cancels.
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_runs_to_completion() {
        let ctx = PersistCtx::background();
        let result = ctx.run(async { Ok::<_, DbError>(7) }).await;
        assert_eq!(result.ok(), Some(7));
    }

    #[tokio::test]
    async fn fired_signal_fails_fast() {
        let (ctx, tx) = PersistCtx::cancellable(None);
        let _ = tx.send(true);
        assert!(matches!(ctx.check(), Err(DbError::Cancelled)));
        let result = ctx.run(async { Ok::<_, DbError>(()) }).await;
        assert!(matches!(result, Err(DbError::Cancelled)));
    }

    #[tokio::test]
    async fn signal_interrupts_pending_work() {
        let (ctx, tx) = PersistCtx::cancellable(None);
        let work = ctx.run(std::future::pending::<Result<(), DbError>>());
        let fire = async {
            tokio::task::yield_now().await;
            let _ = tx.send(true);
        };
        let (result, ()) = tokio::join!(work, fire);
        assert!(matches!(result, Err(DbError::Cancelled)));
    }

    #[tokio::test]
    async fn deadline_interrupts_slow_work() {
        let ctx = PersistCtx::with_timeout(Duration::from_millis(50));
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, DbError>(())
        };
        assert!(matches!(ctx.run(slow).await, Err(DbError::DeadlineExceeded)));
    }
}
