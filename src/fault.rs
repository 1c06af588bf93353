//! fault.rs
//!
//! Per-task fault boundary. Every session and dispatch task is spawned
//! through here so a panic inside user handler code is observed, logged,
//! and confined to that one task. The listener loop never learns about it.

use std::future::Future;

use crate::trace_error;

// -----------------------------------------------------------------------------
// ----- Public ----------------------------------------------------------------

/// Spawn `fut` on its own task and watch it from a supervisor task. A panic
/// surfaces as `JoinError::is_panic()` on the supervisor side, where it is
/// logged and dropped.
pub(crate) fn spawn_isolated<F>(scope: &'static str, fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let task = tokio::spawn(fut);

    tokio::spawn(async move {
        if let Err(err) = task.await {
            if err.is_panic() {
                trace_error!("[{scope}] recovered fault in task: {err}");
            }
        }
    });
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn panicking_task_does_not_poison_others() {
        let survived = Arc::new(AtomicBool::new(false));
        let flag = survived.clone();

        spawn_isolated("test", async {
            panic!("boom");
        });
        spawn_isolated("test", async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(survived.load(Ordering::SeqCst));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
