// Player API readiness signal
//
// The embeddable player's script loads once per process and announces itself
// once, so the host keeps a single instance and hands it to every controller.
// The first waiter triggers the load; everyone (before or after) is released
// when the host calls `resolve`, which takes effect exactly once.

use std::sync::Mutex;
use tokio::sync::oneshot;

enum ReadyState {
    Idle,
    Loading(Vec<oneshot::Sender<()>>),
    Ready,
}

pub struct ApiReadiness {
    state: Mutex<ReadyState>,
}

impl Default for ApiReadiness {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiReadiness {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReadyState::Idle),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.lock(), ReadyState::Ready)
    }

    /// Wait until the API is ready. `load` runs only for the very first waiter.
    pub async fn wait<F: FnOnce()>(&self, load: F) {
        let (tx, rx) = oneshot::channel();
        let first = {
            let mut state = self.lock();
            let first = matches!(*state, ReadyState::Idle);
            if first {
                *state = ReadyState::Loading(Vec::new());
            }
            match &mut *state {
                ReadyState::Loading(waiters) => waiters.push(tx),
                ReadyState::Idle | ReadyState::Ready => return,
            }
            first
        };

        if first {
            load();
        }

        // A dropped sender only happens if the signal is torn down with us
        let _ = rx.await;
    }

    /// Mark the API ready and release every queued waiter. Later calls are ignored.
    pub fn resolve(&self) {
        let previous = std::mem::replace(&mut *self.lock(), ReadyState::Ready);
        match previous {
            ReadyState::Loading(waiters) => {
                tracing::debug!("Player API ready, releasing {} waiter(s)", waiters.len());
                for tx in waiters {
                    let _ = tx.send(());
                }
            }
            ReadyState::Idle | ReadyState::Ready => {}
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReadyState> {
        // A poisoned lock still holds a consistent state value
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_waiter_triggers_load_once() {
        let ready = Arc::new(ApiReadiness::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let mut waiters = Vec::new();
        for _ in 0..3 {
            let ready = ready.clone();
            let loads = loads.clone();
            waiters.push(tokio::spawn(async move {
                ready
                    .wait(|| {
                        loads.fetch_add(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }

        while loads.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;
        assert!(!ready.is_ready());

        ready.resolve();
        for w in waiters {
            w.await.unwrap();
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(ready.is_ready());
    }

    #[tokio::test]
    async fn test_wait_after_ready_returns_immediately() {
        let ready = ApiReadiness::new();
        ready.resolve();
        let mut loaded = false;
        ready.wait(|| loaded = true).await;
        assert!(!loaded);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let ready = ApiReadiness::new();
        ready.resolve();
        ready.resolve();
        assert!(ready.is_ready());
    }
}
