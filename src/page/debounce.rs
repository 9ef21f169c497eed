use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delays propagation of a rapidly-changing value by a fixed quiet period.
/// Each update cancels the previous pending emission, so only a value that
/// survived the quiet period untouched reaches the receiver.
pub struct Debouncer<T> {
    delay: Duration,
    tx: mpsc::UnboundedSender<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    #[must_use]
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                tx,
                pending: None,
            },
            rx,
        )
    }

    pub fn update(&mut self, value: T) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        let tx = self.tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(value);
        }));
    }

    /// Drops any pending emission without sending it.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(300);

    #[tokio::test(start_paused = true)]
    async fn test_only_last_value_survives_fast_typing() {
        let (mut debouncer, mut rx) = Debouncer::new(DELAY);

        for text in ["u", "un", "uni", "univ"] {
            debouncer.update(text.to_string());
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        tokio::time::advance(DELAY).await;
        tokio::task::yield_now().await;

        assert_eq!(rx.recv().await.as_deref(), Some("univ"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_updates_all_propagate() {
        let (mut debouncer, mut rx) = Debouncer::new(DELAY);

        debouncer.update("first");
        tokio::time::advance(DELAY + Duration::from_millis(10)).await;
        debouncer.update("second");
        tokio::time::advance(DELAY + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        assert_eq!(rx.recv().await, Some("first"));
        assert_eq!(rx.recv().await, Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_value() {
        let (mut debouncer, mut rx) = Debouncer::new(DELAY);

        debouncer.update("doomed");
        debouncer.cancel();
        tokio::time::advance(DELAY * 2).await;
        tokio::task::yield_now().await;

        assert!(rx.try_recv().is_err());
    }
}
