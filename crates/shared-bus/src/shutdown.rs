//! Cooperative shutdown token backed by a `tokio::sync::watch` channel.

use tokio::sync::watch;

/// Sending half. Dropping it also counts as a shutdown request.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Ask every linked [`ShutdownSignal`] to stop.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// A new signal linked to this trigger.
    #[must_use]
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving half, cheap to clone into every worker task.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Linked trigger/signal pair.
    #[must_use]
    pub fn channel() -> (ShutdownTrigger, Self) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Self { rx })
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested (immediately if it already was).
    pub async fn wait(&mut self) {
        // Err means the trigger was dropped, which is also a stop request.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_wakes_waiters() {
        let (trigger, mut signal) = ShutdownSignal::channel();
        let mut second = signal.clone();
        assert!(!signal.is_triggered());

        let waiter = tokio::spawn(async move { second.wait().await });
        trigger.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        signal.wait().await;
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn test_dropped_trigger_releases_wait() {
        let (trigger, mut signal) = ShutdownSignal::channel();
        drop(trigger);
        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .unwrap();
    }
}
