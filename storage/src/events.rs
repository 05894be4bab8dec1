//! Change-notification publishers.
//!
//! The registry emits one [`ConfigChangeEvent`] per successful mutation;
//! these implementations carry it to in-process subscribers. Actual bus
//! transport lives outside this repository.

use async_trait::async_trait;
use cr_core::traits::ConfigChangeNotifier;
use cr_core::types::ConfigChangeEvent;
use errors::NotifyError;
use std::sync::Arc;
use tracing::info;

/// Logs each change event; the default sink when nothing subscribes.
#[derive(Default)]
pub struct TracingChangeNotifier;

#[async_trait]
impl ConfigChangeNotifier for TracingChangeNotifier {
    async fn notify(&self, event: ConfigChangeEvent) -> Result<(), NotifyError> {
        info!(
            family = %event.family,
            schema_version = %event.schema_version,
            iteration_number = event.iteration_number,
            "configuration changed"
        );
        Ok(())
    }
}

/// Delivers change events to an in-process subscriber over a tokio channel.
pub struct ChannelNotifier {
    tx: tokio::sync::mpsc::Sender<ConfigChangeEvent>,
}

impl ChannelNotifier {
    /// Create a notifier plus the receiving end for the subscriber.
    pub fn channel(capacity: usize) -> (Self, tokio::sync::mpsc::Receiver<ConfigChangeEvent>) {
        let (tx, rx) = tokio::sync::mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ConfigChangeNotifier for ChannelNotifier {
    async fn notify(&self, event: ConfigChangeEvent) -> Result<(), NotifyError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| NotifyError::ChannelClosed)
    }
}

/// Fans one event out to several notifiers, stopping at the first failure.
pub struct MultiNotifier {
    notifiers: Vec<Arc<dyn ConfigChangeNotifier>>,
}

impl MultiNotifier {
    pub fn new(notifiers: Vec<Arc<dyn ConfigChangeNotifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl ConfigChangeNotifier for MultiNotifier {
    async fn notify(&self, event: ConfigChangeEvent) -> Result<(), NotifyError> {
        for notifier in &self.notifiers {
            notifier.notify(event.clone()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_core::types::FamilyKey;

    fn event() -> ConfigChangeEvent {
        ConfigChangeEvent {
            family: FamilyKey::global("dev"),
            schema_version: "1.0.0".to_string(),
            iteration_number: 1,
        }
    }

    #[tokio::test]
    async fn test_channel_notifier_delivers() {
        let (notifier, mut rx) = ChannelNotifier::channel(8);
        notifier.notify(event()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.iteration_number, 1);
        assert_eq!(received.family, FamilyKey::global("DEV"));
    }

    #[tokio::test]
    async fn test_channel_notifier_reports_closed_channel() {
        let (notifier, rx) = ChannelNotifier::channel(8);
        drop(rx);

        let err = notifier.notify(event()).await.unwrap_err();
        assert!(matches!(err, NotifyError::ChannelClosed));
    }

    #[tokio::test]
    async fn test_multi_notifier_fans_out() {
        let (a, mut rx_a) = ChannelNotifier::channel(8);
        let (b, mut rx_b) = ChannelNotifier::channel(8);
        let multi = MultiNotifier::new(vec![Arc::new(a), Arc::new(b)]);

        multi.notify(event()).await.unwrap();
        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
    }
}
