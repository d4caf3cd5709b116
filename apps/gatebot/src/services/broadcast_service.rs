use async_trait::async_trait;

/// Delivers one already-chosen message to a recipient.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward_to(&self, recipient: i64) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Best-effort fan-out. One recipient failing never stops the rest, and
/// only the counts are reported back.
pub async fn broadcast<F>(recipients: &[i64], forwarder: &F) -> BroadcastReport
where
    F: Forwarder + ?Sized,
{
    let mut report = BroadcastReport::default();
    for &recipient in recipients {
        match forwarder.forward_to(recipient).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                tracing::debug!("Broadcast to {} failed: {}", recipient, e);
            }
        }
    }
    tracing::info!(
        "Broadcast finished: {} delivered, {} failed",
        report.delivered,
        report.failed
    );
    report
}
