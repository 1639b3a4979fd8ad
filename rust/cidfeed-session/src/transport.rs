use async_trait::async_trait;
use cidfeed_common::{ConditionalSend, ConditionalSync};
use cidfeed_revocation::{FlushOutcome, OfflineRevocationEntry};

/// Flush collaborator: propagates queued revocations beyond this device.
///
/// A reply may confirm some ids, fail others and say nothing about the
/// rest. An `Err` means the transport could not be reached at all and every
/// entry in the batch is treated as failed.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait RevocationFlush: ConditionalSync {
    /// The error type produced by this transport
    type Error: std::fmt::Display + ConditionalSend;

    /// Attempt to propagate `batch`
    async fn flush(&self, batch: &[OfflineRevocationEntry]) -> Result<FlushOutcome, Self::Error>;
}
