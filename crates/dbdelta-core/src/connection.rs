//! Cancellation of in-flight reads

/// Handle for cancelling reads on a connection from any thread.
///
/// Drivers hand these out so a caller can stop a comparison by closing the
/// underlying cursors. Once cancelled, running and subsequent reads on the
/// connection fail with `DeltaError::Cancelled` instead of returning partial
/// results. Calling `cancel` more than once is a no-op.
pub trait CancelHandle: Send + Sync {
    /// Cancel the associated connection.
    fn cancel(&self);

    /// Whether `cancel` has been called.
    fn is_cancelled(&self) -> bool;
}
