/// Errors returned when a table or directory rejects a construction or resize
/// argument.
///
/// A missing key is never an error: lookups and removals report absence with
/// `Option`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A bucket array of zero slots was requested.
    #[error("bucket capacity must be greater than zero")]
    ZeroCapacity,
    /// The load factor was zero, negative, NaN or infinite.
    #[error("load factor must be a positive finite number, got {0}")]
    InvalidLoadFactor(f32),
    /// Reserving memory for a new bucket array failed.
    #[error("failed to allocate a bucket array of {slots} slots")]
    AllocationFailed {
        /// Number of bucket slots requested.
        slots: usize,
    },
}
