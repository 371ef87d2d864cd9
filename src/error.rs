use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, Error>;

/// Everything that can go wrong inside the core.
///
/// `Invariant` means the caller broke a structural precondition and should be
/// treated as a bug, not retried. `Bounds` is recoverable: expand the node and
/// try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A structural precondition was violated by the caller.
    #[error("invariant violation: {0}")]
    Invariant(&'static str),

    /// The target cell lies outside the node.
    #[error("({x}, {y}) is out of bounds for a level {level} node")]
    Bounds { x: i64, y: i64, level: u8 },

    /// Node id space or the supported level range is exhausted.
    #[error("node pool capacity exhausted")]
    Capacity,
}
