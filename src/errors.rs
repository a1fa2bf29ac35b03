//! Errors Module
//!
//! Almost nothing in this crate's hot path can fail -- §7 of the design
//! documents a silent-recovery policy (clamp, skip, discard, log) for
//! every condition synthesis itself can run into. The handful of
//! operations that *can* legitimately fail are all cold, host-driven
//! setup calls, and report it through this enum rather than panicking.

use thiserror::Error;

/// Fallible, non-hot-path failures: setting up the processor or
/// registering more channels than the fixed arena allows.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("channel cap exceeded: cannot register more than {max} channels")]
    ChannelCapExceeded { max: usize },

    #[error("invalid block size {size}: must be nonzero and at most {max}")]
    InvalidBlockSize { size: usize, max: usize },
}
