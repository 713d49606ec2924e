//! Error taxonomy for rendered Rive blocks
//!
//! Every failure here is recovered locally: it becomes the block's inline
//! notice plus a log line. Nothing in this crate panics over a bad block,
//! and no block failure propagates into the host's render loop.

use thiserror::Error;

/// A failure local to one rendered block.
///
/// The `Display` text doubles as the inline notice shown in the block's
/// visible area, so the wording stays user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// The block text never produced a usable `src` value.
    #[error("Missing src (src: path/to/file.riv)")]
    MissingSrc,

    /// The resolved vault path does not exist.
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// The runtime rejected the asset (or the backend module failed to load).
    #[error("Failed to load Rive file: {reason}")]
    Load { reason: String },

    /// No load or load-error callback arrived within the wait window.
    #[error("Load timeout")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_wording_is_stable() {
        assert_eq!(
            BlockError::MissingSrc.to_string(),
            "Missing src (src: path/to/file.riv)"
        );
        assert_eq!(BlockError::Timeout.to_string(), "Load timeout");
        assert_eq!(
            BlockError::Load {
                reason: "bad header".into()
            }
            .to_string(),
            "Failed to load Rive file: bad header"
        );
    }
}
