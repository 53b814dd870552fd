//! Collection of error handling types and aliases.

use ssh_packet::connect;
use thiserror::Error;

/// The error types that can occur when manipulating this crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// Transport error.
    #[error(transparent)]
    Transport(#[from] ssh_engine::Error),

    /// The peer refused to open the channel.
    #[error("peer refused the opening of the channel: {message} ({reason:?})")]
    ChannelOpenFailure {
        /// The reason for failure.
        reason: connect::ChannelOpenFailureReason,

        /// A textual message to accompany the reason.
        message: String,
    },

    /// The channel has been closed.
    #[error("the channel has been closed")]
    ChannelClosed,
}

/// A handy [`std::result::Result`] type alias bounding the [`enum@Error`] struct as `E`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
