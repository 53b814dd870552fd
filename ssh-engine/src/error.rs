//! Collection of error handling types and aliases.

use ssh_packet::trans::DisconnectReason;
use thiserror::Error;

/// The disconnection side for [`DisconnectedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectedBy {
    /// The session has been disconnected by _us_.
    Us,

    /// The session has been disconnected by _them_.
    Them,
}

/// The error type describing a terminated session.
#[must_use]
#[derive(Debug, Error, Clone)]
#[error("the session was disconnected by {by:?} for {reason:?}: {description}")]
pub struct DisconnectedError {
    /// Side that sent the disconnect message.
    pub by: DisconnectedBy,

    /// Reason for disconnect.
    pub reason: DisconnectReason,

    /// Description accompanying the disconnect reason.
    pub description: String,
}

/// The error types that can occur when driving a [`crate::session::Session`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the underlying transport.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Packet (de)serialization error.
    #[error(transparent)]
    Packet(#[from] ssh_packet::Error),

    /// Binary (de)serialization error from the wire codec.
    #[error(transparent)]
    Binary(#[from] ssh_packet::binrw::Error),

    /// SSH key parsing or signing error.
    #[error(transparent)]
    Key(#[from] ssh_key::Error),

    /// Signature verification failed during key-exchange.
    #[error(transparent)]
    Signature(#[from] signature::Error),

    /// Packet integrity (MAC) error.
    #[error("packet authentication failed")]
    Integrity,

    /// A timeout elapsed while waiting on the peer, per the configured
    /// [`side::Side::timeout`](crate::side::Side::timeout).
    #[error("operation timed out")]
    Timeout(#[from] futures_time::future::TimeoutError),

    /// No common key-exchange algorithm between both sides.
    #[error("unable to negotiate a common key-exchange algorithm")]
    NoCommonKex,

    /// No common server host-key algorithm between both sides.
    #[error("unable to negotiate a common host-key algorithm")]
    NoCommonKey,

    /// No common cipher algorithm between both sides.
    #[error("unable to negotiate a common cipher algorithm")]
    NoCommonCipher,

    /// No common MAC algorithm between both sides.
    #[error("unable to negotiate a common MAC algorithm")]
    NoCommonHmac,

    /// No common compression algorithm between both sides.
    #[error("unable to negotiate a common compression algorithm")]
    NoCommonCompression,

    /// The key-exchange protocol itself failed (bad point, bad modulus, short secret...).
    #[error("the key-exchange procedure failed")]
    KexError,

    /// The selected host key did not verify against the exchange hash.
    #[error("host key could not be verified")]
    HostKeyNotVerifiable,

    /// Malformed packet: length, padding or alignment out of the bounds of §4.1.
    #[error("protocol violation: {0}")]
    ProtocolError(&'static str),

    /// A message was received that made no sense in the current session phase.
    #[error("unexpected message for the current session phase")]
    UnexpectedMessage,

    /// The requested/handled service name did not match what the peer offered.
    #[error("unknown or mismatched service: {0}")]
    ServiceMismatch(String),

    /// The session has already been disconnected.
    #[error(transparent)]
    Disconnected(#[from] DisconnectedError),
}

/// A handy [`std::result::Result`] alias bounding the [`enum@Error`] type as `E`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
