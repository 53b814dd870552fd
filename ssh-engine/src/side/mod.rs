//! Session [`Side`]s, either [`Client`] or [`Server`].

use futures_time::time::Duration;
use ssh_packet::{trans::KexInit, Id};

use crate::{stream::TransportPair, Pipe, Result};

pub mod client;
pub use client::Client;

pub mod server;
pub use server::Server;

mod private {
    pub trait Sealed {}

    impl Sealed for super::Client {}
    impl Sealed for super::Server {}
}

/// A side of the SSH protocol, either [`Client`] or [`Server`], also used
/// as a marker type for directional algorithm negotiation (see
/// [`crate::algorithm::Negociate`]).
pub trait Side: private::Sealed + Send + Sync + Unpin + 'static {
    /// Whether this side plays the client role in the key-exchange
    /// (`v_c`/`v_s` in §8's exchange hash are the client's and server's
    /// identification strings, regardless of who initiates).
    const IS_CLIENT: bool;

    /// The local [`Id`] string sent during the version exchange (§4.2).
    fn id(&self) -> &Id;

    /// The timeout applied to reads and writes on this side.
    fn timeout(&self) -> Duration;

    /// Re-key after this many bytes exchanged on the current keys (§9.3.2).
    fn rekey_bytes_threshold(&self) -> u64;

    /// Re-key after this many packets exchanged on the current keys (§9.3.2).
    fn rekey_packets_threshold(&self) -> u64;

    /// Re-key after this much wall-clock time on the current keys (§9.3.2).
    fn rekey_interval(&self) -> std::time::Duration;

    /// Builds a fresh `SSH_MSG_KEXINIT` from the configured algorithm
    /// preference lists, with a freshly-drawn random cookie.
    fn kexinit(&self) -> KexInit<'static>;

    /// Runs the method-specific part of the key-exchange for this side
    /// once both `KEXINIT`s have been exchanged and negotiated.
    fn exchange(
        &self,
        stream: &mut crate::stream::Stream<impl Pipe>,
        v_c: &Id,
        v_s: &Id,
        clientkex: KexInit<'_>,
        serverkex: KexInit<'_>,
    ) -> impl std::future::Future<Output = Result<TransportPair>> + Send;
}
