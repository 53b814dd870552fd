//! Service handling and requesting facilities (§4.1/§10): a service
//! (`ssh-userauth`, `ssh-connection`) is requested or handled over a
//! [`Session`] once version and key-exchange are out of the way.

use futures::Future;

use crate::{side::Side, Pipe, Session};

/// A _service handler_ in the transport protocol: implemented by
/// whatever runs once a peer has requested this service by name
/// (e.g. an `ssh-userauth` server).
pub trait Handler {
    /// The errorneous outcome of the [`Handler`].
    type Err: From<crate::Error>;
    /// The successful outcome of the [`Handler`].
    type Ok<IO: Pipe, S: Side>;

    /// The handled service _identifier_ (§4.1, e.g. `"ssh-userauth"`).
    const SERVICE_NAME: &'static str;

    /// Called once the peer's service request for [`Self::SERVICE_NAME`]
    /// has been accepted.
    fn on_request<IO, S>(
        &mut self,
        session: Session<IO, S>,
    ) -> impl Future<Output = Result<Self::Ok<IO, S>, Self::Err>>
    where
        IO: Pipe,
        S: Side;
}

/// A _service request_ in the transport protocol: implemented by
/// whatever runs once we've requested a service by name and the peer
/// accepted it (e.g. an `ssh-userauth` client).
pub trait Request {
    /// The errorneous outcome of the [`Request`].
    type Err: From<crate::Error>;
    /// The successful outcome of the [`Request`].
    type Ok<IO: Pipe, S: Side>;

    /// The requested service _identifier_ (§4.1, e.g. `"ssh-userauth"`).
    const SERVICE_NAME: &'static str;

    /// Called once the peer has accepted our request for
    /// [`Self::SERVICE_NAME`].
    fn on_accept<IO, S>(
        &mut self,
        session: Session<IO, S>,
    ) -> impl Future<Output = Result<Self::Ok<IO, S>, Self::Err>>
    where
        IO: Pipe,
        S: Side;
}
