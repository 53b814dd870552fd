//! The `publickey` authentication method (§4.4), including the
//! `want-signature=false` probe.

#[doc(no_inline)]
pub use ssh_key::PublicKey;

/// The response to a `publickey` authentication attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Response {
    /// _Accept_ the authentication request.
    Accept,

    /// _Reject_ the authentication request.
    Reject,
}

/// An interface to the `publickey` authentication method.
pub trait Publickey: Send + Sync {
    /// Process the authentication request for `user` with the given `key`.
    ///
    /// This is only called for already-signature-verified requests, never
    /// for a bare probe — see §4.4's `USERAUTH_PK_OK` semantics.
    fn process(&mut self, user: String, key: PublicKey) -> Response;
}

impl<T: FnMut(String, PublicKey) -> Response + Send + Sync> Publickey for T {
    fn process(&mut self, user: String, key: PublicKey) -> Response {
        (self)(user, key)
    }
}

/// The default implementation rejects every request.
impl Publickey for () {
    fn process(&mut self, _: String, _: PublicKey) -> Response {
        Response::Reject
    }
}
