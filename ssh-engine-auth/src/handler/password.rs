//! The `password` authentication method (§4.4), including the
//! server-initiated "change password" flow.

/// The response to a `password` authentication attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Response {
    /// _Accept_ the authentication request.
    Accept,

    /// _Partially accept_ the request, asking the client for a new
    /// password before authentication can complete.
    PasswordExpired {
        /// The prompt displayed to the user ahead of the password change.
        prompt: String,
    },

    /// _Reject_ the authentication request.
    Reject,
}

/// An interface to the `password` authentication method.
pub trait Password: Send + Sync {
    /// Process the authentication request for `user`: `password` is the
    /// current (or proposed, if `new` is set) password, `new` is set
    /// when the client is responding to a previous [`Response::PasswordExpired`].
    fn process(&mut self, user: String, password: String, new: Option<String>) -> Response;
}

impl<T: FnMut(String, String, Option<String>) -> Response + Send + Sync> Password for T {
    fn process(&mut self, user: String, password: String, new: Option<String>) -> Response {
        (self)(user, password, new)
    }
}

/// The default implementation rejects every request.
impl Password for () {
    fn process(&mut self, _: String, _: String, _: Option<String>) -> Response {
        Response::Reject
    }
}
