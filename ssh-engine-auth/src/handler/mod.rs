//! Server-side authentication handling mechanics (§4.4).

use enumset::EnumSet;
use ssh_engine::{service::Handler, side::Side, Error, Pipe, Result, Session};
use ssh_key::{public::PublicKey, Signature};
use ssh_packet::{
    arch::{Ascii, NameList, Utf8},
    crypto::signature,
    trans::DisconnectReason,
    userauth,
};

mod method;
use method::Method;

pub mod none;
pub mod password;
pub mod publickey;

/// Default for [`Auth::max_attempts`] (§6).
const DEFAULT_MAX_ATTEMPTS: usize = 6;

// TODO: Track attempted methods per-username, since a peer may legitimately
// retry every method once per user.
// TODO: Add `hostbased` method handler.

#[derive(Debug, PartialEq)]
enum Attempt {
    Success,
    Partial,
    Failure,
    Continue,
}

/// The authentication service [`Handler`] for sessions: dispatches
/// incoming `USERAUTH_REQUEST`s by method name to whichever per-method
/// handler was installed, sending `USERAUTH_FAILURE`/`SUCCESS` per
/// §4.4, before handing the session to `handler`.
#[derive(Debug)]
pub struct Auth<H, N = (), P = (), PK = ()> {
    banner: Option<Utf8<'static>>,
    methods: EnumSet<Method>,

    max_attempts: usize,
    attempts: usize,

    handler: H,

    none: N,
    password: P,
    publickey: PK,
}

impl<H> Auth<H>
where
    H: Handler,
{
    /// Creates an [`Auth`] handler, rejecting every authentication method
    /// by default.
    pub fn new(handler: H) -> Self {
        Self {
            banner: Default::default(),
            methods: Method::None.into(), // `none` is always offered, per §4.4.

            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempts: 0,

            handler,

            none: (),
            password: (),
            publickey: (),
        }
    }
}

impl<H, N, P, PK> Auth<H, N, P, PK>
where
    H: Handler,
    N: none::None,
    P: password::Password,
    PK: publickey::Publickey,
{
    /// Sets the authentication banner text displayed before the first
    /// authentication attempt (§4.4). The string should be `\r\n`-terminated.
    pub fn banner(mut self, banner: impl Into<Utf8<'static>>) -> Self {
        self.banner = Some(banner.into());

        self
    }

    /// Sets the maximum number of authentication attempts tolerated
    /// before disconnecting with `NoMoreAuthMethodsAvailable` (§6,
    /// default 6).
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;

        self
    }

    /// Installs the handler for the `none` method.
    pub fn none(self, none: impl none::None) -> Auth<H, impl none::None, P, PK> {
        let Self {
            banner,
            mut methods,
            max_attempts,
            attempts,
            handler,
            none: _,
            password,
            publickey,
        } = self;

        methods |= Method::None;

        Auth {
            banner,
            methods,
            max_attempts,
            attempts,
            handler,
            none,
            password,
            publickey,
        }
    }

    /// Installs the handler for the `password` method.
    pub fn password(self, password: impl password::Password) -> Auth<H, N, impl password::Password, PK> {
        let Self {
            banner,
            mut methods,
            max_attempts,
            attempts,
            handler,
            none,
            password: _,
            publickey,
        } = self;

        methods |= Method::Password;

        Auth {
            banner,
            methods,
            max_attempts,
            attempts,
            handler,
            none,
            password,
            publickey,
        }
    }

    /// Installs the handler for the `publickey` method.
    pub fn publickey(self, publickey: impl publickey::Publickey) -> Auth<H, N, P, impl publickey::Publickey> {
        let Self {
            banner,
            mut methods,
            max_attempts,
            attempts,
            handler,
            none,
            password,
            publickey: _,
        } = self;

        methods |= Method::Publickey;

        Auth {
            banner,
            methods,
            max_attempts,
            attempts,
            handler,
            none,
            password,
            publickey,
        }
    }

    async fn handle_attempt<IO: Pipe, S: Side>(
        &mut self,
        session: &mut Session<IO, S>,
        username: Utf8<'_>,
        method: userauth::Method<'_>,
        service_name: &Ascii<'_>,
    ) -> Result<Attempt> {
        Ok(match method {
            userauth::Method::None => {
                tracing::debug!("attempt using method `none` for user `{username}`");

                match self.none.process(username.into_string()) {
                    none::Response::Accept => Attempt::Success,
                    none::Response::Reject => Attempt::Failure,
                }
            }

            userauth::Method::Publickey {
                algorithm,
                blob,
                signature,
            } => {
                tracing::debug!(
                    "attempt using method `publickey` (signed: {}) for user `{username}`",
                    signature.is_some(),
                );

                let key = PublicKey::from_bytes(&blob);

                match signature {
                    None => {
                        // A bare probe (§4.4): not an actual attempt, so the
                        // method remains available for the real try.
                        self.methods |= Method::Publickey;

                        if key.is_ok() {
                            session.send(&userauth::PkOk { blob, algorithm }).await?;

                            Attempt::Continue
                        } else {
                            Attempt::Failure
                        }
                    }
                    Some(signature) => match key {
                        Ok(key) if key.algorithm().as_str().as_bytes() == algorithm.as_ref() => {
                            let message = signature::Publickey {
                                session_id: session
                                    .session_id()
                                    .expect("authentication attempted before key-exchange")
                                    .into(),
                                username: username.as_borrow(),
                                service_name: service_name.as_borrow(),
                                algorithm,
                                blob,
                            };

                            if message
                                .verify(&key, &Signature::try_from(signature.as_ref())?)
                                .is_ok()
                                && self.publickey.process(username.into_string(), key) == publickey::Response::Accept
                            {
                                Attempt::Success
                            } else {
                                Attempt::Failure
                            }
                        }
                        _ => Attempt::Failure,
                    },
                }
            }

            userauth::Method::Password { password, new } => {
                tracing::debug!(
                    "attempt using method `password` (change: {}) for user `{username}`",
                    new.is_some(),
                );

                match self
                    .password
                    .process(username.into_string(), password.into_string(), new.map(Utf8::into_string))
                {
                    password::Response::Accept => Attempt::Success,
                    password::Response::PasswordExpired { prompt } => {
                        self.methods |= Method::Password;

                        session
                            .send(&userauth::PasswdChangereq {
                                prompt: prompt.into(),
                                ..Default::default()
                            })
                            .await?;

                        Attempt::Continue
                    }
                    password::Response::Reject => Attempt::Failure,
                }
            }

            userauth::Method::Hostbased { .. } => Attempt::Failure,

            userauth::Method::KeyboardInteractive { .. } => Attempt::Failure,
        })
    }
}

impl<H: Handler, N: none::None, P: password::Password, PK: publickey::Publickey> Handler for Auth<H, N, P, PK> {
    type Err = H::Err;
    type Ok<IO: Pipe, S: Side> = H::Ok<IO, S>;

    const SERVICE_NAME: &'static str = crate::SERVICE_NAME;

    async fn on_request<IO, S>(&mut self, mut session: Session<IO, S>) -> Result<Self::Ok<IO, S>, Self::Err>
    where
        IO: Pipe,
        S: Side,
    {
        if let Some(message) = self.banner.take() {
            session
                .send(&userauth::Banner {
                    message,
                    ..Default::default()
                })
                .await?;
        }

        loop {
            if let Ok(userauth::Request {
                username,
                service_name,
                method,
            }) = session.recv().await?.to()
            {
                if self.methods.remove(Method::from(&method)) {
                    match self.handle_attempt(&mut session, username, method, &service_name).await? {
                        Attempt::Success => {
                            break if service_name.as_str() == H::SERVICE_NAME {
                                session.send(&userauth::Success).await?;

                                self.handler.on_request(session).await
                            } else {
                                Err(Error::from(
                                    session
                                        .disconnect(DisconnectReason::ServiceNotAvailable, "requested service is unknown")
                                        .await,
                                )
                                .into())
                            };
                        }
                        attempt @ (Attempt::Failure | Attempt::Partial) => {
                            self.attempts += 1;

                            if self.attempts >= self.max_attempts {
                                break Err(Error::from(
                                    session
                                        .disconnect(
                                            DisconnectReason::NoMoreAuthMethodsAvailable,
                                            "exceeded the maximum number of authentication attempts",
                                        )
                                        .await,
                                )
                                .into());
                            }

                            session
                                .send(&userauth::Failure {
                                    continue_with: NameList::from_iter(self.methods.iter().map(Method::to_ascii)),
                                    partial_success: (attempt == Attempt::Partial).into(),
                                })
                                .await?;
                        }
                        Attempt::Continue => (),
                    }
                } else {
                    session
                        .send(&userauth::Failure {
                            continue_with: NameList::from_iter(self.methods.iter().map(Method::to_ascii)),
                            partial_success: false.into(),
                        })
                        .await?;
                }
            } else {
                break Err(Error::from(
                    session
                        .disconnect(
                            DisconnectReason::ProtocolError,
                            format!("unexpected message in the context of the `{}` service request", Self::SERVICE_NAME),
                        )
                        .await,
                )
                .into());
            }
        }
    }
}
