//! Client-side authentication request mechanics (§4.4).

use hashbrown::HashSet;

use ssh_engine::{service::Request, side::Side, Error, Packet, Pipe, Result, Session};
use ssh_packet::{
    arch::{self, Utf8},
    crypto::signature,
    trans::DisconnectReason,
    userauth,
};

mod method;
use method::Method;

// TODO: Add `hostbased` authentication.
// TODO: Add `keyboard-interactive` authentication.

#[doc(no_inline)]
pub use ssh_key::PrivateKey;

/// The authentication service [`Request`] for sessions: drives the
/// `none` → `publickey`/`password` attempt sequence described in
/// §4.4, handing the session to `service` once `USERAUTH_SUCCESS`
/// arrives.
#[derive(Debug)]
pub struct Auth<R> {
    username: Utf8<'static>,
    service: R,

    methods: HashSet<Method>,
}

impl<R: Request> Auth<R> {
    /// Creates an [`Auth`] request for the provided _username_, to
    /// access the provided _service_ once authenticated.
    ///
    /// # Note
    /// The request always starts with the `none` method to discover
    /// which methods the server accepts. While `publickey` allows
    /// trying multiple keys, `password` only keeps the last one handed
    /// to [`Self::password`].
    pub fn new(username: impl Into<Utf8<'static>>, service: R) -> Self {
        Self {
            username: username.into(),
            service,

            methods: Default::default(),
        }
    }

    /// Attempts authentication with the `password` method.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.methods.replace(Method::Password {
            password: password.into(),
        });

        self
    }

    /// Attempts authentication with the `publickey` method.
    pub fn publickey(mut self, key: impl Into<PrivateKey>) -> Self {
        self.methods.replace(Method::Publickey {
            key: key.into().into(),
        });

        self
    }

    fn next_method(&mut self, continue_with: &arch::NameList) -> Option<Method> {
        self.methods
            .extract_if(|m| continue_with.into_iter().any(|method| m.as_ref() == method))
            .next()
    }

    async fn attempt_method<IO: Pipe, S: Side>(
        &mut self,
        session: &mut Session<IO, S>,
        method: &Method,
    ) -> Result<Packet> {
        let build = |method| userauth::Request {
            username: self.username.clone(),
            service_name: R::SERVICE_NAME.into(),
            method,
        };

        match method {
            Method::None => {
                session.send(&build(userauth::Method::None)).await?;

                session.recv().await
            }
            Method::Publickey { key } => {
                let algorithm = key.algorithm();

                // Probe the server first to check the algorithm is acceptable
                // before actually signing anything with it (§4.4's
                // `want-signature=false` probe).
                session
                    .send(&build(userauth::Method::Publickey {
                        algorithm: algorithm.as_str().as_bytes().into(),
                        blob: key.public_key().to_bytes()?.into(),
                        signature: None,
                    }))
                    .await?;

                let response = session.recv().await?;
                if let Ok(userauth::PkOk { algorithm, blob }) = response.to() {
                    let signature = signature::Publickey {
                        session_id: session
                            .session_id()
                            .expect("authentication attempted before key-exchange")
                            .into(),
                        username: self.username.as_borrow(),
                        service_name: R::SERVICE_NAME.into(),
                        algorithm: algorithm.as_borrow(),
                        blob: blob.as_borrow(),
                    }
                    .sign(key.as_ref());

                    session
                        .send(&build(userauth::Method::Publickey {
                            algorithm,
                            blob,
                            signature: Some(signature.as_bytes().into()),
                        }))
                        .await?;

                    session.recv().await
                } else {
                    Ok(response)
                }
            }
            Method::Password { password } => {
                session
                    .send(&build(userauth::Method::Password {
                        password: password.as_str().into(),
                        new: None,
                    }))
                    .await?;

                session.recv().await
            }
        }
    }
}

impl<R: Request> Request for Auth<R> {
    type Err = R::Err;
    type Ok<IO: Pipe, S: Side> = R::Ok<IO, S>;

    const SERVICE_NAME: &'static str = crate::SERVICE_NAME;

    async fn on_accept<IO, S>(
        &mut self,
        mut session: Session<IO, S>,
    ) -> Result<Self::Ok<IO, S>, Self::Err>
    where
        IO: Pipe,
        S: Side,
    {
        let mut method = Method::None;

        loop {
            let response = self.attempt_method(&mut session, &method).await?;

            if response.to::<userauth::Success>().is_ok() {
                break self.service.on_accept(session).await;
            } else if let Ok(userauth::Failure { continue_with, .. }) = response.to() {
                // §4.4: on partial success we simply keep going — the
                // peer tells us with `continue_with` which methods are
                // still acceptable either way.
                if let Some(next) = self.next_method(&continue_with) {
                    method = next;
                } else {
                    break Err(Error::from(
                        session
                            .disconnect(
                                DisconnectReason::NoMoreAuthMethodsAvailable,
                                "exhausted available authentication methods",
                            )
                            .await,
                    )
                    .into());
                }
            } else if response.to::<userauth::PasswdChangereq>().is_ok() {
                // §4.4 supplement: we never proactively send a new password,
                // so a change request is treated like a rejection of the
                // current one.
                break Err(Error::from(
                    session
                        .disconnect(
                            DisconnectReason::AuthCancelledByUser,
                            "server requested a password change, which this client cannot satisfy",
                        )
                        .await,
                )
                .into());
            } else {
                break Err(Error::from(
                    session
                        .disconnect(
                            DisconnectReason::ProtocolError,
                            format!(
                                "unexpected message in the context of the `{}` service request",
                                Self::SERVICE_NAME
                            ),
                        )
                        .await,
                )
                .into());
            }
        }
    }
}
