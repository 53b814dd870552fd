//! The [`Session`] type: version exchange, key-exchange orchestration, and
//! the `SSH-TRANS` layer housekeeping messages (§4.2/§4.3/§9.3).

use std::time::Instant;

use ssh_packet::{
    arch::Utf8,
    trans::{Debug, Disconnect, DisconnectReason, Ignore, KexInit, ServiceAccept, ServiceRequest, Unimplemented},
    Id,
};

use crate::{
    error::{DisconnectedBy, DisconnectedError},
    service,
    side::Side,
    stream::{Packet, Pipe, Stream},
    Error, Result,
};

/// A running session's stream state: either still active, or already
/// disconnected — once disconnected every further call just replays the
/// same [`DisconnectedError`] (§9.2).
enum State<IO: Pipe> {
    Active(Stream<IO>),
    Disconnected(DisconnectedError),
}

/// A session wrapping a duplex [`Pipe`] to handle version exchange,
/// key-exchange (§7/§8) and the `SSH-TRANS` layer messages (§4.3),
/// transparently from whatever service (`ssh-userauth`, `ssh-connection`)
/// is layered on top.
pub struct Session<IO: Pipe, S: Side> {
    state: State<IO>,
    config: S,

    peer_id: Id,
    last_rekey: Instant,
}

impl<IO, S> Session<IO, S>
where
    IO: Pipe,
    S: Side,
{
    /// Exchanges identification strings with the peer and runs the
    /// initial, mandatory key-exchange (§4.2/§7).
    pub async fn new(io: IO, config: S) -> Result<Self> {
        let mut stream = Stream::new(io, config.timeout());
        let peer_id = stream.exchange_ids(config.id()).await?;

        tracing::debug!("session started with peer `{peer_id}`");

        let mut session = Self {
            state: State::Active(stream),
            config,
            peer_id,
            last_rekey: Instant::now(),
        };

        session.kex(None).await?;

        Ok(session)
    }

    /// Access the [`Id`] of the connected peer.
    pub fn peer_id(&self) -> &Id {
        &self.peer_id
    }

    /// Access the immutable session identifier, fixed at the very first
    /// key-exchange and unchanged across every subsequent re-key (§7.2).
    pub fn session_id(&self) -> Option<&[u8]> {
        match &self.state {
            State::Active(stream) => stream.session_id(),
            State::Disconnected(_) => None,
        }
    }

    fn stream(&mut self) -> Result<&mut Stream<IO>> {
        match &mut self.state {
            State::Active(stream) => Ok(stream),
            State::Disconnected(err) => Err(err.clone().into()),
        }
    }

    /// Whether a re-key should run before the next message, either
    /// because the current keys have seen enough traffic or enough
    /// wall-clock time has elapsed (§9.3.2).
    fn rekey_due(&self) -> bool {
        let stream = match &self.state {
            State::Active(stream) => stream,
            State::Disconnected(_) => return false,
        };

        let (bytes, packets) = stream.rekey_progress();

        bytes >= self.config.rekey_bytes_threshold()
            || packets >= self.config.rekey_packets_threshold()
            || self.last_rekey.elapsed() >= self.config.rekey_interval()
    }

    /// Runs a key-exchange to completion: sends our `KEXINIT`, then
    /// either consumes `theirs` (already received, e.g. because it came
    /// in ahead of the ordinary message it preceded) or reads it off the
    /// wire, negotiates, runs the method-specific exchange, and installs
    /// the resulting [`crate::stream::TransportPair`].
    async fn kex(&mut self, theirs: Option<KexInit<'static>>) -> Result<()> {
        let ours = self.config.kexinit();

        {
            let stream = self.stream()?;
            stream.send(&ours).await?;
        }

        let theirs = match theirs {
            Some(theirs) => theirs,
            None => loop {
                let packet = self.stream()?.recv().await?;

                match packet.to::<KexInit>() {
                    Ok(theirs) => break theirs,
                    Err(_) => return Err(Error::UnexpectedMessage),
                }
            },
        };

        let own_id = self.config.id().clone();
        let (v_c, v_s) = if S::IS_CLIENT {
            (&own_id, &self.peer_id)
        } else {
            (&self.peer_id, &own_id)
        };
        let (clientkex, serverkex) = if S::IS_CLIENT { (ours, theirs) } else { (theirs, ours) };

        let stream = self.stream()?;
        let transport = self.config.exchange(stream, v_c, v_s, clientkex, serverkex).await?;
        stream.rekey(transport);

        self.last_rekey = Instant::now();

        Ok(())
    }

    /// Waits until the session becomes readable — to be used with
    /// [`Session::recv`] under a [`futures::select`], since `recv` is
    /// **not cancel-safe**.
    pub async fn readable(&mut self) -> Result<()> {
        // There is no internal read buffer to pre-fill; a readable
        // session is simply one that still has an active stream.
        self.stream()?;
        Ok(())
    }

    /// Receives a packet from the connected peer, transparently running
    /// a re-key (whether peer-initiated or due on our side) and handling
    /// `IGNORE`/`DEBUG`/`UNIMPLEMENTED`/`DISCONNECT` inline (§11).
    ///
    /// # Cancel safety
    /// Not cancel-safe: if used within [`futures::select`], data may be
    /// partially received.
    pub async fn recv(&mut self) -> Result<Packet> {
        loop {
            if self.rekey_due() {
                self.kex(None).await?;
            }

            let packet = self.stream()?.recv().await?;

            if let Ok(kexinit) = packet.to::<KexInit>() {
                self.kex(Some(kexinit)).await?;
                continue;
            }

            if let Ok(Disconnect { reason, description, .. }) = packet.to::<Disconnect>() {
                tracing::warn!("peer disconnected with `{reason:?}`: {}", &*description);

                let err = DisconnectedError {
                    by: DisconnectedBy::Them,
                    reason,
                    description: description.to_string(),
                };
                self.state = State::Disconnected(err.clone());

                return Err(err.into());
            } else if let Ok(Ignore { data }) = packet.to::<Ignore>() {
                tracing::debug!("received an 'ignore' message with length {}", data.len());
            } else if let Ok(Unimplemented { seq }) = packet.to::<Unimplemented>() {
                tracing::debug!("received an 'unimplemented' message about packet #{seq}");
            } else if let Ok(Debug { message, .. }) = packet.to::<Debug>() {
                tracing::debug!("received a 'debug' message: {}", &*message);
            } else {
                break Ok(packet);
            }
        }
    }

    /// Sends a message to the connected peer, running a due re-key first.
    pub async fn send<'a, T>(&mut self, message: &T) -> Result<()>
    where
        T: ssh_packet::binrw::BinWrite<Args<'a> = ()>,
    {
        if self.rekey_due() {
            self.kex(None).await?;
        }

        self.stream()?.send(message).await
    }

    /// Sends an already-encoded [`Packet`], running a due re-key first —
    /// used by higher layers that queue heterogeneous message types
    /// (e.g. the connection multiplexer) ahead of writing them.
    pub async fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        if self.rekey_due() {
            self.kex(None).await?;
        }

        self.stream()?.send_raw(packet.as_bytes()).await
    }

    /// Sends an `SSH_MSG_IGNORE`, e.g. as randomized traffic padding or a
    /// keepalive (§11.2 supplement).
    pub async fn ignore(&mut self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.send(&Ignore { data: data.into().into() }).await
    }

    /// Sends an `SSH_MSG_DEBUG` message (§11.3 supplement).
    pub async fn debug(&mut self, always_display: bool, message: impl Into<String>) -> Result<()> {
        self.send(&Debug {
            always_display: always_display.into(),
            message: message.into().into(),
            language: Default::default(),
        })
        .await
    }

    /// Sends a disconnect message to the peer and marks the session as
    /// terminated (§11.1).
    pub async fn disconnect(
        &mut self,
        reason: DisconnectReason,
        description: impl Into<Utf8<'static>>,
    ) -> DisconnectedError {
        let stream = match &mut self.state {
            State::Active(stream) => stream,
            State::Disconnected(err) => return err.clone(),
        };

        let message = Disconnect {
            reason,
            description: description.into(),
            language: Default::default(),
        };

        let err = DisconnectedError {
            by: DisconnectedBy::Us,
            reason: message.reason,
            description: message.description.to_string(),
        };

        if let Err(send_err) = stream.send(&message).await {
            tracing::debug!("failed to send disconnect message: {send_err}");
        }

        self.state = State::Disconnected(err.clone());

        err
    }

    /// Handles a _service_ requested by the peer.
    pub async fn handle<H>(mut self, mut service: H) -> Result<H::Ok<IO, S>, H::Err>
    where
        H: service::Handler,
    {
        let packet = self.recv().await?;

        if let Ok(ServiceRequest { service_name }) = packet.to::<ServiceRequest>() {
            if &*service_name == H::SERVICE_NAME.as_bytes() {
                self.send(&ServiceAccept { service_name }).await?;

                service.on_request(self).await
            } else {
                Err(Error::from(
                    self.disconnect(DisconnectReason::ServiceNotAvailable, "requested service is unknown")
                        .await,
                )
                .into())
            }
        } else {
            Err(Error::from(
                self.disconnect(DisconnectReason::ProtocolError, "expected a service request")
                    .await,
            )
            .into())
        }
    }

    /// Requests a _service_ from the peer.
    pub async fn request<R>(mut self, mut service: R) -> Result<R::Ok<IO, S>, R::Err>
    where
        R: service::Request,
    {
        self.send(&ServiceRequest {
            service_name: R::SERVICE_NAME.into(),
        })
        .await?;

        let packet = self.recv().await?;
        if let Ok(ServiceAccept { service_name }) = packet.to::<ServiceAccept>() {
            if &*service_name == R::SERVICE_NAME.as_bytes() {
                service.on_accept(self).await
            } else {
                Err(Error::from(
                    self.disconnect(DisconnectReason::ServiceNotAvailable, "accepted service is unknown")
                        .await,
                )
                .into())
            }
        } else {
            Err(Error::from(
                self.disconnect(DisconnectReason::ProtocolError, "expected a service response")
                    .await,
            )
            .into())
        }
    }
}

impl<IO, S> Drop for Session<IO, S>
where
    IO: Pipe,
    S: Side,
{
    fn drop(&mut self) {
        if matches!(self.state, State::Disconnected(_)) {
            return;
        }

        let err = futures::executor::block_on(
            self.disconnect(DisconnectReason::ByApplication, "user closed the session"),
        );

        tracing::debug!("session closed with peer `{}`: {err}", self.peer_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::side::{Client, Server};

    use async_std::net::TcpStream;

    #[test]
    fn assert_session_is_send() {
        fn is_send<T: Send>() {}

        is_send::<Session<TcpStream, Client>>();
        is_send::<Session<TcpStream, Server>>();
    }
}
