//! Facilities to interact with the SSH _connect_ protocol.

use dashmap::{DashMap, DashSet};
use defer::defer;
use futures::{
    lock::{Mutex, MutexGuard},
    task::{self, AtomicWaker},
    FutureExt, SinkExt, Stream as _, TryStream,
};
use ssh_engine::{side::Side, Packet, Pipe, Session};
use ssh_packet::connect;

mod poller;
use poller::Poller;

mod interest;
pub(crate) use interest::Interest;

pub mod channel_open;
pub mod global_request;

#[doc(no_inline)]
pub use ssh_packet::connect::{ChannelOpenContext, ChannelOpenFailureReason, GlobalRequestContext};

use crate::{channel, Error, Result};

/// A wrapper around a [`Session`] to interact with the connect layer:
/// opens and accepts channels, sends and receives global requests, and
/// dispatches every incoming message to whichever reader registered
/// an [`Interest`] for it.
pub struct Connect<IO, S>
where
    IO: Pipe,
    S: Side,
{
    pub(crate) poller: Mutex<Poller<IO, S>>,
    pub(crate) channels: DashSet<u32>,

    interests: DashMap<Interest, AtomicWaker>,
    buffer: Mutex<Option<Packet>>,
}

impl<IO, S> Connect<IO, S>
where
    IO: Pipe,
    S: Side,
{
    pub(crate) fn new(session: Session<IO, S>) -> Self {
        Self {
            poller: Mutex::new(Poller::from(session)),
            channels: Default::default(),

            interests: Default::default(),
            buffer: Default::default(),
        }
    }

    fn poll_recv(
        &self,
        cx: &mut task::Context,
    ) -> task::Poll<ssh_engine::Result<MutexGuard<'_, Option<Packet>>>> {
        let mut buffer = futures::ready!(self.buffer.lock().poll_unpin(cx));

        if buffer.is_none() {
            let poller = futures::ready!(self.poller.lock().poll_unpin(cx));
            let mut poller = std::pin::Pin::new(poller);

            if let Some(res) = futures::ready!(poller.as_mut().poll_next(cx)) {
                *buffer = Some(res?);
            }
        }

        task::Poll::Ready(Ok(buffer))
    }

    pub(crate) fn poll_take(
        &self,
        cx: &mut task::Context,
        interest: &Interest,
    ) -> task::Poll<Option<ssh_engine::Result<Packet>>> {
        // This is a genuine programming error from us if this happens,
        // which makes sense to panic!() to ensure test failure.
        #[allow(clippy::panic)]
        if let Some(waker) = self.interests.get(interest) {
            waker.register(cx.waker());
        } else {
            panic!("unable to register waker to the `{interest:?}` interest, interest is not yet declared");
        }

        let mut buffer = futures::ready!(self.poll_recv(cx))?;

        match buffer.take() {
            None => {
                self.interests.remove(interest);
                for waker in self.interests.iter() {
                    waker.wake();
                }
                self.interests.clear();

                task::Poll::Ready(None)
            }
            Some(packet) => {
                let packet_interest = Interest::from(&packet);

                if interest == &packet_interest {
                    task::Poll::Ready(Some(Ok(packet)))
                } else {
                    match (&packet_interest, self.interests.get(&packet_interest)) {
                        (_, Some(waker)) => {
                            *buffer = Some(packet);

                            waker.wake();
                            task::Poll::Pending
                        }
                        _ => {
                            tracing::warn!(
                                "dropped {} bytes because no interest was registered for `{packet_interest:?}`",
                                packet.as_bytes().len(),
                            );

                            cx.waker().wake_by_ref();
                            task::Poll::Pending
                        }
                    }
                }
            }
        }
    }

    pub(crate) fn register(&self, interest: Interest) {
        // This is a genuine programming error from the user of the crate,
        // and could cause all sorts of runtime inconsistencies.
        #[allow(clippy::panic)]
        if self
            .interests
            .insert(interest, Default::default())
            .is_some()
        {
            panic!("unable to register multiple concurrent interests for `{interest:?}`");
        }
    }

    pub(crate) fn unregister(&self, interest: &Interest) {
        #[allow(clippy::panic)]
        if self.interests.remove(interest).is_none() {
            panic!("interest `({interest:?})` wasn't already registered");
        }
    }

    /// Unregisters every currently-registered interest matching `pred`,
    /// waking their readers so they observe the end of their stream —
    /// used when a channel closes, to tear down its per-stream-id
    /// `ChannelData` interests in one go.
    pub(crate) fn unregister_if(&self, pred: impl Fn(&Interest) -> bool) {
        self.interests.retain(|interest, waker| {
            if pred(interest) {
                waker.wake();
                false
            } else {
                true
            }
        });
    }

    fn local_id(&self) -> u32 {
        self.channels
            .iter()
            .map(|id| *id)
            .max()
            .map(|id| id + 1)
            .unwrap_or_default()
    }

    /// Make a _global request_ with the provided `context`.
    pub async fn global_request(
        &self,
        context: GlobalRequestContext<'_>,
    ) -> Result<global_request::Outcome> {
        let with_port = matches!(
            context,
            GlobalRequestContext::TcpipForward { bind_port, .. } if bind_port == 0
        );

        let interest = Interest::GlobalResponse;
        self.register(interest);

        self.poller
            .lock()
            .await
            .send(Packet::encode(&connect::GlobalRequest {
                want_reply: true.into(),
                context,
            })?)
            .await?;

        let packet = futures::future::poll_fn(|cx| self.poll_take(cx, &interest))
            .await
            .ok_or(Error::ChannelClosed)??;

        self.unregister(&interest);

        if packet.to::<connect::RequestFailure>().is_ok() {
            Ok(global_request::Outcome::Reject)
        } else if with_port {
            let message = packet.to::<connect::ForwardingSuccess>()?;

            Ok(global_request::Outcome::Accept {
                bound_port: message.bound_port,
            })
        } else if packet.to::<connect::RequestSuccess>().is_ok() {
            Ok(global_request::Outcome::Accept { bound_port: 0 })
        } else {
            Err(ssh_engine::Error::UnexpectedMessage.into())
        }
    }

    /// Iterate over the incoming _global requests_ from the peer.
    pub fn global_requests(
        &self,
    ) -> impl TryStream<Ok = global_request::GlobalRequest<'_, IO, S>, Error = Error> + '_ {
        const INTEREST: Interest = Interest::GlobalRequest;

        self.register(INTEREST);
        let unregister_on_drop = defer(move || self.unregister(&INTEREST));

        futures::stream::poll_fn(move |cx| {
            let _moved = &unregister_on_drop;

            self.poll_take(cx, &INTEREST)
                .map(|opt| {
                    opt.map(|res| {
                        res.map_err(Error::from)
                            .and_then(|packet| Ok(global_request::GlobalRequest::new(self, packet.to()?)))
                    })
                })
        })
    }

    /// Request a new _channel_ with the provided `context`.
    pub async fn channel_open(
        &self,
        context: ChannelOpenContext<'_>,
    ) -> Result<channel::Channel<'_, IO, S>> {
        let local_id = self.local_id();
        let interest = Interest::ChannelOpenResponse(local_id);
        self.register(interest);
        self.channels.insert(local_id);

        self.poller
            .lock()
            .await
            .send(Packet::encode(&connect::ChannelOpen {
                sender_channel: local_id,
                initial_window_size: crate::INITIAL_WINDOW_SIZE,
                maximum_packet_size: crate::MAXIMUM_PACKET_SIZE,
                context,
            })?)
            .await?;

        let packet = futures::future::poll_fn(|cx| self.poll_take(cx, &interest))
            .await
            .ok_or(Error::ChannelClosed)??;

        self.unregister(&interest);

        if let Ok(confirmation) = packet.to::<connect::ChannelOpenConfirmation>() {
            Ok(channel::Channel::new(
                self,
                local_id,
                confirmation.sender_channel,
                confirmation.initial_window_size,
                confirmation.maximum_packet_size,
            ))
        } else if let Ok(failure) = packet.to::<connect::ChannelOpenFailure>() {
            self.channels.remove(&local_id);

            Err(Error::ChannelOpenFailure {
                reason: failure.reason,
                message: failure.description.into_string(),
            })
        } else {
            self.channels.remove(&local_id);

            Err(ssh_engine::Error::UnexpectedMessage.into())
        }
    }

    /// Iterate over the incoming _channel open requests_ from the peer.
    pub fn channel_opens(
        &self,
    ) -> impl TryStream<Ok = channel_open::ChannelOpen<'_, IO, S>, Error = Error> + '_ {
        const INTEREST: Interest = Interest::ChannelOpen;

        self.register(INTEREST);
        let unregister_on_drop = defer(move || self.unregister(&INTEREST));

        futures::stream::poll_fn(move |cx| {
            let _moved = &unregister_on_drop;

            self.poll_take(cx, &INTEREST)
                .map(|opt| {
                    opt.map(|res| {
                        res.map_err(Error::from)
                            .and_then(|packet| Ok(channel_open::ChannelOpen::new(self, packet.to()?)))
                    })
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ssh_engine::side::{Client, Server};

    use async_std::net::TcpStream;

    #[test]
    fn assert_connect_is_send() {
        fn is_send<T: Send>() {}

        is_send::<Connect<TcpStream, Client>>();
        is_send::<Connect<TcpStream, Server>>();
    }

    #[test]
    fn assert_connect_is_sync() {
        fn is_sync<T: Sync>() {}

        is_sync::<Connect<TcpStream, Client>>();
        is_sync::<Connect<TcpStream, Server>>();
    }
}
