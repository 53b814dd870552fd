//! Definition of the [`Channel`] struct that provides isolated I/O on SSH channels.

use core::task;
use std::num::NonZeroU32;

use defer::defer;
use futures::{AsyncRead, AsyncWrite, SinkExt, TryStream};
use ssh_engine::{side::Side, Packet, Pipe};
use ssh_packet::connect;

use crate::{
    connect::{Connect, Interest},
    Error, Result,
};

#[doc(no_inline)]
pub use connect::ChannelRequestContext;

mod io;

mod window;
pub(crate) use window::{LocalWindow, RemoteWindow};

pub mod request;

/// A reference to an opened channel in the session, either one we
/// requested via [`Connect::channel_open`] or one accepted from the
/// peer via [`crate::connect::channel_open::ChannelOpen::accept`].
pub struct Channel<'a, IO: Pipe, S: Side> {
    connect: &'a Connect<IO, S>,

    local_id: u32,
    local_window: LocalWindow,

    remote_id: u32,
    remote_window: RemoteWindow,
    remote_maxpack: u32,
}

impl<'a, IO: Pipe, S: Side> Channel<'a, IO, S> {
    pub(crate) fn new(
        connect: &'a Connect<IO, S>,
        local_id: u32,
        remote_id: u32,
        remote_window: u32,
        remote_maxpack: u32,
    ) -> Self {
        connect.register(Interest::ChannelClose(local_id));
        connect.register(Interest::ChannelEof(local_id));
        connect.register(Interest::ChannelWindowAdjust(local_id));

        Self {
            connect,

            local_id,
            local_window: Default::default(),

            remote_id,
            remote_window: RemoteWindow::from(remote_window),
            remote_maxpack,
        }
    }

    /// The local channel identifier, as sent to the peer in `CHANNEL_OPEN`/`CHANNEL_OPEN_CONFIRMATION`.
    pub fn local_id(&self) -> u32 {
        self.local_id
    }

    /// The peer's channel identifier, used as `recipient_channel` in messages we send.
    pub fn remote_id(&self) -> u32 {
        self.remote_id
    }

    fn unregister(&self) {
        self.connect
            .unregister(&Interest::ChannelWindowAdjust(self.local_id));
        self.connect.unregister(&Interest::ChannelEof(self.local_id));
        self.connect
            .unregister(&Interest::ChannelClose(self.local_id));
    }

    fn poll_take(
        &self,
        cx: &mut task::Context,
        interest: &Interest,
    ) -> task::Poll<Option<ssh_engine::Result<Packet>>> {
        if let task::Poll::Ready(Some(result)) = self
            .connect
            .poll_take(cx, &Interest::ChannelClose(self.local_id))
        {
            result?;

            self.connect.unregister_if(
                |interest| matches!(interest, Interest::ChannelData(id, _) if id == &self.local_id),
            );
            self.unregister();

            tracing::debug!(
                "peer closed channel {}:{}, unregistered all streams and interests",
                self.local_id,
                self.remote_id
            );

            self.poll_take(cx, interest)
        } else if let task::Poll::Ready(Some(result)) = self
            .connect
            .poll_take(cx, &Interest::ChannelEof(self.local_id))
        {
            result?;

            self.connect.unregister_if(
                |interest| matches!(interest, Interest::ChannelData(id, _) if id == &self.local_id),
            );

            tracing::debug!(
                "peer sent an EOF for channel {}:{}, unregistered all streams",
                self.local_id,
                self.remote_id
            );

            self.poll_take(cx, interest)
        } else if let task::Poll::Ready(Some(result)) = self
            .connect
            .poll_take(cx, &Interest::ChannelWindowAdjust(self.local_id))
        {
            let bytes = result?.to::<connect::ChannelWindowAdjust>()?.bytes_to_add;
            self.remote_window.replenish(bytes);

            tracing::debug!(
                "peer added `{bytes}` bytes for channel {}:{}",
                self.local_id,
                self.remote_id
            );

            self.poll_take(cx, interest)
        } else {
            self.connect.poll_take(cx, interest)
        }
    }

    /// Iterate over the incoming _channel requests_.
    pub fn requests(&self) -> impl TryStream<Ok = request::Request<'_, IO, S>, Error = Error> + '_ {
        let interest = Interest::ChannelRequest(self.local_id);

        self.connect.register(interest);
        let unregister_on_drop = defer(move || self.connect.unregister(&interest));

        futures::stream::poll_fn(move |cx| {
            let _moved = &unregister_on_drop;

            self.poll_take(cx, &interest).map(|opt| {
                opt.map(|res| {
                    res.map_err(Error::from)
                        .and_then(|packet| Ok(request::Request::new(self, packet.to()?)))
                })
            })
        })
    }

    /// Send a _channel request_, not waiting for a response.
    pub async fn request(&self, context: ChannelRequestContext<'_>) -> Result<()> {
        self.connect
            .poller
            .lock()
            .await
            .send(Packet::encode(&connect::ChannelRequest {
                recipient_channel: self.remote_id,
                want_reply: false.into(),
                context,
            })?)
            .await?;

        Ok(())
    }

    /// Send a _channel request_, and wait for its response.
    pub async fn request_wait(&self, context: ChannelRequestContext<'_>) -> Result<request::Response> {
        let interest = Interest::ChannelResponse(self.local_id);
        self.connect.register(interest);

        self.connect
            .poller
            .lock()
            .await
            .send(Packet::encode(&connect::ChannelRequest {
                recipient_channel: self.remote_id,
                want_reply: true.into(),
                context,
            })?)
            .await?;

        let response = futures::future::poll_fn(|cx| {
            let polled = futures::ready!(self.poll_take(cx, &interest));
            let response = polled.map(|result| match result {
                Ok(packet) => {
                    if packet.to::<connect::ChannelSuccess>().is_ok() {
                        Ok(request::Response::Success)
                    } else if packet.to::<connect::ChannelFailure>().is_ok() {
                        Ok(request::Response::Failure)
                    } else {
                        Err(ssh_engine::Error::UnexpectedMessage.into())
                    }
                }
                Err(err) => Err(Error::from(err)),
            });

            task::Poll::Ready(response)
        })
        .await
        .ok_or(Error::ChannelClosed);

        self.connect.unregister(&interest);

        response?
    }

    /// Make a reader for the current channel's _data_ stream.
    #[must_use]
    pub fn as_reader(&self) -> impl AsyncRead + '_ {
        io::Read::new(self, None)
    }

    /// Make a reader for the current channel's _extended data_ stream
    /// (e.g. `stderr`, `data_type == 1`).
    #[must_use]
    pub fn as_reader_ext(&self, ext: NonZeroU32) -> impl AsyncRead + '_ {
        io::Read::new(self, Some(ext))
    }

    /// Make a writer for the current channel's _data_ stream.
    ///
    /// ## Note:
    /// The writer does not flush on [`Drop`], the caller is responsible
    /// for calling [`futures::AsyncWriteExt::flush`] before dropping.
    #[must_use]
    pub fn as_writer(&self) -> impl AsyncWrite + '_ {
        io::Write::new(self, None)
    }

    /// Make a writer for the current channel's _extended data_ stream.
    ///
    /// ## Note:
    /// The writer does not flush on [`Drop`], the caller is responsible
    /// for calling [`futures::AsyncWriteExt::flush`] before dropping.
    #[must_use]
    pub fn as_writer_ext(&self, ext: NonZeroU32) -> impl AsyncWrite + '_ {
        io::Write::new(self, Some(ext))
    }

    /// Signal to the peer we won't send any more data in the current channel.
    pub async fn eof(&self) -> Result<()> {
        self.connect
            .poller
            .lock()
            .await
            .send(Packet::encode(&connect::ChannelEof {
                recipient_channel: self.remote_id,
            })?)
            .await
            .map_err(|_| Error::ChannelClosed)
    }
}

impl<'a, IO: Pipe, S: Side> Drop for Channel<'a, IO, S> {
    fn drop(&mut self) {
        self.unregister();
        self.connect.channels.remove(&self.local_id);

        let message = Packet::encode(&connect::ChannelClose {
            recipient_channel: self.remote_id,
        });

        if let Ok(message) = message {
            if let Some(mut poller) = self.connect.poller.try_lock() {
                let _ = futures::executor::block_on(poller.send(message));
            }
        }

        tracing::debug!("closed channel {}:{}", self.local_id, self.remote_id);
    }
}
