//! [`futures::AsyncRead`] adapter over a channel's _data_/_extended
//! data_ stream, replenishing the local window as it drains (§5.2).

use std::{
    collections::VecDeque,
    io::{self, Read as _},
    num::NonZeroU32,
    pin::Pin,
    task,
};

use futures::{FutureExt, Sink, SinkExt};
use ssh_engine::{side::Side, Packet, Pipe};
use ssh_packet::connect;

use crate::{channel::Channel, connect::Interest};

/// A reader over one of a [`Channel`]'s byte streams — the main _data_
/// stream when `stream_id` is `None`, or an _extended data_ stream
/// (e.g. `stderr`) otherwise.
pub struct Read<'a, IO: Pipe, S: Side> {
    channel: &'a Channel<'a, IO, S>,
    stream_id: Option<NonZeroU32>,

    buffer: VecDeque<u8>,
}

impl<'a, IO: Pipe, S: Side> Read<'a, IO, S> {
    pub fn new(channel: &'a Channel<'a, IO, S>, stream_id: Option<NonZeroU32>) -> Self {
        channel
            .connect
            .register(Interest::ChannelData(channel.local_id, stream_id));

        Self {
            channel,
            stream_id,

            buffer: Default::default(),
        }
    }

    /// Opportunistically tops up the local window once it has drained
    /// past the adjustment threshold (§5.2).
    fn adjust_window(&self, poller: &mut (impl Sink<Packet, Error = ssh_engine::Error> + Unpin)) {
        if let Some(bytes_to_add) = self.channel.local_window.adjustable() {
            if let Ok(packet) = Packet::encode(&connect::ChannelWindowAdjust {
                recipient_channel: self.channel.remote_id,
                bytes_to_add,
            }) {
                poller.start_send_unpin(packet).ok();

                tracing::debug!(
                    "adjusted window size by `{bytes_to_add}` for channel {}:{}",
                    self.channel.local_id,
                    self.channel.remote_id,
                );
            }
        }
    }
}

impl<IO: Pipe, S: Side> futures::AsyncRead for Read<'_, IO, S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
        buf: &mut [u8],
    ) -> task::Poll<io::Result<usize>> {
        {
            let mut poller = futures::ready!(self.channel.connect.poller.lock().poll_unpin(cx));
            self.adjust_window(&mut *poller);
        }

        if self.buffer.is_empty() {
            let interest = Interest::ChannelData(self.channel.local_id, self.stream_id);
            let polled = futures::ready!(self.channel.poll_take(cx, &interest));

            if let Some(packet) = polled {
                let packet = packet.map_err(|err| io::Error::new(io::ErrorKind::BrokenPipe, err))?;

                let data = if self.stream_id.is_none() {
                    packet
                        .to::<connect::ChannelData>()
                        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?
                        .data
                } else {
                    packet
                        .to::<connect::ChannelExtendedData>()
                        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?
                        .data
                };

                self.buffer.extend(data.iter());
                self.channel.local_window.consume(data.len() as u32);

                tracing::trace!(
                    "received {} bytes for stream `{:?}` on channel {}:{}",
                    data.len(),
                    self.stream_id,
                    self.channel.local_id,
                    self.channel.remote_id,
                );
            } else {
                tracing::trace!(
                    "end-of-file for stream `{:?}` on channel {}:{}",
                    self.stream_id,
                    self.channel.local_id,
                    self.channel.remote_id,
                );
            }
        }

        task::Poll::Ready(self.buffer.read(buf))
    }
}

impl<'a, IO: Pipe, S: Side> Drop for Read<'a, IO, S> {
    fn drop(&mut self) {
        self.channel
            .connect
            .unregister(&Interest::ChannelData(self.channel.local_id, self.stream_id));
    }
}
