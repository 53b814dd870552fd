//! The incoming SSH _channel open request_.

use futures::SinkExt;
use ssh_engine::{side::Side, Packet, Pipe};
use ssh_packet::{arch::StringUtf8, connect};

use super::Connect;
use crate::{channel, Result};

#[doc(no_inline)]
pub use connect::{ChannelOpenContext, ChannelOpenFailureReason};

/// A received _channel open request_, awaiting a reply.
pub struct ChannelOpen<'a, IO: Pipe, S: Side> {
    connect: &'a Connect<IO, S>,
    inner: connect::ChannelOpen<'a>,
}

impl<'a, IO: Pipe, S: Side> ChannelOpen<'a, IO, S> {
    pub(super) fn new(connect: &'a Connect<IO, S>, inner: connect::ChannelOpen<'a>) -> Self {
        Self { connect, inner }
    }

    /// Access the _context_ of the channel open request.
    pub fn cx(&self) -> &ChannelOpenContext<'a> {
        &self.inner.context
    }

    /// Accept the channel open request, handing back the resulting
    /// [`channel::Channel`].
    pub async fn accept(self) -> Result<channel::Channel<'a, IO, S>> {
        let local_id = self.connect.local_id();
        self.connect.channels.insert(local_id);

        self.connect
            .poller
            .lock()
            .await
            .send(Packet::encode(&connect::ChannelOpenConfirmation {
                recipient_channel: self.inner.sender_channel,
                sender_channel: local_id,
                initial_window_size: crate::INITIAL_WINDOW_SIZE,
                maximum_packet_size: crate::MAXIMUM_PACKET_SIZE,
            })?)
            .await?;

        Ok(channel::Channel::new(
            self.connect,
            local_id,
            self.inner.sender_channel,
            self.inner.initial_window_size,
            self.inner.maximum_packet_size,
        ))
    }

    /// Reject the channel open request for `reason`, with a textual
    /// `description` to accompany it.
    pub async fn reject(
        self,
        reason: ChannelOpenFailureReason,
        description: impl Into<StringUtf8>,
    ) -> Result<()> {
        self.connect
            .poller
            .lock()
            .await
            .send(Packet::encode(&connect::ChannelOpenFailure {
                recipient_channel: self.inner.sender_channel,
                reason,
                description: description.into(),
                language: Default::default(),
            })?)
            .await?;

        Ok(())
    }
}
