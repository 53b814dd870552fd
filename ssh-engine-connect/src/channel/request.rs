//! The _channel requests_ and responses.

use futures::SinkExt;
use ssh_engine::{side::Side, Packet, Pipe};
use ssh_packet::connect;

use super::Channel;
use crate::Result;

#[doc(no_inline)]
pub use connect::ChannelRequestContext;

/// A response to a _channel request_ (see [`Channel::request_wait`]).
#[derive(Debug, PartialEq, Eq)]
pub enum Response {
    /// The request succeeded.
    Success,

    /// The request failed.
    Failure,
}

/// A received _channel request_, awaiting a reply.
pub struct Request<'r, IO: Pipe, S: Side> {
    channel: &'r Channel<'r, IO, S>,
    inner: connect::ChannelRequest<'r>,
}

impl<'r, IO: Pipe, S: Side> Request<'r, IO, S> {
    pub(super) fn new(channel: &'r Channel<'r, IO, S>, inner: connect::ChannelRequest<'r>) -> Self {
        Self { channel, inner }
    }

    /// Access the _context_ of the channel request.
    pub fn cx(&self) -> &ChannelRequestContext<'r> {
        &self.inner.context
    }

    /// Accept the channel request.
    pub async fn accept(self) -> Result<()> {
        if *self.inner.want_reply {
            self.channel
                .connect
                .poller
                .lock()
                .await
                .send(Packet::encode(&connect::ChannelSuccess {
                    recipient_channel: self.channel.remote_id,
                })?)
                .await?;
        }

        Ok(())
    }

    /// Reject the channel request.
    pub async fn reject(self) -> Result<()> {
        if *self.inner.want_reply {
            self.channel
                .connect
                .poller
                .lock()
                .await
                .send(Packet::encode(&connect::ChannelFailure {
                    recipient_channel: self.channel.remote_id,
                })?)
                .await?;
        }

        Ok(())
    }
}
