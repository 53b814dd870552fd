//! The incoming SSH _global request_, and the outcome of one we sent.

use futures::SinkExt;
use ssh_engine::{side::Side, Packet, Pipe};
use ssh_packet::connect;

use super::Connect;
use crate::Result;

#[doc(no_inline)]
pub use connect::GlobalRequestContext;

/// The outcome of a _global request_ we sent (see [`Connect::global_request`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// _Accepted_ the global request, returning the bound port, if any
    /// (only meaningful for a `tcpip-forward` request with `bind_port: 0`).
    Accept {
        /// Port that was bound.
        bound_port: u32,
    },

    /// _Rejected_ the global request.
    Reject,
}

/// A received _global request_, awaiting a reply.
pub struct GlobalRequest<'a, IO: Pipe, S: Side> {
    connect: &'a Connect<IO, S>,
    inner: connect::GlobalRequest<'a>,
}

impl<'a, IO: Pipe, S: Side> GlobalRequest<'a, IO, S> {
    pub(super) fn new(connect: &'a Connect<IO, S>, inner: connect::GlobalRequest<'a>) -> Self {
        Self { connect, inner }
    }

    /// Access the _context_ of the global request.
    pub fn cx(&self) -> &GlobalRequestContext<'a> {
        &self.inner.context
    }

    /// Accept the global request, optionally returning the bound port
    /// when the context was a `tcpip-forward` with an ephemeral port.
    pub async fn accept(self, bound_port: Option<u32>) -> Result<()> {
        if *self.inner.want_reply {
            let message = match bound_port {
                Some(bound_port) => Packet::encode(&connect::ForwardingSuccess { bound_port })?,
                None => Packet::encode(&connect::RequestSuccess)?,
            };

            self.connect.poller.lock().await.send(message).await?;
        }

        Ok(())
    }

    /// Reject the global request.
    pub async fn reject(self) -> Result<()> {
        if *self.inner.want_reply {
            self.connect
                .poller
                .lock()
                .await
                .send(Packet::encode(&connect::RequestFailure)?)
                .await?;
        }

        Ok(())
    }
}
