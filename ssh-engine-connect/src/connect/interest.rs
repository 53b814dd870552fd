//! Classification of incoming `ssh-connection` messages into the
//! [`Interest`] a waiting reader is registered for.

use std::num::NonZeroU32;

use ssh_engine::Packet;
use ssh_packet::connect;

/// The kind of `ssh-connection` message a caller is waiting on, used to
/// route a single incoming [`Packet`] to whichever reader registered
/// for it (see [`super::Connect::register`]/[`super::Connect::poll_take`]).
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Interest {
    GlobalRequest,
    GlobalResponse,

    ChannelOpen,
    ChannelOpenResponse(u32),

    ChannelWindowAdjust(u32),
    ChannelData(u32, Option<NonZeroU32>),
    ChannelEof(u32),
    ChannelClose(u32),

    ChannelRequest(u32),
    ChannelResponse(u32),

    /// Caught none of the above: an unroutable message, dropped with a
    /// warning unless something is (unusually) registered for it.
    None,
}

impl From<&Packet> for Interest {
    fn from(packet: &Packet) -> Self {
        if packet.to::<connect::GlobalRequest>().is_ok() {
            Self::GlobalRequest
        } else if packet.to::<connect::RequestSuccess>().is_ok()
            || packet.to::<connect::ForwardingSuccess>().is_ok()
            || packet.to::<connect::RequestFailure>().is_ok()
        {
            Self::GlobalResponse
        } else if packet.to::<connect::ChannelOpen>().is_ok() {
            Self::ChannelOpen
        } else if let Ok(message) = packet.to::<connect::ChannelOpenConfirmation>() {
            Self::ChannelOpenResponse(message.recipient_channel)
        } else if let Ok(message) = packet.to::<connect::ChannelOpenFailure>() {
            Self::ChannelOpenResponse(message.recipient_channel)
        } else if let Ok(message) = packet.to::<connect::ChannelWindowAdjust>() {
            Self::ChannelWindowAdjust(message.recipient_channel)
        } else if let Ok(message) = packet.to::<connect::ChannelData>() {
            Self::ChannelData(message.recipient_channel, None)
        } else if let Ok(message) = packet.to::<connect::ChannelExtendedData>() {
            Self::ChannelData(message.recipient_channel, Some(message.data_type))
        } else if let Ok(message) = packet.to::<connect::ChannelEof>() {
            Self::ChannelEof(message.recipient_channel)
        } else if let Ok(message) = packet.to::<connect::ChannelClose>() {
            Self::ChannelClose(message.recipient_channel)
        } else if let Ok(message) = packet.to::<connect::ChannelRequest>() {
            Self::ChannelRequest(message.recipient_channel)
        } else if let Ok(message) = packet.to::<connect::ChannelSuccess>() {
            Self::ChannelResponse(message.recipient_channel)
        } else if let Ok(message) = packet.to::<connect::ChannelFailure>() {
            Self::ChannelResponse(message.recipient_channel)
        } else {
            Self::None
        }
    }
}
