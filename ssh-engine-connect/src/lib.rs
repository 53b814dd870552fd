#![doc = concat!(
    "[![crates.io](https://img.shields.io/crates/v/", env!("CARGO_PKG_NAME"), ")](https://crates.io/crates/", env!("CARGO_PKG_NAME"), ")",
    " ",
    "[![docs.rs](https://img.shields.io/docsrs/", env!("CARGO_PKG_NAME"), ")](https://docs.rs/", env!("CARGO_PKG_NAME"), ")",
    " ",
    "![license](https://img.shields.io/crates/l/", env!("CARGO_PKG_NAME"), ")"
)]
#![doc = ""]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Layers onto a [`ssh_engine::Session`] through [`ssh_engine::service`]:
//! [`Service`] is both a [`ssh_engine::service::Request`] (client side,
//! requesting `ssh-connection` once authenticated) and a
//! [`ssh_engine::service::Handler`] (server side, accepting it), both
//! producing a [`Connect`] that drives channel multiplexing over the
//! session for as long as it's kept around.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    clippy::unwrap_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo,
    clippy::undocumented_unsafe_blocks
)]
#![forbid(unsafe_code)]

use ssh_engine::{service, side::Side, Pipe, Session};

pub(crate) const SERVICE_NAME: &str = "ssh-connection";

pub(crate) const MAXIMUM_PACKET_SIZE: u32 = 32768; // 32KiB
pub(crate) const INITIAL_WINDOW_SIZE: u32 = 64 * MAXIMUM_PACKET_SIZE;
pub(crate) const WINDOW_ADJUST_THRESHOLD: u32 = INITIAL_WINDOW_SIZE - MAXIMUM_PACKET_SIZE * 5;

mod connect;
pub use connect::Connect;

pub mod channel;

mod error;
pub use error::{Error, Result};

#[doc(no_inline)]
pub use ssh_packet::connect::{ChannelOpenContext, ChannelOpenFailureReason, GlobalRequestContext};

/// The `ssh-connection` service: requested by a client once authenticated,
/// handled by a server once it accepts the request, both producing a
/// [`Connect`] that multiplexes channels over the underlying session.
#[derive(Debug, Clone, Copy, Default)]
pub struct Service;

impl service::Request for Service {
    type Err = ssh_engine::Error;
    type Ok<IO: Pipe, S: Side> = Connect<IO, S>;

    const SERVICE_NAME: &'static str = SERVICE_NAME;

    async fn on_accept<IO, S>(&mut self, session: Session<IO, S>) -> ssh_engine::Result<Connect<IO, S>>
    where
        IO: Pipe,
        S: Side,
    {
        Ok(Connect::new(session))
    }
}

impl service::Handler for Service {
    type Err = ssh_engine::Error;
    type Ok<IO: Pipe, S: Side> = Connect<IO, S>;

    const SERVICE_NAME: &'static str = SERVICE_NAME;

    async fn on_request<IO, S>(&mut self, session: Session<IO, S>) -> ssh_engine::Result<Connect<IO, S>>
    where
        IO: Pipe,
        S: Side,
    {
        Ok(Connect::new(session))
    }
}
