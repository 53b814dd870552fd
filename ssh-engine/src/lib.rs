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
//! ### Supported algorithms
//!
//! #### Key-exchange
//! see [`algorithm::Kex`].
//!
//! #### Server host keys
//! see [`algorithm::Key`].
//!
//! #### Encryption
//! see [`algorithm::Cipher`].
//!
//! #### MACs
//! see [`algorithm::Hmac`].
//!
//! #### Compression
//! see [`algorithm::Compress`].
//!
//! ### Usage
//!
//! A [`Session`] wraps any [`Pipe`] (a duplex, unframed byte stream —
//! a `TcpStream`, a Unix socket, anything `AsyncRead + AsyncWrite`) and
//! drives the version exchange and key-exchange transparently; callers
//! send and receive `SSH-TRANS` messages and layer a service (`ssh-userauth`,
//! `ssh-connection`) on top through [`service::Handler`]/[`service::Request`].

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

mod error;
pub use error::{DisconnectedBy, DisconnectedError, Error, Result};

pub(crate) mod stream;
pub use stream::{Packet, Pipe};

pub mod algorithm;
pub mod side;
pub mod service;
pub mod session;
pub use session::Session;
