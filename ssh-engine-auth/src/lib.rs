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
//! [`request::Auth`] drives the client side (picking methods in turn,
//! handling `USERAUTH_FAILURE`'s `continue_with` list), [`handler::Auth`]
//! drives the server side (dispatching by method name to the per-method
//! handler the caller installed).

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

pub(crate) const SERVICE_NAME: &str = "ssh-userauth";

pub mod request;
pub mod handler;
