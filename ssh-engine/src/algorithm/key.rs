//! Server host-key algorithms, delegated to [`ssh_key::Algorithm`] rather
//! than re-encoding the set ourselves — §4.2's host-key selection is a
//! pure name negotiation over whatever [`ssh-key`] already understands.

pub use ssh_key::Algorithm as Key;
use ssh_packet::trans::KexInit;

use crate::{Error, Result};

/// Negotiates the server host-key algorithm (non-directional: both
/// sides agree on a single algorithm for the signature over `H`).
pub fn negociate(clientkex: &KexInit, serverkex: &KexInit) -> Result<Key> {
    clientkex
        .server_host_key_algorithms
        .preferred_in(&serverkex.server_host_key_algorithms)
        .ok_or(Error::NoCommonKey)?
        .parse()
        .map_err(|_| Error::NoCommonKey)
}
