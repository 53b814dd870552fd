//! Supported algorithms for **key-exchange**, **server host keys**,
//! **encryption**, **integrity** and **compression**, and the
//! client's-preference negotiation rule shared by all of them (§4.2).

use ssh_packet::{arch::NameList, trans::KexInit};

use crate::{Error, Result};

mod cipher;
pub use cipher::Cipher;
pub(crate) use cipher::CipherState;

mod compress;
pub use compress::Compress;

mod hmac;
pub use hmac::Hmac;

pub(crate) mod kex;
pub use kex::Kex;

pub(crate) mod key;
pub use key::Key;

/// Negotiates one algorithm out of a [`KexInit`] pair, optionally
/// directionally (`S`) for the per-direction fields (cipher, mac,
/// compression); `S = ()` is used for the single, non-directional
/// fields (kex method, host-key algorithm).
pub trait Negociate<S = ()>: Sized {
    /// The error to raise when no common algorithm exists.
    const ERR: Error;

    /// Picks the relevant [`NameList`] out of a [`KexInit`] for this
    /// algorithm family and side.
    fn field<'f>(kexinit: &'f KexInit) -> &'f NameList<'f>;

    /// Negotiates the algorithm: the first entry of the client's list
    /// that also appears in the server's list (§4.2).
    fn negociate(clientkex: &KexInit, serverkex: &KexInit) -> Result<Self>
    where
        Self: std::str::FromStr,
    {
        Self::field(clientkex)
            .preferred_in(Self::field(serverkex))
            .ok_or(Self::ERR)?
            .parse()
            .map_err(|_| Self::ERR)
    }
}
