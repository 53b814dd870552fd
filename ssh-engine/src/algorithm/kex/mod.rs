//! Key-exchange methods (§7/§8): each negotiates a shared secret `K`
//! and exchange hash `H` its own way, then [`finish`] derives the
//! per-direction transport from them the same way for every method.

use sha2::Sha256;
use ssh_key::PrivateKey;
use ssh_packet::{trans::KexInit, Id};
use strum::{AsRefStr, EnumString};

use crate::{
    algorithm::{Cipher, Compress, Hmac, Negociate},
    side::{Client, Server},
    stream::{derive, Pipe, Stream, Transport, TransportPair},
    Error, Result,
};

mod curve25519;
mod dhgroup14;
mod ecdh_nistp256;
mod util;

impl Negociate for Kex {
    const ERR: Error = Error::NoCommonKex;

    fn field<'f>(kex: &'f KexInit) -> &'f ssh_packet::arch::NameList<'f> {
        &kex.kex_algorithms
    }
}

/// SSH key-exchange methods (§8/RFC 5656/RFC 8731).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Kex {
    #[strum(serialize = "curve25519-sha256")]
    Curve25519Sha256,

    #[strum(serialize = "curve25519-sha256@libssh.org")]
    Curve25519Sha256Libssh,

    #[strum(serialize = "ecdh-sha2-nistp256")]
    EcdhSha2NistP256,

    #[strum(serialize = "diffie-hellman-group14-sha256")]
    DiffieHellmanGroup14Sha256,
}

impl Kex {
    /// Runs this method's own exchange as the client, then derives the
    /// resulting [`TransportPair`].
    pub(crate) async fn as_client(
        self,
        stream: &mut Stream<impl Pipe>,
        v_c: &Id,
        v_s: &Id,
        clientkex: KexInit<'_>,
        serverkex: KexInit<'_>,
    ) -> Result<TransportPair> {
        let (k, h, host_key) = match self {
            Self::Curve25519Sha256 | Self::Curve25519Sha256Libssh => {
                curve25519::as_client::<Sha256>(stream, v_c, v_s, &clientkex, &serverkex).await?
            }
            Self::EcdhSha2NistP256 => {
                ecdh_nistp256::as_client(stream, v_c, v_s, &clientkex, &serverkex).await?
            }
            Self::DiffieHellmanGroup14Sha256 => {
                dhgroup14::as_client::<Sha256>(stream, v_c, v_s, &clientkex, &serverkex).await?
            }
        };

        host_key.verify_h(&h)?;

        self.finish(stream, &k, &h, true, &clientkex, &serverkex)
    }

    /// Runs this method's own exchange as the server, signing the
    /// exchange hash with `key`, then derives the resulting
    /// [`TransportPair`].
    pub(crate) async fn as_server(
        self,
        stream: &mut Stream<impl Pipe>,
        v_c: &Id,
        v_s: &Id,
        clientkex: KexInit<'_>,
        serverkex: KexInit<'_>,
        key: &PrivateKey,
    ) -> Result<TransportPair> {
        let (k, h) = match self {
            Self::Curve25519Sha256 | Self::Curve25519Sha256Libssh => {
                curve25519::as_server::<Sha256>(stream, v_c, v_s, &clientkex, &serverkex, key).await?
            }
            Self::EcdhSha2NistP256 => {
                ecdh_nistp256::as_server(stream, v_c, v_s, &clientkex, &serverkex, key).await?
            }
            Self::DiffieHellmanGroup14Sha256 => {
                dhgroup14::as_server::<Sha256>(stream, v_c, v_s, &clientkex, &serverkex, key).await?
            }
        };

        self.finish(stream, &k, &h, false, &clientkex, &serverkex)
    }

    /// Shared tail of every method: negotiates the per-direction
    /// cipher/mac/compression, derives their keys from `k`/`h` (§7.2),
    /// and builds the [`TransportPair`], reusing the existing
    /// `session_id` across re-keys.
    fn finish(
        self,
        stream: &Stream<impl Pipe>,
        k: &[u8],
        h: &[u8],
        is_client: bool,
        clientkex: &KexInit<'_>,
        serverkex: &KexInit<'_>,
    ) -> Result<TransportPair> {
        let session_id = stream.session_id().map(<[u8]>::to_vec).unwrap_or_else(|| h.to_vec());

        let c2s_cipher = Cipher::negociate::<Client>(clientkex, serverkex)?;
        let s2c_cipher = Cipher::negociate::<Server>(clientkex, serverkex)?;
        let c2s_hmac = Hmac::negociate::<Client>(clientkex, serverkex)?;
        let s2c_hmac = Hmac::negociate::<Server>(clientkex, serverkex)?;
        let c2s_compress = Compress::negociate::<Client>(clientkex, serverkex)?;
        let s2c_compress = Compress::negociate::<Server>(clientkex, serverkex)?;

        // Every currently-supported method hashes with SHA-256; this is
        // the seam a SHA-512 method (e.g. a future `gss-group16` variant)
        // would hook into.
        let derive = |letter: u8, len: usize| -> Vec<u8> { derive::<Sha256>(k, h, &session_id, letter, len) };

        let c2s = Transport::new(
            c2s_cipher,
            derive(b'C', c2s_cipher.key_size()),
            derive(b'A', c2s_cipher.iv_size()),
            c2s_hmac,
            derive(b'E', c2s_hmac.key_size()),
            c2s_compress,
        );

        let s2c = Transport::new(
            s2c_cipher,
            derive(b'D', s2c_cipher.key_size()),
            derive(b'B', s2c_cipher.iv_size()),
            s2c_hmac,
            derive(b'F', s2c_hmac.key_size()),
            s2c_compress,
        );

        Ok(if is_client {
            TransportPair {
                session_id,
                tx: c2s,
                rx: s2c,
            }
        } else {
            TransportPair {
                session_id,
                tx: s2c,
                rx: c2s,
            }
        })
    }
}

/// Wraps the server host-key blob seen during key-exchange so the
/// client can verify `H`'s signature once the method produces it.
pub(crate) struct HostKeyVerification {
    public_key: ssh_key::PublicKey,
    signature: ssh_key::Signature,
}

impl HostKeyVerification {
    pub(crate) fn new(public_key: ssh_key::PublicKey, signature: ssh_key::Signature) -> Self {
        Self { public_key, signature }
    }

    fn verify_h(&self, h: &[u8]) -> Result<()> {
        use signature::Verifier;

        self.public_key
            .key_data()
            .verify(self.public_key.algorithm(), h, &self.signature)
            .map_err(|_| Error::HostKeyNotVerifiable)
    }
}
