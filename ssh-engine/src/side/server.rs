//! Server-[`Side`] configuration.

use std::time::Duration;

use futures_time::time::Duration as Timeout;
use rand::RngCore;
use ssh_key::PrivateKey;
use ssh_packet::{arch::NameList, trans::KexInit};

#[doc(no_inline)]
pub use ssh_packet::Id;

use super::Side;
use crate::{
    algorithm::{self, Cipher, Compress, Hmac, Kex},
    stream::{Stream, TransportPair},
    Error, Pipe, Result,
};

/// A _server_-side session configuration.
#[derive(Debug, Clone)]
pub struct Server {
    /// [`Id`] sent for this _server_ session.
    pub id: Id,

    /// Timeout applied to every packet read and write.
    pub timeout: Duration,

    /// The host keys this server signs key-exchanges with. The
    /// `server_host_key_algorithms` offered in our `KEXINIT` are derived
    /// from the algorithm of each key in this list.
    pub keys: Vec<PrivateKey>,

    /// Enabled algorithms, most-preferred first.
    pub algorithms: Algorithms,

    /// Re-key after this many bytes exchanged on the current keys (§4.1/§6).
    pub rekey_bytes_threshold: u64,

    /// Re-key after this many packets exchanged on the current keys (§4.1/§6).
    pub rekey_packets_threshold: u64,

    /// Re-key after this much wall-clock time on the current keys (§4.1/§6).
    pub rekey_interval: Duration,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            id: Id::v2(
                concat!(env!("CARGO_PKG_NAME"), "_", env!("CARGO_PKG_VERSION")),
                None::<&str>,
            ),
            timeout: Duration::from_secs(120),
            keys: Default::default(),
            algorithms: Default::default(),
            rekey_bytes_threshold: 0x4000_0000,
            rekey_packets_threshold: 1 << 31,
            rekey_interval: Duration::from_secs(3600),
        }
    }
}

/// Enabled algorithms for a _server_-side session, most-preferred first.
#[derive(Debug, Clone)]
pub struct Algorithms {
    /// Key-exchange methods.
    pub kexs: Vec<Kex>,

    /// Cipher algorithms.
    pub ciphers: Vec<Cipher>,

    /// MAC algorithms.
    pub macs: Vec<Hmac>,

    /// Compression algorithms.
    pub compressions: Vec<Compress>,
}

impl Default for Algorithms {
    fn default() -> Self {
        Self {
            kexs: vec![
                Kex::Curve25519Sha256,
                Kex::Curve25519Sha256Libssh,
                Kex::EcdhSha2NistP256,
                Kex::DiffieHellmanGroup14Sha256,
            ],
            ciphers: vec![
                Cipher::Aes256Gcm,
                Cipher::Aes256Ctr,
                Cipher::Aes192Ctr,
                Cipher::Aes128Ctr,
                Cipher::Aes256Cbc,
                Cipher::Aes128Cbc,
            ],
            macs: vec![
                Hmac::HmacSha2_512Etm,
                Hmac::HmacSha2_256Etm,
                Hmac::HmacSha2_512,
                Hmac::HmacSha2_256,
                Hmac::HmacSha1,
            ],
            compressions: vec![Compress::None, Compress::Zlib],
        }
    }
}

impl Side for Server {
    const IS_CLIENT: bool = false;

    fn id(&self) -> &Id {
        &self.id
    }

    fn timeout(&self) -> Timeout {
        self.timeout.into()
    }

    fn rekey_bytes_threshold(&self) -> u64 {
        self.rekey_bytes_threshold
    }

    fn rekey_packets_threshold(&self) -> u64 {
        self.rekey_packets_threshold
    }

    fn rekey_interval(&self) -> Duration {
        self.rekey_interval
    }

    fn kexinit(&self) -> KexInit<'static> {
        let mut cookie = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut cookie);

        KexInit {
            cookie,
            kex_algorithms: NameList::from_iter(&self.algorithms.kexs),
            server_host_key_algorithms: NameList::from_iter(
                self.keys.iter().map(PrivateKey::algorithm),
            ),
            encryption_algorithms_client_to_server: NameList::from_iter(&self.algorithms.ciphers),
            encryption_algorithms_server_to_client: NameList::from_iter(&self.algorithms.ciphers),
            mac_algorithms_client_to_server: NameList::from_iter(&self.algorithms.macs),
            mac_algorithms_server_to_client: NameList::from_iter(&self.algorithms.macs),
            compression_algorithms_client_to_server: NameList::from_iter(
                &self.algorithms.compressions,
            ),
            compression_algorithms_server_to_client: NameList::from_iter(
                &self.algorithms.compressions,
            ),
            languages_client_to_server: Default::default(),
            languages_server_to_client: Default::default(),
            first_kex_packet_follows: false.into(),
        }
    }

    async fn exchange(
        &self,
        stream: &mut Stream<impl Pipe>,
        v_c: &Id,
        v_s: &Id,
        clientkex: KexInit<'_>,
        serverkex: KexInit<'_>,
    ) -> Result<TransportPair> {
        let algo = algorithm::key::negociate(&clientkex, &serverkex)?;
        let key = self
            .keys
            .iter()
            .find(|key| key.algorithm() == algo)
            .ok_or(Error::NoCommonKey)?;

        Kex::negociate(&clientkex, &serverkex)?
            .as_server(stream, v_c, v_s, clientkex, serverkex, key)
            .await
    }
}
