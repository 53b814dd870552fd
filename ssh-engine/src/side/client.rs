//! Client-[`Side`] configuration.

use std::time::Duration;

use futures_time::time::Duration as Timeout;
use rand::RngCore;
use ssh_packet::arch::NameList;

#[doc(no_inline)]
pub use ssh_packet::Id;
use ssh_packet::trans::KexInit;

use super::Side;
use crate::{
    algorithm::{Cipher, Compress, Hmac, Kex, Key},
    stream::{Stream, TransportPair},
    Pipe, Result,
};

/// A _client_-side session configuration.
///
/// This is a per-session value (never a process-wide singleton, per
/// §6/Design Notes): every [`crate::session::Session::new`] call takes
/// one by value.
#[derive(Debug, Clone)]
pub struct Client {
    /// [`Id`] sent for this _client_ session.
    pub id: Id,

    /// Timeout applied to every packet read and write.
    pub timeout: Duration,

    /// Enabled algorithms, most-preferred first.
    pub algorithms: Algorithms,

    /// Re-key after this many bytes exchanged on the current keys (§4.1/§6).
    pub rekey_bytes_threshold: u64,

    /// Re-key after this many packets exchanged on the current keys (§4.1/§6).
    pub rekey_packets_threshold: u64,

    /// Re-key after this much wall-clock time on the current keys (§4.1/§6).
    pub rekey_interval: Duration,
}

impl Default for Client {
    fn default() -> Self {
        Self {
            id: Id::v2(
                concat!(env!("CARGO_PKG_NAME"), "_", env!("CARGO_PKG_VERSION")),
                None::<&str>,
            ),
            timeout: Duration::from_secs(120),
            algorithms: Default::default(),
            rekey_bytes_threshold: 0x4000_0000,
            rekey_packets_threshold: 1 << 31,
            rekey_interval: Duration::from_secs(3600),
        }
    }
}

/// Enabled algorithms for a _client_-side session, most-preferred first.
#[derive(Debug, Clone)]
pub struct Algorithms {
    /// Key-exchange methods.
    pub kexs: Vec<Kex>,

    /// Acceptable server host-key algorithms.
    pub keys: Vec<Key>,

    /// Cipher algorithms.
    pub ciphers: Vec<Cipher>,

    /// MAC algorithms.
    pub macs: Vec<Hmac>,

    /// Compression algorithms.
    pub compressions: Vec<Compress>,
}

impl Default for Algorithms {
    fn default() -> Self {
        let super::server::Algorithms {
            kexs,
            ciphers,
            macs,
            compressions,
        } = Default::default();

        Self {
            kexs,
            keys: vec![
                Key::Ed25519,
                Key::Ecdsa {
                    curve: ssh_key::EcdsaCurve::NistP256,
                },
                Key::Rsa {
                    hash: Some(ssh_key::HashAlg::Sha512),
                },
                Key::Rsa {
                    hash: Some(ssh_key::HashAlg::Sha256),
                },
            ],
            ciphers,
            macs,
            compressions,
        }
    }
}

impl Side for Client {
    const IS_CLIENT: bool = true;

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
            server_host_key_algorithms: NameList::from_iter(&self.algorithms.keys),
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
        Kex::negociate(&clientkex, &serverkex)?
            .as_client(stream, v_c, v_s, clientkex, serverkex)
            .await
    }
}
