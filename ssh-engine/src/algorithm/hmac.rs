use digest::Mac;
use hmac::Hmac as HmacImpl;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use strum::{AsRefStr, EnumString};

use crate::{side::client::Client, side::server::Server, Error, Result};

use super::Negociate;

impl Negociate<Client> for Hmac {
    const ERR: Error = Error::NoCommonHmac;

    fn field<'f>(kex: &'f ssh_packet::trans::KexInit) -> &'f ssh_packet::arch::NameList<'f> {
        &kex.mac_algorithms_client_to_server
    }
}

impl Negociate<Server> for Hmac {
    const ERR: Error = Error::NoCommonHmac;

    fn field<'f>(kex: &'f ssh_packet::trans::KexInit) -> &'f ssh_packet::arch::NameList<'f> {
        &kex.mac_algorithms_server_to_client
    }
}

/// SSH MAC algorithms (RFC 4253 §6.4), including the `-etm@openssh.com`
/// encrypt-then-mac variants, which cover the `packet_length` field in
/// the MAC and are preferred over the classic encrypt-and-mac ordering.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Hmac {
    #[strum(serialize = "hmac-sha2-512-etm@openssh.com")]
    HmacSha2_512Etm,

    #[strum(serialize = "hmac-sha2-256-etm@openssh.com")]
    HmacSha2_256Etm,

    #[strum(serialize = "hmac-sha2-512")]
    HmacSha2_512,

    #[strum(serialize = "hmac-sha2-256")]
    HmacSha2_256,

    #[strum(serialize = "hmac-sha1")]
    HmacSha1,

    #[default]
    #[strum(serialize = "none")]
    None,
}

impl Hmac {
    /// Whether this MAC is computed over the ciphertext (`true`, covering
    /// `packet_length` too) rather than over the plaintext (`false`, the
    /// classic RFC 4253 ordering). AEAD ciphers bypass this entirely.
    pub(crate) fn is_etm(&self) -> bool {
        matches!(self, Self::HmacSha2_512Etm | Self::HmacSha2_256Etm)
    }

    pub(crate) fn size(&self) -> usize {
        match self {
            Self::HmacSha2_512Etm | Self::HmacSha2_512 => 64,
            Self::HmacSha2_256Etm | Self::HmacSha2_256 => 32,
            Self::HmacSha1 => 20,
            Self::None => 0,
        }
    }

    pub(crate) fn key_size(&self) -> usize {
        self.size()
    }

    /// Computes the MAC over `sequence_number || data`.
    pub(crate) fn sign(&self, key: &[u8], sequence_number: u32, data: &[u8]) -> Vec<u8> {
        fn mac<D: digest::Mac>(key: &[u8], sequence_number: u32, data: &[u8]) -> Vec<u8> {
            let mut mac = D::new_from_slice(key).expect("hmac accepts any key size");
            mac.update(&sequence_number.to_be_bytes());
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }

        match self {
            Self::HmacSha2_512Etm | Self::HmacSha2_512 => {
                mac::<HmacImpl<Sha512>>(key, sequence_number, data)
            }
            Self::HmacSha2_256Etm | Self::HmacSha2_256 => {
                mac::<HmacImpl<Sha256>>(key, sequence_number, data)
            }
            Self::HmacSha1 => mac::<HmacImpl<Sha1>>(key, sequence_number, data),
            Self::None => Vec::new(),
        }
    }

    /// Verifies `tag` against the MAC of `sequence_number || data`.
    pub(crate) fn verify(
        &self,
        key: &[u8],
        sequence_number: u32,
        data: &[u8],
        tag: &[u8],
    ) -> Result<()> {
        use subtle::ConstantTimeEq;

        let expected = self.sign(key, sequence_number, data);

        if expected.len() == tag.len() && bool::from(expected.ct_eq(tag)) {
            Ok(())
        } else {
            Err(Error::Integrity)
        }
    }
}
