use aead::{AeadInPlace, KeyInit as AeadKeyInit};
use aes_gcm::Tag;
use strum::{AsRefStr, EnumString};

use crate::{side::client::Client, side::server::Server, Error, Result};

use super::Negociate;

impl Negociate<Client> for Cipher {
    const ERR: Error = Error::NoCommonCipher;

    fn field<'f>(kex: &'f ssh_packet::trans::KexInit) -> &'f ssh_packet::arch::NameList<'f> {
        &kex.encryption_algorithms_client_to_server
    }
}

impl Negociate<Server> for Cipher {
    const ERR: Error = Error::NoCommonCipher;

    fn field<'f>(kex: &'f ssh_packet::trans::KexInit) -> &'f ssh_packet::arch::NameList<'f> {
        &kex.encryption_algorithms_server_to_client
    }
}

/// Opaque per-cipher running state (nonce counters, CBC chaining state...),
/// erased behind `dyn Any` so the single [`Cipher`] enum does not need a
/// matching enum of states — one variant per algorithm, like the teacher
/// does, to avoid duplicating the match arms twice over.
pub(crate) type CipherState = Box<dyn std::any::Any + Send + Sync>;

/// SSH cipher algorithms.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Cipher {
    /// AES-256 in Galois/Counter Mode, AEAD (no separate MAC).
    #[strum(serialize = "aes256-gcm@openssh.com")]
    Aes256Gcm,

    /// AES-256 in counter (CTR) mode.
    Aes256Ctr,

    /// AES-192 in counter (CTR) mode.
    Aes192Ctr,

    /// AES-128 in counter (CTR) mode.
    Aes128Ctr,

    /// AES-256 in cipher block chaining (CBC) mode.
    Aes256Cbc,

    /// AES-128 in cipher block chaining (CBC) mode.
    Aes128Cbc,

    /// TripleDES in cipher block chaining (CBC) mode.
    #[strum(serialize = "3des-cbc")]
    TDesCbc,

    /// No cipher algorithm.
    #[default]
    None,
}

/// AEAD running state: the cipher instance plus the 12-byte nonce,
/// incremented as a big-endian counter after every packet (RFC 5647
/// §7.1) so no nonce is ever reused under the same key.
struct GcmState<T> {
    cipher: T,
    nonce: [u8; 12],
}

impl Cipher {
    fn state<'s, T: cipher::KeyIvInit + Send + Sync + 'static>(
        state: &'s mut Option<CipherState>,
        key: &[u8],
        iv: &[u8],
    ) -> &'s mut T {
        state
            .get_or_insert_with(|| Box::new(T::new_from_slices(key, iv).expect("bad key/iv size")))
            .downcast_mut()
            .expect("cipher state type changed mid-session")
    }

    fn aead_state<'s, T: AeadKeyInit + Send + Sync + 'static>(
        state: &'s mut Option<CipherState>,
        key: &[u8],
        iv: &[u8],
    ) -> &'s mut GcmState<T> {
        state
            .get_or_insert_with(|| {
                let mut nonce = [0u8; 12];
                nonce.copy_from_slice(iv);

                Box::new(GcmState {
                    cipher: T::new_from_slice(key).expect("bad key size"),
                    nonce,
                })
            })
            .downcast_mut()
            .expect("cipher state type changed mid-session")
    }

    fn ctr<C: ctr::cipher::StreamCipher>(cipher: &mut C, buffer: &mut [u8]) -> Result<Option<Tag>> {
        cipher
            .try_apply_keystream(buffer)
            .map_err(|_| Error::KexError)?;

        Ok(None)
    }

    /// Encrypts (or, for AEAD, seals) `buffer` in place. `aad` is only
    /// consulted for AEAD ciphers, where it is the 4-byte `packet_length`
    /// field (never encrypted, always authenticated).
    pub(crate) fn encrypt(
        &self,
        state: &mut Option<CipherState>,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        buffer: &mut [u8],
    ) -> Result<Option<Tag>> {
        fn cbc<C: cbc::cipher::BlockEncryptMut>(cipher: &mut C, buffer: &mut [u8]) -> Result<Option<Tag>> {
            use cbc::cipher::inout::InOutBufReserved;

            let data = InOutBufReserved::from_mut_slice(buffer, buffer.len())
                .map_err(|_| Error::KexError)?;
            let mut buf = data
                .into_padded_blocks::<cbc::cipher::block_padding::NoPadding, C::BlockSize>()
                .map_err(|_| Error::KexError)?;

            cipher.encrypt_blocks_inout_mut(buf.get_blocks());
            if let Some(block) = buf.get_tail_block() {
                cipher.encrypt_block_inout_mut(block);
            }

            Ok(None)
        }

        match self {
            Self::Aes256Gcm => {
                let state = Self::aead_state::<aes_gcm::Aes256Gcm>(state, key, iv);
                let nonce = *aes_gcm::Nonce::from_slice(&state.nonce);
                let tag = state
                    .cipher
                    .encrypt_in_place_detached(&nonce, aad, buffer)
                    .map_err(|_| Error::KexError)?;

                Self::increment_nonce(&mut state.nonce);

                Ok(Some(tag))
            }
            Self::Aes256Ctr => Self::ctr(Self::state::<ctr::Ctr128BE<aes::Aes256>>(state, key, iv), buffer),
            Self::Aes192Ctr => Self::ctr(Self::state::<ctr::Ctr128BE<aes::Aes192>>(state, key, iv), buffer),
            Self::Aes128Ctr => Self::ctr(Self::state::<ctr::Ctr128BE<aes::Aes128>>(state, key, iv), buffer),
            Self::Aes256Cbc => cbc(Self::state::<cbc::Encryptor<aes::Aes256>>(state, key, iv), buffer),
            Self::Aes128Cbc => cbc(Self::state::<cbc::Encryptor<aes::Aes128>>(state, key, iv), buffer),
            Self::TDesCbc => cbc(Self::state::<cbc::Encryptor<des::TdesEde3>>(state, key, iv), buffer),
            Self::None => Ok(None),
        }
    }

    /// Decrypts (or, for AEAD, opens) `buffer` in place, checking `tag`
    /// when the algorithm is AEAD (`tag` is ignored by classic ciphers,
    /// whose integrity is checked separately by the [`super::Hmac`]).
    pub(crate) fn decrypt(
        &self,
        state: &mut Option<CipherState>,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        buffer: &mut [u8],
        tag: Option<&[u8]>,
    ) -> Result<()> {
        fn cbc<C: cbc::cipher::BlockDecryptMut>(cipher: &mut C, buffer: &mut [u8]) -> Result<()> {
            use cbc::cipher::inout::InOutBufReserved;

            let data = InOutBufReserved::from_mut_slice(buffer, buffer.len())
                .map_err(|_| Error::KexError)?;
            let mut buf = data
                .into_padded_blocks::<cbc::cipher::block_padding::NoPadding, C::BlockSize>()
                .map_err(|_| Error::KexError)?;

            cipher.decrypt_blocks_inout_mut(buf.get_blocks());
            if let Some(block) = buf.get_tail_block() {
                cipher.decrypt_block_inout_mut(block);
            }

            Ok(())
        }

        match self {
            Self::Aes256Gcm => {
                let tag = Tag::from_slice(tag.ok_or(Error::Integrity)?);
                let state = Self::aead_state::<aes_gcm::Aes256Gcm>(state, key, iv);
                let nonce = *aes_gcm::Nonce::from_slice(&state.nonce);

                state
                    .cipher
                    .decrypt_in_place_detached(&nonce, aad, buffer, tag)
                    .map_err(|_| Error::Integrity)?;

                Self::increment_nonce(&mut state.nonce);

                Ok(())
            }
            Self::Aes256Ctr | Self::Aes192Ctr | Self::Aes128Ctr => {
                self.encrypt(state, key, iv, aad, buffer).map(|_| ())
            }
            Self::Aes256Cbc => cbc(Self::state::<cbc::Decryptor<aes::Aes256>>(state, key, iv), buffer),
            Self::Aes128Cbc => cbc(Self::state::<cbc::Decryptor<aes::Aes128>>(state, key, iv), buffer),
            Self::TDesCbc => cbc(Self::state::<cbc::Decryptor<des::TdesEde3>>(state, key, iv), buffer),
            Self::None => Ok(()),
        }
    }

    /// Increments the 96-bit nonce as a big-endian counter (RFC 5647
    /// §7.1): the first 4 bytes stay fixed, the low 8 bytes count up
    /// once per packet sent under this key.
    fn increment_nonce(nonce: &mut [u8; 12]) {
        let counter = u64::from_be_bytes(nonce[4..].try_into().expect("8 bytes"));
        nonce[4..].copy_from_slice(&counter.wrapping_add(1).to_be_bytes());
    }

    pub(crate) fn is_aead(&self) -> bool {
        matches!(self, Self::Aes256Gcm)
    }

    pub(crate) fn tag_size(&self) -> usize {
        match self {
            Self::Aes256Gcm => 16,
            _ => 0,
        }
    }

    pub(crate) fn block_size(&self) -> usize {
        match self {
            Self::None | Self::TDesCbc => 8,
            Self::Aes256Gcm
            | Self::Aes128Cbc
            | Self::Aes256Cbc
            | Self::Aes128Ctr
            | Self::Aes192Ctr
            | Self::Aes256Ctr => 16,
        }
    }

    pub(crate) fn key_size(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Aes128Cbc | Self::Aes128Ctr => 16,
            Self::TDesCbc => 24,
            Self::Aes256Gcm | Self::Aes256Cbc | Self::Aes192Ctr | Self::Aes256Ctr => 32,
        }
    }

    pub(crate) fn iv_size(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Aes256Gcm => 12,
            Self::TDesCbc => 8,
            Self::Aes128Cbc
            | Self::Aes256Cbc
            | Self::Aes128Ctr
            | Self::Aes192Ctr
            | Self::Aes256Ctr => 16,
        }
    }
}
