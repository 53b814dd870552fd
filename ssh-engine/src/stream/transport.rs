//! A single direction's negotiated algorithms and derived key material,
//! and the §4.1/§6.3/§6.4 framing that turns a payload into an on-wire
//! packet (and back).
//!
//! Reading a packet is two-phase because the `packet_length` field
//! itself may be encrypted (classic, non-ETM ciphers): [`Transport::first_block_len`]
//! tells the caller how many bytes to read before anything can be
//! known, [`Transport::decrypt_first_block`] reveals the length (and,
//! for classic ciphers, advances the real running cipher state), and
//! [`Transport::finish_open`] consumes the rest of the packet.

use rand::RngCore;
use secrecy::{ExposeSecret, SecretBox};

use crate::{
    algorithm::{Cipher, CipherState, Compress, Hmac},
    Error, Result,
};

/// One direction (client-to-server, or server-to-client) of a negotiated
/// transport: the algorithms picked during key-exchange, their derived
/// keys, and the running cipher state. The sequence number is *not*
/// tracked here — per RFC 4253 §6.4 it is never reset across a re-key,
/// so it lives on [`crate::stream::Stream`] instead, spanning every
/// [`Transport`] installed over the life of the session.
pub struct Transport {
    cipher: Cipher,
    cipher_state: Option<CipherState>,
    key: SecretBox<[u8]>,
    iv: SecretBox<[u8]>,

    hmac: Hmac,
    mac_key: SecretBox<[u8]>,

    compress: Compress,

    bytes_since_rekey: u64,
    packets_since_rekey: u64,
}

impl Transport {
    pub(crate) fn new(
        cipher: Cipher,
        key: Vec<u8>,
        iv: Vec<u8>,
        hmac: Hmac,
        mac_key: Vec<u8>,
        compress: Compress,
    ) -> Self {
        Self {
            cipher,
            cipher_state: None,
            key: SecretBox::new(key.into_boxed_slice()),
            iv: SecretBox::new(iv.into_boxed_slice()),
            hmac,
            mac_key: SecretBox::new(mac_key.into_boxed_slice()),
            compress,
            bytes_since_rekey: 0,
            packets_since_rekey: 0,
        }
    }

    /// Whether the negotiated MAC is "encrypt-then-MAC": the
    /// `packet_length` field and the MAC both travel over the
    /// ciphertext, unencrypted-length, like AEAD ciphers.
    fn length_is_cleartext(&self) -> bool {
        self.cipher.is_aead() || self.hmac.is_etm()
    }

    /// Delayed (`@openssh.com`) compression only engages once
    /// authentication has completed (§4.2.3 / SPEC_FULL.md supplement).
    fn compress(&self, authenticated: bool) -> Compress {
        if self.compress.is_delayed() && !authenticated {
            Compress::None
        } else {
            self.compress
        }
    }

    pub(crate) fn bytes_since_rekey(&self) -> u64 {
        self.bytes_since_rekey
    }

    pub(crate) fn packets_since_rekey(&self) -> u64 {
        self.packets_since_rekey
    }

    /// Frames `payload` (an already-serialized `SSH_MSG_*` body) into a
    /// full on-wire packet: `packet_length || padding_length || payload
    /// || padding [|| mac]` per §6, encrypted and MAC'd as negotiated.
    pub(crate) fn seal(&mut self, payload: &[u8], authenticated: bool, seq: u32) -> Result<Vec<u8>> {
        let payload = self.compress(authenticated).compress(payload)?;

        let block_size = self.cipher.block_size().max(8);

        // packet_length(4) + padding_length(1) + payload + padding, aligned
        // to block_size, with at least 4 bytes of padding (§6.1/§6.3).
        let unpadded = 1 + payload.len();
        let mut padding_len = block_size - (unpadded % block_size);
        if padding_len < 4 {
            padding_len += block_size;
        }

        let mut body = Vec::with_capacity(1 + payload.len() + padding_len);
        body.push(padding_len as u8);
        body.extend_from_slice(&payload);

        let mut padding = vec![0u8; padding_len];
        rand::thread_rng().fill_bytes(&mut padding);
        body.extend_from_slice(&padding);

        let packet_length = (body.len() as u32).to_be_bytes();

        let plaintext_mac = (!self.cipher.is_aead() && !self.hmac.is_etm()).then(|| {
            self.hmac.sign(
                self.mac_key.expose_secret(),
                seq,
                &[&packet_length[..], &body[..]].concat(),
            )
        });

        let tag = self.cipher.encrypt(
            &mut self.cipher_state,
            self.key.expose_secret(),
            self.iv.expose_secret(),
            &packet_length,
            &mut body,
        )?;

        let mut out = Vec::with_capacity(4 + body.len() + self.hmac.size());
        out.extend_from_slice(&packet_length);
        out.extend_from_slice(&body);

        if let Some(tag) = tag {
            out.extend_from_slice(&tag);
        } else if self.hmac.is_etm() {
            let mac = self.hmac.sign(self.mac_key.expose_secret(), seq, &out);
            out.extend_from_slice(&mac);
        } else if let Some(mac) = plaintext_mac {
            out.extend_from_slice(&mac);
        }

        self.bytes_since_rekey += out.len() as u64;
        self.packets_since_rekey += 1;

        Ok(out)
    }

    /// How many bytes must be read before [`Self::decrypt_first_block`]
    /// can reveal the packet length.
    pub(crate) fn first_block_len(&self) -> usize {
        if self.length_is_cleartext() {
            4
        } else {
            self.cipher.block_size().max(8)
        }
    }

    /// Reveals the `packet_length` from the first bytes read off the
    /// wire. For classic (non-ETM, non-AEAD) ciphers, this decrypts
    /// `block` in place, permanently advancing the running cipher
    /// state — the decrypted bytes become part of the packet body and
    /// must be kept by the caller, not re-read.
    pub(crate) fn decrypt_first_block(&mut self, block: &mut [u8]) -> Result<u32> {
        if !self.length_is_cleartext() {
            self.cipher.decrypt(
                &mut self.cipher_state,
                self.key.expose_secret(),
                self.iv.expose_secret(),
                &[],
                block,
                None,
            )?;
        }

        let packet_length = u32::from_be_bytes(block[..4].try_into().unwrap());

        // §4.1/§8: reject out-of-range lengths before trusting them for
        // any further allocation — a peer (or a corrupted/forged first
        // block) must not be able to make us allocate an unbounded buffer.
        if !(5..=35000).contains(&packet_length) {
            return Err(Error::ProtocolError("packet_length out of the [5, 35000] range"));
        }

        Ok(packet_length)
    }

    /// Completes a packet read: `first_block` is whatever
    /// [`Self::decrypt_first_block`] was given (already plaintext for
    /// classic ciphers, still the clear length for ETM/AEAD), `rest`
    /// is every remaining ciphertext byte of the packet body, and
    /// `mac` is the trailing MAC or AEAD tag.
    pub(crate) fn finish_open(
        &mut self,
        packet_length: u32,
        first_block: &[u8],
        rest: &mut [u8],
        mac: &[u8],
        authenticated: bool,
        seq: u32,
    ) -> Result<Vec<u8>> {
        let length_bytes = packet_length.to_be_bytes();
        let packet_length = packet_length as usize;

        let body = if self.length_is_cleartext() {
            // `first_block` only ever held the 4-byte cleartext length;
            // the whole body is ciphertext in `rest`.
            self.cipher.decrypt(
                &mut self.cipher_state,
                self.key.expose_secret(),
                self.iv.expose_secret(),
                &length_bytes,
                rest,
                self.cipher.is_aead().then_some(mac),
            )?;

            if !self.cipher.is_aead() {
                self.hmac.verify(
                    self.mac_key.expose_secret(),
                    seq,
                    &[&length_bytes[..], &rest[..]].concat(),
                    mac,
                )?;
            }

            rest.to_vec()
        } else {
            // Classic cipher: `first_block` is already-decrypted
            // plaintext (minus its length prefix), `rest` still needs
            // decrypting, continuing the same running state.
            self.cipher.decrypt(
                &mut self.cipher_state,
                self.key.expose_secret(),
                self.iv.expose_secret(),
                &[],
                rest,
                None,
            )?;

            let mut body = Vec::with_capacity(packet_length);
            body.extend_from_slice(&first_block[4..]);
            body.extend_from_slice(rest);

            self.hmac.verify(
                self.mac_key.expose_secret(),
                seq,
                &[&length_bytes[..], &body[..]].concat(),
                mac,
            )?;

            body
        };

        let padding_len = *body.first().ok_or(Error::ProtocolError("empty packet body"))? as usize;
        if padding_len < 4 {
            return Err(Error::ProtocolError("padding shorter than the minimum of 4 bytes"));
        }
        if padding_len + 1 > body.len() {
            return Err(Error::ProtocolError("padding longer than packet"));
        }

        let payload = &body[1..body.len() - padding_len];
        let payload = self.compress(authenticated).decompress(payload)?;

        self.bytes_since_rekey += 4 + packet_length as u64 + mac.len() as u64;
        self.packets_since_rekey += 1;

        Ok(payload)
    }

    pub(crate) fn mac_size(&self) -> usize {
        if self.cipher.is_aead() {
            self.cipher.tag_size()
        } else {
            self.hmac.size()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Hmac;

    /// The `seq` argument must actually flow into the MAC: opening a
    /// sealed packet at the sequence number it was sealed with must
    /// succeed, and at any other sequence number (as would happen if a
    /// re-key incorrectly reset the counter the caller tracks, see
    /// [`crate::stream::Stream`]) must fail integrity (§4.1, §8
    /// invariant #1).
    #[test]
    fn seq_is_not_owned_by_transport() {
        let hmac = Hmac::HmacSha2_256;
        let key_len = hmac.key_size();

        let mut tx = Transport::new(
            Cipher::default(),
            Vec::new(),
            Vec::new(),
            hmac,
            vec![0x42; key_len],
            Compress::default(),
        );

        let at_zero = tx.seal(b"payload", false, 0).unwrap();

        // Opening the packet at the seq it was actually sealed with
        // must succeed; opening the same bytes at the wrong seq (as if
        // a re-key had reset the counter) must fail.
        let mut rx_ok = Transport::new(
            Cipher::default(),
            Vec::new(),
            Vec::new(),
            hmac,
            vec![0x42; key_len],
            Compress::default(),
        );
        let mut rx_bad = Transport::new(
            Cipher::default(),
            Vec::new(),
            Vec::new(),
            hmac,
            vec![0x42; key_len],
            Compress::default(),
        );

        // Cipher::None has a block size of 8 and never actually encrypts,
        // so `first_block` (the first 8 on-wire bytes: `packet_length`
        // plus the first 4 body bytes) is already "decrypted" as-is.
        let packet_length = u32::from_be_bytes(at_zero[..4].try_into().unwrap());
        let first_block = at_zero[..8].to_vec();
        let remaining = packet_length as usize - 4;
        let mut rest = at_zero[8..8 + remaining].to_vec();
        let mac = at_zero[8 + remaining..].to_vec();

        assert!(rx_ok
            .finish_open(packet_length, &first_block, &mut rest.clone(), &mac, false, 0)
            .is_ok());
        assert!(rx_bad
            .finish_open(packet_length, &first_block, &mut rest, &mac, false, 1)
            .is_err());
    }
}
