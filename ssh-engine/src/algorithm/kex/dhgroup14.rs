//! `diffie-hellman-group14-sha256` (RFC 4253 §8.2/RFC 8268): classic
//! finite-field Diffie-Hellman over the 2048-bit MODP group defined in
//! RFC 3526 §3. Kept as the one legacy method this engine retains for
//! interoperability with peers that don't yet speak ECDH (§ SPEC_FULL.md).
//!
//! Unlike the ECDH methods, `ssh-packet` has no ready-made exchange-hash
//! helper for this shape (`e`/`f` are `mpint`s, not opaque octet
//! strings), so the hash input is assembled by hand per RFC 4253 §8.

use digest::Digest;
use num_bigint_dig::{BigUint, RandBigInt};
use ssh_key::Signature;
use ssh_packet::{
    arch::MpInt,
    trans::{KexdhInit, KexdhReply, KexInit},
    Id,
};

use crate::{
    stream::{Pipe, Stream},
    Error, Result,
};

use super::{util, HostKeyVerification};

/// RFC 3526 §3 2048-bit MODP group (`group14`), generator `2`.
const GROUP14_P_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD",
    "129024E088A67CC74020BBEA63B139B22514A08798E3404",
    "DDEF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C2",
    "45E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7",
    "EDEE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B",
    "3DC2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF",
    "5F83655D23DCA3AD961C62F356208552BB9ED5290770966D",
    "670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9",
    "DE2BCBF6955817183995497CEA956AE515D2261898FA0510",
    "15728E5A8AACAA68FFFFFFFFFFFFFFFF",
);

fn group() -> (BigUint, BigUint) {
    let p = BigUint::parse_bytes(GROUP14_P_HEX.as_bytes(), 16).expect("valid group14 prime");
    let g = BigUint::from(2u8);
    (p, g)
}

/// Draws a private exponent in `[2, p-2]`, generous enough (224 bits,
/// per RFC 4253's "at least twice the size of the derived keys")
/// relative to group14's 2048-bit modulus.
fn private_exponent(p: &BigUint) -> BigUint {
    loop {
        let x = rand::thread_rng().gen_biguint(256);
        if x > BigUint::from(1u8) && &x < p {
            return x;
        }
    }
}

pub(crate) async fn as_client<H: Digest>(
    stream: &mut Stream<impl Pipe>,
    v_c: &Id,
    v_s: &Id,
    i_c: &KexInit<'_>,
    i_s: &KexInit<'_>,
) -> Result<(Vec<u8>, Vec<u8>, HostKeyVerification)> {
    let (p, g) = group();
    let x = private_exponent(&p);
    let e = g.modpow(&x, &p);

    stream
        .send(&KexdhInit {
            e: MpInt::positive(&e.to_bytes_be()),
        })
        .await?;

    let reply: KexdhReply = stream.recv().await?.to()?;
    let f = BigUint::from_bytes_be(reply.f.as_ref());
    let one = BigUint::from(1u32);
    if f <= one || f >= &p - &one {
        return Err(Error::KexError);
    }

    let secret = f.modpow(&x, &p);
    let secret_bytes = secret.to_bytes_be();
    let k = util::mpint(&secret_bytes);

    let k_s = ssh_key::PublicKey::from_bytes(&reply.k_s)?;

    let mut buffer = Vec::new();
    util::encode_string(&mut buffer, v_c.to_string().as_bytes());
    util::encode_string(&mut buffer, v_s.to_string().as_bytes());
    util::encode_string(&mut buffer, &util::message_bytes(i_c)?);
    util::encode_string(&mut buffer, &util::message_bytes(i_s)?);
    util::encode_string(&mut buffer, &reply.k_s);
    util::encode_mpint(&mut buffer, &e.to_bytes_be());
    util::encode_mpint(&mut buffer, &f.to_bytes_be());
    util::encode_mpint(&mut buffer, &secret_bytes);

    let h = H::digest(&buffer).to_vec();

    let signature = Signature::try_from(reply.signature.as_ref())?;

    Ok((k, h, HostKeyVerification::new(k_s, signature)))
}

pub(crate) async fn as_server<H: Digest>(
    stream: &mut Stream<impl Pipe>,
    v_c: &Id,
    v_s: &Id,
    i_c: &KexInit<'_>,
    i_s: &KexInit<'_>,
    key: &ssh_key::PrivateKey,
) -> Result<(Vec<u8>, Vec<u8>)> {
    use signature::Signer;

    let (p, g) = group();

    let init: KexdhInit = stream.recv().await?.to()?;
    let e = BigUint::from_bytes_be(init.e.as_ref());
    let one = BigUint::from(1u32);
    if e <= one || e >= &p - &one {
        return Err(Error::KexError);
    }

    let y = private_exponent(&p);
    let f = g.modpow(&y, &p);

    let secret = e.modpow(&y, &p);
    let secret_bytes = secret.to_bytes_be();
    let k = util::mpint(&secret_bytes);

    let k_s = key.public_key().to_bytes()?;

    let mut buffer = Vec::new();
    util::encode_string(&mut buffer, v_c.to_string().as_bytes());
    util::encode_string(&mut buffer, v_s.to_string().as_bytes());
    util::encode_string(&mut buffer, &util::message_bytes(i_c)?);
    util::encode_string(&mut buffer, &util::message_bytes(i_s)?);
    util::encode_string(&mut buffer, &k_s);
    util::encode_mpint(&mut buffer, &e.to_bytes_be());
    util::encode_mpint(&mut buffer, &f.to_bytes_be());
    util::encode_mpint(&mut buffer, &secret_bytes);

    let h = H::digest(&buffer).to_vec();

    let signature = Signer::sign(key, &h);

    stream
        .send(&KexdhReply {
            k_s: k_s.into(),
            f: MpInt::positive(&f.to_bytes_be()),
            signature: signature.to_vec().into(),
        })
        .await?;

    Ok((k, h))
}
