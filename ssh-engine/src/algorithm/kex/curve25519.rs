//! `curve25519-sha256[@libssh.org]` (RFC 8731): X25519 ECDH key-exchange.

use digest::Digest;
use ssh_key::Signature;
use ssh_packet::{
    arch::MpInt,
    crypto::exchange,
    trans::{KexEcdhInit, KexEcdhReply, KexInit},
    Id,
};

use crate::{
    stream::{Pipe, Stream},
    Error, Result,
};

use super::{util, HostKeyVerification};

/// Runs the client side of the exchange: emits our ephemeral public
/// key, receives the server's reply, and returns the shared secret
/// `K` (mpint-encoded, for [`crate::stream::derive`]), the exchange
/// hash `H`, and the still-unverified host key + signature over `H`.
pub(crate) async fn as_client<H: Digest>(
    stream: &mut Stream<impl Pipe>,
    v_c: &Id,
    v_s: &Id,
    i_c: &KexInit<'_>,
    i_s: &KexInit<'_>,
) -> Result<(Vec<u8>, Vec<u8>, HostKeyVerification)> {
    let e_c = x25519_dalek::EphemeralSecret::random_from_rng(rand::thread_rng());
    let q_c = x25519_dalek::PublicKey::from(&e_c);

    stream
        .send(&KexEcdhInit {
            q_c: q_c.as_bytes().to_vec().into(),
        })
        .await?;

    let ecdh: KexEcdhReply = stream.recv().await?.to()?;
    let q_s = x25519_dalek::PublicKey::from(
        <[u8; 32]>::try_from(ecdh.q_s.as_ref()).map_err(|_| Error::KexError)?,
    );

    let secret = e_c.diffie_hellman(&q_s);
    let k = util::mpint(secret.as_bytes());

    let k_s = ssh_key::PublicKey::from_bytes(&ecdh.k_s)?;
    let h = exchange::Ecdh {
        v_c: v_c.to_string().into_bytes().into(),
        v_s: v_s.to_string().into_bytes().into(),
        i_c: util::message_bytes(i_c)?.into(),
        i_s: util::message_bytes(i_s)?.into(),
        k_s: ecdh.k_s.clone(),
        q_c: q_c.as_bytes().to_vec().into(),
        q_s: q_s.as_bytes().to_vec().into(),
        k: MpInt::positive(secret.as_bytes()),
    }
    .hash::<H>()
    .to_vec();

    let signature = Signature::try_from(ecdh.signature.as_ref())?;

    Ok((k, h, HostKeyVerification::new(k_s, signature)))
}

/// Runs the server side of the exchange: receives the client's
/// ephemeral public key, replies with ours, signed with `key`, and
/// returns `K` and `H` as per [`as_client`].
pub(crate) async fn as_server<H: Digest>(
    stream: &mut Stream<impl Pipe>,
    v_c: &Id,
    v_s: &Id,
    i_c: &KexInit<'_>,
    i_s: &KexInit<'_>,
    key: &ssh_key::PrivateKey,
) -> Result<(Vec<u8>, Vec<u8>)> {
    use signature::Signer;

    let ecdh: KexEcdhInit = stream.recv().await?.to()?;

    let e_s = x25519_dalek::EphemeralSecret::random_from_rng(rand::thread_rng());
    let q_s = x25519_dalek::PublicKey::from(&e_s);

    let q_c = x25519_dalek::PublicKey::from(
        <[u8; 32]>::try_from(ecdh.q_c.as_ref()).map_err(|_| Error::KexError)?,
    );

    let secret = e_s.diffie_hellman(&q_c);
    let k = util::mpint(secret.as_bytes());

    let k_s = key.public_key().to_bytes()?;

    let h = exchange::Ecdh {
        v_c: v_c.to_string().into_bytes().into(),
        v_s: v_s.to_string().into_bytes().into(),
        i_c: util::message_bytes(i_c)?.into(),
        i_s: util::message_bytes(i_s)?.into(),
        k_s: k_s.as_slice().into(),
        q_c: q_c.as_bytes().to_vec().into(),
        q_s: q_s.as_bytes().to_vec().into(),
        k: MpInt::positive(secret.as_bytes()),
    }
    .hash::<H>()
    .to_vec();

    let signature = Signer::sign(key, &h);

    stream
        .send(&KexEcdhReply {
            k_s: k_s.into(),
            q_s: q_s.as_bytes().to_vec().into(),
            signature: signature.to_vec().into(),
        })
        .await?;

    Ok((k, h))
}
