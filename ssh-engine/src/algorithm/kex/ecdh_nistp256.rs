//! `ecdh-sha2-nistp256` (RFC 5656 §4): ECDH over NIST P-256, sharing the
//! same exchange-hash shape as [`super::curve25519`] — only the point
//! encoding (SEC1, uncompressed) differs.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::Sha256;
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

pub(crate) async fn as_client(
    stream: &mut Stream<impl Pipe>,
    v_c: &Id,
    v_s: &Id,
    i_c: &KexInit<'_>,
    i_s: &KexInit<'_>,
) -> Result<(Vec<u8>, Vec<u8>, HostKeyVerification)> {
    let e_c = p256::ecdh::EphemeralSecret::random(&mut rand::thread_rng());
    let q_c = e_c.public_key().to_encoded_point(false);

    stream
        .send(&KexEcdhInit {
            q_c: q_c.as_bytes().to_vec().into(),
        })
        .await?;

    let ecdh: KexEcdhReply = stream.recv().await?.to()?;
    let q_s = p256::PublicKey::from_sec1_bytes(ecdh.q_s.as_ref()).map_err(|_| Error::KexError)?;

    let secret = e_c.diffie_hellman(&q_s);
    let secret = secret.raw_secret_bytes();
    let k = util::mpint(secret.as_slice());

    let k_s = ssh_key::PublicKey::from_bytes(&ecdh.k_s)?;
    let h = exchange::Ecdh {
        v_c: v_c.to_string().into_bytes().into(),
        v_s: v_s.to_string().into_bytes().into(),
        i_c: util::message_bytes(i_c)?.into(),
        i_s: util::message_bytes(i_s)?.into(),
        k_s: ecdh.k_s.clone(),
        q_c: q_c.as_bytes().to_vec().into(),
        q_s: q_s.to_encoded_point(false).as_bytes().to_vec().into(),
        k: MpInt::positive(secret.as_slice()),
    }
    .hash::<Sha256>()
    .to_vec();

    let signature = Signature::try_from(ecdh.signature.as_ref())?;

    Ok((k, h, HostKeyVerification::new(k_s, signature)))
}

pub(crate) async fn as_server(
    stream: &mut Stream<impl Pipe>,
    v_c: &Id,
    v_s: &Id,
    i_c: &KexInit<'_>,
    i_s: &KexInit<'_>,
    key: &ssh_key::PrivateKey,
) -> Result<(Vec<u8>, Vec<u8>)> {
    use signature::Signer;

    let ecdh: KexEcdhInit = stream.recv().await?.to()?;

    let e_s = p256::ecdh::EphemeralSecret::random(&mut rand::thread_rng());
    let q_s = e_s.public_key().to_encoded_point(false);

    let q_c = p256::PublicKey::from_sec1_bytes(ecdh.q_c.as_ref()).map_err(|_| Error::KexError)?;

    let secret = e_s.diffie_hellman(&q_c);
    let secret = secret.raw_secret_bytes();
    let k = util::mpint(secret.as_slice());

    let k_s = key.public_key().to_bytes()?;

    let h = exchange::Ecdh {
        v_c: v_c.to_string().into_bytes().into(),
        v_s: v_s.to_string().into_bytes().into(),
        i_c: util::message_bytes(i_c)?.into(),
        i_s: util::message_bytes(i_s)?.into(),
        k_s: k_s.as_slice().into(),
        q_c: q_c.to_encoded_point(false).as_bytes().to_vec().into(),
        q_s: q_s.as_bytes().to_vec().into(),
        k: MpInt::positive(secret.as_slice()),
    }
    .hash::<Sha256>()
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
