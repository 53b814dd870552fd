//! End-to-end channel data transfer over a duplex pipe, mirroring the
//! teacher's `assh-connect/tests/transfer.rs`.

#![allow(clippy::unwrap_used)]

use futures::{future::BoxFuture, io::BufReader, FutureExt, TryStreamExt};
use rand::{Rng, SeedableRng};
use sha1::Digest;

use ssh_engine::{
    side::{Client, Server},
    Session,
};
use ssh_engine_connect::{channel, ChannelOpenContext};

type IO = BufReader<futures::io::DuplexStream>;

async fn io<S, C>(server_side: S, client_side: C) -> Result<(), Box<dyn std::error::Error>>
where
    S: Fn(channel::Channel<'_, IO, Server>) -> BoxFuture<'_, ()>,
    C: Fn(channel::Channel<'_, IO, Client>) -> BoxFuture<'_, ()>,
{
    let (server_io, client_io) = futures::io::duplex(ssh_packet::PACKET_MAX_SIZE * 16);
    let keys = vec![ssh_key::PrivateKey::random(
        &mut rand::thread_rng(),
        ssh_key::Algorithm::Ed25519,
    )?];

    futures::try_join!(
        async {
            let server = Server {
                keys,
                ..Default::default()
            };
            let session = Session::new(BufReader::new(server_io), server).await?;
            let connect = session.handle(ssh_engine_connect::Service).await?;

            let channel = connect
                .channel_opens()
                .try_next()
                .await?
                .expect("disconnected before opening at least one channel")
                .accept()
                .await?;

            server_side(channel).await;

            Ok::<_, Box<dyn std::error::Error>>(())
        },
        async {
            let client = Client::default();
            let session = Session::new(BufReader::new(client_io), client).await?;
            let connect = session.request(ssh_engine_connect::Service).await?;

            let channel = connect.channel_open(ChannelOpenContext::Session).await?;
            client_side(channel).await;

            Ok::<_, Box<dyn std::error::Error>>(())
        },
    )?;

    Ok(())
}

#[async_std::test]
async fn small() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    io(
        |channel| {
            async move {
                futures::io::copy(&mut channel.as_reader(), &mut channel.as_writer())
                    .await
                    .unwrap();

                channel.eof().await.unwrap();
            }
            .boxed()
        },
        |channel| {
            async move {
                let mut rng = rand::rngs::SmallRng::from_entropy();
                let (mut local, mut received) = (sha1::Sha1::new(), sha1::Sha1::new());

                futures::future::join(
                    async {
                        let buffer = rng.r#gen::<[u8; 8192]>();
                        local.update(buffer);

                        futures::io::copy(&mut &buffer[..], &mut channel.as_writer())
                            .await
                            .unwrap();

                        channel.eof().await.unwrap();
                    },
                    async {
                        futures::io::copy(
                            &mut channel.as_reader(),
                            &mut futures::io::AllowStdIo::new(&mut received),
                        )
                        .await
                        .unwrap();
                    },
                )
                .await;

                assert_eq!(local.finalize(), received.finalize());
            }
            .boxed()
        },
    )
    .await
}

#[async_std::test]
async fn large() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    io(
        |channel| {
            async move {
                futures::io::copy(&mut channel.as_reader(), &mut channel.as_writer())
                    .await
                    .unwrap();

                channel.eof().await.unwrap();
            }
            .boxed()
        },
        |channel| {
            async move {
                let mut rng = rand::rngs::SmallRng::from_entropy();
                let (mut local, mut received) = (sha1::Sha1::new(), sha1::Sha1::new());

                futures::future::join(
                    async {
                        const BYTES_TO_SEND: u64 = 0xFFFFF * 2;
                        let mut current = 0;

                        while current < BYTES_TO_SEND {
                            let buffer = rng.r#gen::<[u8; 65535]>();
                            local.update(buffer);

                            current += futures::io::copy(&mut &buffer[..], &mut channel.as_writer())
                                .await
                                .unwrap();
                        }

                        channel.eof().await.unwrap();
                    },
                    async {
                        futures::io::copy(
                            &mut channel.as_reader(),
                            &mut futures::io::AllowStdIo::new(&mut received),
                        )
                        .await
                        .unwrap();
                    },
                )
                .await;

                assert_eq!(local.finalize(), received.finalize());
            }
            .boxed()
        },
    )
    .await
}
