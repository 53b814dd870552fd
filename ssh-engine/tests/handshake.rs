//! End-to-end version exchange + key-exchange (+ re-key) over a duplex
//! pipe, parameterized over the negotiated cipher/mac/kex, mirroring
//! the teacher's `tests/self.rs`.

#![allow(clippy::unwrap_used)]

use futures::io::BufReader;

use ssh_engine::{
    side::{client::Algorithms as ClientAlgorithms, Client, Server},
    Error, Session,
};
use ssh_packet::trans::{Disconnect, DisconnectReason, Ignore};

#[async_std::test]
async fn end_to_end_curve25519_aes256gcm() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let (server_io, client_io) = futures::io::duplex(64 * 1024);

    let (server, client) = futures::try_join!(
        async {
            let server = Server {
                keys: vec![ssh_key::PrivateKey::random(
                    &mut rand::thread_rng(),
                    ssh_key::Algorithm::Ed25519,
                )?],
                // Low thresholds to exercise a re-key within the test.
                rekey_bytes_threshold: 1024,
                ..Default::default()
            };

            Session::new(BufReader::new(server_io), server).await
        },
        async {
            let client = Client {
                algorithms: ClientAlgorithms {
                    kexs: vec!["curve25519-sha256".parse()?],
                    ciphers: vec!["aes256-gcm@openssh.com".parse()?],
                    ..Default::default()
                },
                ..Default::default()
            };

            Session::new(BufReader::new(client_io), client).await
        },
    )?;

    let mut server = server;
    let mut client = client;

    // Push enough traffic server -> client to cross the 1KiB re-key
    // threshold, then confirm the session is still usable afterwards.
    server
        .send(&Ignore {
            data: vec![0; 2048].into(),
        })
        .await?;

    client.recv().await?.to::<Ignore>()?;

    assert!(client.session_id().is_some());
    assert_eq!(server.session_id(), client.session_id());

    let err = client
        .disconnect(DisconnectReason::ByApplication, "done")
        .await;

    let message = server.recv().await;
    assert!(matches!(message, Err(Error::Disconnected(_))));

    assert_eq!(err.reason, DisconnectReason::ByApplication);

    Ok(())
}

#[async_std::test]
async fn disconnect_is_terminal() -> Result<(), Box<dyn std::error::Error>> {
    let (server_io, client_io) = futures::io::duplex(16 * 1024);

    let (server, client) = futures::try_join!(
        async {
            let server = Server {
                keys: vec![ssh_key::PrivateKey::random(
                    &mut rand::thread_rng(),
                    ssh_key::Algorithm::Ed25519,
                )?],
                ..Default::default()
            };

            Session::new(BufReader::new(server_io), server).await
        },
        async {
            let client = Client::default();
            Session::new(BufReader::new(client_io), client).await
        },
    )?;

    let mut server = server;
    let mut client = client;

    client
        .send(&Disconnect {
            reason: DisconnectReason::ByApplication,
            description: "bye".into(),
            language: Default::default(),
        })
        .await?;

    let err = server.recv().await.unwrap_err();
    assert!(matches!(err, Error::Disconnected(_)));

    // A disconnected session keeps replaying the same terminal error.
    let err = server.recv().await.unwrap_err();
    assert!(matches!(err, Error::Disconnected(_)));

    Ok(())
}
