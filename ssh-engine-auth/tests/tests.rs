//! End-to-end `ssh-userauth` exchanges over a duplex pipe, mirroring
//! the teacher's `assh-auth/tests/tests.rs`.

#![allow(clippy::unwrap_used)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use futures::io::BufReader;

use ssh_engine::{
    service,
    side::{Client, Server, Side},
    Error, Pipe, Result as EngineResult, Session,
};
use ssh_engine_auth::{handler, request};

const DUPLEX_SIZE: usize = 64 * 1024;

/// A terminal service that just records it was reached.
#[derive(Clone, Default)]
struct Flag(Arc<AtomicBool>);

impl Flag {
    fn is_flagged(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl service::Handler for Flag {
    type Err = Error;
    type Ok<IO: Pipe, S: Side> = ();

    const SERVICE_NAME: &'static str = "ssh-connection";

    async fn on_request<IO, S>(&mut self, _session: Session<IO, S>) -> EngineResult<()>
    where
        IO: Pipe,
        S: Side,
    {
        self.0.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl service::Request for Flag {
    type Err = Error;
    type Ok<IO: Pipe, S: Side> = ();

    const SERVICE_NAME: &'static str = "ssh-connection";

    async fn on_accept<IO, S>(&mut self, _session: Session<IO, S>) -> EngineResult<()>
    where
        IO: Pipe,
        S: Side,
    {
        self.0.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_std::test]
async fn none_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let (server_io, client_io) = futures::io::duplex(DUPLEX_SIZE);

    let server_flag = Flag::default();
    let client_flag = Flag::default();

    futures::try_join!(
        async {
            let server = Server {
                keys: vec![ssh_key::PrivateKey::random(
                    &mut rand::thread_rng(),
                    ssh_key::Algorithm::Ed25519,
                )?],
                ..Default::default()
            };
            let session = Session::new(BufReader::new(server_io), server).await?;

            session
                .handle(handler::Auth::new(server_flag.clone()).none(|_| handler::none::Response::Accept))
                .await
        },
        async {
            let client = Client::default();
            let session = Session::new(BufReader::new(client_io), client).await?;

            session
                .request(request::Auth::new("user", client_flag.clone()))
                .await
        },
    )?;

    assert!(server_flag.is_flagged(), "server handler was not reached");
    assert!(client_flag.is_flagged(), "client request was not completed");

    Ok(())
}

#[async_std::test]
async fn password_accept_then_reject() -> Result<(), Box<dyn std::error::Error>> {
    let (server_io, client_io) = futures::io::duplex(DUPLEX_SIZE);

    let server_flag = Flag::default();
    let client_flag = Flag::default();

    futures::try_join!(
        async {
            let server = Server {
                keys: vec![ssh_key::PrivateKey::random(
                    &mut rand::thread_rng(),
                    ssh_key::Algorithm::Ed25519,
                )?],
                ..Default::default()
            };
            let session = Session::new(BufReader::new(server_io), server).await?;

            session
                .handle(
                    handler::Auth::new(server_flag.clone())
                        .password(|_: String, password: String, _| {
                            if password == "correct horse battery staple" {
                                handler::password::Response::Accept
                            } else {
                                handler::password::Response::Reject
                            }
                        }),
                )
                .await
        },
        async {
            let client = Client::default();
            let session = Session::new(BufReader::new(client_io), client).await?;

            session
                .request(
                    request::Auth::new("user", client_flag.clone())
                        .password("correct horse battery staple"),
                )
                .await
        },
    )?;

    assert!(server_flag.is_flagged());
    assert!(client_flag.is_flagged());

    Ok(())
}
