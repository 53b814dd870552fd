//! The Binary Packet Protocol (§4/§6): version exchange, and framed
//! packet reads/writes over a negotiated [`TransportPair`].

use futures::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use futures_time::{future::FutureExt as _, time::Duration as Timeout};
use rand::RngCore;
use ssh_packet::{
    binrw::{BinRead, BinWrite},
    Id,
};

use crate::{Error, Result};

mod keys;
pub(crate) use keys::derive;

mod transport;
pub(crate) use transport::Transport;

/// A decoded, still-opaque packet payload, as handed up from the wire
/// by [`Stream::recv`] — decoded into a concrete `SSH_MSG_*` type with
/// [`Packet::to`] once the caller knows (from the message number) what
/// to expect.
pub struct Packet(Vec<u8>);

impl Packet {
    /// Decodes this packet's payload as `T`, per the wire format §6
    /// defines for it.
    pub fn to<T>(&self) -> Result<T>
    where
        T: for<'a> BinRead<Args<'a> = ()>,
    {
        T::read(&mut std::io::Cursor::new(&self.0)).map_err(Error::from)
    }

    /// Encodes `message` as a standalone, not-yet-framed packet payload —
    /// used by higher layers (connection multiplexing) that need to
    /// queue heterogeneous message types ahead of actually writing them
    /// to the session.
    pub fn encode<'a, T>(message: &T) -> Result<Self>
    where
        T: BinWrite<Args<'a> = ()>,
    {
        let mut payload = Vec::new();
        message
            .write(&mut std::io::Cursor::new(&mut payload))
            .map_err(Error::from)?;

        Ok(Self(payload))
    }

    /// The raw, still-encoded payload bytes of this packet.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Anything a [`Stream`] can be built on: a duplex, unframed byte pipe.
/// Blanket-implemented for every `AsyncRead + AsyncWrite` type so callers
/// never need to write this bound out by hand.
pub trait Pipe: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> Pipe for T {}

/// The two directions of a negotiated key-exchange: `tx` seals packets
/// we send, `rx` opens packets we receive. Both share the same
/// `session_id`, fixed at the very first key-exchange and carried
/// across every re-key (§7.2).
pub struct TransportPair {
    pub(crate) session_id: Vec<u8>,
    pub(crate) tx: Transport,
    pub(crate) rx: Transport,
}

/// A framed, optionally-encrypted duplex stream of SSH packets, wrapping
/// any [`Pipe`]. Before the first key-exchange completes, packets are
/// sent and received in the clear (`transport` is `None`); afterwards
/// every packet is sealed/opened through the negotiated algorithms.
pub struct Stream<IO> {
    io: IO,
    timeout: Timeout,
    transport: Option<TransportPair>,
    authenticated: bool,

    /// Per-direction sequence numbers (§4.1/§6.4): strictly monotonic
    /// from the very first packet after the version exchange (the first
    /// `KEXINIT` is already sequence 0), **never** reset by a re-key —
    /// only [`Transport`] is swapped, the counters live here instead so
    /// they span every transport installed over the session's life.
    txseq: u32,
    rxseq: u32,
}

impl<IO: Pipe> Stream<IO> {
    pub(crate) fn new(io: IO, timeout: Timeout) -> Self {
        Self {
            io,
            timeout,
            transport: None,
            authenticated: false,
            txseq: 0,
            rxseq: 0,
        }
    }

    pub(crate) fn session_id(&self) -> Option<&[u8]> {
        self.transport.as_ref().map(|t| t.session_id.as_slice())
    }

    /// Installs a freshly key-exchanged [`TransportPair`], replacing any
    /// previous one (a re-key, §9.3.2). Sequence numbers are untouched.
    pub(crate) fn rekey(&mut self, transport: TransportPair) {
        self.transport = Some(transport);
    }

    /// Marks user authentication as complete, engaging any
    /// `@openssh.com` delayed-compression algorithm (§4.2.3).
    pub(crate) fn authenticated(&mut self) {
        self.authenticated = true;
    }

    /// How many bytes/packets have flowed since the last key-exchange,
    /// the larger of the two directions — used to decide when to
    /// initiate a re-key (§9.3.2).
    pub(crate) fn rekey_progress(&self) -> (u64, u64) {
        self.transport
            .as_ref()
            .map(|t| {
                (
                    t.tx.bytes_since_rekey().max(t.rx.bytes_since_rekey()),
                    t.tx.packets_since_rekey().max(t.rx.packets_since_rekey()),
                )
            })
            .unwrap_or_default()
    }

    /// Writes our [`Id`] string and reads the peer's, per §4.2. Lines
    /// before the actual identification string (as permitted by §4.2,
    /// up to a bounded count) are skipped.
    pub(crate) async fn exchange_ids(&mut self, ours: &Id) -> Result<Id> {
        self.exchange_ids_inner(ours).timeout(self.timeout).await?
    }

    async fn exchange_ids_inner(&mut self, ours: &Id) -> Result<Id> {
        let line = format!("{ours}\r\n");
        self.io.write_all(line.as_bytes()).await?;
        self.io.flush().await?;

        // §4.2: tolerate a bounded number of pre-banner lines before
        // giving up on finding the peer's identification string.
        const MAX_PREAMBLE_LINES: usize = 64;

        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        for _ in 0..MAX_PREAMBLE_LINES {
            line.clear();

            loop {
                self.io.read_exact(&mut byte).await?;
                line.push(byte[0]);

                if line.ends_with(b"\r\n") || line.ends_with(b"\n") {
                    break;
                }

                if line.len() > 255 {
                    return Err(Error::ProtocolError("identification line too long"));
                }
            }

            if line.starts_with(b"SSH-") {
                let text = String::from_utf8_lossy(&line);
                return text
                    .trim_end()
                    .parse()
                    .map_err(|_| Error::ProtocolError("malformed identification string"));
            }

            tracing::debug!("skipped pre-banner line: {}", String::from_utf8_lossy(&line).trim_end());
        }

        Err(Error::ProtocolError("too many pre-banner lines before identification string"))
    }

    /// Writes one SSH message, sealing it through the current
    /// [`TransportPair`] if key-exchange has completed.
    pub(crate) async fn send<'a, T>(&mut self, message: &T) -> Result<()>
    where
        T: BinWrite<Args<'a> = ()>,
    {
        let mut payload = Vec::new();
        message
            .write(&mut std::io::Cursor::new(&mut payload))
            .map_err(Error::from)?;

        self.send_raw(&payload).await
    }

    /// Writes one already-encoded payload, sealing it through the
    /// current [`TransportPair`] if key-exchange has completed.
    pub(crate) async fn send_raw(&mut self, payload: &[u8]) -> Result<()> {
        self.send_raw_inner(payload).timeout(self.timeout).await?
    }

    async fn send_raw_inner(&mut self, payload: &[u8]) -> Result<()> {
        let raw = match &mut self.transport {
            Some(transport) => transport.tx.seal(payload, self.authenticated, self.txseq)?,
            None => {
                // No cipher yet: the same framing `Transport::seal` uses,
                // with a block size of 8 (§6.1's minimum) since there is
                // no cipher block size to align to.
                const BLOCK_SIZE: usize = 8;

                let unpadded = 1 + payload.len();
                let mut padding_len = BLOCK_SIZE - (unpadded % BLOCK_SIZE);
                if padding_len < 4 {
                    padding_len += BLOCK_SIZE;
                }

                let mut body = Vec::with_capacity(1 + payload.len() + padding_len);
                body.push(padding_len as u8);
                body.extend_from_slice(payload);

                let mut padding = vec![0u8; padding_len];
                rand::thread_rng().fill_bytes(&mut padding);
                body.extend_from_slice(&padding);

                let len = body.len() as u32;

                let mut raw = Vec::with_capacity(4 + body.len());
                raw.extend_from_slice(&len.to_be_bytes());
                raw.extend_from_slice(&body);
                raw
            }
        };

        self.io.write_all(&raw).await?;
        self.io.flush().await?;

        self.txseq = self.txseq.wrapping_add(1);

        Ok(())
    }

    /// Reads one SSH message, opening it through the current
    /// [`TransportPair`] if key-exchange has completed.
    pub(crate) async fn recv(&mut self) -> Result<Packet> {
        self.recv_raw().timeout(self.timeout).await?.map(Packet)
    }

    /// Reads one raw (still-encoded) payload, opening it through the
    /// current [`TransportPair`] if key-exchange has completed.
    async fn recv_raw(&mut self) -> Result<Vec<u8>> {
        let payload = match &mut self.transport {
            Some(transport) => {
                let first_len = transport.rx.first_block_len();
                let mut first_block = vec![0u8; first_len];
                self.io.read_exact(&mut first_block).await?;

                let packet_length = transport.rx.decrypt_first_block(&mut first_block)?;

                let already_read = first_len.saturating_sub(4);
                let remaining = (packet_length as usize)
                    .checked_sub(already_read)
                    .ok_or(Error::ProtocolError("packet shorter than first block"))?;

                let mac_size = transport.rx.mac_size();
                let mut rest = vec![0u8; remaining + mac_size];
                self.io.read_exact(&mut rest).await?;

                let mac = rest.split_off(remaining);

                transport.rx.finish_open(packet_length, &first_block, &mut rest, &mac, self.authenticated, self.rxseq)?
            }
            None => {
                let mut len_buf = [0u8; 4];
                self.io.read_exact(&mut len_buf).await?;
                let len = u32::from_be_bytes(len_buf);

                if !(5..=35000).contains(&len) {
                    return Err(Error::ProtocolError("packet_length out of the [5, 35000] range"));
                }

                let mut body = vec![0u8; len as usize];
                self.io.read_exact(&mut body).await?;

                let padding_len = *body.first().ok_or(Error::ProtocolError("empty packet body"))? as usize;
                if padding_len < 4 {
                    return Err(Error::ProtocolError("padding shorter than the minimum of 4 bytes"));
                }
                if padding_len + 1 > body.len() {
                    return Err(Error::ProtocolError("padding longer than packet"));
                }

                body[1..body.len() - padding_len].to_vec()
            }
        };

        self.rxseq = self.rxseq.wrapping_add(1);

        Ok(payload)
    }
}
