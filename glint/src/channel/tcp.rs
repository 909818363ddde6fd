//! Command channel over TCP, one process per node.
//!
//! Every follower holds a single connection to the orchestrator. Frames are
//! bincode-encoded [`Frame`] values inside a length-delimited codec, so the
//! TCP stream gives per-pair ordering for free.
//!
//! # Joining
//!
//! A follower connects and sends `Hello { rank }`. The orchestrator accepts
//! connections until every rank in `1..size` has said hello, rejecting
//! duplicate or out-of-range ranks. Hellos are read concurrently, each with
//! its own timeout, so a silent connection never holds up the others.
//!
//! # Barrier
//!
//! Followers send `BarrierArrive`; once the orchestrator has collected one
//! from everyone (and reached the barrier itself) it answers each follower
//! with `BarrierRelease`.

use super::{Frame, FollowerLink, Notice, OrchestratorLink, follower_slot};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, Stream, StreamExt};
use glint_core::{Command, GlintError, Rank, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, info, warn};

type Transport = Framed<TcpStream, LengthDelimitedCodec>;

/// Pause between connection attempts while the orchestrator is not up yet.
const RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// How long a fresh connection has to introduce itself.
const HELLO_TIMEOUT: Duration = Duration::from_secs(5);

fn encode(frame: &Frame) -> Result<Bytes> {
    bincode::serde::encode_to_vec(frame, bincode::config::standard())
        .map(Bytes::from)
        .map_err(|e| GlintError::encoding(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Frame> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(frame, _)| frame)
        .map_err(|e| GlintError::encoding(e.to_string()))
}

async fn read_frame<S>(stream: &mut S) -> Result<Frame>
where
    S: Stream<Item = std::io::Result<bytes::BytesMut>> + Unpin,
{
    match stream.next().await {
        Some(Ok(bytes)) => decode(&bytes),
        Some(Err(e)) => Err(e.into()),
        None => Err(GlintError::channel("peer closed the connection")),
    }
}

fn unexpected(expected: &str, got: Frame) -> GlintError {
    GlintError::protocol(format!("expected {}, got {}", expected, got.kind()))
}

// ==============================================================================
// Orchestrator
// ==============================================================================

#[derive(Debug)]
struct Peer {
    rank: Rank,
    sink: Mutex<SplitSink<Transport, Bytes>>,
    stream: Mutex<SplitStream<Transport>>,
}

impl Peer {
    async fn write(&self, frame: Frame) -> Result<()> {
        let bytes = encode(&frame)?;
        self.sink.lock().await.send(bytes).await.map_err(|e| {
            GlintError::channel(format!("write to follower {}: {}", self.rank, e))
        })
    }

    async fn read(&self) -> Result<Frame> {
        read_frame(&mut *self.stream.lock().await).await
    }
}

/// Rank 0 over TCP.
#[derive(Debug)]
pub struct TcpOrchestrator {
    size: usize,
    /// Indexed by `rank - 1`
    peers: Vec<Peer>,
}

impl TcpOrchestrator {
    /// Listen on `addr` and wait for a full cluster of `size` nodes.
    pub async fn bind(addr: impl ToSocketAddrs, size: usize, join_timeout: Duration) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);
        Self::accept(listener, size, join_timeout).await
    }

    /// Accept followers on an existing listener until every rank has joined.
    pub async fn accept(listener: TcpListener, size: usize, join_timeout: Duration) -> Result<Self> {
        if size < 2 {
            return Err(GlintError::config("a cluster needs at least 2 nodes"));
        }

        let joined = tokio::time::timeout(join_timeout, Self::gather(&listener, size)).await;
        let mut slots = match joined {
            Ok(slots) => slots?,
            Err(_) => {
                return Err(GlintError::channel(format!(
                    "cluster did not form within {:?}",
                    join_timeout
                )));
            }
        };

        let peers = slots
            .drain(..)
            .map(|slot| slot.ok_or_else(|| GlintError::channel("follower slot left empty")))
            .collect::<Result<Vec<_>>>()?;

        info!("All {} followers joined", peers.len());
        Ok(Self { size, peers })
    }

    async fn gather(listener: &TcpListener, size: usize) -> Result<Vec<Option<Peer>>> {
        let mut slots: Vec<Option<Peer>> = (1..size).map(|_| None).collect();
        let mut pending = JoinSet::new();
        let mut joined = 0;

        while joined < size - 1 {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        pending.spawn(async move { (addr, Self::handshake(stream).await) });
                    }
                    Err(e) => warn!("Failed to accept a connection: {}", e),
                },
                Some(done) = pending.join_next(), if !pending.is_empty() => match done {
                    Ok((addr, outcome)) => {
                        if Self::admit(&mut slots, size, addr, outcome) {
                            joined += 1;
                        }
                    }
                    Err(e) => warn!("Handshake task failed: {}", e),
                },
            }
        }

        Ok(slots)
    }

    /// Read the hello from a fresh connection.
    async fn handshake(stream: TcpStream) -> Result<(Rank, Transport)> {
        stream.set_nodelay(true)?;
        let mut transport = Framed::new(stream, LengthDelimitedCodec::new());

        let frame = tokio::time::timeout(HELLO_TIMEOUT, read_frame(&mut transport))
            .await
            .map_err(|_| GlintError::channel(format!("no hello within {:?}", HELLO_TIMEOUT)))??;

        match frame {
            Frame::Hello { rank } => Ok((rank, transport)),
            other => Err(unexpected("hello", other)),
        }
    }

    /// Seat a handshaken follower, or drop the connection.
    fn admit(
        slots: &mut [Option<Peer>],
        size: usize,
        addr: SocketAddr,
        outcome: Result<(Rank, Transport)>,
    ) -> bool {
        let (rank, transport) = match outcome {
            Ok(joined) => joined,
            Err(e) => {
                warn!("Dropping {}: {}", addr, e);
                return false;
            }
        };

        let slot = match follower_slot(rank, size) {
            Ok(slot) if slots[slot].is_none() => slot,
            Ok(_) => {
                warn!("Dropping {}: rank {} already joined", addr, rank);
                return false;
            }
            Err(e) => {
                warn!("Dropping {}: {}", addr, e);
                return false;
            }
        };

        debug!("Follower {} joined from {}", rank, addr);
        let (sink, stream) = transport.split();
        slots[slot] = Some(Peer {
            rank,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        });
        true
    }

    fn peer(&self, rank: Rank) -> Result<&Peer> {
        Ok(&self.peers[follower_slot(rank, self.size)?])
    }
}

#[async_trait]
impl OrchestratorLink for TcpOrchestrator {
    fn cluster_size(&self) -> usize {
        self.size
    }

    async fn broadcast(&self, command: Command) -> Result<()> {
        for peer in &self.peers {
            peer.write(Frame::Command(command)).await?;
        }
        Ok(())
    }

    async fn send(&self, target: Rank, command: Command) -> Result<()> {
        self.peer(target)?.write(Frame::Command(command)).await
    }

    async fn recv_ack(&self, from: Rank) -> Result<()> {
        match self.peer(from)?.read().await? {
            Frame::Ack { rank } if rank == from => Ok(()),
            other => Err(unexpected("ack", other)),
        }
    }

    async fn barrier(&self) -> Result<()> {
        for peer in &self.peers {
            match peer.read().await? {
                Frame::BarrierArrive { rank } if rank == peer.rank => {}
                other => return Err(unexpected("barrier arrival", other)),
            }
        }
        for peer in &self.peers {
            peer.write(Frame::BarrierRelease).await?;
        }
        Ok(())
    }

    async fn announce(&self, notice: Notice) -> Result<()> {
        for peer in &self.peers {
            peer.write(Frame::Notice(notice)).await?;
        }
        Ok(())
    }
}

// ==============================================================================
// Follower
// ==============================================================================

/// One follower over TCP.
#[derive(Debug)]
pub struct TcpFollower {
    rank: Rank,
    transport: Transport,
}

impl TcpFollower {
    /// Connect once and introduce ourselves.
    pub async fn connect(addr: impl ToSocketAddrs, rank: Rank) -> Result<Self> {
        if rank == 0 {
            return Err(GlintError::config("rank 0 is the orchestrator, not a follower"));
        }

        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let mut follower = Self {
            rank,
            transport: Framed::new(stream, LengthDelimitedCodec::new()),
        };
        follower.write(Frame::Hello { rank }).await?;
        Ok(follower)
    }

    /// Keep trying to connect until the orchestrator answers or `patience` runs out.
    pub async fn connect_with_retry(addr: &str, rank: Rank, patience: Duration) -> Result<Self> {
        let deadline = tokio::time::Instant::now() + patience;
        loop {
            match Self::connect(addr, rank).await {
                Ok(follower) => {
                    info!("Follower {} connected to {}", rank, addr);
                    return Ok(follower);
                }
                Err(e) if e.is_config() => return Err(e),
                Err(e) if tokio::time::Instant::now() + RETRY_INTERVAL < deadline => {
                    debug!("Orchestrator at {} not reachable yet: {}", addr, e);
                    tokio::time::sleep(RETRY_INTERVAL).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn write(&mut self, frame: Frame) -> Result<()> {
        let bytes = encode(&frame)?;
        self.transport
            .send(bytes)
            .await
            .map_err(|e| GlintError::channel(format!("write to orchestrator: {}", e)))
    }

    async fn read(&mut self) -> Result<Frame> {
        read_frame(&mut self.transport).await
    }
}

#[async_trait]
impl FollowerLink for TcpFollower {
    fn rank(&self) -> Rank {
        self.rank
    }

    async fn recv(&mut self) -> Result<Command> {
        match self.read().await? {
            Frame::Command(command) => Ok(command),
            other => Err(unexpected("command", other)),
        }
    }

    async fn ack(&mut self) -> Result<()> {
        let rank = self.rank;
        self.write(Frame::Ack { rank }).await
    }

    async fn barrier(&mut self) -> Result<()> {
        let rank = self.rank;
        self.write(Frame::BarrierArrive { rank }).await?;
        match self.read().await? {
            Frame::BarrierRelease => Ok(()),
            other => Err(unexpected("barrier release", other)),
        }
    }

    async fn next_notice(&mut self) -> Result<Notice> {
        match self.read().await? {
            Frame::Notice(notice) => Ok(notice),
            other => Err(unexpected("notice", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_codec_round_trip() {
        let frames = [
            Frame::Hello { rank: 7 },
            Frame::Command(Command::raster(30, 0xF000_000F)),
            Frame::Command(Command::sentinel()),
            Frame::BarrierRelease,
            Frame::Notice(Notice::Finish),
        ];
        for frame in frames {
            assert_eq!(decode(&encode(&frame).unwrap()).unwrap(), frame);
        }
    }

    #[test]
    fn test_garbage_is_encoding_error() {
        let err = decode(&[0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, GlintError::Encoding(_)));
    }
}
