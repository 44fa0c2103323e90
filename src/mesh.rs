//! The Mesh Connector: turns an address file and a party index into one
//! [`crate::peer_link::PeerLink`] per other party, fully connected, with no
//! risk of two parties deadlocking on a simultaneous connect.
//!
//! Grounded in
//! `examples/iwlabpsi-preprocessing_mpsi_with_vole/src/channel_utils/tcp_channel.rs`'s
//! `create_tcp_channel_for_party`: each party binds its own listening port
//! first, then connects out to every lower-indexed party (which is already
//! listening) and accepts from every higher-indexed one. Generalized from
//! that function's fixed `127.0.0.1:base_port+i` convention to arbitrary
//! `host:port` addresses read from the address file, and given a bounded
//! connect retry loop since a real peer's listener may not be up yet.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::peer_link::PeerLink;

/// How persistently to retry a connection to a peer whose listener may not
/// have come up yet.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Connect to every other party named in `addrs`, returning one
/// [`PeerLink`] per peer, sorted by peer index.
pub fn connect_mesh(
    my_party: usize,
    addrs: &[String],
    retry: RetryPolicy,
) -> Result<Vec<PeerLink<TcpStream>>, EngineError> {
    let num_parties = addrs.len();
    let listener = TcpListener::bind(&addrs[my_party]).map_err(EngineError::BindFailed)?;
    info!(party = my_party, addr = %addrs[my_party], "listening");

    let mut links = Vec::with_capacity(num_parties - 1);

    for other in 0..my_party {
        let stream = connect_with_retry(&addrs[other], retry)?;
        let stream = handshake_as_connector(stream, my_party, other)?;
        links.push(PeerLink::new(other, stream));
    }

    let mut remaining = num_parties - 1 - my_party;
    while remaining > 0 {
        let (stream, _) = listener.accept().map_err(EngineError::AcceptFailed)?;
        let (other, stream) = handshake_as_acceptor(stream, my_party)?;
        links.push(PeerLink::new(other, stream));
        remaining -= 1;
    }

    links.sort_by_key(|link| link.other);
    debug!(party = my_party, peers = links.len(), "mesh connected");
    Ok(links)
}

fn connect_with_retry(addr: &str, retry: RetryPolicy) -> Result<TcpStream, EngineError> {
    let mut last_err = None;
    for attempt in 0..retry.max_attempts {
        match TcpStream::connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                last_err = Some(e);
                debug!(addr, attempt, "connect attempt failed, retrying");
                thread::sleep(retry.backoff);
            }
        }
    }
    Err(EngineError::ConnectRefused {
        addr: format!("{addr} ({})", last_err.unwrap()),
    })
}

/// The connecting side of the handshake: announce our index, and confirm
/// the peer is who the address file said it would be.
fn handshake_as_connector(
    mut stream: TcpStream,
    me: usize,
    expected_peer: usize,
) -> Result<TcpStream, EngineError> {
    stream
        .write_u64::<BigEndian>(me as u64)
        .map_err(|_| EngineError::Disconnected)?;
    let peer_index = stream
        .read_u64::<BigEndian>()
        .map_err(|_| EngineError::Disconnected)? as usize;
    if peer_index != expected_peer {
        return Err(EngineError::ProtocolViolation(format!(
            "expected party {expected_peer} at this address, handshake announced party {peer_index}"
        )));
    }
    Ok(stream)
}

/// The accepting side of the handshake: learn who connected, then announce
/// our own index.
fn handshake_as_acceptor(
    mut stream: TcpStream,
    me: usize,
) -> Result<(usize, TcpStream), EngineError> {
    let peer_index = stream
        .read_u64::<BigEndian>()
        .map_err(|_| EngineError::Disconnected)? as usize;
    stream
        .write_u64::<BigEndian>(me as u64)
        .map_err(|_| EngineError::Disconnected)?;
    Ok((peer_index, stream))
}
