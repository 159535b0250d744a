//! In-memory dialer for unit tests

use crate::socks::types::TargetAddr;
use crate::transport::{Dialer, Upstream};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

#[derive(Debug)]
enum Outcome {
    Connect {
        local_addr: Option<SocketAddr>,
        peers: mpsc::UnboundedSender<DuplexStream>,
    },
    Fail(io::ErrorKind),
}

/// Dialer that counts attempts and hands the far end of each
/// connection to the test through a channel
#[derive(Debug)]
pub(crate) struct FakeDialer {
    outcome: Outcome,
    dials: Arc<AtomicUsize>,
    last_target: Mutex<Option<TargetAddr>>,
}

impl FakeDialer {
    pub(crate) fn connecting(
        local_addr: Option<SocketAddr>,
    ) -> (Self, mpsc::UnboundedReceiver<DuplexStream>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dialer = FakeDialer {
            outcome: Outcome::Connect {
                local_addr,
                peers: tx,
            },
            dials: Arc::new(AtomicUsize::new(0)),
            last_target: Mutex::new(None),
        };
        (dialer, rx)
    }

    pub(crate) fn failing(kind: io::ErrorKind) -> Self {
        FakeDialer {
            outcome: Outcome::Fail(kind),
            dials: Arc::new(AtomicUsize::new(0)),
            last_target: Mutex::new(None),
        }
    }

    /// Shared dial counter, usable after the dialer is moved into a service
    pub(crate) fn counter(&self) -> Arc<AtomicUsize> {
        self.dials.clone()
    }

    pub(crate) fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    pub(crate) fn last_target(&self) -> Option<TargetAddr> {
        self.last_target.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dialer for FakeDialer {
    type Stream = DuplexStream;

    async fn dial(&self, target: &TargetAddr) -> io::Result<Upstream<DuplexStream>> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        *self.last_target.lock().unwrap() = Some(target.clone());

        match &self.outcome {
            Outcome::Connect { local_addr, peers } => {
                let (stream, peer) = tokio::io::duplex(4096);
                // A dropped receiver just means the test doesn't need the peer
                let _ = peers.send(peer);
                Ok(Upstream {
                    stream,
                    local_addr: *local_addr,
                })
            }
            Outcome::Fail(kind) => Err(io::Error::new(*kind, "fake dial failure")),
        }
    }
}
