use std::io;
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc;

/// A frame-oriented connection to one peer.
///
/// `recv` must be cancel safe: the relay polls both legs with `select!` and
/// drops whichever future loses.
pub trait Connection: Send {
    /// Next frame, or `None` once the peer is gone
    fn recv(&mut self) -> impl Future<Output = io::Result<Option<Bytes>>> + Send;

    fn send(&mut self, frame: Bytes) -> impl Future<Output = io::Result<()>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;

    fn remote_addr(&self) -> SocketAddr;
}

/// In-process connection over tokio channels
#[derive(Debug)]
pub struct ChannelConnection {
    tx: Option<mpsc::UnboundedSender<Bytes>>,
    rx: mpsc::UnboundedReceiver<Bytes>,
    remote_addr: SocketAddr,
}

impl ChannelConnection {
    /// Two connected ends; each reports the other's address as its remote
    #[must_use]
    pub fn pair(a: SocketAddr, b: SocketAddr) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Some(a_tx),
                rx: a_rx,
                remote_addr: b,
            },
            Self {
                tx: Some(b_tx),
                rx: b_rx,
                remote_addr: a,
            },
        )
    }
}

impl Connection for ChannelConnection {
    async fn recv(&mut self) -> io::Result<Option<Bytes>> {
        Ok(self.rx.recv().await)
    }

    async fn send(&mut self, frame: Bytes) -> io::Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))?;
        tx.send(frame)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer hung up"))
    }

    async fn close(&mut self) {
        self.tx = None;
        self.rx.close();
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs() -> (SocketAddr, SocketAddr) {
        (
            "127.0.0.1:1".parse().unwrap(),
            "127.0.0.1:2".parse().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_pair_delivers_frames() {
        let (a_addr, b_addr) = addrs();
        let (mut a, mut b) = ChannelConnection::pair(a_addr, b_addr);
        assert_eq!(a.remote_addr(), b_addr);

        a.send(Bytes::from_static(&[0xFE, 1])).await.unwrap();
        assert_eq!(b.recv().await.unwrap().unwrap().as_ref(), [0xFE, 1]);
    }

    #[tokio::test]
    async fn test_close_ends_the_stream() {
        let (a_addr, b_addr) = addrs();
        let (mut a, mut b) = ChannelConnection::pair(a_addr, b_addr);

        a.close().await;
        assert!(b.recv().await.unwrap().is_none());
        assert!(a.send(Bytes::new()).await.is_err());
    }
}
