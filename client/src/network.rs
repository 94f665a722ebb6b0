//! Client network session: TCP I/O tasks, inbound delay queue, throttled
//! input sending, and connection lifecycle callbacks.
//!
//! The render/update loop never blocks on the network. Received messages land
//! in a delay queue (adding the artificial latency on top of real transport
//! latency) and are drained non-blockingly each frame; outbound inputs go
//! through an unbounded channel to a writer task. Every transport failure is
//! caught here and surfaces only as connection state plus a single disconnect
//! callback — except during a caller-initiated stop, which fires no callback.

use log::{debug, info, warn};
use shared::codec::{read_message, write_message};
use shared::delay::DelayQueue;
use shared::protocol::Message;
use shared::{now_secs, INPUT_SEND_RATE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// Rate limiter for outbound input messages.
///
/// Steady-state input repeats are capped at the configured sends per second;
/// a forced send (used when the direction actually changes) bypasses the cap
/// so direction changes reach the server with minimum latency.
#[derive(Debug)]
pub struct InputThrottle {
    interval: f64,
    last_send: f64,
}

impl InputThrottle {
    pub fn new(sends_per_second: u32) -> Self {
        Self {
            interval: 1.0 / sends_per_second as f64,
            last_send: f64::MIN,
        }
    }

    /// Whether a send is allowed at `now`; records the send time if so.
    pub fn allow(&mut self, now: f64, force: bool) -> bool {
        if !force && now - self.last_send < self.interval {
            return false;
        }
        self.last_send = now;
        true
    }
}

/// Lifecycle notifications injected by the owner of the session.
#[derive(Default)]
pub struct SessionCallbacks {
    pub on_connect: Option<Box<dyn Fn() + Send + Sync>>,
    pub on_disconnect: Option<Box<dyn Fn() + Send + Sync>>,
}

/// Connection to the game server, usable from a cooperative single-threaded
/// game loop: all methods are non-blocking.
pub struct ClientSession {
    inbound: Arc<DelayQueue<Message>>,
    outgoing_tx: mpsc::UnboundedSender<Message>,
    connected: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    throttle: InputThrottle,
    supervisor: Option<JoinHandle<()>>,
}

impl ClientSession {
    /// Starts connecting to `addr` in the background and returns immediately.
    ///
    /// Connection establishment failures are not returned here: any terminal
    /// transport condition (refused, closed, reset) marks the session
    /// disconnected and fires the disconnect callback exactly once.
    pub fn connect(addr: String, network_delay: Duration, callbacks: SessionCallbacks) -> Self {
        let inbound = Arc::new(DelayQueue::new(network_delay));
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let stopping = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());

        let supervisor = tokio::spawn(Self::supervise(
            addr,
            Arc::clone(&inbound),
            outgoing_rx,
            Arc::clone(&connected),
            Arc::clone(&stopping),
            Arc::clone(&shutdown),
            callbacks,
        ));

        Self {
            inbound,
            outgoing_tx,
            connected,
            stopping,
            shutdown,
            throttle: InputThrottle::new(INPUT_SEND_RATE),
            supervisor: Some(supervisor),
        }
    }

    async fn supervise(
        addr: String,
        inbound: Arc<DelayQueue<Message>>,
        outgoing_rx: mpsc::UnboundedReceiver<Message>,
        connected: Arc<AtomicBool>,
        stopping: Arc<AtomicBool>,
        shutdown: Arc<Notify>,
        callbacks: SessionCallbacks,
    ) {
        let stream = tokio::select! {
            result = TcpStream::connect(&addr) => result,
            _ = shutdown.notified() => return,
        };

        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Could not connect to {}: {}", addr, e);
                if !stopping.load(Ordering::SeqCst) {
                    if let Some(cb) = &callbacks.on_disconnect {
                        cb();
                    }
                }
                return;
            }
        };

        info!("Connected to {}", addr);
        connected.store(true, Ordering::SeqCst);
        if let Some(cb) = &callbacks.on_connect {
            cb();
        }

        let (read_half, write_half) = stream.into_split();
        let mut reader = tokio::spawn(Self::read_loop(read_half, inbound));
        let mut writer = tokio::spawn(Self::write_loop(write_half, outgoing_rx));

        // Either loop ending means the connection is done; a shutdown signal
        // tears both down without waiting on the peer.
        tokio::select! {
            _ = &mut reader => writer.abort(),
            _ = &mut writer => reader.abort(),
            _ = shutdown.notified() => {
                reader.abort();
                writer.abort();
            }
        }

        connected.store(false, Ordering::SeqCst);
        if !stopping.load(Ordering::SeqCst) {
            if let Some(cb) = &callbacks.on_disconnect {
                cb();
            }
        }
    }

    async fn read_loop(mut read_half: OwnedReadHalf, inbound: Arc<DelayQueue<Message>>) {
        loop {
            match read_message(&mut read_half).await {
                Ok(Some(message)) => inbound.enqueue(message, now_secs()),
                // Undecodable frame: dropped, connection stays up.
                Ok(None) => continue,
                Err(e) => {
                    debug!("Server connection closed: {}", e);
                    break;
                }
            }
        }
    }

    async fn write_loop(
        mut write_half: OwnedWriteHalf,
        mut outgoing_rx: mpsc::UnboundedReceiver<Message>,
    ) {
        while let Some(message) = outgoing_rx.recv().await {
            if let Err(e) = write_message(&mut write_half, &message).await {
                debug!("Send to server failed: {}", e);
                break;
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queues an input message, throttled to the input send rate unless
    /// `force` is set.
    pub fn send_input(&mut self, dx: i8, dy: i8, force: bool) {
        if !self.throttle.allow(now_secs(), force) {
            return;
        }
        // A closed channel just means the writer is gone; the disconnect
        // callback carries the news.
        let _ = self.outgoing_tx.send(Message::Input { dx, dy });
    }

    /// Drains every received message whose artificial delay has elapsed.
    pub fn poll_messages(&self, now: f64) -> Vec<Message> {
        self.inbound.drain_ready(now)
    }

    /// Stops the session: signals the I/O tasks, waits briefly for them to
    /// wind down, and guarantees no disconnect callback for this stop.
    pub async fn stop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
        if let Some(supervisor) = self.supervisor.take() {
            if tokio::time::timeout(Duration::from_secs(1), supervisor)
                .await
                .is_err()
            {
                warn!("Session supervisor did not stop in time");
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        self.inbound.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::PlayerColor;
    use std::sync::atomic::AtomicUsize;
    use tokio::net::TcpListener;

    #[test]
    fn test_throttle_caps_steady_state_rate() {
        let mut throttle = InputThrottle::new(20);
        assert!(throttle.allow(100.0, false));
        assert!(!throttle.allow(100.01, false));
        assert!(!throttle.allow(100.049, false));
        assert!(throttle.allow(100.05, false));
    }

    #[test]
    fn test_throttle_force_bypasses_cap() {
        let mut throttle = InputThrottle::new(20);
        assert!(throttle.allow(100.0, false));
        assert!(throttle.allow(100.001, true));
        // A forced send still resets the steady-state window.
        assert!(!throttle.allow(100.002, false));
    }

    #[tokio::test]
    async fn test_received_messages_respect_delay_queue() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut session = ClientSession::connect(
            addr.to_string(),
            Duration::from_millis(50),
            SessionCallbacks::default(),
        );

        let (mut server_side, _) = listener.accept().await.unwrap();
        let msg = Message::Assign {
            player_id: 1,
            color: PlayerColor::Blue,
            x: 100.0,
            y: 100.0,
        };
        write_message(&mut server_side, &msg).await.unwrap();

        // Give the read loop a moment to enqueue.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let received_at = now_secs();

        // Ready strictly before the artificial delay has elapsed: nothing.
        assert!(session.poll_messages(received_at - 0.01).is_empty());

        tokio::time::sleep(Duration::from_millis(60)).await;
        let ready = session.poll_messages(now_secs());
        assert_eq!(ready.len(), 1);
        assert!(matches!(ready[0], Message::Assign { player_id: 1, .. }));

        session.stop().await;
    }

    #[tokio::test]
    async fn test_input_reaches_server_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut session = ClientSession::connect(
            addr.to_string(),
            Duration::from_millis(0),
            SessionCallbacks::default(),
        );

        let (mut server_side, _) = listener.accept().await.unwrap();
        session.send_input(1, -1, true);

        match read_message(&mut server_side).await.unwrap() {
            Some(Message::Input { dx, dy }) => {
                assert_eq!((dx, dy), (1, -1));
            }
            other => panic!("Unexpected message: {:?}", other),
        }

        session.stop().await;
    }

    #[tokio::test]
    async fn test_disconnect_callback_fires_once_on_server_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let disconnects = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&disconnects);
        let mut session = ClientSession::connect(
            addr.to_string(),
            Duration::from_millis(0),
            SessionCallbacks {
                on_connect: None,
                on_disconnect: Some(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            },
        );

        let (server_side, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(session.is_connected());

        drop(server_side);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!session.is_connected());
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);

        session.stop().await;
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refused_connection_notifies_disconnect() {
        // Bind then drop to find a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let disconnects = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&disconnects);
        let mut session = ClientSession::connect(
            addr.to_string(),
            Duration::from_millis(0),
            SessionCallbacks {
                on_connect: None,
                on_disconnect: Some(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            },
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!session.is_connected());
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);

        session.stop().await;
    }

    #[tokio::test]
    async fn test_self_initiated_stop_fires_no_callback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let disconnects = Arc::new(AtomicUsize::new(0));
        let connects = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&disconnects);
        let c = Arc::clone(&connects);
        let mut session = ClientSession::connect(
            addr.to_string(),
            Duration::from_millis(0),
            SessionCallbacks {
                on_connect: Some(Box::new(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })),
                on_disconnect: Some(Box::new(move || {
                    d.fetch_add(1, Ordering::SeqCst);
                })),
            },
        );

        let (_server_side, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        session.stop().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(disconnects.load(Ordering::SeqCst), 0);
        assert!(!session.is_connected());
    }
}
