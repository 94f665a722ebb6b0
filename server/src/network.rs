//! Server network layer: connection admission, per-connection I/O tasks, and
//! the fixed-rate tick loop.
//!
//! The tick loop is the only writer to the simulation. Connection I/O runs in
//! spawned tasks that talk to it exclusively through queues: readers push
//! decoded messages into the inbound delay queue, the loop hands outbound
//! messages to per-connection writer tasks via unbounded channels, so a slow
//! or broken peer can never stall the simulation for the other one.

use crate::game::{GameEvent, GameState};
use crate::registry::{Recipients, SessionRegistry};
use log::{debug, error, info, warn};
use shared::codec::{read_message, write_message};
use shared::delay::DelayQueue;
use shared::protocol::{GamePhase, Message};
use shared::{now_secs, STATE_BROADCAST_RATE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Events sent from connection tasks to the tick loop.
#[derive(Debug)]
enum ServerEvent {
    Disconnected { player_id: u32 },
}

/// An outbound message waiting in the delay queue together with its target.
#[derive(Debug)]
struct OutboundEnvelope {
    message: Message,
    recipients: Recipients,
}

/// Result of admitting a new connection.
#[derive(Debug, PartialEq)]
enum Admission {
    Rejected,
    Admitted { player_id: u32 },
}

/// Authoritative game server: listener, registry, simulation, delay queues.
pub struct Server {
    listener: TcpListener,
    registry: SessionRegistry,
    game: GameState,
    inbound: Arc<DelayQueue<(u32, Message)>>,
    outbound: DelayQueue<OutboundEnvelope>,
    tick_duration: Duration,
    broadcast_interval: f64,
    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    /// Binds the listener. `network_delay` is the artificial latency applied
    /// to both inbound inputs and outbound broadcasts.
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        network_delay: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            registry: SessionRegistry::new(),
            game: GameState::new(),
            inbound: Arc::new(DelayQueue::new(network_delay)),
            outbound: DelayQueue::new(network_delay),
            tick_duration,
            broadcast_interval: 1.0 / STATE_BROADCAST_RATE as f64,
            event_tx,
            event_rx,
        })
    }

    /// The actual bound address, useful when binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Registers a connection, creates its player, and queues the follow-up
    /// notices. Purely in-memory so the admission rules are testable without
    /// sockets.
    fn admit(
        &mut self,
        sender: mpsc::UnboundedSender<Message>,
        addr: SocketAddr,
        now: f64,
    ) -> Admission {
        let player_id = match self.registry.register(sender, addr) {
            Some(id) => id,
            None => return Admission::Rejected,
        };

        let (color, x, y) = {
            let player = self.game.add_player(player_id);
            (player.color, player.x, player.y)
        };

        // The assignment reply goes straight to the writer; only game traffic
        // runs through the artificial-latency queue.
        self.registry.send_to(
            player_id,
            Message::Assign {
                player_id,
                color,
                x,
                y,
            },
        );

        if self.game.can_start() {
            self.game.start();
            self.queue_broadcast(Message::GameStart { timestamp: now }, Recipients::All, now);
        } else {
            self.queue_broadcast(
                Message::Waiting {
                    message: "Waiting for another player to join...".to_string(),
                },
                Recipients::Only(player_id),
                now,
            );
        }

        Admission::Admitted { player_id }
    }

    fn queue_broadcast(&self, message: Message, recipients: Recipients, now: f64) {
        self.outbound.enqueue(
            OutboundEnvelope {
                message,
                recipients,
            },
            now,
        );
    }

    /// Wires up reader and writer tasks for an accepted connection, or turns
    /// it away with an error message when both slots are taken.
    fn handle_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        let (sender, mut outgoing) = mpsc::unbounded_channel::<Message>();
        let now = now_secs();

        match self.admit(sender, addr, now) {
            Admission::Admitted { player_id } => {
                let (read_half, mut write_half) = stream.into_split();

                tokio::spawn(async move {
                    while let Some(message) = outgoing.recv().await {
                        if let Err(e) = write_message(&mut write_half, &message).await {
                            debug!("Write to player {} failed: {}", player_id, e);
                            break;
                        }
                    }
                });

                let inbound = Arc::clone(&self.inbound);
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    Self::read_loop(read_half, player_id, inbound).await;
                    let _ = event_tx.send(ServerEvent::Disconnected { player_id });
                });
            }
            Admission::Rejected => {
                info!("Rejecting connection from {}: game is full", addr);
                tokio::spawn(async move {
                    let mut stream = stream;
                    let reply = Message::Error {
                        message: "Game is full. Only 2 players allowed.".to_string(),
                    };
                    if let Err(e) = write_message(&mut stream, &reply).await {
                        debug!("Failed to send rejection to {}: {}", addr, e);
                    }
                });
            }
        }
    }

    /// Reads frames until the connection dies, pushing each decoded message
    /// into the inbound delay queue.
    async fn read_loop(
        mut read_half: OwnedReadHalf,
        player_id: u32,
        inbound: Arc<DelayQueue<(u32, Message)>>,
    ) {
        loop {
            match read_message(&mut read_half).await {
                Ok(Some(message)) => inbound.enqueue((player_id, message), now_secs()),
                // Undecodable frame: already logged, keep the connection.
                Ok(None) => continue,
                Err(e) => {
                    debug!("Player {} connection closed: {}", player_id, e);
                    break;
                }
            }
        }
    }

    fn handle_disconnect(&mut self, player_id: u32, now: f64) {
        if !self.registry.unregister(player_id) {
            return;
        }
        self.game.remove_player(player_id);
        self.queue_broadcast(
            Message::PlayerDisconnected { player_id },
            Recipients::All,
            now,
        );
    }

    /// One iteration of the tick loop: drain delayed inputs, flush delayed
    /// broadcasts, advance the simulation, queue events and snapshots.
    fn process_tick(&mut self, now: f64, dt: f32, last_broadcast: &mut f64) {
        for (player_id, message) in self.inbound.drain_ready(now) {
            match message {
                Message::Input { dx, dy } => self.game.set_input(player_id, dx, dy),
                other => warn!("Unexpected message from player {}: {:?}", player_id, other),
            }
        }

        for envelope in self.outbound.drain_ready(now) {
            self.registry.deliver(envelope.recipients, &envelope.message);
        }

        if self.game.phase() == GamePhase::Playing && !self.registry.is_empty() {
            for event in self.game.tick(dt) {
                let GameEvent::CoinCollected {
                    player_id,
                    coin_id,
                    new_score,
                } = event;
                self.queue_broadcast(
                    Message::CoinCollected {
                        player_id,
                        coin_id,
                        new_score,
                    },
                    Recipients::All,
                    now,
                );
            }

            if self.game.phase() == GamePhase::Ended {
                self.queue_broadcast(
                    Message::GameOver {
                        winner: self.game.winner(),
                        final_scores: self.game.final_scores().into_iter().collect(),
                    },
                    Recipients::All,
                    now,
                );
            }

            if now - *last_broadcast >= self.broadcast_interval
                && self.game.phase() == GamePhase::Playing
            {
                self.queue_broadcast(self.game.snapshot(now), Recipients::All, now);
                *last_broadcast = now;
            }
        }
    }

    /// Runs the accept + tick loop until the task is cancelled.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut tick_interval = interval(self.tick_duration);
        // Overrunning a tick proceeds immediately instead of bursting.
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_tick = Instant::now();
        let mut last_broadcast = 0.0f64;
        // Cap dt so a stalled process cannot teleport players on resume.
        let max_dt = 0.05f32;

        info!("Server started");

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.handle_connection(stream, addr),
                        Err(e) => error!("Accept failed: {}", e),
                    }
                },

                event = self.event_rx.recv() => {
                    if let Some(ServerEvent::Disconnected { player_id }) = event {
                        self.handle_disconnect(player_id, now_secs());
                    }
                },

                _ = tick_interval.tick() => {
                    let tick_start = Instant::now();
                    let dt = tick_start.duration_since(last_tick).as_secs_f32().min(max_dt);
                    last_tick = tick_start;
                    self.process_tick(now_secs(), dt, &mut last_broadcast);
                },
            }
        }
    }
}
