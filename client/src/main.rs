//! Headless client binary.
//!
//! Joins a server, wanders randomly once the game starts, and logs the
//! authoritative events it sees. Useful for exercising a server without a
//! graphical front end.

mod game;
mod interpolation;
mod network;
mod prediction;

use clap::Parser;
use game::ClientGame;
use log::info;
use network::{ClientSession, SessionCallbacks};
use rand::Rng;
use shared::now_secs;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about = "Headless coin collector client")]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:8765")]
    server: String,

    /// Artificial one-way receive delay in milliseconds
    #[arg(short, long, default_value_t = shared::NETWORK_DELAY_MS)]
    delay: u64,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    info!("Connecting to {}", args.server);
    let mut session = ClientSession::connect(
        args.server,
        Duration::from_millis(args.delay),
        SessionCallbacks {
            on_connect: Some(Box::new(|| info!("Connection established"))),
            on_disconnect: Some(Box::new(|| info!("Connection lost"))),
        },
    );

    let mut game = ClientGame::new();
    let mut rng = rand::thread_rng();
    let mut direction: (i8, i8) = (0, 0);
    let mut next_turn = now_secs();

    let frame = Duration::from_millis(1000 / 60);
    let mut ticker = tokio::time::interval(frame);
    let mut last_frame = now_secs();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }

        let now = now_secs();
        let dt = (now - last_frame) as f32;
        last_frame = now;

        for message in session.poll_messages(now) {
            game.handle_message(message);
        }

        if game.is_over() {
            let view = game.frame(now);
            info!("Winner: {:?}, final scores: {:?}", view.winner, game.final_scores());
            break;
        }

        // Pick a fresh random direction every couple of seconds.
        if now >= next_turn {
            direction = (rng.gen_range(-1..=1), rng.gen_range(-1..=1));
            next_turn = now + rng.gen_range(1.0..3.0);
        }

        game.update(direction.0, direction.1, dt, &mut session);

        let view = game.frame(now);
        if view.started {
            log::debug!(
                "t={:.1} pos=({:.0}, {:.0}) score={} coins={}",
                view.game_time,
                view.local_position.0,
                view.local_position.1,
                view.local_score,
                view.coins.len()
            );
        }
    }

    session.stop().await;
}
