use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::error;
use tokio::net::TcpListener;

use server::config::Config;
use server::connection::run_server;
use server::events::{run_feed_listener, EventFeed};
use server::game::GameState;
use server::players::PlayerRegistry;
use server::{API_EVENTS, GAME_EVENTS, NETWORK_EVENTS};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to bind the game server and the event feed to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Game server port
    #[clap(short, long, default_value = "5481")]
    port: u16,
    /// Event feed port
    #[clap(long, default_value = "5488")]
    feed_port: u16,
    /// Configuration file
    #[clap(short, long, default_value = "config.conf")]
    config: String,
    /// Player database file
    #[clap(long, default_value = "player_database.data")]
    players: String,
    /// Number of nodes in the shared network
    #[clap(short, long, default_value = "2000")]
    network_size: usize,
    /// Seconds between network randomization sweeps, 0 disables them
    #[clap(long, default_value = "0")]
    av_sweep_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    env_logger::Builder::new()
        .filter(Some(GAME_EVENTS), config.game_events_level)
        .filter(Some(NETWORK_EVENTS), config.network_events_level)
        .filter(Some(API_EVENTS), config.api_events_level)
        .init();

    let players = PlayerRegistry::load(&args.players)?;

    let feed = EventFeed::new(100);
    let feed_listener = TcpListener::bind((args.host.as_str(), args.feed_port)).await?;
    {
        let feed = feed.clone();
        tokio::spawn(async move {
            if let Err(e) = run_feed_listener(feed_listener, feed).await {
                error!(target: API_EVENTS, "event feed has stopped: {e}");
            }
        });
    }

    let game = Arc::new(GameState::new(players, args.network_size, feed));

    if args.av_sweep_secs > 0 {
        let game = Arc::clone(&game);
        let mut ticker = tokio::time::interval(Duration::from_secs(args.av_sweep_secs));
        tokio::spawn(async move {
            // the first tick fires immediately, skip it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                game.randomize_network().await;
            }
        });
    }

    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    run_server(listener, game).await
}
