use clap::Parser;
use log::info;
use server::network::Server;
use shared::SimConfig;
use std::time::Duration;

/// Command line arguments for the authoritative server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Tick rate (simulation updates per second)
    #[clap(short, long, default_value = "30")]
    tick_rate: u32,
    /// Maximum number of concurrent clients
    #[clap(short, long, default_value = "16")]
    max_clients: usize,
    /// Unit movement speed in world units per second
    #[clap(long, default_value_t = shared::UNIT_SPEED)]
    unit_speed: f32,
    /// Planar distance at which a moving unit counts as arrived
    #[clap(long, default_value_t = shared::ARRIVAL_RADIUS)]
    arrival_radius: f32,
    /// Largest formation offset preserved by a group move
    #[clap(long, default_value_t = shared::MAX_FORMATION_OFFSET)]
    max_formation_offset: f32,
    /// Units spawned per player
    #[clap(long, default_value_t = shared::UNITS_PER_PLAYER)]
    units_per_player: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let config = SimConfig {
        unit_speed: args.unit_speed,
        arrival_radius: args.arrival_radius,
        max_formation_offset: args.max_formation_offset,
        units_per_player: args.units_per_player,
        ..SimConfig::default()
    };

    let address = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f32(1.0 / args.tick_rate as f32);

    let mut server = Server::new(&address, tick_duration, args.max_clients, config).await?;

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
