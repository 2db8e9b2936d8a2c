use clap::Parser;
use client::input::PointerSource;
use client::network::Client;
use shared::{SimConfig, Vec3};
use std::time::{Duration, Instant};

/// Command line arguments for the headless client
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address to connect to
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    server: String,
    /// Seconds between scripted group-move commands (0 disables them)
    #[clap(short, long, default_value = "5")]
    auto_move_secs: u64,
    /// Radius of the scripted pointer orbit
    #[clap(long, default_value = "15.0")]
    orbit_radius: f32,
}

/// Scripted pointer that slowly orbits the origin, standing in for a real
/// input device in headless runs.
struct OrbitingPointer {
    started: Instant,
    radius: f32,
}

impl PointerSource for OrbitingPointer {
    fn sample_pointer(&mut self) -> Option<Vec3> {
        let t = self.started.elapsed().as_secs_f32() * 0.5;
        Some(Vec3::new(self.radius * t.cos(), 0.0, self.radius * t.sin()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let auto_command_interval = if args.auto_move_secs > 0 {
        Some(Duration::from_secs(args.auto_move_secs))
    } else {
        None
    };

    let mut client = Client::new(&args.server, SimConfig::default(), auto_command_interval).await?;

    let pointer = OrbitingPointer {
        started: Instant::now(),
        radius: args.orbit_radius,
    };

    client.run(pointer).await?;

    Ok(())
}
