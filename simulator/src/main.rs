mod telemetry;

use chrono::Utc;
use clap::Parser;
use std::time::Duration;
use telemetry::{assign_role, generate_reading, DeviceNode, Role};
use tracing::{error, info, warn};

/// Writes simulated device heartbeats into a Firebase Realtime Database.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Realtime Database base URL
    #[arg(long, env = "FIREBASE_DATABASE_URL")]
    database_url: String,

    /// Path of the device collection
    #[arg(long, env = "REGISTRY_PATH", default_value = "devices")]
    path: String,

    /// Value for the `auth` query parameter
    #[arg(long, env = "REGISTRY_AUTH")]
    auth: Option<String>,

    /// Number of simulated devices
    #[arg(long, env = "DEVICES", default_value_t = 20)]
    devices: usize,

    /// Seconds between report rounds
    #[arg(long, env = "REPORT_INTERVAL_SECS", default_value_t = 30)]
    interval_secs: u64,

    /// Share of devices that report once and then go quiet
    #[arg(long, default_value_t = 0.2)]
    silent_ratio: f64,

    /// Share of devices that never register a push token
    #[arg(long, default_value_t = 0.1)]
    tokenless_ratio: f64,
}

struct SimDevice {
    id: String,
    role: Role,
    token: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    info!("Starting device simulator");
    info!(
        "Database: {}/{}, devices: {}, interval: {}s",
        args.database_url.trim_end_matches('/'),
        args.path,
        args.devices,
        args.interval_secs
    );

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let mut rng = rand::thread_rng();
    let fleet: Vec<SimDevice> = (0..args.devices)
        .map(|i| {
            let role = assign_role(&mut rng, args.silent_ratio, args.tokenless_ratio);
            SimDevice {
                id: format!("dev-{}", i),
                role,
                token: (role != Role::Tokenless).then(|| format!("sim-token-{}", i)),
            }
        })
        .collect();

    let silent = fleet.iter().filter(|d| d.role == Role::Silent).count();
    let tokenless = fleet.iter().filter(|d| d.role == Role::Tokenless).count();
    info!("{} silent and {} tokenless devices in the fleet", silent, tokenless);

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut round = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("Received shutdown signal");
                break;
            }
        }

        let now = Utc::now().timestamp();
        let writes: Vec<(String, DeviceNode)> = fleet
            .iter()
            .filter(|device| device.role != Role::Silent || round == 0)
            .map(|device| {
                let node = generate_reading(&mut rng, device.token.clone(), now);
                (device.id.clone(), node)
            })
            .collect();

        // A slow round must not hold up shutdown.
        let written = tokio::select! {
            written = write_round(&client, &args, &writes) => written,
            _ = &mut shutdown => {
                info!("Received shutdown signal");
                break;
            }
        };

        round += 1;
        info!("Round {}: wrote {} device records", round, written);
    }
}

async fn write_round(client: &reqwest::Client, args: &Args, writes: &[(String, DeviceNode)]) -> usize {
    let mut written = 0usize;

    for (device_id, node) in writes {
        let url = format!(
            "{}/{}/{}.json",
            args.database_url.trim_end_matches('/'),
            args.path.trim_matches('/'),
            device_id
        );

        let mut request = client.put(&url).json(node);
        if let Some(auth) = &args.auth {
            request = request.query(&[("auth", auth)]);
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => written += 1,
            Ok(resp) => warn!("Write for {} rejected: HTTP {}", device_id, resp.status()),
            Err(e) => warn!("Write for {} failed: {}", device_id, e),
        }
    }

    written
}
