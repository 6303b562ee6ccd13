#![cfg(not(tarpaulin_include))]

use std::env;
use std::path::PathBuf;

use true608::app;

/// Main entry point for the web application.
///
/// Usage: `website [port] [data_dir]` — defaults to port 3000 and the
/// `database` directory. Logs the LAN address so field technicians can
/// reach the entry form from a phone on the same network.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();

    let mut port: u16 = 3000;
    let mut data_dir = PathBuf::from("database");

    if args.len() >= 2 {
        port = args[1].parse().unwrap_or(3000);
    }
    if args.len() >= 3 {
        data_dir = PathBuf::from(&args[2]);
    }

    if let Ok(ip) = local_ip_address::local_ip() {
        log::info!("field entry form reachable at http://{ip}:{port}/log");
    }

    app::run(port, data_dir).await
}
