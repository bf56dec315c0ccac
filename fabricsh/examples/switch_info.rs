//! Read-only tour of a switch: identity, ports, fabric members and zoning.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example switch_info -- --host san-sw1 --user admin --password secret
//! ```
//!
//! Select a logical switch on a virtual fabric chassis with `--fid 10`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use fabricsh::SwitchBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut builder = SwitchBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .timeout(Duration::from_secs(args.timeout));
    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        eprintln!("Error: Must provide either --password or --key");
        std::process::exit(1);
    }
    if let Some(fid) = args.fid {
        builder = builder.fid(fid);
    }

    println!("Connecting to {}:{}...", args.host, args.port);
    let mut switch = builder.connect().await?;

    switch.open().await?;
    println!("Virtual fabric: {}", switch.vf(false).await?);
    println!("Name:     {}", switch.name(false).await?.unwrap_or_default());
    println!("WWN:      {}", switch.wwn(false).await?.unwrap_or_default());
    println!("Domain:   {}", switch.domain(false).await?.unwrap_or_default());
    println!("Firmware: {}", switch.firmware(false).await?.unwrap_or_default());

    println!("\nPorts");
    println!("{}", "-".repeat(50));
    for port in switch.ports(false).await? {
        println!(
            "{:>4} {:<8} {:<5} {:<12} {}",
            port.index, port.address, port.speed, port.state, port.comment
        );
    }

    println!("\nFabric");
    println!("{}", "-".repeat(50));
    for member in switch.fabric(false).await? {
        let marker = if member.local { "*" } else { " " };
        println!("{marker}{:>3} {} {}", member.domain_id, member.wwn, member.name);
    }

    println!("\nZoning");
    println!("{}", "-".repeat(50));
    match switch.effective_configuration(false, false).await? {
        Some(cfg) => println!("Effective configuration: {}", cfg.name()),
        None => println!("No effective configuration"),
    }
    for zone in switch.zones(false).await? {
        let state = if zone.active() { "active" } else { "" };
        println!("{:<30} {:<7} {}", zone.name(), state, zone.members().join("; "));
    }
    switch.close().await?;

    println!("\nDone!");
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    timeout: u64,
    fid: Option<u32>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 22u16;
        let mut user = env::var("USER").unwrap_or_else(|_| "admin".to_string());
        let mut password = None;
        let mut key = None;
        let mut timeout = 30u64;
        let mut fid = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = Some(args[i].clone());
                    }
                }
                "--key" | "-k" => {
                    i += 1;
                    if i < args.len() {
                        key = Some(PathBuf::from(&args[i]));
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--fid" | "-f" => {
                    i += 1;
                    if i < args.len() {
                        fid = args[i].parse().ok();
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Self {
            host,
            port,
            user,
            password,
            key,
            timeout,
            fid,
        }
    }

    fn print_help() {
        println!(
            r#"fabricsh switch_info example

USAGE:
    cargo run --example switch_info -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Switch address [default: localhost]
    -p, --port <PORT>        SSH port [default: 22]
    -u, --user <USER>        Username [default: $USER]
    -P, --password <PASS>    Password for authentication
    -k, --key <PATH>         Path to SSH private key
    -t, --timeout <SECS>     Connection timeout [default: 30]
    -f, --fid <FID>          Logical switch to query
    --help                   Print this help message
"#
        );
    }
}
