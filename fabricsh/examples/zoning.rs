//! Zoning example: zone a host to a storage port in one transaction.
//!
//! Creates an alias for the host WWN, a zone holding that alias and the
//! storage WWN, and adds the zone to a configuration. Everything is saved
//! once at the end, or aborted if any step fails.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example zoning -- --host san-sw1 --user zoneadmin --password secret \
//!     --alias host_a --host-wwn 50:00:10:20:30:40:50:60 \
//!     --target-wwn 50:00:10:20:30:40:50:61 --cfg cfg_prod
//! ```
//!
//! Pass `--purge` to remove the zone and alias again.

use std::env;

use fabricsh::SwitchBuilder;
use fabricsh::model::{Alias, Zone, ZoneConfiguration};
use fabricsh::provisioning::Agent;
use fabricsh::transport::SshTransport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let Some(password) = &args.password else {
        eprintln!("Error: Must provide --password");
        std::process::exit(1);
    };

    println!("Connecting to {}...", args.host);
    let mut agent = SwitchBuilder::new(&args.host)
        .username(&args.user)
        .password(password)
        .agent()
        .await?;

    let zone_name = format!("z_{}", args.alias);
    if args.purge {
        purge(&mut agent, &zone_name, &args.alias).await?;
    } else {
        provision(&mut agent, &args, &zone_name).await?;
    }

    println!("Done!");
    Ok(())
}

async fn provision(
    agent: &mut Agent<SshTransport>,
    args: &Args,
    zone_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let alias = Alias::new(&args.alias, [args.host_wwn.as_str()])?;
    let zone = Zone::new(zone_name, [args.alias.as_str(), args.target_wwn.as_str()])?;
    let cfg = ZoneConfiguration::named(&args.cfg)?;

    let updated = agent
        .transaction(async |agent: &mut Agent<SshTransport>| {
            agent.alias_create(&alias).await?;
            let zone = agent.zone_create(&zone).await?;
            agent.cfg_add(&cfg, &zone).await
        })
        .await?;

    println!("{} now holds {} zones", updated.name(), updated.members().len());
    if args.enable {
        println!("Enabling {}...", updated.name());
        agent.cfg_enable(&updated).await?;
    }
    Ok(())
}

async fn purge(
    agent: &mut Agent<SshTransport>,
    zone_name: &str,
    alias_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let zone = Zone::named(zone_name)?;
    let alias = Alias::named(alias_name)?;

    agent
        .transaction(async |agent: &mut Agent<SshTransport>| {
            agent.zone_purge(&zone).await?;
            agent.alias_purge(&alias).await
        })
        .await?;
    println!("Removed {zone_name} and {alias_name}");
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    user: String,
    password: Option<String>,
    alias: String,
    host_wwn: String,
    target_wwn: String,
    cfg: String,
    enable: bool,
    purge: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            host: "localhost".to_string(),
            user: env::var("USER").unwrap_or_else(|_| "admin".to_string()),
            password: None,
            alias: "host_a".to_string(),
            host_wwn: "50:00:10:20:30:40:50:60".to_string(),
            target_wwn: "50:00:10:20:30:40:50:61".to_string(),
            cfg: "cfg_prod".to_string(),
            enable: false,
            purge: false,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match (args[i].as_str(), value) {
                ("--host" | "-h", Some(v)) => {
                    parsed.host = v;
                    i += 1;
                }
                ("--user" | "-u", Some(v)) => {
                    parsed.user = v;
                    i += 1;
                }
                ("--password" | "-P", Some(v)) => {
                    parsed.password = Some(v);
                    i += 1;
                }
                ("--alias", Some(v)) => {
                    parsed.alias = v;
                    i += 1;
                }
                ("--host-wwn", Some(v)) => {
                    parsed.host_wwn = v;
                    i += 1;
                }
                ("--target-wwn", Some(v)) => {
                    parsed.target_wwn = v;
                    i += 1;
                }
                ("--cfg", Some(v)) => {
                    parsed.cfg = v;
                    i += 1;
                }
                ("--enable", _) => parsed.enable = true,
                ("--purge", _) => parsed.purge = true,
                ("--help", _) => {
                    Self::print_help();
                    std::process::exit(0);
                }
                (other, _) => eprintln!("Unknown argument: {other}"),
            }
            i += 1;
        }
        parsed
    }

    fn print_help() {
        println!(
            r#"fabricsh zoning example

USAGE:
    cargo run --example zoning -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Switch address [default: localhost]
    -u, --user <USER>          Username [default: $USER]
    -P, --password <PASS>      Password for authentication
    --alias <NAME>             Alias for the host [default: host_a]
    --host-wwn <WWN>           Host port WWN
    --target-wwn <WWN>         Storage port WWN
    --cfg <NAME>               Configuration to add the zone to [default: cfg_prod]
    --enable                   Enable the configuration afterwards
    --purge                    Remove the zone and alias instead
    --help                     Print this help message
"#
        );
    }
}
