use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use geolog::config::Config;
use geolog::geo::{format_ipv4, open_store, parse_ipv4, FallbackResolver, ShardKey, IPDB_DIR};
use geolog::plugin::{GeoLogPlugin, SETTING_WWW_PATH};

#[derive(Parser)]
#[command(name = "geolog")]
#[command(about = "IP geolocation lookup and enriched log emission", long_about = None)]
struct Cli {
    /// Directory containing the `ipdb` tree (overrides GEOLOG_WWW_PATH)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the location of an IPv4 address
    Lookup {
        ip: String,
    },
    /// Show the shard an IPv4 address maps to
    Shard {
        ip: String,
    },
    /// Enrich and send a single log event
    Emit {
        #[arg(long)]
        text: String,
        #[arg(long)]
        ip: String,
        #[arg(long, default_value_t = 0)]
        event_id: i32,
        #[arg(long, default_value = "")]
        customer_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let root = cli
        .root
        .or_else(|| config.dataset.www_path.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Lookup { ip } => {
            let key = parse_ipv4(ip.trim()).with_context(|| format!("cannot look up '{ip}'"))?;
            let store = open_store(root.join(IPDB_DIR), config.dataset.shard_cache_entries);
            let resolver =
                FallbackResolver::with_max_attempts(store, config.dataset.fallback_attempts);

            let resolution = resolver.resolve(key);
            match (resolution.first(), resolution.shard) {
                (Some(range), Some(shard)) => {
                    println!("✓ {} ({}) found in shard {}", ip, key, shard);
                    println!(
                        "  range:    {} - {}",
                        format_ipv4(range.low_ip),
                        format_ipv4(range.high_ip)
                    );
                    println!("  country:  {} ({})", range.country, range.iso_code);
                    println!("  state:    {}", range.state);
                    println!("  city:     {}", range.city);
                    println!("  lat/long: {}, {}", range.latitude, range.longitude);
                    println!("  zip:      {}", range.zip);
                    println!("  timezone: {}", range.timezone);
                    if resolution.matches.len() > 1 {
                        println!("  ({} overlapping ranges matched)", resolution.matches.len());
                    }
                }
                _ => {
                    println!(
                        "⚠ No location for {} after {} shard(s)",
                        ip, resolution.attempts
                    );
                }
            }
        }
        Commands::Shard { ip } => {
            let key = parse_ipv4(ip.trim()).with_context(|| format!("cannot map '{ip}'"))?;
            let shard = ShardKey::locate(key);
            println!("{} -> key {} -> shard {}", ip, key, shard);
            println!("{}", shard.path_in(&root.join(IPDB_DIR)).display());
        }
        Commands::Emit {
            text,
            ip,
            event_id,
            customer_id,
        } => {
            if !config.sink.is_configured() {
                println!("⚠ LOG_WORKSPACE_ID / LOG_SHARED_KEY not set; nothing will be sent");
            }

            let mut plugin = GeoLogPlugin::new(config);
            plugin
                .settings
                .insert(SETTING_WWW_PATH.to_string(), root.to_string_lossy().into_owned());
            plugin.init(&root).await?;

            plugin.write_log(&text, &ip, event_id, &customer_id);

            if let Some(stats) = plugin.shutdown().await {
                println!(
                    "queued {}, delivered {}, failed {}",
                    stats.enqueued, stats.delivered, stats.failed
                );
            }
        }
    }

    Ok(())
}
