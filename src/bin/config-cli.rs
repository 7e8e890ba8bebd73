use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use vulcan_config_builder::builder;
use vulcan_config_builder::config::{StoreConfig, SyncConfig};
use vulcan_config_builder::reconcile::{encode::encode, ProxyLayout, Reconciler};
use vulcan_config_builder::registry::read_services;
use vulcan_config_builder::store::EtcdStore;

#[derive(Parser)]
#[command(name = "config-cli")]
#[command(about = "Inspect what the config builder would write to vulcand", long_about = None)]
struct Cli {
    /// Comma-separated etcd client URLs.
    #[arg(long, env = "ETCD_PEERS", value_delimiter = ',', default_value = "http://localhost:2379")]
    etcd_peers: Vec<String>,

    #[arg(long, env = "SOCKS_PROXY")]
    socks_proxy: Option<String>,

    #[arg(long, env = "SERVICES_ROOT", default_value = "/ft/services")]
    services_root: String,

    #[arg(long, env = "PROXY_ROOT", default_value = "/vulcand")]
    proxy_root: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the services declared in the registry
    Services,
    /// Print the proxy keys the current services produce
    Render,
    /// Show the changes a reconcile would make, without applying them
    Diff,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let store = EtcdStore::new(&StoreConfig {
        endpoints: cli.etcd_peers,
        socks_proxy: cli.socks_proxy,
        ..StoreConfig::default()
    })?;
    let sync = SyncConfig {
        services_root: cli.services_root,
        proxy_root: cli.proxy_root,
        ..SyncConfig::default()
    };

    let services = read_services(&store, &sync.services_root).await?;

    match cli.command {
        Commands::Services => {
            print_json(&serde_json::to_value(&services)?)?;
        }
        Commands::Render => {
            let desired = builder::build(&services);
            let keys = encode(&desired, &ProxyLayout::new(&sync.proxy_root))?;
            print_json(&serde_json::to_value(parse_values(keys))?)?;
        }
        Commands::Diff => {
            let desired = builder::build(&services);
            let plan = Reconciler::new(&store, &sync.proxy_root).dry_run(&desired).await?;
            let upserts: BTreeMap<String, String> = plan.upserts.into_iter().collect();
            print_json(&json!({
                "upserts": parse_values(upserts),
                "deletes": plan.deletes,
                "unchanged": plan.unchanged,
                "foreign": plan.foreign,
            }))?;
        }
    }

    Ok(())
}

/// Stored values are JSON documents; show them as such.
fn parse_values(keys: BTreeMap<String, String>) -> BTreeMap<String, Value> {
    keys.into_iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            (key, value)
        })
        .collect()
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
