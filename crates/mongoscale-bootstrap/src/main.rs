//! Mongoscale Bootstrap
//!
//! One-time cluster initialization CLI. Stands up the router/config,
//! monitoring, and seed shard instances, then writes the cluster outputs
//! (router address, AddShard environment) to a JSON file that outlives the
//! process.

use anyhow::Context;
use clap::{Parser, Subcommand};
use mongoscale_core::cloud::mock::{RecordingBlobStore, RecordingCompute};
use mongoscale_core::cloud::{BlobStore, ComputeProvisioner, ImageSelector, DEFAULT_INSTANCE_TYPE};
use mongoscale_core::topology::AssetPaths;
use mongoscale_core::{ClusterTopology, TopologyConfig, TopologyInitializer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "mongoscale-bootstrap")]
#[command(about = "Bootstrap a sharded MongoDB cluster on cloud instances")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stand up the router, monitoring, and seed shard instances
    Init {
        /// Directory holding the bootstrap scripts and compose definitions
        #[arg(long, env = "ASSET_DIR", default_value = "assets")]
        asset_dir: PathBuf,
        /// SSH key pair name attached to every instance
        #[arg(long, env = "KEY_NAME", default_value = "mongodb-router-key")]
        key_name: String,
        /// Machine image selector (name pattern)
        #[arg(long, env = "IMAGE_PATTERN", default_value = "al2023-ami-*")]
        image: String,
        #[arg(long, env = "VPC_ID")]
        vpc_id: String,
        #[arg(long, env = "SUBNET_ID")]
        subnet_id: String,
        #[arg(long, env = "SECURITY_GROUP_ID")]
        security_group_id: String,
        /// IAM role ARN attached to every instance
        #[arg(long, env = "ROLE_ARN")]
        role_arn: String,
        /// Where to write the cluster outputs
        #[arg(long, default_value = "cluster-outputs.json")]
        output: PathBuf,
    },
    /// Print the AddShard server environment from a previous init
    Env {
        /// Outputs file written by `init`
        #[arg(long, default_value = "cluster-outputs.json")]
        outputs: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            asset_dir,
            key_name,
            image,
            vpc_id,
            subnet_id,
            security_group_id,
            role_arn,
            output,
        } => {
            let config = TopologyConfig {
                assets: AssetPaths::under(&asset_dir),
                image: ImageSelector(image),
                instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
                key_name,
                vpc_id,
                subnet_id,
                security_group_id,
                instance_role_arn: role_arn,
            };
            run_init(config, &output).await
        }
        Commands::Env { outputs } => print_env(&outputs),
    }
}

async fn run_init(config: TopologyConfig, output: &PathBuf) -> anyhow::Result<()> {
    info!("Starting cluster bootstrap");

    // The cloud capabilities are consumed through traits; a real SDK
    // binding plugs in here. Only the recording backend ships in-tree.
    warn!("Using in-memory recording cloud backends; no real instances will launch");
    let compute: Arc<dyn ComputeProvisioner> = Arc::new(RecordingCompute::new());
    let blobs: Arc<dyn BlobStore> = Arc::new(RecordingBlobStore::default());

    let initializer = TopologyInitializer::new(compute, blobs, config);
    let topology = initializer.initialize().await?;

    info!(
        router_ip = %topology.router_addr,
        router_instance = %topology.router_instance,
        seed_shard = %topology.seed_shard.instance_id,
        "Cluster bootstrap complete"
    );

    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    serde_json::to_writer_pretty(file, &topology)
        .context("Failed to serialize cluster outputs")?;
    info!(output = %output.display(), "Wrote cluster outputs");

    Ok(())
}

fn print_env(outputs: &PathBuf) -> anyhow::Result<()> {
    let file = std::fs::File::open(outputs)
        .with_context(|| format!("Failed to open {}", outputs.display()))?;
    let topology: ClusterTopology =
        serde_json::from_reader(file).context("Failed to parse cluster outputs")?;

    for (name, value) in topology.server_env() {
        println!("{name}={value}");
    }

    Ok(())
}
