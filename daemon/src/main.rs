//! DCNS daemon: entry point for running a naming node.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use dcns_node::{init_logging, DcnsNode, LogFormat, NodeConfig};
use dcns_rpc::RpcServer;
use dcns_types::NodeId;

#[derive(Parser)]
#[command(name = "dcns-daemon", about = "Decentralized naming system node daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "DCNS_CONFIG")]
    config: Option<PathBuf>,

    /// Identifier this node mines under and collects rewards for.
    #[arg(long, env = "DCNS_NODE_ID")]
    node_id: Option<String>,

    /// Directory for chain, staging and cache files.
    #[arg(long, env = "DCNS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// RPC server port.
    #[arg(long, env = "DCNS_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Bootstrap peer addresses (comma-separated: "10.0.0.2:5000,10.0.0.3:5000").
    #[arg(long, env = "DCNS_BOOTSTRAP_PEERS", value_delimiter = ',')]
    bootstrap_peers: Vec<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "DCNS_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "DCNS_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node and its RPC server until interrupted.
    Run,
    /// Print the effective configuration as TOML and exit.
    Config,
}

impl Cli {
    /// File (or default) configuration with flag and env overrides applied.
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let path = path.to_string_lossy();
                NodeConfig::from_toml_file(&path)
                    .with_context(|| format!("failed to load config from {path}"))?
            }
            None => NodeConfig::default(),
        };

        if let Some(node_id) = &self.node_id {
            config.node_id = node_id
                .parse::<NodeId>()
                .with_context(|| format!("invalid node id {node_id:?}"))?;
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(port) = self.rpc_port {
            config.rpc_port = port;
        }
        if !self.bootstrap_peers.is_empty() {
            config.bootstrap_peers = self.bootstrap_peers.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level)?;

    if !config.bootstrap_peers.is_empty() {
        tracing::info!(peers = %config.bootstrap_peers.join(", "), "bootstrap peers");
    }

    let mut node = DcnsNode::new(config).context("failed to open node data")?;
    node.start().await?;

    let rpc = RpcServer::new(node.config().rpc_port, node.resolver());
    let rpc_shutdown = node.shutdown_controller().subscribe();
    let mut rpc_handle = tokio::spawn(async move { rpc.start(rpc_shutdown).await });

    // The server only returns on its own when it could not bind or crashed.
    let rpc_exit = tokio::select! {
        _ = node.shutdown_controller().wait_for_signal() => None,
        result = &mut rpc_handle => Some(result),
    };

    node.stop().await?;
    match rpc_exit {
        None => {
            if let Err(e) = rpc_handle.await {
                tracing::warn!(error = %e, "RPC server task ended abnormally");
            }
        }
        Some(Ok(Ok(()))) => {}
        Some(Ok(Err(e))) => return Err(e).context("RPC server failed"),
        Some(Err(e)) => return Err(e).context("RPC server task panicked"),
    }
    tracing::info!("DCNS daemon exited cleanly");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;

    match cli.command {
        Command::Run => run(config).await,
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
