//! `cn-core`: bootstrap a single-node Ceph cluster.

use clap::{Parser, Subcommand};
use cncore::bootstrap::{self, BootstrapContext, BootstrapRequest, DaemonSelector};
use cncore::config::{BootstrapConfig, parse_size};
use cncore::constants::{dashboard, rgw};
use cncore::layout::ClusterLayout;
use cncore::logging::init_logging;
use cncore::{CncoreResult, HostRunner, StdoutSink, resources};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Printed once the run completes; the `cn` client waits for it.
const SUCCESS_MARKER: &str = "SUCCESS";

#[derive(Parser)]
#[command(name = "cn-core", about = "Ceph Nano Core - Bootstrap Ceph AIO.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Init a Ceph cluster
    Init(InitArgs),
    /// Print the cn-core version
    Version,
}

#[derive(clap::Args)]
struct InitArgs {
    /// Daemons to bootstrap (mon, mgr, osd, rgw, dash, health); all when omitted
    #[arg(short, long, value_delimiter = ',')]
    daemon: Vec<DaemonSelector>,

    /// Binding port for the Rados Gateway
    #[arg(long, env = "RGW_CIVETWEB_PORT", default_value_t = rgw::DEFAULT_PORT)]
    rgw_port: u16,

    /// Binding port for the Sree dashboard
    #[arg(long, env = "SREE_PORT", default_value_t = dashboard::DEFAULT_PORT)]
    dash_port: u16,

    /// Address the dashboard hands to S3 clients
    #[arg(long, env = "EXPOSED_IP", default_value = dashboard::DEFAULT_EXPOSED_IP)]
    dash_exposed_ip: String,

    /// Block device backing the OSD
    #[arg(long, env = "OSD_DEVICE")]
    osd_device: Option<PathBuf>,

    /// Bluestore block size, e.g. 10G
    #[arg(long, env = "BLUESTORE_BLOCK_SIZE", value_parser = parse_block_size)]
    bluestore_block_size: Option<u64>,

    /// Dedicated OSD directory whose free space is checked first
    #[arg(long, env = "OSD_PATH")]
    osd_path: Option<PathBuf>,

    /// Write logs to <DIR>/cn-core.log instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl InitArgs {
    fn config(&self) -> BootstrapConfig {
        BootstrapConfig::default()
            .with_rgw_port(self.rgw_port)
            .with_dash_port(self.dash_port)
            .with_dash_exposed_ip(self.dash_exposed_ip.clone())
            .with_osd_device(self.osd_device.clone())
            .with_bluestore_block_size(self.bluestore_block_size)
            .with_osd_path(self.osd_path.clone())
    }
}

fn parse_block_size(value: &str) -> Result<u64, String> {
    parse_size(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Version => {
            println!("cn-core version {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Command::Init(args) => {
            let _guard = match init_logging(args.log_dir.as_deref()) {
                Ok(guard) => guard,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            };

            match init(args).await {
                Ok(()) => {
                    println!("{}", SUCCESS_MARKER);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    if e.is_resource_insufficient() {
                        tracing::error!(error = %e, "Host does not meet the minimum requirements");
                    } else {
                        tracing::error!(error = %e, "Bootstrap failed");
                    }
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn init(args: InitArgs) -> CncoreResult<()> {
    let config = args.config();
    resources::preflight(&config)?;

    let request = BootstrapRequest::from_selectors(&args.daemon);
    let ctx = BootstrapContext::for_local_host(
        config,
        ClusterLayout::default(),
        Arc::new(HostRunner),
        Arc::new(StdoutSink),
    )?;

    bootstrap::run(&request, Arc::new(ctx)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cncore::DaemonRole;

    #[test]
    fn test_daemon_list_parsing() {
        let cli = Cli::try_parse_from([
            "cn-core",
            "init",
            "--daemon",
            "rgw,mon",
            "--rgw-port",
            "9000",
        ])
        .unwrap();
        let Command::Init(args) = cli.command else {
            panic!("expected init");
        };
        assert_eq!(
            args.daemon,
            vec![
                DaemonSelector::Role(DaemonRole::Rgw),
                DaemonSelector::Role(DaemonRole::Mon)
            ]
        );
        assert_eq!(args.config().rgw_port, 9000);
    }

    #[test]
    fn test_unknown_daemon_is_rejected() {
        assert!(Cli::try_parse_from(["cn-core", "init", "--daemon", "mds"]).is_err());
    }

    #[test]
    fn test_block_size_suffix() {
        let cli =
            Cli::try_parse_from(["cn-core", "init", "--bluestore-block-size", "20G"]).unwrap();
        let Command::Init(args) = cli.command else {
            panic!("expected init");
        };
        assert_eq!(args.bluestore_block_size, Some(20 << 30));
    }
}
