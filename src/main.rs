//! znodes - node power control CLI
//!
//! Drives the same operations the test framework uses, from a shell.
//!
//! ## Usage
//!
//! ```bash
//! # Is this a KVM host?
//! znodes detect
//!
//! # Domain state of nodes
//! znodes state worker-0 worker-1
//!
//! # Power cycle nodes, two at a time
//! znodes restart worker-0 worker-1 --concurrency 2
//!
//! # Force kubelet-based control
//! znodes stop master-0 --mode generic
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use znodes::cli::{self, Args, ModeArg, PowerArgs};
use znodes::config::{print_env_help, ConfigFile, EnvConfig};
use znodes::power::PowerAction;
use znodes::utils::{init_logger, LogLevel};
use znodes::{
    AppConfig, KubeCluster, KubeletService, ShellRunner, StaticProbe, ZNode, ZNodes,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    init_logger(LogLevel::from_verbosity(args.verbose), env.log.as_deref());

    let app = AppConfig::resolve(args.config.as_deref(), &env, args.concurrency)?;

    match args.command {
        cli::Command::Detect => {
            let znodes = build_controller(&app, args.mode).await?;
            println!(
                "virtualized: {} (mode: {})",
                znodes.is_environment_virtualized(),
                znodes.mode()
            );
        }
        cli::Command::State { nodes } => {
            let znodes = build_controller(&app, args.mode).await?;
            show_state(&znodes, &nodes).await?;
        }
        cli::Command::Stop(power) => {
            run_power(&app, args.mode, PowerAction::Stop, power).await?;
        }
        cli::Command::Start(power) => {
            run_power(&app, args.mode, PowerAction::Start, power).await?;
        }
        cli::Command::Restart(power) => {
            run_power(&app, args.mode, PowerAction::Restart, power).await?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, &app)?;
        }
    }

    Ok(())
}

async fn build_controller(app: &AppConfig, mode: ModeArg) -> Result<ZNodes> {
    let runner = Arc::new(ShellRunner::new());
    let cluster = Arc::new(
        KubeCluster::new().poll_interval(Duration::from_secs(app.power.poll_interval_secs)),
    );
    let service = Arc::new(KubeletService::new(runner.clone(), cluster.clone()));

    let mut builder = ZNodes::builder(runner, service, cluster)
        .config(app.power.clone())
        .env_data(app.env_data.clone());

    match mode {
        ModeArg::Auto => {}
        ModeArg::Virtualized => builder = builder.probe(Arc::new(StaticProbe(true))),
        ModeArg::Generic => builder = builder.probe(Arc::new(StaticProbe(false))),
    }

    builder.build().await
}

async fn show_state(znodes: &ZNodes, names: &[String]) -> Result<()> {
    println!("{:24} {:40} {:14} DOWN", "NODE", "DOMAIN", "STATE");

    for name in names {
        let node = ZNode::new(name.as_str());
        let state = znodes.domain_state(&node).await?;
        println!(
            "{:24} {:40} {:14} {}",
            node.name,
            znodes.virsh().domain(&node),
            state.to_string(),
            !state.is_running()
        );
    }

    Ok(())
}

async fn run_power(app: &AppConfig, mode: ModeArg, action: PowerAction, args: PowerArgs) -> Result<()> {
    let znodes = build_controller(app, mode).await?;
    let nodes: Vec<ZNode> = args.nodes.iter().map(|n| ZNode::new(n.as_str())).collect();
    let timeout = Duration::from_secs(args.timeout.unwrap_or(app.power.timeout_secs));
    let wait = !args.no_wait;

    let report = match action {
        PowerAction::Stop => znodes.stop(&nodes, timeout, wait, args.force).await?,
        PowerAction::Start => znodes.start(&nodes, timeout, wait, args.force).await?,
        PowerAction::Restart => znodes.restart(&nodes, timeout, wait, args.force).await?,
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("✓ {report}");
    }

    Ok(())
}

fn manage_config(args: cli::ConfigArgs, app: &AppConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            ConfigFile::example().save(path)?;
            println!("✓ Configuration file created: {output}");
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { format } => {
            let output = if format == "json" {
                serde_json::to_string_pretty(app)?
            } else {
                serde_yaml::to_string(app)?
            };
            println!("{output}");
        }

        cli::ConfigAction::Validate { file } => {
            let path = file.unwrap_or_else(|| {
                ConfigFile::find()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_else(|| "./znodes.yaml".to_string())
            });

            match ConfigFile::load(&path) {
                Ok(_) => println!("✓ Configuration file is valid: {path}"),
                Err(e) => {
                    println!("✗ Configuration file is invalid: {path}");
                    println!("  Error: {e:#}");
                    return Err(e);
                }
            }
        }

        cli::ConfigAction::Env => {
            let env = EnvConfig::load();
            if env.has_any() {
                env.print_summary();
            } else {
                println!("No ZNODES_* environment variables set.");
            }
            println!();
            print_env_help();
        }
    }

    Ok(())
}
