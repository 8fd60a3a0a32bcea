use anyhow::{Context as _, Result};
use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use dbherd::{
    register_metrics, Abort, AbortHandle, Context, LocalNode, Manifest, NodeConfig, Orchestrator,
    ReadinessWaiter, Replication, ShellController, Topology,
};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};

#[macro_use]
extern crate log;

#[tokio::main]
async fn main() {
    let matches = get_matches();
    if let Err(e) = run(&matches).await {
        error!("{:#}", e);
        eprintln!("dbherdd: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(matches: &ArgMatches<'_>) -> Result<()> {
    let manifest_path = matches.value_of("manifest").context("expect manifest")?;
    let manifest = Manifest::try_get(manifest_path)
        .with_context(|| format!("can't read manifest {}", manifest_path))?;

    let node_path = matches.value_of("node").context("expect node config")?;
    let node = NodeConfig::try_get(node_path, &manifest)
        .with_context(|| format!("can't read node config {}", node_path))?;

    log4rs::init_file(node.log_config(), Default::default())
        .with_context(|| format!("can't init logger from {}", node.log_config()))?;
    register_metrics();

    let topology = Topology::build(manifest.nodes())?;
    let replication = Replication::from_credentials(manifest.credentials())?;
    let local = manifest
        .find(node.private_ip())
        .map(LocalNode::from_manifest_node)
        .with_context(|| format!("{} is not in the manifest", node.private_ip()))?;
    let layout = node.layout();
    let mut orchestrator = Orchestrator::from_config(&node)?;

    if matches.subcommand_matches("topology").is_some() {
        print_topology(&topology, &replication, &local, &orchestrator);
        return Ok(());
    }

    let (handle, abort) = Abort::new();
    create_signal_handlers(Arc::new(handle))?;
    let process = ShellController;
    let waiter = ReadinessWaiter::from_config(&node, abort);
    let ctx = Context::new(
        &topology,
        &replication,
        manifest.credentials(),
        &local,
        &layout,
        &process,
        &waiter,
    );

    match matches.subcommand_name() {
        Some("up") => {
            let access = orchestrator
                .bring_up_local_node(&ctx)
                .await
                .context("bring up failed")?;
            info!(
                "{} ready, uaserver {} ports {:?}",
                access.backend(),
                access.uaserver_ip(),
                access.db_ports()
            );
        }
        Some("down") => orchestrator.tear_down_local_node(&ctx).await,
        other => anyhow::bail!("unknown command {:?}, use -h for help", other),
    }
    Ok(())
}

fn print_topology(
    topology: &Topology,
    replication: &Replication,
    local: &LocalNode,
    orchestrator: &Orchestrator,
) {
    println!("backend: {}", orchestrator.adapter().kind());
    println!("master: {}", topology.master_ip());
    println!("slaves: {}", topology.slave_ips().join(" "));
    println!("zookeeper: {}", topology.zookeeper_quorum());
    println!("replication: {}", replication.factor());
    println!("local: {} {}", local.private_ip(), local.roles());
    println!("ports: {:?}", orchestrator.adapter().db_ports());
}

fn create_signal_handlers(handle: Arc<AbortHandle>) -> Result<()> {
    let signals = [SignalKind::terminate(), SignalKind::interrupt()];
    for s in signals.iter() {
        spawn_signal_handler(handle.clone(), *s)?;
    }
    Ok(())
}

fn spawn_signal_handler(handle: Arc<AbortHandle>, s: SignalKind) -> Result<()> {
    let mut task = signal(s).context("can't install signal handler")?;
    tokio::spawn(async move {
        task.recv().await;
        warn!("got signal {:?}, aborting readiness waits", s);
        handle.abort();
    });
    Ok(())
}

fn get_matches<'a>() -> ArgMatches<'a> {
    App::new("dbherdd")
        .version(crate_version!())
        .about("Brings the local datastore node of an AppScale deployment up or down")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("manifest")
                .help("deployment manifest file")
                .takes_value(true)
                .required(true)
                .short("m")
                .long("manifest"),
        )
        .arg(
            Arg::with_name("node")
                .help("node config file")
                .takes_value(true)
                .required(true)
                .short("n")
                .long("node"),
        )
        .subcommand(SubCommand::with_name("up").about("configure, start and publish the local node"))
        .subcommand(SubCommand::with_name("down").about("stop the local node"))
        .subcommand(SubCommand::with_name("topology").about("print the resolved deployment"))
        .get_matches()
}
