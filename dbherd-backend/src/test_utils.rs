use crate::{
    prelude::*,
    process::{CommandOutput, MockController},
    readiness::{Abort, MockProbe},
};
use dbherd_common::configs::manifest::{Credentials, Manifest};
use std::sync::Mutex;

/// Shared, ordered record of everything the mocks were asked to do.
pub type CommandLog = Arc<Mutex<Vec<String>>>;

fn record(log: &CommandLog, entry: String) {
    log.lock().expect("command log mutex").push(entry);
}

/// Accepts every command. `run` prints `1`, which passes health checks.
pub fn recording_controller(log: &CommandLog) -> MockController {
    let mut process = MockController::new();
    let start_log = log.clone();
    process.expect_start_daemon().returning(move |cmd| {
        record(&start_log, format!("start: {}", cmd));
        Ok(())
    });
    let stop_log = log.clone();
    process.expect_stop_daemon().returning(move |cmd| {
        record(&stop_log, format!("stop: {}", cmd));
        Ok(())
    });
    let run_log = log.clone();
    process.expect_run().returning(move |cmd| {
        record(&run_log, format!("run: {}", cmd));
        Ok(CommandOutput::ok("1\n"))
    });
    process
}

/// Reports every port in `closed` as never opening, everything else as open.
pub fn recording_probe(log: &CommandLog, closed: Vec<(String, u16)>) -> MockProbe {
    let log = log.clone();
    let mut probe = MockProbe::new();
    probe.expect_is_open().returning(move |host, port| {
        record(&log, format!("probe: {}:{}", host, port));
        !closed.iter().any(|(h, p)| h == host && *p == port)
    });
    probe
}

pub fn quick_waiter(probe: MockProbe, timeout: Duration) -> ReadinessWaiter {
    ReadinessWaiter::new(
        Arc::new(probe),
        Duration::from_millis(10),
        Some(timeout),
        Abort::never(),
    )
}

/// One node's view of a deployment, with mocked process control and ports.
pub struct Fixture {
    pub topology: Topology,
    pub replication: Replication,
    pub credentials: Credentials,
    pub local: LocalNode,
    pub layout: Layout,
    pub process: MockController,
    pub waiter: ReadinessWaiter,
    pub log: CommandLog,
}

impl Fixture {
    pub fn new(manifest: &Manifest, local_ip: &str, root: &Path) -> Self {
        Self::with_closed_ports(manifest, local_ip, root, Vec::new())
    }

    pub fn with_closed_ports(
        manifest: &Manifest,
        local_ip: &str,
        root: &Path,
        closed: Vec<(String, u16)>,
    ) -> Self {
        let node = manifest.find(local_ip).expect("local node in manifest");
        let log = CommandLog::default();
        Self {
            topology: Topology::build(manifest.nodes()).expect("valid topology"),
            replication: Replication::from_credentials(manifest.credentials())
                .expect("valid replication"),
            credentials: manifest.credentials().clone(),
            local: LocalNode::from_manifest_node(node),
            layout: Layout::new(root, true),
            process: recording_controller(&log),
            waiter: quick_waiter(recording_probe(&log, closed), Duration::from_millis(200)),
            log,
        }
    }

    pub fn context(&self) -> Context<'_> {
        Context::new(
            &self.topology,
            &self.replication,
            &self.credentials,
            &self.local,
            &self.layout,
            &self.process,
            &self.waiter,
        )
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.lock().expect("command log mutex").clone()
    }

    /// Entries that launched, stopped or ran something, without probes.
    pub fn actions(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| !c.starts_with("probe: "))
            .collect()
    }

    pub fn clear(&self) {
        self.log.lock().expect("command log mutex").clear();
    }
}
