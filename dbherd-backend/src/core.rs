use crate::{
    adapters::{
        cassandra::Cassandra, hbase::HBase, hypertable::Hypertable, memcachedb::MemcacheDB,
        mongodb::MongoDB, mysql::MySQL, redisdb::Redis, scalaris::Scalaris, timesten::TimesTen,
        voldemort::Voldemort,
    },
    prelude::*,
};
use dbherd_common::configs::manifest::Credentials;
use std::io::ErrorKind as IOErrorKind;
use tokio::fs::{create_dir_all, remove_dir_all};

/// Lifecycle of one wrapped datastore on one machine.
///
/// Adapters are stateless: everything they need about the deployment comes
/// through [`Context`]. Start operations return only after every port they
/// depend on was observed open, stop operations never fail.
#[async_trait]
pub trait DatastoreAdapter: Debug + Send + Sync + 'static {
    fn kind(&self) -> BackendType;

    /// Address other components use to reach the datastore's metadata service.
    fn uaserver_ip(&self, ctx: &Context<'_>) -> String;

    fn db_ports(&self) -> &'static [u16];

    /// Ports of the master a slave must see open before it starts anything.
    fn master_ports(&self) -> &'static [u16];

    fn has_soap_server(&self, roles: RoleSet) -> bool;

    /// Renders every configuration artefact of the backend. Safe to repeat.
    async fn setup_config(&self, ctx: &Context<'_>) -> Result<(), Error>;

    async fn start_master(&self, ctx: &Context<'_>) -> Result<(), Error>;

    /// Waits for the master first, slave-side config is rendered here.
    async fn start_slave(&self, ctx: &Context<'_>) -> Result<(), Error>;

    async fn stop_master(&self, ctx: &Context<'_>);

    async fn stop_slave(&self, ctx: &Context<'_>);

    fn is_priming_needed(&self, _roles: RoleSet) -> bool {
        false
    }
}

/// Picks the adapter for a backend, once, at startup.
pub fn select(backend: BackendType) -> Arc<dyn DatastoreAdapter> {
    match backend {
        BackendType::Cassandra => Arc::new(Cassandra),
        BackendType::HBase => Arc::new(HBase),
        BackendType::Hypertable => Arc::new(Hypertable),
        BackendType::MemcacheDB => Arc::new(MemcacheDB),
        BackendType::MongoDB => Arc::new(MongoDB),
        BackendType::MySQL => Arc::new(MySQL),
        BackendType::Redis => Arc::new(Redis),
        BackendType::Scalaris => Arc::new(Scalaris),
        BackendType::TimesTen => Arc::new(TimesTen),
        BackendType::Voldemort => Arc::new(Voldemort),
    }
}

/// # Errors
/// `UnsupportedBackend` for an unknown identifier, there is no fallback.
pub fn select_by_name(name: &str) -> Result<Arc<dyn DatastoreAdapter>, Error> {
    name.parse().map(select)
}

/// Everything an adapter call may look at. Built by the orchestrator for one pass.
pub struct Context<'a> {
    topology: &'a Topology,
    replication: &'a Replication,
    credentials: &'a Credentials,
    local: &'a LocalNode,
    layout: &'a Layout,
    process: &'a dyn ProcessController,
    waiter: &'a ReadinessWaiter,
}

impl<'a> Context<'a> {
    pub fn new(
        topology: &'a Topology,
        replication: &'a Replication,
        credentials: &'a Credentials,
        local: &'a LocalNode,
        layout: &'a Layout,
        process: &'a dyn ProcessController,
        waiter: &'a ReadinessWaiter,
    ) -> Self {
        Self {
            topology,
            replication,
            credentials,
            local,
            layout,
            process,
            waiter,
        }
    }

    pub fn topology(&self) -> &Topology {
        self.topology
    }

    pub fn replication(&self) -> &Replication {
        self.replication
    }

    pub fn credentials(&self) -> &Credentials {
        self.credentials
    }

    pub fn local(&self) -> &LocalNode {
        self.local
    }

    pub fn layout(&self) -> &Layout {
        self.layout
    }

    pub fn process(&self) -> &dyn ProcessController {
        self.process
    }

    pub fn waiter(&self) -> &ReadinessWaiter {
        self.waiter
    }

    pub fn local_ip(&self) -> &str {
        self.local.private_ip()
    }

    pub fn master_ip(&self) -> &str {
        self.topology.master_ip()
    }

    /// The local node when it runs the datastore itself, the master otherwise.
    pub fn nearest_db_node(&self) -> &str {
        if self.local.roles().is_db_node() {
            self.local_ip()
        } else {
            self.master_ip()
        }
    }

    pub async fn launch(&self, command: &str) -> Result<(), Error> {
        info!("launch: {}", command);
        self.process.start_daemon(command).await
    }

    /// Best effort, a process that is not running is not an error.
    pub async fn stop(&self, command: &str) {
        debug!("stop: {}", command);
        if let Err(e) = self.process.stop_daemon(command).await {
            debug!("ignored stop failure: {}", e);
        }
    }

    pub async fn wait_local(&self, ports: &[u16]) -> Result<(), Error> {
        for port in ports {
            self.waiter.wait_until_open(self.local_ip(), *port).await?;
        }
        Ok(())
    }

    pub async fn wait_master(&self, ports: &[u16]) -> Result<(), Error> {
        for port in ports {
            self.waiter.wait_until_open(self.master_ip(), *port).await?;
        }
        Ok(())
    }

    /// Wipes `dir` on a clean start, then makes sure it exists.
    pub async fn reset_dir(&self, dir: &Path) -> Result<(), Error> {
        if self.layout.clean_start() {
            match remove_dir_all(dir).await {
                Ok(()) => debug!("cleared {}", dir.display()),
                Err(e) if e.kind() == IOErrorKind::NotFound => {}
                Err(e) => return Err(Error::template_io(dir, &e)),
            }
        }
        create_dir_all(dir)
            .await
            .map_err(|e| Error::template_io(dir, &e))
    }
}

impl Debug for Context<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Context")
            .field("topology", &self.topology)
            .field("replication", &self.replication)
            .field("local", &self.local)
            .field("layout", &self.layout)
            .finish()
    }
}
