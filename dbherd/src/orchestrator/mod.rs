
use crate::{
    prelude::*,
    primer::{Primer, ScriptPrimer},
    registry::{AccessPoint, Registry},
};
use dbherd_backend::core::select;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unconfigured,
    Configured,
    Starting,
    Ready,
    Stopping,
    Stopped,
}

impl NodeState {
    /// Slaves skip `Configured`, a stopped node may be brought up again,
    /// teardown is allowed from anywhere.
    pub fn can_move_to(self, to: NodeState) -> bool {
        use NodeState::*;
        matches!(
            (self, to),
            (_, Stopping)
                | (Unconfigured | Stopped, Configured)
                | (Unconfigured | Configured | Stopped, Starting)
                | (Starting, Ready)
                | (Stopping, Stopped)
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured => "configured",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl Display for NodeState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::Unconfigured
    }
}

/// Drives the selected adapter through one node's lifecycle.
#[derive(Debug)]
pub struct Orchestrator {
    adapter: Arc<dyn DatastoreAdapter>,
    primer: Arc<dyn Primer>,
    registry: Registry,
    state: NodeState,
}

impl Orchestrator {
    pub fn new(
        adapter: Arc<dyn DatastoreAdapter>,
        primer: Arc<dyn Primer>,
        registry: Registry,
    ) -> Self {
        Self {
            adapter,
            primer,
            registry,
            state: NodeState::default(),
        }
    }

    pub fn from_config(config: &NodeConfig) -> Result<Self, Error> {
        Ok(Self::new(
            select(config.backend_result()?),
            Arc::new(ScriptPrimer::from_config(config)),
            Registry::from_layout(&config.layout()),
        ))
    }

    pub fn adapter(&self) -> &dyn DatastoreAdapter {
        self.adapter.as_ref()
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    fn move_to(&mut self, to: NodeState) -> Result<(), Error> {
        if !self.state.can_move_to(to) {
            return Err(Error::invalid_transition(self.state, to));
        }
        debug!("node state {} -> {}", self.state, to);
        self.state = to;
        gauge!(NODE_STATE, to as u8 as f64);
        Ok(())
    }

    /// Configures and starts whatever the local roles call for, primes the
    /// master when the backend needs it and publishes the access point.
    /// # Errors
    /// Config and template errors come before any process is started. A
    /// readiness timeout leaves already launched processes running.
    pub async fn bring_up_local_node(&mut self, ctx: &Context<'_>) -> Result<AccessPoint, Error> {
        let roles = ctx.local().roles();
        let backend = self.adapter.kind();
        if roles.is_db_master() {
            info!("bringing up {} master on {}", backend, ctx.local_ip());
            self.adapter.setup_config(ctx).await?;
            self.move_to(NodeState::Configured)?;
            self.move_to(NodeState::Starting)?;
            self.adapter.start_master(ctx).await?;
            self.move_to(NodeState::Ready)?;
        } else if roles.is_db_slave() {
            info!(
                "bringing up {} slave on {}, master {}",
                backend,
                ctx.local_ip(),
                ctx.master_ip()
            );
            ctx.wait_master(self.adapter.master_ports()).await?;
            self.move_to(NodeState::Starting)?;
            self.adapter.start_slave(ctx).await?;
            self.move_to(NodeState::Ready)?;
        } else {
            info!("{} holds no datastore role, nothing to start", ctx.local_ip());
        }

        if self.adapter.is_priming_needed(roles) {
            self.primer.prime(ctx, backend).await?;
        }

        let access = AccessPoint::new(self.adapter.as_ref(), ctx);
        self.registry.record(&access, ctx.topology()).await?;
        Ok(access)
    }

    /// Never fails. A node without a datastore role stops both sides.
    pub async fn tear_down_local_node(&mut self, ctx: &Context<'_>) {
        let roles = ctx.local().roles();
        if let Err(e) = self.move_to(NodeState::Stopping) {
            warn!("{}", e);
        }
        match (roles.is_db_master(), roles.is_db_slave()) {
            (true, _) => self.adapter.stop_master(ctx).await,
            (false, true) => self.adapter.stop_slave(ctx).await,
            (false, false) => {
                debug!("{} holds no datastore role, clearing both sides", ctx.local_ip());
                self.adapter.stop_master(ctx).await;
                self.adapter.stop_slave(ctx).await;
            }
        }
        if let Err(e) = self.move_to(NodeState::Stopped) {
            warn!("{}", e);
        }
        info!("{} stopped on {}", self.adapter.kind(), ctx.local_ip());
    }
}
