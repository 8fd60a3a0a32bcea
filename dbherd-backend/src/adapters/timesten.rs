use super::{render_backend, soap_on_master};
use crate::prelude::*;

const DAEMON_PORT: u16 = 53384;
const SERVER_PORT: u16 = 53385;
const PORTS: [u16; 2] = [DAEMON_PORT, SERVER_PORT];

/// Single-host in-memory database, slaves only reach it through the master.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimesTen;

impl TimesTen {
    fn home(ctx: &Context<'_>) -> PathBuf {
        ctx.layout().backend_home(BackendType::TimesTen)
    }

    fn admin(ctx: &Context<'_>, action: &str) -> String {
        format!("{}/bin/ttDaemonAdmin {}", Self::home(ctx).display(), action)
    }
}

#[async_trait]
impl DatastoreAdapter for TimesTen {
    fn kind(&self) -> BackendType {
        BackendType::TimesTen
    }

    fn uaserver_ip(&self, ctx: &Context<'_>) -> String {
        ctx.master_ip().to_owned()
    }

    fn db_ports(&self) -> &'static [u16] {
        &PORTS
    }

    fn master_ports(&self) -> &'static [u16] {
        &[SERVER_PORT]
    }

    fn has_soap_server(&self, roles: RoleSet) -> bool {
        soap_on_master(roles)
    }

    async fn setup_config(&self, ctx: &Context<'_>) -> Result<(), Error> {
        let subs = Substitutions::for_context(ctx);
        render_backend(ctx, self.kind(), &Self::home(ctx).join("info"), &subs).await
    }

    async fn start_master(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.stop(&Self::admin(ctx, "-stop")).await;
        ctx.reset_dir(&ctx.layout().data("timesten")).await?;
        ctx.launch(&Self::admin(ctx, "-start")).await?;
        ctx.wait_local(&PORTS).await
    }

    /// Nothing runs locally, the slave only needs the master's server up.
    async fn start_slave(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.wait_master(self.master_ports()).await
    }

    async fn stop_master(&self, ctx: &Context<'_>) {
        ctx.stop(&Self::admin(ctx, "-stop")).await;
    }

    async fn stop_slave(&self, _ctx: &Context<'_>) {}
}
