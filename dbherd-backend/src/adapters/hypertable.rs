use super::{hadoop, render_backend, soap_on_master};
use crate::prelude::*;

const MASTER_PORT: u16 = 38030;
const HYPERSPACE_PORT: u16 = 38040;
const RANGESERVER_PORT: u16 = 38060;
const THRIFTBROKER_PORT: u16 = 38080;
const PORTS: [u16; 5] = [
    hadoop::NAMENODE_PORT,
    MASTER_PORT,
    HYPERSPACE_PORT,
    RANGESERVER_PORT,
    THRIFTBROKER_PORT,
];

#[derive(Debug, Default, Clone, Copy)]
pub struct Hypertable;

impl Hypertable {
    fn home(ctx: &Context<'_>) -> PathBuf {
        ctx.layout().backend_home(BackendType::Hypertable)
    }

    fn script(ctx: &Context<'_>, name: &str) -> String {
        format!("{}/bin/{}", Self::home(ctx).display(), name)
    }

    fn config_arg(ctx: &Context<'_>) -> String {
        format!("--config={}/conf/hypertable.cfg", Self::home(ctx).display())
    }

    async fn start_dfsbroker(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.launch(&format!(
            "{} hadoop {}",
            Self::script(ctx, "start-dfsbroker.sh"),
            Self::config_arg(ctx)
        ))
        .await
    }

    async fn start_rangeserver(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.launch(&format!(
            "{} {}",
            Self::script(ctx, "start-rangeserver.sh"),
            Self::config_arg(ctx)
        ))
        .await?;
        ctx.wait_local(&[RANGESERVER_PORT]).await
    }
}

#[async_trait]
impl DatastoreAdapter for Hypertable {
    fn kind(&self) -> BackendType {
        BackendType::Hypertable
    }

    fn uaserver_ip(&self, ctx: &Context<'_>) -> String {
        ctx.master_ip().to_owned()
    }

    fn db_ports(&self) -> &'static [u16] {
        &PORTS
    }

    fn master_ports(&self) -> &'static [u16] {
        &[MASTER_PORT]
    }

    fn has_soap_server(&self, roles: RoleSet) -> bool {
        soap_on_master(roles)
    }

    async fn setup_config(&self, ctx: &Context<'_>) -> Result<(), Error> {
        let subs = Substitutions::for_context(ctx);
        hadoop::setup_config(ctx, &subs).await?;
        render_backend(ctx, self.kind(), &Self::home(ctx).join("conf"), &subs).await
    }

    async fn start_master(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.stop(&Self::script(ctx, "stop-servers.sh")).await;
        hadoop::start_namenode(ctx).await?;
        hadoop::start_datanode(ctx).await?;

        let config = Self::config_arg(ctx);
        ctx.launch(&format!("{} {}", Self::script(ctx, "start-hyperspace.sh"), config))
            .await?;
        ctx.wait_local(&[HYPERSPACE_PORT]).await?;
        self.start_dfsbroker(ctx).await?;
        ctx.launch(&format!("{} {}", Self::script(ctx, "start-master.sh"), config))
            .await?;
        ctx.wait_local(&[MASTER_PORT]).await?;
        self.start_rangeserver(ctx).await?;
        ctx.launch(&format!("{} {}", Self::script(ctx, "start-thriftbroker.sh"), config))
            .await?;
        ctx.wait_local(&[THRIFTBROKER_PORT]).await
    }

    async fn start_slave(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.wait_master(self.master_ports()).await?;
        self.setup_config(ctx).await?;
        ctx.stop(&Self::script(ctx, "stop-servers.sh")).await;
        hadoop::start_datanode(ctx).await?;
        self.start_dfsbroker(ctx).await?;
        self.start_rangeserver(ctx).await
    }

    async fn stop_master(&self, ctx: &Context<'_>) {
        ctx.stop(&Self::script(ctx, "stop-servers.sh")).await;
        hadoop::stop_all(ctx).await;
    }

    async fn stop_slave(&self, ctx: &Context<'_>) {
        ctx.stop(&Self::script(ctx, "stop-servers.sh")).await;
        hadoop::stop_datanode(ctx).await;
    }
}
