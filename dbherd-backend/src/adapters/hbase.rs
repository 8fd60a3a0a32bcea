use super::{
    hadoop::{self, DATANODE_PORT, NAMENODE_HTTP_PORT, NAMENODE_PORT},
    render_backend, soap_on_db_nodes,
};
use crate::prelude::*;

const MASTER_PORT: u16 = 60000;
const MASTER_INFO_PORT: u16 = 60010;
const REGIONSERVER_PORT: u16 = 60020;
const REGIONSERVER_INFO_PORT: u16 = 60030;
const PORTS: [u16; 7] = [
    NAMENODE_PORT,
    DATANODE_PORT,
    NAMENODE_HTTP_PORT,
    MASTER_PORT,
    MASTER_INFO_PORT,
    REGIONSERVER_PORT,
    REGIONSERVER_INFO_PORT,
];

#[derive(Debug, Default, Clone, Copy)]
pub struct HBase;

impl HBase {
    fn home(ctx: &Context<'_>) -> PathBuf {
        ctx.layout().backend_home(BackendType::HBase)
    }

    fn daemon(ctx: &Context<'_>, action: &str, role: &str) -> String {
        format!(
            "{}/bin/hbase-daemon.sh {} {}",
            Self::home(ctx).display(),
            action,
            role
        )
    }

    async fn start_regionserver(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.stop(&Self::daemon(ctx, "stop", "regionserver")).await;
        ctx.launch(&Self::daemon(ctx, "start", "regionserver"))
            .await?;
        ctx.wait_local(&[REGIONSERVER_PORT]).await
    }
}

#[async_trait]
impl DatastoreAdapter for HBase {
    fn kind(&self) -> BackendType {
        BackendType::HBase
    }

    fn uaserver_ip(&self, ctx: &Context<'_>) -> String {
        ctx.nearest_db_node().to_owned()
    }

    fn db_ports(&self) -> &'static [u16] {
        &PORTS
    }

    fn master_ports(&self) -> &'static [u16] {
        &[NAMENODE_PORT, MASTER_PORT]
    }

    fn has_soap_server(&self, roles: RoleSet) -> bool {
        soap_on_db_nodes(roles)
    }

    async fn setup_config(&self, ctx: &Context<'_>) -> Result<(), Error> {
        let subs = Substitutions::for_context(ctx);
        hadoop::setup_config(ctx, &subs).await?;
        render_backend(ctx, self.kind(), &Self::home(ctx).join("conf"), &subs).await
    }

    async fn start_master(&self, ctx: &Context<'_>) -> Result<(), Error> {
        hadoop::start_namenode(ctx).await?;
        hadoop::start_datanode(ctx).await?;
        ctx.stop(&Self::daemon(ctx, "stop", "master")).await;
        ctx.launch(&Self::daemon(ctx, "start", "master")).await?;
        ctx.wait_local(&[MASTER_PORT]).await?;
        self.start_regionserver(ctx).await
    }

    async fn start_slave(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.wait_master(self.master_ports()).await?;
        self.setup_config(ctx).await?;
        hadoop::start_datanode(ctx).await?;
        self.start_regionserver(ctx).await
    }

    async fn stop_master(&self, ctx: &Context<'_>) {
        ctx.stop(&Self::daemon(ctx, "stop", "regionserver")).await;
        ctx.stop(&Self::daemon(ctx, "stop", "master")).await;
        hadoop::stop_all(ctx).await;
    }

    async fn stop_slave(&self, ctx: &Context<'_>) {
        ctx.stop(&Self::daemon(ctx, "stop", "regionserver")).await;
        hadoop::stop_datanode(ctx).await;
    }
}
