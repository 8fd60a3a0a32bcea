use super::{render_backend, soap_on_db_nodes};
use crate::prelude::*;

const THRIFT_PORT: u16 = 9160;
const PORTS: [u16; 4] = [7000, 7001, 7199, THRIFT_PORT];
const STOP: &str = "pkill -f org.apache.cassandra.service.CassandraDaemon";

/// Peer-to-peer ring, every DB node runs the same daemon with the master as seed.
#[derive(Debug, Default, Clone, Copy)]
pub struct Cassandra;

impl Cassandra {
    fn home(ctx: &Context<'_>) -> PathBuf {
        ctx.layout().backend_home(BackendType::Cassandra)
    }

    async fn launch(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.stop(STOP).await;
        ctx.reset_dir(&ctx.layout().data("cassandra")).await?;
        let home = Self::home(ctx);
        ctx.launch(&format!(
            "{}/bin/cassandra -p {}/cassandra.pid",
            home.display(),
            home.display()
        ))
        .await?;
        ctx.wait_local(&[THRIFT_PORT]).await
    }
}

#[async_trait]
impl DatastoreAdapter for Cassandra {
    fn kind(&self) -> BackendType {
        BackendType::Cassandra
    }

    fn uaserver_ip(&self, ctx: &Context<'_>) -> String {
        ctx.nearest_db_node().to_owned()
    }

    fn db_ports(&self) -> &'static [u16] {
        &PORTS
    }

    fn master_ports(&self) -> &'static [u16] {
        &[THRIFT_PORT]
    }

    fn has_soap_server(&self, roles: RoleSet) -> bool {
        soap_on_db_nodes(roles)
    }

    async fn setup_config(&self, ctx: &Context<'_>) -> Result<(), Error> {
        let subs = Substitutions::for_context(ctx);
        render_backend(ctx, self.kind(), &Self::home(ctx).join("conf"), &subs).await
    }

    async fn start_master(&self, ctx: &Context<'_>) -> Result<(), Error> {
        self.launch(ctx).await
    }

    async fn start_slave(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.wait_master(self.master_ports()).await?;
        self.setup_config(ctx).await?;
        self.launch(ctx).await
    }

    async fn stop_master(&self, ctx: &Context<'_>) {
        ctx.stop(STOP).await;
    }

    async fn stop_slave(&self, ctx: &Context<'_>) {
        ctx.stop(STOP).await;
    }

    /// The keyspace is created once, from the master.
    fn is_priming_needed(&self, roles: RoleSet) -> bool {
        roles.is_db_master()
    }
}
