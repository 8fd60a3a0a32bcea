use super::soap_on_master;
use crate::prelude::*;

const CLIENT_PORT: u16 = 30000;
const REPLICATION_PORT: u16 = 30001;
const PORTS: [u16; 2] = [CLIENT_PORT, REPLICATION_PORT];
const STOP: &str = "pkill -f memcachedb";

/// Berkeley DB replication group: one `-M` master, `-S` slaves following it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemcacheDB;

impl MemcacheDB {
    fn data(ctx: &Context<'_>) -> PathBuf {
        ctx.layout().data("memcachedb")
    }

    fn command(ctx: &Context<'_>, role_args: &str) -> String {
        format!(
            "memcachedb -u root -p {} -H {} -N -R {}:{} {}",
            CLIENT_PORT,
            Self::data(ctx).display(),
            ctx.local_ip(),
            REPLICATION_PORT,
            role_args
        )
    }
}

#[async_trait]
impl DatastoreAdapter for MemcacheDB {
    fn kind(&self) -> BackendType {
        BackendType::MemcacheDB
    }

    fn uaserver_ip(&self, ctx: &Context<'_>) -> String {
        ctx.master_ip().to_owned()
    }

    fn db_ports(&self) -> &'static [u16] {
        &PORTS
    }

    fn master_ports(&self) -> &'static [u16] {
        &[REPLICATION_PORT]
    }

    fn has_soap_server(&self, roles: RoleSet) -> bool {
        soap_on_master(roles)
    }

    /// Configured entirely through command line flags.
    async fn setup_config(&self, _ctx: &Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    async fn start_master(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.stop(STOP).await;
        ctx.reset_dir(&Self::data(ctx)).await?;
        ctx.launch(&Self::command(ctx, "-M")).await?;
        ctx.wait_local(&[CLIENT_PORT]).await
    }

    async fn start_slave(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.wait_master(self.master_ports()).await?;
        ctx.stop(STOP).await;
        ctx.reset_dir(&Self::data(ctx)).await?;
        let follow = format!("-O {}:{} -S", ctx.master_ip(), REPLICATION_PORT);
        ctx.launch(&Self::command(ctx, &follow)).await?;
        ctx.wait_local(&[CLIENT_PORT]).await
    }

    async fn stop_master(&self, ctx: &Context<'_>) {
        ctx.stop(STOP).await;
    }

    async fn stop_slave(&self, ctx: &Context<'_>) {
        ctx.stop(STOP).await;
    }
}
