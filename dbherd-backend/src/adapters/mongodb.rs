use super::soap_on_master;
use crate::prelude::*;

const PORT: u16 = 27017;
const REST_PORT: u16 = 28017;
const PORTS: [u16; 2] = [PORT, REST_PORT];
const STOP: &str = "pkill -f mongod";

#[derive(Debug, Default, Clone, Copy)]
pub struct MongoDB;

impl MongoDB {
    fn command(ctx: &Context<'_>, role_args: &str) -> String {
        let data = ctx.layout().data("mongodb");
        format!(
            "mongod {} --dbpath {} --port {} --rest --logpath {}/mongodb.log",
            role_args,
            data.display(),
            PORT,
            data.display()
        )
    }

    async fn launch(&self, ctx: &Context<'_>, role_args: &str) -> Result<(), Error> {
        ctx.stop(STOP).await;
        ctx.reset_dir(&ctx.layout().data("mongodb")).await?;
        ctx.launch(&Self::command(ctx, role_args)).await?;
        ctx.wait_local(&[PORT]).await
    }
}

#[async_trait]
impl DatastoreAdapter for MongoDB {
    fn kind(&self) -> BackendType {
        BackendType::MongoDB
    }

    fn uaserver_ip(&self, ctx: &Context<'_>) -> String {
        ctx.master_ip().to_owned()
    }

    fn db_ports(&self) -> &'static [u16] {
        &PORTS
    }

    fn master_ports(&self) -> &'static [u16] {
        &[PORT]
    }

    fn has_soap_server(&self, roles: RoleSet) -> bool {
        soap_on_master(roles)
    }

    async fn setup_config(&self, _ctx: &Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    async fn start_master(&self, ctx: &Context<'_>) -> Result<(), Error> {
        self.launch(ctx, "--master").await
    }

    async fn start_slave(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.wait_master(self.master_ports()).await?;
        let source = format!("--slave --source {}:{}", ctx.master_ip(), PORT);
        self.launch(ctx, &source).await
    }

    async fn stop_master(&self, ctx: &Context<'_>) {
        ctx.stop(STOP).await;
    }

    async fn stop_slave(&self, ctx: &Context<'_>) {
        ctx.stop(STOP).await;
    }
}
