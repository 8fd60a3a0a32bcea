use super::soap_on_master;
use crate::prelude::*;

const PORT: u16 = 6379;
const PORTS: [u16; 1] = [PORT];

#[derive(Debug, Default, Clone, Copy)]
pub struct Redis;

impl Redis {
    fn conf(ctx: &Context<'_>) -> PathBuf {
        ctx.layout()
            .backend_home(BackendType::Redis)
            .join("redis.conf")
    }

    fn shutdown(ctx: &Context<'_>) -> String {
        format!("redis-cli -h {} -p {} shutdown", ctx.local_ip(), PORT)
    }

    async fn launch(&self, ctx: &Context<'_>, extra: &str) -> Result<(), Error> {
        ctx.stop(&Self::shutdown(ctx)).await;
        ctx.reset_dir(&ctx.layout().data("redisdb")).await?;
        let command = format!("redis-server {} {}", Self::conf(ctx).display(), extra);
        ctx.launch(command.trim_end()).await?;
        ctx.wait_local(&[PORT]).await
    }
}

#[async_trait]
impl DatastoreAdapter for Redis {
    fn kind(&self) -> BackendType {
        BackendType::Redis
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

    async fn setup_config(&self, ctx: &Context<'_>) -> Result<(), Error> {
        let src = ctx.layout().template(self.kind(), "redis.conf");
        TemplateRenderer::render_file(&src, &Self::conf(ctx), &Substitutions::for_context(ctx))
            .await
    }

    async fn start_master(&self, ctx: &Context<'_>) -> Result<(), Error> {
        self.launch(ctx, "").await
    }

    async fn start_slave(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.wait_master(self.master_ports()).await?;
        self.setup_config(ctx).await?;
        self.launch(ctx, &format!("--slaveof {} {}", ctx.master_ip(), PORT))
            .await
    }

    async fn stop_master(&self, ctx: &Context<'_>) {
        ctx.stop(&Self::shutdown(ctx)).await;
    }

    async fn stop_slave(&self, ctx: &Context<'_>) {
        ctx.stop(&Self::shutdown(ctx)).await;
    }
}
