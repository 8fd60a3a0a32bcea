//! HDFS underneath HBase and Hypertable.

use crate::prelude::*;

pub(crate) const NAMENODE_PORT: u16 = 9000;
pub(crate) const DATANODE_PORT: u16 = 50010;
pub(crate) const NAMENODE_HTTP_PORT: u16 = 50070;

pub(crate) fn home(ctx: &Context<'_>) -> PathBuf {
    ctx.layout().appscale_home().join("AppDB").join("hadoop")
}

fn daemon(ctx: &Context<'_>, action: &str, role: &str) -> String {
    format!(
        "{}/bin/hadoop-daemon.sh {} {}",
        home(ctx).display(),
        action,
        role
    )
}

pub(crate) async fn setup_config(ctx: &Context<'_>, subs: &Substitutions) -> Result<(), Error> {
    let templates = ctx.layout().templates_dir().join("hadoop");
    TemplateRenderer::render(&templates, &home(ctx).join("conf"), subs).await?;
    Ok(())
}

/// Formats HDFS on a clean start, then brings up the namenode.
pub(crate) async fn start_namenode(ctx: &Context<'_>) -> Result<(), Error> {
    ctx.stop(&daemon(ctx, "stop", "namenode")).await;
    let data = ctx.layout().data("hadoop");
    if ctx.layout().clean_start() {
        ctx.reset_dir(&data).await?;
        let format = format!("{}/bin/hadoop namenode -format -force", home(ctx).display());
        let output = ctx.process().run(&format).await?;
        if !output.success() {
            return Err(Error::process(format, output.stderr.trim().to_owned()));
        }
    }
    ctx.launch(&daemon(ctx, "start", "namenode")).await?;
    ctx.wait_local(&[NAMENODE_PORT]).await
}

pub(crate) async fn start_datanode(ctx: &Context<'_>) -> Result<(), Error> {
    ctx.stop(&daemon(ctx, "stop", "datanode")).await;
    ctx.reset_dir(&ctx.layout().data("hadoop-data")).await?;
    ctx.launch(&daemon(ctx, "start", "datanode")).await
}

pub(crate) async fn stop_datanode(ctx: &Context<'_>) {
    ctx.stop(&daemon(ctx, "stop", "datanode")).await;
}

pub(crate) async fn stop_all(ctx: &Context<'_>) {
    stop_datanode(ctx).await;
    ctx.stop(&daemon(ctx, "stop", "namenode")).await;
}
