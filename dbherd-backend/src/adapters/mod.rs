pub mod cassandra;
pub(crate) mod hadoop;
pub mod hbase;
pub mod hypertable;
pub mod memcachedb;
pub mod mongodb;
pub mod mysql;
pub mod redisdb;
pub mod scalaris;
pub mod timesten;
pub mod voldemort;

#[cfg(test)]
mod adapters_tests;

use crate::prelude::*;

/// Backends that run a SOAP server next to every database process.
pub(crate) fn soap_on_db_nodes(roles: RoleSet) -> bool {
    roles.is_db_node()
}

/// Backends with one SOAP server, on the master.
pub(crate) fn soap_on_master(roles: RoleSet) -> bool {
    roles.is_db_master()
}

/// Renders `<templates>/<backend>` into `dest` with the standard tokens.
pub(crate) async fn render_backend(
    ctx: &Context<'_>,
    backend: BackendType,
    dest: &Path,
    subs: &Substitutions,
) -> Result<(), Error> {
    let templates = ctx.layout().backend_templates(backend);
    TemplateRenderer::render(&templates, dest, subs).await?;
    Ok(())
}
