use super::soap_on_db_nodes;
use crate::prelude::*;

const SOCKET_PORT: u16 = 6666;
const ADMIN_PORT: u16 = 6667;
const HTTP_PORT: u16 = 8081;
const PORTS: [u16; 3] = [SOCKET_PORT, ADMIN_PORT, HTTP_PORT];
const PARTITIONS_PER_NODE: usize = 4;
const STOP: &str = "pkill -f voldemort.server.VoldemortServer";

pub const READ_QUORUM: &str = "VOLDEMORT-R";
pub const WRITE_QUORUM: &str = "VOLDEMORT-W";

#[derive(Debug, Default, Clone, Copy)]
pub struct Voldemort;

impl Voldemort {
    fn home(ctx: &Context<'_>) -> PathBuf {
        ctx.layout().backend_home(BackendType::Voldemort)
    }

    fn config_dir(ctx: &Context<'_>) -> PathBuf {
        Self::home(ctx).join("config")
    }

    async fn launch(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.stop(STOP).await;
        ctx.reset_dir(&ctx.layout().data("voldemort")).await?;
        ctx.launch(&format!(
            "{}/bin/voldemort-server.sh {}",
            Self::home(ctx).display(),
            Self::config_dir(ctx).display()
        ))
        .await?;
        ctx.wait_local(&[SOCKET_PORT, ADMIN_PORT]).await
    }
}

/// R and W are mandatory for Voldemort, and N can not exceed the ring size.
fn quorums(topology: &Topology, replication: &Replication) -> Result<(u32, u32), Error> {
    let nodes = topology.db_node_count();
    if replication.factor() as usize > nodes {
        return Err(Error::config(format!(
            "voldemort replication {} exceeds the number of db nodes {}",
            replication.factor(),
            nodes
        )));
    }
    let read = replication
        .read_quorum()
        .ok_or_else(|| Error::config("voldemort needs credential 'voldemortr'"))?;
    let write = replication
        .write_quorum()
        .ok_or_else(|| Error::config("voldemort needs credential 'voldemortw'"))?;
    Ok((read, write))
}

/// One `<server>` per DB node, node ids follow [`Topology::db_nodes`] and
/// every node owns a contiguous run of partitions.
pub fn cluster_xml(topology: &Topology) -> String {
    let mut xml = String::from("<cluster>\n  <name>appscale</name>\n");
    for (id, ip) in topology.db_nodes().enumerate() {
        let first = id * PARTITIONS_PER_NODE;
        let partitions = (first..first + PARTITIONS_PER_NODE)
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        xml.push_str(&format!(
            "  <server>\n    <id>{}</id>\n    <host>{}</host>\n    <http-port>{}</http-port>\n    \
             <socket-port>{}</socket-port>\n    <admin-port>{}</admin-port>\n    \
             <partitions>{}</partitions>\n  </server>\n",
            id, ip, HTTP_PORT, SOCKET_PORT, ADMIN_PORT, partitions
        ));
    }
    xml.push_str("</cluster>\n");
    xml
}

#[async_trait]
impl DatastoreAdapter for Voldemort {
    fn kind(&self) -> BackendType {
        BackendType::Voldemort
    }

    fn uaserver_ip(&self, ctx: &Context<'_>) -> String {
        ctx.nearest_db_node().to_owned()
    }

    fn db_ports(&self) -> &'static [u16] {
        &PORTS
    }

    fn master_ports(&self) -> &'static [u16] {
        &[SOCKET_PORT]
    }

    fn has_soap_server(&self, roles: RoleSet) -> bool {
        soap_on_db_nodes(roles)
    }

    /// `cluster.xml` is generated, `stores.xml` and `server.properties` are
    /// rendered from templates.
    async fn setup_config(&self, ctx: &Context<'_>) -> Result<(), Error> {
        let (read, write) = quorums(ctx.topology(), ctx.replication())?;
        let dir = Self::config_dir(ctx);
        TemplateRenderer::write(&dir.join("cluster.xml"), &cluster_xml(ctx.topology())).await?;
        let subs = Substitutions::for_context(ctx)
            .with(READ_QUORUM, read.to_string())
            .with(WRITE_QUORUM, write.to_string());
        for part in ["stores.xml", "server.properties"] {
            let src = ctx.layout().template(self.kind(), part);
            TemplateRenderer::render_file(&src, &dir.join(part), &subs).await?;
        }
        Ok(())
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
}
