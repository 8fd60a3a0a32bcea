use super::soap_on_db_nodes;
use crate::prelude::*;
use std::net::Ipv4Addr;

const EPMD_PORT: u16 = 4369;
const YAWS_PORT: u16 = 8000;
const NODE_PORT: u16 = 14195;
const PORTS: [u16; 3] = [EPMD_PORT, YAWS_PORT, NODE_PORT];
const NODE_NAME: &str = "node";

/// Erlang DHT. The master boots the ring as first node, every other DB node
/// joins it through `known_hosts`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Scalaris;

impl Scalaris {
    fn home(ctx: &Context<'_>) -> PathBuf {
        ctx.layout().backend_home(BackendType::Scalaris)
    }

    fn scalarisctl(ctx: &Context<'_>) -> String {
        format!("{}/bin/scalarisctl", Self::home(ctx).display())
    }

    /// Launch, stop and status must all address the same Erlang node.
    fn node_name(ctx: &Context<'_>) -> String {
        format!("{}@{}", NODE_NAME, ctx.local_ip())
    }

    fn stop_command(ctx: &Context<'_>) -> String {
        format!("{} -n {} stop", Self::scalarisctl(ctx), Self::node_name(ctx))
    }

    fn status_command(ctx: &Context<'_>) -> String {
        format!(
            "{} -n {} status | grep -c running",
            Self::scalarisctl(ctx),
            Self::node_name(ctx)
        )
    }

    async fn launch(&self, ctx: &Context<'_>, first: bool) -> Result<(), Error> {
        ctx.stop(&Self::stop_command(ctx)).await;
        ctx.reset_dir(&ctx.layout().data("scalaris")).await?;
        let mode = if first { "-f -m " } else { "" };
        ctx.launch(&format!(
            "{} -n {} -p {} -y {} {}-d start",
            Self::scalarisctl(ctx),
            Self::node_name(ctx),
            NODE_PORT,
            YAWS_PORT,
            mode
        ))
        .await?;
        ctx.waiter()
            .wait_until_healthy(ctx.process(), &Self::status_command(ctx))
            .await?;
        ctx.wait_local(&[NODE_PORT]).await
    }
}

fn erlang_ip(ip: &str) -> Result<String, Error> {
    let addr: Ipv4Addr = ip
        .parse()
        .map_err(|_| Error::config(format!("scalaris needs IPv4 node addresses, got '{}'", ip)))?;
    let [a, b, c, d] = addr.octets();
    Ok(format!("{{{},{},{},{}}}", a, b, c, d))
}

/// `scalaris.local.cfg` in Erlang term syntax.
/// # Errors
/// Config error if any DB node address is not IPv4.
pub fn local_cfg(topology: &Topology, replication: &Replication, local_ip: &str) -> Result<String, Error> {
    let master = erlang_ip(topology.master_ip())?;
    let known_hosts = topology
        .db_nodes()
        .map(|ip| erlang_ip(ip).map(|ip| format!("{{{},{},service_per_vm}}", ip, NODE_PORT)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!(
        "{{listen_ip, {}}}.\n\
         {{mgmt_server, {{{},{},mgmt_server}}}}.\n\
         {{known_hosts, [{}]}}.\n\
         {{replication_factor, {}}}.\n",
        erlang_ip(local_ip)?,
        master,
        NODE_PORT,
        known_hosts.join(", "),
        replication.factor()
    ))
}

#[async_trait]
impl DatastoreAdapter for Scalaris {
    fn kind(&self) -> BackendType {
        BackendType::Scalaris
    }

    fn uaserver_ip(&self, ctx: &Context<'_>) -> String {
        ctx.nearest_db_node().to_owned()
    }

    fn db_ports(&self) -> &'static [u16] {
        &PORTS
    }

    fn master_ports(&self) -> &'static [u16] {
        &[NODE_PORT]
    }

    fn has_soap_server(&self, roles: RoleSet) -> bool {
        soap_on_db_nodes(roles)
    }

    async fn setup_config(&self, ctx: &Context<'_>) -> Result<(), Error> {
        let cfg = local_cfg(ctx.topology(), ctx.replication(), ctx.local_ip())?;
        let dest = Self::home(ctx).join("bin").join("scalaris.local.cfg");
        TemplateRenderer::write(&dest, &cfg).await
    }

    async fn start_master(&self, ctx: &Context<'_>) -> Result<(), Error> {
        self.launch(ctx, true).await
    }

    async fn start_slave(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.wait_master(self.master_ports()).await?;
        self.setup_config(ctx).await?;
        self.launch(ctx, false).await
    }

    async fn stop_master(&self, ctx: &Context<'_>) {
        ctx.stop(&Self::stop_command(ctx)).await;
    }

    async fn stop_slave(&self, ctx: &Context<'_>) {
        ctx.stop(&Self::stop_command(ctx)).await;
    }
}
