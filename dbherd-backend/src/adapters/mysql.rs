use super::soap_on_db_nodes;
use crate::prelude::*;

const MGMD_PORT: u16 = 1186;
const NDBD_PORT: u16 = 2202;
const MYSQLD_PORT: u16 = 3306;
const PORTS: [u16; 3] = [MGMD_PORT, NDBD_PORT, MYSQLD_PORT];

/// MySQL Cluster: management node on the master, `ndbd` and `mysqld` on every DB node.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySQL;

impl MySQL {
    fn home(ctx: &Context<'_>) -> PathBuf {
        ctx.layout().backend_home(BackendType::MySQL)
    }

    fn my_cnf(ctx: &Context<'_>) -> PathBuf {
        Self::home(ctx).join("etc").join("my.cnf")
    }

    fn mgmd_cnf(ctx: &Context<'_>) -> PathBuf {
        Self::home(ctx).join("etc").join("ndb_mgmd.cnf")
    }

    fn ndbd_data(ctx: &Context<'_>) -> PathBuf {
        ctx.layout().data("mysql-cluster")
    }

    fn mgmd_data(ctx: &Context<'_>) -> PathBuf {
        ctx.layout().data("mysql-mgmd")
    }

    fn mysqladmin_shutdown(ctx: &Context<'_>) -> String {
        format!(
            "mysqladmin --defaults-file={} -u root shutdown",
            Self::my_cnf(ctx).display()
        )
    }

    async fn render_my_cnf(&self, ctx: &Context<'_>) -> Result<(), Error> {
        let subs = Substitutions::for_context(ctx);
        let src = ctx.layout().template(BackendType::MySQL, "my.cnf");
        TemplateRenderer::render_file(&src, &Self::my_cnf(ctx), &subs).await
    }

    async fn start_data_and_sql_nodes(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.stop(&Self::mysqladmin_shutdown(ctx)).await;
        ctx.stop("pkill -f ndbd").await;
        ctx.reset_dir(&Self::ndbd_data(ctx)).await?;
        ctx.launch(&format!(
            "ndbd --ndb-connectstring={}:{}",
            ctx.master_ip(),
            MGMD_PORT
        ))
        .await?;
        ctx.launch(&format!(
            "mysqld_safe --defaults-file={}",
            Self::my_cnf(ctx).display()
        ))
        .await?;
        ctx.wait_local(&[MYSQLD_PORT]).await
    }
}

/// `config.ini` of the management node, one `[ndbd]` and one `[mysqld]`
/// section per DB node.
/// # Errors
/// Config error when the data node count is not a multiple of the
/// replication factor, ndbd refuses to start otherwise.
pub fn ndb_mgmd_cnf(
    topology: &Topology,
    replication: &Replication,
    ndbd_dir: &Path,
    mgmd_dir: &Path,
) -> Result<String, Error> {
    let replicas = replication.factor() as usize;
    let data_nodes = topology.db_node_count();
    if data_nodes % replicas != 0 {
        return Err(Error::config(format!(
            "mysql cluster needs the number of data nodes ({}) to be a multiple of replication ({})",
            data_nodes, replicas
        )));
    }
    let mut cnf = format!(
        "[ndbd default]\nNoOfReplicas={}\nDataDir={}\nServerPort={}\n\n[ndb_mgmd]\nHostName={}\nDataDir={}\n",
        replicas,
        ndbd_dir.display(),
        NDBD_PORT,
        topology.master_ip(),
        mgmd_dir.display()
    );
    for section in ["ndbd", "mysqld"] {
        for ip in topology.db_nodes() {
            cnf.push_str(&format!("\n[{}]\nHostName={}\n", section, ip));
        }
    }
    Ok(cnf)
}

#[async_trait]
impl DatastoreAdapter for MySQL {
    fn kind(&self) -> BackendType {
        BackendType::MySQL
    }

    fn uaserver_ip(&self, ctx: &Context<'_>) -> String {
        ctx.nearest_db_node().to_owned()
    }

    fn db_ports(&self) -> &'static [u16] {
        &PORTS
    }

    fn master_ports(&self) -> &'static [u16] {
        &[MGMD_PORT]
    }

    fn has_soap_server(&self, roles: RoleSet) -> bool {
        soap_on_db_nodes(roles)
    }

    async fn setup_config(&self, ctx: &Context<'_>) -> Result<(), Error> {
        let cnf = ndb_mgmd_cnf(
            ctx.topology(),
            ctx.replication(),
            &Self::ndbd_data(ctx),
            &Self::mgmd_data(ctx),
        )?;
        TemplateRenderer::write(&Self::mgmd_cnf(ctx), &cnf).await?;
        self.render_my_cnf(ctx).await
    }

    async fn start_master(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.stop(&format!("ndb_mgm -c {}:{} -e shutdown", ctx.master_ip(), MGMD_PORT))
            .await;
        ctx.reset_dir(&Self::mgmd_data(ctx)).await?;
        ctx.launch(&format!(
            "ndb_mgmd -f {} --configdir={} --reload",
            Self::mgmd_cnf(ctx).display(),
            Self::mgmd_data(ctx).display()
        ))
        .await?;
        ctx.wait_local(&[MGMD_PORT]).await?;
        self.start_data_and_sql_nodes(ctx).await
    }

    async fn start_slave(&self, ctx: &Context<'_>) -> Result<(), Error> {
        ctx.wait_master(self.master_ports()).await?;
        self.render_my_cnf(ctx).await?;
        self.start_data_and_sql_nodes(ctx).await
    }

    async fn stop_master(&self, ctx: &Context<'_>) {
        ctx.stop(&Self::mysqladmin_shutdown(ctx)).await;
        ctx.stop(&format!("ndb_mgm -c {}:{} -e shutdown", ctx.master_ip(), MGMD_PORT))
            .await;
    }

    async fn stop_slave(&self, ctx: &Context<'_>) {
        ctx.stop(&Self::mysqladmin_shutdown(ctx)).await;
        ctx.stop("pkill -f ndbd").await;
    }
}
