use crate::prelude::*;
use tokio::fs::{create_dir_all, read_to_string, write};

pub const ACCESS_FILE: &str = "db_access.yaml";
pub const ZOOKEEPER_FILE: &str = "zookeeper_locations";

/// Where the rest of the deployment reaches the datastore from this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPoint {
    backend: String,
    uaserver_ip: String,
    db_ports: Vec<u16>,
    has_soap_server: bool,
}

impl AccessPoint {
    pub fn new(adapter: &dyn DatastoreAdapter, ctx: &Context<'_>) -> Self {
        Self {
            backend: adapter.kind().to_string(),
            uaserver_ip: adapter.uaserver_ip(ctx),
            db_ports: adapter.db_ports().to_vec(),
            has_soap_server: adapter.has_soap_server(ctx.local().roles()),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn uaserver_ip(&self) -> &str {
        &self.uaserver_ip
    }

    pub fn db_ports(&self) -> &[u16] {
        &self.db_ports
    }

    pub fn has_soap_server(&self) -> bool {
        self.has_soap_server
    }
}

/// Files under the state dir that other AppScale components read.
#[derive(Debug, Clone)]
pub struct Registry {
    state_dir: PathBuf,
}

impl Registry {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn from_layout(layout: &Layout) -> Self {
        Self::new(layout.state_dir())
    }

    pub fn access_file(&self) -> PathBuf {
        self.state_dir.join(ACCESS_FILE)
    }

    pub fn zookeeper_file(&self) -> PathBuf {
        self.state_dir.join(ZOOKEEPER_FILE)
    }

    /// One address per line, sorted and without duplicates.
    pub fn zookeeper_locations(topology: &Topology) -> String {
        let mut ips = topology.zookeeper_ips().to_vec();
        ips.sort();
        ips.dedup();
        ips.into_iter().map(|ip| ip + "\n").collect()
    }

    pub async fn record(&self, access: &AccessPoint, topology: &Topology) -> Result<(), Error> {
        create_dir_all(&self.state_dir)
            .await
            .map_err(|e| Error::template_io(&self.state_dir, &e))?;
        let yaml = serde_yaml::to_string(access)
            .map_err(|e| Error::config(format!("can't serialize access point: {}", e)))?;
        let access_file = self.access_file();
        write(&access_file, yaml)
            .await
            .map_err(|e| Error::template_io(&access_file, &e))?;
        let zk_file = self.zookeeper_file();
        write(&zk_file, Self::zookeeper_locations(topology))
            .await
            .map_err(|e| Error::template_io(&zk_file, &e))?;
        info!(
            "recorded {} at {} ports {:?}",
            access.backend, access.uaserver_ip, access.db_ports
        );
        Ok(())
    }

    pub async fn load(&self) -> Result<AccessPoint, Error> {
        let path = self.access_file();
        let yaml = read_to_string(&path)
            .await
            .map_err(|e| Error::template_io(&path, &e))?;
        serde_yaml::from_str(&yaml)
            .map_err(|e| Error::config(format!("can't parse {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbherd_common::configs::manifest::Node;
    use tempfile::tempdir;

    fn access() -> AccessPoint {
        AccessPoint {
            backend: "cassandra".to_string(),
            uaserver_ip: "10.0.0.2".to_string(),
            db_ports: vec![7000, 7001, 7199, 9160],
            has_soap_server: true,
        }
    }

    #[test]
    fn zookeeper_locations_are_sorted_and_unique() {
        let nodes = vec![
            Node::new("10.0.0.9", "", &["zookeeper", "db_master"]),
            Node::new("10.0.0.10", "", &["zookeeper"]),
            Node::new("10.0.0.3", "", &["zookeeper", "db_slave"]),
        ];
        let topology = Topology::build(&nodes).unwrap();
        assert_eq!(
            Registry::zookeeper_locations(&topology),
            "10.0.0.10\n10.0.0.3\n10.0.0.9\n"
        );
    }

    #[tokio::test]
    async fn record_round_trips_through_yaml() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path().join("state"));
        let topology = Topology::build(&[Node::new("10.0.0.1", "", &["db_master"])]).unwrap();
        registry.record(&access(), &topology).await.unwrap();
        assert_eq!(registry.load().await.unwrap(), access());
        assert_eq!(
            std::fs::read_to_string(registry.zookeeper_file()).unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn load_without_record_names_the_file() {
        let dir = tempdir().unwrap();
        let err = Registry::new(dir.path()).load().await.unwrap_err();
        assert!(err.is_template_io());
        assert!(err.to_string().contains(ACCESS_FILE));
    }
}
