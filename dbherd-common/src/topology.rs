use crate::{
    configs::manifest::{Credentials, Node},
    error::Error,
    roles::RoleSet,
};

pub const ZOOKEEPER_PORT: u16 = 2181;

pub const REPLICATION_KEY: &str = "replication";
pub const VOLDEMORT_READ_KEY: &str = "voldemortr";
pub const VOLDEMORT_WRITE_KEY: &str = "voldemortw";

/// Master/slave/zookeeper assignment derived from one manifest snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    master_ip: String,
    slave_ips: Vec<String>,
    zookeeper_ips: Vec<String>,
}

impl Topology {
    /// Scans nodes once in manifest order. The first `db_master` wins, slaves
    /// never contain the master ip.
    /// # Errors
    /// Config error if no node holds `db_master`.
    pub fn build(nodes: &[Node]) -> Result<Self, Error> {
        let mut master_ip: Option<&str> = None;
        let mut slave_ips: Vec<String> = Vec::new();
        let mut zookeeper_ips: Vec<String> = Vec::new();
        for node in nodes {
            let roles = node.roles();
            let ip = node.private_ip();
            if roles.is_db_master() {
                match master_ip {
                    None => master_ip = Some(ip),
                    Some(master) => warn!(
                        "node {} is also tagged db_master, keeping {} as master",
                        ip, master
                    ),
                }
            }
            if roles.is_db_slave() && !slave_ips.iter().any(|s| s == ip) {
                slave_ips.push(ip.to_owned());
            }
            if roles.is_zookeeper() && !zookeeper_ips.iter().any(|z| z == ip) {
                zookeeper_ips.push(ip.to_owned());
            }
        }
        let master_ip = master_ip
            .filter(|ip| !ip.is_empty())
            .ok_or_else(|| Error::config("no node with role db_master found"))?
            .to_owned();
        slave_ips.retain(|ip| *ip != master_ip);
        debug!(
            "topology: master {}, slaves {:?}, zookeeper {:?}",
            master_ip, slave_ips, zookeeper_ips
        );
        Ok(Self {
            master_ip,
            slave_ips,
            zookeeper_ips,
        })
    }

    pub fn master_ip(&self) -> &str {
        &self.master_ip
    }

    pub fn slave_ips(&self) -> &[String] {
        &self.slave_ips
    }

    pub fn zookeeper_ips(&self) -> &[String] {
        &self.zookeeper_ips
    }

    /// `ip1:2181,ip2:2181,...` in manifest order.
    pub fn zookeeper_quorum(&self) -> String {
        self.zookeeper_ips
            .iter()
            .map(|ip| format!("{}:{}", ip, ZOOKEEPER_PORT))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Master first, then slaves.
    pub fn db_nodes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.master_ip.as_str()).chain(self.slave_ips.iter().map(String::as_str))
    }

    pub fn db_node_count(&self) -> usize {
        1 + self.slave_ips.len()
    }

    /// Position of `ip` in [`Topology::db_nodes`].
    pub fn node_index(&self, ip: &str) -> Option<usize> {
        self.db_nodes().position(|n| n == ip)
    }

    pub fn is_master(&self, ip: &str) -> bool {
        self.master_ip == ip
    }

    pub fn is_slave(&self, ip: &str) -> bool {
        self.slave_ips.iter().any(|s| s == ip)
    }

    pub fn is_zookeeper(&self, ip: &str) -> bool {
        self.zookeeper_ips.iter().any(|z| z == ip)
    }
}

/// Replication factor and optional read/write quorum sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replication {
    factor: u32,
    read_quorum: Option<u32>,
    write_quorum: Option<u32>,
}

impl Replication {
    /// # Errors
    /// Config error on a missing or non-positive factor, or a quorum above it.
    pub fn new(factor: u32, read_quorum: Option<u32>, write_quorum: Option<u32>) -> Result<Self, Error> {
        if factor == 0 {
            return Err(Error::config("replication factor must be greater than 0"));
        }
        for (name, quorum) in [("read", read_quorum), ("write", write_quorum)] {
            match quorum {
                Some(0) => {
                    return Err(Error::config(format!("{} quorum must be greater than 0", name)))
                }
                Some(q) if q > factor => {
                    return Err(Error::config(format!(
                        "{} quorum {} exceeds replication factor {}",
                        name, q, factor
                    )))
                }
                _ => {}
            }
        }
        Ok(Self {
            factor,
            read_quorum,
            write_quorum,
        })
    }

    /// Reads `replication`, `voldemortr` and `voldemortw`.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self, Error> {
        let factor = parse_positive(REPLICATION_KEY, credentials.require(REPLICATION_KEY)?)?;
        let read = credentials
            .get(VOLDEMORT_READ_KEY)
            .map(|v| parse_positive(VOLDEMORT_READ_KEY, v))
            .transpose()?;
        let write = credentials
            .get(VOLDEMORT_WRITE_KEY)
            .map(|v| parse_positive(VOLDEMORT_WRITE_KEY, v))
            .transpose()?;
        Self::new(factor, read, write)
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }

    pub fn read_quorum(&self) -> Option<u32> {
        self.read_quorum
    }

    pub fn write_quorum(&self) -> Option<u32> {
        self.write_quorum
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u32, Error> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|e| Error::config(format!("credential '{}' = '{}' is not a number: {}", key, value, e)))
}

/// The machine this orchestration pass runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNode {
    private_ip: String,
    roles: RoleSet,
}

impl LocalNode {
    pub fn new(private_ip: impl Into<String>, roles: RoleSet) -> Self {
        Self {
            private_ip: private_ip.into(),
            roles,
        }
    }

    pub fn from_manifest_node(node: &Node) -> Self {
        Self::new(node.private_ip(), node.roles())
    }

    pub fn private_ip(&self) -> &str {
        &self.private_ip
    }

    pub fn roles(&self) -> RoleSet {
        self.roles
    }
}
