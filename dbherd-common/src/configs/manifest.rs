use super::{
    reader::YamlConfig,
    validation::{Validatable, Validator},
};
use crate::{error::Error, roles::RoleSet};
use std::{collections::BTreeMap, path::Path};

/// One machine of the deployment, as reported by the cluster controller.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Node {
    private_ip: String,
    #[serde(default)]
    public_ip: String,
    #[serde(default)]
    roles: Vec<String>,
}

impl Node {
    pub fn new(private_ip: impl Into<String>, public_ip: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            private_ip: private_ip.into(),
            public_ip: public_ip.into(),
            roles: roles.iter().map(|r| (*r).to_owned()).collect(),
        }
    }

    /// Stable identifier of the node.
    #[inline]
    #[must_use]
    pub fn private_ip(&self) -> &str {
        &self.private_ip
    }

    #[must_use]
    pub fn roles(&self) -> RoleSet {
        RoleSet::from_tags(&self.roles)
    }
}

impl Validatable for Node {
    fn validate(&self) -> Result<(), String> {
        if Validator::is_unset(&self.private_ip) {
            return Err("node must contain not empty field 'private_ip'".to_string());
        }
        Validator::validate_no_duplicates(self.roles.iter()).map_err(|dup_item| {
            format!(
                "node '{}' lists role '{}' more than once",
                self.private_ip, dup_item
            )
        })
    }
}

/// Credential values arrive as strings, integers or booleans.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Str(s) => s,
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// Deployment-wide key/value options (`replication`, `voldemortr`, ...).
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
#[serde(from = "BTreeMap<String, Scalar>")]
pub struct Credentials(BTreeMap<String, String>);

impl From<BTreeMap<String, Scalar>> for Credentials {
    fn from(raw: BTreeMap<String, Scalar>) -> Self {
        Self(raw.into_iter().map(|(k, v)| (k, v.into_string())).collect())
    }
}

impl Credentials {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Looks up a key, treating an empty value as absent.
    /// # Errors
    /// Config error naming the missing key.
    pub fn require(&self, key: &str) -> Result<&str, Error> {
        self.get(key)
            .filter(|v| !Validator::is_unset(v))
            .ok_or_else(|| Error::config(format!("credential '{}' is missing", key)))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

/// Node-role manifest: the immutable snapshot one orchestration pass works from.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Manifest {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    credentials: Credentials,
}

impl Manifest {
    pub fn new(nodes: Vec<Node>, credentials: Credentials) -> Self {
        Self { nodes, credentials }
    }

    /// Returns slice with [`Node`]s in manifest order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn find(&self, private_ip: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.private_ip() == private_ip)
    }

    /// Loads manifest from disk, and validates it.
    /// # Errors
    /// IO errors and failed validation.
    pub fn try_get(filename: impl AsRef<Path>) -> Result<Self, Error> {
        YamlConfig::get(filename)
    }

    pub fn get_from_string(file: &str) -> Result<Self, Error> {
        let config: Self = YamlConfig::get_from_string(file)?;
        debug!("manifest: {:?}", config);
        Ok(config)
    }
}

impl Validatable for Manifest {
    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("manifest requires at least one node".to_owned());
        }
        Validator::aggregate(&self.nodes)
            .map_err(|e| format!("some nodes in manifest are invalid: {}", e))?;

        Validator::validate_no_duplicates(self.nodes.iter().map(|node| &node.private_ip))
            .map_err(|dup_item| format!("manifest contains duplicate private ips: {}", dup_item))?;

        let masters = self
            .nodes
            .iter()
            .filter(|n| n.roles().is_db_master())
            .count();
        if masters > 1 {
            warn!(
                "manifest declares {} db_master nodes, the first one in list order is used",
                masters
            );
        }
        Ok(())
    }
}

pub mod tests {
    use super::{Credentials, Manifest, Node};

    /// One master, `slaves` slaves and a zookeeper on the master, 10.0.0.x addressing.
    #[must_use]
    pub fn manifest(slaves: u8, replication: u32) -> Manifest {
        let mut nodes = vec![Node::new("10.0.0.1", "203.0.113.1", &["db_master", "zookeeper"])];
        nodes.extend((0..slaves).map(|i| {
            Node::new(
                format!("10.0.0.{}", i + 2),
                format!("203.0.113.{}", i + 2),
                &["db_slave"],
            )
        }));
        let mut credentials = Credentials::default();
        credentials.insert("replication", replication.to_string());
        Manifest::new(nodes, credentials)
    }
}
