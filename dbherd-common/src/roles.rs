use std::fmt::{Display, Formatter, Result as FmtResult};

pub const DB_MASTER: &str = "db_master";
pub const DB_SLAVE: &str = "db_slave";
pub const ZOOKEEPER: &str = "zookeeper";
pub const LOAD_BALANCER: &str = "load_balancer";
pub const SHADOW: &str = "shadow";
pub const COMPUTE: &str = "compute";

bitflags! {
    /// Roles of a node that the datastore layer cares about.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RoleSet: u8 {
        const DB_MASTER = 0x01;
        const DB_SLAVE = 0x02;
        const ZOOKEEPER = 0x04;
        const LOAD_BALANCER = 0x08;
        const SHADOW = 0x10;
        const COMPUTE = 0x20;
    }
}

const NAMES: [(&str, RoleSet); 6] = [
    (DB_MASTER, RoleSet::DB_MASTER),
    (DB_SLAVE, RoleSet::DB_SLAVE),
    (ZOOKEEPER, RoleSet::ZOOKEEPER),
    (LOAD_BALANCER, RoleSet::LOAD_BALANCER),
    (SHADOW, RoleSet::SHADOW),
    (COMPUTE, RoleSet::COMPUTE),
];

impl RoleSet {
    /// Unrecognised tags are skipped.
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        tags.iter()
            .filter_map(|tag| Self::from_tag(tag.as_ref()))
            .fold(Self::empty(), |acc, role| acc | role)
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, role)| *role)
    }

    pub fn is_db_master(&self) -> bool {
        self.contains(Self::DB_MASTER)
    }

    pub fn is_db_slave(&self) -> bool {
        self.contains(Self::DB_SLAVE)
    }

    pub fn is_db_node(&self) -> bool {
        self.intersects(Self::DB_MASTER | Self::DB_SLAVE)
    }

    pub fn is_zookeeper(&self) -> bool {
        self.contains(Self::ZOOKEEPER)
    }
}

impl Display for RoleSet {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let names = NAMES
            .iter()
            .filter(|(_, role)| self.contains(*role))
            .map(|(name, _)| *name)
            .collect::<Vec<_>>();
        if names.is_empty() {
            write!(f, "[]")
        } else {
            write!(f, "[{}]", names.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_are_ignored() {
        let roles = RoleSet::from_tags(&["db_slave", "appengine", "zookeeper"]);
        assert_eq!(roles, RoleSet::DB_SLAVE | RoleSet::ZOOKEEPER);
        assert!(roles.is_db_node());
        assert!(!roles.is_db_master());
    }

    #[test]
    fn display_lists_roles_in_fixed_order() {
        let roles = RoleSet::ZOOKEEPER | RoleSet::DB_MASTER;
        assert_eq!(roles.to_string(), "[db_master, zookeeper]");
        assert_eq!(RoleSet::empty().to_string(), "[]");
    }

    #[test]
    fn default_holds_no_roles() {
        let roles = RoleSet::default();
        assert_eq!(roles, RoleSet::empty());
        assert!(!roles.is_db_node());
        assert!(!roles.is_zookeeper());
    }
}
