use super::{
    manifest::Manifest,
    reader::YamlConfig,
    validation::{Validatable, Validator},
};
use crate::error::Error;
use humantime::Duration as HumanDuration;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

const DEFAULT_APPSCALE_HOME: &str = "/root/appscale";
const DEFAULT_DATA_DIR: &str = "/var/appscale";
const DEFAULT_STATE_DIR: &str = "/etc/appscale";

#[derive(Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Clone, Copy)]
pub enum BackendType {
    Cassandra,
    HBase,
    Hypertable,
    MemcacheDB,
    MongoDB,
    MySQL,
    Redis,
    Scalaris,
    TimesTen,
    Voldemort,
}

impl BackendType {
    pub const ALL: [BackendType; 10] = [
        BackendType::Cassandra,
        BackendType::HBase,
        BackendType::Hypertable,
        BackendType::MemcacheDB,
        BackendType::MongoDB,
        BackendType::MySQL,
        BackendType::Redis,
        BackendType::Scalaris,
        BackendType::TimesTen,
        BackendType::Voldemort,
    ];

    /// Identifier used in node configs and install paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cassandra => "cassandra",
            Self::HBase => "hbase",
            Self::Hypertable => "hypertable",
            Self::MemcacheDB => "memcachedb",
            Self::MongoDB => "mongodb",
            Self::MySQL => "mysql",
            Self::Redis => "redisdb",
            Self::Scalaris => "scalaris",
            Self::TimesTen => "timesten",
            Self::Voldemort => "voldemort",
        }
    }
}

impl FromStr for BackendType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|backend| backend.as_str() == value)
            .copied()
            .ok_or_else(|| Error::unsupported_backend(value))
    }
}

impl Display for BackendType {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Filesystem locations every adapter resolves its paths against.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    appscale_home: PathBuf,
    templates_dir: PathBuf,
    data_dir: PathBuf,
    state_dir: PathBuf,
    clean_start: bool,
}

impl Layout {
    pub fn new(root: impl AsRef<Path>, clean_start: bool) -> Self {
        let root = root.as_ref();
        Self {
            appscale_home: root.join("appscale"),
            templates_dir: root.join("templates"),
            data_dir: root.join("data"),
            state_dir: root.join("state"),
            clean_start,
        }
    }

    pub fn appscale_home(&self) -> &Path {
        &self.appscale_home
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Whether stale backend data is wiped before the first start.
    pub fn clean_start(&self) -> bool {
        self.clean_start
    }

    /// `<home>/AppDB/<backend>`
    pub fn backend_home(&self, backend: BackendType) -> PathBuf {
        self.appscale_home.join("AppDB").join(backend.as_str())
    }

    /// `<templates>/<backend>`
    pub fn backend_templates(&self, backend: BackendType) -> PathBuf {
        self.templates_dir.join(backend.as_str())
    }

    /// `<templates>/<backend>/<part>`
    pub fn template(&self, backend: BackendType, part: &str) -> PathBuf {
        self.templates_dir.join(backend.as_str()).join(part)
    }

    /// `<data>/<name>`
    pub fn data(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

/// Local node configuration struct, stored in node.yaml.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Node {
    log_config: String,
    private_ip: String,
    backend_type: String,

    #[serde(default = "Node::default_appscale_home")]
    appscale_home: String,
    templates_dir: Option<String>,
    #[serde(default = "Node::default_data_dir")]
    data_dir: String,
    #[serde(default = "Node::default_state_dir")]
    state_dir: String,

    #[serde(default = "Node::default_poll_interval")]
    poll_interval: String,
    readiness_timeout: Option<String>,
    #[serde(default = "Node::default_probe_timeout")]
    probe_timeout: String,

    #[serde(default = "Node::default_clean_start")]
    clean_start: bool,
    #[serde(default = "Node::default_prime_retries")]
    prime_retries: u32,
    #[serde(default = "Node::default_prime_retry_delay")]
    prime_retry_delay: String,
}

impl Node {
    /// Get log config file path.
    pub fn log_config(&self) -> &str {
        &self.log_config
    }

    /// Private ip identifying this machine in the manifest.
    pub fn private_ip(&self) -> &str {
        &self.private_ip
    }

    pub fn backend_result(&self) -> Result<BackendType, Error> {
        self.backend_type.parse()
    }

    pub fn layout(&self) -> Layout {
        let appscale_home = PathBuf::from(&self.appscale_home);
        let templates_dir = self
            .templates_dir
            .as_ref()
            .map_or_else(|| appscale_home.join("templates"), PathBuf::from);
        Layout {
            appscale_home,
            templates_dir,
            data_dir: PathBuf::from(&self.data_dir),
            state_dir: PathBuf::from(&self.state_dir),
            clean_start: self.clean_start,
        }
    }

    /// Delay between two readiness probes.
    pub fn poll_interval(&self) -> Duration {
        parse_duration(&self.poll_interval)
    }

    /// `None` keeps polling until aborted.
    pub fn readiness_timeout(&self) -> Option<Duration> {
        self.readiness_timeout.as_deref().map(parse_duration)
    }

    /// Upper bound for a single TCP connect attempt.
    pub fn probe_timeout(&self) -> Duration {
        parse_duration(&self.probe_timeout)
    }

    pub fn prime_retries(&self) -> u32 {
        self.prime_retries
    }

    pub fn prime_retry_delay(&self) -> Duration {
        parse_duration(&self.prime_retry_delay)
    }

    /// Reads and validates node config, then checks it against the manifest.
    /// # Errors
    /// IO errors, failed validation and missing local node in manifest.
    pub fn try_get(filename: impl AsRef<Path>, manifest: &Manifest) -> Result<Self, Error> {
        let config: Self = YamlConfig::get(filename)?;
        config.check(manifest)?;
        Ok(config)
    }

    pub fn get_from_string(file: &str, manifest: &Manifest) -> Result<Self, Error> {
        let config: Self = YamlConfig::get_from_string(file)?;
        debug!("node config: {:?}", config);
        config.check(manifest)?;
        Ok(config)
    }

    pub fn check(&self, manifest: &Manifest) -> Result<(), Error> {
        manifest.find(&self.private_ip).map(|_| ()).ok_or_else(|| {
            debug!("cannot find node: {} in manifest", self.private_ip);
            Error::config(format!("cannot find node: {} in manifest", self.private_ip))
        })
    }

    fn default_appscale_home() -> String {
        DEFAULT_APPSCALE_HOME.to_string()
    }

    fn default_data_dir() -> String {
        DEFAULT_DATA_DIR.to_string()
    }

    fn default_state_dir() -> String {
        DEFAULT_STATE_DIR.to_string()
    }

    fn default_poll_interval() -> String {
        "5s".to_string()
    }

    fn default_probe_timeout() -> String {
        "1s".to_string()
    }

    fn default_clean_start() -> bool {
        true
    }

    fn default_prime_retries() -> u32 {
        10
    }

    fn default_prime_retry_delay() -> String {
        "5s".to_string()
    }

    fn check_unset(&self) -> Result<(), String> {
        if Validator::is_unset(&self.log_config)
            || Validator::is_unset(&self.private_ip)
            || Validator::is_unset(&self.backend_type)
            || Validator::is_unset(&self.appscale_home)
            || Validator::is_unset(&self.data_dir)
            || Validator::is_unset(&self.state_dir)
        {
            let msg = "some of the fields present, but empty".to_string();
            error!("{}", msg);
            Err(msg)
        } else {
            Ok(())
        }
    }

    fn check_duration(name: &str, value: &str) -> Result<Duration, String> {
        value
            .parse::<HumanDuration>()
            .map(Into::into)
            .map_err(|e| {
                let msg = format!("field '{}' for 'config' is not valid: {}", name, e);
                error!("{}", msg);
                msg
            })
    }
}

fn parse_duration(value: &str) -> Duration {
    value
        .parse::<HumanDuration>()
        .expect("parse humantime duration")
        .into()
}

impl Validatable for Node {
    fn validate(&self) -> Result<(), String> {
        self.check_unset()?;
        self.backend_result().map_err(|e| {
            error!("{}", e);
            e.to_string()
        })?;
        let poll = Self::check_duration("poll_interval", &self.poll_interval)?;
        if poll.is_zero() {
            let msg = "field 'poll_interval' for 'config' must be greater than 0".to_string();
            error!("{}", msg);
            return Err(msg);
        }
        Self::check_duration("probe_timeout", &self.probe_timeout)?;
        Self::check_duration("prime_retry_delay", &self.prime_retry_delay)?;
        if let Some(timeout) = &self.readiness_timeout {
            Self::check_duration("readiness_timeout", timeout)?;
        }
        if self.prime_retries == 0 {
            let msg = "field 'prime_retries' for 'config' must be greater than 0".to_string();
            error!("{}", msg);
            return Err(msg);
        }
        Ok(())
    }
}

pub mod tests {
    use super::Node as NodeConfig;

    pub fn node_config(private_ip: &str, backend_type: &str) -> NodeConfig {
        NodeConfig {
            log_config: "logger.yaml".to_string(),
            private_ip: private_ip.to_string(),
            backend_type: backend_type.to_string(),
            appscale_home: "/root/appscale".to_string(),
            templates_dir: None,
            data_dir: "/var/appscale".to_string(),
            state_dir: "/etc/appscale".to_string(),
            poll_interval: "10ms".to_string(),
            readiness_timeout: Some("500ms".to_string()),
            probe_timeout: "100ms".to_string(),
            clean_start: true,
            prime_retries: 3,
            prime_retry_delay: "10ms".to_string(),
        }
    }
}
