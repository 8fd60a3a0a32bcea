#![warn(missing_debug_implementations)]

//! Library requires tokio runtime.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate async_trait;
#[macro_use]
extern crate metrics;

pub mod orchestrator;
pub mod primer;
pub mod registry;

pub use crate::{
    orchestrator::{NodeState, Orchestrator},
    primer::{Primer, ScriptPrimer},
    registry::{AccessPoint, Registry},
};
pub use dbherd_backend::{
    core::{select, select_by_name, Context, DatastoreAdapter},
    process::{ProcessController, ShellController},
    readiness::{Abort, AbortHandle, ReadinessWaiter},
};
pub use dbherd_common::{
    configs::{manifest::Manifest, node::Node as NodeConfig},
    error::Error,
    metrics::register_metrics,
    topology::{LocalNode, Replication, Topology},
};

mod prelude {
    pub use dbherd_backend::core::{Context, DatastoreAdapter};
    pub use dbherd_common::{
        configs::node::{BackendType, Layout, Node as NodeConfig},
        error::Error,
        metrics::{NODE_STATE, PRIMING_ATTEMPTS},
        roles::RoleSet,
        topology::Topology,
    };
    pub use std::{
        fmt::{Debug, Display, Formatter, Result as FmtResult},
        path::{Path, PathBuf},
        sync::Arc,
        time::Duration,
    };
}
