pub mod adapters;
pub mod core;
pub mod process;
pub mod readiness;
pub mod template;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

#[macro_use]
extern crate log;
#[macro_use]
extern crate async_trait;
#[macro_use]
extern crate metrics;

pub use crate::core::{select, Context, DatastoreAdapter};

pub(crate) mod prelude {
    pub use crate::{
        core::{Context, DatastoreAdapter},
        process::ProcessController,
        readiness::ReadinessWaiter,
        template::{Substitutions, TemplateRenderer},
    };
    pub use dbherd_common::{
        configs::node::{BackendType, Layout},
        error::Error,
        roles::RoleSet,
        topology::{LocalNode, Replication, Topology},
    };
    pub use std::{
        fmt::{Debug, Display, Formatter, Result as FmtResult},
        path::{Path, PathBuf},
        sync::Arc,
        time::Duration,
    };
}
