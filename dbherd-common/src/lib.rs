pub mod configs;
pub mod error;
pub mod interval_logger;
pub mod metrics;
pub mod roles;
pub mod topology;

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;
