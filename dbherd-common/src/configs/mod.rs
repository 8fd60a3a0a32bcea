/// Node-role manifest supplied by the cluster controller.
pub mod manifest;
/// Local node configuration.
pub mod node;
pub mod reader;
pub mod validation;
