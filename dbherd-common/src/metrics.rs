use metrics::{register_counter, register_gauge};

/// Observes the lifecycle state of the local datastore node
pub const NODE_STATE: &str = "node.state";
/// Counts readiness probes that found the target not ready
pub const READINESS_POLLS: &str = "readiness.polls";
/// Counts waits that gave up after their timeout
pub const READINESS_TIMEOUTS: &str = "readiness.timeouts";
/// Counts runs of the priming script
pub const PRIMING_ATTEMPTS: &str = "priming.attempts";

pub fn register_metrics() {
    register_gauge!(NODE_STATE);
    register_counter!(READINESS_POLLS);
    register_counter!(READINESS_TIMEOUTS);
    register_counter!(PRIMING_ATTEMPTS);
}
