use crate::prelude::*;
use tokio::time::sleep;

/// One-time data initialisation after the first start of a backend.
#[async_trait]
pub trait Primer: Debug + Send + Sync {
    async fn prime(&self, ctx: &Context<'_>, backend: BackendType) -> Result<(), Error>;
}

/// Runs `appscale-prime-<backend> --replication N` until it succeeds.
/// Cassandra gets a `nodetool repair` before the last attempt, a column id
/// mismatch from tables created while the ring settles needs one.
#[derive(Debug, Clone)]
pub struct ScriptPrimer {
    retries: u32,
    delay: Duration,
}

impl ScriptPrimer {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(config.prime_retries(), config.prime_retry_delay())
    }

    pub fn command(backend: BackendType, replication: u32) -> String {
        format!("appscale-prime-{} --replication {}", backend, replication)
    }

    fn repair_command(ctx: &Context<'_>) -> String {
        format!(
            "{}/bin/nodetool repair",
            ctx.layout().backend_home(BackendType::Cassandra).display()
        )
    }

    async fn repair(&self, ctx: &Context<'_>) {
        let command = Self::repair_command(ctx);
        warn!("running a cassandra repair before the last priming attempt");
        match ctx.process().run(&command).await {
            Ok(output) if output.success() => debug!("repair finished"),
            Ok(output) => warn!("`{}` exited with {:?}", command, output.status),
            Err(e) => warn!("{}", e),
        }
    }
}

#[async_trait]
impl Primer for ScriptPrimer {
    async fn prime(&self, ctx: &Context<'_>, backend: BackendType) -> Result<(), Error> {
        let command = Self::command(backend, ctx.replication().factor());
        let mut last_failure = String::new();
        for attempt in 1..=self.retries {
            counter!(PRIMING_ATTEMPTS, 1);
            match ctx.process().run(&command).await {
                Ok(output) if output.success() => {
                    info!("{} primed on attempt {}", backend, attempt);
                    return Ok(());
                }
                Ok(output) => {
                    last_failure = format!(
                        "exit status {:?}: {}",
                        output.status,
                        output.stderr.trim()
                    );
                }
                Err(e) => last_failure = e.to_string(),
            }
            warn!(
                "priming {} failed, attempt {}/{}: {}",
                backend, attempt, self.retries, last_failure
            );
            if attempt == self.retries {
                break;
            }
            if backend == BackendType::Cassandra && attempt + 1 == self.retries {
                self.repair(ctx).await;
            }
            debug!("retrying in {}", humantime::format_duration(self.delay));
            tokio::select! {
                _ = sleep(self.delay) => {}
                _ = ctx.waiter().abort().aborted() => {
                    return Err(Error::aborted(command));
                }
            }
        }
        Err(Error::process(
            command,
            format!("gave up after {} attempts, {}", self.retries, last_failure),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbherd_backend::{
        process::{CommandOutput, MockController},
        readiness::{Abort, MockProbe, ReadinessWaiter},
        test_utils::Fixture,
    };
    use dbherd_common::configs::manifest::tests::manifest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn failed() -> CommandOutput {
        CommandOutput {
            status: Some(1),
            stdout: String::new(),
            stderr: "keyspace not ready".to_string(),
        }
    }

    fn failing(times: usize, calls: Arc<AtomicUsize>) -> MockController {
        let mut process = MockController::new();
        process
            .expect_run()
            .withf(|cmd| cmd.ends_with("nodetool repair"))
            .returning(|_| Ok(CommandOutput::ok("")));
        process.expect_run().returning(move |cmd| {
            assert_eq!(cmd, "appscale-prime-cassandra --replication 2");
            if calls.fetch_add(1, Ordering::SeqCst) < times {
                Ok(CommandOutput {
                    status: Some(1),
                    stdout: String::new(),
                    stderr: "keyspace not ready".to_string(),
                })
            } else {
                Ok(CommandOutput::ok(""))
            }
        });
        process
    }

    #[tokio::test]
    async fn retries_until_the_script_succeeds() {
        let root = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut fx = Fixture::new(&manifest(1, 2), "10.0.0.1", root.path());
        fx.process = failing(2, calls.clone());
        ScriptPrimer::new(5, Duration::from_millis(1))
            .prime(&fx.context(), BackendType::Cassandra)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_configured_retries() {
        let root = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut fx = Fixture::new(&manifest(1, 2), "10.0.0.1", root.path());
        fx.process = failing(usize::MAX, calls.clone());
        let err = ScriptPrimer::new(3, Duration::from_millis(1))
            .prime(&fx.context(), BackendType::Cassandra)
            .await
            .unwrap_err();
        assert!(err.is_process());
        assert!(err.to_string().contains("keyspace not ready"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cassandra_is_repaired_before_the_last_attempt() {
        let root = tempdir().unwrap();
        let mut fx = Fixture::new(&manifest(1, 2), "10.0.0.1", root.path());
        fx.clear();
        let log = fx.log.clone();
        let mut process = MockController::new();
        process.expect_run().returning(move |cmd| {
            log.lock().unwrap().push(cmd.to_string());
            Ok(failed())
        });
        fx.process = process;
        ScriptPrimer::new(3, Duration::from_millis(1))
            .prime(&fx.context(), BackendType::Cassandra)
            .await
            .unwrap_err();
        let runs = fx.commands();
        assert_eq!(runs.len(), 4, "{:?}", runs);
        assert!(runs[2].ends_with("appscale/AppDB/cassandra/bin/nodetool repair"));
        assert!(runs[3].starts_with("appscale-prime-cassandra"));
    }

    #[tokio::test]
    async fn other_backends_are_never_repaired() {
        let root = tempdir().unwrap();
        let mut fx = Fixture::new(&manifest(1, 1), "10.0.0.1", root.path());
        let mut process = MockController::new();
        process
            .expect_run()
            .withf(|cmd| cmd.starts_with("appscale-prime-hbase"))
            .times(2)
            .returning(|_| Ok(failed()));
        fx.process = process;
        let err = ScriptPrimer::new(2, Duration::from_millis(1))
            .prime(&fx.context(), BackendType::HBase)
            .await
            .unwrap_err();
        assert!(err.is_process());
    }

    #[tokio::test]
    async fn abort_cuts_the_retry_sleep() {
        let root = tempdir().unwrap();
        let (handle, abort) = Abort::new();
        let mut fx = Fixture::new(&manifest(1, 2), "10.0.0.1", root.path());
        let mut process = MockController::new();
        process
            .expect_run()
            .withf(|cmd| cmd.starts_with("appscale-prime-"))
            .times(1)
            .returning(|_| Ok(failed()));
        fx.process = process;
        fx.waiter = ReadinessWaiter::new(
            Arc::new(MockProbe::new()),
            Duration::from_millis(10),
            None,
            abort,
        );
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            handle.abort();
        });
        let started = std::time::Instant::now();
        let err = ScriptPrimer::new(5, Duration::from_secs(30))
            .prime(&fx.context(), BackendType::Cassandra)
            .await
            .unwrap_err();
        assert!(err.is_aborted());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
