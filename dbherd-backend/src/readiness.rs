use crate::prelude::*;
use dbherd_common::{
    configs::node::Node as NodeConfig,
    interval_logger::IntervalLoggerSafe,
    metrics::{READINESS_POLLS, READINESS_TIMEOUTS},
};
use log::Level;
use std::future::pending;
use tokio::{
    net::TcpStream,
    sync::watch,
    time::{sleep, timeout, timeout_at, Instant},
};

const PROGRESS_LOG_INTERVAL: u64 = 30_000;

/// Answers whether something listens on `host:port` right now.
#[async_trait]
pub trait PortProbe: Send + Sync {
    async fn is_open(&self, host: &str, port: u16) -> bool;
}

/// TCP connect bounded by `timeout`.
#[derive(Debug, Clone, Copy)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PortProbe for TcpProbe {
    async fn is_open(&self, host: &str, port: u16) -> bool {
        matches!(
            timeout(self.timeout, TcpStream::connect((host, port))).await,
            Ok(Ok(_))
        )
    }
}

#[cfg(any(test, feature = "testing"))]
mockall::mock! {
    pub Probe {}
    #[async_trait]
    impl PortProbe for Probe {
        async fn is_open(&self, host: &str, port: u16) -> bool;
    }
}

/// Fires once, observed by every clone of the paired [`Abort`].
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    pub fn abort(&self) {
        if self.tx.send(true).is_err() {
            debug!("abort requested, nobody is waiting");
        }
    }
}

#[derive(Debug, Clone)]
pub struct Abort {
    rx: watch::Receiver<bool>,
}

impl Abort {
    pub fn new() -> (AbortHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (AbortHandle { tx }, Self { rx })
    }

    /// A signal that can not fire.
    pub fn never() -> Self {
        Self::new().1
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once aborted, stays pending forever if the handle is gone.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                pending::<()>().await;
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Target<'a> {
    Open(&'a str, u16),
    Healthy(&'a dyn ProcessController, &'a str),
}

impl Display for Target<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Open(host, port) => write!(f, "{}:{}", host, port),
            Self::Healthy(_, command) => write!(f, "`{}`", command),
        }
    }
}

/// Bounded polling for ports and health commands.
pub struct ReadinessWaiter {
    probe: Arc<dyn PortProbe>,
    poll_interval: Duration,
    timeout: Option<Duration>,
    abort: Abort,
    logger: IntervalLoggerSafe<String>,
}

impl ReadinessWaiter {
    /// `timeout` of `None` polls until aborted.
    pub fn new(
        probe: Arc<dyn PortProbe>,
        poll_interval: Duration,
        timeout: Option<Duration>,
        abort: Abort,
    ) -> Self {
        Self {
            probe,
            poll_interval,
            timeout,
            abort,
            logger: IntervalLoggerSafe::new(PROGRESS_LOG_INTERVAL, Level::Info),
        }
    }

    pub fn from_config(config: &NodeConfig, abort: Abort) -> Self {
        Self::new(
            Arc::new(TcpProbe::new(config.probe_timeout())),
            config.poll_interval(),
            config.readiness_timeout(),
            abort,
        )
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn abort(&self) -> &Abort {
        &self.abort
    }

    pub async fn wait_until_open(&self, host: &str, port: u16) -> Result<(), Error> {
        self.wait_until_open_within(host, port, self.poll_interval, self.timeout)
            .await
    }

    /// # Errors
    /// `ReadinessTimeout` once `timeout` elapsed without a listener,
    /// `Aborted` when the abort signal fires first.
    pub async fn wait_until_open_within(
        &self,
        host: &str,
        port: u16,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<(), Error> {
        self.poll(Target::Open(host, port), poll_interval, timeout)
            .await
    }

    /// Healthy once the trimmed stdout of `command` is a number above zero.
    pub async fn wait_until_healthy(
        &self,
        process: &dyn ProcessController,
        command: &str,
    ) -> Result<(), Error> {
        self.poll(
            Target::Healthy(process, command),
            self.poll_interval,
            self.timeout,
        )
        .await
    }

    async fn check(&self, target: Target<'_>) -> bool {
        match target {
            Target::Open(host, port) => self.probe.is_open(host, port).await,
            Target::Healthy(process, command) => match process.run(command).await {
                Ok(output) => output
                    .stdout
                    .trim()
                    .parse::<f64>()
                    .map_or(false, |n| n > 0.0),
                Err(e) => {
                    debug!("health command failed: {}", e);
                    false
                }
            },
        }
    }

    /// A check still running at the deadline counts as not ready.
    async fn check_until(&self, target: Target<'_>, deadline: Option<Instant>) -> bool {
        match deadline {
            Some(deadline) => timeout_at(deadline, self.check(target))
                .await
                .unwrap_or(false),
            None => self.check(target).await,
        }
    }

    async fn poll(
        &self,
        target: Target<'_>,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<(), Error> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let progress = format!("waiting for {}", target);
        loop {
            if self.abort.is_aborted() {
                return Err(Error::aborted(target.to_string()));
            }
            let ready = tokio::select! {
                ready = self.check_until(target, deadline) => ready,
                _ = self.abort.aborted() => {
                    return Err(Error::aborted(target.to_string()));
                }
            };
            if ready {
                self.logger.forget(&progress);
                debug!("{} is ready", target);
                return Ok(());
            }
            counter!(READINESS_POLLS, 1);
            self.logger.report(progress.clone());
            let mut nap = poll_interval;
            if let (Some(deadline), Some(timeout)) = (deadline, timeout) {
                let now = Instant::now();
                if now >= deadline {
                    counter!(READINESS_TIMEOUTS, 1);
                    warn!(
                        "{} not ready after {}",
                        target,
                        humantime::format_duration(timeout)
                    );
                    return Err(Error::readiness_timeout(target.to_string(), timeout));
                }
                nap = nap.min(deadline - now);
            }
            tokio::select! {
                _ = sleep(nap) => {}
                _ = self.abort.aborted() => {
                    return Err(Error::aborted(target.to_string()));
                }
            }
        }
    }
}

impl Debug for ReadinessWaiter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ReadinessWaiter")
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .field("abort", &self.abort)
            .finish()
    }
}
