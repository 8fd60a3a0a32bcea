use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io::Error as IOError,
    path::Path,
    time::Duration,
};
use thiserror::Error as ErrorTrait;

#[derive(Debug, Clone, ErrorTrait)]
pub struct Error {
    ctx: Kind,
}

impl Error {
    fn new(ctx: Kind) -> Self {
        Self { ctx }
    }

    pub fn kind(&self) -> &Kind {
        &self.ctx
    }

    pub fn is_config(&self) -> bool {
        matches!(&self.ctx, Kind::Config(_))
    }

    pub fn is_template_io(&self) -> bool {
        matches!(&self.ctx, Kind::TemplateIo { .. })
    }

    pub fn is_readiness_timeout(&self) -> bool {
        matches!(&self.ctx, Kind::ReadinessTimeout { .. })
    }

    pub fn is_process(&self) -> bool {
        matches!(&self.ctx, Kind::Process { .. })
    }

    pub fn is_unsupported_backend(&self) -> bool {
        matches!(&self.ctx, Kind::UnsupportedBackend(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(&self.ctx, Kind::Aborted(_))
    }

    /// Only a readiness timeout may succeed on a later attempt without a config change.
    pub fn is_retryable(&self) -> bool {
        self.is_readiness_timeout()
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(Kind::Config(msg.into()))
    }

    pub fn template_io(path: impl AsRef<Path>, err: &IOError) -> Self {
        Self::new(Kind::TemplateIo {
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        })
    }

    pub fn readiness_timeout(target: impl Into<String>, waited: Duration) -> Self {
        Self::new(Kind::ReadinessTimeout {
            target: target.into(),
            waited,
        })
    }

    pub fn process(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(Kind::Process {
            command: command.into(),
            reason: reason.into(),
        })
    }

    pub fn unsupported_backend(name: impl Into<String>) -> Self {
        Self::new(Kind::UnsupportedBackend(name.into()))
    }

    pub fn aborted(target: impl Into<String>) -> Self {
        Self::new(Kind::Aborted(target.into()))
    }

    pub fn invalid_transition(from: impl Display, to: impl Display) -> Self {
        Self::new(Kind::InvalidTransition(format!("{} -> {}", from, to)))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        Display::fmt(&self.ctx, f)
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::TemplateIo { path, reason } => {
                write!(f, "template i/o error on {}: {}", path, reason)
            }
            Self::ReadinessTimeout { target, waited } => write!(
                f,
                "{} did not become ready within {}",
                target,
                humantime::format_duration(*waited)
            ),
            Self::Process { command, reason } => {
                write!(f, "command `{}` failed: {}", command, reason)
            }
            Self::UnsupportedBackend(name) => write!(f, "unsupported backend: {}", name),
            Self::Aborted(target) => write!(f, "aborted while waiting on {}", target),
            Self::InvalidTransition(transition) => {
                write!(f, "invalid node state transition: {}", transition)
            }
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Kind {
    Config(String),
    TemplateIo { path: String, reason: String },
    ReadinessTimeout { target: String, waited: Duration },
    Process { command: String, reason: String },
    UnsupportedBackend(String),
    Aborted(String),
    InvalidTransition(String),
}
