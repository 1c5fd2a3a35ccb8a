use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("cannot read music directory {}: {source}", root.display())]
pub struct ScanError {
    pub root: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("unable to start {}: {source}", executable.display())]
    Launch {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("playback engine exited during startup ({status})")]
    ExitedEarly { status: ExitStatus },

    #[error("playback engine did not create {} within {timeout:?}", socket.display())]
    EndpointTimeout { socket: PathBuf, timeout: Duration },

    #[error("failed to connect to {} within {timeout:?}: {source}", socket.display())]
    ConnectTimeout {
        socket: PathBuf,
        timeout: Duration,
        #[source]
        source: io::Error,
    },

    #[error("connection to the playback engine was lost: {source}")]
    ChannelDegraded {
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] anyhow::Error),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("error initializing playback engine: {0}")]
    BackendUnavailable(#[from] BackendError),

    #[error("failed to initialize the terminal: {0}")]
    DisplayInit(#[source] io::Error),

    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] io::Error),

    #[error("event loop stopped: {0}")]
    EventLoop(#[source] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
