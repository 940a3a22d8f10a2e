// Error taxonomy of the session core.
//
// Every fallible public operation returns `VizError`, whose variant tells the
// caller what kind of failure happened and what can still be done with the
// session:
//
// - `Config`, `SessionState`, `ActionShape`, `ReplayMismatch`: the caller
//   asked for something invalid; the session is unchanged and usable.
// - `NetworkSync`: a peer or the tick authority failed to keep up; the
//   current episode cannot continue, but `close()` works.
// - `EngineFatal`: the simulation itself failed; the session is faulted and
//   only `close()` is accepted afterwards.
//
// Engine errors are split on the way in: missing or malformed resources
// (scenario file, map) are configuration problems, anything else is fatal.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use vizlink_engine::{Button, EngineError, GameVariable};
use vizlink_relay::NetError;

#[derive(Debug, Error)]
pub enum VizError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid session state: {0}")]
    SessionState(#[from] SessionStateError),
    #[error("malformed action: {0}")]
    ActionShape(#[from] ActionShapeError),
    #[error("demo does not match this session: {0}")]
    ReplayMismatch(#[from] ReplayMismatchError),
    #[error("multiplayer synchronization failed: {0}")]
    NetworkSync(#[from] NetworkSyncError),
    #[error("engine failure: {0}")]
    EngineFatal(EngineError),
}

impl From<EngineError> for VizError {
    fn from(e: EngineError) -> Self {
        if e.is_resource_error() {
            VizError::Config(ConfigError::Resource(e))
        } else {
            VizError::EngineFatal(e)
        }
    }
}

impl From<NetError> for VizError {
    fn from(e: NetError) -> Self {
        VizError::NetworkSync(NetworkSyncError::from(e))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("button {0:?} registered twice")]
    DuplicateButton(Button),
    #[error("game variable {0:?} registered twice")]
    DuplicateGameVariable(GameVariable),
    #[error("{0}")]
    Invalid(String),
    #[error("bad game argument: {0}")]
    GameArg(String),
    #[error(transparent)]
    Resource(EngineError),
    #[error("demo {path}: {source}")]
    DemoIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("demo {path} is corrupt: {reason}")]
    DemoCorrupt { path: PathBuf, reason: String },
    #[error("demo {0} is truncated (no end record)")]
    DemoTruncated(PathBuf),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionStateError {
    #[error("session is not initialized")]
    NotInitialized,
    #[error("session is already running")]
    AlreadyRunning,
    #[error("session is closed")]
    Closed,
    #[error("session faulted after an engine failure; only close() is allowed")]
    Faulted,
    #[error("{0} is not available in a multiplayer session")]
    Multiplayer(&'static str),
    #[error("a peer link must be installed before init")]
    LinkAfterInit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionShapeError {
    #[error("action has {actual} values, {expected} buttons are registered")]
    Length { expected: usize, actual: usize },
    #[error("tick count must be at least 1")]
    ZeroSkip,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayMismatchError {
    #[error("demo format version {found} is not supported")]
    Version { found: u32 },
    #[error("recorded buttons {recorded:?} differ from configured {current:?}")]
    Buttons {
        recorded: Vec<Button>,
        current: Vec<Button>,
    },
    #[error("recorded game variables {recorded:?} differ from configured {current:?}")]
    GameVariables {
        recorded: Vec<GameVariable>,
        current: Vec<GameVariable>,
    },
    #[error("recorded on map {recorded}, session uses {current}")]
    Map { recorded: String, current: String },
    #[error("recorded with scenario digest {recorded:08x}, session has {current:08x}")]
    Scenario { recorded: u32, current: u32 },
    #[error("player {0} is not part of the recording")]
    Player(u8),
}

#[derive(Debug, Error)]
pub enum NetworkSyncError {
    #[error("cannot reach host at {addr}: {reason}")]
    Connect { addr: String, reason: String },
    #[error("host refused to seat us: {0}")]
    Rejected(String),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("no tick {tick} within {waited:?}")]
    TickTimeout { tick: u64, waited: Duration },
    #[error("lobby has {joined} of {expected} players after {waited:?}")]
    LobbyTimeout {
        joined: usize,
        expected: u8,
        waited: Duration,
    },
    #[error("no episode restart from the host within {0:?}")]
    EpisodeTimeout(Duration),
    #[error("lost connection to the host")]
    HostLost,
    #[error("cannot host: {0}")]
    Host(String),
    #[error("send failed: {0}")]
    Send(String),
}

impl From<NetError> for NetworkSyncError {
    fn from(e: NetError) -> Self {
        match e {
            NetError::Connect { addr, source } => NetworkSyncError::Connect {
                addr,
                reason: source.to_string(),
            },
            NetError::Rejected(reason) => NetworkSyncError::Rejected(reason),
            NetError::Handshake(reason) => NetworkSyncError::Handshake(reason),
            // Callers that know which tick they were waiting for map this
            // themselves; this is the fallback.
            NetError::Timeout(waited) => NetworkSyncError::TickTimeout { tick: 0, waited },
            NetError::HostLost => NetworkSyncError::HostLost,
            NetError::Send(reason) => NetworkSyncError::Send(reason),
        }
    }
}
