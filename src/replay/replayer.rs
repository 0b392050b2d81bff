use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::time::Instant;

use crate::core::error::NodeError;
use crate::core::node::{Node, NodeCore};
use crate::core::subscription::DEFAULT_SERVICE;
use crate::replay::{ReplayRegistry, Replayed};

/// Where to read a recording from and how to pace it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplayConfig {
    pub path: PathBuf,
    /// Service the replayed messages are broadcast on.
    pub service: String,
    /// Wait between messages according to their recorded stamps.
    pub realtime: bool,
    /// Playback speed factor for realtime pacing. 2.0 plays twice as fast.
    pub speed: f64,
}

impl ReplayConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            service: DEFAULT_SERVICE.to_string(),
            realtime: false,
            speed: 1.0,
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Recorded gap `dt` scaled to wall time. `None` when pacing is off or unusable.
    fn scaled(&self, dt: f64) -> Option<Duration> {
        if !self.realtime || !(self.speed.is_finite() && self.speed > 0.0) {
            return None;
        }
        Duration::try_from_secs_f64(dt / self.speed).ok()
    }
}

/// A node that broadcasts the messages of a recording, then finishes.
///
/// The file is opened in `setup`. The loop ends at end of file, which ends a
/// first-to-finish run. Lines of unregistered types are skipped; lines that
/// match a type but fail to parse are logged and skipped.
pub struct LogReplayer {
    core: NodeCore,
    config: ReplayConfig,
    registry: ReplayRegistry,
    lines: Option<Lines<BufReader<File>>>,
    replayed: usize,
    skipped: usize,
}

impl LogReplayer {
    pub fn new(name: impl Into<String>, config: ReplayConfig, registry: ReplayRegistry) -> Self {
        let mut core = NodeCore::new(name);
        core.declare_service(config.service.clone(), None);
        Self {
            core,
            config,
            registry,
            lines: None,
            replayed: 0,
            skipped: 0,
        }
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Messages broadcast so far.
    pub fn replayed(&self) -> usize {
        self.replayed
    }

    /// Lines that did not become a message.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[async_trait]
impl Node for LogReplayer {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    async fn setup(&mut self) -> Result<(), NodeError> {
        let file = File::open(&self.config.path).await?;
        self.lines = Some(BufReader::new(file).lines());
        log::info!(
            "{} replaying {} ({} known type(s))",
            self.core.name(),
            self.config.path.display(),
            self.registry.len()
        );
        Ok(())
    }

    async fn run(&mut self) -> Result<(), NodeError> {
        let Some(lines) = self.lines.as_mut() else {
            return Err(NodeError::msg("recording was not opened"));
        };
        let exit = self.core.exit_flag().clone();
        // (first recorded stamp, wall time it was replayed)
        let mut origin: Option<(f64, Instant)> = None;

        while let Some(line) = lines.next_line().await? {
            if exit.is_set() {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            let message = match self.registry.parse_line(&line) {
                Ok(Replayed::Message(message)) => message,
                Ok(Replayed::Opaque(_)) => {
                    log::debug!("{} skipping unrecognised line: {}", self.core.name(), line);
                    self.skipped += 1;
                    continue;
                }
                Err(err) => {
                    log::warn!("{} skipping unreadable line: {}", self.core.name(), err);
                    self.skipped += 1;
                    continue;
                }
            };

            let stamp = message.header().stamp;
            match origin {
                None => origin = Some((stamp, Instant::now())),
                Some((first, started)) => {
                    if let Some(offset) = self.config.scaled(stamp - first) {
                        tokio::time::sleep_until(started + offset).await;
                    }
                }
            }

            self.core.broadcast(&*message, &self.config.service).await?;
            self.replayed += 1;
        }

        log::info!(
            "{} finished: {} replayed, {} skipped",
            self.core.name(),
            self.replayed,
            self.skipped
        );
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), NodeError> {
        self.lines = None;
        Ok(())
    }
}
