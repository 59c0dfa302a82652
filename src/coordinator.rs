//! Coordinator: merges the detector streams into player commands.
//!
//! One task selects over the three detector streams, the initial play timer
//! and a stop signal. Commands from one detector keep their order; nothing is
//! imposed across detectors. Failures are forwarded on a separate error
//! stream, once per detector, while the other detectors keep running.

use crate::activity::SharedActivityLog;
use crate::config::CoordinatorConfig;
use crate::core::{LocationEvent, RotationEvent, ShakeEvent};
use crate::detector::{
    DetectorMessage, EventStream, LocationChangeDetector, RotationDetector, ShakeDetector,
};
use crate::error::DetectorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A command for the external player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "command")]
pub enum PlayerCommand {
    Play,
    Pause,
    SeekToStart,
    /// Relative seek; negative values rewind
    SeekBy { ms: i64 },
    IncreaseVolume,
    DecreaseVolume,
}

impl PlayerCommand {
    /// Execute this command on `player`.
    pub fn apply(self, player: &mut dyn Player) {
        match self {
            PlayerCommand::Play => player.play(),
            PlayerCommand::Pause => player.pause(),
            PlayerCommand::SeekToStart => player.seek_to_start(),
            PlayerCommand::SeekBy { ms } => player.seek_by(ms),
            PlayerCommand::IncreaseVolume => player.increase_volume_step(),
            PlayerCommand::DecreaseVolume => player.decrease_volume_step(),
        }
    }
}

impl std::fmt::Display for PlayerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerCommand::Play => write!(f, "play"),
            PlayerCommand::Pause => write!(f, "pause"),
            PlayerCommand::SeekToStart => write!(f, "seek to start"),
            PlayerCommand::SeekBy { ms } => write!(f, "seek by {ms} ms"),
            PlayerCommand::IncreaseVolume => write!(f, "volume up"),
            PlayerCommand::DecreaseVolume => write!(f, "volume down"),
        }
    }
}

/// The player the commands are meant for. Volume step size is up to the
/// player.
pub trait Player {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek_to_start(&mut self);
    fn seek_by(&mut self, ms: i64);
    fn increase_volume_step(&mut self);
    fn decrease_volume_step(&mut self);
}

/// An event from any of the detectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteEvent {
    Shake,
    Rotation(RotationEvent),
    LocationChange,
}

impl From<ShakeEvent> for RemoteEvent {
    fn from(_: ShakeEvent) -> Self {
        RemoteEvent::Shake
    }
}

impl From<RotationEvent> for RemoteEvent {
    fn from(event: RotationEvent) -> Self {
        RemoteEvent::Rotation(event)
    }
}

impl From<LocationEvent> for RemoteEvent {
    fn from(_: LocationEvent) -> Self {
        RemoteEvent::LocationChange
    }
}

impl RemoteEvent {
    /// The player commands this event translates to, in order.
    pub fn commands(&self) -> Vec<PlayerCommand> {
        match *self {
            RemoteEvent::Shake => vec![PlayerCommand::Pause],
            RemoteEvent::LocationChange => vec![PlayerCommand::SeekToStart],
            RemoteEvent::Rotation(RotationEvent::AxisX(mean)) => {
                let step = if mean > 0.0 {
                    PlayerCommand::IncreaseVolume
                } else {
                    PlayerCommand::DecreaseVolume
                };
                vec![step; volume_steps(mean)]
            }
            RemoteEvent::Rotation(RotationEvent::AxisZ(mean)) => vec![PlayerCommand::SeekBy {
                ms: (mean * 1000.0).round() as i64,
            }],
        }
    }
}

/// Upper bound on the volume steps a single X rotation can produce.
pub const MAX_VOLUME_STEPS: usize = 20;

/// Number of volume steps for an X rotation with the given mean: the rounded
/// magnitude above 1, otherwise a single step. Never more than
/// [`MAX_VOLUME_STEPS`]; a NaN mean counts as one step.
pub fn volume_steps(mean: f64) -> usize {
    let magnitude = mean.abs();
    if magnitude > 1.0 {
        magnitude.round().min(MAX_VOLUME_STEPS as f64) as usize
    } else {
        1
    }
}

/// Receiving ends handed to the presentation layer. Both close when the
/// coordinator stops.
#[derive(Debug)]
pub struct RemoteStreams {
    pub commands: mpsc::Receiver<PlayerCommand>,
    pub errors: mpsc::Receiver<DetectorError>,
}

/// Owns the three detectors and the merge task.
pub struct Coordinator {
    shake: ShakeDetector,
    rotation: RotationDetector,
    location: LocationChangeDetector,
    config: CoordinatorConfig,
    activity: Option<SharedActivityLog>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Coordinator {
    pub fn new(
        shake: ShakeDetector,
        rotation: RotationDetector,
        location: LocationChangeDetector,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            shake,
            rotation,
            location,
            config,
            activity: None,
            stop: None,
            task: None,
        }
    }

    /// Count events, commands and errors in `log`.
    pub fn with_activity_log(mut self, log: SharedActivityLog) -> Self {
        self.activity = Some(log);
        self
    }

    /// Start all detectors and the merge task. Must be called from within a
    /// Tokio runtime.
    ///
    /// A previous run is stopped first; its streams close.
    pub fn start(&mut self) -> RemoteStreams {
        self.stop();

        let capacity = self.config.event_buffer.max(1);
        let (command_tx, commands) = mpsc::channel(capacity);
        let (error_tx, errors) = mpsc::channel(capacity);
        let (stop, stop_signal) = oneshot::channel();

        let streams = DetectorStreams {
            shake: self.shake.observe_shaking(),
            rotation: self.rotation.observe_rotation(),
            location: self.location.observe_location_change(),
        };
        let router = Router {
            run_id: Uuid::new_v4(),
            commands: command_tx,
            errors: error_tx,
            activity: self.activity.clone(),
        };

        tracing::info!("Coordinator run {} started", router.run_id);
        self.task = Some(tokio::spawn(run(
            streams,
            router,
            self.config.initial_delay,
            stop_signal,
        )));
        self.stop = Some(stop);

        RemoteStreams { commands, errors }
    }

    /// Stop all detectors and close the command and error streams. Does
    /// nothing when not running.
    pub fn stop(&mut self) {
        let Some(stop) = self.stop.take() else {
            return;
        };

        self.shake.stop_observing();
        self.rotation.stop_observing();
        self.location.stop_observing();
        let _ = stop.send(());
        self.task = None;
        tracing::info!("Coordinator stopped");
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

struct DetectorStreams {
    shake: EventStream<ShakeEvent>,
    rotation: EventStream<RotationEvent>,
    location: EventStream<LocationEvent>,
}

/// Forwards routed messages to the presentation layer.
struct Router {
    run_id: Uuid,
    commands: mpsc::Sender<PlayerCommand>,
    errors: mpsc::Sender<DetectorError>,
    activity: Option<SharedActivityLog>,
}

impl Router {
    /// Returns false once the command receiver has gone away.
    async fn send_commands(&self, commands: &[PlayerCommand]) -> bool {
        if let Some(ref log) = self.activity {
            log.record_commands(commands.len() as u64);
        }
        for command in commands {
            tracing::debug!("Run {}: {}", self.run_id, command);
            if self.commands.send(*command).await.is_err() {
                return false;
            }
        }
        true
    }

    async fn route<E: Into<RemoteEvent>>(&self, message: Option<DetectorMessage<E>>) -> bool {
        match message {
            Some(DetectorMessage::Event(event)) => {
                let event = event.into();
                self.record(&event);
                self.send_commands(&event.commands()).await
            }
            Some(DetectorMessage::Failed(error)) => {
                tracing::warn!("Run {}: detector failed: {}", self.run_id, error);
                if let Some(ref log) = self.activity {
                    log.record_error(error);
                }
                // A dropped error receiver does not stop the commands
                let _ = self.errors.send(error).await;
                true
            }
            Some(DetectorMessage::Stopped) | None => true,
        }
    }

    fn record(&self, event: &RemoteEvent) {
        if let Some(ref log) = self.activity {
            match event {
                RemoteEvent::Shake => log.record_shake(),
                RemoteEvent::Rotation(_) => log.record_rotation(),
                RemoteEvent::LocationChange => log.record_location_change(),
            }
        }
    }
}

async fn run(
    mut streams: DetectorStreams,
    router: Router,
    initial_delay: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let play_timer = tokio::time::sleep(initial_delay);
    tokio::pin!(play_timer);
    let mut played = false;

    loop {
        let open = tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = &mut play_timer, if !played => {
                played = true;
                router.send_commands(&[PlayerCommand::Play]).await
            }
            message = streams.shake.next(), if !streams.shake.is_finished() => {
                router.route(message).await
            }
            message = streams.rotation.next(), if !streams.rotation.is_finished() => {
                router.route(message).await
            }
            message = streams.location.next(), if !streams.location.is_finished() => {
                router.route(message).await
            }
        };

        if !open {
            tracing::debug!("Run {}: command receiver dropped", router.run_id);
            break;
        }
    }

    tracing::info!("Coordinator run {} finished", router.run_id);
}
