//! Integration tests for the coordinator over scripted sources

use sensor_remote::activity::create_shared_log;
use sensor_remote::config::Config;
use sensor_remote::detector::{LocationChangeDetector, RotationDetector, ShakeDetector};
use sensor_remote::source::scripted::{
    Prompt, ScriptedLocationSource, ScriptedPermissions, ScriptedSensorSource, ScriptedSettings,
};
use sensor_remote::source::{LocationFix, PermissionGrants, SensorKind, SensorSample};
use sensor_remote::coordinator::MAX_VOLUME_STEPS;
use sensor_remote::{Coordinator, DetectorError, PlayerCommand, RemoteStreams};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const MS: u64 = 1_000_000;
const METERS_PER_DEGREE: f64 = 111_195.08;

struct Rig {
    sensors: ScriptedSensorSource,
    location: ScriptedLocationSource,
    permissions: ScriptedPermissions,
    settings: ScriptedSettings,
    coordinator: Coordinator,
}

fn rig_with(sensors: ScriptedSensorSource, permissions: ScriptedPermissions) -> Rig {
    let config = Config::default();
    let location = ScriptedLocationSource::new();
    let settings = ScriptedSettings::satisfied();
    let shared_sensors = Arc::new(sensors.clone());

    let coordinator = Coordinator::new(
        ShakeDetector::new(shared_sensors.clone(), config.shake.clone()),
        RotationDetector::new(shared_sensors, config.rotation.clone()),
        LocationChangeDetector::new(
            Arc::new(permissions.clone()),
            Arc::new(settings.clone()),
            Arc::new(location.clone()),
            config.location.clone(),
        ),
        config.coordinator.clone(),
    );

    Rig {
        sensors,
        location,
        permissions,
        settings,
        coordinator,
    }
}

fn rig() -> Rig {
    rig_with(ScriptedSensorSource::new(), ScriptedPermissions::granting())
}

fn shake(sensors: &ScriptedSensorSource) {
    for i in 0..30 {
        assert!(sensors.emit(
            SensorKind::Accelerometer,
            SensorSample::new(i * 10 * MS, 10.0, 10.0, 5.0)
        ));
    }
}

fn rotate(sensors: &ScriptedSensorSource, axes: [f64; 3]) {
    for i in 0..10 {
        assert!(sensors.emit(
            SensorKind::Gyroscope,
            SensorSample::new(i * 5 * MS, axes[0], axes[1], axes[2])
        ));
    }
}

fn fix(north_m: f64, seconds: i64) -> LocationFix {
    LocationFix {
        latitude: north_m / METERS_PER_DEGREE,
        longitude: 0.0,
        accuracy: 5.0,
        bearing: 10.0,
        speed: 1.0,
        timestamp_ms: seconds * 1000,
    }
}

/// Next command other than the initial play.
async fn next_gesture_command(commands: &mut mpsc::Receiver<PlayerCommand>) -> PlayerCommand {
    loop {
        match commands.recv().await {
            Some(PlayerCommand::Play) => continue,
            Some(command) => return command,
            None => panic!("command stream closed"),
        }
    }
}

/// Assert nothing but the initial play arrives within `wait`.
async fn assert_no_gesture_commands(commands: &mut mpsc::Receiver<PlayerCommand>, wait: Duration) {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match tokio::time::timeout_at(deadline, commands.recv()).await {
            Err(_) => return,
            Ok(Some(PlayerCommand::Play)) => continue,
            Ok(other) => panic!("unexpected command {other:?}"),
        }
    }
}

async fn wait_for_location_updates(location: &ScriptedLocationSource) {
    while !location.is_registered() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_play_after_initial_delay_exactly_once() {
    let mut rig = rig();
    let started = tokio::time::Instant::now();
    let mut streams = rig.coordinator.start();

    assert_eq!(streams.commands.recv().await, Some(PlayerCommand::Play));
    assert!(started.elapsed() >= Duration::from_millis(4000));

    let again = tokio::time::timeout(Duration::from_secs(60), streams.commands.recv()).await;
    assert!(again.is_err(), "play must only be sent once");
}

#[tokio::test(start_paused = true)]
async fn test_shake_pauses() {
    let mut rig = rig();
    let activity = create_shared_log();
    rig.coordinator = rig.coordinator.with_activity_log(activity.clone());

    let mut streams = rig.coordinator.start();
    shake(&rig.sensors);

    let mut received = vec![
        streams.commands.recv().await.expect("command"),
        streams.commands.recv().await.expect("command"),
    ];
    received.sort_by_key(|c| format!("{c:?}"));
    assert_eq!(received, vec![PlayerCommand::Pause, PlayerCommand::Play]);
    assert_eq!(activity.stats().shake_events, 1);
    assert_eq!(activity.stats().commands_emitted, 2);
}

#[tokio::test(start_paused = true)]
async fn test_gentle_x_rotation_steps_volume_once() {
    let mut rig = rig();
    let mut streams = rig.coordinator.start();

    rotate(&rig.sensors, [0.9, 0.1, 0.05]);
    assert_eq!(
        next_gesture_command(&mut streams.commands).await,
        PlayerCommand::IncreaseVolume
    );
    assert_no_gesture_commands(&mut streams.commands, Duration::from_secs(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_strong_x_rotation_steps_rounded_magnitude() {
    let mut rig = rig();
    let mut streams = rig.coordinator.start();

    rotate(&rig.sensors, [3.6, 0.0, 0.0]);
    for _ in 0..4 {
        assert_eq!(
            next_gesture_command(&mut streams.commands).await,
            PlayerCommand::IncreaseVolume
        );
    }

    rotate(&rig.sensors, [-3.2, 0.0, 0.0]);
    for _ in 0..3 {
        assert_eq!(
            next_gesture_command(&mut streams.commands).await,
            PlayerCommand::DecreaseVolume
        );
    }
    assert_no_gesture_commands(&mut streams.commands, Duration::from_secs(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_huge_x_rotation_is_capped_and_remote_keeps_running() {
    let mut rig = rig();
    let mut streams = rig.coordinator.start();

    rotate(&rig.sensors, [1e30, 0.0, 0.0]);
    for _ in 0..MAX_VOLUME_STEPS {
        assert_eq!(
            next_gesture_command(&mut streams.commands).await,
            PlayerCommand::IncreaseVolume
        );
    }
    assert_no_gesture_commands(&mut streams.commands, Duration::from_secs(10)).await;

    shake(&rig.sensors);
    assert_eq!(
        next_gesture_command(&mut streams.commands).await,
        PlayerCommand::Pause
    );
}

#[tokio::test(start_paused = true)]
async fn test_z_rotation_seeks() {
    let mut rig = rig();
    let mut streams = rig.coordinator.start();

    rotate(&rig.sensors, [0.0, 0.25, -1.5]);
    assert_eq!(
        next_gesture_command(&mut streams.commands).await,
        PlayerCommand::SeekBy { ms: -1500 }
    );
}

#[tokio::test(start_paused = true)]
async fn test_weak_z_rotation_is_ignored() {
    let mut rig = rig();
    let mut streams = rig.coordinator.start();

    rotate(&rig.sensors, [0.0, 0.0, 0.3]);
    assert_no_gesture_commands(&mut streams.commands, Duration::from_secs(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_walking_away_replays() {
    let mut rig = rig();
    let mut streams = rig.coordinator.start();
    wait_for_location_updates(&rig.location).await;

    assert!(rig.location.emit(fix(0.0, 0)));
    assert!(rig.location.emit(fix(15.0, 10)));
    assert!(rig.location.emit(fix(30.0, 20)));
    assert_eq!(
        next_gesture_command(&mut streams.commands).await,
        PlayerCommand::SeekToStart
    );

    // 15 m in one second is a GPS jump
    assert!(rig.location.emit(fix(45.0, 21)));
    assert_no_gesture_commands(&mut streams.commands, Duration::from_secs(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_fine_location_denial_reported_once() {
    let permissions = ScriptedPermissions::new(Prompt::Answer(PermissionGrants {
        coarse: true,
        fine: false,
    }));
    let mut rig = rig_with(ScriptedSensorSource::new(), permissions);
    let mut streams = rig.coordinator.start();

    assert_eq!(
        streams.errors.recv().await,
        Some(DetectorError::FineLocationDenied)
    );
    let second = tokio::time::timeout(Duration::from_secs(10), streams.errors.recv()).await;
    assert!(second.is_err(), "error must be reported once");

    assert_eq!(rig.permissions.request_count(), 1);
    assert_eq!(rig.settings.check_count(), 0);
    assert_eq!(rig.location.request_count(), 0);

    // Motion gestures are unaffected
    shake(&rig.sensors);
    assert_eq!(
        next_gesture_command(&mut streams.commands).await,
        PlayerCommand::Pause
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_accelerometer_leaves_rotation_working() {
    let sensors = ScriptedSensorSource::new().without(SensorKind::Accelerometer);
    let mut rig = rig_with(sensors, ScriptedPermissions::granting());
    let mut streams = rig.coordinator.start();

    assert_eq!(
        streams.errors.recv().await,
        Some(DetectorError::AccelerometerUnavailable)
    );

    rotate(&rig.sensors, [0.0, 0.0, 0.75]);
    assert_eq!(
        next_gesture_command(&mut streams.commands).await,
        PlayerCommand::SeekBy { ms: 750 }
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_gyroscope_leaves_shake_working() {
    let sensors = ScriptedSensorSource::new().without(SensorKind::Gyroscope);
    let mut rig = rig_with(sensors, ScriptedPermissions::granting());
    let mut streams = rig.coordinator.start();

    assert_eq!(
        streams.errors.recv().await,
        Some(DetectorError::GyroscopeUnavailable)
    );

    shake(&rig.sensors);
    assert_eq!(
        next_gesture_command(&mut streams.commands).await,
        PlayerCommand::Pause
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_closes_streams_without_errors() {
    let mut rig = rig();
    let RemoteStreams {
        mut commands,
        mut errors,
    } = rig.coordinator.start();
    wait_for_location_updates(&rig.location).await;

    rig.coordinator.stop();
    assert!(!rig.sensors.is_registered(SensorKind::Accelerometer));
    assert!(!rig.sensors.is_registered(SensorKind::Gyroscope));
    assert!(!rig.location.is_registered());

    rig.coordinator.stop();

    assert_eq!(errors.recv().await, None);
    while let Some(command) = commands.recv().await {
        assert_eq!(command, PlayerCommand::Play);
    }
    assert!(!rig.coordinator.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_restart_starts_fresh() {
    let mut rig = rig();
    let first = rig.coordinator.start();

    // Half a rotation window before the restart
    for i in 0..5 {
        assert!(rig
            .sensors
            .emit(SensorKind::Gyroscope, SensorSample::new(i, 4.0, 0.0, 0.0)));
    }

    let mut second = rig.coordinator.start();
    drop(first);
    assert_eq!(rig.sensors.registration_count(), 4);

    assert_eq!(second.commands.recv().await, Some(PlayerCommand::Play));

    rotate(&rig.sensors, [0.0, 0.0, 0.5]);
    assert_eq!(
        next_gesture_command(&mut second.commands).await,
        PlayerCommand::SeekBy { ms: 500 }
    );
}
