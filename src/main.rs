//! Sensor Remote CLI
//!
//! Replays recorded sensor sessions through the detectors and prints the
//! resulting player commands.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sensor_remote::{
    activity::create_shared_log_with_persistence,
    config::Config,
    detector::{LocationChangeDetector, RotationDetector, ShakeDetector},
    error::DetectorError,
    source::script::{load_script, replay},
    source::scripted::{
        Prompt, Resolution, ScriptedLocationSource, ScriptedPermissions, ScriptedSensorSource,
        ScriptedSettings,
    },
    source::{PermissionGrants, SensorKind, SettingsCheck},
    Coordinator, RemoteStreams, GESTURE_GUIDE, VERSION,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sensor-remote")]
#[command(version = VERSION)]
#[command(about = "Motion and location gestures for a media player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded session script through the detectors
    Replay {
        /// JSON Lines script to replay
        script: PathBuf,

        /// How the permission dialog answers
        #[arg(long, value_enum, default_value = "granted")]
        permission: PermissionMode,

        /// How the location settings check answers
        #[arg(long, value_enum, default_value = "satisfied")]
        settings: SettingsMode,

        /// Simulate a device without an accelerometer
        #[arg(long)]
        no_accelerometer: bool,

        /// Simulate a device without a gyroscope
        #[arg(long)]
        no_gyroscope: bool,

        /// Keep listening this long after the script ends (milliseconds)
        #[arg(long, default_value = "5000")]
        linger_ms: u64,
    },

    /// Show the gesture guide
    Gestures,

    /// List the errors the remote can report
    Errors,

    /// Show configuration
    Config,

    /// Show cumulative session statistics
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PermissionMode {
    /// Coarse and fine location granted
    Granted,
    /// Only coarse location granted
    CoarseOnly,
    /// Nothing granted
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SettingsMode {
    /// Settings already allow high accuracy
    Satisfied,
    /// The user accepts the resolution prompt
    ResolveAccept,
    /// The user rejects the resolution prompt
    ResolveReject,
    /// Settings cannot be fixed
    Unresolvable,
}

impl PermissionMode {
    fn platform(self) -> ScriptedPermissions {
        let (coarse, fine) = match self {
            PermissionMode::Granted => (true, true),
            PermissionMode::CoarseOnly => (true, false),
            PermissionMode::Denied => (false, false),
        };
        ScriptedPermissions::new(Prompt::Answer(PermissionGrants { coarse, fine }))
    }
}

impl SettingsMode {
    fn platform(self) -> ScriptedSettings {
        match self {
            SettingsMode::Satisfied => ScriptedSettings::satisfied(),
            SettingsMode::ResolveAccept => ScriptedSettings::new(
                Prompt::Answer(SettingsCheck::Resolvable),
                Resolution::Prompt(Prompt::Answer(true)),
            ),
            SettingsMode::ResolveReject => ScriptedSettings::new(
                Prompt::Answer(SettingsCheck::Resolvable),
                Resolution::Prompt(Prompt::Answer(false)),
            ),
            SettingsMode::Unresolvable => ScriptedSettings::new(
                Prompt::Answer(SettingsCheck::Unresolvable),
                Resolution::Unavailable,
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sensor_remote=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            script,
            permission,
            settings,
            no_accelerometer,
            no_gyroscope,
            linger_ms,
        } => {
            cmd_replay(
                script,
                permission,
                settings,
                no_accelerometer,
                no_gyroscope,
                Duration::from_millis(linger_ms),
            )
            .await?;
        }
        Commands::Gestures => {
            cmd_gestures();
        }
        Commands::Errors => {
            cmd_errors();
        }
        Commands::Config => {
            cmd_config();
        }
        Commands::Status => {
            cmd_status();
        }
    }

    Ok(())
}

async fn cmd_replay(
    script: PathBuf,
    permission: PermissionMode,
    settings: SettingsMode,
    no_accelerometer: bool,
    no_gyroscope: bool,
    linger: Duration,
) -> anyhow::Result<()> {
    println!("Sensor Remote v{VERSION}");
    println!();

    let entries =
        load_script(&script).with_context(|| format!("Could not load script {script:?}"))?;

    // Load or create configuration
    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let mut sensors = ScriptedSensorSource::new();
    if no_accelerometer {
        sensors = sensors.without(SensorKind::Accelerometer);
    }
    if no_gyroscope {
        sensors = sensors.without(SensorKind::Gyroscope);
    }
    let location = ScriptedLocationSource::new();

    println!("Replaying {} entries from {:?}", entries.len(), script);
    println!("  Permission: {permission:?}");
    println!("  Settings: {settings:?}");
    println!(
        "  Accelerometer: {}",
        if no_accelerometer { "absent" } else { "present" }
    );
    println!(
        "  Gyroscope: {}",
        if no_gyroscope { "absent" } else { "present" }
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let activity = create_shared_log_with_persistence(config.data_path.join("activity.json"));
    let shared_sensors = Arc::new(sensors.clone());
    let mut coordinator = Coordinator::new(
        ShakeDetector::new(shared_sensors.clone(), config.shake.clone()),
        RotationDetector::new(shared_sensors, config.rotation.clone()),
        LocationChangeDetector::new(
            Arc::new(permission.platform()),
            Arc::new(settings.platform()),
            Arc::new(location.clone()),
            config.location.clone(),
        ),
        config.coordinator.clone(),
    )
    .with_activity_log(activity.clone());

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let RemoteStreams {
        mut commands,
        mut errors,
    } = coordinator.start();
    let printer = tokio::spawn(async move {
        let mut commands_open = true;
        let mut errors_open = true;
        while commands_open || errors_open {
            tokio::select! {
                command = commands.recv(), if commands_open => match command {
                    Some(command) => println!("▶ {command}"),
                    None => commands_open = false,
                },
                error = errors.recv(), if errors_open => match error {
                    Some(error) => eprintln!("✗ {}", error.message()),
                    None => errors_open = false,
                },
            }
        }
    });

    if permission == PermissionMode::Granted
        && matches!(settings, SettingsMode::Satisfied | SettingsMode::ResolveAccept)
    {
        wait_for_location_updates(&location, Duration::from_millis(500)).await;
    }

    let stats = replay(&entries, &sensors, &location, &running).await;

    let deadline = tokio::time::Instant::now() + linger;
    while running.load(Ordering::SeqCst) && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    coordinator.stop();
    if let Err(e) = printer.await {
        eprintln!("Warning: Output task failed: {e}");
    }

    println!();
    println!(
        "Replay: {} delivered, {} dropped, {} ms waited",
        stats.delivered, stats.dropped, stats.waited_ms
    );

    if let Err(e) = activity.save() {
        eprintln!("Warning: Could not save activity stats: {e}");
    }
    println!();
    println!("{}", activity.summary());

    Ok(())
}

/// Give the location gates a moment to pass before fixes are replayed.
async fn wait_for_location_updates(location: &ScriptedLocationSource, limit: Duration) {
    let deadline = tokio::time::Instant::now() + limit;
    while !location.is_registered() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    if !location.is_registered() {
        tracing::warn!("Location updates did not start; fixes will be dropped");
    }
}

fn cmd_gestures() {
    println!("{GESTURE_GUIDE}");
}

fn cmd_errors() {
    println!("Errors");
    println!("======");
    println!();
    for error in DetectorError::ALL {
        println!("{error:?}");
        println!("  {}", error.message());
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Sensor Remote Status");
    println!("====================");
    println!();

    println!("Configuration:");
    println!(
        "  Shake threshold: {} m/s²",
        config.shake.acceleration_threshold
    );
    println!(
        "  Rotation window: {} samples",
        config.rotation.window_size
    );
    println!(
        "  Location distance: {} m",
        config.location.distance_threshold_m
    );
    println!(
        "  Initial play delay: {} ms",
        config.coordinator.initial_delay.as_millis()
    );
    println!();

    // Load and show activity stats if available
    let stats_path = config.data_path.join("activity.json");
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                for (key, label) in [
                    ("shake_events", "Shakes"),
                    ("rotation_events", "Rotations"),
                    ("location_events", "Checkpoints left"),
                    ("commands_emitted", "Player commands"),
                    ("errors_reported", "Detector errors"),
                ] {
                    if let Some(value) = stats.get(key) {
                        println!("  {label}: {value}");
                    }
                }
                if let Some(updated) = stats.get("last_updated") {
                    println!("  Last updated: {updated}");
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
