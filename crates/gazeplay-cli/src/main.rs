use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use gazeplay_core::{
    build_sink, host_matches_allowlist, AttentionEngine, DispatchError, DispatchStrategy,
    EngineEvent, FaceGeometry, FaceProvider, GazeplayConfig, HeadPose, MediaKeyPoster,
    PlaybackCommand, ProviderError, TabScripter,
};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Simulated camera rate.
const SIM_FRAME_US: i64 = 33_333;

#[derive(Parser)]
#[command(name = "gazeplay", about = "Screen-attention play/pause controller")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the built-in configuration as TOML
    DefaultConfig,
    /// Load a configuration file (with GAZEPLAY_* overrides) and validate it
    CheckConfig { path: PathBuf },
    /// Drive the engine with synthetic face geometry and print its events
    Simulate {
        scenario: Scenario,
        #[arg(long)]
        config: Option<PathBuf>,
        /// media_key or tab_script; overrides the configuration
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long, default_value_t = 6.0)]
        duration_sec: f32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scenario {
    /// Steady viewing
    Looking,
    /// Brief look down at 1.0s, shorter than the off-dwell
    Glance,
    /// User leaves at 1.0s
    Absent,
    /// Disabled at 2.5s, re-enabled at 4.0s
    Disable,
    /// Attention toggling every 300ms
    Flapping,
}

/// Scripted face source: each frame is its own timestamp.
struct ScriptedProvider {
    scenario: Scenario,
}

impl ScriptedProvider {
    fn facing(pitch: f32) -> FaceGeometry {
        FaceGeometry {
            pose: Some(HeadPose::new(pitch, 0.02, -0.01)),
            ..Default::default()
        }
    }
}

impl FaceProvider for ScriptedProvider {
    type Frame = i64;

    fn detect(&mut self, t_us: &i64) -> Result<Option<FaceGeometry>, ProviderError> {
        let t = *t_us;
        let geometry = match self.scenario {
            Scenario::Looking | Scenario::Disable => Some(Self::facing(0.0)),
            Scenario::Glance if (1_000_000..1_400_000).contains(&t) => Some(Self::facing(-0.8)),
            Scenario::Glance => Some(Self::facing(0.0)),
            Scenario::Absent if t >= 1_000_000 => None,
            Scenario::Absent => Some(Self::facing(0.0)),
            Scenario::Flapping if (t / 300_000) % 2 == 0 => Some(Self::facing(0.0)),
            Scenario::Flapping => Some(Self::facing(-0.8)),
        };
        Ok(geometry)
    }
}

/// Dry-run media key: logs instead of posting.
struct LogMediaKeys;

impl MediaKeyPoster for LogMediaKeys {
    fn send_play_pause(&self) -> Result<(), DispatchError> {
        info!("media key: play/pause toggle (dry run)");
        Ok(())
    }
}

/// Dry-run tab scripter over a fixed set of open tab addresses.
struct DryRunTabs {
    tabs: Vec<String>,
}

impl TabScripter for DryRunTabs {
    fn control_tab(
        &self,
        command: PlaybackCommand,
        domain_allowlist: &[String],
    ) -> Result<String, DispatchError> {
        let tab = self
            .tabs
            .iter()
            .find(|url| host_matches_allowlist(url, domain_allowlist))
            .ok_or(DispatchError::NoMatchingTab)?;
        info!(%command, tab = %tab, "tab script (dry run)");
        Ok(format!("{command} -> {tab}"))
    }
}

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(d) = "gazeplay_core=info".parse() {
        filter = filter.add_directive(d);
    }
    if let Ok(d) = "gazeplay=info".parse() {
        filter = filter.add_directive(d);
    }
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_config(path: Option<&PathBuf>) -> Result<GazeplayConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => GazeplayConfig::from_file_with_env(path)?,
        None => {
            let mut config = GazeplayConfig::default();
            config.apply_env_overrides()?;
            config.validate()?;
            config
        }
    };
    Ok(config)
}

fn print_events(events: Vec<EngineEvent>) -> Result<(), serde_json::Error> {
    for event in events {
        println!("{}", event.to_json_line()?);
    }
    Ok(())
}

fn simulate(
    scenario: Scenario,
    mut config: GazeplayConfig,
    duration_sec: f32,
) -> Result<(), Box<dyn std::error::Error>> {
    if !(duration_sec.is_finite() && duration_sec > 0.0) {
        return Err("--duration-sec must be positive".into());
    }
    let end_us = (f64::from(duration_sec) * 1_000_000.0) as i64;
    config.validate()?;

    let sink = build_sink(
        config.dispatch.strategy,
        &config.dispatch.domain_allowlist,
        LogMediaKeys,
        DryRunTabs {
            tabs: vec![
                "https://mail.example.com/inbox".to_string(),
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            ],
        },
    );
    let mut engine = AttentionEngine::from_config(&config, sink);
    let mut provider = ScriptedProvider { scenario };
    let tick_us = engine.watchdog_period_us().max(1) as i64;

    info!(?scenario, strategy = %config.dispatch.strategy, duration_sec, "simulation started");
    engine.start(0);

    let mut next_frame = 0i64;
    let mut next_tick = tick_us;
    let mut pending_toggles: Vec<(i64, bool)> = match scenario {
        Scenario::Disable => vec![(2_500_000, false), (4_000_000, true)],
        _ => Vec::new(),
    };

    while next_frame <= end_us || next_tick <= end_us {
        if let Some(&(at, enabled)) = pending_toggles.first() {
            if at <= next_frame.min(next_tick) {
                pending_toggles.remove(0);
                print_events(engine.set_enabled(enabled, at))?;
                continue;
            }
        }

        if next_tick <= next_frame {
            print_events(engine.watchdog_tick(next_tick))?;
            next_tick += tick_us;
        } else {
            let frame = next_frame;
            print_events(engine.process_frame(&mut provider, &frame, frame))?;
            next_frame += SIM_FRAME_US;
        }
    }

    let snapshot = engine.snapshot();
    debug!(?snapshot, "simulation finished");
    println!("{}", serde_json::to_string(&snapshot)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();
    match cli.cmd {
        Commands::DefaultConfig => {
            print!("{}", GazeplayConfig::default().to_toml_string()?);
        }
        Commands::CheckConfig { path } => {
            let config = GazeplayConfig::from_file_with_env(&path)?;
            println!(
                "{}: ok (strategy {}, on {}s, off {}s)",
                path.display(),
                config.dispatch.strategy,
                config.timing.on_delay_sec,
                config.timing.off_delay_sec
            );
        }
        Commands::Simulate {
            scenario,
            config,
            strategy,
            duration_sec,
        } => {
            let mut cfg = load_config(config.as_ref())?;
            if let Some(s) = strategy {
                cfg.dispatch.strategy = s.parse::<DispatchStrategy>()?;
            }
            simulate(scenario, cfg, duration_sec)?;
        }
    }
    Ok(())
}
