use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use motion_stagger_core::{
    build_timeline, AppConfig, Frame, PlaybackClock, Scene, SequencePlayer, Signal,
};
use tracing_subscriber::EnvFilter;

fn main() -> motion_stagger_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Some(AppConfig::load(path)?),
        None => None,
    };

    match cli.command {
        Commands::Plan { scene, group } => run_plan(scene.as_deref(), group.as_deref()),
        Commands::Simulate {
            scene,
            group,
            until,
            step,
            signals,
            json,
        } => run_simulate(
            scene.as_deref(),
            config,
            &group,
            SimulateOptions {
                until,
                step,
                signals,
                json,
            },
        ),
        Commands::Showcase { out } => run_showcase(&out),
    }
}

fn load_scene(path: Option<&Path>) -> motion_stagger_core::Result<Scene> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading scene");
            Scene::load(path)
        }
        None => Scene::showcase(),
    }
}

fn run_plan(scene: Option<&Path>, group: Option<&str>) -> motion_stagger_core::Result<()> {
    let scene = load_scene(scene)?;
    let groups: Vec<_> = match group {
        Some(id) => vec![scene.require_group(id)?],
        None => scene.groups.iter().collect(),
    };

    for group in groups {
        let timeline = build_timeline(group)?;
        let total = timeline
            .total_duration()
            .map(|t| format!("{t:.3}s"))
            .unwrap_or_else(|| "endless".to_string());
        println!("{} ({:?}, {} entries, {total})", group.id, group.trigger, timeline.len());
        for entry in timeline.entries() {
            let looping = if entry.is_looping() { "  loop" } else { "" };
            println!(
                "  {:>3}  {:<28} {:>7.3} -> {:>7.3}{looping}",
                entry.index, entry.path, entry.start, entry.end
            );
        }
    }
    Ok(())
}

struct SimulateOptions {
    until: Option<f64>,
    step: Option<f64>,
    signals: Vec<(f64, Signal)>,
    json: bool,
}

fn run_simulate(
    scene: Option<&Path>,
    config: Option<AppConfig>,
    group: &str,
    options: SimulateOptions,
) -> motion_stagger_core::Result<()> {
    let scene = load_scene(scene)?;
    let group = scene.require_group(group)?;

    let mut app = config.unwrap_or_else(|| AppConfig {
        engine: scene.config.clone(),
        ..Default::default()
    });
    if let Some(until) = options.until {
        app.sampling.until = until;
    }
    if let Some(step) = options.step {
        app.sampling.step = step;
    }
    app.validate()?;

    let mut signals = options.signals;
    signals.sort_by(|a, b| a.0.total_cmp(&b.0));
    tracing::info!(group = %group.id, signals = signals.len(), "simulating");

    let mut player = SequencePlayer::mount(group, 0.0, &app.engine)?;
    let mut pending = signals.into_iter().peekable();
    let mut clock = PlaybackClock::default();
    let steps = (app.sampling.until / app.sampling.step).round() as u64;

    for tick in 0..=steps {
        if tick > 0 {
            clock.advance(app.sampling.step);
        }
        let now = clock.now();
        while let Some((at, signal)) = pending.next_if(|(at, _)| *at <= now) {
            let transition = player.signal(signal, at)?;
            tracing::info!(at, %signal, from = ?transition.from, to = ?transition.to, "signal");
        }

        let frame = player.advance(now)?;
        if options.json {
            println!("{}", serde_json::to_string(&frame)?);
        } else {
            print_frame(&frame);
        }
    }
    Ok(())
}

fn print_frame(frame: &Frame) {
    let cells: Vec<String> = frame
        .entries
        .iter()
        .map(|status| {
            format!(
                "{}#{}={:?}({:.2})",
                status.path, status.run, status.phase, status.progress
            )
        })
        .collect();
    println!("{:>7.3}  {:<9?}  {}", frame.now, frame.state, cells.join(" "));
}

fn run_showcase(out: &PathBuf) -> motion_stagger_core::Result<()> {
    tracing::info!(?out, "writing showcase scene");
    Scene::showcase()?.save(out)
}

fn parse_timed_signal(raw: &str) -> Result<(f64, Signal), String> {
    let (at, name) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected TIME:SIGNAL, got `{raw}`"))?;
    let at: f64 = at
        .trim()
        .parse()
        .map_err(|err| format!("invalid signal time `{at}`: {err}"))?;
    if !at.is_finite() || at < 0.0 {
        return Err(format!("signal time must be a non-negative number, got {at}"));
    }
    let signal = name.parse::<Signal>().map_err(|err| err.to_string())?;
    Ok((at, signal))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan and simulate staggered animation timelines", long_about = None)]
struct Cli {
    /// JSON configuration file overriding the scene's engine settings.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the start and end of every entry, relative to group activation.
    Plan {
        /// Scene file to read. Defaults to the built-in showcase.
        #[arg(short, long)]
        scene: Option<PathBuf>,
        /// Only print this group.
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Mount a group at t=0, deliver signals and print phases at fixed steps.
    Simulate {
        #[arg(short, long)]
        scene: Option<PathBuf>,
        /// Group to play.
        #[arg(short, long)]
        group: String,
        /// Last sampled time in seconds.
        #[arg(long)]
        until: Option<f64>,
        /// Seconds between samples.
        #[arg(long)]
        step: Option<f64>,
        /// Timed signal such as `0.5:visible`, `1:fire` or `1.2:reset`.
        #[arg(long = "signal", value_parser = parse_timed_signal)]
        signals: Vec<(f64, Signal)>,
        /// Emit one JSON frame per line.
        #[arg(long)]
        json: bool,
    },
    /// Write the built-in showcase scene as JSON.
    Showcase {
        /// Output path for the scene file.
        #[arg(short, long)]
        out: PathBuf,
    },
}
