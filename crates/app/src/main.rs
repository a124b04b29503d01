use std::path::PathBuf;

use avatar_face_core::{
    viseme::viseme_table, AvatarConfig, AvatarScene, FrameClock, MorphTargetMesh, Recorder,
    RecordingSettings, ShapeSet, VisemeTrack,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> avatar_face_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            track,
            config,
            seed,
            fps,
            duration,
            speak_from,
            speak_until,
            output,
        } => {
            let mut config = load_config(config.as_ref())?;
            if seed.is_some() {
                config.animation.seed = seed;
            }
            let window = SpeakingWindow {
                from: speak_from,
                until: speak_until,
            };
            let settings = RecordingSettings {
                fps,
                duration_seconds: duration,
            };
            run_simulate(&config, track.as_ref(), settings, window, output.as_ref())
        }
        Commands::Visemes => {
            println!("{}", serde_json::to_string_pretty(&viseme_table())?);
            Ok(())
        }
        Commands::Config { config } => {
            let config = load_config(config.as_ref())?;
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
    }
}

/// Span of audio time, in seconds, during which the avatar is speaking.
struct SpeakingWindow {
    from: f32,
    until: Option<f32>,
}

impl SpeakingWindow {
    fn contains(&self, time: f32, track: &VisemeTrack) -> bool {
        if track.is_empty() {
            return false;
        }
        let until = self
            .until
            .or_else(|| track.events().last().map(|event| event.time))
            .unwrap_or(self.from);
        time >= self.from && time <= until
    }
}

fn load_config(path: Option<&PathBuf>) -> avatar_face_core::Result<AvatarConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AvatarConfig::from_path(path)
        }
        None => Ok(AvatarConfig::default()),
    }
}

fn run_simulate(
    config: &AvatarConfig,
    track: Option<&PathBuf>,
    settings: RecordingSettings,
    window: SpeakingWindow,
    output: Option<&PathBuf>,
) -> avatar_face_core::Result<()> {
    let track = match track {
        Some(path) => VisemeTrack::from_json(&std::fs::read_to_string(path)?),
        None => VisemeTrack::empty(),
    };
    tracing::info!(
        events = track.len(),
        fps = settings.fps,
        duration = settings.duration_seconds,
        "running headless simulation"
    );

    let mut recorder = Recorder::new(settings);
    let mut scene = AvatarScene::new(config);
    let mesh: Box<dyn MorphTargetMesh> = Box::new(recorder.mesh(ShapeSet::all()));
    scene.attach_model(vec![mesh]);
    scene.set_viseme_track(track.clone());

    let delta = recorder.settings().frame_delta();
    let frames = recorder.settings().frame_count();
    let mut clock = FrameClock::default();

    recorder.start()?;
    for _ in 0..frames {
        let elapsed = clock.advance(delta);
        scene.set_speaking(window.contains(elapsed, &track));
        scene.set_current_time(elapsed);
        scene.tick(delta, elapsed);
        recorder.capture(clock.frame, elapsed, scene.mode());
    }
    recorder.stop()?;
    scene.teardown();

    let lines = recorder.to_json_lines()?;
    match output {
        Some(path) => {
            std::fs::write(path, lines)?;
            tracing::info!(?path, frames, "wrote recorded weights");
        }
        None => print!("{lines}"),
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Blend-shape animation for speaking avatars", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive an avatar headlessly and print the applied weights as JSON lines.
    Simulate {
        /// Viseme track JSON file, an array of `{ "time", "viseme" }` objects.
        #[arg(short, long)]
        track: Option<PathBuf>,
        /// Animation configuration JSON file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Seed for idle motion, overrides the configuration.
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Seconds to simulate.
        #[arg(short, long, default_value_t = 2.0)]
        duration: f32,
        /// Audio time at which speaking starts.
        #[arg(long, default_value_t = 0.0)]
        speak_from: f32,
        /// Audio time at which speaking stops; defaults to the last event.
        #[arg(long)]
        speak_until: Option<f32>,
        /// Write the frames here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the viseme table.
    Visemes,
    /// Print the effective configuration.
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
