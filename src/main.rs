use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use cgmath::Point2;
use clap::Parser;

use emberfall::darkness::DarknessMask;
use emberfall::flashlight::Facing;
use emberfall::{Config, GameSession, WorldObject, CHUNK_SIZE, TILE_SIZE};

#[derive(Parser, Debug)]
#[command(about = "Walks a player through a generated world without a window")]
struct Args {
    /// World seed; overrides the config file.
    #[arg(long)]
    seed: Option<u64>,
    /// Frames to simulate at 60 fps.
    #[arg(long, default_value_t = 600)]
    frames: u32,
    /// Square chunk radius kept loaded around the player.
    #[arg(long)]
    radius: Option<i32>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// error, warn, info, debug or trace.
    #[arg(long, default_value = "info")]
    log_level: String,
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(
                std::io::stderr(),
                "[{:<5} {}] {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    log::set_logger(&LOGGER).map_err(|e| anyhow::anyhow!("{e}"))?;
    let level: log::LevelFilter = args
        .log_level
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown log level {:?}", args.log_level))?;
    log::set_max_level(level);

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(seed) = args.seed {
        config.world.seed = seed;
    }
    if let Some(radius) = args.radius {
        config.world.visible_radius = radius;
    }
    let mut session = GameSession::new(config)?;
    if let Some(flashlight) = session.lighting_mut().flashlight_mut() {
        flashlight.face(Facing::Right);
        flashlight.toggle();
    }

    // A handful of props along the walk so the light scan has work to do.
    let span = CHUNK_SIZE as f32 * TILE_SIZE;
    let objects: Vec<WorldObject> = (0..8)
        .map(|i| {
            let name = ["campfire", "torch", "old lantern", "ghost"][i % 4];
            WorldObject::new(i as u64, name, i as f32 * span * 0.5, 40.0)
        })
        .collect();

    let dt = 1.0 / 60.0;
    let mut player = Point2::new(0.0f32, 0.0);
    for frame in 0..args.frames {
        player.x += 1.5;
        let ahead = objects
            .iter()
            .filter_map(|o| o.position)
            .find(|p| p.x > player.x);
        if let (Some(target), Some(flashlight)) = (ahead, session.lighting_mut().flashlight_mut()) {
            flashlight.aim(target - player);
        }
        session.update(dt, player, &objects);
        if frame % 120 == 0 {
            let weather = session.weather_state();
            let tile = session
                .tile_at(player.x, player.y)
                .map(|t| t.kind.name())
                .unwrap_or("none");
            log::info!(
                "frame {frame}: player ({:.0}, {:.0}) on {tile}, {} chunks, ambient {:.2}, darkness {:.2}, {} lights, weather {}",
                player.x,
                player.y,
                session.world().len(),
                session.ambient_light(),
                session.darkness(),
                session.lighting().registry().len(),
                weather.kind,
            );
        }
    }

    let mut mask = DarknessMask::new(40, 23);
    session.render_darkness(&mut mask);
    log::info!(
        "Finished: {} chunks generated, {} failures, mask {} bytes",
        session.world().len(),
        session.world().failed_generations(),
        mask.as_bytes().len()
    );
    Ok(())
}
