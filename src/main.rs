mod app;
mod config;
mod core;
mod game;
mod screens;
mod ui;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Plays every osu! replay in a directory on top of each other, synced to the song.
#[derive(Parser, Debug)]
#[command(name = "replayview", version, about)]
struct Args {
    /// Directory holding the .osr replays (searched recursively) and one .mp3/.ogg.
    path: PathBuf,

    /// Trail length in milliseconds.
    #[arg(short = 't', long = "tail", default_value_t = 100)]
    tail: u32,

    /// Cursor marker radius in pixels.
    #[arg(short = 'r', long = "radius", default_value_t = 5)]
    radius: u32,

    /// Keep previous frames instead of clearing the screen each frame.
    #[arg(short = 'n', long = "no-wipe")]
    no_wipe: bool,

    /// Settings file; defaults are used when it does not exist.
    #[arg(short = 'c', long = "config", default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Music volume between 0 and 1, overriding the config file.
    #[arg(long)]
    volume: Option<f32>,
}

impl Args {
    fn render_params(&self) -> core::input::RenderParams {
        core::input::RenderParams {
            trail_length: self.tail,
            marker_radius: self.radius,
            wipe_each_frame: !self.no_wipe,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    config::load(&args.config);
    let config = config::get();
    log::set_max_level(config.log_level.as_level_filter());

    let sessions = match game::collection::load(&args.path) {
        Ok(sessions) => sessions,
        Err(e) => {
            eprintln!("replayview: {e}");
            return ExitCode::FAILURE;
        }
    };
    let audio_path = match game::collection::find_audio(&args.path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("replayview: {e}");
            return ExitCode::FAILURE;
        }
    };
    println!("{}", game::collection::scoreboard(&sessions));

    let volume = args
        .volume
        .filter(|v| v.is_finite())
        .map_or(config.music_volume, |v| v.clamp(0.0, 1.0));
    let player = match core::audio::Player::start(&audio_path, volume) {
        Ok(player) => player,
        Err(e) => {
            eprintln!("replayview: failed to play {}: {e}", audio_path.display());
            return ExitCode::FAILURE;
        }
    };

    match app::run(sessions, player, args.render_params(), &config) {
        Ok(reason) => ExitCode::from(reason.exit_code()),
        Err(e) => {
            eprintln!("replayview: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let args = Args::try_parse_from(["replayview", "replays"]).unwrap();
        assert_eq!(args.path, PathBuf::from("replays"));
        assert_eq!(args.render_params(), core::input::RenderParams::default());
        assert_eq!(args.config, PathBuf::from(config::DEFAULT_CONFIG_PATH));
        assert_eq!(args.volume, None);
    }

    #[test]
    fn short_flags_set_render_params() {
        let args =
            Args::try_parse_from(["replayview", "-t", "250", "-r", "0", "-n", "dir"]).unwrap();
        let params = args.render_params();
        assert_eq!(params.trail_length, 250);
        assert_eq!(params.marker_radius, 0);
        assert!(!params.wipe_each_frame);
    }

    #[test]
    fn path_is_required() {
        assert!(Args::try_parse_from(["replayview"]).is_err());
    }
}
