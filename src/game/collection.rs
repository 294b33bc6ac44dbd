use crate::game::parsing::osr;
use crate::game::replay::ReplaySession;
use crate::ui::color::{self, WHITE};
use log::{info, warn};
use rand::Rng;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Song formats the audio player can decode.
pub const AUDIO_EXTENSIONS: [&str; 2] = ["mp3", "ogg"];

/// Extensions match in any case, the way the audio decoder reads them.
const MATCH_OPTIONS: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no replays to read in {}", .0.display())]
    NoReplaysFound(PathBuf),
    #[error("no audio file (.mp3/.ogg) in {}", .0.display())]
    NoAudioFound(PathBuf),
    #[error("{count} audio files in {}, expected exactly one", .dir.display())]
    AmbiguousAudioFound { dir: PathBuf, count: usize },
    #[error("bad search pattern: {0}")]
    Glob(#[from] glob::PatternError),
}

/// Reads every `.osr` under `dir` (recursively), colors and ranks them.
pub fn load(dir: &Path) -> Result<Vec<ReplaySession>, LoadError> {
    let pattern = format!("{}/**/*.osr", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob::glob_with(&pattern, MATCH_OPTIONS)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable path: {e}");
                None
            }
        })
        .collect();
    // Score ties keep this order, so pin it down rather than rely on the walk.
    files.sort();
    if files.is_empty() {
        return Err(LoadError::NoReplaysFound(dir.to_path_buf()));
    }

    let mut sessions = Vec::with_capacity(files.len());
    for path in &files {
        match osr::read_file(path) {
            Ok(session) if session.is_empty() => {
                warn!("Replay {} has no input frames; it will not be drawn", path.display());
                sessions.push(session);
            }
            Ok(session) => {
                info!(
                    "Loaded replay {} ({} by {}, {} ms)",
                    path.display(),
                    session.score,
                    session.player,
                    session.len()
                );
                sessions.push(session);
            }
            Err(e) => warn!("Skipping replay {}: {e}", path.display()),
        }
    }
    if sessions.is_empty() {
        return Err(LoadError::NoReplaysFound(dir.to_path_buf()));
    }

    assign_colors(&mut sessions, &mut rand::rng());
    sort_by_score(&mut sessions);
    Ok(sessions)
}

/// White for a lone replay, otherwise a random bright color each.
pub fn assign_colors<R: Rng>(sessions: &mut [ReplaySession], rng: &mut R) {
    if let [only] = sessions {
        only.color = WHITE;
        return;
    }
    for session in sessions {
        session.color = color::pick_color(rng);
    }
}

/// Best score first; equal scores keep load order.
pub fn sort_by_score(sessions: &mut [ReplaySession]) {
    sessions.sort_by(|a, b| b.score.cmp(&a.score));
}

/// Ranked listing printed once at startup.
pub fn scoreboard(sessions: &[ReplaySession]) -> String {
    let mut out = String::new();
    for (i, s) in sessions.iter().enumerate() {
        let _ = writeln!(out, "{:2}. {:>15} - {}", i + 1, s.player, s.score);
    }
    let _ = write!(out, "read {} replays", sessions.len());
    out
}

/// The one song file sitting directly in `dir`.
pub fn find_audio(dir: &Path) -> Result<PathBuf, LoadError> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut found = Vec::new();
    for ext in AUDIO_EXTENSIONS {
        for entry in glob::glob_with(&format!("{base}/*.{ext}"), MATCH_OPTIONS)?.flatten() {
            found.push(entry);
        }
    }
    match found.len() {
        0 => Err(LoadError::NoAudioFound(dir.to_path_buf())),
        1 => Ok(found.remove(0)),
        count => Err(LoadError::AmbiguousAudioFound {
            dir: dir.to_path_buf(),
            count,
        }),
    }
}
