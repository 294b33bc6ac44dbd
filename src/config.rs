use crate::core::space::Playfield;
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

pub const DEFAULT_CONFIG_PATH: &str = "replayview.ini";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.load_str(&content);
        Ok(())
    }

    pub fn load_str(&mut self, content: &str) {
        self.sections.clear();
        let mut current_section: Option<String> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // Section header: [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let section = line[1..line.len() - 1].trim().to_string();
                current_section = Some(section.clone());
                self.sections.entry(section).or_default();
                continue;
            }

            // Key/value pair: key=value
            if let Some(eq_idx) = line.find('=') {
                let (key_raw, value_raw) = line.split_at(eq_idx);
                let key = key_raw.trim();
                if key.is_empty() {
                    continue;
                }
                let value = value_raw[1..].trim().to_string();
                let section = current_section.clone().unwrap_or_default();
                self.sections
                    .entry(section)
                    .or_default()
                    .insert(key.to_string(), value);
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }

    fn parse<T: FromStr>(&self, section: &str, key: &str) -> Option<T> {
        let raw = self.get(section, key)?;
        let parsed = raw.parse::<T>().ok();
        if parsed.is_none() {
            warn!("Ignoring invalid value '{raw}' for {section}.{key}");
        }
        parsed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Window size plus the playfield calibration for it. The calibration constants
    /// only hold for the resolution they were measured at; change them together.
    pub playfield: Playfield,
    /// Left edge of the key indicator strip; the strip spans five squares up to the
    /// right window edge.
    pub key_strip_left: u32,
    pub music_volume: f32,
    pub fps_report_ms: u64,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            playfield: Playfield::OSU_1366X768,
            key_strip_left: 1024,
            music_volume: 0.5,
            fps_report_ms: 100,
            log_level: LogLevel::Warn,
        }
    }
}

impl Config {
    /// Builds a config from parsed INI data, keeping defaults for anything missing or invalid.
    pub fn from_ini(conf: &SimpleIni) -> Self {
        let default = Self::default();
        let d = default.playfield;
        let playfield = Playfield {
            width: conf
                .parse::<u32>("Display", "Width")
                .filter(|w| *w > 0)
                .unwrap_or(d.width),
            height: conf
                .parse::<u32>("Display", "Height")
                .filter(|h| *h > 0)
                .unwrap_or(d.height),
            x_offset: conf
                .parse::<f32>("Display", "PlayfieldX")
                .filter(|v| v.is_finite())
                .unwrap_or(d.x_offset),
            y_offset: conf
                .parse::<f32>("Display", "PlayfieldY")
                .filter(|v| v.is_finite())
                .unwrap_or(d.y_offset),
            scale: conf
                .parse::<f32>("Display", "PlayfieldScale")
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(d.scale),
        };
        let resized = playfield.width != d.width || playfield.height != d.height;
        let calibrated = playfield.x_offset != d.x_offset
            || playfield.y_offset != d.y_offset
            || playfield.scale != d.scale;
        if resized && !calibrated {
            warn!(
                "Window is {}x{} but the playfield calibration is for {}x{}; set PlayfieldX/PlayfieldY/PlayfieldScale",
                playfield.width, playfield.height, d.width, d.height
            );
        }

        Self {
            playfield,
            key_strip_left: conf
                .parse::<u32>("Display", "KeyStripLeft")
                .unwrap_or(default.key_strip_left)
                .min(playfield.width),
            music_volume: conf
                .parse::<f32>("Options", "MusicVolume")
                .filter(|v| v.is_finite())
                .map_or(default.music_volume, |v| v.clamp(0.0, 1.0)),
            fps_report_ms: conf
                .parse::<u64>("Options", "FpsReportMs")
                .filter(|ms| *ms > 0)
                .unwrap_or(default.fps_report_ms),
            log_level: conf
                .get("Options", "LogLevel")
                .and_then(|v| LogLevel::from_str(&v).ok())
                .unwrap_or(default.log_level),
        }
    }
}

static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

/// Reads the config file if present. A missing file means defaults; nothing is written back.
pub fn load(path: &Path) {
    let mut conf = SimpleIni::new();
    let cfg = match conf.load(path) {
        Ok(()) => {
            info!("Loaded config from {}", path.display());
            Config::from_ini(&conf)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No config at {}; using defaults", path.display());
            Config::default()
        }
        Err(e) => {
            warn!("Failed to read config {}: {e}; using defaults", path.display());
            Config::default()
        }
    };
    *CONFIG.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = cfg;
}

pub fn get() -> Config {
    *CONFIG.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
