use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::input::OriginOffset;
use crate::painter::DEFAULT_BRUSH_WIDTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "labelpaint";
const APP_CONFIG_FILE: &str = "config.json";

const DEFAULT_SIDE_PANEL_WIDTH: u32 = 240;
const DEFAULT_TOP_BAR_HEIGHT: u32 = 64;
const DEFAULT_BORDER_X: u32 = 3;
const DEFAULT_BORDER_Y: u32 = 2;

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub brush_width: u32,
    pub side_panel_width: u32,
    pub top_bar_height: u32,
    pub border_x: u32,
    pub border_y: u32,
    pub data_root: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            brush_width: DEFAULT_BRUSH_WIDTH,
            side_panel_width: DEFAULT_SIDE_PANEL_WIDTH,
            top_bar_height: DEFAULT_TOP_BAR_HEIGHT,
            border_x: DEFAULT_BORDER_X,
            border_y: DEFAULT_BORDER_Y,
            data_root: None,
        }
    }
}

impl AppConfig {
    /// Where image pixel (0, 0) sits in client space, past the panel, bar and border.
    pub fn origin_offset(&self) -> OriginOffset {
        OriginOffset::from_chrome(
            self.side_panel_width,
            self.top_bar_height,
            self.border_x,
            self.border_y,
        )
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => parse_app_config(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

fn parse_app_config(contents: &str) -> serde_json::Result<AppConfig> {
    let mut config: AppConfig = serde_json::from_str(contents)?;
    if config.brush_width == 0 {
        tracing::warn!("brush_width must be positive; using default");
        config.brush_width = DEFAULT_BRUSH_WIDTH;
    }
    Ok(config)
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}
