use crate::{APPLICATION, ORGANIZATION, QUALIFIER};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::PathBuf};

#[derive(Deserialize, Serialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub loading: LoadingConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct GalleryConfig {
    ///Upper bound on waterfall columns; fewer are used on narrow windows
    #[serde(default = "default_waterfall_columns")]
    pub waterfall_columns: usize,
    #[serde(default = "default_grid_columns")]
    pub grid_columns: usize,
    #[serde(default = "default_min_column_width")]
    pub min_column_width: f32,
    #[serde(default = "default_spacing")]
    pub spacing: f32,
    ///Items loaded ahead of and behind the visible range
    #[serde(default = "default_buffer_items")]
    pub buffer_items: usize,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct LoadingConfig {
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
    #[serde(default = "default_max_concurrent_loads")]
    pub max_concurrent_loads: usize,
    #[serde(default = "default_loaded_item_threshold")]
    pub loaded_item_threshold: usize,
    #[serde(default = "default_protection_margin")]
    pub protection_margin: usize,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_text_scaling")]
    pub text_scaling: f32,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        GalleryConfig {
            waterfall_columns: default_waterfall_columns(),
            grid_columns: default_grid_columns(),
            min_column_width: default_min_column_width(),
            spacing: default_spacing(),
            buffer_items: default_buffer_items(),
        }
    }
}

impl Default for LoadingConfig {
    fn default() -> Self {
        LoadingConfig {
            thumbnail_size: default_thumbnail_size(),
            max_concurrent_loads: default_max_concurrent_loads(),
            loaded_item_threshold: default_loaded_item_threshold(),
            protection_margin: default_protection_margin(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            text_scaling: default_text_scaling(),
        }
    }
}

impl Config {
    pub fn new() -> Config {
        Self::fetch_cfg()
    }

    pub fn fetch_cfg() -> Config {
        let cfg_path = match Self::cfg_path() {
            Some(path) => path,
            None => return Config::default(),
        };

        log::info!("Reading config -> {}", cfg_path.display());

        let config_json = match fs::read_to_string(cfg_path) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failure reading config file -> {e}, using defaults");
                let cfg = Config::default();
                if let Err(e) = cfg.save() {
                    log::warn!("Failure writing default config -> {e}");
                }
                return cfg;
            }
        };

        match serde_json::from_str(&config_json) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("Failure parsing config json -> {e}, using defaults");
                Config::default()
            }
        }
    }

    pub fn save(&self) -> io::Result<()> {
        let cfg_path = Self::cfg_path()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no usable config directory"))?;

        if let Some(parent) = cfg_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(cfg_path, json)
    }

    fn cfg_path() -> Option<PathBuf> {
        directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .map(|dirs| dirs.config_dir().join("config.json"))
    }
}

//Gallery
pub fn default_waterfall_columns() -> usize {
    6
}
pub fn default_grid_columns() -> usize {
    6
}
pub fn default_min_column_width() -> f32 {
    200.0
}
pub fn default_spacing() -> f32 {
    10.0
}
pub fn default_buffer_items() -> usize {
    10
}

//Loading
pub fn default_thumbnail_size() -> u32 {
    300
}
pub fn default_max_concurrent_loads() -> usize {
    6
}
pub fn default_loaded_item_threshold() -> usize {
    2000
}
pub fn default_protection_margin() -> usize {
    150
}

//General
pub fn default_text_scaling() -> f32 {
    1.25
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.gallery.waterfall_columns, 6);
        assert_eq!(cfg.loading.thumbnail_size, 300);
        assert_eq!(cfg.loading.max_concurrent_loads, 6);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{"gallery": {"spacing": 4.0}}"#).unwrap();
        assert_eq!(cfg.gallery.spacing, 4.0);
        assert_eq!(cfg.gallery.grid_columns, 6);
        assert_eq!(cfg.loading.loaded_item_threshold, 2000);
    }

    #[test]
    fn config_round_trips_through_json() {
        let mut cfg = Config::default();
        cfg.gallery.waterfall_columns = 4;

        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.gallery.waterfall_columns, 4);
    }
}
