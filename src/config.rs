use anyhow::Context;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

use crate::domain::geo::Coordinate;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    #[serde(default)]
    pub database: Database,
    pub http: HttpConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    pub in_memory: bool,
    pub path: Option<PathBuf>,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            in_memory: true,
            path: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub tile_url: String,
    pub attribution: String,
    pub max_zoom: u8,
    pub center: Coordinate,
    pub zoom: u8,
    /// fraction of the data span added around fitted bounds
    pub fit_padding: f64,
    /// directory holding a bundled copy of the map library
    pub assets_dir: Option<PathBuf>,
    /// remote copy used when no bundled one is found
    pub fallback_script_url: Option<String>,
    pub fallback_style_url: Option<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "© OpenStreetMap contributors".to_string(),
            max_zoom: 18,
            center: Coordinate::new(-22.2171, -48.7173),
            zoom: 12,
            fit_padding: 0.1,
            assets_dir: None,
            fallback_script_url: Some(
                "https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.min.js".to_string(),
            ),
            fallback_style_url: Some(
                "https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.min.css".to_string(),
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotifyConfig {
    pub message_ttl_secs: u64,
}

impl NotifyConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.message_ttl_secs)
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            message_ttl_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub lang: String,
    pub route_loaded: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lang: "pt-BR".to_string(),
            route_loaded: "Rota carregada com sucesso.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_minimal_config_toml() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[http]
bind_addr = "127.0.0.1"
port = 8080
"#;

        let cfg: Config = toml::from_str(toml_str)?;

        assert_eq!(cfg.version, 1);
        assert!(cfg.database.in_memory);
        assert_eq!(cfg.map.max_zoom, 18);
        assert_eq!(cfg.map.zoom, 12);
        assert_eq!(cfg.notify.ttl(), Duration::from_secs(5));
        assert_eq!(cfg.speech.lang, "pt-BR");
        assert!(cfg.speech.enabled);

        Ok(())
    }

    #[test]
    fn test_parse_full_config_toml() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[database]
in_memory = false
path = "/tmp/gpxnav.db"

[http]
bind_addr = "0.0.0.0"
port = 9000

[map]
tile_url = "https://tiles.example.org/{z}/{x}/{y}.png"
center = { lat = 48.85, lon = 2.35 }
zoom = 9
assets_dir = "/srv/leaflet"

[notify]
message_ttl_secs = 2

[speech]
enabled = false
lang = "en-US"
route_loaded = "Route loaded."
"#;

        let cfg: Config = toml::from_str(toml_str)?;

        assert!(!cfg.database.in_memory);
        assert_eq!(cfg.database.path, Some(PathBuf::from("/tmp/gpxnav.db")));
        assert_eq!(cfg.http.port, 9000);
        assert_eq!(cfg.map.center, Coordinate::new(48.85, 2.35));
        assert_eq!(cfg.map.zoom, 9);
        // unspecified fields keep their defaults
        assert_eq!(cfg.map.max_zoom, 18);
        assert_eq!(cfg.map.assets_dir, Some(PathBuf::from("/srv/leaflet")));
        assert_eq!(cfg.notify.message_ttl_secs, 2);
        assert!(!cfg.speech.enabled);
        assert_eq!(cfg.speech.route_loaded, "Route loaded.");

        Ok(())
    }
}
