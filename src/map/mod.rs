//! The map the overlays are drawn on
//!
//! [`MapSurface`] is what the renderer talks to. [`MapState`] is the
//! in-process implementation: it keeps the layers and viewport that the
//! browser page mirrors with Leaflet.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::{
    config::MapConfig,
    domain::geo::{Bounds, Coordinate},
};

pub mod overlay;

use overlay::Overlay;

pub const LIBRARY_SCRIPT: &str = "leaflet.js";
pub const LIBRARY_STYLE: &str = "leaflet.css";

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map library unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("fullscreen not supported")]
    FullscreenUnsupported,
}

/// Handle of a layer added to a [`MapSurface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LayerId(pub u64);

pub trait MapSurface: Send {
    fn add_layer(&mut self, overlay: Overlay) -> LayerId;

    /// Returns false if no such layer is on the map
    fn remove_layer(&mut self, layer: LayerId) -> bool;

    fn layer_count(&self) -> usize;

    fn layer(&self, layer: LayerId) -> Option<&Overlay>;

    fn fit_bounds(&mut self, bounds: Bounds);

    fn request_fullscreen(&mut self) -> Result<(), MapError> {
        Err(MapError::FullscreenUnsupported)
    }
}

/// Where the page gets the mapping library from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum MapLibrary {
    Bundled { script: String, style: String },
    Remote { script: String, style: String },
}

impl MapLibrary {
    /// Prefers a bundled copy under `assets_dir`, falls back to the remote URLs.
    pub fn locate(config: &MapConfig) -> Result<Self, MapError> {
        if let Some(dir) = &config.assets_dir {
            if Self::is_bundled(dir) {
                log::info!("map library found in {}", dir.to_string_lossy());
                return Ok(MapLibrary::Bundled {
                    script: format!("/assets/{LIBRARY_SCRIPT}"),
                    style: format!("/assets/{LIBRARY_STYLE}"),
                });
            }
            log::info!(
                "map library not found in {}, trying fallback",
                dir.to_string_lossy()
            );
        }

        match (&config.fallback_script_url, &config.fallback_style_url) {
            (Some(script), Some(style)) => {
                log::info!("map library loaded via fallback {script}");
                Ok(MapLibrary::Remote {
                    script: script.clone(),
                    style: style.clone(),
                })
            }
            _ => {
                log::error!("could not load map library via fallback");
                Err(MapError::LibraryUnavailable(
                    "no bundled copy and no fallback URL configured".to_string(),
                ))
            }
        }
    }

    fn is_bundled(dir: &Path) -> bool {
        dir.join(LIBRARY_SCRIPT).is_file() && dir.join(LIBRARY_STYLE).is_file()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Viewport {
    View { center: Coordinate, zoom: u8 },
    Fit { bounds: Bounds },
}

#[derive(Debug, Clone, Serialize)]
pub struct TileLayer {
    pub url: String,
    pub attribution: String,
    pub max_zoom: u8,
}

/// Map kept in process and mirrored by the browser page
pub struct MapState {
    tiles: TileLayer,
    layers: Vec<(LayerId, Overlay)>,
    viewport: Viewport,
    next_layer: u64,
    fullscreen_requested: bool,
}

#[derive(Debug, Serialize)]
pub struct MapSnapshot<'a> {
    pub tiles: &'a TileLayer,
    pub viewport: &'a Viewport,
    pub overlays: Vec<&'a Overlay>,
    pub fullscreen_requested: bool,
}

impl MapState {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            tiles: TileLayer {
                url: config.tile_url.clone(),
                attribution: config.attribution.clone(),
                max_zoom: config.max_zoom,
            },
            layers: Vec::new(),
            viewport: Viewport::View {
                center: config.center,
                zoom: config.zoom,
            },
            next_layer: 0,
            fullscreen_requested: false,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.layers.iter().map(|(_, o)| o)
    }

    pub fn snapshot(&self) -> MapSnapshot<'_> {
        MapSnapshot {
            tiles: &self.tiles,
            viewport: &self.viewport,
            overlays: self.overlays().collect(),
            fullscreen_requested: self.fullscreen_requested,
        }
    }
}

impl MapSurface for MapState {
    fn add_layer(&mut self, overlay: Overlay) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        self.layers.push((id, overlay));
        id
    }

    fn remove_layer(&mut self, layer: LayerId) -> bool {
        let before = self.layers.len();
        self.layers.retain(|(id, _)| *id != layer);
        self.layers.len() != before
    }

    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn layer(&self, layer: LayerId) -> Option<&Overlay> {
        self.layers
            .iter()
            .find(|(id, _)| *id == layer)
            .map(|(_, o)| o)
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.viewport = Viewport::Fit { bounds };
    }

    // the page performs the actual request; here we only remember it was asked for
    fn request_fullscreen(&mut self) -> Result<(), MapError> {
        self.fullscreen_requested = true;
        Ok(())
    }
}

/// A map surface plus the one overlay currently shown on it
pub struct MapView<M: MapSurface> {
    surface: M,
    active: Option<LayerId>,
}

impl<M: MapSurface> MapView<M> {
    pub fn new(surface: M) -> Self {
        Self {
            surface,
            active: None,
        }
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    pub fn active_overlay(&self) -> Option<&Overlay> {
        self.active.and_then(|l| self.surface.layer(l))
    }

    /// Takes the active overlay off the map. Returns false if there was none.
    pub fn clear_active(&mut self) -> bool {
        match self.active.take() {
            Some(layer) => self.surface.remove_layer(layer),
            None => false,
        }
    }

    /// Adds `overlay` as the active one and fits the viewport around it.
    ///
    /// The caller must have cleared the previous overlay.
    pub fn show(&mut self, overlay: Overlay, padding: f64) {
        debug_assert!(self.active.is_none());
        let bounds = overlay.bounds.pad(padding);
        self.active = Some(self.surface.add_layer(overlay));
        self.surface.fit_bounds(bounds);
    }

    /// Best effort; failures are only logged
    pub fn request_fullscreen(&mut self) {
        if let Err(e) = self.surface.request_fullscreen() {
            log::debug!("fullscreen request ignored: {e}");
        }
    }
}
