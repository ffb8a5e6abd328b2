//! Building the map overlay for a stored entry

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    domain::{
        entry::GpxEntry,
        geo::{Bounds, path_length_m},
        id::EntryId,
    },
    gpx::{self, GpxData, error::GpxError},
    map::{
        MapLibrary, MapSurface, MapView,
        overlay::{Marker, Overlay, OverlaySummary, Polyline, PolylineStyle},
    },
    storage::track_store::TrackStore,
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Map library not loaded. Reload the page.")]
    LibraryNotLoaded,

    #[error("Map not initialized. Reload the page.")]
    MapNotInitialized,

    #[error("File not found")]
    EntryNotFound(usize),

    #[error("No track points or waypoints found in file")]
    NoPoints,

    #[error("No valid coordinates found in file")]
    NoValidCoordinates,

    #[error("Failed to load route: {0}")]
    Failed(#[from] GpxError),
}

/// What was drawn by a successful render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRoute {
    pub index: usize,
    pub name: String,
    pub summary: OverlaySummary,
}

/// Builds the overlay primitives for already extracted data.
pub fn build_overlay(entry: &GpxEntry, data: &GpxData) -> Result<Overlay, RenderError> {
    if !data.has_point_elements() {
        return Err(RenderError::NoPoints);
    }

    let bounds = Bounds::from_coords(data.coordinates()).ok_or(RenderError::NoValidCoordinates)?;

    let polyline = (data.track_points.len() > 1).then(|| Polyline {
        points: data.track_points.clone(),
        style: PolylineStyle::default(),
    });

    let markers = data
        .waypoints
        .iter()
        .map(|w| Marker::new(w.position, w.name.as_deref()))
        .collect::<Vec<_>>();

    Ok(Overlay {
        entry_id: entry.id,
        entry_name: entry.name.clone(),
        summary: OverlaySummary {
            track_points: data.track_points.len(),
            waypoints: markers.len(),
            distance_m: path_length_m(&data.track_points),
        },
        polyline,
        markers,
        bounds,
    })
}

/// Draws stored entries, keeping the extracted data of each entry it has seen.
///
/// Entries never change once stored, so cached data only goes away when the
/// entry is removed.
pub struct GpxRenderer {
    cache: HashMap<EntryId, GpxData>,
    fit_padding: f64,
}

impl GpxRenderer {
    pub fn new(fit_padding: f64) -> Self {
        Self {
            cache: HashMap::new(),
            fit_padding,
        }
    }

    fn data_for(&mut self, entry: &GpxEntry) -> Result<&GpxData, GpxError> {
        if !self.cache.contains_key(&entry.id) {
            let data = gpx::extract(&entry.content)?;
            self.cache.insert(entry.id, data);
        }
        Ok(&self.cache[&entry.id])
    }

    pub fn forget(&mut self, id: &EntryId) {
        self.cache.remove(id);
    }

    #[cfg(test)]
    pub fn is_cached(&self, id: &EntryId) -> bool {
        self.cache.contains_key(id)
    }

    /// Replaces whatever overlay is on `map` with the one for entry `index`.
    ///
    /// The previous overlay is removed as soon as the preconditions hold, so
    /// after a failed render the map shows no overlay at all.
    pub fn render<M: MapSurface>(
        &mut self,
        index: usize,
        store: &TrackStore,
        library: Option<&MapLibrary>,
        map: Option<&mut MapView<M>>,
    ) -> Result<RenderedRoute, RenderError> {
        library.ok_or(RenderError::LibraryNotLoaded)?;
        let map = map.ok_or(RenderError::MapNotInitialized)?;
        let entry = store.get(index).ok_or(RenderError::EntryNotFound(index))?;

        map.clear_active();

        let overlay = build_overlay(entry, self.data_for(entry)?)?;
        let summary = overlay.summary.clone();
        map.show(overlay, self.fit_padding);

        Ok(RenderedRoute {
            index,
            name: entry.name.clone(),
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MapConfig,
        domain::geo::Coordinate,
        gpx::fixtures,
        map::{MapState, Viewport, overlay::DEFAULT_MARKER_LABEL},
    };

    fn library() -> MapLibrary {
        MapLibrary::Remote {
            script: "leaflet.js".to_string(),
            style: "leaflet.css".to_string(),
        }
    }

    fn map() -> MapView<MapState> {
        MapView::new(MapState::new(&MapConfig::default()))
    }

    fn store_with(files: &[(&str, String)]) -> anyhow::Result<TrackStore> {
        let mut store = TrackStore::new_in_memory();
        for (name, content) in files {
            store.push(GpxEntry::new(*name, content.clone(), 0))?;
        }
        Ok(store)
    }

    #[test]
    fn test_three_track_points_make_one_polyline() -> anyhow::Result<()> {
        let store = store_with(&[("a.gpx", fixtures::track(&[("1", "1"), ("2", "2"), ("3", "3")]))])?;
        let mut map = map();
        let mut renderer = GpxRenderer::new(0.1);

        let route = renderer.render(0, &store, Some(&library()), Some(&mut map))?;
        assert_eq!(route.summary.track_points, 3);

        let overlay = map.active_overlay().expect("overlay shown");
        let polyline = overlay.polyline.as_ref().expect("polyline drawn");
        assert_eq!(
            polyline.points,
            vec![
                Coordinate::new(1.0, 1.0),
                Coordinate::new(2.0, 2.0),
                Coordinate::new(3.0, 3.0)
            ]
        );
        assert_eq!(polyline.style, PolylineStyle::default());
        assert!(overlay.markers.is_empty());

        let Viewport::Fit { bounds } = map.surface().viewport() else {
            panic!("viewport was not fitted");
        };
        assert!(polyline.points.iter().all(|p| bounds.contains(p)));
        Ok(())
    }

    #[test]
    fn test_single_track_point_draws_no_line() -> anyhow::Result<()> {
        let store = store_with(&[("a.gpx", fixtures::track(&[("1", "1")]))])?;
        let mut map = map();

        GpxRenderer::new(0.1).render(0, &store, Some(&library()), Some(&mut map))?;

        let overlay = map.active_overlay().expect("overlay shown");
        assert!(overlay.polyline.is_none());
        assert_eq!(overlay.bounds, Bounds::from_coords(&[Coordinate::new(1.0, 1.0)]).unwrap());
        Ok(())
    }

    #[test]
    fn test_no_valid_coordinates_adds_nothing() -> anyhow::Result<()> {
        let store = store_with(&[(
            "bad.gpx",
            fixtures::with_waypoints(&[("x", "1"), ("2", "y")], &[("", "", Some("nowhere"))]),
        )])?;
        let mut map = map();

        let err = GpxRenderer::new(0.1)
            .render(0, &store, Some(&library()), Some(&mut map))
            .unwrap_err();

        assert!(matches!(err, RenderError::NoValidCoordinates));
        assert_eq!(map.surface().layer_count(), 0);
        assert!(matches!(map.surface().viewport(), Viewport::View { .. }));
        Ok(())
    }

    #[test]
    fn test_document_without_points() -> anyhow::Result<()> {
        let store = store_with(&[("empty.gpx", "<gpx><trk/></gpx>".to_string())])?;
        let err = GpxRenderer::new(0.1)
            .render(0, &store, Some(&library()), Some(&mut map()))
            .unwrap_err();
        assert!(matches!(err, RenderError::NoPoints));
        Ok(())
    }

    #[test]
    fn test_loading_second_entry_replaces_first() -> anyhow::Result<()> {
        let store = store_with(&[
            ("a.gpx", fixtures::track(&[("1", "1"), ("2", "2")])),
            ("b.gpx", fixtures::track(&[("5", "5"), ("6", "6")])),
        ])?;
        let mut map = map();
        let mut renderer = GpxRenderer::new(0.1);

        renderer.render(0, &store, Some(&library()), Some(&mut map))?;
        renderer.render(1, &store, Some(&library()), Some(&mut map))?;

        assert_eq!(map.surface().layer_count(), 1);
        assert_eq!(
            map.active_overlay().map(|o| o.entry_name.as_str()),
            Some("b.gpx")
        );
        Ok(())
    }

    #[test]
    fn test_waypoint_labels() -> anyhow::Result<()> {
        let store = store_with(&[(
            "camp.gpx",
            fixtures::with_waypoints(&[], &[("1", "2", Some("Camp1")), ("3", "4", None)]),
        )])?;
        let mut map = map();

        GpxRenderer::new(0.1).render(0, &store, Some(&library()), Some(&mut map))?;

        let overlay = map.active_overlay().expect("overlay shown");
        let labels = overlay
            .markers
            .iter()
            .map(|m| m.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["Camp1", DEFAULT_MARKER_LABEL]);
        // waypoints count towards the fitted bounds
        assert!(overlay.bounds.contains(&Coordinate::new(3.0, 4.0)));
        Ok(())
    }

    #[test]
    fn test_preconditions() -> anyhow::Result<()> {
        let store = store_with(&[("a.gpx", fixtures::track(&[("1", "1")]))])?;
        let mut renderer = GpxRenderer::new(0.1);

        let err = renderer
            .render(0, &store, None, Some(&mut map()))
            .unwrap_err();
        assert!(matches!(err, RenderError::LibraryNotLoaded));

        let err = renderer
            .render::<MapState>(0, &store, Some(&library()), None)
            .unwrap_err();
        assert!(matches!(err, RenderError::MapNotInitialized));

        let err = renderer
            .render(3, &store, Some(&library()), Some(&mut map()))
            .unwrap_err();
        assert!(matches!(err, RenderError::EntryNotFound(3)));
        Ok(())
    }

    #[test]
    fn test_broken_stored_text_is_reported() -> anyhow::Result<()> {
        let store = store_with(&[("a.gpx", "<gpx>".to_string())])?;
        let err = GpxRenderer::new(0.1)
            .render(0, &store, Some(&library()), Some(&mut map()))
            .unwrap_err();
        assert!(matches!(err, RenderError::Failed(GpxError::InvalidXml(_))));
        assert!(err.to_string().starts_with("Failed to load route"));
        Ok(())
    }

    #[test]
    fn test_parsed_data_is_cached_per_entry() -> anyhow::Result<()> {
        let store = store_with(&[("a.gpx", fixtures::track(&[("1", "1"), ("2", "2")]))])?;
        let id = store.get(0).unwrap().id;
        let mut renderer = GpxRenderer::new(0.1);

        renderer.render(0, &store, Some(&library()), Some(&mut map()))?;
        assert!(renderer.is_cached(&id));

        renderer.forget(&id);
        assert!(!renderer.is_cached(&id));
        Ok(())
    }
}
