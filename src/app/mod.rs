//! Application state and the user actions that operate on it

use anyhow::Context;

use crate::{
    config::{Config, MapConfig},
    domain::entry::GpxEntry,
    ingest::{self, IngestOutcome, UploadedFile},
    map::{MapError, MapLibrary, MapState, MapSurface, MapView},
    notify::{
        Notifier,
        voice::{Announcer, SpeechBackend},
    },
    render::{GpxRenderer, RenderError, RenderedRoute},
    storage::{error::StoreError, track_store::TrackStore},
};

pub mod list;

use list::ListView;

/// Everything the user actions touch: the stored files, the map and the
/// message sinks.
pub struct App<M: MapSurface = MapState> {
    store: TrackStore,
    list: ListView,
    library: Option<MapLibrary>,
    map: Option<MapView<M>>,
    renderer: GpxRenderer,
    pub notifier: Notifier,
    pub announcer: Announcer,
    route_loaded_phrase: String,
}

impl<M: MapSurface> App<M> {
    pub fn new(
        store: TrackStore,
        notifier: Notifier,
        announcer: Announcer,
        fit_padding: f64,
        route_loaded_phrase: impl Into<String>,
    ) -> Self {
        let list = ListView::build(&store);
        Self {
            store,
            list,
            library: None,
            map: None,
            renderer: GpxRenderer::new(fit_padding),
            notifier,
            announcer,
            route_loaded_phrase: route_loaded_phrase.into(),
        }
    }

    /// Locates the map library and sets up the map.
    ///
    /// Without a library there is no map, and the app cannot work.
    pub fn initialize(&mut self, config: &MapConfig, surface: M) -> Result<(), MapError> {
        match MapLibrary::locate(config) {
            Ok(library) => {
                self.library = Some(library);
                self.map = Some(MapView::new(surface));
                log::info!("map initialized");
                self.notifier.success("App loaded");
                Ok(())
            }
            Err(e) => {
                self.notifier
                    .error(format!("Failed to initialize: {e}. Try reloading the page."));
                Err(e)
            }
        }
    }

    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    pub fn list(&self) -> &ListView {
        &self.list
    }

    pub fn library(&self) -> Option<&MapLibrary> {
        self.library.as_ref()
    }

    pub fn map(&self) -> Option<&MapView<M>> {
        self.map.as_ref()
    }

    fn refresh_list(&mut self) {
        self.list = ListView::build(&self.store);
    }

    /// Validates and stores the selected files; one outcome per file
    pub fn ingest(&mut self, files: Vec<UploadedFile>) -> Vec<IngestOutcome> {
        let outcomes = ingest::ingest(files, &mut self.store, &mut self.notifier);
        if outcomes.iter().any(IngestOutcome::is_added) {
            self.refresh_list();
        }
        outcomes
    }

    /// Draws entry `index`, replacing whatever was on the map.
    ///
    /// Failures are reported through the notifier and returned.
    pub fn load_entry(&mut self, index: usize) -> Result<RenderedRoute, RenderError> {
        let result = self.renderer.render(
            index,
            &self.store,
            self.library.as_ref(),
            self.map.as_mut(),
        );

        match &result {
            Ok(route) => {
                self.notifier
                    .success(format!("Route loaded successfully: {}", route.name));
                self.announcer.speak(&self.route_loaded_phrase);
                if let Some(map) = self.map.as_mut() {
                    map.request_fullscreen();
                }
            }
            Err(e) => self.notifier.error(e.to_string()),
        }
        result
    }

    /// Removes entry `index` if it exists.
    ///
    /// Any removal clears the map, whichever entry was being shown.
    pub fn remove_entry(&mut self, index: usize) -> Result<Option<GpxEntry>, StoreError> {
        let removed = match self.store.remove(index) {
            Ok(Some(entry)) => entry,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.notifier.error(format!("Could not remove file: {e}"));
                return Err(e);
            }
        };

        self.renderer.forget(&removed.id);
        self.refresh_list();
        self.notifier.success("File removed");

        if let Some(map) = self.map.as_mut() {
            map.clear_active();
        }
        Ok(Some(removed))
    }
}

impl App<MapState> {
    /// Builds the app described by `config`, with its map ready.
    pub fn from_config(
        config: &Config,
        speech: Option<Box<dyn SpeechBackend>>,
    ) -> anyhow::Result<Self> {
        let store = TrackStore::open(&config.database).context("Failed to open track store")?;
        let speech = if config.speech.enabled { speech } else { None };

        let mut app = App::new(
            store,
            Notifier::new(config.notify.ttl()),
            Announcer::new(config.speech.lang.clone(), speech),
            config.map.fit_padding,
            config.speech.route_loaded.clone(),
        );
        app.initialize(&config.map, MapState::new(&config.map))
            .context("Failed to initialize map")?;
        Ok(app)
    }
}
