use log::info;
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::{
    path::{Component, Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    app::App,
    config::{HttpConfig, MapConfig},
    domain::geo::Coordinate,
    http::error::ApiError,
    ingest::{IngestOutcome, UploadedFile},
    map::{MapLibrary, MapSnapshot},
    notify::{
        Notification,
        voice::{Utterance, Voice},
    },
};

pub struct HttpServer {
    app: Arc<Mutex<App>>,
    map: MapConfig,
    pub config: HttpConfig,
}

impl HttpServer {
    pub fn new(app: App, config: HttpConfig, map: MapConfig) -> Self {
        Self {
            app: Arc::new(Mutex::new(app)),
            map,
            config,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let result = rouille::router!(request,
            (GET) (/) => {
                Ok(Response::html(include_str!("../../html/index.html")))
            },
            (GET) (/assets/{file: String}) => {
                self.handle_asset(&file)
            },
            (GET) (/api/config) => {
                self.handle_config()
            },
            (GET) (/api/entries) => {
                self.handle_list()
            },
            (POST) (/api/entries) => {
                self.handle_upload(request)
            },
            (POST) (/api/entries/{index: usize}/load) => {
                self.handle_load(index)
            },
            (DELETE) (/api/entries/{index: usize}) => {
                self.handle_remove(index)
            },
            (GET) (/api/map) => {
                self.handle_map()
            },
            (GET) (/api/message) => {
                self.handle_message()
            },
            (POST) (/api/voices) => {
                self.handle_voices(request)
            },
            _ => Ok(Response::empty_404())
        );

        let response = result.unwrap_or_else(ApiError::into_response);
        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn lock(&self) -> Result<MutexGuard<'_, App>, ApiError> {
        self.app
            .lock()
            .map_err(|e| ApiError::Internal(format!("could not access app state under lock: {e}")))
    }

    fn handle_asset(&self, file: &str) -> Result<Response, ApiError> {
        let not_found = || ApiError::NotFound(format!("asset {file} not found"));

        let dir = self.map.assets_dir.as_ref().ok_or_else(not_found)?;
        if !Self::is_plain_file_name(file) {
            return Err(ApiError::BadRequest("invalid asset name".into()));
        }

        let path = dir.join(file);
        let handle = std::fs::File::open(&path).map_err(|_| not_found())?;
        let mime = Self::mime_for_asset(&path);
        log::debug!("ASSET {} -> {}", path.to_string_lossy(), mime);

        Ok(Response::from_file(mime, handle))
    }

    fn is_plain_file_name(name: &str) -> bool {
        let mut components = Path::new(name).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    }

    fn mime_for_asset(path: &PathBuf) -> String {
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string()
    }

    fn handle_config(&self) -> Result<Response, ApiError> {
        let app = self.lock()?;
        let library = app
            .library()
            .cloned()
            .ok_or_else(|| ApiError::Unavailable("Map library not loaded. Reload the page.".into()))?;

        Ok(Response::json(&ConfigResponse {
            tile_url: self.map.tile_url.clone(),
            attribution: self.map.attribution.clone(),
            max_zoom: self.map.max_zoom,
            center: self.map.center,
            zoom: self.map.zoom,
            library,
        }))
    }

    fn handle_list(&self) -> Result<Response, ApiError> {
        let app = self.lock()?;
        Ok(Response::json(app.list()))
    }

    fn handle_upload(&self, request: &Request) -> Result<Response, ApiError> {
        let files: Vec<UploadRequest> = rouille::input::json_input(request)
            .map_err(|e| ApiError::BadRequest(format!("invalid upload: {e}")))?;

        let files = files
            .into_iter()
            .map(|f| match f.content {
                Some(content) => UploadedFile::from_text(f.name, content),
                None => UploadedFile::unreadable(
                    f.name,
                    f.error.unwrap_or_else(|| "no content received".to_string()),
                ),
            })
            .collect();

        let mut app = self.lock()?;
        let outcomes = app.ingest(files);

        Ok(Response::json(&UploadResponse {
            files: outcomes.iter().map(FileOutcome::from_domain).collect(),
            message: app.notifier.current().cloned(),
        }))
    }

    fn handle_load(&self, index: usize) -> Result<Response, ApiError> {
        let mut app = self.lock()?;
        app.load_entry(index)?;

        let utterances = app.announcer.drain();
        let map = app
            .map()
            .map(|m| m.surface().snapshot())
            .ok_or_else(|| ApiError::Unavailable("Map not initialized. Reload the page.".into()))?;

        Ok(Response::json(&LoadResponse {
            map,
            message: app.notifier.current(),
            utterances,
            fullscreen: true,
        }))
    }

    fn handle_remove(&self, index: usize) -> Result<Response, ApiError> {
        let mut app = self.lock()?;
        match app.remove_entry(index)? {
            Some(_) => Ok(Response::json(app.list())),
            None => Err(ApiError::NotFound("File not found".into())),
        }
    }

    fn handle_map(&self) -> Result<Response, ApiError> {
        let app = self.lock()?;
        let map = app
            .map()
            .ok_or_else(|| ApiError::Unavailable("Map not initialized. Reload the page.".into()))?;
        Ok(Response::json(&map.surface().snapshot()))
    }

    fn handle_message(&self) -> Result<Response, ApiError> {
        let app = self.lock()?;
        Ok(Response::json(&app.notifier.current()))
    }

    fn handle_voices(&self, request: &Request) -> Result<Response, ApiError> {
        let voices: Vec<Voice> = rouille::input::json_input(request)
            .map_err(|e| ApiError::BadRequest(format!("invalid voice list: {e}")))?;

        let mut app = self.lock()?;
        app.announcer.voices_changed(voices);
        Ok(Response::json(&app.announcer.drain()))
    }
}

#[derive(Serialize, Deserialize)]
struct UploadRequest {
    name: String,
    /// missing when the browser failed to read the file
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
enum FileOutcome {
    Added { index: usize, id: String, name: String },
    Rejected { name: String, reason: String },
}

impl FileOutcome {
    fn from_domain(outcome: &IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Added { index, id, name } => FileOutcome::Added {
                index: *index,
                id: id.to_hex(),
                name: name.clone(),
            },
            IngestOutcome::Rejected { name, reason } => FileOutcome::Rejected {
                name: name.clone(),
                reason: reason.clone(),
            },
        }
    }
}

#[derive(Serialize)]
struct UploadResponse {
    files: Vec<FileOutcome>,
    message: Option<Notification>,
}

#[derive(Serialize)]
struct LoadResponse<'a> {
    map: MapSnapshot<'a>,
    message: Option<&'a Notification>,
    utterances: Vec<Utterance>,
    fullscreen: bool,
}

#[derive(Serialize)]
struct ConfigResponse {
    tile_url: String,
    attribution: String,
    max_zoom: u8,
    center: Coordinate,
    zoom: u8,
    library: MapLibrary,
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}
