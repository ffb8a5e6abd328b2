use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::{
    app::App,
    config,
    http::server::HttpServer,
    ingest::{self, IngestOutcome, UploadedFile},
    notify::voice::{ClientSpeech, LogSpeech},
};

#[derive(Parser)]
#[command(name = "gpxnav")]
#[command(version = "0.1")]
#[command(about = "GPX track viewer")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run http server hosting the map page
    Serve,
    /// Add GPX files, or every GPX file below the given directories
    Import {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List loaded GPX files
    List,
    /// Render a loaded file and print what would be drawn
    Show {
        index: usize,
        /// Print the overlay as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a loaded file
    Remove { index: usize },
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg_path = cli.config.to_string_lossy();
    let cfg = config::Config::load(&cfg_path)?;

    match &cli.command {
        Commands::Serve => {
            let app = App::from_config(&cfg, Some(Box::new(ClientSpeech::default())))?;
            let http_server = HttpServer::new(app, cfg.http, cfg.map);

            println!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }

        Commands::Import { paths } => {
            if cfg.database.in_memory {
                log::warn!("database.in_memory is set, imported files will not be kept");
            }
            let mut app = App::from_config(&cfg, None)?;

            let files = ingest::collect_gpx_paths(paths)
                .into_iter()
                .map(UploadedFile::from_path)
                .collect();

            let outcomes = app.ingest(files);
            let added = outcomes.iter().filter(|o| o.is_added()).count();
            println!("Imported {added} of {} files:", outcomes.len());
            for outcome in &outcomes {
                match outcome {
                    IngestOutcome::Added { index, name, .. } => println!("  [{index}] {name}"),
                    IngestOutcome::Rejected { name, reason } => {
                        println!("  [REJECTED] {name}: {reason}")
                    }
                }
            }
        }

        Commands::List => {
            let app = App::from_config(&cfg, None)?;
            print!("{}", app.list());
        }

        Commands::Show { index, json } => {
            let mut app = App::from_config(&cfg, Some(Box::new(LogSpeech)))?;
            let route = app.load_entry(*index)?;

            let overlay = app
                .map()
                .and_then(|m| m.active_overlay())
                .context("rendered overlay is missing from the map")?;

            if *json {
                println!("{}", serde_json::to_string_pretty(overlay)?);
            } else {
                println!("Route: {}", route.name);
                println!("  track points: {}", route.summary.track_points);
                println!("  waypoints: {}", route.summary.waypoints);
                println!("  distance: {:.2} km", route.summary.distance_m / 1000.0);
                println!(
                    "  bounds: ({:.5}, {:.5}) - ({:.5}, {:.5})",
                    overlay.bounds.south_west.lat,
                    overlay.bounds.south_west.lon,
                    overlay.bounds.north_east.lat,
                    overlay.bounds.north_east.lon
                );
                for marker in &overlay.markers {
                    println!(
                        "  marker {} at ({:.5}, {:.5})",
                        marker.label, marker.position.lat, marker.position.lon
                    );
                }
            }
        }

        Commands::Remove { index } => {
            let mut app = App::from_config(&cfg, None)?;
            match app.remove_entry(*index)? {
                Some(entry) => println!("Removed {}", entry.name),
                None => bail!("no file at index {index}"),
            }
        }
    }

    Ok(())
}
