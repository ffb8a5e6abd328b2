use crate::cli::run;

mod app;
pub mod cli;
mod config;
pub mod domain;
mod gpx;
pub mod http;
mod ingest;
mod map;
mod notify;
mod render;
pub mod storage;

fn main() -> anyhow::Result<()> {
    run()
}
