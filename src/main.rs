mod app;
mod backend;
mod backup;
mod cli;
mod config;
mod consistency;
mod game;
mod library;
mod metadata;
mod scanner;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
