mod app;
mod cli;
mod config;
mod effects;
mod persistence;
mod render;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    app::run(cli::Cli::parse())
}
