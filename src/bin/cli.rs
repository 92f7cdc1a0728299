// src/bin/cli.rs
use paygrid_scrape::cli;

fn main() -> color_eyre::Result<()> {
    cli::run()
}
