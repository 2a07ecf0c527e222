use anyhow::{anyhow, Error};
use clap::Parser;
use ftail::Ftail;
use log::{info, LevelFilter};

use to_phyloxml::io::convert_newick_to_phyloxml;

mod cli;
use crate::cli::Cli;

type Result<T> = std::result::Result<T, Error>;

fn main() -> Result<()> {
    Ftail::new()
        .console(LevelFilter::Info)
        .init()
        .map_err(|error| anyhow!("Unable to set up logging: {}", error))?;

    let cli = Cli::parse();
    info!("Successfully parsed the command line parameters");

    info!(
        "Converting newick trees from {} to phyloxml in {}.",
        cli.input.display(),
        cli.output.display()
    );
    let converted = convert_newick_to_phyloxml(&cli.input, &cli.output)?;
    info!("Converted {} trees.", converted);

    Ok(())
}
