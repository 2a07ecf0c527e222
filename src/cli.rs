use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub(super) struct Cli {
    /// Tree file in newick format
    #[arg(value_name = "INPUT")]
    pub(super) input: PathBuf,

    /// Output file in phyloxml format, overwritten if it exists
    #[arg(value_name = "OUTPUT")]
    pub(super) output: PathBuf,
}
