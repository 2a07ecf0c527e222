use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use log::info;

use crate::phyloxml::{from_phyloxml, write_phyloxml};
use crate::tree::{tree_parser, Tree};
use crate::Result;

/// Reads newick trees from a file, returning a vector of trees.
///
/// Trees are kept exactly as written: unrooted trees keep their multifurcating root and
/// nodes without a branch length have none.
///
/// # Arguments
/// * `path` - Path to the newick file.
///
/// # Example
/// ```
/// use to_phyloxml::io::read_newick_from_file;
/// use std::path::PathBuf;
/// let trees = read_newick_from_file(&PathBuf::from("./data/tree.newick")).unwrap();
/// # assert_eq!(trees.len(), 1);
/// # assert_eq!(trees[0].leaves().len(), 4);
/// ```
pub fn read_newick_from_file(path: &Path) -> Result<Vec<Tree>> {
    info!("Reading newick trees from file {}", path.display());
    let newick = fs::read_to_string(path)
        .with_context(|| format!("Unable to read newick file {}", path.display()))?;
    info!("Read file successfully");
    tree_parser::from_newick(&newick)
}

/// Writes the trees as a phyloxml document to the given file path, overwriting the file
/// if it already exists.
///
/// # Arguments
/// * `trees` - Trees to write, each becomes one `<phylogeny>` element.
/// * `path` - Path to the phyloxml file.
pub fn write_phyloxml_to_file(trees: &[Tree], path: &Path) -> Result<()> {
    info!("Writing phyloxml trees to file {}", path.display());
    let file = File::create(path)
        .with_context(|| format!("Unable to create phyloxml file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_phyloxml(trees, &mut writer)?;
    writer
        .flush()
        .with_context(|| format!("Unable to write phyloxml file {}", path.display()))?;
    info!("Finished writing successfully");
    Ok(())
}

/// Reads all phylogenies from a phyloxml file.
pub fn read_phyloxml_from_file(path: &Path) -> Result<Vec<Tree>> {
    info!("Reading phyloxml trees from file {}", path.display());
    let xml = fs::read_to_string(path)
        .with_context(|| format!("Unable to read phyloxml file {}", path.display()))?;
    from_phyloxml(&xml)
}

/// Converts all trees of a newick file into a phyloxml file and returns the number of
/// converted trees.
///
/// The input is parsed completely before the output is created, so a missing or
/// malformed input leaves the output path untouched. A write failure may leave a
/// partially written output behind.
///
/// # Example
/// ```
/// use std::path::Path;
/// use to_phyloxml::io::{convert_newick_to_phyloxml, read_phyloxml_from_file};
///
/// let dir = tempfile::tempdir().unwrap();
/// let output = dir.path().join("tree.xml");
/// let converted = convert_newick_to_phyloxml(Path::new("./data/tree.newick"), &output).unwrap();
/// assert_eq!(converted, 1);
/// assert_eq!(read_phyloxml_from_file(&output).unwrap().len(), 1);
/// ```
pub fn convert_newick_to_phyloxml(input: &Path, output: &Path) -> Result<usize> {
    let trees = read_newick_from_file(input)?;
    write_phyloxml_to_file(&trees, output)?;
    Ok(trees.len())
}
