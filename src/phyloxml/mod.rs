//! PhyloXML serialisation of [Tree]s.
//!
//! Writing produces one `<phylogeny>` element per tree, with nested `<clade>` elements
//! mirroring the topology. Names, branch lengths and support values become `<name>`,
//! `<branch_length>` and `<confidence>` elements, absent values produce no element.
//! Reading accepts any schema-conformant document and ignores elements the tree
//! model has no place for.
use std::error::Error;
use std::fmt;
use std::io::Write;

use anyhow::bail;
use log::{debug, info};
use roxmltree::Document;

use crate::tree::{NodeIdx, Tree};
use crate::Result;

pub const PHYLOXML_NAMESPACE: &str = "http://www.phyloxml.org";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://www.phyloxml.org http://www.phyloxml.org/1.10/phyloxml.xsd";
const INDENT: &str = "  ";
const SUPPORT_TYPE: &str = "unknown";

pub struct PhyloXmlError {
    pub message: String,
}

impl fmt::Debug for PhyloXmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for PhyloXmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Malformed phyloxml document: {}", self.message)
    }
}

impl Error for PhyloXmlError {}

/// Writes the trees as a single PhyloXML document to the given writer.
pub fn write_phyloxml<W: Write>(trees: &[Tree], writer: &mut W) -> Result<()> {
    info!("Writing {} trees as phyloxml.", trees.len());
    writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        writer,
        r#"<phyloxml xmlns:xsi="{}" xsi:schemaLocation="{}" xmlns="{}">"#,
        XSI_NAMESPACE, SCHEMA_LOCATION, PHYLOXML_NAMESPACE
    )?;
    for tree in trees {
        writeln!(
            writer,
            r#"{}<phylogeny rooted="{}">"#,
            INDENT,
            tree.rooted.unwrap_or(false)
        )?;
        write_clades(tree, writer)?;
        writeln!(writer, "{}</phylogeny>", INDENT)?;
    }
    writeln!(writer, "</phyloxml>")?;
    Ok(())
}

// Clades are opened in preorder. Before a clade opens, every open clade that is
// not its parent gets closed.
fn write_clades<W: Write>(tree: &Tree, writer: &mut W) -> Result<()> {
    let mut open = Vec::<NodeIdx>::new();
    for node_idx in &tree.preorder {
        let node = tree.node(node_idx);
        while open.last().is_some_and(|top| Some(*top) != node.parent) {
            open.pop();
            close_clade(open.len(), writer)?;
        }
        let indent = INDENT.repeat(open.len() + 2);
        writeln!(writer, "{}<clade>", indent)?;
        if !node.id.is_empty() {
            writeln!(
                writer,
                "{}{}<name>{}</name>",
                indent,
                INDENT,
                escape_xml(&node.id)
            )?;
        }
        if let Some(blen) = node.blen {
            writeln!(
                writer,
                "{}{}<branch_length>{}</branch_length>",
                indent, INDENT, blen
            )?;
        }
        if let Some(support) = node.support {
            writeln!(
                writer,
                r#"{}{}<confidence type="{}">{}</confidence>"#,
                indent, INDENT, SUPPORT_TYPE, support
            )?;
        }
        open.push(*node_idx);
    }
    while open.pop().is_some() {
        close_clade(open.len(), writer)?;
    }
    Ok(())
}

fn close_clade<W: Write>(depth: usize, writer: &mut W) -> Result<()> {
    writeln!(writer, "{}</clade>", INDENT.repeat(depth + 2))?;
    Ok(())
}

/// Serialises the trees into a PhyloXML document.
///
/// # Example
/// ```
/// use to_phyloxml::phyloxml::to_phyloxml;
/// use to_phyloxml::tree::tree_parser::from_newick;
///
/// let trees = from_newick("(A:0.1,B:0.2)C;").unwrap();
/// let xml = to_phyloxml(&trees).unwrap();
/// assert!(xml.contains("<name>A</name>"));
/// assert!(xml.contains("<branch_length>0.2</branch_length>"));
/// ```
pub fn to_phyloxml(trees: &[Tree]) -> Result<String> {
    let mut buffer = Vec::new();
    write_phyloxml(trees, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // A literal carriage return would be normalised to a line feed on reading.
            '\r' => escaped.push_str("&#13;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Parses all phylogenies of a PhyloXML document.
///
/// Element names are matched regardless of namespace prefix. Branch lengths are read
/// from `<branch_length>` elements or the `branch_length` attribute of `<clade>`, the
/// first `<confidence>` of a clade becomes its support value.
pub fn from_phyloxml(xml: &str) -> Result<Vec<Tree>> {
    info!("Parsing phyloxml trees.");
    let document = match Document::parse(xml) {
        Ok(document) => document,
        Err(error) => bail!(PhyloXmlError {
            message: error.to_string()
        }),
    };
    let root = document.root_element();
    if root.tag_name().name() != "phyloxml" {
        bail!(PhyloXmlError {
            message: format!(
                "expected root element phyloxml, found {}",
                root.tag_name().name()
            )
        });
    }

    let mut trees = Vec::new();
    for phylogeny in root.children().filter(|n| is_element(n, "phylogeny")) {
        let tree = read_phylogeny(phylogeny)?;
        debug!("Read phylogeny {}: {} nodes.", trees.len(), tree.len());
        trees.push(tree);
    }
    info!("Finished parsing {} phyloxml trees successfully.", trees.len());
    Ok(trees)
}

fn is_element(node: &roxmltree::Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn read_phylogeny(phylogeny: roxmltree::Node) -> Result<Tree> {
    let mut tree = Tree::new_empty();
    tree.rooted = match phylogeny.attribute("rooted") {
        Some("true") | Some("1") => Some(true),
        Some("false") | Some("0") => Some(false),
        Some(other) => bail!(PhyloXmlError {
            message: format!("invalid rooted attribute {}", other)
        }),
        None => None,
    };
    let Some(root_clade) = phylogeny.children().find(|n| is_element(n, "clade")) else {
        bail!(PhyloXmlError {
            message: String::from("phylogeny without a root clade")
        });
    };
    read_clades(&mut tree, root_clade)?;
    tree.complete();
    Ok(tree)
}

// Nodes are pushed in preorder from an explicit stack of (parent, clade) pairs.
fn read_clades(tree: &mut Tree, root_clade: roxmltree::Node) -> Result<()> {
    let mut stack = vec![(None, root_clade)];
    while let Some((parent, clade)) = stack.pop() {
        let child_clades: Vec<_> = clade
            .children()
            .filter(|n| is_element(n, "clade"))
            .collect();
        let node_idx = tree.push_node(child_clades.is_empty(), parent);
        if parent.is_none() {
            tree.root = node_idx;
        }

        if let Some(blen) = clade.attribute("branch_length") {
            tree.node_mut(&node_idx).blen = Some(parse_number(blen, "branch_length")?);
        }
        for element in clade.children().filter(|n| n.is_element()) {
            let text = element.text().unwrap_or_default();
            let node = tree.node_mut(&node_idx);
            match element.tag_name().name() {
                "name" => node.id = text.to_string(),
                "branch_length" => node.blen = Some(parse_number(text, "branch_length")?),
                "confidence" if node.support.is_none() => {
                    node.support = Some(parse_number(text, "confidence")?)
                }
                _ => {}
            }
        }

        stack.extend(
            child_clades
                .into_iter()
                .rev()
                .map(|child| (Some(node_idx), child)),
        );
    }
    Ok(())
}

fn parse_number(text: &str, element: &str) -> Result<f64> {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => bail!(PhyloXmlError {
            message: format!("invalid {} value '{}'", element, text)
        }),
    }
}
