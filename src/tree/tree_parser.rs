use std::error::Error;
use std::fmt;
use std::result::Result as stdResult;

use anyhow::bail;
use log::{debug, info, warn};
use pest::{
    error::{Error as PestError, ErrorVariant},
    iterators::Pair,
    Parser, Span,
};
use pest_derive::Parser;

use crate::tree::Tree;
use crate::Result;

#[derive(Parser)]
#[grammar = "./tree/newick.pest"]
pub struct NewickParser;

/// Raised when the input does not follow the Newick grammar.
#[derive(Debug)]
pub struct ParsingError(pub Box<PestError<Rule>>);

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Malformed newick string")?;
        write!(f, "{}", self.0)
    }
}

impl Error for ParsingError {}

/// Raised when a tree is nested deeper than the parser has stack for. The input may
/// well be valid Newick.
#[derive(Debug)]
pub struct NestingLimitError(pub Box<PestError<Rule>>);

impl fmt::Display for NestingLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Newick tree is nested too deeply to parse")?;
        write!(f, "{}", self.0)
    }
}

impl Error for NestingLimitError {}

type ParseResult<T> = stdResult<T, Box<PestError<Rule>>>;

/// Parses all trees from a string in Newick format.
///
/// Every tree is a statement terminated by a semicolon, an input without statements
/// gives no trees. Internal node labels that are numbers are read as support values,
/// quoted labels are always names. Multifurcations are kept as they are.
///
/// # Example
/// ```
/// use to_phyloxml::tree::tree_parser::from_newick;
///
/// let trees = from_newick("(A:0.1,B:0.2)C;\n(,,(,));").unwrap();
/// assert_eq!(trees.len(), 2);
/// assert_eq!(trees[0].node(&trees[0].root).id, "C");
/// assert_eq!(trees[1].leaves().len(), 4);
/// ```
pub fn from_newick(newick: &str) -> Result<Vec<Tree>> {
    info!("Parsing newick trees.");
    let newick_rule = match NewickParser::parse(Rule::newick, newick) {
        Ok(mut pairs) => pairs.next(),
        Err(error) if is_resource_limit(&error) => bail!(NestingLimitError(Box::new(error))),
        Err(error) => bail!(ParsingError(Box::new(error))),
    };

    let mut trees = Vec::new();
    for tree_rule in newick_rule
        .into_iter()
        .flat_map(|rule| rule.into_inner())
        .filter(|rule| rule.as_rule() == Rule::tree)
    {
        match Tree::from_tree_rule(tree_rule) {
            Ok(tree) => {
                debug!("Parsed tree {}: {} nodes.", trees.len(), tree.len());
                trees.push(tree);
            }
            Err(error) => bail!(ParsingError(error)),
        }
    }
    info!("Finished parsing {} newick trees successfully.", trees.len());
    Ok(trees)
}

// pest gives up with a custom error once its call or stack guard trips.
fn is_resource_limit(error: &PestError<Rule>) -> bool {
    matches!(
        &error.variant,
        ErrorVariant::CustomError { message } if message.ends_with("limit reached")
    )
}

/// Reads a label as a support value if it is a plain finite decimal number.
pub(crate) fn parse_support(label: &str) -> Option<f64> {
    if label.is_empty()
        || !label
            .bytes()
            .all(|b| b.is_ascii_digit() || b"+-.eE".contains(&b))
    {
        return None;
    }
    label.parse::<f64>().ok().filter(|value| value.is_finite())
}

// The XML 1.0 `Char` production, anything else cannot appear in a document.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

fn custom_error(message: String, span: Span) -> Box<PestError<Rule>> {
    Box::new(PestError::new_from_span(
        ErrorVariant::CustomError { message },
        span,
    ))
}

enum Label {
    Plain(String),
    Quoted(String),
}

impl Tree {
    fn from_tree_rule(tree_rule: Pair<Rule>) -> ParseResult<Tree> {
        let mut tree = Tree::new_empty();
        for rule in tree_rule.into_inner() {
            match rule.as_rule() {
                Rule::rooting => tree.rooted = Some(Tree::parse_rooting_rule(rule)),
                Rule::clade => tree.parse_clade_rule(rule)?,
                _ => unreachable!(),
            }
        }
        tree.complete();
        Ok(tree)
    }

    fn parse_rooting_rule(rule: Pair<Rule>) -> bool {
        rule.into_inner()
            .next()
            .is_some_and(|marker| marker.as_rule() == Rule::rooted)
    }

    /// Pushes the clade and all its descendants in preorder. Walks with an explicit
    /// stack, so nesting depth is bounded by the grammar rather than by this walk.
    fn parse_clade_rule(&mut self, clade_rule: Pair<Rule>) -> ParseResult<()> {
        let mut stack = vec![(None, clade_rule)];
        while let Some((parent, clade_rule)) = stack.pop() {
            let mut child_rules = Vec::new();
            let mut label = None;
            let mut blen = None;
            for rule in clade_rule.into_inner() {
                match rule.as_rule() {
                    Rule::children => child_rules.extend(rule.into_inner()),
                    Rule::label => label = Some(Tree::parse_label_rule(rule)?),
                    Rule::branch_length => blen = Some(Tree::parse_branch_length_rule(rule)?),
                    _ => unreachable!(),
                }
            }

            let leaf = child_rules.is_empty();
            let node_idx = self.push_node(leaf, parent);
            if parent.is_none() {
                self.root = node_idx;
            }
            match label {
                Some(Label::Plain(label)) if !leaf => match parse_support(&label) {
                    Some(support) => self.node_mut(&node_idx).support = Some(support),
                    None => self.node_mut(&node_idx).id = label,
                },
                Some(Label::Plain(label)) | Some(Label::Quoted(label)) => {
                    self.node_mut(&node_idx).id = label
                }
                None => {}
            }
            if let Some(blen) = blen {
                if blen < 0.0 {
                    warn!("Found negative branch length {} on {}.", blen, node_idx);
                }
                self.node_mut(&node_idx).blen = Some(blen);
            }
            stack.extend(
                child_rules
                    .into_iter()
                    .rev()
                    .map(|child_rule| (Some(node_idx), child_rule)),
            );
        }
        Ok(())
    }

    fn parse_branch_length_rule(rule: Pair<Rule>) -> ParseResult<f64> {
        let span = rule.as_span();
        let number = rule.into_inner().next().map(|n| n.as_str()).unwrap_or("");
        match number.parse::<f64>() {
            Ok(blen) if blen.is_finite() => Ok(blen),
            Ok(_) => Err(custom_error(
                format!("branch length {} is out of range", number),
                span,
            )),
            Err(error) => Err(custom_error(
                format!("invalid branch length {}: {}", number, error),
                span,
            )),
        }
    }

    fn parse_label_rule(rule: Pair<Rule>) -> ParseResult<Label> {
        let span = rule.as_span();
        let label = match rule.into_inner().next() {
            Some(inner) if inner.as_rule() == Rule::quoted_label => {
                let quoted = inner.as_str();
                Label::Quoted(quoted[1..quoted.len() - 1].replace("''", "'"))
            }
            Some(inner) => Label::Plain(inner.as_str().to_string()),
            None => Label::Plain(String::new()),
        };
        let (Label::Plain(text) | Label::Quoted(text)) = &label;
        match text.chars().find(|c| !is_xml_char(*c)) {
            Some(c) => Err(custom_error(
                format!("label contains control character U+{:04X}", u32::from(c)),
                span,
            )),
            None => Ok(label),
        }
    }
}
