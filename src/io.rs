use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use phylotree::tree::Tree as PhyloTree;
use thiserror::Error;

use crate::tree::{Edge, NodeId};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid Newick: {0}")]
    Newick(String),

    #[error("distribution table has no header row")]
    MissingHeader,

    #[error("column '{0}' does not name a tree node")]
    UnknownLabel(String),

    #[error("column '{0}' matches more than one tree node")]
    AmbiguousLabel(String),

    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),
}

/// An edge list with one display label per node id.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTree {
    pub labels: Vec<String>,
    pub edges: Vec<Edge>,
}

impl LabeledTree {
    pub fn num_node(&self) -> usize {
        self.labels.len()
    }
}

/// Named probability vectors, each aligned to tree node ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Distributions {
    pub names: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

/// Read a whole file, transparently decompressing `.gz`.
fn read_text<P: AsRef<Path>>(path: P) -> Result<String, ReadError> {
    let p = path.as_ref();
    let wrap = |source| ReadError::Io { path: p.to_path_buf(), source };

    if p.to_string_lossy().ends_with(".gz") {
        let mut content = String::new();
        MultiGzDecoder::new(File::open(p).map_err(wrap)?)
            .read_to_string(&mut content)
            .map_err(wrap)?;
        Ok(content)
    } else {
        fs::read_to_string(p).map_err(wrap)
    }
}

/// Lines that carry data: 1-based line number and the untrimmed text,
/// skipping blanks and `#` comments. Leading tabs are significant in TSV.
fn data_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| {
            let text = line.trim();
            !text.is_empty() && !text.starts_with('#')
        })
}

pub fn read_edge_list<P: AsRef<Path>>(path: P) -> Result<LabeledTree, ReadError> {
    parse_edge_list(&read_text(path)?)
}

/// Parse whitespace separated `from to weight` lines.
///
/// A spanning tree with `k` edges has exactly `k + 1` nodes, so that is the
/// node count; labels are the ids themselves. Ids outside that range, and
/// whether the edges actually form a tree, are left to
/// [`Tree::build`](crate::Tree::build).
pub fn parse_edge_list(content: &str) -> Result<LabeledTree, ReadError> {
    let edges = data_lines(content)
        .map(|(line, text)| parse_edge(line, text))
        .collect::<Result<Vec<_>, _>>()?;

    let num_node = edges.len() + 1;

    Ok(LabeledTree {
        labels: (0..num_node).map(|id| id.to_string()).collect(),
        edges,
    })
}

fn parse_edge(line: usize, text: &str) -> Result<Edge, ReadError> {
    let bad = |message: String| ReadError::Parse { line, message };

    let fields: Vec<&str> = text.split_whitespace().collect();
    let [from, to, weight] = fields[..] else {
        return Err(bad(format!("expected 'from to weight', got {} fields", fields.len())));
    };

    let from = from.parse::<NodeId>().map_err(|e| bad(format!("node '{from}': {e}")))?;
    let to = to.parse::<NodeId>().map_err(|e| bad(format!("node '{to}': {e}")))?;
    let weight = weight.parse::<f64>().map_err(|e| bad(format!("weight '{weight}': {e}")))?;

    Ok(Edge::new(from, to, weight))
}

pub fn read_newick<P: AsRef<Path>>(path: P) -> Result<LabeledTree, ReadError> {
    parse_newick(&read_text(path)?)
}

/// Convert a Newick tree into a dense edge list.
///
/// Ids are handed out breadth-first from the Newick root, which becomes node
/// 0. Missing branch lengths count as 0.0; unnamed nodes get an empty label.
pub fn parse_newick(newick: &str) -> Result<LabeledTree, ReadError> {
    let phylo = PhyloTree::from_newick(newick.trim()).map_err(|e| ReadError::Newick(e.to_string()))?;
    let node_err = |e: phylotree::tree::TreeError| ReadError::Newick(e.to_string());

    let root = phylo.get_root().map_err(node_err)?;
    let mut labels = vec![phylo.get(&root).map_err(node_err)?.name.clone().unwrap_or_default()];
    let mut edges = Vec::new();

    // (phylotree id, dense id)
    let mut queue = VecDeque::from([(root, 0)]);
    while let Some((phylo_id, parent)) = queue.pop_front() {
        for &child_id in &phylo.get(&phylo_id).map_err(node_err)?.children {
            let child = phylo.get(&child_id).map_err(node_err)?;
            let id = labels.len();
            labels.push(child.name.clone().unwrap_or_default());
            edges.push(Edge::new(parent, id, child.parent_edge.unwrap_or(0.0)));
            queue.push_back((child_id, id));
        }
    }

    Ok(LabeledTree { labels, edges })
}

pub fn read_distributions<P: AsRef<Path>>(path: P, labels: &[String]) -> Result<Distributions, ReadError> {
    parse_distributions(&read_text(path)?, labels)
}

/// Parse a tab separated distribution table against the tree's node labels.
///
/// ```text
/// sample   A     B     D
/// s1       0.5   0.5   0
/// s2       0     0.2   0.8
/// ```
///
/// The first header cell is ignored; the others name tree nodes. Nodes not
/// named in the header get zero mass. Values are taken as-is, no
/// normalization.
pub fn parse_distributions(content: &str, labels: &[String]) -> Result<Distributions, ReadError> {
    let mut lookup: HashMap<&str, NodeId> = HashMap::new();
    let mut ambiguous: HashSet<&str> = HashSet::new();
    for (id, label) in labels.iter().enumerate().filter(|(_, l)| !l.is_empty()) {
        if lookup.insert(label.as_str(), id).is_some() {
            ambiguous.insert(label.as_str());
        }
    }

    let mut lines = data_lines(content);
    let (_, header) = lines.next().ok_or(ReadError::MissingHeader)?;

    let mut seen = HashSet::new();
    let columns = header
        .split('\t')
        .skip(1)
        .map(str::trim)
        .map(|label| {
            if ambiguous.contains(label) {
                return Err(ReadError::AmbiguousLabel(label.to_string()));
            }
            if !seen.insert(label) {
                return Err(ReadError::DuplicateColumn(label.to_string()));
            }
            lookup
                .get(label)
                .copied()
                .ok_or_else(|| ReadError::UnknownLabel(label.to_string()))
        })
        .collect::<Result<Vec<NodeId>, _>>()?;

    let mut names = Vec::new();
    let mut values = Vec::new();
    for (line, text) in lines {
        let mut cells = text.split('\t').map(str::trim);
        let name = cells.next().unwrap_or_default().to_string();
        let row = cells
            .map(|cell| {
                cell.parse::<f64>().map_err(|e| ReadError::Parse {
                    line,
                    message: format!("value '{cell}': {e}"),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if row.len() != columns.len() {
            return Err(ReadError::Parse {
                line,
                message: format!("expected {} values, got {}", columns.len(), row.len()),
            });
        }

        let mut prob = vec![0.0; labels.len()];
        for (&id, value) in columns.iter().zip(row) {
            prob[id] = value;
        }
        names.push(name);
        values.push(prob);
    }

    Ok(Distributions { names, values })
}

/// Write a labeled square matrix as TSV to a file or stdout.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// If `path` equals `-`, the matrix is written to stdout (uncompressed).
pub fn write_matrix_tsv<P: AsRef<Path>, T: std::fmt::Display>(
    path: P,
    names: &[String],
    mat: &[Vec<T>],
) -> io::Result<()> {
    let p = path.as_ref();

    if p.as_os_str() == "-" {
        let mut out = BufWriter::new(io::stdout().lock());
        write_matrix_rows(&mut out, names, mat)?;
        return out.flush();
    }

    if p.to_string_lossy().ends_with(".gz") {
        let mut out = BufWriter::new(GzEncoder::new(File::create(p)?, Compression::default()));
        write_matrix_rows(&mut out, names, mat)?;
        // the gzip trailer is only written by finish()
        out.into_inner().map_err(|e| e.into_error())?.finish()?;
        return Ok(());
    }

    let mut out = BufWriter::new(File::create(p)?);
    write_matrix_rows(&mut out, names, mat)?;
    out.flush()
}

fn write_matrix_rows<W: Write, T: std::fmt::Display>(
    out: &mut W,
    names: &[String],
    mat: &[Vec<T>],
) -> io::Result<()> {
    writeln!(out, "\t{}", names.join("\t"))?;
    for (name, row) in names.iter().zip(mat) {
        write!(out, "{name}")?;
        for val in row {
            write!(out, "\t{val}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
