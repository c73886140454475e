//! In-memory model of the text-bearing parts of a Word document.
//!
//! Mirrors the structure WordprocessingML exposes: a document body is an
//! ordered sequence of paragraphs and tables, tables nest paragraphs (and
//! further tables) inside their cells, and every section owns one header and
//! one footer. Formatting is never interpreted — run and paragraph properties
//! are carried as the raw XML captured at load, so content the engine does
//! not touch round-trips byte-for-byte.

use std::ops::Range;

/// Smallest text span carrying uniform formatting.
#[derive(Debug, Clone, Default)]
pub struct Run {
    pub text: String,
    /// Raw `<w:rPr>` block captured at load; empty for runs created in memory.
    pub(crate) props_xml: String,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Run {
            text: text.into(),
            props_xml: String::new(),
        }
    }

    pub(crate) fn with_props(text: impl Into<String>, props_xml: impl Into<String>) -> Self {
        Run {
            text: text.into(),
            props_xml: props_xml.into(),
        }
    }

    /// The run's formatting block, verbatim as it appeared in the source part.
    pub fn formatting(&self) -> &str {
        &self.props_xml
    }
}

/// Ordered sequence of runs.
///
/// Invariant: the concatenation of all run texts, in order, equals the
/// paragraph's visible text.
#[derive(Debug, Clone)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    /// Raw `<w:pPr>` block captured at load.
    pub(crate) props_xml: String,
    /// Original `<w:p ...>` start tag, attributes included.
    pub(crate) open_tag: String,
    /// Byte range of the whole paragraph element within its source part.
    pub(crate) source: Option<Range<usize>>,
    /// Set once a rewrite actually changed this paragraph.
    pub(crate) dirty: bool,
}

impl Paragraph {
    pub fn new() -> Self {
        Paragraph {
            runs: Vec::new(),
            props_xml: String::new(),
            open_tag: "<w:p>".to_string(),
            source: None,
            dirty: false,
        }
    }

    pub fn from_runs(runs: Vec<Run>) -> Self {
        Paragraph {
            runs,
            ..Self::new()
        }
    }

    /// Flattened visible text: run texts concatenated in order.
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Whether a rewrite changed this paragraph since it was loaded.
    pub fn is_modified(&self) -> bool {
        self.dirty
    }
}

impl Default for Paragraph {
    fn default() -> Self {
        Self::new()
    }
}

/// A table cell: paragraphs plus any tables nested inside the cell.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    pub paragraphs: Vec<Paragraph>,
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Default)]
pub struct Row {
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<Row>,
}

/// Shared shape of a header or footer part: paragraphs and tables.
#[derive(Debug, Clone, Default)]
pub struct HeaderFooter {
    pub paragraphs: Vec<Paragraph>,
    pub tables: Vec<Table>,
    /// Package part this content was loaded from, e.g. `word/header1.xml`.
    /// `None` for an empty placeholder paired with an unmatched counterpart.
    pub(crate) part_name: Option<String>,
}

/// A structural grouping owning one header and one footer definition.
#[derive(Debug, Clone, Default)]
pub struct Section {
    pub header: HeaderFooter,
    pub footer: HeaderFooter,
}

/// The text-bearing content of one loaded template.
///
/// Owned exclusively by a single request: loaded from the template file,
/// mutated in place by the substitution engine, serialized once, discarded.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub paragraphs: Vec<Paragraph>,
    pub tables: Vec<Table>,
    pub sections: Vec<Section>,
}
