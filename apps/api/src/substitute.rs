//! Placeholder substitution over the document model.
//!
//! Placeholders are literal `{{key}}` tokens. A token may be split across
//! run boundaries, so a paragraph is always flattened before matching;
//! paragraphs whose flattened text contains no known token are left entirely
//! untouched, which is what preserves their run-level formatting. Traversal
//! of body, tables (nested included), and header/footer regions is expressed
//! once through the [`TextBearing`] visitor rather than per-container loops.

use std::collections::BTreeMap;

use crate::docx::model::{Document, HeaderFooter, Paragraph, Run, Section, Table};

/// Request-derived mapping from placeholder key to replacement value.
///
/// A `BTreeMap` keeps application order deterministic (lexicographic); for
/// distinct literal tokens the order has no observable effect.
pub type ReplacementMap = BTreeMap<String, String>;

fn token_for(key: &str) -> String {
    format!("{{{{{key}}}}}")
}

/// True iff `text` contains the literal token `{{k}}` for at least one key
/// `k` in the map. Pure predicate; an empty map never matches.
pub fn contains_placeholder(text: &str, replacements: &ReplacementMap) -> bool {
    replacements
        .keys()
        .any(|key| text.contains(&token_for(key)))
}

/// Replaces every known token in `text` in a single left-to-right scan.
///
/// Replacement values are emitted but never re-scanned, so a value that
/// itself contains another key's token does not trigger recursive
/// substitution. If several keys could match at one position, the first key
/// in map order wins.
fn substitute_tokens(text: &str, replacements: &ReplacementMap) -> String {
    let tokens: Vec<(String, &str)> = replacements
        .iter()
        .map(|(key, value)| (token_for(key), value.as_str()))
        .collect();

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(brace) = rest.find("{{") {
        out.push_str(&rest[..brace]);
        let tail = &rest[brace..];
        match tokens
            .iter()
            .find(|(token, _)| tail.starts_with(token.as_str()))
        {
            Some((token, value)) => {
                out.push_str(value);
                rest = &tail[token.len()..];
            }
            None => {
                out.push_str("{{");
                rest = &tail[2..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Rewrites one paragraph in place.
///
/// The flattened text is matched against the map; with no match the
/// paragraph is left untouched. On a match, the substituted text is carried
/// by the first run (whose formatting becomes the paragraph's) and every
/// other run is cleared to an empty span but kept as a formatting anchor.
/// A paragraph with no runs gains one.
pub fn rewrite_paragraph(paragraph: &mut Paragraph, replacements: &ReplacementMap) {
    let flattened = paragraph.text();
    if !contains_placeholder(&flattened, replacements) {
        return;
    }
    let substituted = substitute_tokens(&flattened, replacements);
    match paragraph.runs.first_mut() {
        Some(first) => {
            first.text = substituted;
            for run in paragraph.runs.iter_mut().skip(1) {
                run.text.clear();
            }
        }
        None => paragraph.runs.push(Run::new(substituted)),
    }
    paragraph.dirty = true;
}

/// A document region containing paragraphs, directly or through nested
/// structure. `visit_paragraphs` yields every contained paragraph exactly
/// once, in document order.
pub trait TextBearing {
    fn visit_paragraphs(&mut self, visit: &mut dyn FnMut(&mut Paragraph));
}

impl TextBearing for Paragraph {
    fn visit_paragraphs(&mut self, visit: &mut dyn FnMut(&mut Paragraph)) {
        visit(self);
    }
}

/// Row-major over cells; recurses into tables nested inside a cell.
impl TextBearing for Table {
    fn visit_paragraphs(&mut self, visit: &mut dyn FnMut(&mut Paragraph)) {
        for row in &mut self.rows {
            for cell in &mut row.cells {
                for paragraph in &mut cell.paragraphs {
                    visit(paragraph);
                }
                for table in &mut cell.tables {
                    table.visit_paragraphs(visit);
                }
            }
        }
    }
}

impl TextBearing for HeaderFooter {
    fn visit_paragraphs(&mut self, visit: &mut dyn FnMut(&mut Paragraph)) {
        for paragraph in &mut self.paragraphs {
            visit(paragraph);
        }
        for table in &mut self.tables {
            table.visit_paragraphs(visit);
        }
    }
}

impl TextBearing for Section {
    fn visit_paragraphs(&mut self, visit: &mut dyn FnMut(&mut Paragraph)) {
        self.header.visit_paragraphs(visit);
        self.footer.visit_paragraphs(visit);
    }
}

/// Body paragraphs, then body tables, then every section.
impl TextBearing for Document {
    fn visit_paragraphs(&mut self, visit: &mut dyn FnMut(&mut Paragraph)) {
        for paragraph in &mut self.paragraphs {
            visit(paragraph);
        }
        for table in &mut self.tables {
            table.visit_paragraphs(visit);
        }
        for section in &mut self.sections {
            section.visit_paragraphs(visit);
        }
    }
}

/// Applies the map to every paragraph reachable from `root`.
pub fn apply_replacements(root: &mut impl TextBearing, replacements: &ReplacementMap) {
    if replacements.is_empty() {
        return;
    }
    root.visit_paragraphs(&mut |paragraph| rewrite_paragraph(paragraph, replacements));
}
