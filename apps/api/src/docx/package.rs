//! Codec between `.docx` bytes and the document model.
//!
//! A `.docx` file is an OPC zip package. Loading reads every entry, parses
//! `word/document.xml` plus all `word/header*.xml` / `word/footer*.xml`
//! parts, and records each paragraph's byte range within its part. Saving
//! splices regenerated XML over the ranges of paragraphs the engine rewrote
//! and copies everything else — untouched paragraphs, untouched parts,
//! non-XML entries — verbatim, so a template with no matching placeholders
//! serializes back bit-identical.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::ops::Range;

use roxmltree::Node;
use thiserror::Error;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::docx::model::{
    Cell, Document, HeaderFooter, Paragraph, Row, Run, Section, Table,
};

/// WordprocessingML main namespace.
const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("template is not a valid docx archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("i/o failure in template package: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing required part {0}")]
    MissingPart(String),

    #[error("part {0} is not valid UTF-8")]
    Encoding(String),

    #[error("part {part}: malformed XML: {source}")]
    Xml {
        part: String,
        #[source]
        source: roxmltree::Error,
    },

    #[error("part {part}: {message}")]
    Malformed { part: String, message: String },
}

#[derive(Debug)]
struct RawEntry {
    name: String,
    bytes: Vec<u8>,
}

/// One loaded template: the raw package entries plus the parsed model.
#[derive(Debug)]
pub struct TemplateDoc {
    entries: Vec<RawEntry>,
    /// Original XML of every parsed part, keyed by part name. Paragraph
    /// source ranges index into these strings.
    part_xml: HashMap<String, String>,
    pub document: Document,
}

impl TemplateDoc {
    /// Parses template bytes into the document model.
    pub fn load(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let name = file.name().to_string();
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            entries.push(RawEntry { name, bytes: buf });
        }

        let mut part_xml = HashMap::new();

        let document_entry = entries
            .iter()
            .find(|entry| entry.name == DOCUMENT_PART)
            .ok_or_else(|| DocxError::MissingPart(DOCUMENT_PART.to_string()))?;
        let xml = part_utf8(document_entry)?;
        let (paragraphs, tables) = parse_part(&xml, DOCUMENT_PART)?;
        part_xml.insert(DOCUMENT_PART.to_string(), xml);

        let mut headers = Vec::new();
        for entry in part_entries(&entries, "word/header") {
            let xml = part_utf8(entry)?;
            let (paragraphs, tables) = parse_part(&xml, &entry.name)?;
            headers.push(HeaderFooter {
                paragraphs,
                tables,
                part_name: Some(entry.name.clone()),
            });
            part_xml.insert(entry.name.clone(), xml);
        }

        let mut footers = Vec::new();
        for entry in part_entries(&entries, "word/footer") {
            let xml = part_utf8(entry)?;
            let (paragraphs, tables) = parse_part(&xml, &entry.name)?;
            footers.push(HeaderFooter {
                paragraphs,
                tables,
                part_name: Some(entry.name.clone()),
            });
            part_xml.insert(entry.name.clone(), xml);
        }

        // Pair header/footer parts in name order. An unmatched part gets an
        // empty counterpart so every section owns both.
        let section_count = headers.len().max(footers.len());
        let mut header_iter = headers.into_iter();
        let mut footer_iter = footers.into_iter();
        let mut sections = Vec::with_capacity(section_count);
        for _ in 0..section_count {
            sections.push(Section {
                header: header_iter.next().unwrap_or_default(),
                footer: footer_iter.next().unwrap_or_default(),
            });
        }

        Ok(TemplateDoc {
            entries,
            part_xml,
            document: Document {
                paragraphs,
                tables,
                sections,
            },
        })
    }

    /// Serializes the package back to bytes, splicing in every paragraph the
    /// engine rewrote. Produces either the complete document or an error,
    /// never a partial file.
    pub fn save(&self) -> Result<Vec<u8>, DocxError> {
        let mut edits: HashMap<String, Vec<(Range<usize>, String)>> = HashMap::new();
        collect_edits(
            DOCUMENT_PART,
            &self.document.paragraphs,
            &self.document.tables,
            &mut edits,
        );
        for section in &self.document.sections {
            for part in [&section.header, &section.footer] {
                if let Some(name) = &part.part_name {
                    collect_edits(name, &part.paragraphs, &part.tables, &mut edits);
                }
            }
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for entry in &self.entries {
            writer.start_file(entry.name.clone(), options)?;
            match (edits.get_mut(&entry.name), self.part_xml.get(&entry.name)) {
                (Some(part_edits), Some(xml)) if !part_edits.is_empty() => {
                    let spliced = splice(xml, part_edits);
                    writer.write_all(spliced.as_bytes())?;
                }
                _ => writer.write_all(&entry.bytes)?,
            }
        }
        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}

fn part_utf8(entry: &RawEntry) -> Result<String, DocxError> {
    String::from_utf8(entry.bytes.clone()).map_err(|_| DocxError::Encoding(entry.name.clone()))
}

fn part_entries<'a>(entries: &'a [RawEntry], prefix: &str) -> Vec<&'a RawEntry> {
    let mut parts: Vec<&RawEntry> = entries
        .iter()
        .filter(|entry| entry.name.starts_with(prefix) && entry.name.ends_with(".xml"))
        .collect();
    parts.sort_by(|a, b| a.name.cmp(&b.name));
    parts
}

/// Parses one WordprocessingML part into paragraphs and tables. The body
/// container is `w:body` for the main document part and the root element
/// itself for header/footer parts.
fn parse_part(xml: &str, part: &str) -> Result<(Vec<Paragraph>, Vec<Table>), DocxError> {
    let doc = roxmltree::Document::parse(xml).map_err(|source| DocxError::Xml {
        part: part.to_string(),
        source,
    })?;
    let root = doc.root_element();
    let container = if root.has_tag_name((W_NS, "document")) {
        root.children()
            .find(|node| node.has_tag_name((W_NS, "body")))
            .ok_or_else(|| DocxError::Malformed {
                part: part.to_string(),
                message: "document has no body element".to_string(),
            })?
    } else {
        root
    };
    Ok(parse_container(container, xml))
}

fn parse_container(node: Node<'_, '_>, xml: &str) -> (Vec<Paragraph>, Vec<Table>) {
    let mut paragraphs = Vec::new();
    let mut tables = Vec::new();
    for child in node.children() {
        if child.has_tag_name((W_NS, "p")) {
            paragraphs.push(parse_paragraph(child, xml));
        } else if child.has_tag_name((W_NS, "tbl")) {
            tables.push(parse_table(child, xml));
        }
    }
    (paragraphs, tables)
}

fn parse_paragraph(node: Node<'_, '_>, xml: &str) -> Paragraph {
    let range = node.range();
    let open_tag = xml[range.clone()]
        .find('>')
        .map(|end| xml[range.start..range.start + end + 1].to_string())
        .unwrap_or_else(|| "<w:p>".to_string());
    let props_xml = node
        .children()
        .find(|child| child.has_tag_name((W_NS, "pPr")))
        .map(|props| xml[props.range()].to_string())
        .unwrap_or_default();
    // Only direct w:r children count as paragraph runs; runs nested inside
    // w:hyperlink (or field wrappers) are not substitution targets.
    let runs = node
        .children()
        .filter(|child| child.has_tag_name((W_NS, "r")))
        .map(|run| parse_run(run, xml))
        .collect();
    Paragraph {
        runs,
        props_xml,
        open_tag,
        source: Some(range),
        dirty: false,
    }
}

fn parse_run(node: Node<'_, '_>, xml: &str) -> Run {
    let props_xml = node
        .children()
        .find(|child| child.has_tag_name((W_NS, "rPr")))
        .map(|props| xml[props.range()].to_string())
        .unwrap_or_default();
    let text: String = node
        .children()
        .filter(|child| child.has_tag_name((W_NS, "t")))
        .filter_map(|t| t.text())
        .collect();
    Run::with_props(text, props_xml)
}

fn parse_table(node: Node<'_, '_>, xml: &str) -> Table {
    let rows = node
        .children()
        .filter(|child| child.has_tag_name((W_NS, "tr")))
        .map(|row| Row {
            cells: row
                .children()
                .filter(|child| child.has_tag_name((W_NS, "tc")))
                .map(|cell| {
                    let (paragraphs, tables) = parse_container(cell, xml);
                    Cell { paragraphs, tables }
                })
                .collect(),
        })
        .collect();
    Table { rows }
}

fn collect_edits(
    part: &str,
    paragraphs: &[Paragraph],
    tables: &[Table],
    edits: &mut HashMap<String, Vec<(Range<usize>, String)>>,
) {
    for paragraph in paragraphs {
        if paragraph.dirty {
            if let Some(range) = paragraph.source.clone() {
                edits
                    .entry(part.to_string())
                    .or_default()
                    .push((range, paragraph_xml(paragraph)));
            }
        }
    }
    for table in tables {
        for row in &table.rows {
            for cell in &row.cells {
                collect_edits(part, &cell.paragraphs, &cell.tables, edits);
            }
        }
    }
}

/// Regenerates the XML of a rewritten paragraph: the original start tag and
/// `pPr` block, then each run with its original `rPr` and the current text.
fn paragraph_xml(paragraph: &Paragraph) -> String {
    let mut out = String::new();
    match paragraph.open_tag.strip_suffix("/>") {
        Some(stripped) => {
            out.push_str(stripped);
            out.push('>');
        }
        None => out.push_str(&paragraph.open_tag),
    }
    out.push_str(&paragraph.props_xml);
    for run in &paragraph.runs {
        out.push_str("<w:r>");
        out.push_str(&run.props_xml);
        out.push_str("<w:t xml:space=\"preserve\">");
        out.push_str(&escape_text(&run.text));
        out.push_str("</w:t></w:r>");
    }
    out.push_str("</w:p>");
    out
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Applies range replacements back-to-front so earlier ranges stay valid.
fn splice(xml: &str, edits: &mut [(Range<usize>, String)]) -> String {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut out = xml.to_string();
    for (range, replacement) in edits.iter() {
        out.replace_range(range.clone(), replacement);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

    fn document_part(body: &str) -> String {
        format!(
            r#"{XML_DECL}<w:document xmlns:w="{W_NS}"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn header_part(content: &str) -> String {
        format!(r#"{XML_DECL}<w:hdr xmlns:w="{W_NS}">{content}</w:hdr>"#)
    }

    fn footer_part(content: &str) -> String {
        format!(r#"{XML_DECL}<w:ftr xmlns:w="{W_NS}">{content}</w:ftr>"#)
    }

    fn build_docx(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        for (name, content) in parts {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_load_parses_body_paragraphs_and_runs() {
        let body = concat!(
            r#"<w:p w:rsidR="00AB12"><w:pPr><w:jc w:val="center"/></w:pPr>"#,
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t>Dear </w:t></w:r>"#,
            r#"<w:r><w:t>{{name}}</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>Regards</w:t></w:r></w:p>"#,
        );
        let bytes = build_docx(&[("word/document.xml", &document_part(body))]);

        let template = TemplateDoc::load(&bytes).unwrap();
        let doc = &template.document;
        assert_eq!(doc.paragraphs.len(), 2);
        assert_eq!(doc.paragraphs[0].runs.len(), 2);
        assert_eq!(doc.paragraphs[0].text(), "Dear {{name}}");
        assert_eq!(
            doc.paragraphs[0].runs[0].formatting(),
            "<w:rPr><w:b/></w:rPr>"
        );
        assert_eq!(doc.paragraphs[1].text(), "Regards");
    }

    #[test]
    fn test_load_parses_tables_with_nested_table() {
        let body = concat!(
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>outer</w:t></w:r></w:p>"#,
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            r#"</w:tc></w:tr></w:tbl>"#,
        );
        let bytes = build_docx(&[("word/document.xml", &document_part(body))]);

        let template = TemplateDoc::load(&bytes).unwrap();
        let table = &template.document.tables[0];
        let cell = &table.rows[0].cells[0];
        assert_eq!(cell.paragraphs[0].text(), "outer");
        assert_eq!(
            cell.tables[0].rows[0].cells[0].paragraphs[0].text(),
            "inner"
        );
    }

    #[test]
    fn test_load_pairs_header_and_footer_into_sections() {
        let bytes = build_docx(&[
            ("word/document.xml", &document_part("")),
            (
                "word/header1.xml",
                &header_part(r#"<w:p><w:r><w:t>{{company}} Confidential</w:t></w:r></w:p>"#),
            ),
            (
                "word/footer1.xml",
                &footer_part(r#"<w:p><w:r><w:t>page</w:t></w:r></w:p>"#),
            ),
        ]);

        let template = TemplateDoc::load(&bytes).unwrap();
        let sections = &template.document.sections;
        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections[0].header.paragraphs[0].text(),
            "{{company}} Confidential"
        );
        assert_eq!(sections[0].footer.paragraphs[0].text(), "page");
    }

    #[test]
    fn test_unmatched_header_gets_empty_footer() {
        let bytes = build_docx(&[
            ("word/document.xml", &document_part("")),
            (
                "word/header1.xml",
                &header_part(r#"<w:p><w:r><w:t>h</w:t></w:r></w:p>"#),
            ),
        ]);

        let template = TemplateDoc::load(&bytes).unwrap();
        assert_eq!(template.document.sections.len(), 1);
        assert!(template.document.sections[0].footer.paragraphs.is_empty());
    }

    #[test]
    fn test_load_rejects_package_without_document_part() {
        let bytes = build_docx(&[("word/styles.xml", "<w:styles/>")]);
        let err = TemplateDoc::load(&bytes).unwrap_err();
        assert!(matches!(err, DocxError::MissingPart(part) if part == "word/document.xml"));
    }

    #[test]
    fn test_save_splices_rewritten_paragraph() {
        let body = r#"<w:p><w:r><w:rPr><w:i/></w:rPr><w:t>{{name}}</w:t></w:r></w:p>"#;
        let bytes = build_docx(&[("word/document.xml", &document_part(body))]);

        let mut template = TemplateDoc::load(&bytes).unwrap();
        template.document.paragraphs[0].runs[0].text = "Alex".to_string();
        template.document.paragraphs[0].dirty = true;

        let saved = template.save().unwrap();
        let reloaded = TemplateDoc::load(&saved).unwrap();
        assert_eq!(reloaded.document.paragraphs[0].text(), "Alex");
        // The first run's formatting survives the rewrite.
        assert_eq!(
            reloaded.document.paragraphs[0].runs[0].formatting(),
            "<w:rPr><w:i/></w:rPr>"
        );
    }

    #[test]
    fn test_save_keeps_untouched_paragraph_byte_identical() {
        let untouched =
            r#"<w:p w:rsidR="00FF01"><w:pPr><w:jc w:val="right"/></w:pPr><w:r><w:rPr><w:b/><w:color w:val="FF0000"/></w:rPr><w:t>keep me</w:t></w:r></w:p>"#;
        let body = format!(
            r#"{untouched}<w:p><w:r><w:t>{{{{name}}}}</w:t></w:r></w:p>"#
        );
        let bytes = build_docx(&[("word/document.xml", &document_part(&body))]);

        let mut template = TemplateDoc::load(&bytes).unwrap();
        template.document.paragraphs[1].runs[0].text = "Alex".to_string();
        template.document.paragraphs[1].dirty = true;

        let saved = template.save().unwrap();
        let xml = read_part(&saved, "word/document.xml");
        assert!(xml.contains(untouched), "untouched paragraph was altered");
        assert!(xml.contains(r#"<w:t xml:space="preserve">Alex</w:t>"#));
    }

    #[test]
    fn test_save_without_edits_copies_everything_verbatim() {
        let doc_xml = document_part(r#"<w:p><w:r><w:t>static</w:t></w:r></w:p>"#);
        let bytes = build_docx(&[
            ("word/document.xml", &doc_xml),
            ("word/media/logo.bin", "\u{1}\u{2}binary"),
        ]);

        let template = TemplateDoc::load(&bytes).unwrap();
        let saved = template.save().unwrap();
        assert_eq!(read_part(&saved, "word/document.xml"), doc_xml);
        assert_eq!(read_part(&saved, "word/media/logo.bin"), "\u{1}\u{2}binary");
    }

    #[test]
    fn test_rewritten_text_is_escaped() {
        let body = r#"<w:p><w:r><w:t>{{name}}</w:t></w:r></w:p>"#;
        let bytes = build_docx(&[("word/document.xml", &document_part(body))]);

        let mut template = TemplateDoc::load(&bytes).unwrap();
        template.document.paragraphs[0].runs[0].text = "Smith & Sons <Ltd>".to_string();
        template.document.paragraphs[0].dirty = true;

        let saved = template.save().unwrap();
        let xml = read_part(&saved, "word/document.xml");
        assert!(xml.contains("Smith &amp; Sons &lt;Ltd&gt;"));

        let reloaded = TemplateDoc::load(&saved).unwrap();
        assert_eq!(reloaded.document.paragraphs[0].text(), "Smith & Sons <Ltd>");
    }

    #[test]
    fn test_zero_run_paragraph_gains_run_on_save() {
        let body = r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr></w:p>"#;
        let bytes = build_docx(&[("word/document.xml", &document_part(body))]);

        let mut template = TemplateDoc::load(&bytes).unwrap();
        assert!(template.document.paragraphs[0].runs.is_empty());
        template.document.paragraphs[0]
            .runs
            .push(Run::new("appended"));
        template.document.paragraphs[0].dirty = true;

        let saved = template.save().unwrap();
        let reloaded = TemplateDoc::load(&saved).unwrap();
        assert_eq!(reloaded.document.paragraphs[0].text(), "appended");
        // Paragraph properties survive the regeneration.
        let xml = read_part(&saved, "word/document.xml");
        assert!(xml.contains(r#"<w:pPr><w:jc w:val="center"/></w:pPr>"#));
    }
}
