//! Word document support: the in-memory model the substitution engine
//! operates on, and the `.docx` package codec that loads and serializes it.

pub mod model;
pub mod package;

pub use model::{Cell, Document, HeaderFooter, Paragraph, Row, Run, Section, Table};
pub use package::{DocxError, TemplateDoc};
