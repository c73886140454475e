//! Template directory access: traversal-resistant name resolution and
//! listing of the available templates.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::errors::AppError;

#[derive(Debug, Serialize)]
pub struct TemplateInfo {
    pub name: String,
    pub size_bytes: u64,
}

/// Resolves a client-supplied template name against the template directory.
///
/// The name must be a single normal path component — anything containing a
/// separator, `..`, or an absolute prefix is rejected before touching the
/// filesystem, so a crafted name can never escape the directory.
pub fn resolve_template(template_dir: &Path, name: &str) -> Result<PathBuf, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("template_name is required".to_string()));
    }

    let relative = Path::new(name);
    let mut components = relative.components();
    let single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();
    if !single_normal {
        return Err(AppError::BadRequest(format!(
            "invalid template name '{name}'"
        )));
    }

    let path = template_dir.join(relative);
    if !path.is_file() {
        return Err(AppError::NotFound(format!("Template '{name}' not found")));
    }
    Ok(path)
}

/// Lists the `.docx` templates in the directory, sorted by name.
pub fn list_templates(template_dir: &Path) -> std::io::Result<Vec<TemplateInfo>> {
    let mut templates = Vec::new();
    for entry in std::fs::read_dir(template_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_docx = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("docx"));
        if !is_docx || !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            templates.push(TemplateInfo {
                name: name.to_string(),
                size_bytes: entry.metadata()?.len(),
            });
        }
    }
    templates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("offer.docx"), b"stub").unwrap();
        dir
    }

    #[test]
    fn test_resolves_existing_template() {
        let dir = template_dir();
        let path = resolve_template(dir.path(), "offer.docx").unwrap();
        assert_eq!(path, dir.path().join("offer.docx"));
    }

    #[test]
    fn test_missing_template_is_not_found() {
        let dir = template_dir();
        let err = resolve_template(dir.path(), "absent.docx").unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg.contains("absent.docx")));
    }

    #[test]
    fn test_empty_name_is_bad_request() {
        let dir = template_dir();
        assert!(matches!(
            resolve_template(dir.path(), ""),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            resolve_template(dir.path(), "   "),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_parent_traversal_is_rejected() {
        let dir = template_dir();
        assert!(matches!(
            resolve_template(dir.path(), "../offer.docx"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            resolve_template(dir.path(), "a/../../b.docx"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_nested_path_is_rejected() {
        let dir = template_dir();
        assert!(matches!(
            resolve_template(dir.path(), "sub/offer.docx"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_absolute_path_is_rejected() {
        let dir = template_dir();
        let absolute = dir.path().join("offer.docx");
        assert!(matches!(
            resolve_template(dir.path(), absolute.to_str().unwrap()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_list_returns_docx_files_sorted() {
        let dir = template_dir();
        std::fs::write(dir.path().join("bid.docx"), b"stub-2").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let templates = list_templates(dir.path()).unwrap();
        let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["bid.docx", "offer.docx"]);
        assert_eq!(templates[1].size_bytes, 4);
    }
}
