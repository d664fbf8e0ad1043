//! Per-file metadata extraction.
//!
//! Derives the three lookups the sync step addresses files by: where to
//! download content from, the human-facing view link, and the title.
//! Shortcuts must already be resolved by the file source; this module does
//! no network I/O.

use std::collections::HashMap;

use crate::error::MetadataError;
use crate::models::FileReference;

/// Export format requested for Google Workspace documents.
pub const TEXT_EXPORT_MIME: &str = "text/plain";

/// Lookups keyed by file id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata {
    pub locators: HashMap<String, String>,
    pub view_links: HashMap<String, String>,
    pub titles: HashMap<String, String>,
}

pub fn extract(files: &[FileReference]) -> Result<FileMetadata, MetadataError> {
    let mut metadata = FileMetadata::default();

    for file in files {
        if file.is_shortcut() {
            return Err(MetadataError::UnresolvedShortcut {
                file_id: file.id.clone(),
            });
        }

        let locator = content_locator(file).ok_or_else(|| missing(file, "content link"))?;
        let view_link = non_empty(&file.web_view_link).ok_or_else(|| missing(file, "webViewLink"))?;
        let title = non_empty(&file.name).ok_or_else(|| missing(file, "name"))?;

        metadata.locators.insert(file.id.clone(), locator);
        metadata.view_links.insert(file.id.clone(), view_link);
        metadata.titles.insert(file.id.clone(), title);
    }

    Ok(metadata)
}

/// Plain-text export link for Workspace documents, otherwise the direct
/// content link.
fn content_locator(file: &FileReference) -> Option<String> {
    file.export_links
        .get(TEXT_EXPORT_MIME)
        .filter(|l| !l.is_empty())
        .cloned()
        .or_else(|| non_empty(&file.web_content_link))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

fn missing(file: &FileReference, field: &'static str) -> MetadataError {
    MetadataError::MissingField {
        file_id: file.id.clone(),
        field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShortcutDetails;

    fn doc(id: &str) -> FileReference {
        FileReference {
            id: id.to_string(),
            name: Some(format!("Doc {}", id)),
            mime_type: "application/vnd.google-apps.document".to_string(),
            web_view_link: Some(format!("https://drive.test/view/{}", id)),
            export_links: HashMap::from([(
                TEXT_EXPORT_MIME.to_string(),
                format!("https://drive.test/export/{}", id),
            )]),
            ..Default::default()
        }
    }

    #[test]
    fn test_extracts_all_three_maps() {
        let meta = extract(&[doc("a"), doc("b")]).unwrap();
        assert_eq!(meta.locators["a"], "https://drive.test/export/a");
        assert_eq!(meta.view_links["b"], "https://drive.test/view/b");
        assert_eq!(meta.titles["a"], "Doc a");
    }

    #[test]
    fn test_falls_back_to_content_link() {
        let mut file = doc("a");
        file.export_links.clear();
        file.web_content_link = Some("https://drive.test/raw/a".to_string());
        let meta = extract(&[file]).unwrap();
        assert_eq!(meta.locators["a"], "https://drive.test/raw/a");
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let mut file = doc("a");
        file.name = None;
        assert_eq!(
            extract(&[file]),
            Err(MetadataError::MissingField {
                file_id: "a".to_string(),
                field: "name"
            })
        );
    }

    #[test]
    fn test_missing_locator_is_an_error() {
        let mut file = doc("a");
        file.export_links.clear();
        assert!(matches!(
            extract(&[file]),
            Err(MetadataError::MissingField {
                field: "content link",
                ..
            })
        ));
    }

    #[test]
    fn test_unresolved_shortcut_rejected() {
        let mut file = doc("a");
        file.shortcut = Some(ShortcutDetails {
            target_id: "t".to_string(),
            target_mime_type: None,
        });
        assert!(matches!(
            extract(&[file]),
            Err(MetadataError::UnresolvedShortcut { .. })
        ));
    }
}
