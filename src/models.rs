//! Core data models used throughout Drive Harness.
//!
//! These types represent the file references, scope, indexed documents and
//! search results that flow through the sync and retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Target of a shortcut file, as reported by the file source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutDetails {
    pub target_id: String,
    #[serde(default)]
    pub target_mime_type: Option<String>,
}

/// A file as listed by the file source at query time.
///
/// Field names follow the Drive v3 `files` resource so the HTTP connector
/// can deserialize responses directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub parents: BTreeSet<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub web_content_link: Option<String>,
    #[serde(default)]
    pub export_links: HashMap<String, String>,
    #[serde(default, rename = "shortcutDetails")]
    pub shortcut: Option<ShortcutDetails>,
}

impl FileReference {
    pub fn is_shortcut(&self) -> bool {
        self.shortcut.is_some()
    }

    pub fn shortcut_target_id(&self) -> Option<&str> {
        self.shortcut.as_ref().map(|s| s.target_id.as_str())
    }
}

/// A file or folder an agent has been granted, as stored in the agent's
/// tool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Artifact {
    File {
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
    Folder {
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl Artifact {
    pub fn id(&self) -> &str {
        match self {
            Artifact::File { id, .. } | Artifact::Folder { id, .. } => id,
        }
    }
}

/// What one request is allowed to search, built once from agent config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSpec {
    pub explicit_file_ids: BTreeSet<String>,
    pub explicit_folder_ids: BTreeSet<String>,
    pub query_text: String,
}

impl ScopeSpec {
    /// Partition configured artifacts into file and folder id sets.
    pub fn from_artifacts(artifacts: &[Artifact], query_text: &str) -> Self {
        let mut spec = ScopeSpec {
            query_text: query_text.to_string(),
            ..Default::default()
        };
        for artifact in artifacts {
            match artifact {
                Artifact::File { id, .. } => {
                    spec.explicit_file_ids.insert(id.clone());
                }
                Artifact::Folder { id, .. } => {
                    spec.explicit_folder_ids.insert(id.clone());
                }
            }
        }
        spec
    }
}

/// Provenance fields of an indexed document. Any of them may be missing on
/// documents written by older syncs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContent {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub last_updated: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
}

/// A document as held by the index service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub index_name: String,
    pub doc_id: String,
    #[serde(default)]
    pub content: DocumentContent,
    #[serde(default)]
    pub chunks: Vec<DocumentChunk>,
}

/// Provenance attached to a document after its content is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContext {
    pub url: String,
    pub title: String,
    pub last_updated: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDecision {
    Create,
    Update,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// One of url, title or last_updated is absent.
    MissingMetadata,
    /// Older than the staleness window by `age` seconds total.
    Expired { age: i64 },
}

/// What a lookup says about one file's document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Fresh,
    Stale(StaleReason),
    Absent,
}

impl FileState {
    /// The index action implied by a classified state.
    pub fn decision(&self) -> SyncDecision {
        match self {
            FileState::Absent => SyncDecision::Create,
            FileState::Stale(_) => SyncDecision::Update,
            FileState::Fresh => SyncDecision::Skip,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitContent {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkText {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitChunk {
    pub content: ChunkText,
}

/// One document-level hit returned by the index search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(default)]
    pub content: HitContent,
    #[serde(default)]
    pub chunks: Vec<HitChunk>,
}

/// A flat retrieval record returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultChunk {
    pub text: String,
    pub url: String,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_spec_partitions_artifacts() {
        let artifacts = vec![
            Artifact::File {
                id: "f1".into(),
                name: None,
            },
            Artifact::Folder {
                id: "d1".into(),
                name: Some("Reports".into()),
            },
            Artifact::File {
                id: "f2".into(),
                name: None,
            },
        ];
        let spec = ScopeSpec::from_artifacts(&artifacts, "budget");
        assert_eq!(spec.explicit_file_ids.len(), 2);
        assert!(spec.explicit_folder_ids.contains("d1"));
        assert_eq!(spec.query_text, "budget");
    }

    #[test]
    fn test_artifact_tagged_deserialize() {
        let json = r#"[{"type":"folder","id":"abc"},{"type":"file","id":"xyz","name":"Plan"}]"#;
        let artifacts: Vec<Artifact> = serde_json::from_str(json).unwrap();
        assert_eq!(artifacts[0].id(), "abc");
        assert!(matches!(artifacts[1], Artifact::File { .. }));
    }

    #[test]
    fn test_unknown_artifact_type_rejected() {
        let json = r#"{"type":"drive","id":"abc"}"#;
        assert!(serde_json::from_str::<Artifact>(json).is_err());
    }

    #[test]
    fn test_file_reference_from_drive_json() {
        let json = r#"{
            "id": "s1",
            "name": "Link to plan",
            "mimeType": "application/vnd.google-apps.shortcut",
            "parents": ["root"],
            "shortcutDetails": {"targetId": "t1", "targetMimeType": "text/plain"}
        }"#;
        let file: FileReference = serde_json::from_str(json).unwrap();
        assert!(file.is_shortcut());
        assert_eq!(file.shortcut_target_id(), Some("t1"));
        assert!(file.parents.contains("root"));
    }

    #[test]
    fn test_state_decisions() {
        assert_eq!(FileState::Absent.decision(), SyncDecision::Create);
        assert_eq!(
            FileState::Stale(StaleReason::MissingMetadata).decision(),
            SyncDecision::Update
        );
        assert_eq!(FileState::Fresh.decision(), SyncDecision::Skip);
    }
}
