//! Filesystem manifest store.
//!
//! Loads audit manifests from a directory, one file per manifest id.
//! YAML is the primary format (`{id}.yaml`, then `{id}.yml`), with JSON
//! (`{id}.json`) as a fallback. A missing file is not an error -- the
//! audit service treats an absent manifest as "no contract to check".
//! A file that exists but fails to parse is an error, surfaced loudly
//! rather than silently skipping checks.

use std::path::{Path, PathBuf};

use flowtrace_core::audit::ManifestStore;
use flowtrace_types::error::ManifestError;
use flowtrace_types::manifest::WorkflowManifest;

/// Directory-backed [`ManifestStore`].
pub struct FsManifestStore {
    dir: PathBuf,
}

impl FsManifestStore {
    /// Create a store over a manifest directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory manifests are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Manifest ids are plain file stems; reject anything that could escape
/// the manifest directory.
fn valid_manifest_id(manifest_id: &str) -> bool {
    !manifest_id.is_empty()
        && !manifest_id.contains(['/', '\\'])
        && !manifest_id.contains("..")
}

impl ManifestStore for FsManifestStore {
    async fn load(&self, manifest_id: &str) -> Result<Option<WorkflowManifest>, ManifestError> {
        if !valid_manifest_id(manifest_id) {
            tracing::warn!(manifest_id, "rejected manifest id");
            return Ok(None);
        }

        for ext in ["yaml", "yml", "json"] {
            let path = self.dir.join(format!("{manifest_id}.{ext}"));
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(ManifestError::Io(format!("{}: {e}", path.display()))),
            };

            let manifest = if ext == "json" {
                serde_json::from_str(&contents)
                    .map_err(|e| ManifestError::Parse(format!("{}: {e}", path.display())))?
            } else {
                serde_yaml_ng::from_str(&contents)
                    .map_err(|e| ManifestError::Parse(format!("{}: {e}", path.display())))?
            };

            tracing::debug!(manifest_id, path = %path.display(), "loaded audit manifest");
            return Ok(Some(manifest));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    const SAMPLE_YAML: &str = r#"
version: "1.0"
steps:
  - id: parse-rules
    name: Parse Rules
    validation:
      required: [ruleset]
"#;

    #[tokio::test]
    async fn test_load_yaml_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "rules-audit.yaml", SAMPLE_YAML);

        let store = FsManifestStore::new(dir.path());
        let manifest = store.load("rules-audit").await.unwrap().unwrap();
        assert_eq!(manifest.version, "1.0");
        assert_eq!(manifest.steps[0].id, "parse-rules");
    }

    #[tokio::test]
    async fn test_yml_and_json_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "short.yml", SAMPLE_YAML);
        write_manifest(
            dir.path(),
            "as-json.json",
            r#"{"version": "2.0", "steps": []}"#,
        );

        let store = FsManifestStore::new(dir.path());
        assert!(store.load("short").await.unwrap().is_some());
        let json_manifest = store.load("as-json").await.unwrap().unwrap();
        assert_eq!(json_manifest.version, "2.0");
    }

    #[tokio::test]
    async fn test_yaml_takes_precedence_over_json() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "both.yaml", SAMPLE_YAML);
        write_manifest(dir.path(), "both.json", r#"{"version": "9.9", "steps": []}"#);

        let store = FsManifestStore::new(dir.path());
        let manifest = store.load("both").await.unwrap().unwrap();
        assert_eq!(manifest.version, "1.0");
    }

    #[tokio::test]
    async fn test_missing_manifest_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsManifestStore::new(dir.path());
        assert!(store.load("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_error() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "bad.yaml", "steps: [not: {valid");

        let store = FsManifestStore::new(dir.path());
        let err = store.load("bad").await.unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[tokio::test]
    async fn test_traversal_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsManifestStore::new(dir.path());
        assert!(store.load("../etc/passwd").await.unwrap().is_none());
        assert!(store.load("a/b").await.unwrap().is_none());
        assert!(store.load("").await.unwrap().is_none());
    }
}
