//! Where master templates, map files and engagement feeds come from.
//!
//! [`load_footprint`] is the only entry point the app uses: it asks a
//! [`TemplateSource`] for data and, if anything goes wrong, composes the
//! built-in defaults for the same client instead.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bevy::log::{info, warn};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::catalog::Catalogs;
use crate::compose::compose;
use crate::template::{
    EngagementData, FootprintTemplate, MapFile, MasterTemplate, TemplateError,
    default_map_file, default_master_template,
};

/// Failure to obtain a template, map file or engagement feed.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Malformed JSON.
    #[error("failed to parse footprint data: {0}")]
    Parse(#[from] serde_json::Error),
    /// Unreadable file.
    #[error("failed to read {path:?}: {source}")]
    Read {
        /// File attempted.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The source has no map file for this client.
    #[error("no map file for client {client_id}")]
    MissingMapFile {
        /// Requested client.
        client_id: String,
    },
    /// A map file names a different client than the one requested.
    #[error("map file for {expected} belongs to {found}")]
    ClientMismatch {
        /// Requested client.
        expected: String,
        /// Client named in the file.
        found: String,
    },
    /// Template parsed but failed validation.
    #[error("invalid master template: {0}")]
    Invalid(#[from] TemplateError),
}

/// Supplier of footprint inputs.
pub trait TemplateSource {
    /// The shared master template.
    fn master_template(&self) -> Result<MasterTemplate, LoadError>;

    /// The map file of `client_id`.
    fn map_file(&self, client_id: &str) -> Result<MapFile, LoadError>;
}

/// Always serves the built-in default template and an all-active map file.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSource;

impl TemplateSource for BuiltinSource {
    fn master_template(&self) -> Result<MasterTemplate, LoadError> {
        Ok(default_master_template())
    }

    fn map_file(&self, client_id: &str) -> Result<MapFile, LoadError> {
        Ok(default_map_file(client_id, &default_master_template()))
    }
}

/// Reads `<maps_dir>/<client>.json` map files and, unless built on the
/// default template, a master template file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    master_path: Option<PathBuf>,
    maps_dir: PathBuf,
}

impl JsonFileSource {
    /// Source over the given paths. Nothing is read until asked.
    pub fn new(master_path: impl Into<PathBuf>, maps_dir: impl Into<PathBuf>) -> Self {
        Self {
            master_path: Some(master_path.into()),
            maps_dir: maps_dir.into(),
        }
    }

    /// Map files from `maps_dir` laid over the built-in default template.
    pub fn with_builtin_master(maps_dir: impl Into<PathBuf>) -> Self {
        Self {
            master_path: None,
            maps_dir: maps_dir.into(),
        }
    }

    fn map_path(&self, client_id: &str) -> PathBuf {
        self.maps_dir.join(format!("{client_id}.json"))
    }
}

impl TemplateSource for JsonFileSource {
    fn master_template(&self) -> Result<MasterTemplate, LoadError> {
        let Some(path) = &self.master_path else {
            return Ok(default_master_template());
        };
        let master: MasterTemplate = read_json(path)?;
        master.validate()?;
        Ok(master)
    }

    fn map_file(&self, client_id: &str) -> Result<MapFile, LoadError> {
        let path = self.map_path(client_id);
        if !path.is_file() {
            return Err(LoadError::MissingMapFile {
                client_id: client_id.to_owned(),
            });
        }
        let mut map: MapFile = read_json(&path)?;
        if map.client_id.is_empty() {
            map.client_id = client_id.to_owned();
        } else if map.client_id != client_id {
            return Err(LoadError::ClientMismatch {
                expected: client_id.to_owned(),
                found: map.client_id,
            });
        }
        Ok(map)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

/// Composes the footprint of `client_id`, falling back to the built-in
/// defaults when the source fails. The fallback is logged, never silent.
pub fn load_footprint(
    source: &dyn TemplateSource,
    client_id: &str,
    catalogs: &Catalogs,
) -> FootprintTemplate {
    let loaded = source.master_template().and_then(|master| {
        let master = master.publish()?;
        let map = source.map_file(client_id)?;
        Ok((master, map))
    });

    match loaded {
        Ok((master, map)) => {
            let template = compose(&master, &map, catalogs);
            info!(
                client = client_id,
                template = %template.id,
                cells = template.generated_cells.len(),
                "footprint.loaded"
            );
            template
        }
        Err(err) => {
            warn!(client = client_id, error = %err, "footprint.load_failed");
            let master = default_master_template();
            let map = default_map_file(client_id, &master);
            info!(client = client_id, "footprint.loaded=builtin");
            compose(&Arc::new(master), &map, catalogs)
        }
    }
}

/// Engagement feed file: client id → records.
pub fn load_engagement(path: &Path) -> Result<HashMap<String, Vec<EngagementData>>, LoadError> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::template::EngagementState;

    const MASTER_JSON: &str = r#"{
        "id": "pharma",
        "version": "3.0.0",
        "clusters": [{
            "id": "H1",
            "centerPosition": {"q": 0, "r": 0},
            "slots": [
                {"id": "C1", "index": 1, "axialOffset": {"q": -2.0, "r": 0.3, "s": -2.0}, "serviceArea": "ELN", "serviceTypeId": "ST_ELN"},
                {"id": "C7", "index": 7, "axialOffset": {"q": 0, "r": 0}, "serviceArea": "BI"}
            ]
        }]
    }"#;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    fn file_source(map_body: Option<&str>) -> (tempfile::TempDir, JsonFileSource) {
        let dir = tempfile::tempdir().unwrap();
        let master = write(dir.path(), "master.json", MASTER_JSON);
        let maps = dir.path().join("maps");
        fs::create_dir(&maps).unwrap();
        if let Some(body) = map_body {
            write(&maps, "acme.json", body);
        }
        (dir, JsonFileSource::new(master, maps))
    }

    // ── file source ─────────────────────────────────────────────────

    #[test]
    fn reads_master_and_map() {
        let (_dir, source) = file_source(Some(
            r#"{"version": "7", "activeCells": ["C1"], "cellDisplayNames": {"C1": "Notebook"}}"#,
        ));
        let template = load_footprint(&source, "acme", &Catalogs::builtin());
        assert_eq!(template.id, "acme-7");
        assert_eq!(template.master_template.id, "pharma");
        assert_eq!(template.generated_cells.len(), 1);
        assert_eq!(template.generated_cells[0].id, "H1-C1");
        assert_eq!(template.generated_cells[0].display_name, "Notebook");
    }

    #[test]
    fn builtin_master_reads_map_files() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "acme.json",
            r#"{"version": "2", "activeCells": ["core-systems-C1"]}"#,
        );
        let source = JsonFileSource::with_builtin_master(dir.path());
        let template = load_footprint(&source, "acme", &Catalogs::builtin());
        assert_eq!(template.id, "acme-2");
        assert_eq!(template.master_template.id, "default-master");
        assert_eq!(template.generated_cells.len(), 1);
        assert_eq!(template.generated_cells[0].id, "core-systems-C1");
    }

    #[test]
    fn map_client_id_must_match() {
        let (_dir, source) = file_source(Some(r#"{"clientId": "other", "activeCells": []}"#));
        assert!(matches!(
            source.map_file("acme"),
            Err(LoadError::ClientMismatch { .. })
        ));
    }

    #[test]
    fn missing_map_is_reported() {
        let (_dir, source) = file_source(None);
        assert!(matches!(
            source.map_file("acme"),
            Err(LoadError::MissingMapFile { .. })
        ));
    }

    #[test]
    fn malformed_master_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let master = write(dir.path(), "master.json", "{ not json");
        let source = JsonFileSource::new(master, dir.path());
        assert!(matches!(source.master_template(), Err(LoadError::Parse(_))));
    }

    #[test]
    fn unreadable_master_is_a_read_error() {
        let source = JsonFileSource::new("/nonexistent/master.json", "/nonexistent");
        assert!(matches!(source.master_template(), Err(LoadError::Read { .. })));
    }

    // ── fallback ────────────────────────────────────────────────────

    #[test]
    fn failure_falls_back_to_defaults_for_same_client() {
        let (_dir, source) = file_source(None);
        let template = load_footprint(&source, "acme", &Catalogs::builtin());
        assert_eq!(template.client_id, "acme");
        assert_eq!(template.master_template.id, "default-master");
        assert_eq!(template.generated_cells.len(), 11);
    }

    #[test]
    fn huge_coordinate_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let master = write(
            dir.path(),
            "master.json",
            r#"{"id": "pharma", "version": "1", "clusters": [{"id": "H1", "centerPosition": {"q": 1e10, "r": 1e10}, "slots": []}]}"#,
        );
        write(dir.path(), "acme.json", r#"{"activeCells": []}"#);
        let source = JsonFileSource::new(master, dir.path());
        assert!(matches!(source.master_template(), Err(LoadError::Parse(_))));

        let template = load_footprint(&source, "acme", &Catalogs::builtin());
        assert_eq!(template.master_template.id, "default-master");
        assert_eq!(template.generated_cells.len(), 11);
    }

    #[test]
    fn builtin_source_matches_fallback() {
        let catalogs = Catalogs::builtin();
        let a = load_footprint(&BuiltinSource, "acme", &catalogs);
        let (_dir, failing) = file_source(None);
        let b = load_footprint(&failing, "acme", &catalogs);
        assert_eq!(a.generated_cells, b.generated_cells);
    }

    // ── engagement feed ─────────────────────────────────────────────

    #[test]
    fn engagement_feed_parses_per_client() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "engagement.json",
            r#"{"acme": [{"cellId": "H1-C1", "engagementState": "CURRENTLY_ENGAGED", "visualProperties": {"opacity": 0.5}}]}"#,
        );
        let feed = load_engagement(&path).unwrap();
        let records = &feed["acme"];
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].engagement_state, EngagementState::CurrentlyEngaged);
        assert_eq!(
            records[0].visual_properties.as_ref().and_then(|p| p.opacity),
            Some(0.5)
        );
    }
}
