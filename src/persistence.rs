//! On-disk form of the persisted descriptor registry.
//!
//! The file is a small JSON envelope around the persisted bucket:
//! - `version`: file format version
//! - `saved_at`: RFC 3339 timestamp of the save
//! - `checksum`: MD5 of the canonical JSON encoding of `persisted`
//! - `persisted`: key to descriptor values
//!
//! Session entries are never written.

use crate::registry::RegistrySnapshot;
use crate::value::ScriptingParameters;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Current registry file format version.
pub const REGISTRY_FILE_VERSION: u32 = 1;

/// Integrity failures detected when reading a registry file.
#[derive(Debug, Error)]
pub enum RegistryFileError {
    /// The file was written by an unknown format version.
    #[error("unsupported registry file version {0}")]
    UnsupportedVersion(u32),

    /// The payload does not match its recorded checksum.
    #[error("registry checksum mismatch: expected {expected}, found {actual}")]
    ChecksumMismatch {
        /// Checksum recorded in the file.
        expected: String,
        /// Checksum of the payload as read.
        actual: String,
    },
}

/// Serialized registry file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryFile {
    /// Format version.
    pub version: u32,
    /// When the file was written.
    pub saved_at: String,
    /// MD5 hex digest of the persisted payload.
    pub checksum: String,
    /// The persisted bucket.
    pub persisted: BTreeMap<String, ScriptingParameters>,
}

impl RegistryFile {
    /// Wrap the persisted bucket of `snapshot` for saving.
    pub fn from_snapshot(snapshot: &RegistrySnapshot) -> Result<Self> {
        Ok(Self {
            version: REGISTRY_FILE_VERSION,
            saved_at: chrono::Local::now().to_rfc3339(),
            checksum: checksum(&snapshot.persisted)?,
            persisted: snapshot.persisted.clone(),
        })
    }

    /// Verify version and checksum, then unwrap into a snapshot.
    pub fn into_snapshot(self) -> Result<RegistrySnapshot> {
        if self.version != REGISTRY_FILE_VERSION {
            return Err(RegistryFileError::UnsupportedVersion(self.version).into());
        }
        let actual = checksum(&self.persisted)?;
        if actual != self.checksum {
            return Err(RegistryFileError::ChecksumMismatch {
                expected: self.checksum,
                actual,
            }
            .into());
        }
        Ok(RegistrySnapshot {
            persisted: self.persisted,
            session: BTreeMap::new(),
        })
    }

    /// Write the persisted bucket of `snapshot` to `path`.
    ///
    /// The file is written next to its destination and renamed into place.
    pub fn save(path: &Path, snapshot: &RegistrySnapshot) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create registry directory: {:?}", parent))?;
        }
        let file = Self::from_snapshot(snapshot)?;
        let content = serde_json::to_string_pretty(&file)?;
        let staging = path.with_extension("tmp");
        fs::write(&staging, content)
            .context(format!("Failed to write registry file: {:?}", staging))?;
        fs::rename(&staging, path)
            .context(format!("Failed to move registry file into place: {:?}", path))?;
        tracing::info!(path = %path.display(), entries = file.persisted.len(), "registry saved");
        Ok(())
    }

    /// Read and verify the registry file at `path`.
    pub fn load(path: &Path) -> Result<RegistrySnapshot> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read registry file: {:?}", path))?;
        let file: RegistryFile = serde_json::from_str(&content)
            .context(format!("Failed to parse registry file: {:?}", path))?;
        file.into_snapshot()
    }

    /// Like [`RegistryFile::load`], but a missing file yields an empty snapshot.
    pub fn load_or_default(path: &Path) -> Result<RegistrySnapshot> {
        if !path.exists() {
            return Ok(RegistrySnapshot::default());
        }
        Self::load(path)
    }
}

fn checksum(persisted: &BTreeMap<String, ScriptingParameters>) -> Result<String> {
    let canonical = serde_json::to_vec(persisted)?;
    Ok(format!("{:x}", md5::compute(canonical)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{ActionDescriptorReference, ReferenceData, ReferenceItem};
    use crate::value::{fourcc, ActionList, ActionValue, AeteValue, DescriptorType, ObjectValue, UnitFloat};

    fn snapshot() -> RegistrySnapshot {
        let values: ScriptingParameters = [(
            fourcc(b"Opct"),
            AeteValue::new(DescriptorType::Integer, 0, ActionValue::Integer(50)),
        )]
        .into_iter()
        .collect();
        let mut snapshot = RegistrySnapshot::default();
        snapshot.persisted.insert("opacity".into(), values.clone());
        snapshot.session.insert("scratch".into(), values);
        snapshot
    }

    #[test]
    fn test_save_load_drops_session_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("registry.json");
        RegistryFile::save(&path, &snapshot()).unwrap();

        let loaded = RegistryFile::load(&path).unwrap();
        assert_eq!(loaded.persisted, snapshot().persisted);
        assert!(loaded.session.is_empty());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_tampered_file_fails_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        RegistryFile::save(&path, &snapshot()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.replace("50", "51")).unwrap();

        let err = RegistryFile::load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryFileError>(),
            Some(RegistryFileError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut file = RegistryFile::from_snapshot(&snapshot()).unwrap();
        file.version = 99;
        let err = file.into_snapshot().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryFileError>(),
            Some(RegistryFileError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = RegistryFile::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_empty());
    }

    fn float(value: f64) -> AeteValue {
        AeteValue::new(DescriptorType::Float, 0, ActionValue::Float(value))
    }

    fn save_and_load(persisted: BTreeMap<String, ScriptingParameters>) -> RegistrySnapshot {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let snapshot = RegistrySnapshot {
            persisted,
            session: BTreeMap::new(),
        };
        RegistryFile::save(&path, &snapshot).unwrap();
        RegistryFile::load(&path).unwrap()
    }

    fn float_bits_at(snapshot: &RegistrySnapshot, entry: &str, key: u32) -> u64 {
        let value = snapshot.persisted[entry].get(key).unwrap();
        value.as_float().unwrap().to_bits()
    }

    #[test]
    fn test_ordinary_floats_reload_exactly() {
        let amount = fourcc(b"Amnt");
        let mut persisted = BTreeMap::new();
        let mut expected = Vec::new();
        for i in 0..500 {
            let v = f64::from(i) / 7.0 + f64::from(i) * 0.001;
            expected.push(v.to_bits());
            let values: ScriptingParameters = [(amount, float(v))].into_iter().collect();
            persisted.insert(format!("entry{i}"), values);
        }

        let loaded = save_and_load(persisted);
        for (i, bits) in expected.into_iter().enumerate() {
            assert_eq!(float_bits_at(&loaded, &format!("entry{i}"), amount), bits);
        }
    }

    #[test]
    fn test_non_finite_floats_reload() {
        let keys = [fourcc(b"NaN "), fourcc(b"Inf "), fourcc(b"NInf"), fourcc(b"NZer")];
        let samples = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.0];
        let values: ScriptingParameters = keys.iter().zip(samples).map(|(&k, v)| (k, float(v))).collect();
        let mut persisted = BTreeMap::new();
        persisted.insert("odd".to_owned(), values);

        let loaded = save_and_load(persisted);
        for (key, sample) in keys.into_iter().zip(samples) {
            assert_eq!(float_bits_at(&loaded, "odd", key), sample.to_bits());
        }
    }

    #[test]
    fn test_nested_values_reload() {
        let inner: ScriptingParameters = [
            (
                fourcc(b"Wdth"),
                AeteValue::new(
                    DescriptorType::UnitFloat,
                    0,
                    ActionValue::UnitFloat(UnitFloat {
                        unit: fourcc(b"#Pxl"),
                        value: 0.1 + 0.2,
                    }),
                ),
            ),
            (fourcc(b"Hght"), float(f64::INFINITY)),
        ]
        .into_iter()
        .collect();
        let list = ActionList {
            items: vec![
                float(1.0 / 3.0),
                AeteValue::new(
                    DescriptorType::Object,
                    0,
                    ActionValue::Object(ObjectValue {
                        class: fourcc(b"Rctn"),
                        descriptor: inner.clone(),
                    }),
                ),
            ],
        };
        let reference = ActionDescriptorReference {
            items: vec![
                ReferenceItem {
                    desired_class: fourcc(b"Lyr "),
                    data: ReferenceData::Name(b"Background".to_vec()),
                },
                ReferenceItem {
                    desired_class: fourcc(b"Dcmn"),
                    data: ReferenceData::Index(1),
                },
            ],
        };
        let values: ScriptingParameters = [
            (
                fourcc(b"Objc"),
                AeteValue::new(
                    DescriptorType::Object,
                    0,
                    ActionValue::Object(ObjectValue {
                        class: fourcc(b"Rctn"),
                        descriptor: inner.clone(),
                    }),
                ),
            ),
            (fourcc(b"Itms"), AeteValue::new(DescriptorType::List, 0, ActionValue::List(list))),
            (
                fourcc(b"null"),
                AeteValue::new(DescriptorType::Reference, 0, ActionValue::Reference(reference.clone())),
            ),
        ]
        .into_iter()
        .collect();
        let mut persisted = BTreeMap::new();
        persisted.insert("nested".to_owned(), values);

        let loaded = save_and_load(persisted);
        let entry = &loaded.persisted["nested"];

        let object = entry.get(fourcc(b"Objc")).unwrap().as_object().unwrap();
        let width = object.descriptor.get(fourcc(b"Wdth")).unwrap().as_unit_float().unwrap();
        assert_eq!(width.unit, fourcc(b"#Pxl"));
        assert_eq!(width.value.to_bits(), (0.1f64 + 0.2).to_bits());
        let height = object.descriptor.get(fourcc(b"Hght")).unwrap().as_float().unwrap();
        assert_eq!(height, f64::INFINITY);

        let items = entry.get(fourcc(b"Itms")).unwrap().as_list().unwrap();
        assert_eq!(items.items[0].as_float().unwrap().to_bits(), (1.0f64 / 3.0).to_bits());
        assert_eq!(items.items[1].as_object().unwrap().descriptor, inner);

        assert_eq!(entry.get(fourcc(b"null")).unwrap().as_reference().unwrap(), &reference);
    }
}
