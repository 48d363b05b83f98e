//! Batch driver
//!
//! Builds, serialises and writes one artifact per device row, strictly in
//! order. The first error stops the run; artifacts already written by that run
//! are removed again so a failed batch leaves nothing behind.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::artifact::{self, ArtifactPaths};
use crate::batch::table::{DeviceRow, DeviceTable};
use crate::config;
use crate::error::{Error, Result};
use crate::record::{LayoutSerialiser, RecordBuilder};

/// Batch run options
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Output root; artifacts go to its `bin` sub-directory
    pub out_dir: PathBuf,
    /// Also write the C array companion
    pub emit_header: bool,
    /// Read each binary back and check magic and CRC
    pub verify: bool,
}

impl BatchOptions {
    /// Write under `out_dir` with companions and verification off
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            emit_header: false,
            verify: false,
        }
    }

    /// Directory receiving the artifacts
    pub fn bin_dir(&self) -> PathBuf {
        self.out_dir.join(config::artifact::BIN_DIR)
    }
}

/// Artifact written for one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub identity: String,
    pub binary: PathBuf,
    pub header: Option<PathBuf>,
    pub size: usize,
    /// Keys of this row the record builder did not recognise
    pub skipped: Vec<String>,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub artifacts: Vec<WrittenArtifact>,
}

/// Drives the record pipeline over a device table
pub struct BatchDriver {
    options: BatchOptions,
    serialiser: LayoutSerialiser,
}

impl BatchDriver {
    /// Create a driver with the given options
    pub fn new(options: BatchOptions) -> Self {
        Self {
            options,
            serialiser: LayoutSerialiser::new(),
        }
    }

    /// Process every row of `table`.
    pub fn run(&self, table: &DeviceTable) -> Result<BatchSummary> {
        let bin_dir = self.options.bin_dir();
        fs::create_dir_all(&bin_dir).map_err(|e| Error::io(&bin_dir, e))?;

        let mut summary = BatchSummary::default();
        let mut written: Vec<PathBuf> = Vec::new();

        for row in &table.rows {
            match self.process_row(row, &bin_dir, &mut written) {
                Ok(artifact) => summary.artifacts.push(artifact),
                Err(e) => {
                    self.roll_back(&written);
                    return Err(e);
                }
            }
        }

        info!(
            "Files generated in {} ({} devices)",
            bin_dir.display(),
            summary.artifacts.len()
        );
        Ok(summary)
    }

    /// Open a table file and process it.
    pub fn run_file(&self, path: &Path) -> Result<BatchSummary> {
        let table = DeviceTable::open(path)?;
        self.run(&table)
    }

    fn process_row(
        &self,
        row: &DeviceRow,
        bin_dir: &Path,
        written: &mut Vec<PathBuf>,
    ) -> Result<WrittenArtifact> {
        let identity = row.identity()?;
        let paths = ArtifactPaths::new(bin_dir, identity);

        // Refuse before building so a duplicate identity never costs a write
        if paths.binary.exists() {
            return Err(Error::Collision { path: paths.binary });
        }

        let outcome = RecordBuilder::build(row.record_pairs())?;
        let bytes = self.serialiser.serialise(outcome.config);

        artifact::write_new(&paths.binary, &bytes)?;
        written.push(paths.binary.clone());
        info!("Created NVS binary: ===> {}", paths.binary.display());

        if self.options.verify {
            let data = fs::read(&paths.binary).map_err(|e| Error::io(&paths.binary, e))?;
            self.serialiser.inspect(&data)?;
        }

        let header = if self.options.emit_header {
            artifact::write_new(&paths.header, artifact::render_c_array(&bytes).as_bytes())?;
            written.push(paths.header.clone());
            Some(paths.header)
        } else {
            None
        };

        Ok(WrittenArtifact {
            identity: identity.to_string(),
            binary: paths.binary,
            header,
            size: bytes.len(),
            skipped: outcome.skipped,
        })
    }

    fn roll_back(&self, written: &[PathBuf]) {
        for path in written.iter().rev() {
            match artifact::remove(path) {
                Ok(()) => warn!("Removed {} from failed batch", path.display()),
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> DeviceTable {
        DeviceTable::from_reader(text.as_bytes()).expect("Should parse")
    }

    #[test]
    fn test_writes_one_artifact_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let driver = BatchDriver::new(BatchOptions::new(dir.path()));

        let summary = driver
            .run(&table(
                "id,mac_address,manufacturer_name\n\
                 1,0123456789ABCDEF,Acme\n\
                 2,NULL,Acme\n",
            ))
            .expect("Should run");

        assert_eq!(summary.artifacts.len(), 2);
        assert_eq!(summary.artifacts[0].identity, "0123456789ABCDEF");
        assert_eq!(summary.artifacts[1].identity, "2");
        assert!(dir.path().join("bin/0123456789ABCDEF.bin").exists());
        assert!(dir.path().join("bin/2.bin").exists());
        assert_eq!(summary.artifacts[1].size, 12 + 182 + 4 + 4);
    }

    #[test]
    fn test_duplicate_identity_collides_and_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let driver = BatchDriver::new(BatchOptions::new(dir.path()));

        let result = driver.run(&table("id,mac_address\n1,NULL\n1,NULL\n"));

        assert!(matches!(result, Err(Error::Collision { .. })));
        assert!(!dir.path().join("bin/1.bin").exists());
    }

    #[test]
    fn test_existing_artifact_is_not_touched() {
        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        fs::write(bin_dir.join("7.bin"), b"keep").unwrap();

        let driver = BatchDriver::new(BatchOptions::new(dir.path()));
        let result = driver.run(&table("id\n7\n"));

        assert!(matches!(result, Err(Error::Collision { .. })));
        assert_eq!(fs::read(bin_dir.join("7.bin")).unwrap(), b"keep");
    }

    #[test]
    fn test_invalid_row_aborts_batch() {
        let dir = tempfile::tempdir().unwrap();
        let driver = BatchDriver::new(BatchOptions::new(dir.path()));

        let result = driver.run(&table(
            "id,manufacturer_name\n1,Acme\n2,ABCDEFGHIJKLMNOPQ\n3,Acme\n",
        ));

        assert!(matches!(result, Err(Error::Validation { .. })));
        // Row 1 was rolled back, row 3 never ran
        assert!(!dir.path().join("bin/1.bin").exists());
        assert!(!dir.path().join("bin/2.bin").exists());
        assert!(!dir.path().join("bin/3.bin").exists());
    }

    #[test]
    fn test_header_companion_and_verify() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = BatchOptions::new(dir.path());
        options.emit_header = true;
        options.verify = true;
        let driver = BatchDriver::new(options);

        let summary = driver
            .run(&table("id,manufacturer_name,serial\n4,Acme,99\n"))
            .expect("Should run");

        let artifact = &summary.artifacts[0];
        assert_eq!(artifact.skipped, vec!["serial".to_string()]);
        let header = artifact.header.as_ref().expect("Should have header");
        let text = fs::read_to_string(header).unwrap();
        assert!(text.starts_with("unsigned char production_config[] = {\n0xe7, 0x37, 0xdd, 0xf6, "));
        assert!(text.ends_with(&format!("production_config_len = {};", artifact.size)));
    }
}
