//! Artifact output
//!
//! Writes serialised records to disk without ever replacing an existing file,
//! and renders the optional C array companion.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::artifact;
use crate::error::{Error, Result};

/// Paths of the artifacts produced for one device identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub binary: PathBuf,
    pub header: PathBuf,
}

impl ArtifactPaths {
    /// Paths for `identity` inside `dir`
    pub fn new(dir: &Path, identity: &str) -> Self {
        Self {
            binary: dir.join(format!("{}.{}", identity, artifact::BIN_EXTENSION)),
            header: dir.join(format!("{}{}", identity, artifact::HEADER_SUFFIX)),
        }
    }
}

/// Create `path` and write `data` to it.
///
/// Fails with [`Error::Collision`] if the file already exists.
pub fn write_new(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => Error::Collision {
                path: path.to_path_buf(),
            },
            _ => Error::io(path, e),
        })?;

    file.write_all(data)
        .and_then(|_| file.flush())
        .map_err(|e| Error::io(path, e))
}

/// Remove an artifact written earlier in a run that is being abandoned.
pub fn remove(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Render `data` as a C array definition.
///
/// ```text
/// unsigned char production_config[] = {
/// 0xe7, 0x37, ...
/// };
/// unsigned int production_config_len = 207;
/// ```
pub fn render_c_array(data: &[u8]) -> String {
    let mut out = String::from("unsigned char production_config[] = {\n");
    for (i, byte) in data.iter().enumerate() {
        let _ = write!(out, "0x{:02x}, ", byte);
        if (i + 1) % artifact::HEADER_BYTES_PER_LINE == 0 {
            out.push('\n');
        }
    }
    let _ = write!(
        out,
        "}};\nunsigned int production_config_len = {};",
        data.len()
    );
    out
}
