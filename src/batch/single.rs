//! Single device described directly by field values
//!
//! The values are rendered into a one-row table file and fed through the same
//! path as a user-supplied table. The file lives in a [`NamedTempFile`] and is
//! removed when it drops, whether or not the batch succeeded.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::config::defaults;
use crate::error::{Error, Result};

/// Field values for one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleDevice {
    pub installcode: String,
    pub mac_address: String,
    pub channel_mask: u32,
    pub manufacturer_name: String,
    pub manufacturer_code: u32,
}

impl Default for SingleDevice {
    fn default() -> Self {
        Self {
            installcode: defaults::NULL.to_string(),
            mac_address: defaults::NULL.to_string(),
            channel_mask: defaults::CHANNEL_MASK,
            manufacturer_name: defaults::MANUFACTURER_NAME.to_string(),
            manufacturer_code: defaults::MANUFACTURER_CODE,
        }
    }
}

impl SingleDevice {
    /// Header and value lines of the synthesised table.
    ///
    /// Values are written unquoted, so a comma or line break in a text field
    /// is rejected.
    pub fn to_table(&self) -> Result<String> {
        for (field, value) in [
            ("installcode", &self.installcode),
            ("mac_address", &self.mac_address),
            ("manufacturer_name", &self.manufacturer_name),
        ] {
            if value.contains([',', '\n', '\r']) {
                return Err(Error::validation(
                    field,
                    value,
                    "must not contain a comma or line break",
                ));
            }
        }

        Ok(format!(
            "id,installcode,mac_address,channel_mask_page0,manufacturer_name,manufacturer_code\n\
             {},{},{},{:#x},{},{:#x}\n",
            defaults::SINGLE_DEVICE_ID,
            self.installcode,
            self.mac_address,
            self.channel_mask,
            self.manufacturer_name,
            self.manufacturer_code,
        ))
    }

    /// Write the synthesised table into `dir`.
    ///
    /// The returned handle owns the file; dropping it deletes the file.
    pub fn write_table(&self, dir: &Path) -> Result<NamedTempFile> {
        let table = self.to_table()?;
        let mut file = tempfile::Builder::new()
            .prefix("single_device")
            .suffix(".csv")
            .tempfile_in(dir)
            .map_err(|e| Error::io(dir, e))?;

        file.write_all(table.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| Error::io(file.path(), e))?;
        Ok(file)
    }
}
