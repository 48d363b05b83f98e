//! Comma-delimited device table
//!
//! The first line names the fields; every following line describes one device.
//! Reading stops at the first blank line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::defaults;
use crate::error::{Error, Result};

/// Column that identifies a row when no MAC address is provisioned
pub const ID_FIELD: &str = "id";

/// Column that takes precedence as the artifact identity
pub const MAC_FIELD: &str = "mac_address";

/// One device's values, paired with the header keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRow {
    /// 1-based line number in the source table
    pub line: usize,
    pub fields: Vec<(String, String)>,
}

impl DeviceRow {
    /// Value of the `key` column
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Artifact identity: the MAC address when one is set, otherwise the id.
    ///
    /// The identity names the output files, so it must be a plain file name.
    pub fn identity(&self) -> Result<&str> {
        let (field, identity) = match self.get(MAC_FIELD) {
            Some(mac) if !mac.is_empty() && mac != defaults::NULL => (MAC_FIELD, mac),
            _ => {
                let id = self
                    .get(ID_FIELD)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        Error::configuration(
                            ID_FIELD,
                            format!("line {} has neither a mac_address nor an id", self.line),
                        )
                    })?;
                (ID_FIELD, id)
            }
        };

        if identity.contains(['/', '\\', '\0']) || identity.contains("..") {
            return Err(Error::validation(
                field,
                identity,
                format!("line {}: not usable as a file name", self.line),
            ));
        }
        Ok(identity)
    }

    /// Pairs handed to the record builder; the id column only names the row.
    pub fn record_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter(|(k, _)| k != ID_FIELD)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Parsed device table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTable {
    pub header: Vec<String>,
    pub rows: Vec<DeviceRow>,
}

impl DeviceTable {
    /// Open and parse a table file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            Error::Io { source, .. } => Error::io(path, source),
            other => other,
        })
    }

    /// Parse a table from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines().enumerate();

        let header = match lines.next() {
            Some((_, line)) => split_line(&line.map_err(|e| Error::io("<table>", e))?),
            None => return Err(Error::configuration("csv", "table is empty")),
        };
        if header.iter().all(String::is_empty) {
            return Err(Error::configuration("csv", "header row is empty"));
        }

        let mut rows = Vec::new();
        for (index, line) in lines {
            let line = line.map_err(|e| Error::io("<table>", e))?;
            if line.trim().is_empty() {
                break;
            }

            let line_no = index + 1;
            let values = split_line(&line);
            if values.len() != header.len() {
                return Err(Error::configuration(
                    "csv",
                    format!(
                        "line {} has {} values for {} header fields",
                        line_no,
                        values.len(),
                        header.len()
                    ),
                ));
            }

            rows.push(DeviceRow {
                line: line_no,
                fields: header.iter().cloned().zip(values).collect(),
            });
        }

        if rows.is_empty() {
            return Err(Error::configuration("csv", "table has no device rows"));
        }

        Ok(Self { header, rows })
    }
}

fn split_line(line: &str) -> Vec<String> {
    line.trim().split(',').map(|v| v.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
id,installcode,mac_address,channel_mask_page0,manufacturer_name,manufacturer_code
1,NULL,0123456789ABCDEF,0x07FFF800,Espressif,0x131B
2,NULL,NULL,0x07FFF800,Espressif,0x131B

3,NULL,NULL,0x07FFF800,Ignored,0x131B
";

    #[test]
    fn test_parse_rows_until_blank_line() {
        let table = DeviceTable::from_reader(TABLE.as_bytes()).expect("Should parse");
        assert_eq!(table.header.len(), 6);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].line, 3);
        assert_eq!(table.rows[0].get("manufacturer_name"), Some("Espressif"));
    }

    #[test]
    fn test_identity() {
        let table = DeviceTable::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(table.rows[0].identity().unwrap(), "0123456789ABCDEF");
        assert_eq!(table.rows[1].identity().unwrap(), "2");
    }

    #[test]
    fn test_record_pairs_skip_id() {
        let table = DeviceTable::from_reader(TABLE.as_bytes()).unwrap();
        let keys: Vec<&str> = table.rows[0].record_pairs().map(|(k, _)| k).collect();
        assert!(!keys.contains(&"id"));
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn test_header_only_is_rejected() {
        let result = DeviceTable::from_reader("id,installcode\n".as_bytes());
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_short_row_is_rejected() {
        let result = DeviceTable::from_reader("id,installcode\n1\n".as_bytes());
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_identity_must_be_a_file_name() {
        for id in ["../x", "a/b", "a\\b", ".."] {
            let table =
                DeviceTable::from_reader(format!("id,mac_address\n{},NULL\n", id).as_bytes())
                    .unwrap();
            assert!(
                matches!(table.rows[0].identity(), Err(Error::Validation { .. })),
                "{} should be rejected",
                id
            );
        }

        let table = DeviceTable::from_reader("id,mac_address\n1,../../etc\n".as_bytes()).unwrap();
        assert!(matches!(
            table.rows[0].identity(),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_missing_identity() {
        let table = DeviceTable::from_reader("installcode\nNULL\n".as_bytes()).unwrap();
        assert!(matches!(
            table.rows[0].identity(),
            Err(Error::Configuration { .. })
        ));
    }
}
