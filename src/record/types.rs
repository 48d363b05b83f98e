//! Production config record and manufacturer block
//!
//! # Artifact Format
//!
//! ```text
//! [magic: 4][crc32: u32 LE][length: u16 LE][version: u16 LE][tables][manufacturer]
//! ```
//!
//! Tables, in order:
//!
//! | Field              | Type      | Bytes |
//! |--------------------|-----------|-------|
//! | channel_mask_table | u32 x 5   | 20    |
//! | mac_address        | u8 x 8    | 8     |
//! | tx_power_table     | i8 x 135  | 135   |
//! | options            | u8        | 1     |
//! | install_code       | u8 x 18   | 18    |
//!
//! Manufacturer block: `[version: u16 LE][code: u16 LE][name: u8 x n]`, no
//! terminator.
//!
//! `length` is always the structural size of the record (190) and does not
//! include the manufacturer block. `crc32` covers every byte after itself.

use crate::codec::field::{encode_text, put_all, Extent, FieldSpec, Scalar};
use crate::config::{install_code, manufacturer, record};
use heapless::Vec as BoundedVec;

/// Fixed-layout production config record (version 2.0)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    pub crc: u32,
    pub length: u16,
    pub version: u16,
    /// Slot 0 is page 0; slots 1-4 hold `(page << 27) | mask` entries
    pub channel_mask_table: [u32; record::CHANNEL_PAGE_SLOTS],
    /// EUI64, least significant byte first
    pub mac_address: [u8; record::MAC_ADDRESS_LEN],
    /// dBm, indexed `[slot * 27 + channel]`
    pub tx_power_table: [i8; record::TX_POWER_CELLS],
    /// Low bits: install-code length class
    pub options: u8,
    /// Key, CRC-16 trailer, then zero padding
    pub install_code: [u8; install_code::STORAGE_LEN],
}

impl ConfigRecord {
    /// Empty record with the current version
    pub fn new() -> Self {
        Self {
            crc: 0,
            length: record::STRUCTURAL_SIZE,
            version: record::VERSION,
            channel_mask_table: [0; record::CHANNEL_PAGE_SLOTS],
            mac_address: [0; record::MAC_ADDRESS_LEN],
            tx_power_table: [0; record::TX_POWER_CELLS],
            options: 0,
            install_code: [0; install_code::STORAGE_LEN],
        }
    }

    /// Index of `(slot, channel)` in the TX power table
    pub fn tx_power_index(slot: usize, channel: usize) -> usize {
        slot * record::CHANNELS_PER_PAGE + channel
    }
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Manufacturer metadata appended after the record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerBlock {
    pub version: u16,
    pub code: u16,
    /// One byte per character
    pub name: BoundedVec<u8, { manufacturer::MAX_NAME_LEN }>,
}

impl ManufacturerBlock {
    /// Block with code 0 and an empty name
    pub fn new() -> Self {
        Self {
            version: manufacturer::VERSION,
            code: 0,
            name: BoundedVec::new(),
        }
    }

    /// Replace the name, one byte per character.
    ///
    /// Returns `Err(chars)` when the name has more than 16 characters.
    pub fn set_name(&mut self, name: &str) -> Result<(), usize> {
        let chars = name.chars().count();
        if chars > manufacturer::MAX_NAME_LEN {
            return Err(chars);
        }
        self.name.clear();
        self.name
            .extend_from_slice(&encode_text(name))
            .map_err(|_| chars)
    }

    /// Encoded size of the block
    pub fn encoded_len(&self) -> usize {
        4 + self.name.len()
    }
}

impl Default for ManufacturerBlock {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything provisioned for one device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    pub record: ConfigRecord,
    pub manufacturer: ManufacturerBlock,
}

/// Fields covered by the record CRC, in wire order
pub const RECORD_SCHEMA: &[FieldSpec<ConfigRecord>] = &[
    FieldSpec {
        name: "length",
        width: 2,
        extent: Extent::Fixed(1),
        emit: |r, out| r.length.put_le(out),
    },
    FieldSpec {
        name: "version",
        width: 2,
        extent: Extent::Fixed(1),
        emit: |r, out| r.version.put_le(out),
    },
    FieldSpec {
        name: "channel_mask_table",
        width: 4,
        extent: Extent::Fixed(record::CHANNEL_PAGE_SLOTS),
        emit: |r, out| put_all(&r.channel_mask_table, out),
    },
    FieldSpec {
        name: "mac_address",
        width: 1,
        extent: Extent::Fixed(record::MAC_ADDRESS_LEN),
        emit: |r, out| put_all(&r.mac_address, out),
    },
    FieldSpec {
        name: "tx_power_table",
        width: 1,
        extent: Extent::Fixed(record::TX_POWER_CELLS),
        emit: |r, out| put_all(&r.tx_power_table, out),
    },
    FieldSpec {
        name: "options",
        width: 1,
        extent: Extent::Fixed(1),
        emit: |r, out| r.options.put_le(out),
    },
    FieldSpec {
        name: "install_code",
        width: 1,
        extent: Extent::Fixed(install_code::STORAGE_LEN),
        emit: |r, out| put_all(&r.install_code, out),
    },
];

/// Manufacturer block, in wire order
pub const MANUFACTURER_SCHEMA: &[FieldSpec<ManufacturerBlock>] = &[
    FieldSpec {
        name: "version",
        width: 2,
        extent: Extent::Fixed(1),
        emit: |m, out| m.version.put_le(out),
    },
    FieldSpec {
        name: "code",
        width: 2,
        extent: Extent::Fixed(1),
        emit: |m, out| m.code.put_le(out),
    },
    FieldSpec {
        name: "name",
        width: 1,
        extent: Extent::Variable,
        emit: |m, out| out.extend_from_slice(&m.name),
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::field::fixed_size;

    #[test]
    fn test_schema_matches_structural_size() {
        // crc is written separately from the schema
        assert_eq!(
            fixed_size(RECORD_SCHEMA) + 4,
            record::STRUCTURAL_SIZE as usize
        );
    }

    #[test]
    fn test_new_record_header() {
        let record = ConfigRecord::new();
        assert_eq!(record.length, 190);
        assert_eq!(record.version, 2);
        assert!(record.tx_power_table.iter().all(|&p| p == 0));
    }

    #[test]
    fn test_manufacturer_name_limit() {
        let mut block = ManufacturerBlock::new();
        assert!(block.set_name("0123456789ABCDEF").is_ok());
        assert_eq!(block.name.len(), 16);
        assert_eq!(block.set_name("0123456789ABCDEFG"), Err(17));
        // Previous name survives a rejected update
        assert_eq!(block.name.as_slice(), b"0123456789ABCDEF");
    }

    #[test]
    fn test_tx_power_index() {
        assert_eq!(ConfigRecord::tx_power_index(0, 0), 0);
        assert_eq!(ConfigRecord::tx_power_index(4, 26), 134);
    }
}
