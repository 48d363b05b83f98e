//! Layout and provisioning constants for the Zigbee production config record

/// Binary artifact framing
pub mod artifact {
    /// Leading magic that precedes the CRC-32 header
    pub const MAGIC: [u8; 4] = [0xE7, 0x37, 0xDD, 0xF6];

    /// Extension of the binary artifact
    pub const BIN_EXTENSION: &str = "bin";

    /// Sub-directory of the output root that receives the artifacts
    pub const BIN_DIR: &str = "bin";

    /// Suffix of the companion C array artifact
    pub const HEADER_SUFFIX: &str = "-output_product_cfg.h";

    /// Bytes per line in the companion C array
    pub const HEADER_BYTES_PER_LINE: usize = 16;
}

/// Production config record layout (version 2.0)
pub mod record {
    /// Record version written into the header
    pub const VERSION: u16 = 0x0002;

    /// Number of channel page slots (page 0 plus pages 27-31)
    pub const CHANNEL_PAGE_SLOTS: usize = 5;

    /// Channels calibrated per page slot
    pub const CHANNELS_PER_PAGE: usize = 27;

    /// Cells in the TX power table
    pub const TX_POWER_CELLS: usize = CHANNEL_PAGE_SLOTS * CHANNELS_PER_PAGE;

    /// EUI64 length in bytes
    pub const MAC_ADDRESS_LEN: usize = 8;

    /// Header: crc (4) + length (2) + version (2)
    pub const HEADER_SIZE: usize = 8;

    /// Fixed structural size written into the `length` field.
    ///
    /// 8 header + 20 channel masks + 8 mac + 135 tx power + 1 options + 18 install code
    pub const STRUCTURAL_SIZE: u16 = (HEADER_SIZE
        + CHANNEL_PAGE_SLOTS * 4
        + MAC_ADDRESS_LEN
        + TX_POWER_CELLS
        + 1
        + super::install_code::STORAGE_LEN) as u16;
}

/// Radio channel pages
pub mod channel {
    /// Channels 11-26 on page 0
    pub const PAGE0_MASK: u32 = 0x07FF_F800;

    /// Channel bits of a sub-GHz page mask
    pub const PAGE_BITS: u32 = 0x07FF_FFFF;

    /// Page 29 only carries five channels
    pub const PAGE29_BITS: u32 = 0x0000_001F;

    /// Shift of the page number inside a page mask entry
    pub const PAGE_SHIFT: u32 = 27;

    /// First sub-GHz page
    pub const FIRST_SUBGHZ_PAGE: u32 = 27;

    /// Last sub-GHz page
    pub const LAST_SUBGHZ_PAGE: u32 = 31;
}

/// Transmit power calibration
pub mod tx_power {
    pub const MIN_DBM: i64 = -40;
    pub const MAX_DBM: i64 = 50;

    /// Marks a cell as "not calibrated"; never clamped
    pub const INVALID: i64 = 0x7F;
}

/// Commissioning install code
pub mod install_code {
    /// Maximum key length
    pub const KEY_SIZE: usize = 16;

    /// Trailing CRC-16 length
    pub const CRC_SIZE: usize = 2;

    /// Storage reserved in the record
    pub const STORAGE_LEN: usize = KEY_SIZE + CRC_SIZE;

    /// Supported payload lengths; the index is written into `options`
    pub const LENGTH_CLASSES: [usize; 4] = [6, 8, 12, 16];

    /// Bits of `options` holding the length class index
    pub const OPTIONS_CLASS_MASK: u8 = 0x03;
}

/// Manufacturer block
pub mod manufacturer {
    /// Application config version written ahead of the manufacturer code
    pub const VERSION: u16 = 0x0001;

    /// Maximum name length in characters
    pub const MAX_NAME_LEN: usize = 16;
}

/// Values used when a device is described directly on the command line
pub mod defaults {
    pub const CHANNEL_MASK: u32 = super::channel::PAGE0_MASK;
    pub const MANUFACTURER_NAME: &str = "Espressif";
    pub const MANUFACTURER_CODE: u32 = 0x131B;

    /// Placeholder accepted for optional string fields
    pub const NULL: &str = "NULL";

    /// Identity of the single synthesised device
    pub const SINGLE_DEVICE_ID: &str = "1";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_size() {
        assert_eq!(record::STRUCTURAL_SIZE, 190);
    }

    #[test]
    fn test_tx_power_cells() {
        assert_eq!(record::TX_POWER_CELLS, 135);
    }
}
