//! Layout serialiser for production config artifacts
//!
//! Packs a [`DeviceConfig`] through the record and manufacturer schemas,
//! computes the CRC-32 and prefixes the magic.

use crate::codec::checksum::record_crc;
use crate::codec::field::{fixed_size, pack_into};
use crate::config::{artifact, record};
use crate::error::{Error, Result};
use crate::record::types::{DeviceConfig, MANUFACTURER_SCHEMA, RECORD_SCHEMA};

/// Bytes in front of the CRC-covered payload: magic + crc32
pub const PREAMBLE_LEN: usize = artifact::MAGIC.len() + 4;

/// Header fields read back from an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactHeader {
    pub crc: u32,
    pub length: u16,
    pub version: u16,
    /// Size of everything after `length` and `version`
    pub body_len: usize,
}

/// Serialiser for production config artifacts
pub struct LayoutSerialiser;

impl LayoutSerialiser {
    /// Create a new layout serialiser
    pub fn new() -> Self {
        Self
    }

    /// Serialise a device config into a complete artifact.
    ///
    /// Takes the config by value: the record's `length` and `crc` are fixed
    /// here and the config is not reused afterwards.
    pub fn serialise(&self, mut config: DeviceConfig) -> Vec<u8> {
        config.record.length = record::STRUCTURAL_SIZE;

        let payload = self.payload(&config);
        config.record.crc = record_crc(&payload);

        let mut out = Vec::with_capacity(PREAMBLE_LEN + payload.len());
        out.extend_from_slice(&artifact::MAGIC);
        out.extend_from_slice(&config.record.crc.to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }

    /// CRC-covered payload: `length‖version‖tables‖manufacturer`
    pub fn payload(&self, config: &DeviceConfig) -> Vec<u8> {
        let mut payload = Vec::with_capacity(
            fixed_size(RECORD_SCHEMA) + config.manufacturer.encoded_len(),
        );
        pack_into(RECORD_SCHEMA, &config.record, &mut payload);
        pack_into(MANUFACTURER_SCHEMA, &config.manufacturer, &mut payload);
        payload
    }

    /// Check magic and CRC of a serialised artifact and return its header.
    pub fn inspect(&self, data: &[u8]) -> Result<ArtifactHeader> {
        let min_len = PREAMBLE_LEN + fixed_size(RECORD_SCHEMA);
        if data.len() < min_len {
            return Err(Error::validation(
                "artifact",
                &format!("{} bytes", data.len()),
                format!("shorter than the {}-byte minimum", min_len),
            ));
        }

        let magic = &data[..artifact::MAGIC.len()];
        if magic != &artifact::MAGIC[..] {
            return Err(Error::validation(
                "artifact",
                &format!("{:02X?}", magic),
                "bad magic",
            ));
        }

        let crc = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        let payload = &data[PREAMBLE_LEN..];
        let calculated = record_crc(payload);
        if calculated != crc {
            return Err(Error::validation(
                "artifact",
                &format!("{:#010x}", crc),
                format!("CRC-32 mismatch, calculated {:#010x}", calculated),
            ));
        }

        Ok(ArtifactHeader {
            crc,
            length: u16::from_le_bytes([payload[0], payload[1]]),
            version: u16::from_le_bytes([payload[2], payload[3]]),
            body_len: payload.len() - 4,
        })
    }
}

impl Default for LayoutSerialiser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::builder::RecordBuilder;

    fn device(pairs: &[(&str, &str)]) -> DeviceConfig {
        RecordBuilder::build(pairs.iter().copied())
            .expect("Should build")
            .config
    }

    #[test]
    fn test_serialise_reference_device() {
        let config = device(&[
            ("installcode", "83FED3407A939723A5C639B26916D505C3B5"),
            ("mac_address", "0123456789ABCDEF"),
            ("channel_mask_page0", "0x7fff800"),
            ("manufacturer_name", "Espressif"),
            ("manufacturer_code", "0x131b"),
        ]);

        let bytes = LayoutSerialiser::new().serialise(config);

        assert_eq!(bytes.len(), 207);
        assert_eq!(
            &bytes[..16],
            &[
                0xE7, 0x37, 0xDD, 0xF6, // magic
                0x3F, 0x7C, 0xC8, 0x91, // crc32
                0xBE, 0x00, // length = 190
                0x02, 0x00, // version
                0x00, 0xF8, 0xFF, 0x07, // page 0 mask
            ]
        );
        // options carries the 16-byte length class
        assert_eq!(bytes[PREAMBLE_LEN + 4 + 20 + 8 + 135], 3);
        assert_eq!(&bytes[bytes.len() - 13..bytes.len() - 9], &[0x01, 0x00, 0x1B, 0x13]);
        assert_eq!(&bytes[bytes.len() - 9..], b"Espressif");
    }

    #[test]
    fn test_length_excludes_manufacturer_block() {
        let config = device(&[("manufacturer_name", "A much longer n")]);
        let bytes = LayoutSerialiser::new().serialise(config);
        assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), 190);
    }

    #[test]
    fn test_body_size_tracks_name_length() {
        let serialiser = LayoutSerialiser::new();
        for name in ["", "A", "Espressif", "0123456789ABCDEF"] {
            let bytes = serialiser.serialise(device(&[("manufacturer_name", name)]));
            assert_eq!(bytes.len() - 12, 182 + 4 + name.len(), "name {:?}", name);

            let header = serialiser.inspect(&bytes).expect("Should verify");
            assert_eq!(header.body_len, 182 + 4 + name.len());
            assert_eq!(header.length, 190);
            assert_eq!(header.version, 2);
        }
    }

    #[test]
    fn test_crc_covers_payload_only() {
        let serialiser = LayoutSerialiser::new();
        let config = device(&[("manufacturer_name", "Acme")]);
        let payload = serialiser.payload(&config);
        let bytes = serialiser.serialise(config);

        assert_eq!(&bytes[PREAMBLE_LEN..], payload.as_slice());
        assert_eq!(
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            record_crc(&payload)
        );
    }

    #[test]
    fn test_inspect_rejects_corruption() {
        let serialiser = LayoutSerialiser::new();
        let mut bytes = serialiser.serialise(DeviceConfig::default());
        assert!(serialiser.inspect(&bytes).is_ok());

        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(matches!(
            serialiser.inspect(&bytes),
            Err(Error::Validation { .. })
        ));

        bytes[0] = 0x00;
        assert!(serialiser.inspect(&bytes).is_err());
        assert!(serialiser.inspect(&bytes[..20]).is_err());
    }
}
