//! Checksums shared with the firmware's production config loader
//!
//! - Install codes carry a CRC-16/X-25 trailer (reflected poly 0x8408, init
//!   0xFFFF, output complemented), stored little-endian.
//! - The record carries a CRC-32/IEEE (reflected poly 0xEDB88320, init
//!   0xFFFFFFFF, output complemented) over everything after the magic and the
//!   CRC field itself.
//!
//! Both parameter sets are a wire contract with the firmware.

use crc::{Crc, CRC_16_IBM_SDLC, CRC_32_ISO_HDLC};

const INSTALL_CODE_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);
const RECORD_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC-16/X-25 of an install-code payload, as stored in its trailer.
pub fn install_code_crc(payload: &[u8]) -> u16 {
    INSTALL_CODE_CRC.checksum(payload)
}

/// CRC-32 of a record payload.
pub fn record_crc(payload: &[u8]) -> u32 {
    RECORD_CRC.checksum(payload)
}

/// Split an install code into payload and trailer and check the trailer.
///
/// Returns `Ok(())` or `Err((expected, found))`.
pub fn verify_install_code(code: &[u8]) -> Result<(), (u16, u16)> {
    if code.len() < 2 {
        return Err((install_code_crc(&[]), 0));
    }
    let (payload, trailer) = code.split_at(code.len() - 2);
    let expected = install_code_crc(payload);
    let found = u16::from_le_bytes([trailer[0], trailer[1]]);
    if expected == found {
        Ok(())
    } else {
        Err((expected, found))
    }
}
