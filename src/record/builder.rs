//! Record builder for device key/value rows
//!
//! Folds `(key, value)` pairs into a fresh [`DeviceConfig`]. Pair order does
//! not change the result:
//!
//! - TX power keys overlap, so they are collected during the fold and applied
//!   in [`RecordBuilder::finish`] from coarse to fine: `default_mac_tx_power`,
//!   then `default_mac_tx_power_page<N>`, then `mac_tx_power`.
//! - `channel_mask_page30` and `channel_mask_page31` share one mask slot; a
//!   row setting both is a configuration error.
//! - Every other key owns its own region of the record.
//!
//! Keys are resolved through `ROUTES`, a static table mapping either an exact
//! key or a `<prefix><page>` key to its handler.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::codec::checksum::verify_install_code;
use crate::config::{channel, defaults, install_code, record, tx_power};
use crate::error::{Error, Result};
use crate::record::types::{ConfigRecord, DeviceConfig};

type FieldHandler = fn(&mut Draft, &str, &str) -> Result<()>;
type PagedHandler = fn(&mut Draft, &str, u32, &str) -> Result<()>;

/// How a key is matched
#[derive(Clone, Copy)]
enum Route {
    /// Key must equal the name
    Exact(&'static str, FieldHandler),
    /// Key is the name followed by a decimal channel page
    Paged(&'static str, PagedHandler),
}

/// Key lookup table
const ROUTES: &[Route] = &[
    Route::Paged("channel_mask_page", set_channel_mask),
    Route::Exact("mac_address", set_mac_address),
    Route::Exact("default_mac_tx_power", set_default_tx_power),
    Route::Paged("default_mac_tx_power_page", set_page_tx_power),
    Route::Exact("mac_tx_power", set_channel_tx_power),
    Route::Exact("installcode", set_install_code),
    Route::Exact("manufacturer_name", set_manufacturer_name),
    Route::Exact("manufacturer_code", set_manufacturer_code),
];

/// Result of applying one pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Stored,
    /// Key not recognised; record unchanged
    Skipped,
}

/// Built device config plus the keys that were ignored
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub config: DeviceConfig,
    pub skipped: Vec<String>,
}

/// TX power values held back until the row is complete
#[derive(Debug, Default)]
struct TxPowerLayers {
    table: Option<i8>,
    pages: [Option<i8>; record::CHANNEL_PAGE_SLOTS],
    /// Table index to power
    cells: BTreeMap<usize, i8>,
}

impl TxPowerLayers {
    fn apply(&self, table: &mut [i8; record::TX_POWER_CELLS]) {
        if let Some(power) = self.table {
            table.fill(power);
        }
        for (slot, power) in self.pages.iter().enumerate() {
            if let Some(power) = *power {
                let start = ConfigRecord::tx_power_index(slot, 0);
                table[start..start + record::CHANNELS_PER_PAGE].fill(power);
            }
        }
        for (&index, &power) in &self.cells {
            table[index] = power;
        }
    }
}

/// Config under construction
#[derive(Debug, Default)]
struct Draft {
    config: DeviceConfig,
    tx_power: TxPowerLayers,
    /// Page that wrote the mask slot shared by pages 30 and 31
    shared_mask_page: Option<u32>,
}

/// Accumulates one device's config
pub struct RecordBuilder {
    draft: Draft,
    skipped: Vec<String>,
}

impl RecordBuilder {
    /// Create a builder holding an empty device config
    pub fn new() -> Self {
        Self {
            draft: Draft::default(),
            skipped: Vec::new(),
        }
    }

    /// Build a config from a sequence of pairs, stopping at the first error.
    pub fn build<'a, I>(pairs: I) -> Result<BuildOutcome>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let builder = pairs
            .into_iter()
            .try_fold(Self::new(), |mut builder, (key, value)| {
                builder.apply(key, value)?;
                Ok::<_, Error>(builder)
            })?;
        Ok(builder.finish())
    }

    /// Apply one key/value pair.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<Applied> {
        let key = key.trim();
        let value = value.trim();

        match resolve(key) {
            Some(Resolved::Field(handler)) => handler(&mut self.draft, key, value)?,
            Some(Resolved::Paged(handler, page)) => handler(&mut self.draft, key, page, value)?,
            Some(Resolved::BadPage(suffix)) => {
                return Err(Error::configuration(
                    key,
                    format!("`{}` is not a channel page number", suffix),
                ));
            }
            None => {
                warn!("Skipping unrecognised key `{}` = `{}`", key, value);
                self.skipped.push(key.to_string());
                return Ok(Applied::Skipped);
            }
        }

        debug!("Applied {} = {}", key, value);
        Ok(Applied::Stored)
    }

    /// Apply the collected TX power keys and return the config.
    pub fn finish(self) -> BuildOutcome {
        let Draft {
            mut config,
            tx_power,
            ..
        } = self.draft;
        tx_power.apply(&mut config.record.tx_power_table);

        BuildOutcome {
            config,
            skipped: self.skipped,
        }
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

enum Resolved<'k> {
    Field(FieldHandler),
    Paged(PagedHandler, u32),
    BadPage(&'k str),
}

fn resolve(key: &str) -> Option<Resolved<'_>> {
    // Exact names win over prefixes: `default_mac_tx_power` must not be read
    // as a paged key with an empty page
    for route in ROUTES {
        if let Route::Exact(name, handler) = route {
            if *name == key {
                return Some(Resolved::Field(*handler));
            }
        }
    }

    // Longest prefix first so `default_mac_tx_power_page` is not shadowed
    let mut best: Option<(&'static str, PagedHandler)> = None;
    for route in ROUTES {
        if let Route::Paged(prefix, handler) = route {
            if key.starts_with(*prefix) && best.map_or(true, |(b, _)| prefix.len() > b.len()) {
                best = Some((*prefix, *handler));
            }
        }
    }

    let (prefix, handler) = best?;
    let suffix = &key[prefix.len()..];
    match suffix.parse::<u32>() {
        Ok(page) if suffix.bytes().all(|b| b.is_ascii_digit()) => {
            Some(Resolved::Paged(handler, page))
        }
        _ => Some(Resolved::BadPage(suffix)),
    }
}

// --- Value parsing ---

/// Parse a hex number with optional `0x` prefix.
fn parse_hex_u32(key: &str, value: &str) -> Result<u32> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u32::from_str_radix(digits, 16)
        .map_err(|_| Error::validation(key, value, "expected a 32-bit hexadecimal number"))
}

/// Decode an even-length hex string into bytes.
fn parse_hex_bytes(key: &str, value: &str) -> Result<Vec<u8>> {
    if value.len() % 2 != 0 || !value.is_ascii() {
        return Err(Error::validation(key, value, "expected an even number of hex digits"));
    }
    (0..value.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&value[i..i + 2], 16)
                .map_err(|_| Error::validation(key, value, "contains a non-hex digit"))
        })
        .collect()
}

/// Parse a decimal integer; magnitudes past `i64` saturate.
fn parse_decimal(key: &str, value: &str, what: &str) -> Result<i64> {
    let digits = value.trim();
    digits.parse::<i64>().or_else(|_| {
        let unsigned = digits.strip_prefix('-').unwrap_or(digits);
        let unsigned = unsigned.strip_prefix('+').unwrap_or(unsigned);
        if !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit()) {
            Ok(if digits.starts_with('-') { i64::MIN } else { i64::MAX })
        } else {
            Err(Error::validation(
                key,
                value,
                format!("{} is not a decimal integer", what),
            ))
        }
    })
}

/// Clamp a dBm value into the calibration range, leaving the sentinel intact.
pub fn clamp_tx_power(dbm: i64) -> i8 {
    if dbm == tx_power::INVALID {
        return tx_power::INVALID as i8;
    }
    dbm.clamp(tx_power::MIN_DBM, tx_power::MAX_DBM) as i8
}

/// TX power table slot for a channel page: page 0 is slot 0, page `N` is `N - 27`.
fn tx_power_slot(key: &str, value: &str, page: u32) -> Result<usize> {
    let slot = match page {
        0 => Some(0),
        p => p.checked_sub(channel::FIRST_SUBGHZ_PAGE),
    };
    match slot {
        Some(slot) if (slot as usize) < record::CHANNEL_PAGE_SLOTS => Ok(slot as usize),
        _ => Err(Error::validation(key, value, format!("bad channel page {}", page))),
    }
}

// --- Handlers ---

fn set_channel_mask(draft: &mut Draft, key: &str, page: u32, value: &str) -> Result<()> {
    let mask = parse_hex_u32(key, value)?;
    let table = &mut draft.config.record.channel_mask_table;

    match page {
        0 => table[0] = mask & channel::PAGE0_MASK,
        channel::FIRST_SUBGHZ_PAGE..=channel::LAST_SUBGHZ_PAGE => {
            // Pages 30 and 31 share the last slot
            let slot = ((page - channel::FIRST_SUBGHZ_PAGE) as usize + 1)
                .min(record::CHANNEL_PAGE_SLOTS - 1);
            if slot == record::CHANNEL_PAGE_SLOTS - 1 {
                match draft.shared_mask_page {
                    Some(other) if other != page => {
                        return Err(Error::configuration(
                            key,
                            format!(
                                "channel_mask_page{} is also set and both use mask slot {}",
                                other, slot
                            ),
                        ));
                    }
                    _ => draft.shared_mask_page = Some(page),
                }
            }

            let bits = if page == 29 {
                channel::PAGE29_BITS
            } else {
                channel::PAGE_BITS
            };
            table[slot] = (page << channel::PAGE_SHIFT) | (mask & bits);
        }
        _ => {
            return Err(Error::configuration(
                key,
                format!("unknown channel page {}", page),
            ));
        }
    }
    Ok(())
}

fn set_mac_address(draft: &mut Draft, key: &str, value: &str) -> Result<()> {
    if value == defaults::NULL {
        return Ok(());
    }
    if value.len() != record::MAC_ADDRESS_LEN * 2 {
        return Err(Error::validation(key, value, "expected 16 hex characters"));
    }
    let bytes = parse_hex_bytes(key, value)?;
    for (i, byte) in bytes.into_iter().enumerate() {
        draft.config.record.mac_address[record::MAC_ADDRESS_LEN - 1 - i] = byte;
    }
    Ok(())
}

fn set_default_tx_power(draft: &mut Draft, key: &str, value: &str) -> Result<()> {
    let power = clamp_tx_power(parse_decimal(key, value, "tx power")?);
    draft.tx_power.table = Some(power);
    Ok(())
}

fn set_page_tx_power(draft: &mut Draft, key: &str, page: u32, value: &str) -> Result<()> {
    let power = clamp_tx_power(parse_decimal(key, value, "tx power")?);
    let slot = tx_power_slot(key, value, page)?;
    draft.tx_power.pages[slot] = Some(power);
    Ok(())
}

fn set_channel_tx_power(draft: &mut Draft, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = value.split(',').collect();
    let [page, chan, power] = parts.as_slice() else {
        return Err(Error::validation(key, value, "expected `page,channel,power`"));
    };

    let page = u32::try_from(parse_decimal(key, page, "channel page")?)
        .map_err(|_| Error::validation(key, value, format!("bad channel page {}", page)))?;
    let chan = parse_decimal(key, chan, "channel")?;
    let power = clamp_tx_power(parse_decimal(key, power, "tx power")?);

    let slot = tx_power_slot(key, value, page)?;
    if !(0..record::CHANNELS_PER_PAGE as i64).contains(&chan) {
        return Err(Error::validation(
            key,
            value,
            format!("channel {} outside [0, {})", chan, record::CHANNELS_PER_PAGE),
        ));
    }

    draft
        .tx_power
        .cells
        .insert(ConfigRecord::tx_power_index(slot, chan as usize), power);
    Ok(())
}

fn set_install_code(draft: &mut Draft, key: &str, value: &str) -> Result<()> {
    if value == defaults::NULL {
        return Ok(());
    }

    let payload_len = (value.len() / 2).checked_sub(install_code::CRC_SIZE);
    let class = payload_len
        .filter(|_| value.len() % 2 == 0)
        .and_then(|len| install_code::LENGTH_CLASSES.iter().position(|&c| c == len))
        .ok_or_else(|| {
            Error::validation(
                key,
                value,
                format!(
                    "key length must be one of {:?} bytes plus a 2-byte CRC",
                    install_code::LENGTH_CLASSES
                ),
            )
        })?;

    let bytes = parse_hex_bytes(key, value)?;
    verify_install_code(&bytes).map_err(|(expected, found)| Error::Integrity {
        field: key.to_string(),
        value: value.to_string(),
        expected,
        found,
    })?;

    let record = &mut draft.config.record;
    record.options = (record.options & !install_code::OPTIONS_CLASS_MASK) | class as u8;
    record.install_code.fill(0);
    record.install_code[..bytes.len()].copy_from_slice(&bytes);
    Ok(())
}

fn set_manufacturer_name(draft: &mut Draft, key: &str, value: &str) -> Result<()> {
    draft.config.manufacturer.set_name(value).map_err(|chars| {
        Error::validation(
            key,
            value,
            format!("{} characters, at most 16 allowed", chars),
        )
    })
}

fn set_manufacturer_code(draft: &mut Draft, key: &str, value: &str) -> Result<()> {
    let code = parse_hex_u32(key, value)?;
    draft.config.manufacturer.code = u16::try_from(code)
        .map_err(|_| Error::validation(key, value, "manufacturer code exceeds 16 bits"))?;
    Ok(())
}
