//! Field Parsers
//!
//! Pure conversions of single storcli table cells into normalized values.

use crate::domain::model::{DriveGroup, IoPolicy, PhysicalDriveState, VirtualDriveState, WriteCache};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

// =============================================================================
// Constants
// =============================================================================

const SIZE_UNITS: &[(&str, u64)] = &[
    ("KB", 1 << 10),
    ("MB", 1 << 20),
    ("GB", 1 << 30),
    ("TB", 1 << 40),
];

const RAID_LEVELS: &[(&str, &str)] = &[
    ("RAID0", "0"),
    ("RAID1", "1"),
    ("RAID5", "5"),
    ("RAID6", "6"),
    ("RAID10", "10"),
    ("RAID50", "50"),
    ("RAID60", "60"),
];

static SECTOR_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([1-9][0-9]*)([A-Za-z]*)$").expect("valid sector size regex"));

static CACHE_FLAGS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(n?r)(w[bt])([cd])$").expect("valid cache flags regex"));

static DRIVE_GROUP_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\s*,\s*\d+)+$").expect("valid drive group regex"));

// =============================================================================
// Cell helpers
// =============================================================================

/// Render a scalar cell as a trimmed string
pub fn cell_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse an integer cell given as number or numeric string
pub fn parse_u32(field: &'static str, value: &Value) -> Result<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| Error::field_parse(field, value.to_string()))
}

// =============================================================================
// Sizes
// =============================================================================

/// Convert "<number> <unit>" into bytes, units matched case-insensitively
pub fn parse_drive_size(raw: &str) -> Result<u64> {
    let mut parts = raw.split_whitespace();
    let (number, unit) = match (parts.next(), parts.next(), parts.next()) {
        (Some(n), Some(u), None) => (n, u),
        _ => return Err(Error::field_parse("size", raw)),
    };

    let multiplier = SIZE_UNITS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(unit))
        .map(|(_, m)| *m)
        .ok_or_else(|| Error::field_parse("size unit", raw))?;

    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| Error::field_parse("size", raw));
    }

    let value: f64 = number
        .parse()
        .map_err(|_| Error::field_parse("size", raw))?;
    if !value.is_finite() || value < 0.0 {
        return Err(Error::field_parse("size", raw));
    }
    let bytes = value * multiplier as f64;
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(Error::field_parse("size", raw));
    }
    Ok(bytes as u64)
}

/// Convert a sector size such as "512B" or "4 KB" into bytes
pub fn parse_sector_size(raw: &str) -> Result<u64> {
    let compact: String = raw.split_whitespace().collect();
    let caps = SECTOR_SIZE_RE
        .captures(&compact)
        .ok_or_else(|| Error::field_parse("sector size", raw))?;

    let value: u64 = caps[1]
        .parse()
        .map_err(|_| Error::field_parse("sector size", raw))?;
    match caps[2].to_uppercase().as_str() {
        "" | "B" => Ok(value),
        "KB" => value
            .checked_mul(1024)
            .ok_or_else(|| Error::field_parse("sector size", raw)),
        _ => Err(Error::field_parse("sector size unit", raw)),
    }
}

// =============================================================================
// Drive groups
// =============================================================================

/// Parse the `DG` column of a physical drive.
///
/// `-` means unallocated. Anything that is neither an integer nor a
/// comma separated integer list is kept verbatim.
pub fn parse_drive_group(value: &Value) -> Result<Option<DriveGroup>> {
    let raw = match value {
        Value::Null => return Ok(None),
        Value::Number(_) => return parse_u32("DG", value).map(|g| Some(DriveGroup::Single(g))),
        Value::String(s) => s.trim(),
        other => return Err(Error::field_parse("DG", other.to_string())),
    };

    if raw == "-" || raw.is_empty() {
        return Ok(None);
    }
    if let Ok(group) = raw.parse::<u32>() {
        return Ok(Some(DriveGroup::Single(group)));
    }
    if DRIVE_GROUP_LIST_RE.is_match(raw) {
        let mut groups = raw
            .split(',')
            .map(|g| g.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| Error::field_parse("DG", raw))?;
        groups.sort_unstable();
        groups.dedup();
        return Ok(Some(DriveGroup::Multiple(groups)));
    }
    Ok(Some(DriveGroup::Opaque(raw.to_string())))
}

/// Split the `DG/VD` column; a bare integer stands for both values
pub fn parse_dg_vd(value: &Value) -> Result<(u32, u32)> {
    if let Value::Number(_) = value {
        let id = parse_u32("DG/VD", value)?;
        return Ok((id, id));
    }

    let raw = value
        .as_str()
        .ok_or_else(|| Error::field_parse("DG/VD", value.to_string()))?
        .trim();
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|_| Error::field_parse("DG/VD", raw))
    };

    match raw.split_once('/') {
        Some((dg, vd)) => Ok((parse(dg)?, parse(vd)?)),
        None => {
            let id = parse(raw)?;
            Ok((id, id))
        }
    }
}

// =============================================================================
// Cache flags and RAID levels
// =============================================================================

/// Decoded virtual drive cache column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheFlags {
    pub read_ahead: bool,
    pub write_cache: WriteCache,
    pub io_policy: IoPolicy,
}

/// Parse a cache column such as `RWTD` or `NRWBC`
pub fn parse_cache_flags(raw: &str) -> Result<CacheFlags> {
    let flags = raw.trim().to_lowercase();
    let caps = CACHE_FLAGS_RE
        .captures(&flags)
        .ok_or_else(|| Error::field_parse("cache flags", raw))?;

    let write_cache = match &caps[2] {
        "wb" => WriteCache::WriteBack,
        _ => WriteCache::WriteThrough,
    };
    let io_policy = match &caps[3] {
        "d" => IoPolicy::Direct,
        _ => IoPolicy::Cached,
    };

    Ok(CacheFlags {
        read_ahead: &caps[1] == "r",
        write_cache,
        io_policy,
    })
}

/// Normalize a vendor RAID label; unknown labels pass through unchanged
pub fn parse_raid_level(raw: &str) -> String {
    let level = raw.trim().to_uppercase();
    RAID_LEVELS
        .iter()
        .find(|(label, _)| *label == level)
        .map(|(_, normalized)| normalized.to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

// =============================================================================
// States
// =============================================================================

pub fn parse_physical_drive_state(raw: &str) -> PhysicalDriveState {
    match raw.trim() {
        "Onln" => PhysicalDriveState::Online,
        "Offln" => PhysicalDriveState::Offline,
        "Rbld" => PhysicalDriveState::Rebuild,
        "UGood" => PhysicalDriveState::UnconfiguredGood,
        "UBad" => PhysicalDriveState::UnconfiguredBad,
        "DHS" => PhysicalDriveState::DedicatedHotSpare,
        "GHS" => PhysicalDriveState::GlobalHotSpare,
        other => {
            warn!("Unknown physical drive state: {}", other);
            PhysicalDriveState::Other(other.to_lowercase())
        }
    }
}

pub fn parse_virtual_drive_state(raw: &str) -> VirtualDriveState {
    match raw.trim() {
        "Optl" => VirtualDriveState::Optimal,
        "OfLn" => VirtualDriveState::Offline,
        "Pdgd" => VirtualDriveState::PartiallyDegraded,
        "Rec" => VirtualDriveState::Recovery,
        "Dgrd" => VirtualDriveState::Degraded,
        other => {
            warn!("Unknown virtual drive state: {}", other);
            VirtualDriveState::Other(other.to_lowercase())
        }
    }
}

/// `ON`/`OFF` switch; `-` and anything else mean not reported
pub fn parse_on_off(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "on" | "yes" => Some(true),
        "off" | "no" => Some(false),
        _ => None,
    }
}
