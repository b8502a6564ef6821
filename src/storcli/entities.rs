//! Entity Parsers
//!
//! Map one storcli record (controller block, `PD LIST` row, `VD LIST`
//! row, enclosure row) into a normalized domain object. Mandatory cells
//! that are missing fail the whole parse instead of being defaulted.

use crate::domain::model::{
    Capabilities, Controller, ControllerKind, PhysicalDrive, VirtualDrive,
};
use crate::error::{Error, Result};
use crate::storcli::parsers::{
    cell_string, parse_cache_flags, parse_dg_vd, parse_drive_group, parse_drive_size,
    parse_on_off, parse_physical_drive_state, parse_raid_level, parse_sector_size, parse_u32,
    parse_virtual_drive_state,
};
use serde_json::Value;
use std::collections::BTreeSet;

// =============================================================================
// Record access helpers
// =============================================================================

/// Follow a key path through nested objects
fn lookup<'v>(data: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter()
        .try_fold(data, |node, key| node.get(*key))
        .filter(|v| !v.is_null())
}

/// First path that yields a scalar
fn first_string(data: &Value, paths: &[&[&str]]) -> Option<String> {
    paths
        .iter()
        .find_map(|path| lookup(data, path).and_then(cell_string))
}

fn required<'v>(record: &'v Value, key: &str) -> Result<&'v Value> {
    record
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| Error::missing(key))
}

fn required_str<'v>(record: &'v Value, key: &'static str) -> Result<&'v str> {
    required(record, key)?
        .as_str()
        .ok_or_else(|| Error::field_parse(key, record[key].to_string()))
}

/// Rows of a table such as `PD LIST`; a missing table is empty
pub fn table<'v>(data: &'v Value, name: &str) -> &'v [Value] {
    data.get(name)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

// =============================================================================
// Controllers
// =============================================================================

/// Where each controller attribute lives in a `show`/`show all` payload
struct ControllerKeys {
    model: &'static [&'static [&'static str]],
    serial_number: &'static [&'static [&'static str]],
    pci_address: &'static [&'static [&'static str]],
    sas_address: &'static [&'static [&'static str]],
    host_interface: &'static [&'static [&'static str]],
    max_cachecade_size: &'static [&'static [&'static str]],
}

const MODEL_KEYS: &[&[&str]] = &[&["Basics", "Model"], &["Product Name"], &["Basics", "Product Name"]];

const STANDARD_KEYS: ControllerKeys = ControllerKeys {
    model: MODEL_KEYS,
    serial_number: &[&["Basics", "Serial Number"], &["Serial Number"]],
    pci_address: &[&["Basics", "PCI Address"], &["PCI Address"], &["Bus", "PCI Address"]],
    sas_address: &[&["Basics", "SAS Address"], &["SAS Address"]],
    host_interface: &[&["Bus", "Host Interface"], &["Host Interface"]],
    max_cachecade_size: &[
        &["Capabilities", "Max Configurable CacheCade Size(GB)"],
        &["Capabilities", "Max Configurable CacheCade Size"],
    ],
};

const WARPDRIVE_KEYS: ControllerKeys = ControllerKeys {
    model: MODEL_KEYS,
    serial_number: &[&["Basics", "Serial Number"], &["Serial Number"]],
    pci_address: &[&["Basics", "PCI Address"], &["PCI Address"]],
    sas_address: &[&["Basics", "SAS Address"]],
    host_interface: &[&["Bus", "Host Interface"]],
    max_cachecade_size: &[],
};

/// Controller payload resolved by controller family before parsing
#[derive(Debug, Clone, Copy)]
pub enum ControllerReport<'a> {
    Standard { id: u32, data: &'a Value },
    WarpDrive { id: u32, data: &'a Value },
}

impl<'a> ControllerReport<'a> {
    /// Decide the controller family from the model string
    pub fn classify(id: u32, data: &'a Value) -> Result<Self> {
        let model = first_string(data, MODEL_KEYS).ok_or_else(|| Error::missing("Model"))?;
        Ok(match ControllerKind::from_model(&model) {
            ControllerKind::Standard => ControllerReport::Standard { id, data },
            ControllerKind::WarpDrive => ControllerReport::WarpDrive { id, data },
        })
    }

    pub fn id(&self) -> u32 {
        match self {
            ControllerReport::Standard { id, .. } | ControllerReport::WarpDrive { id, .. } => *id,
        }
    }

    pub fn data(&self) -> &'a Value {
        match self {
            ControllerReport::Standard { data, .. } | ControllerReport::WarpDrive { data, .. } => {
                *data
            }
        }
    }

    pub fn kind(&self) -> ControllerKind {
        match self {
            ControllerReport::Standard { .. } => ControllerKind::Standard,
            ControllerReport::WarpDrive { .. } => ControllerKind::WarpDrive,
        }
    }

    fn keys(&self) -> &'static ControllerKeys {
        match self {
            ControllerReport::Standard { .. } => &STANDARD_KEYS,
            ControllerReport::WarpDrive { .. } => &WARPDRIVE_KEYS,
        }
    }

    /// Identity part of the controller; enclosures and health are
    /// filled by separate queries
    pub fn to_controller(&self) -> Result<Controller> {
        let keys = self.keys();
        let data = self.data();

        let model = first_string(data, keys.model).ok_or_else(|| Error::missing("Model"))?;
        let max_cachecade_size = match keys
            .max_cachecade_size
            .iter()
            .find_map(|path| lookup(data, path))
        {
            Some(value) => parse_capacity_number(value)?,
            None => 0,
        };

        Ok(Controller {
            id: self.id(),
            pci_address: first_string(data, keys.pci_address),
            model,
            serial_number: first_string(data, keys.serial_number).unwrap_or_default(),
            sas_address: first_string(data, keys.sas_address),
            host_interface: first_string(data, keys.host_interface),
            enclosures: BTreeSet::new(),
            capabilities: Capabilities { max_cachecade_size },
            health: None,
        })
    }
}

/// Leading integer of a capability cell such as `1024` or `"1024 GB"`
fn parse_capacity_number(value: &Value) -> Result<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| Error::field_parse("max cachecade size", n.to_string())),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(char::is_ascii_digit).collect();
            digits
                .parse()
                .map_err(|_| Error::field_parse("max cachecade size", s.as_str()))
        }
        other => Err(Error::field_parse("max cachecade size", other.to_string())),
    }
}

/// Enclosure ids from an `/cN/eall show` payload
pub fn parse_enclosures(data: &Value) -> Result<BTreeSet<u32>> {
    table(data, "Properties")
        .iter()
        .map(|row| parse_u32("EID", required(row, "EID")?))
        .collect()
}

// =============================================================================
// Physical drives
// =============================================================================

/// Parse the enclosure/slot address of a `PD LIST` row
fn parse_drive_position(record: &Value) -> Result<(Option<u32>, u32)> {
    if let Some(position) = record.get("EID:Slt").filter(|v| !v.is_null()) {
        let raw = position
            .as_str()
            .ok_or_else(|| Error::field_parse("EID:Slt", position.to_string()))?;
        let (enclosure, slot) = raw
            .split_once(':')
            .ok_or_else(|| Error::missing("slot in EID:Slt"))?;

        let slot = slot.trim();
        if slot.is_empty() {
            return Err(Error::missing("slot in EID:Slt"));
        }
        let slot = slot
            .parse()
            .map_err(|_| Error::field_parse("EID:Slt", raw))?;
        let enclosure = match enclosure.trim() {
            "" => None,
            e => Some(e.parse().map_err(|_| Error::field_parse("EID:Slt", raw))?),
        };
        return Ok((enclosure, slot));
    }

    let slot = parse_u32("Slt", required(record, "Slt")?)?;
    let enclosure = match record.get("EID").and_then(cell_string) {
        Some(e) if !e.is_empty() => Some(
            e.parse()
                .map_err(|_| Error::field_parse("EID", e.as_str()))?,
        ),
        _ => None,
    };
    Ok((enclosure, slot))
}

/// Parse one `PD LIST` row
pub fn parse_physical_drive(controller_id: u32, record: &Value) -> Result<PhysicalDrive> {
    let (enclosure, slot) = parse_drive_position(record)?;
    let drive_group = parse_drive_group(required(record, "DG")?)?;
    let device_id = record
        .get("DID")
        .filter(|v| !v.is_null())
        .map(|v| parse_u32("DID", v))
        .transpose()?;

    Ok(PhysicalDrive {
        controller_id,
        enclosure,
        slot,
        device_id,
        allocated: drive_group.is_some(),
        drive_group,
        size_bytes: parse_drive_size(required_str(record, "Size")?)?,
        sector_size_bytes: parse_sector_size(required_str(record, "SeSz")?)?,
        state: parse_physical_drive_state(required_str(record, "State")?),
        medium: required_str(record, "Med")?.trim().to_string(),
        interface: required_str(record, "Intf")?.trim().to_string(),
        model: required_str(record, "Model")?.trim().to_string(),
        health: None,
    })
}

// =============================================================================
// Virtual drives
// =============================================================================

/// Parse one `VD LIST` row; member drives are linked later
pub fn parse_virtual_drive(controller_id: u32, record: &Value) -> Result<VirtualDrive> {
    let (drive_group, virtual_drive_id) = parse_dg_vd(required(record, "DG/VD")?)?;
    let flags = parse_cache_flags(required_str(record, "Cache")?)?;
    let name = record
        .get("Name")
        .and_then(cell_string)
        .unwrap_or_default();
    let ssd_caching_active = record
        .get("sCC")
        .and_then(Value::as_str)
        .and_then(parse_on_off);

    Ok(VirtualDrive {
        controller_id,
        virtual_drive_id,
        drive_group,
        state: parse_virtual_drive_state(required_str(record, "State")?),
        size_bytes: parse_drive_size(required_str(record, "Size")?)?,
        raid_level: parse_raid_level(required_str(record, "TYPE")?),
        access: required_str(record, "Access")?.trim().to_lowercase(),
        name,
        consistent: required_str(record, "Consist")?.trim().eq_ignore_ascii_case("yes"),
        read_ahead: flags.read_ahead,
        write_cache: flags.write_cache,
        io_policy: flags.io_policy,
        ssd_caching_active,
        physical_drives: Vec::new(),
    })
}
