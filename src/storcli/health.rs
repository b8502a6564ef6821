//! Health Extraction
//!
//! Controller health comes in two shapes: WarpDrive cards answer with a
//! single `... Health` block, other controllers with a `Controller
//! Health Info` block. Drive health is scattered over one
//! `Drive /cX/eY/sZ - Detailed Information` block per drive.

use crate::domain::model::{ControllerHealth, DriveAddress, DriveHealth};
use crate::error::{Error, Result};
use crate::storcli::parsers::cell_string;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Drive health keyed by drive address
pub type DriveHealthMap = BTreeMap<DriveAddress, DriveHealth>;

static DRIVE_DETAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Drive\s+/c(\d+)(?:/e(\d+))?/s(\d+)\s+-\s+Detailed\s+Information\s*$")
        .expect("valid drive detail regex")
});

const CONTROLLER_HEALTH_BLOCK: &str = "Controller Health Info";

/// Keys of each health field within one health block
struct HealthKeys {
    temperature: &'static str,
    overall_health: &'static str,
    warranty_remaining: &'static str,
}

const WARPDRIVE_HEALTH_KEYS: HealthKeys = HealthKeys {
    temperature: "Temperature",
    overall_health: "Overall Health",
    warranty_remaining: "Warranty Remaining",
};

const CONTROLLER_HEALTH_KEYS: HealthKeys = HealthKeys {
    temperature: "ROC temperature(Degree Celsius)",
    overall_health: "Controller Status",
    warranty_remaining: "Warranty Remaining",
};

fn block_field(block: &Map<String, Value>, key: &str) -> Option<String> {
    block.get(key).and_then(cell_string)
}

fn health_from_block(block: &Map<String, Value>, keys: &HealthKeys) -> ControllerHealth {
    ControllerHealth {
        temperature: block_field(block, keys.temperature),
        overall_health: block_field(block, keys.overall_health),
        warranty_remaining: block_field(block, keys.warranty_remaining),
    }
}

/// Parse the payload of `/cN show health`.
///
/// Returns `None` when the payload carries neither known block.
pub fn parse_controller_health(data: &Value) -> Result<Option<ControllerHealth>> {
    let top = data
        .as_object()
        .ok_or_else(|| Error::invalid_response("health payload is not an object"))?;

    let mut health_blocks = top.iter().filter(|(key, _)| key.ends_with("Health"));
    if let (Some((_, block)), None) = (health_blocks.next(), health_blocks.next()) {
        let block = block
            .as_object()
            .ok_or_else(|| Error::invalid_response("health block is not an object"))?;
        return Ok(Some(health_from_block(block, &WARPDRIVE_HEALTH_KEYS)));
    }

    match top.get(CONTROLLER_HEALTH_BLOCK) {
        Some(Value::Object(block)) => Ok(Some(health_from_block(block, &CONTROLLER_HEALTH_KEYS))),
        Some(_) => Err(Error::invalid_response("health block is not an object")),
        None => Ok(None),
    }
}

/// Key of the nested state block inside a drive detail block
fn drive_state_key(address: &DriveAddress) -> String {
    format!("Drive {} State", address)
}

fn parse_id(raw: &str) -> Result<u32> {
    raw.parse()
        .map_err(|_| Error::field_parse("drive detail address", raw))
}

/// Parse the payload of a drive `show all` query into a health map.
///
/// Keys that are not drive detail blocks are ignored. A detail block
/// without a state section yields an empty health record.
pub fn parse_drive_health(data: &Value) -> Result<DriveHealthMap> {
    let mut health = DriveHealthMap::new();
    let Some(top) = data.as_object() else {
        return Ok(health);
    };

    for (key, block) in top {
        let Some(caps) = DRIVE_DETAIL_RE.captures(key) else {
            continue;
        };
        let address = DriveAddress::new(
            parse_id(&caps[1])?,
            caps.get(2).map(|e| parse_id(e.as_str())).transpose()?,
            parse_id(&caps[3])?,
        );

        let state = block.get(drive_state_key(&address));
        let field = |name: &str| state.and_then(|s| s.get(name)).and_then(cell_string);
        health.insert(
            address,
            DriveHealth {
                temperature: field("Drive Temperature"),
                ssd_life_left: field("SSD Life Left"),
            },
        );
    }

    Ok(health)
}
