//! Command Builder
//!
//! Builds storcli argument lists and validates caller-supplied mutation
//! parameters before anything reaches the tool. Every invocation ends
//! with the `J` token that switches storcli to JSON output.

use crate::domain::model::{CacheType, ControllerKind, DriveAddress, IoPolicy, WriteCache};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Token that requests JSON output
pub const JSON_OUTPUT_TOKEN: &str = "J";

/// Strip sizes accepted by the controllers, in KiB
pub const STRIP_SIZES: &[u32] = &[8, 16, 32, 64, 128, 256, 512, 1024];

/// RAID levels accepted for regular virtual drives
pub const RAID_LEVELS: &[u32] = &[0, 1, 5, 6, 10, 50, 60];

/// RAID levels accepted for cache volumes
pub const CACHE_RAID_LEVELS: &[u32] = &[0, 1];

// =============================================================================
// Command
// =============================================================================

/// One storcli invocation, tool path excluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorcliCommand {
    tokens: Vec<String>,
}

impl StorcliCommand {
    fn new(object: impl Into<String>) -> Self {
        Self {
            tokens: vec![object.into()],
        }
    }

    fn arg(mut self, token: impl Into<String>) -> Self {
        self.tokens.push(token.into());
        self
    }

    fn args<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens.extend(tokens.into_iter().map(Into::into));
        self
    }

    fn arg_if(self, condition: bool, token: impl Into<String>) -> Self {
        if condition {
            self.arg(token)
        } else {
            self
        }
    }

    /// Tokens without the JSON output switch
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Full argument list handed to the runner
    pub fn to_args(&self) -> Vec<String> {
        let mut args = self.tokens.clone();
        args.push(JSON_OUTPUT_TOKEN.to_string());
        args
    }
}

impl fmt::Display for StorcliCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

/// `all` or one controller id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerSelector {
    All,
    Id(u32),
}

impl fmt::Display for ControllerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerSelector::All => f.write_str("all"),
            ControllerSelector::Id(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for ControllerSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(ControllerSelector::All);
        }
        s.parse()
            .map(ControllerSelector::Id)
            .map_err(|_| Error::Validation(format!("invalid controller id: {}", s)))
    }
}

impl ControllerSelector {
    /// Controller id, `None` for all controllers
    pub fn id(self) -> Option<u32> {
        match self {
            ControllerSelector::All => None,
            ControllerSelector::Id(id) => Some(id),
        }
    }
}

impl From<Option<u32>> for ControllerSelector {
    fn from(id: Option<u32>) -> Self {
        id.map_or(ControllerSelector::All, ControllerSelector::Id)
    }
}

/// `all` or one virtual drive id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualDriveSelector {
    All,
    Id(u32),
}

impl fmt::Display for VirtualDriveSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VirtualDriveSelector::All => f.write_str("all"),
            VirtualDriveSelector::Id(id) => write!(f, "{}", id),
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

/// `/cX show all`: full controller report
pub fn show_all(controller: ControllerSelector) -> StorcliCommand {
    StorcliCommand::new(format!("/c{}", controller)).args(["show", "all"])
}

/// `/cX show`: summary with `PD LIST` and `VD LIST`
pub fn show(controller: ControllerSelector) -> StorcliCommand {
    StorcliCommand::new(format!("/c{}", controller)).arg("show")
}

pub fn show_enclosures(controller_id: u32) -> StorcliCommand {
    StorcliCommand::new(format!("/c{}/eall", controller_id)).arg("show")
}

pub fn show_health(controller_id: u32) -> StorcliCommand {
    StorcliCommand::new(format!("/c{}", controller_id)).args(["show", "health"])
}

/// Per-drive detail report; WarpDrive slots have no enclosure
pub fn show_drive_details(controller_id: u32, kind: ControllerKind) -> StorcliCommand {
    let object = if kind.has_enclosures() {
        format!("/c{}/eall/sall", controller_id)
    } else {
        format!("/c{}/sall", controller_id)
    };
    StorcliCommand::new(object).args(["show", "all"])
}

// =============================================================================
// Request validation helpers
// =============================================================================

fn int_like(field: &str, value: &Value) -> Result<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| Error::Validation(format!("{} must be an integer, got {}", field, value)))
}

fn optional<'v>(body: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    body.get(key).filter(|v| !v.is_null())
}

fn optional_bool(body: &Map<String, Value>, key: &str) -> Result<Option<bool>> {
    optional(body, key)
        .map(|v| {
            v.as_bool()
                .ok_or_else(|| Error::Validation(format!("{} must be a boolean", key)))
        })
        .transpose()
}

fn optional_str<'v>(body: &'v Map<String, Value>, key: &str) -> Result<Option<&'v str>> {
    optional(body, key)
        .map(|v| {
            v.as_str()
                .ok_or_else(|| Error::Validation(format!("{} must be a string", key)))
        })
        .transpose()
}

fn optional_name(body: &Map<String, Value>) -> Result<Option<String>> {
    match optional_str(body, "name")? {
        Some(name) if name.trim().is_empty() => {
            Err(Error::Validation("name must not be empty".into()))
        }
        Some(name) => Ok(Some(name.trim().to_string())),
        None => Ok(None),
    }
}

fn optional_parsed<T: FromStr<Err = Error>>(
    body: &Map<String, Value>,
    key: &str,
) -> Result<Option<T>> {
    optional_str(body, key)?.map(str::parse).transpose()
}

/// Request body as an object; a missing body counts as empty
pub fn body_object(body: &Value) -> Result<Map<String, Value>> {
    match body {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        _ => Err(Error::Validation("request body must be a JSON object".into())),
    }
}

/// Validate one drive address object of a request.
///
/// `slot` is mandatory, `enclosure` and `controller_id` are optional.
/// Integers and numeric strings are both accepted.
pub fn parse_drive_address(controller_id: u32, value: &Value) -> Result<DriveAddress> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::Validation(format!("drive must be an object, got {}", value)))?;

    let slot = obj
        .get("slot")
        .filter(|v| !v.is_null())
        .ok_or_else(|| Error::Validation("drive slot is mandatory".into()))
        .and_then(|v| int_like("slot", v))?;
    let enclosure = optional(obj, "enclosure")
        .map(|v| int_like("enclosure", v))
        .transpose()?;

    if let Some(owner) = optional(obj, "controller_id") {
        let owner = int_like("controller_id", owner)?;
        if owner != controller_id {
            return Err(Error::Validation(format!(
                "drive on controller {} used in a request for controller {}",
                owner, controller_id
            )));
        }
    }

    Ok(DriveAddress::new(controller_id, enclosure, slot))
}

fn parse_drive_list(controller_id: u32, value: Option<&Value>, key: &str) -> Result<Vec<DriveAddress>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| Error::Validation(format!("{} must be a list", key)))?;

    let mut drives = items
        .iter()
        .map(|item| parse_drive_address(controller_id, item))
        .collect::<Result<Vec<_>>>()?;
    drives.sort();
    drives.dedup();
    Ok(drives)
}

fn parse_raid_level(value: Option<&Value>, allowed: &[u32]) -> Result<Option<u32>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let level = match value {
        Value::String(s) => s
            .trim()
            .trim_start_matches(|c| c == 'r' || c == 'R')
            .parse()
            .map_err(|_| Error::Validation(format!("invalid raid_level: {}", s)))?,
        other => int_like("raid_level", other)?,
    };
    if !allowed.contains(&level) {
        return Err(Error::Validation(format!("unsupported raid_level: {}", level)));
    }
    Ok(Some(level))
}

/// Render drives as `E:S,S,E:S` grouped by enclosure
pub fn format_drive_list(drives: &[DriveAddress]) -> String {
    let mut by_enclosure: BTreeMap<Option<u32>, Vec<u32>> = BTreeMap::new();
    for drive in drives {
        by_enclosure.entry(drive.enclosure).or_default().push(drive.slot);
    }

    by_enclosure
        .into_iter()
        .map(|(enclosure, slots)| {
            let slots = slots
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            match enclosure {
                Some(e) => format!("{}:{}", e, slots),
                None => slots,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

// =============================================================================
// Virtual drive creation
// =============================================================================

/// Validated parameters of a virtual drive or cache volume creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateVirtualDrive {
    pub controller_id: u32,
    pub cache_type: Option<CacheType>,
    pub raid_level: u32,
    pub drives: Vec<DriveAddress>,
    pub spare_drives: Vec<DriveAddress>,
    pub strip_size: Option<u32>,
    pub name: Option<String>,
    pub read_ahead: Option<bool>,
    pub write_cache: Option<WriteCache>,
    pub io_policy: Option<IoPolicy>,
    pub ssd_caching: Option<bool>,
}

impl CreateVirtualDrive {
    /// Minimal request: one RAID level over a drive set
    pub fn new(controller_id: u32, raid_level: u32, drives: Vec<DriveAddress>) -> Self {
        Self {
            controller_id,
            cache_type: None,
            raid_level,
            drives,
            spare_drives: Vec::new(),
            strip_size: None,
            name: None,
            read_ahead: None,
            write_cache: None,
            io_policy: None,
            ssd_caching: None,
        }
    }

    /// Validate a request body. Cache volumes only take `drives`,
    /// `raid_level` (default 0) and `name`; other keys are ignored.
    pub fn from_json(controller_id: u32, cache_type: Option<CacheType>, body: &Value) -> Result<Self> {
        let body = body_object(body)?;

        let drives = parse_drive_list(controller_id, optional(&body, "drives"), "drives")?;
        if drives.is_empty() {
            return Err(Error::Validation("drives must not be empty".into()));
        }
        let name = optional_name(&body)?;

        if cache_type.is_some() {
            let raid_level = parse_raid_level(optional(&body, "raid_level"), CACHE_RAID_LEVELS)?;
            return Ok(Self {
                cache_type,
                name,
                ..Self::new(controller_id, raid_level.unwrap_or(0), drives)
            });
        }

        let raid_level = parse_raid_level(optional(&body, "raid_level"), RAID_LEVELS)?
            .ok_or_else(|| Error::Validation("raid_level is mandatory".into()))?;
        let spare_drives =
            parse_drive_list(controller_id, optional(&body, "spare_drives"), "spare_drives")?;
        if spare_drives.iter().any(|spare| drives.contains(spare)) {
            return Err(Error::Validation("spare drive is also a member drive".into()));
        }
        let strip_size = optional(&body, "strip_size")
            .map(|v| int_like("strip_size", v))
            .transpose()?;
        if let Some(strip) = strip_size {
            if !STRIP_SIZES.contains(&strip) {
                return Err(Error::Validation(format!("unsupported strip_size: {}", strip)));
            }
        }

        Ok(Self {
            spare_drives,
            strip_size,
            name,
            read_ahead: optional_bool(&body, "read_ahead")?,
            write_cache: optional_parsed(&body, "write_cache")?,
            io_policy: optional_parsed(&body, "io_policy")?,
            ssd_caching: optional_bool(&body, "ssd_caching")?,
            ..Self::new(controller_id, raid_level, drives)
        })
    }

    pub fn to_command(&self) -> StorcliCommand {
        let mut cmd = StorcliCommand::new(format!("/c{}", self.controller_id)).args(["add", "vd"]);
        if let Some(cache_type) = self.cache_type {
            cmd = cmd.arg(cache_type.as_str());
        }
        cmd = cmd.arg(format!("r{}", self.raid_level));
        if let Some(name) = &self.name {
            cmd = cmd.arg(format!("name={}", name));
        }
        cmd = cmd.arg(format!("drives={}", format_drive_list(&self.drives)));
        if let Some(write_cache) = self.write_cache {
            cmd = cmd.arg(write_cache.as_str());
        }
        if let Some(read_ahead) = self.read_ahead {
            cmd = cmd.arg(if read_ahead { "ra" } else { "nora" });
        }
        if let Some(io_policy) = self.io_policy {
            cmd = cmd.arg(io_policy.as_str());
        }
        if let Some(strip) = self.strip_size {
            cmd = cmd.arg(format!("strip={}", strip));
        }
        if !self.spare_drives.is_empty() {
            cmd = cmd.arg(format!("spares={}", format_drive_list(&self.spare_drives)));
        }
        cmd.arg_if(self.ssd_caching == Some(true), "cachevd")
    }
}

// =============================================================================
// Virtual drive update and deletion
// =============================================================================

/// Validated virtual drive property changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateVirtualDrive {
    pub name: Option<String>,
    pub read_ahead: Option<bool>,
    pub write_cache: Option<WriteCache>,
    pub io_policy: Option<IoPolicy>,
    pub ssd_caching: Option<bool>,
}

impl UpdateVirtualDrive {
    pub fn from_json(body: &Value) -> Result<Self> {
        let body = body_object(body)?;
        Ok(Self {
            name: optional_name(&body)?,
            read_ahead: optional_bool(&body, "read_ahead")?,
            write_cache: optional_parsed(&body, "write_cache")?,
            io_policy: optional_parsed(&body, "io_policy")?,
            ssd_caching: optional_bool(&body, "ssd_caching")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// `/cX/vY set ...`; fails when nothing would change
    pub fn to_command(&self, controller_id: u32, virtual_drive_id: u32) -> Result<StorcliCommand> {
        if self.is_empty() {
            return Err(Error::Validation("no virtual drive property to update".into()));
        }

        let mut cmd = StorcliCommand::new(format!("/c{}/v{}", controller_id, virtual_drive_id)).arg("set");
        if let Some(io_policy) = self.io_policy {
            cmd = cmd.arg(format!("iopolicy={}", io_policy.as_str()));
        }
        if let Some(name) = &self.name {
            cmd = cmd.arg(format!("name={}", name));
        }
        if let Some(write_cache) = self.write_cache {
            cmd = cmd.arg(format!("wrcache={}", write_cache.as_str()));
        }
        if let Some(read_ahead) = self.read_ahead {
            cmd = cmd.arg(if read_ahead { "rdcache=RA" } else { "rdcache=NoRA" });
        }
        if let Some(ssd_caching) = self.ssd_caching {
            cmd = cmd.arg(if ssd_caching { "ssdcaching=on" } else { "ssdcaching=off" });
        }
        Ok(cmd)
    }
}

/// `/cX/vY del [cachecade|nytrocache] [force]`
pub fn delete_virtual_drive(
    controller_id: u32,
    virtual_drive: VirtualDriveSelector,
    cache_type: Option<CacheType>,
    force: bool,
) -> StorcliCommand {
    let mut cmd = StorcliCommand::new(format!("/c{}/v{}", controller_id, virtual_drive)).arg("del");
    if let Some(cache_type) = cache_type {
        cmd = cmd.arg(cache_type.as_str());
    }
    cmd.arg_if(force, "force")
}

// =============================================================================
// Hot spares and WarpDrive
// =============================================================================

/// Validated hot spare request; empty `virtual_drives` means global
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotspareRequest {
    pub virtual_drives: Vec<u32>,
}

impl HotspareRequest {
    pub fn from_json(body: &Value) -> Result<Self> {
        let body = body_object(body)?;
        let mut virtual_drives = match optional(&body, "virtual_drives") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| int_like("virtual_drives", v))
                .collect::<Result<Vec<_>>>()?,
            Some(single) => vec![int_like("virtual_drives", single)?],
        };
        virtual_drives.sort_unstable();
        virtual_drives.dedup();
        Ok(Self { virtual_drives })
    }
}

/// `/cX/eY/sZ add hotsparedrive [dgs=...]`
pub fn add_hotspare(drive: &DriveAddress, drive_groups: &[u32]) -> StorcliCommand {
    let cmd = StorcliCommand::new(drive.to_string()).args(["add", "hotsparedrive"]);
    if drive_groups.is_empty() {
        return cmd;
    }
    let groups = drive_groups
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    cmd.arg(format!("dgs={}", groups))
}

pub fn delete_hotspare(drive: &DriveAddress) -> StorcliCommand {
    StorcliCommand::new(drive.to_string()).args(["delete", "hotsparedrive"])
}

/// WarpDrive over-provisioning profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overprovision {
    Capacity,
    Performance,
}

impl Overprovision {
    pub fn as_str(self) -> &'static str {
        match self {
            Overprovision::Capacity => "cap",
            Overprovision::Performance => "perf",
        }
    }

    /// Read the optional `overprovision` key of a request body
    pub fn from_json(body: &Value) -> Result<Option<Self>> {
        let body = body_object(body)?;
        optional_parsed(&body, "overprovision")
    }
}

impl FromStr for Overprovision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cap" => Ok(Overprovision::Capacity),
            "perf" => Ok(Overprovision::Performance),
            _ => Err(Error::Validation(format!("overprovision must be cap or perf, got {}", s))),
        }
    }
}

/// `/cX/eall/sall start format [overprovision level=...]`
pub fn start_format(controller_id: u32, overprovision: Option<Overprovision>) -> StorcliCommand {
    let cmd = StorcliCommand::new(format!("/c{}/eall/sall", controller_id)).args(["start", "format"]);
    match overprovision {
        Some(level) => cmd.args(["overprovision".to_string(), format!("level={}", level.as_str())]),
        None => cmd,
    }
}
