//! Normalized inventory model
//!
//! These are the types the gateway hands to HTTP clients. They are built
//! fresh from tool output on every query and never persisted.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Model-name prefix of controllers that have no enclosure concept
pub const WARPDRIVE_MODEL_PREFIX: &str = "Nytro WarpDrive";

// =============================================================================
// Controller Kinds
// =============================================================================

/// Controller family, decided from the model string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKind {
    /// MegaRAID style controller with enclosures
    Standard,
    /// Nytro WarpDrive flash card, slots are addressed without enclosure
    WarpDrive,
}

impl ControllerKind {
    pub fn from_model(model: &str) -> Self {
        if model.trim_start().starts_with(WARPDRIVE_MODEL_PREFIX) {
            ControllerKind::WarpDrive
        } else {
            ControllerKind::Standard
        }
    }

    pub fn has_enclosures(self) -> bool {
        matches!(self, ControllerKind::Standard)
    }
}

/// Cache volume classification of a virtual drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    CacheCade,
    NytroCache,
}

impl CacheType {
    /// Classify a normalized RAID level string
    pub fn from_raid_level(raid_level: &str) -> Option<Self> {
        let level = raid_level.trim().to_lowercase();
        if level.starts_with("nytro") {
            Some(CacheType::NytroCache)
        } else if level.starts_with("cache") {
            Some(CacheType::CacheCade)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheType::CacheCade => "cachecade",
            CacheType::NytroCache => "nytrocache",
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cachecade" => Ok(CacheType::CacheCade),
            "nytrocache" => Ok(CacheType::NytroCache),
            _ => Err(Error::Validation(format!("unknown cache type: {}", s))),
        }
    }
}

// =============================================================================
// Enumerations with raw fallback
// =============================================================================

/// Physical drive state
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhysicalDriveState {
    Online,
    Offline,
    Rebuild,
    UnconfiguredGood,
    UnconfiguredBad,
    DedicatedHotSpare,
    GlobalHotSpare,
    /// Unrecognized state, lowercased
    Other(String),
}

impl PhysicalDriveState {
    pub fn as_str(&self) -> &str {
        match self {
            PhysicalDriveState::Online => "online",
            PhysicalDriveState::Offline => "offline",
            PhysicalDriveState::Rebuild => "rebuild",
            PhysicalDriveState::UnconfiguredGood => "unconfigured_good",
            PhysicalDriveState::UnconfiguredBad => "unconfigured_bad",
            PhysicalDriveState::DedicatedHotSpare => "dedicated_hot_spare",
            PhysicalDriveState::GlobalHotSpare => "global_hot_spare",
            PhysicalDriveState::Other(raw) => raw,
        }
    }
}

impl Serialize for PhysicalDriveState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Virtual drive state
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VirtualDriveState {
    Optimal,
    Offline,
    PartiallyDegraded,
    Recovery,
    Degraded,
    /// Unrecognized state, lowercased
    Other(String),
}

impl VirtualDriveState {
    pub fn as_str(&self) -> &str {
        match self {
            VirtualDriveState::Optimal => "optimal",
            VirtualDriveState::Offline => "offline",
            VirtualDriveState::PartiallyDegraded => "partially_degraded",
            VirtualDriveState::Recovery => "recovery",
            VirtualDriveState::Degraded => "degraded",
            VirtualDriveState::Other(raw) => raw,
        }
    }
}

impl Serialize for VirtualDriveState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Write cache mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WriteCache {
    #[serde(rename = "wb")]
    WriteBack,
    #[serde(rename = "wt")]
    WriteThrough,
}

impl WriteCache {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteCache::WriteBack => "wb",
            WriteCache::WriteThrough => "wt",
        }
    }
}

impl FromStr for WriteCache {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wb" => Ok(WriteCache::WriteBack),
            "wt" => Ok(WriteCache::WriteThrough),
            _ => Err(Error::Validation(format!("invalid write_cache: {}", s))),
        }
    }
}

/// IO policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoPolicy {
    Direct,
    Cached,
}

impl IoPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            IoPolicy::Direct => "direct",
            IoPolicy::Cached => "cached",
        }
    }
}

impl FromStr for IoPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(IoPolicy::Direct),
            "cached" => Ok(IoPolicy::Cached),
            _ => Err(Error::Validation(format!("invalid io_policy: {}", s))),
        }
    }
}

// =============================================================================
// Drive Groups and Addresses
// =============================================================================

/// Drive group membership of an allocated physical drive
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum DriveGroup {
    Single(u32),
    /// Drive spans several arrays; sorted, no duplicates
    Multiple(Vec<u32>),
    /// Non-numeric value emitted by some firmware, kept verbatim
    Opaque(String),
}

impl DriveGroup {
    /// Check whether this membership includes the given drive group
    pub fn contains(&self, group: u32) -> bool {
        match self {
            DriveGroup::Single(g) => *g == group,
            DriveGroup::Multiple(groups) => groups.binary_search(&group).is_ok(),
            DriveGroup::Opaque(_) => false,
        }
    }
}

/// Natural key of a physical drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriveAddress {
    pub controller_id: u32,
    pub enclosure: Option<u32>,
    pub slot: u32,
}

impl DriveAddress {
    pub fn new(controller_id: u32, enclosure: Option<u32>, slot: u32) -> Self {
        Self {
            controller_id,
            enclosure,
            slot,
        }
    }
}

impl fmt::Display for DriveAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.enclosure {
            Some(e) => write!(f, "/c{}/e{}/s{}", self.controller_id, e, self.slot),
            None => write!(f, "/c{}/s{}", self.controller_id, self.slot),
        }
    }
}

// =============================================================================
// Health
// =============================================================================

/// Physical drive health, values are kept as reported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriveHealth {
    pub temperature: Option<String>,
    pub ssd_life_left: Option<String>,
}

/// Controller health, values are kept as reported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerHealth {
    pub temperature: Option<String>,
    pub overall_health: Option<String>,
    pub warranty_remaining: Option<String>,
}

// =============================================================================
// Entities
// =============================================================================

/// Controller capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub max_cachecade_size: u64,
}

/// RAID controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Controller {
    #[serde(rename = "controller_id")]
    pub id: u32,
    pub pci_address: Option<String>,
    pub model: String,
    pub serial_number: String,
    pub sas_address: Option<String>,
    pub host_interface: Option<String>,
    pub enclosures: BTreeSet<u32>,
    pub capabilities: Capabilities,
    pub health: Option<ControllerHealth>,
}

impl Controller {
    pub fn kind(&self) -> ControllerKind {
        ControllerKind::from_model(&self.model)
    }
}

/// Controller with its drives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerDetails {
    #[serde(flatten)]
    pub controller: Controller,
    pub physical_drives: Vec<PhysicalDrive>,
    pub virtual_drives: Vec<VirtualDrive>,
}

/// Physical drive attached to a controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalDrive {
    pub controller_id: u32,
    pub enclosure: Option<u32>,
    pub slot: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<u32>,
    pub drive_group: Option<DriveGroup>,
    pub allocated: bool,
    pub size_bytes: u64,
    pub sector_size_bytes: u64,
    pub state: PhysicalDriveState,
    pub medium: String,
    pub interface: String,
    pub model: String,
    pub health: Option<DriveHealth>,
}

impl PhysicalDrive {
    pub fn address(&self) -> DriveAddress {
        DriveAddress::new(self.controller_id, self.enclosure, self.slot)
    }

    /// Drive-group membership rule between a physical and a virtual drive
    pub fn belongs_to(&self, vd: &VirtualDrive) -> bool {
        self.controller_id == vd.controller_id
            && self
                .drive_group
                .as_ref()
                .map_or(false, |dg| dg.contains(vd.drive_group))
    }
}

/// Virtual drive (logical volume) on a controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualDrive {
    pub controller_id: u32,
    pub virtual_drive_id: u32,
    pub drive_group: u32,
    pub state: VirtualDriveState,
    pub size_bytes: u64,
    pub raid_level: String,
    pub access: String,
    pub name: String,
    pub consistent: bool,
    pub read_ahead: bool,
    pub write_cache: WriteCache,
    pub io_policy: IoPolicy,
    pub ssd_caching_active: Option<bool>,
    pub physical_drives: Vec<PhysicalDrive>,
}

impl VirtualDrive {
    pub fn key(&self) -> (u32, u32) {
        (self.controller_id, self.virtual_drive_id)
    }

    pub fn cache_type(&self) -> Option<CacheType> {
        CacheType::from_raid_level(&self.raid_level)
    }

    /// Addresses of the member physical drives
    pub fn drive_addresses(&self) -> BTreeSet<DriveAddress> {
        self.physical_drives.iter().map(PhysicalDrive::address).collect()
    }
}
