//! Cross-Referencer
//!
//! Links physical drives to the virtual drives built on them and merges
//! health data into drive records. Every query rebuilds these links
//! from scratch, so the output is deterministic for equal input.

use crate::domain::model::{PhysicalDrive, VirtualDrive};
use crate::error::Result;
use crate::storcli::decoder::ControllerPayloads;
use crate::storcli::entities::{parse_physical_drive, parse_virtual_drive, table};
use crate::storcli::health::DriveHealthMap;

/// Unlinked drive records of one or more controllers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveTables {
    pub physical_drives: Vec<PhysicalDrive>,
    pub virtual_drives: Vec<VirtualDrive>,
}

impl DriveTables {
    /// Parse `PD LIST` and `VD LIST` of every controller payload
    pub fn from_payloads(payloads: &ControllerPayloads) -> Result<Self> {
        let mut tables = Self::default();
        for (controller_id, data) in payloads {
            for row in table(data, "PD LIST") {
                tables
                    .physical_drives
                    .push(parse_physical_drive(*controller_id, row)?);
            }
            for row in table(data, "VD LIST") {
                tables
                    .virtual_drives
                    .push(parse_virtual_drive(*controller_id, row)?);
            }
        }
        sort_physical_drives(&mut tables.physical_drives);
        sort_virtual_drives(&mut tables.virtual_drives);
        Ok(tables)
    }

    /// Merge health, then link member drives into each virtual drive
    pub fn cross_reference(mut self, health: &DriveHealthMap) -> Self {
        attach_drive_health(&mut self.physical_drives, health);
        attach_physical_drives(&mut self.virtual_drives, &self.physical_drives);
        self
    }
}

pub fn sort_physical_drives(drives: &mut [PhysicalDrive]) {
    drives.sort_by_key(PhysicalDrive::address);
}

pub fn sort_virtual_drives(drives: &mut [VirtualDrive]) {
    drives.sort_by_key(VirtualDrive::key);
}

/// Replace each virtual drive's member list with the physical drives
/// that belong to it
pub fn attach_physical_drives(virtual_drives: &mut [VirtualDrive], physical_drives: &[PhysicalDrive]) {
    for vd in virtual_drives.iter_mut() {
        let mut members: Vec<PhysicalDrive> = physical_drives
            .iter()
            .filter(|pd| pd.belongs_to(vd))
            .cloned()
            .collect();
        sort_physical_drives(&mut members);
        vd.physical_drives = members;
    }
}

/// Set each drive's health from the map; drives without an entry keep
/// no health record
pub fn attach_drive_health(physical_drives: &mut [PhysicalDrive], health: &DriveHealthMap) {
    for pd in physical_drives.iter_mut() {
        pd.health = health.get(&pd.address()).cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DriveAddress, DriveHealth};
    use serde_json::json;

    fn payloads() -> ControllerPayloads {
        let pd = |addr: &str, dg: serde_json::Value| {
            json!({
                "EID:Slt": addr, "DID": 1, "State": "Onln", "DG": dg, "Size": "1 TB",
                "Intf": "SAS", "Med": "HDD", "SeSz": "512B", "Model": "X"
            })
        };
        let vd = |dgvd: &str| {
            json!({
                "DG/VD": dgvd, "TYPE": "RAID1", "State": "Optl", "Access": "RW",
                "Consist": "Yes", "Cache": "RWBD", "Size": "1 TB", "Name": ""
            })
        };
        let mut payloads = ControllerPayloads::new();
        payloads.insert(
            0,
            json!({
                "PD LIST": [pd("62:1", json!(0)), pd("62:0", json!(0)), pd("62:2", json!("0,1")), pd("62:3", json!("-"))],
                "VD LIST": [vd("1/1"), vd("0/0")]
            }),
        );
        payloads.insert(
            1,
            json!({
                "PD LIST": [pd("62:0", json!(0))],
                "VD LIST": [vd("0/0")]
            }),
        );
        payloads
    }

    #[test]
    fn test_tables_are_sorted() {
        let tables = DriveTables::from_payloads(&payloads()).unwrap();
        let addresses: Vec<_> = tables.physical_drives.iter().map(|pd| (pd.controller_id, pd.slot)).collect();
        assert_eq!(addresses, vec![(0, 0), (0, 1), (0, 2), (0, 3), (1, 0)]);
        let keys: Vec<_> = tables.virtual_drives.iter().map(VirtualDrive::key).collect();
        assert_eq!(keys, vec![(0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn test_membership_stays_on_controller() {
        let tables = DriveTables::from_payloads(&payloads())
            .unwrap()
            .cross_reference(&DriveHealthMap::new());

        let slots = |vd: &VirtualDrive| -> Vec<(u32, u32)> {
            vd.physical_drives.iter().map(|pd| (pd.controller_id, pd.slot)).collect()
        };
        assert_eq!(slots(&tables.virtual_drives[0]), vec![(0, 0), (0, 1), (0, 2)]);
        assert_eq!(slots(&tables.virtual_drives[1]), vec![(0, 2)]);
        assert_eq!(slots(&tables.virtual_drives[2]), vec![(1, 0)]);
    }

    #[test]
    fn test_health_is_merged_into_members() {
        let mut health = DriveHealthMap::new();
        health.insert(
            DriveAddress::new(0, Some(62), 0),
            DriveHealth {
                temperature: Some("30C".into()),
                ssd_life_left: None,
            },
        );
        let tables = DriveTables::from_payloads(&payloads())
            .unwrap()
            .cross_reference(&health);

        assert!(tables.physical_drives[0].health.is_some());
        assert!(tables.physical_drives[1].health.is_none());
        assert!(tables.physical_drives[4].health.is_none());
        assert_eq!(
            tables.virtual_drives[0].physical_drives[0].health,
            tables.physical_drives[0].health
        );
    }

    #[test]
    fn test_cross_reference_is_idempotent() {
        let once = DriveTables::from_payloads(&payloads())
            .unwrap()
            .cross_reference(&DriveHealthMap::new());
        let twice = once.clone().cross_reference(&DriveHealthMap::new());
        assert_eq!(once, twice);
    }
}
