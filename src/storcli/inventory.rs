//! Inventory Aggregator
//!
//! Public operations of the gateway. Each operation issues one or more
//! storcli invocations in sequence, decodes them and builds the
//! normalized inventory. Nothing is cached between calls.

use crate::domain::model::{
    CacheType, Controller, ControllerDetails, ControllerHealth, DriveAddress, PhysicalDrive,
    VirtualDrive,
};
use crate::domain::ports::CommandRunnerRef;
use crate::error::{Error, Result};
use crate::storcli::commands::{
    self, ControllerSelector, CreateVirtualDrive, Overprovision, StorcliCommand,
    UpdateVirtualDrive, VirtualDriveSelector,
};
use crate::storcli::decoder::{self, ControllerPayloads, DecodeMode};
use crate::storcli::entities::{parse_enclosures, ControllerReport};
use crate::storcli::health::{parse_controller_health, parse_drive_health, DriveHealthMap};
use crate::storcli::xref::DriveTables;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Inventory operations over a command runner
pub struct Inventory {
    runner: CommandRunnerRef,
    decode_mode: DecodeMode,
}

pub type InventoryRef = Arc<Inventory>;

impl Inventory {
    pub fn new(runner: CommandRunnerRef, decode_mode: DecodeMode) -> Self {
        Self {
            runner,
            decode_mode,
        }
    }

    // =========================================================================
    // Invocation
    // =========================================================================

    /// Run one command and decode its reply
    async fn execute(&self, command: &StorcliCommand) -> Result<ControllerPayloads> {
        debug!("storcli {}", command);
        let output = self.runner.run(&command.to_args()).await?;
        decoder::decode(&output, self.decode_mode)
    }

    /// Run a command whose failure must not fail the enclosing query.
    ///
    /// Only health lookups go through here; their absence is reported
    /// as `None` in the returned inventory.
    async fn execute_optional(&self, command: &StorcliCommand) -> Option<ControllerPayloads> {
        match self.execute(command).await {
            Ok(payloads) => Some(payloads),
            Err(e) => {
                warn!("Optional query '{}' failed: {}", command, e);
                None
            }
        }
    }

    async fn enclosures(&self, controller_id: u32) -> Result<BTreeSet<u32>> {
        let payloads = self.execute(&commands::show_enclosures(controller_id)).await?;
        payloads
            .values()
            .try_fold(BTreeSet::new(), |mut all, data| {
                all.extend(parse_enclosures(data)?);
                Ok(all)
            })
    }

    async fn controller_health(&self, controller_id: u32) -> Option<ControllerHealth> {
        let payloads = self
            .execute_optional(&commands::show_health(controller_id))
            .await?;
        let data = payloads.get(&controller_id)?;
        match parse_controller_health(data) {
            Ok(health) => health,
            Err(e) => {
                warn!("Ignoring health of controller {}: {}", controller_id, e);
                None
            }
        }
    }

    async fn drive_health(&self, report: &ControllerReport<'_>) -> DriveHealthMap {
        let command = commands::show_drive_details(report.id(), report.kind());
        let Some(payloads) = self.execute_optional(&command).await else {
            return DriveHealthMap::new();
        };

        let mut health = DriveHealthMap::new();
        for data in payloads.values() {
            match parse_drive_health(data) {
                Ok(map) => health.extend(map),
                Err(e) => warn!("Ignoring drive health of controller {}: {}", report.id(), e),
            }
        }
        health
    }

    /// Identity, enclosures and health of one controller
    async fn build_controller(&self, report: &ControllerReport<'_>) -> Result<Controller> {
        let mut controller = report.to_controller()?;
        if report.kind().has_enclosures() {
            controller.enclosures = self.enclosures(controller.id).await?;
        }
        controller.health = self.controller_health(controller.id).await;
        Ok(controller)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All controllers, ordered by id
    pub async fn list_controllers(&self) -> Result<Vec<Controller>> {
        let payloads = self
            .execute(&commands::show_all(ControllerSelector::All))
            .await?;

        let mut controllers = Vec::with_capacity(payloads.len());
        for (id, data) in &payloads {
            let report = ControllerReport::classify(*id, data)?;
            controllers.push(self.build_controller(&report).await?);
        }
        info!("Listed {} controller(s)", controllers.len());
        Ok(controllers)
    }

    /// Controllers with their drives and health, ordered by id
    pub async fn controller_details(&self, selector: ControllerSelector) -> Result<Vec<ControllerDetails>> {
        let payloads = self.execute(&commands::show_all(selector)).await?;

        let mut details = Vec::with_capacity(payloads.len());
        for (id, data) in &payloads {
            let report = ControllerReport::classify(*id, data)?;
            let controller = self.build_controller(&report).await?;
            let health = self.drive_health(&report).await;

            let single = ControllerPayloads::from([(*id, data.clone())]);
            let tables = DriveTables::from_payloads(&single)?.cross_reference(&health);
            details.push(ControllerDetails {
                controller,
                physical_drives: tables.physical_drives,
                virtual_drives: tables.virtual_drives,
            });
        }
        Ok(details)
    }

    /// Physical drives of one or all controllers, ordered by address
    pub async fn physical_drives(&self, controller_id: Option<u32>) -> Result<Vec<PhysicalDrive>> {
        let payloads = self.execute(&commands::show(controller_id.into())).await?;
        Ok(DriveTables::from_payloads(&payloads)?.physical_drives)
    }

    /// Virtual drives of one or all controllers with their member
    /// drives; `cache_type` keeps only cache volumes of that type
    pub async fn virtual_drives(
        &self,
        controller_id: Option<u32>,
        cache_type: Option<CacheType>,
    ) -> Result<Vec<VirtualDrive>> {
        let payloads = self.execute(&commands::show(controller_id.into())).await?;
        let tables = DriveTables::from_payloads(&payloads)?.cross_reference(&DriveHealthMap::new());

        Ok(match cache_type {
            Some(cache_type) => tables
                .virtual_drives
                .into_iter()
                .filter(|vd| vd.cache_type() == Some(cache_type))
                .collect(),
            None => tables.virtual_drives,
        })
    }

    /// One virtual drive by id
    pub async fn virtual_drive_details(
        &self,
        controller_id: u32,
        virtual_drive_id: u32,
        cache_type: Option<CacheType>,
    ) -> Result<VirtualDrive> {
        self.virtual_drives(Some(controller_id), cache_type)
            .await?
            .into_iter()
            .find(|vd| vd.virtual_drive_id == virtual_drive_id)
            .ok_or_else(|| Error::NoSuchVirtualDrive {
                controller: controller_id,
                virtual_drive: format!("v{}", virtual_drive_id),
            })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a virtual drive and return it as re-read from the tool.
    ///
    /// The new drive is found by its exact member drive set; zero or
    /// several candidates are reported as errors.
    pub async fn create_virtual_drive(&self, request: &CreateVirtualDrive) -> Result<VirtualDrive> {
        let command = request.to_command();
        info!("Creating virtual drive: {}", command);
        self.execute(&command).await?;

        let wanted: BTreeSet<DriveAddress> = request.drives.iter().copied().collect();
        let mut matches: Vec<VirtualDrive> = self
            .virtual_drives(Some(request.controller_id), request.cache_type)
            .await?
            .into_iter()
            .filter(|vd| vd.drive_addresses() == wanted)
            .collect();

        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(Error::NoSuchVirtualDrive {
                controller: request.controller_id,
                virtual_drive: format!("drives={}", commands::format_drive_list(&request.drives)),
            }),
            n => Err(Error::AmbiguousVirtualDrive {
                controller: request.controller_id,
                matches: n,
            }),
        }
    }

    pub async fn update_virtual_drive(
        &self,
        controller_id: u32,
        virtual_drive_id: u32,
        update: &UpdateVirtualDrive,
    ) -> Result<()> {
        let command = update.to_command(controller_id, virtual_drive_id)?;
        info!("Updating virtual drive: {}", command);
        self.execute(&command).await?;
        Ok(())
    }

    pub async fn delete_virtual_drive(
        &self,
        controller_id: u32,
        virtual_drive: VirtualDriveSelector,
        cache_type: Option<CacheType>,
        force: bool,
    ) -> Result<()> {
        let command = commands::delete_virtual_drive(controller_id, virtual_drive, cache_type, force);
        info!("Deleting virtual drive: {}", command);
        self.execute(&command).await?;
        Ok(())
    }

    /// Make a drive a hot spare, dedicated to the drive groups of the
    /// given virtual drives or global when none are given
    pub async fn add_hotspare(&self, drive: &DriveAddress, virtual_drives: &[u32]) -> Result<()> {
        let mut drive_groups = Vec::new();
        if !virtual_drives.is_empty() {
            let existing = self.virtual_drives(Some(drive.controller_id), None).await?;
            for id in virtual_drives {
                let vd = existing
                    .iter()
                    .find(|vd| vd.virtual_drive_id == *id)
                    .ok_or_else(|| Error::NoSuchVirtualDrive {
                        controller: drive.controller_id,
                        virtual_drive: format!("v{}", id),
                    })?;
                drive_groups.push(vd.drive_group);
            }
            drive_groups.sort_unstable();
            drive_groups.dedup();
        }

        let command = commands::add_hotspare(drive, &drive_groups);
        info!("Adding hot spare: {}", command);
        self.execute(&command).await?;
        Ok(())
    }

    pub async fn delete_hotspare(&self, drive: &DriveAddress) -> Result<()> {
        let command = commands::delete_hotspare(drive);
        info!("Removing hot spare: {}", command);
        self.execute(&command).await?;
        Ok(())
    }

    /// Format the flash of a WarpDrive card
    pub async fn initialize_warpdrive(
        &self,
        controller_id: u32,
        overprovision: Option<Overprovision>,
    ) -> Result<()> {
        let command = commands::start_format(controller_id, overprovision);
        info!("Initializing WarpDrive: {}", command);
        self.execute(&command).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{CommandOutput, CommandRunner};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CannedRunner {
        replies: HashMap<String, CommandOutput>,
        calls: Mutex<Vec<String>>,
    }

    impl CannedRunner {
        fn reply(mut self, command: &str, controller: u32, data: Value) -> Self {
            let body = json!({"Controllers": [{
                "Command Status": {"Controller": controller, "Status": "Success"},
                "Response Data": data
            }]});
            self.replies
                .insert(format!("{} J", command), CommandOutput::success(body.to_string()));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for CannedRunner {
        async fn run(&self, args: &[String]) -> Result<CommandOutput> {
            let key = args.join(" ");
            self.calls.lock().unwrap().push(key.clone());
            Ok(self
                .replies
                .get(&key)
                .cloned()
                .unwrap_or_else(|| CommandOutput::new("", Some(1))))
        }
    }

    fn inventory(runner: CannedRunner) -> (Inventory, Arc<CannedRunner>) {
        let runner = Arc::new(runner);
        (Inventory::new(runner.clone(), DecodeMode::Strict), runner)
    }

    fn show_reply() -> Value {
        json!({
            "PD LIST": [
                {"EID:Slt": "62:0", "DID": 1, "State": "Onln", "DG": 0, "Size": "1 TB",
                 "Intf": "SAS", "Med": "HDD", "SeSz": "512B", "Model": "A"},
                {"EID:Slt": "62:1", "DID": 2, "State": "Onln", "DG": 0, "Size": "1 TB",
                 "Intf": "SAS", "Med": "HDD", "SeSz": "512B", "Model": "A"}
            ],
            "VD LIST": [
                {"DG/VD": "0/0", "TYPE": "RAID1", "State": "Optl", "Access": "RW",
                 "Consist": "Yes", "Cache": "RWBD", "Size": "1 TB", "Name": "boot"}
            ]
        })
    }

    #[tokio::test]
    async fn test_warpdrive_skips_enclosure_query() {
        let runner = CannedRunner::default()
            .reply(
                "/call show all",
                1,
                json!({"Basics": {"Model": "Nytro WarpDrive XP6210-4A2048", "Serial Number": "123456789"}}),
            )
            .reply("/c1 show health", 1, json!({"WarpDrive Health": {"Overall Health": "GOOD"}}));
        let (inventory, runner) = inventory(runner);

        let controllers = inventory.list_controllers().await.unwrap();
        assert_eq!(controllers.len(), 1);
        assert!(controllers[0].enclosures.is_empty());
        assert_eq!(
            controllers[0].health.as_ref().and_then(|h| h.overall_health.as_deref()),
            Some("GOOD")
        );
        assert_eq!(runner.calls(), vec!["/call show all J", "/c1 show health J"]);
    }

    #[tokio::test]
    async fn test_health_failure_is_not_propagated() {
        let runner = CannedRunner::default()
            .reply("/call show all", 0, json!({"Basics": {"Model": "Nytro MegaRAID8100-4i"}}))
            .reply("/c0/eall show", 0, json!({"Properties": [{"EID": 62}]}));
        let (inventory, _) = inventory(runner);

        let controllers = inventory.list_controllers().await.unwrap();
        assert_eq!(controllers[0].health, None);
        assert_eq!(controllers[0].enclosures, BTreeSet::from([62]));
    }

    #[tokio::test]
    async fn test_enclosure_failure_is_propagated() {
        let runner = CannedRunner::default()
            .reply("/call show all", 0, json!({"Basics": {"Model": "Nytro MegaRAID8100-4i"}}));
        let (inventory, _) = inventory(runner);
        assert!(inventory.list_controllers().await.is_err());
    }

    #[tokio::test]
    async fn test_virtual_drive_details() {
        let runner = CannedRunner::default().reply("/c0 show", 0, show_reply());
        let (inventory, _) = inventory(runner);

        let vd = inventory.virtual_drive_details(0, 0, None).await.unwrap();
        assert_eq!(vd.physical_drives.len(), 2);

        let err = inventory.virtual_drive_details(0, 7, None).await.unwrap_err();
        assert!(matches!(err, Error::NoSuchVirtualDrive { controller: 0, .. }));

        let cache = inventory.virtual_drives(Some(0), Some(CacheType::CacheCade)).await.unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_add_hotspare_resolves_drive_groups() {
        let runner = CannedRunner::default()
            .reply("/c0 show", 0, show_reply())
            .reply("/c0/e62/s5 add hotsparedrive dgs=0", 0, json!({}));
        let (inventory, runner) = inventory(runner);
        let drive = DriveAddress::new(0, Some(62), 5);

        inventory.add_hotspare(&drive, &[0]).await.unwrap();
        assert_eq!(
            runner.calls(),
            vec!["/c0 show J", "/c0/e62/s5 add hotsparedrive dgs=0 J"]
        );

        let err = inventory.add_hotspare(&drive, &[4]).await.unwrap_err();
        assert!(matches!(err, Error::NoSuchVirtualDrive { .. }));
    }
}
