//! Shared test harness: a scripted storcli and fixture loading

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use storcli_gateway::{CommandOutput, CommandRunner, DecodeMode, Inventory, Result};

/// Read a file from `tests/fixtures`
pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {}: {}", path, e))
}

/// Successful storcli reply for one controller
pub fn success_reply(controller: u32, data: Value) -> String {
    json!({"Controllers": [{
        "Command Status": {"Controller": controller, "Status": "Success", "Description": "None"},
        "Response Data": data
    }]})
    .to_string()
}

/// `PD LIST` row
pub fn pd_row(enclosure: u32, slot: u32, dg: Value) -> Value {
    json!({
        "EID:Slt": format!("{}:{}", enclosure, slot), "DID": slot + 10,
        "State": if dg == json!("-") { "UGood" } else { "Onln" },
        "DG": dg, "Size": "278.875 GB", "Intf": "SAS", "Med": "HDD",
        "SED": "N", "PI": "N", "SeSz": "512B", "Model": "ST300MM0006", "Sp": "U"
    })
}

/// `VD LIST` row
pub fn vd_row(dg: u32, vd: u32, raid: &str) -> Value {
    json!({
        "DG/VD": format!("{}/{}", dg, vd), "TYPE": raid, "State": "Optl",
        "Access": "RW", "Consist": "Yes", "Cache": "RWBD", "sCC": "-",
        "Size": "278.875 GB", "Name": ""
    })
}

/// storcli stand-in answering by joined argument list.
///
/// Unknown commands exit with status 1 and print nothing.
#[derive(Default)]
pub struct ScriptedRunner {
    replies: Mutex<HashMap<String, CommandOutput>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer `command` (without the trailing `J`) with `stdout`
    pub fn on(&self, command: &str, stdout: impl Into<String>) -> &Self {
        self.on_output(command, CommandOutput::success(stdout))
    }

    pub fn on_output(&self, command: &str, output: CommandOutput) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .insert(format!("{} J", command), output);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn inventory(self: &Arc<Self>, mode: DecodeMode) -> Arc<Inventory> {
        Arc::new(Inventory::new(self.clone(), mode))
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, args: &[String]) -> Result<CommandOutput> {
        let key = args.join(" ");
        self.calls.lock().unwrap().push(key.clone());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| CommandOutput::new("", Some(1))))
    }
}

/// Runner answering the listing and detail queries of the fixture host
pub fn fixture_host() -> Arc<ScriptedRunner> {
    let runner = ScriptedRunner::new();
    runner
        .on("/call show all", fixture("call_show_all.json"))
        .on("/c0/eall show", fixture("c0_eall_show.json"))
        .on("/c0 show health", fixture("c0_show_health.json"))
        .on("/c1 show health", fixture("c1_show_health.json"))
        .on("/c0 show", fixture("c0_show.json"))
        .on("/c0 show all", fixture("c0_show_all.json"))
        .on("/c0/eall/sall show all", fixture("c0_eall_sall_show_all.json"));
    runner
}
