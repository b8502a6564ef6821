//! Benchmark for decoding and cross-referencing a large `/call show`
//!
//! Target: a 4-controller host with 240 drives well under 10ms

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::{json, Value};
use std::sync::Arc;
use storcli_gateway::storcli::decoder::decode;
use storcli_gateway::storcli::xref::DriveTables;
use storcli_gateway::storcli::health::DriveHealthMap;
use storcli_gateway::{CommandOutput, CommandRunner, DecodeMode, Inventory, Result};

const CONTROLLERS: u32 = 4;
const DRIVES_PER_CONTROLLER: u32 = 60;
const DRIVES_PER_GROUP: u32 = 6;

fn controller_reply(controller: u32) -> Value {
    let pds: Vec<Value> = (0..DRIVES_PER_CONTROLLER)
        .map(|slot| {
            json!({
                "EID:Slt": format!("62:{}", slot), "DID": slot, "State": "Onln",
                "DG": slot / DRIVES_PER_GROUP, "Size": "1.090 TB", "Intf": "SAS",
                "Med": "HDD", "SeSz": "512B", "Model": "ST1200MM0088"
            })
        })
        .collect();
    let vds: Vec<Value> = (0..DRIVES_PER_CONTROLLER / DRIVES_PER_GROUP)
        .map(|dg| {
            json!({
                "DG/VD": format!("{}/{}", dg, dg), "TYPE": "RAID6", "State": "Optl",
                "Access": "RW", "Consist": "Yes", "Cache": "RWBD", "Size": "4.360 TB",
                "Name": format!("data{}", dg)
            })
        })
        .collect();

    json!({
        "Command Status": {"Controller": controller, "Status": "Success"},
        "Response Data": {"PD LIST": pds, "VD LIST": vds}
    })
}

fn host_reply() -> String {
    let controllers: Vec<Value> = (0..CONTROLLERS).map(controller_reply).collect();
    json!({ "Controllers": controllers }).to_string()
}

struct StaticRunner(CommandOutput);

#[async_trait]
impl CommandRunner for StaticRunner {
    async fn run(&self, _args: &[String]) -> Result<CommandOutput> {
        Ok(self.0.clone())
    }
}

fn bench_decode(c: &mut Criterion) {
    let output = CommandOutput::success(host_reply());
    let mut group = c.benchmark_group("inventory_parse");
    group.throughput(Throughput::Elements(u64::from(CONTROLLERS * DRIVES_PER_CONTROLLER)));

    group.bench_function("decode_permissive", |b| {
        b.iter(|| decode(black_box(&output), DecodeMode::Permissive))
    });

    let payloads = decode(&output, DecodeMode::Strict).unwrap();
    group.bench_function("cross_reference", |b| {
        b.iter(|| {
            DriveTables::from_payloads(black_box(&payloads))
                .unwrap()
                .cross_reference(&DriveHealthMap::new())
        })
    });

    group.finish();
}

fn bench_virtual_drives(c: &mut Criterion) {
    let runner = Arc::new(StaticRunner(CommandOutput::success(host_reply())));
    let inventory = Inventory::new(runner, DecodeMode::Permissive);

    c.bench_function("virtual_drives_all_controllers", |b| {
        b.iter(|| tokio_test::block_on(inventory.virtual_drives(None, None)))
    });
}

criterion_group!(benches, bench_decode, bench_virtual_drives);
criterion_main!(benches);
