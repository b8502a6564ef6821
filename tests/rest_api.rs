//! REST surface against scripted storcli replies

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use common::{fixture, fixture_host, pd_row, success_reply, vd_row, ScriptedRunner};
use serde_json::{json, Value};
use std::sync::Arc;
use storcli_gateway::{CommandOutput, DecodeMode, RestRouter};
use tower::ServiceExt;

fn app(runner: &Arc<ScriptedRunner>) -> Router {
    RestRouter::new(runner.inventory(DecodeMode::Permissive)).build()
}

async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn get_controllers_uses_envelope() {
    let runner = fixture_host();
    let (status, body) = call(app(&runner), Method::GET, "/v0.5/controllers", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error_code"], 0);
    assert_eq!(body["error_message"], Value::Null);
    assert_eq!(body["data"][0]["controller_id"], 0);
    assert_eq!(body["data"][0]["enclosures"], json!([62, 252]));
    assert_eq!(body["data"][1]["pci_address"], Value::Null);
}

#[tokio::test]
async fn get_single_controller_details() {
    let runner = fixture_host();
    let (status, body) = call(app(&runner), Method::GET, "/v0.5/controllers/0", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["model"], "Nytro MegaRAID8100-4i");
    assert_eq!(body["data"]["physical_drives"].as_array().unwrap().len(), 5);
    assert_eq!(body["data"]["virtual_drives"][0]["raid_level"], "1");
}

#[tokio::test]
async fn invalid_create_is_rejected_before_the_tool_runs() {
    let runner = ScriptedRunner::new();
    let (status, body) = call(
        app(&runner),
        Method::POST,
        "/v0.5/controllers/0/virtualdevices",
        Some(json!({"raid_level": 1, "drives": []})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], 42);
    assert!(body["error_message"].as_str().unwrap().contains("drives"));
    assert_eq!(body["data"], Value::Null);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn create_virtual_drive_returns_201() {
    let runner = ScriptedRunner::new();
    runner
        .on("/c0 add vd r1 drives=62:0,1", success_reply(0, json!({})))
        .on(
            "/c0 show",
            success_reply(
                0,
                json!({
                    "PD LIST": [pd_row(62, 0, json!(0)), pd_row(62, 1, json!(0))],
                    "VD LIST": [vd_row(0, 0, "RAID1")]
                }),
            ),
        );

    let (status, body) = call(
        app(&runner),
        Method::POST,
        "/v0.5/controllers/0/virtualdevices",
        Some(json!({
            "raid_level": 1,
            "drives": [{"enclosure": 62, "slot": 0}, {"enclosure": 62, "slot": 1}]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["virtual_drive_id"], 0);
    assert_eq!(body["data"]["physical_drives"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn tool_failure_maps_to_500_with_tool_code() {
    let runner = ScriptedRunner::new();
    runner.on_output(
        "/c0 add vd r1 drives=62:0,1",
        CommandOutput::new(fixture("tool_failure.json"), Some(111)),
    );

    let (status, body) = call(
        app(&runner),
        Method::POST,
        "/v0.5/controllers/0/virtualdevices",
        Some(json!({"raid_level": 1, "drives": [{"enclosure": 62, "slot": 0}, {"enclosure": 62, "slot": 1}]})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error_code"], 42);
    assert!(body["error_message"].as_str().unwrap().contains("Add VD Failed"));
}

#[tokio::test]
async fn unknown_virtual_drive_is_404() {
    let runner = fixture_host();
    let (status, body) = call(
        app(&runner),
        Method::GET,
        "/v0.5/controllers/0/virtualdevices/7",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], 42);
}

#[tokio::test]
async fn cache_volume_routes() {
    let runner = fixture_host();
    let (status, body) = call(
        app(&runner),
        Method::GET,
        "/v0.5/controllers/0/virtualdevices/nytrocache",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        app(&runner),
        Method::GET,
        "/v0.5/controllers/0/virtualdevices/nytrocache/1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["raid_level"], "NytroCache");

    runner.on("/c0/v1 del nytrocache", success_reply(0, json!({})));
    let (status, _) = call(
        app(&runner),
        Method::DELETE,
        "/v0.5/controllers/0/virtualdevices/nytrocache/1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runner.calls().last().unwrap(), "/c0/v1 del nytrocache J");
}

#[tokio::test]
async fn update_and_delete_virtual_drive() {
    let runner = ScriptedRunner::new();
    runner
        .on(
            "/c0/v1 set iopolicy=direct name=FooBar wrcache=wb rdcache=NoRA ssdcaching=on",
            success_reply(0, json!({})),
        )
        .on("/c0/v1 del force", success_reply(0, json!({})));

    let (status, body) = call(
        app(&runner),
        Method::POST,
        "/v0.5/controllers/0/virtualdevices/1",
        Some(json!({
            "name": "FooBar", "write_cache": "wb", "read_ahead": false,
            "io_policy": "direct", "ssd_caching": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], Value::Null);

    let (status, _) = call(app(&runner), Method::DELETE, "/v0.5/controllers/0/virtualdevices/1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        app(&runner),
        Method::POST,
        "/v0.5/controllers/0/virtualdevices/1",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(runner.calls().len(), 2);
}

#[tokio::test]
async fn hotspare_and_warpdrive_routes() {
    let runner = ScriptedRunner::new();
    runner
        .on("/c0/e62/s19 add hotsparedrive", success_reply(0, json!({})))
        .on("/c0/e62/s19 delete hotsparedrive", success_reply(0, json!({})))
        .on(
            "/c1/eall/sall start format overprovision level=cap",
            success_reply(1, json!({})),
        );

    let (status, _) = call(
        app(&runner),
        Method::POST,
        "/v0.5/controllers/0/physicaldevices/62/19/hotspare",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        app(&runner),
        Method::DELETE,
        "/v0.5/controllers/0/physicaldevices/62/19/hotspare",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        app(&runner),
        Method::POST,
        "/v0.5/controllers/1/virtualdevices/warpdrive",
        Some(json!({"overprovision": "cap"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        app(&runner),
        Method::POST,
        "/v0.5/controllers/1/virtualdevices/warpdrive",
        Some(json!({"overprovision": "huge"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(runner.calls().len(), 3);
}

#[tokio::test]
async fn malformed_body_is_ignored_on_optional_body_routes() {
    let runner = ScriptedRunner::new();
    runner
        .on("/c0/e62/s19 add hotsparedrive", success_reply(0, json!({})))
        .on("/c1/eall/sall start format", success_reply(1, json!({})));

    for uri in [
        "/v0.5/controllers/0/physicaldevices/62/19/hotspare",
        "/v0.5/controllers/1/virtualdevices/warpdrive",
    ] {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::from("{not json"))
            .unwrap();
        let response = app(&runner).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }

    assert_eq!(
        runner.calls(),
        vec!["/c0/e62/s19 add hotsparedrive J", "/c1/eall/sall start format J"]
    );

    // required bodies still reject malformed JSON
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v0.5/controllers/0/virtualdevices")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app(&runner).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn healthz_and_metrics() {
    let runner = ScriptedRunner::new();

    let response = app(&runner)
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&runner)
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&text).contains("storcli_commands_total"));
}
