//! REST API Handlers
//!
//! Maps the `/v0.5` resource tree onto inventory operations. Path
//! segments and bodies are validated here so that malformed requests
//! never reach the tool and always get the JSON envelope back.

use crate::api::envelope::{ApiReply, ApiResult};
use crate::domain::model::{CacheType, DriveAddress};
use crate::error::{Error, Result};
use crate::metrics;
use crate::storcli::{
    ControllerSelector, CreateVirtualDrive, HotspareRequest, InventoryRef, Overprovision,
    UpdateVirtualDrive, VirtualDriveSelector,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde_json::Value;
use std::str::FromStr;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Version prefix of every inventory route
pub const API_PREFIX: &str = "/v0.5";

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    inventory: InventoryRef,
}

impl RestRouter {
    pub fn new(inventory: InventoryRef) -> Self {
        Self { inventory }
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            inventory: self.inventory,
        };

        let api = Router::new()
            .route("/controllers", get(list_controllers))
            .route("/controllers/:controller", get(controller_details))
            .route("/controllers/:controller/physicaldevices", get(physical_devices))
            .route(
                "/controllers/:controller/physicaldevices/:enclosure/:slot/hotspare",
                get(method_not_supported).post(add_hotspare).delete(delete_hotspare),
            )
            .route(
                "/controllers/:controller/virtualdevices",
                get(virtual_devices)
                    .post(create_virtual_device)
                    .delete(delete_all_virtual_devices),
            )
            .route(
                "/controllers/:controller/virtualdevices/:segment",
                get(get_virtual_device)
                    .post(post_virtual_device)
                    .delete(delete_virtual_device),
            )
            .route(
                "/controllers/:controller/virtualdevices/:segment/:vd",
                get(get_cache_volume).delete(delete_cache_volume),
            );

        Router::new()
            .nest(API_PREFIX, api)
            .route("/healthz", get(health_check))
            .route("/metrics", get(metrics_export))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    inventory: InventoryRef,
}

// =============================================================================
// Request parsing
// =============================================================================

fn parse_id(what: &str, raw: &str) -> Result<u32> {
    raw.parse()
        .map_err(|_| Error::Validation(format!("invalid {}: {}", what, raw)))
}

/// Request body as JSON; an empty body is `null`
fn parse_body(body: &Bytes) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|e| Error::Validation(format!("malformed JSON body: {}", e)))
}

/// Request body whose keys are all optional.
///
/// Malformed JSON and non-object bodies are treated as an empty body.
fn parse_optional_body(body: &Bytes) -> Value {
    match parse_body(body) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => Value::Null,
        Err(e) => {
            debug!("Ignoring request body: {}", e);
            Value::Null
        }
    }
}

/// Last segment of `/virtualdevices/{segment}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VirtualDeviceSegment {
    Id(u32),
    Cache(CacheType),
    WarpDrive,
}

impl FromStr for VirtualDeviceSegment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "warpdrive" {
            return Ok(VirtualDeviceSegment::WarpDrive);
        }
        if let Ok(id) = s.parse() {
            return Ok(VirtualDeviceSegment::Id(id));
        }
        s.parse().map(VirtualDeviceSegment::Cache)
    }
}

fn unsupported(what: &str) -> Error {
    Error::Validation(format!("{} is not supported on this resource", what))
}

// =============================================================================
// Controller handlers
// =============================================================================

async fn list_controllers(State(state): State<AppState>) -> ApiResult {
    let controllers = state.inventory.list_controllers().await?;
    ApiReply::ok(&controllers)
}

async fn controller_details(
    State(state): State<AppState>,
    Path(controller): Path<String>,
) -> ApiResult {
    let selector: ControllerSelector = controller.parse()?;
    let details = state.inventory.controller_details(selector).await?;

    match selector {
        ControllerSelector::All => ApiReply::ok(&details),
        ControllerSelector::Id(id) => {
            let single = details
                .into_iter()
                .find(|d| d.controller.id == id)
                .ok_or_else(|| Error::invalid_response(format!("no data for controller {}", id)))?;
            ApiReply::ok(&single)
        }
    }
}

async fn physical_devices(
    State(state): State<AppState>,
    Path(controller): Path<String>,
) -> ApiResult {
    let selector: ControllerSelector = controller.parse()?;
    let drives = state.inventory.physical_drives(selector.id()).await?;
    ApiReply::ok(&drives)
}

// =============================================================================
// Virtual drive handlers
// =============================================================================

async fn virtual_devices(
    State(state): State<AppState>,
    Path(controller): Path<String>,
) -> ApiResult {
    let selector: ControllerSelector = controller.parse()?;
    let drives = state
        .inventory
        .virtual_drives(selector.id(), None)
        .await?;
    ApiReply::ok(&drives)
}

async fn create_virtual_device(
    State(state): State<AppState>,
    Path(controller): Path<String>,
    body: Bytes,
) -> ApiResult {
    let controller = parse_id("controller id", &controller)?;
    let request = CreateVirtualDrive::from_json(controller, None, &parse_body(&body)?)?;
    let created = state.inventory.create_virtual_drive(&request).await?;
    ApiReply::created(&created)
}

async fn delete_all_virtual_devices(
    State(state): State<AppState>,
    Path(controller): Path<String>,
) -> ApiResult {
    let controller = parse_id("controller id", &controller)?;
    state
        .inventory
        .delete_virtual_drive(controller, VirtualDriveSelector::All, None, true)
        .await?;
    Ok(ApiReply::empty())
}

async fn get_virtual_device(
    State(state): State<AppState>,
    Path((controller, segment)): Path<(String, String)>,
) -> ApiResult {
    let controller = parse_id("controller id", &controller)?;
    match segment.parse::<VirtualDeviceSegment>()? {
        VirtualDeviceSegment::Id(vd) => {
            let drive = state
                .inventory
                .virtual_drive_details(controller, vd, None)
                .await?;
            ApiReply::ok(&drive)
        }
        VirtualDeviceSegment::Cache(cache_type) => {
            let drives = state
                .inventory
                .virtual_drives(Some(controller), Some(cache_type))
                .await?;
            ApiReply::ok(&drives)
        }
        VirtualDeviceSegment::WarpDrive => Err(unsupported("GET")),
    }
}

async fn post_virtual_device(
    State(state): State<AppState>,
    Path((controller, segment)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult {
    let controller = parse_id("controller id", &controller)?;
    let segment: VirtualDeviceSegment = segment.parse()?;

    match segment {
        VirtualDeviceSegment::Id(vd) => {
            let update = UpdateVirtualDrive::from_json(&parse_body(&body)?)?;
            state
                .inventory
                .update_virtual_drive(controller, vd, &update)
                .await?;
            Ok(ApiReply::empty())
        }
        VirtualDeviceSegment::Cache(cache_type) => {
            let request = CreateVirtualDrive::from_json(controller, Some(cache_type), &parse_body(&body)?)?;
            let created = state.inventory.create_virtual_drive(&request).await?;
            ApiReply::created(&created)
        }
        VirtualDeviceSegment::WarpDrive => {
            let overprovision = Overprovision::from_json(&parse_optional_body(&body))?;
            state
                .inventory
                .initialize_warpdrive(controller, overprovision)
                .await?;
            Ok(ApiReply::empty())
        }
    }
}

async fn delete_virtual_device(
    State(state): State<AppState>,
    Path((controller, segment)): Path<(String, String)>,
) -> ApiResult {
    let controller = parse_id("controller id", &controller)?;
    match segment.parse::<VirtualDeviceSegment>()? {
        VirtualDeviceSegment::Id(vd) => {
            state
                .inventory
                .delete_virtual_drive(controller, VirtualDriveSelector::Id(vd), None, true)
                .await?;
            Ok(ApiReply::empty())
        }
        VirtualDeviceSegment::Cache(_) | VirtualDeviceSegment::WarpDrive => {
            Err(unsupported("DELETE"))
        }
    }
}

/// Parse `/virtualdevices/{cache type}/{vd}`
fn cache_volume_path(controller: &str, segment: &str, vd: &str) -> Result<(u32, CacheType, u32)> {
    Ok((
        parse_id("controller id", controller)?,
        segment.parse::<CacheType>()?,
        parse_id("virtual drive id", vd)?,
    ))
}

async fn get_cache_volume(
    State(state): State<AppState>,
    Path((controller, segment, vd)): Path<(String, String, String)>,
) -> ApiResult {
    let (controller, cache_type, vd) = cache_volume_path(&controller, &segment, &vd)?;
    let drive = state
        .inventory
        .virtual_drive_details(controller, vd, Some(cache_type))
        .await?;
    ApiReply::ok(&drive)
}

async fn delete_cache_volume(
    State(state): State<AppState>,
    Path((controller, segment, vd)): Path<(String, String, String)>,
) -> ApiResult {
    let (controller, cache_type, vd) = cache_volume_path(&controller, &segment, &vd)?;
    state
        .inventory
        .delete_virtual_drive(controller, VirtualDriveSelector::Id(vd), Some(cache_type), false)
        .await?;
    Ok(ApiReply::empty())
}

// =============================================================================
// Hot spare handlers
// =============================================================================

fn hotspare_drive(controller: &str, enclosure: &str, slot: &str) -> Result<DriveAddress> {
    Ok(DriveAddress::new(
        parse_id("controller id", controller)?,
        Some(parse_id("enclosure", enclosure)?),
        parse_id("slot", slot)?,
    ))
}

async fn add_hotspare(
    State(state): State<AppState>,
    Path((controller, enclosure, slot)): Path<(String, String, String)>,
    body: Bytes,
) -> ApiResult {
    let drive = hotspare_drive(&controller, &enclosure, &slot)?;
    let request = HotspareRequest::from_json(&parse_optional_body(&body))?;
    state
        .inventory
        .add_hotspare(&drive, &request.virtual_drives)
        .await?;
    Ok(ApiReply::empty())
}

async fn delete_hotspare(
    State(state): State<AppState>,
    Path((controller, enclosure, slot)): Path<(String, String, String)>,
) -> ApiResult {
    let drive = hotspare_drive(&controller, &enclosure, &slot)?;
    state.inventory.delete_hotspare(&drive).await?;
    Ok(ApiReply::empty())
}

async fn method_not_supported() -> ApiResult {
    Err(unsupported("GET"))
}

// =============================================================================
// Service endpoints
// =============================================================================

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics_export() -> impl IntoResponse {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            debug!("Metrics export failed: {}", e);
            e.into_response()
        }
    }
}
