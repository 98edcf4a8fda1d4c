//! Integration tests for device activation, lifecycle and the fleet map.

mod common;

use anyhow::Result;
use axum::http::Method;
use common::TestEnv;
use serde_json::json;
use trackgpx::map::{render_fleet_map, vehicle_from_history};
use trackgpx::models::{ActivateDeviceRequest, BillingCycle, DeviceStatus, UpdateDeviceRequest};
use trackgpx::services::{DeviceService, PaymentGateway};

const IMEI: &str = "356938035643809";
const CODE: &str = "ABC123XYZ";

fn device_json(id: i64, vehicle_id: Option<i64>) -> serde_json::Value {
    json!({
        "id": id,
        "imei": IMEI,
        "serial_number": "SN-0042",
        "model": "TK-103",
        "status": "active",
        "vehicle_id": vehicle_id
    })
}

// ============================================================================
// ACTIVATION
// ============================================================================

#[tokio::test]
async fn preview_sends_only_the_imei() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    let path = format!("/billing/devices/preview/{}", IMEI);
    env.backend
        .ok(Method::GET, &path, json!({ "success": true, "data": device_json(5, None) }));

    let device = DeviceService::new(env.client.clone())
        .preview_activation(IMEI, CODE)
        .await?;

    assert_eq!(device.id, 5);
    assert_eq!(device.status, DeviceStatus::Active);
    let sent = &env.backend.requests_to(&path)[0];
    assert_eq!(sent.query, None);
    assert!(!sent.body.contains(CODE));
    Ok(())
}

#[tokio::test]
async fn malformed_activation_input_never_reaches_backend() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    let devices = DeviceService::new(env.client.clone());

    let err = devices.preview_activation("12345", CODE).await.unwrap_err();
    assert_eq!(err.to_string(), "IMEI must be 15 digits");

    let err = devices.preview_activation(IMEI, "SHORT").await.unwrap_err();
    assert_eq!(err.to_string(), "Activation code must be 9 characters");

    assert!(env.backend.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn preview_of_unknown_imei_uses_fallback_message() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend.respond(
        Method::GET,
        &format!("/billing/devices/preview/{}", IMEI),
        404,
        json!({}),
    );

    let err = DeviceService::new(env.client.clone())
        .preview_activation(IMEI, CODE)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid activation code");
    Ok(())
}

#[tokio::test]
async fn activation_posts_plan_card_and_session() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend
        .ok(Method::GET, "/oa/logo.htm", json!({}))
        .ok(
            Method::POST,
            "/billing/devices/activate",
            json!({
                "success": true,
                "message": "Device activated",
                "data": { "device": device_json(5, None), "subscription": {}, "payment": {} }
            }),
        );

    let session_id = env.gateway().device_session_id().await?;
    assert_eq!(session_id.len(), 32);

    let request = ActivateDeviceRequest {
        imei: IMEI.to_string(),
        activation_code: CODE.to_string(),
        plan_id: 2,
        billing_cycle: BillingCycle::Annual,
        card_id: "card_01".to_string(),
        device_session_id: session_id.clone(),
    };
    let response = DeviceService::new(env.client.clone())
        .activate_device(&request)
        .await?;

    assert!(response.success);
    assert_eq!(response.data.map(|d| d.device.id), Some(5));
    let body = env.backend.requests_to("/billing/devices/activate")[0].json();
    assert_eq!(
        body,
        json!({
            "imei": IMEI,
            "activation_code": CODE,
            "plan_id": 2,
            "billing_cycle": "annual",
            "card_id": "card_01",
            "device_session_id": session_id
        })
    );
    Ok(())
}

#[tokio::test]
async fn declined_activation_surfaces_server_message() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend.respond(
        Method::POST,
        "/billing/devices/activate",
        422,
        json!({ "success": false, "message": "Card declined by bank" }),
    );

    let request = ActivateDeviceRequest {
        imei: IMEI.to_string(),
        activation_code: CODE.to_string(),
        plan_id: 1,
        billing_cycle: BillingCycle::Monthly,
        card_id: "card_01".to_string(),
        device_session_id: "abc".to_string(),
    };
    let err = DeviceService::new(env.client.clone())
        .activate_device(&request)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Card declined by bank");
    Ok(())
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[tokio::test]
async fn device_lists_unwrap_paginated_envelopes() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend
        .ok(
            Method::GET,
            "/devices",
            json!({ "data": { "data": [device_json(1, Some(9)), device_json(2, None)], "total": 2 } }),
        )
        .ok(Method::GET, "/devices/available", json!([device_json(3, None)]));

    let devices = DeviceService::new(env.client.clone());
    let owned = devices.devices().await?;
    let available = devices.available_devices().await?;

    assert_eq!(owned.len(), 2);
    assert_eq!(owned[0].vehicle_id, Some(9));
    assert_eq!(available.len(), 1);
    Ok(())
}

#[tokio::test]
async fn update_sends_only_given_fields() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend
        .ok(Method::PUT, "/devices/5", json!({ "data": device_json(5, None) }));

    let request = UpdateDeviceRequest {
        model: Some("TK-103".to_string()),
        status: Some(DeviceStatus::Suspended),
        ..UpdateDeviceRequest::default()
    };
    DeviceService::new(env.client.clone())
        .update_device(5, &request)
        .await?;

    assert_eq!(
        env.backend.requests_to("/devices/5")[0].json(),
        json!({ "model": "TK-103", "status": "suspended" })
    );
    Ok(())
}

#[tokio::test]
async fn assign_and_unassign_vehicle() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend
        .ok(Method::POST, "/devices/5/assign", json!({ "data": device_json(5, Some(12)) }))
        .ok(Method::POST, "/devices/5/unassign", json!({ "data": device_json(5, None) }))
        .ok(Method::POST, "/devices/5/deactivate", json!({ "success": true }));

    let devices = DeviceService::new(env.client.clone());
    let assigned = devices.assign_to_vehicle(5, 12).await?;
    assert_eq!(assigned.vehicle_id, Some(12));
    assert_eq!(
        env.backend.requests_to("/devices/5/assign")[0].json(),
        json!({ "vehicle_id": 12 })
    );

    let unassigned = devices.unassign_from_vehicle(5).await?;
    assert_eq!(unassigned.vehicle_id, None);

    devices.deactivate_device(5).await?;
    assert_eq!(env.backend.requests().len(), 3);
    Ok(())
}

// ============================================================================
// HISTORY AND MAP
// ============================================================================

#[tokio::test]
async fn history_feeds_the_fleet_map() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend.ok(
        Method::GET,
        "/devices/5/history",
        json!({ "data": [
            { "lat": 19.40, "lng": -99.10, "speed": 0, "created_at": "2026-10-18T08:00:00Z" },
            { "lat": 19.43, "lng": -99.13, "speed": 54.6, "address": "Av. Reforma",
              "created_at": "2026-10-18T09:30:00Z" }
        ]}),
    );

    let devices = DeviceService::new(env.client.clone());
    let points = devices
        .location_history(5, "2026-10-18T00:00:00Z", "2026-10-19T00:00:00Z")
        .await?;
    assert_eq!(points.len(), 2);

    let sent = &env.backend.requests_to("/devices/5/history")[0];
    let query = sent.query.as_deref().unwrap_or_default();
    assert!(query.contains("start_date=2026-10-18T00%3A00%3A00Z"));
    assert!(query.contains("end_date=2026-10-19T00%3A00%3A00Z"));

    let device = serde_json::from_value(device_json(5, Some(12)))?;
    let vehicle = vehicle_from_history(&device, &points).unwrap();
    assert_eq!(vehicle.id, 12);
    assert_eq!(vehicle.name, "SN-0042");
    assert!(vehicle.is_moving());
    assert_eq!(vehicle.speed, "55 km/h");
    assert_eq!(vehicle.location.as_deref(), Some("Av. Reforma"));

    let html = render_fleet_map(&[vehicle], "maps-key", [-34.6037, -58.3816]);
    assert!(html.contains("key=maps-key"));
    assert!(html.contains("Av. Reforma"));
    assert!(html.contains("19.43"));
    Ok(())
}
