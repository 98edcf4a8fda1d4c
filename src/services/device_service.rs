//! GPS device listing, activation and assignment.

use super::{api_failure, decode, decode_list};
use crate::client::ApiClient;
use crate::models::{
    ActivateDeviceRequest, ActivateDeviceResponse, Device, LocationPoint, UpdateDeviceRequest,
};
use crate::utils::validation::validate_activation_input;
use crate::utils::{unwrap_data, unwrap_list};
use anyhow::Result;
use serde_json::{json, Value};
use tracing::info;

/// Service for the company's tracking devices
#[derive(Debug, Clone)]
pub struct DeviceService {
    client: ApiClient,
}

impl DeviceService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn fetch_list(&self, path: &str, fallback: &'static str) -> Result<Vec<Device>> {
        let body: Value = self.client.get(path).await.map_err(api_failure(fallback))?;
        decode_list(unwrap_list(body), "device")
    }

    /// Devices in stock that can still be activated
    pub async fn available_devices(&self) -> Result<Vec<Device>> {
        self.fetch_list("/devices/available", "Failed to load available devices")
            .await
    }

    pub async fn devices(&self) -> Result<Vec<Device>> {
        self.fetch_list("/devices", "Failed to load devices").await
    }

    pub async fn device(&self, id: i64) -> Result<Device> {
        let body: Value = self
            .client
            .get(&format!("/devices/{}", id))
            .await
            .map_err(api_failure("Failed to load device"))?;
        decode(unwrap_data(body), "device")
    }

    /// Check an IMEI before paying for its activation.
    ///
    /// The activation code is only checked locally; the backend looks the
    /// device up by IMEI.
    pub async fn preview_activation(&self, imei: &str, activation_code: &str) -> Result<Device> {
        validate_activation_input(imei, activation_code)?;

        let body: Value = self
            .client
            .get(&format!("/billing/devices/preview/{}", imei))
            .await
            .map_err(api_failure("Invalid activation code"))?;
        decode(unwrap_data(body), "device")
    }

    /// `POST /billing/devices/activate`: charge the card and bind the plan
    pub async fn activate_device(
        &self,
        request: &ActivateDeviceRequest,
    ) -> Result<ActivateDeviceResponse> {
        validate_activation_input(&request.imei, &request.activation_code)?;

        let response: ActivateDeviceResponse = self
            .client
            .post("/billing/devices/activate", request)
            .await
            .map_err(api_failure("Failed to activate device"))?;
        info!(
            "Device {} activation answered: success={}",
            request.imei, response.success
        );
        Ok(response)
    }

    pub async fn update_device(&self, id: i64, data: &UpdateDeviceRequest) -> Result<Device> {
        let body: Value = self
            .client
            .put(&format!("/devices/{}", id), data)
            .await
            .map_err(api_failure("Failed to update device"))?;
        decode(unwrap_data(body), "device")
    }

    pub async fn deactivate_device(&self, id: i64) -> Result<()> {
        self.client
            .post_empty::<Value>(&format!("/devices/{}/deactivate", id))
            .await
            .map_err(api_failure("Failed to deactivate device"))?;
        info!("Device {} deactivated", id);
        Ok(())
    }

    pub async fn assign_to_vehicle(&self, device_id: i64, vehicle_id: i64) -> Result<Device> {
        let body: Value = self
            .client
            .post(
                &format!("/devices/{}/assign", device_id),
                &json!({ "vehicle_id": vehicle_id }),
            )
            .await
            .map_err(api_failure("Failed to assign device"))?;
        info!("Device {} assigned to vehicle {}", device_id, vehicle_id);
        decode(unwrap_data(body), "device")
    }

    pub async fn unassign_from_vehicle(&self, device_id: i64) -> Result<Device> {
        let body: Value = self
            .client
            .post_empty(&format!("/devices/{}/unassign", device_id))
            .await
            .map_err(api_failure("Failed to unassign device"))?;
        info!("Device {} unassigned", device_id);
        decode(unwrap_data(body), "device")
    }

    /// `GET /devices/{id}/history?start_date&end_date`
    pub async fn location_history(
        &self,
        device_id: i64,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<LocationPoint>> {
        let body: Value = self
            .client
            .get_with_query(
                &format!("/devices/{}/history", device_id),
                &[("start_date", start_date), ("end_date", end_date)],
            )
            .await
            .map_err(api_failure("Failed to load location history"))?;
        decode_list(unwrap_list(body), "location point")
    }
}
