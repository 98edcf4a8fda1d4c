//! `trackgpx map`: write the fleet map to an HTML file.

use crate::cli::common::{history_window, print_info, print_success, print_warning, CliContext};
use crate::map::{render_fleet_map, vehicle_from_history, Vehicle};
use crate::utils::{expand_path, format_path_for_display};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing::warn;

/// Render the fleet map.
///
/// Vehicles come from `vehicles_file` (a JSON array) when given, otherwise
/// from the latest position of every company device within `hours`.
pub fn cmd_map(
    ctx: &CliContext,
    output: &str,
    vehicles_file: Option<&str>,
    hours: u32,
) -> Result<()> {
    let Some(api_key) = ctx.config.maps.api_key.as_deref().filter(|k| !k.is_empty()) else {
        anyhow::bail!(
            "No maps API key. Set [maps] api_key in {}",
            format_path_for_display(&ctx.config_path)
        );
    };

    let vehicles = match vehicles_file {
        Some(path) => load_vehicles(&expand_path(path))?,
        None => {
            ctx.require_login()?;
            fleet_positions(ctx, hours)?
        }
    };
    if vehicles.is_empty() {
        print_warning("No vehicle positions found; the map will be empty");
    }

    let html = render_fleet_map(&vehicles, api_key, ctx.config.maps.default_center);
    let output = expand_path(output);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    std::fs::write(&output, html)
        .with_context(|| format!("Failed to write map: {:?}", output))?;

    print_success(&format!(
        "Map with {} vehicles written to {}",
        vehicles.len(),
        format_path_for_display(&output)
    ));
    Ok(())
}

fn load_vehicles(path: &Path) -> Result<Vec<Vehicle>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read vehicles file: {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse vehicles file: {:?}", path))
}

fn fleet_positions(ctx: &CliContext, hours: u32) -> Result<Vec<Vehicle>> {
    let (start, end) = history_window(Utc::now(), hours)?;
    let devices = ctx.block_on(ctx.devices().devices())?;

    let mut vehicles = Vec::new();
    for device in &devices {
        // one device without history should not hide the rest of the fleet
        let points = match ctx.block_on(ctx.devices().location_history(device.id, &start, &end)) {
            Ok(points) => points,
            Err(e) => {
                warn!("No history for device {}: {:#}", device.id, e);
                continue;
            }
        };
        match vehicle_from_history(device, &points) {
            Some(vehicle) => vehicles.push(vehicle),
            None => print_info(&format!(
                "Device {} reported no position in the last {} hours",
                device.imei, hours
            )),
        }
    }
    Ok(vehicles)
}
