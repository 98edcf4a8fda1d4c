//! Device CLI commands.
//!
//! - `list` - Company devices, or stock available for activation
//! - `show` - One device
//! - `preview` - Check an IMEI and activation code
//! - `activate` - Pay for a plan and activate a device
//! - `update`, `deactivate`, `assign`, `unassign` - Device lifecycle
//! - `history` - Location history for a time window

use crate::cli::common::{
    history_window, or_dash, print_info, print_success, print_warning, prompt_confirm,
    prompt_select, value_or_prompt, CliContext, MAX_HISTORY_HOURS,
};
use crate::models::{ActivateDeviceRequest, BillingCycle, Device, DeviceStatus, UpdateDeviceRequest};
use crate::services::plan_service::calculate_price;
use crate::services::PaymentGateway;
use crate::utils::format_amount;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum DevicesCommand {
    /// List devices
    List {
        /// Show devices available for activation instead
        #[arg(short, long)]
        available: bool,
    },
    /// Show one device
    Show { id: i64 },
    /// Validate an IMEI and activation code before activating
    Preview {
        /// 15-digit IMEI
        imei: String,
        /// 9-character activation code
        code: String,
    },
    /// Activate a device with a plan and a saved card
    Activate {
        #[arg(long)]
        imei: Option<String>,
        #[arg(long)]
        code: Option<String>,
        /// Plan id (prompted when omitted)
        #[arg(long)]
        plan: Option<i64>,
        /// Billing cycle: monthly or annual
        #[arg(long, default_value = "monthly")]
        cycle: BillingCycle,
        /// Saved card id (prompted when omitted)
        #[arg(long)]
        card: Option<String>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Update device fields
    Update {
        id: i64,
        #[arg(long)]
        serial_number: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// active, inactive or suspended
        #[arg(long)]
        status: Option<String>,
    },
    /// Deactivate a device
    Deactivate {
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Assign a device to a vehicle
    Assign { id: i64, vehicle_id: i64 },
    /// Remove a device from its vehicle
    Unassign { id: i64 },
    /// Location history
    History {
        id: i64,
        /// Start of the window (defaults to `--hours` ago)
        #[arg(long)]
        start: Option<String>,
        /// End of the window (defaults to now)
        #[arg(long)]
        end: Option<String>,
        /// Window size when `--start` is omitted
        #[arg(
            long,
            default_value_t = 24,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HISTORY_HOURS))
        )]
        hours: u32,
    },
}

/// Execute a devices subcommand.
pub fn execute(ctx: &CliContext, command: DevicesCommand) -> Result<()> {
    ctx.require_login()?;
    match command {
        DevicesCommand::List { available } => cmd_list(ctx, available),
        DevicesCommand::Show { id } => cmd_show(ctx, id),
        DevicesCommand::Preview { imei, code } => cmd_preview(ctx, &imei, &code),
        DevicesCommand::Activate {
            imei,
            code,
            plan,
            cycle,
            card,
            yes,
        } => cmd_activate(ctx, imei, code, plan, cycle, card, yes),
        DevicesCommand::Update {
            id,
            serial_number,
            model,
            status,
        } => cmd_update(ctx, id, serial_number, model, status),
        DevicesCommand::Deactivate { id, yes } => cmd_deactivate(ctx, id, yes),
        DevicesCommand::Assign { id, vehicle_id } => cmd_assign(ctx, id, vehicle_id),
        DevicesCommand::Unassign { id } => cmd_unassign(ctx, id),
        DevicesCommand::History {
            id,
            start,
            end,
            hours,
        } => cmd_history(ctx, id, start, end, hours),
    }
}

fn print_device_row(device: &Device) {
    println!(
        "  #{:<5} {:<16} {:<14} {:<12} {:<10} vehicle {}",
        device.id,
        device.imei,
        or_dash(Some(&device.serial_number)),
        or_dash(Some(&device.model)),
        device.status,
        device
            .vehicle_id
            .map_or_else(|| "-".to_string(), |v| v.to_string())
    );
}

fn print_device(device: &Device) {
    println!("Device #{} ({})", device.id, device.status);
    println!("  IMEI:          {}", device.imei);
    println!("  Serial number: {}", or_dash(Some(&device.serial_number)));
    println!("  Model:         {}", or_dash(Some(&device.model)));
    println!(
        "  Vehicle:       {}",
        device
            .vehicle_id
            .map_or_else(|| "-".to_string(), |v| v.to_string())
    );
    println!("  Activated at:  {}", or_dash(device.activated_at.as_deref()));
}

fn cmd_list(ctx: &CliContext, available: bool) -> Result<()> {
    let devices = if available {
        ctx.block_on(ctx.devices().available_devices())?
    } else {
        ctx.block_on(ctx.devices().devices())?
    };

    if devices.is_empty() {
        print_info(if available {
            "No devices available for activation"
        } else {
            "No devices yet. Activate one with: trackgpx devices activate"
        });
        return Ok(());
    }

    println!("Devices ({}):", devices.len());
    for device in &devices {
        print_device_row(device);
    }
    Ok(())
}

fn cmd_show(ctx: &CliContext, id: i64) -> Result<()> {
    let device = ctx.block_on(ctx.devices().device(id))?;
    print_device(&device);
    Ok(())
}

fn cmd_preview(ctx: &CliContext, imei: &str, code: &str) -> Result<()> {
    let device = ctx.block_on(ctx.devices().preview_activation(imei, code))?;
    print_success("Device is ready for activation");
    print_device(&device);
    Ok(())
}

fn cmd_activate(
    ctx: &CliContext,
    imei: Option<String>,
    code: Option<String>,
    plan_id: Option<i64>,
    cycle: BillingCycle,
    card: Option<String>,
    yes: bool,
) -> Result<()> {
    let imei = value_or_prompt(imei, "IMEI")?;
    let code = value_or_prompt(code, "Activation code")?;

    let device = ctx.block_on(ctx.devices().preview_activation(&imei, &code))?;
    print_info(&format!("Device {} ({}) found", device.imei, or_dash(Some(&device.model))));

    let plans = ctx.block_on(ctx.plans().plans())?;
    let plans: Vec<_> = plans.into_iter().filter(|p| p.is_active).collect();
    let plan = match plan_id {
        Some(id) => plans
            .into_iter()
            .find(|p| p.id == id)
            .with_context(|| format!("Plan {} not found", id))?,
        None => {
            let labels: Vec<String> = plans
                .iter()
                .map(|p| {
                    format!(
                        "{} - {}/mo, up to {} vehicles",
                        p.name,
                        format_amount(p.price, &p.currency),
                        p.max_vehicles
                    )
                })
                .collect();
            let index = prompt_select("Plan", &labels)?;
            plans
                .into_iter()
                .nth(index)
                .context("Plan selection out of range")?
        }
    };

    let methods = ctx.block_on(ctx.payments().payment_methods())?;
    let card_id = match card {
        Some(id) => id,
        None => {
            if methods.is_empty() {
                bail!("No saved cards. Add one with: trackgpx payments add-card");
            }
            let labels: Vec<String> = methods
                .iter()
                .map(|m| {
                    if m.is_default {
                        format!("{} (default)", m.summary())
                    } else {
                        m.summary()
                    }
                })
                .collect();
            let index = prompt_select("Card", &labels)?;
            methods[index].id.clone()
        }
    };

    let price = calculate_price(&plan, cycle);
    println!("Plan:    {} ({})", plan.name, cycle);
    println!("Charge:  {}", format_amount(price.final_price, &plan.currency));
    if price.savings > 0.0 {
        println!("Savings: {}", format_amount(price.savings, &plan.currency));
    }
    if !yes && !prompt_confirm("Activate this device?")? {
        print_info("Activation cancelled");
        return Ok(());
    }

    let gateway = ctx.gateway()?;
    let device_session_id = ctx.block_on(gateway.device_session_id())?;

    let request = ActivateDeviceRequest {
        imei,
        activation_code: code,
        plan_id: plan.id,
        billing_cycle: cycle,
        card_id,
        device_session_id,
    };
    let response = ctx.block_on(ctx.devices().activate_device(&request))?;
    if !response.success {
        bail!(
            "{}",
            if response.message.is_empty() {
                "Activation was not completed".to_string()
            } else {
                response.message
            }
        );
    }

    print_success(if response.message.is_empty() {
        "Device activated"
    } else {
        response.message.as_str()
    });
    if let Some(data) = &response.data {
        print_device(&data.device);
    }
    Ok(())
}

fn parse_status(status: &str) -> Result<DeviceStatus> {
    match status.trim().to_lowercase().as_str() {
        "active" => Ok(DeviceStatus::Active),
        "inactive" => Ok(DeviceStatus::Inactive),
        "suspended" => Ok(DeviceStatus::Suspended),
        other => bail!("Unknown status '{}' (expected active, inactive or suspended)", other),
    }
}

fn cmd_update(
    ctx: &CliContext,
    id: i64,
    serial_number: Option<String>,
    model: Option<String>,
    status: Option<String>,
) -> Result<()> {
    let request = UpdateDeviceRequest {
        serial_number,
        model,
        status: status.as_deref().map(parse_status).transpose()?,
        vehicle_id: None,
    };
    if request == UpdateDeviceRequest::default() {
        bail!("Nothing to update. Pass --serial-number, --model or --status");
    }

    let device = ctx.block_on(ctx.devices().update_device(id, &request))?;
    print_success("Device updated");
    print_device(&device);
    Ok(())
}

fn cmd_deactivate(ctx: &CliContext, id: i64, yes: bool) -> Result<()> {
    if !yes {
        print_warning("A deactivated device stops reporting its location.");
        if !prompt_confirm(&format!("Deactivate device #{}?", id))? {
            print_info("Cancelled");
            return Ok(());
        }
    }
    ctx.block_on(ctx.devices().deactivate_device(id))?;
    print_success(&format!("Device #{} deactivated", id));
    Ok(())
}

fn cmd_assign(ctx: &CliContext, id: i64, vehicle_id: i64) -> Result<()> {
    ctx.block_on(ctx.devices().assign_to_vehicle(id, vehicle_id))?;
    print_success(&format!("Device #{} assigned to vehicle #{}", id, vehicle_id));
    Ok(())
}

fn cmd_unassign(ctx: &CliContext, id: i64) -> Result<()> {
    ctx.block_on(ctx.devices().unassign_from_vehicle(id))?;
    print_success(&format!("Device #{} unassigned", id));
    Ok(())
}

fn cmd_history(
    ctx: &CliContext,
    id: i64,
    start: Option<String>,
    end: Option<String>,
    hours: u32,
) -> Result<()> {
    let (default_start, default_end) = history_window(Utc::now(), hours)?;
    let start = start.unwrap_or(default_start);
    let end = end.unwrap_or(default_end);

    let points = ctx.block_on(ctx.devices().location_history(id, &start, &end))?;
    if points.is_empty() {
        print_info("No positions in that window");
        return Ok(());
    }

    println!("Positions for device #{} ({}):", id, points.len());
    for point in &points {
        println!(
            "  {:<26} {:>10.5} {:>11.5} {:>6} km/h  {}",
            or_dash(point.recorded_at.as_deref()),
            point.latitude,
            point.longitude,
            point.speed.map_or_else(|| "-".to_string(), |s| format!("{:.0}", s)),
            or_dash(point.address.as_deref())
        );
    }
    Ok(())
}
