//! Plan catalog commands.

use crate::cli::common::{print_info, print_success, print_warning, CliContext};
use crate::models::{BillingCycle, Plan};
use crate::services::plan_service::{calculate_price, format_features};
use crate::utils::format_amount;
use anyhow::{bail, Result};
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum PlansCommand {
    /// List active plans
    List {
        /// Show prices for this billing cycle
        #[arg(long, default_value = "monthly")]
        cycle: BillingCycle,
    },
    /// Show one plan with its features and prices
    Show { id: i64 },
    /// Compare two or more plans side by side
    Compare {
        #[arg(required = true, num_args = 2..)]
        ids: Vec<i64>,
    },
    /// Recommend a plan for a fleet size
    Recommend {
        /// Number of vehicles to track
        vehicles: u32,
    },
}

/// Execute a plans subcommand.
pub fn execute(ctx: &CliContext, command: PlansCommand) -> Result<()> {
    ctx.require_login()?;
    match command {
        PlansCommand::List { cycle } => cmd_list(ctx, cycle),
        PlansCommand::Show { id } => cmd_show(ctx, id),
        PlansCommand::Compare { ids } => cmd_compare(ctx, &ids),
        PlansCommand::Recommend { vehicles } => cmd_recommend(ctx, vehicles),
    }
}

fn limits(plan: &Plan) -> String {
    format!(
        "up to {} vehicles, {} users",
        plan.max_vehicles, plan.max_users
    )
}

fn cmd_list(ctx: &CliContext, cycle: BillingCycle) -> Result<()> {
    let plans = ctx.block_on(ctx.plans().plans())?;
    let active: Vec<&Plan> = plans.iter().filter(|p| p.is_active).collect();
    if active.is_empty() {
        print_info("No plans available");
        return Ok(());
    }

    println!("Plans ({} billing):", cycle);
    for plan in active {
        let price = calculate_price(plan, cycle);
        println!(
            "  #{:<4} {:<20} {:>14}  {}",
            plan.id,
            plan.name,
            format_amount(price.final_price, &plan.currency),
            limits(plan)
        );
    }
    if cycle == BillingCycle::Annual {
        print_info("Annual billing includes two months free");
    }
    Ok(())
}

fn cmd_show(ctx: &CliContext, id: i64) -> Result<()> {
    let plan = ctx.block_on(ctx.plans().plan(id))?;
    if !plan.is_active {
        print_warning("This plan is no longer offered");
    }

    println!("{} (#{})", plan.name, plan.id);
    if !plan.description.is_empty() {
        println!("  {}", plan.description);
    }
    println!("  Limits:  {}", limits(&plan));
    if let Some(days) = plan.trial_days.filter(|d| *d > 0) {
        println!("  Trial:   {} days", days);
    }

    let monthly = calculate_price(&plan, BillingCycle::Monthly);
    let annual = calculate_price(&plan, BillingCycle::Annual);
    println!(
        "  Monthly: {}",
        format_amount(monthly.final_price, &plan.currency)
    );
    println!(
        "  Annual:  {} (save {})",
        format_amount(annual.final_price, &plan.currency),
        format_amount(annual.savings, &plan.currency)
    );

    let features = format_features(&plan);
    if !features.is_empty() {
        println!("  Features:");
        for feature in &features {
            println!("    - {}", feature.name);
        }
    }
    Ok(())
}

fn cmd_compare(ctx: &CliContext, ids: &[i64]) -> Result<()> {
    if ids.len() < 2 {
        bail!("Pick at least two plans to compare");
    }
    let comparison = ctx.block_on(ctx.plans().compare_plans(ids))?;

    for plan in &comparison.plans {
        println!(
            "{:<20} {:>14}/mo  {}",
            plan.name,
            format_amount(plan.price, &plan.currency),
            limits(plan)
        );
    }
    if !comparison.comparison.is_empty() {
        println!();
        for (key, value) in &comparison.comparison {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            println!("  {:<20} {}", key, text);
        }
    }
    Ok(())
}

fn cmd_recommend(ctx: &CliContext, vehicles: u32) -> Result<()> {
    match ctx.block_on(ctx.plans().recommended_plan(vehicles))? {
        Some(plan) => {
            print_success(&format!(
                "{} ({}/mo, {})",
                plan.name,
                format_amount(plan.price, &plan.currency),
                limits(&plan)
            ));
            if plan.max_vehicles < vehicles {
                print_warning(&format!(
                    "No plan covers {} vehicles; this is the largest one available",
                    vehicles
                ));
            }
        }
        None => print_info("No plans available"),
    }
    Ok(())
}
