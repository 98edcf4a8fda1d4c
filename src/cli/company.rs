//! Company CLI commands.
//!
//! - `show` - Company profile
//! - `update` - Edit profile fields
//! - `team` - List employees
//! - `add-member` - Create an employee account
//! - `logo upload|delete` - Manage the company logo

use crate::cli::common::{
    or_dash, password_or_prompt, print_info, print_success, prompt_select, value_or_prompt,
    CliContext,
};
use crate::models::{Company, NewTeamMember, UpdateCompanyRequest};
use crate::utils::validation::{format_phone, format_rfc, validate_email, validate_rfc};
use crate::utils::expand_path;
use anyhow::{bail, Result};
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum CompanyCommand {
    /// Show the company profile
    Show,
    /// Update company profile fields (only the given ones are sent)
    Update {
        #[arg(long)]
        name: Option<String>,
        /// Mexican tax id (12 or 13 characters)
        #[arg(long)]
        rfc: Option<String>,
        #[arg(long)]
        fiscal_address: Option<String>,
        #[arg(long)]
        contact_email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        website: Option<String>,
    },
    /// List team members
    Team,
    /// Add a team member
    AddMember {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        position: Option<String>,
        /// Role id (prompted from the role list when omitted)
        #[arg(short, long)]
        role: Option<i64>,
    },
    /// Manage the company logo
    Logo {
        #[command(subcommand)]
        command: LogoCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum LogoCommand {
    /// Upload a new logo image
    Upload {
        /// Image file (png, jpg, gif, webp or svg)
        path: String,
    },
    /// Remove the current logo
    Delete,
}

/// Execute a company subcommand.
pub fn execute(ctx: &CliContext, command: CompanyCommand) -> Result<()> {
    ctx.require_login()?;
    match command {
        CompanyCommand::Show => cmd_show(ctx),
        CompanyCommand::Update {
            name,
            rfc,
            fiscal_address,
            contact_email,
            phone,
            website,
        } => cmd_update(
            ctx,
            UpdateCompanyRequest {
                name,
                rfc,
                fiscal_address,
                contact_email,
                phone,
                website,
            },
        ),
        CompanyCommand::Team => cmd_team(ctx),
        CompanyCommand::AddMember {
            name,
            email,
            phone,
            position,
            role,
        } => cmd_add_member(ctx, name, email, phone, position, role),
        CompanyCommand::Logo { command } => match command {
            LogoCommand::Upload { path } => cmd_logo_upload(ctx, &path),
            LogoCommand::Delete => cmd_logo_delete(ctx),
        },
    }
}

fn print_company(company: &Company) {
    println!("{} ({})", company.name, company.status);
    println!("  Slug:            {}", or_dash(Some(&company.slug)));
    println!("  RFC:             {}", or_dash(company.rfc.as_deref()));
    println!("  Fiscal address:  {}", or_dash(company.fiscal_address.as_deref()));
    println!("  Contact email:   {}", or_dash(company.contact_email.as_deref()));
    println!("  Phone:           {}", or_dash(company.phone.as_deref()));
    println!("  Website:         {}", or_dash(company.website.as_deref()));
    println!("  Logo:            {}", or_dash(company.logo.as_deref()));
}

fn cmd_show(ctx: &CliContext) -> Result<()> {
    let company = ctx.block_on(ctx.company().get_company())?;
    print_company(&company);
    Ok(())
}

fn cmd_update(ctx: &CliContext, mut request: UpdateCompanyRequest) -> Result<()> {
    if request.is_empty() {
        bail!("Nothing to update. Pass at least one field, e.g. --phone");
    }

    if let Some(rfc) = request.rfc.take() {
        let rfc = format_rfc(&rfc);
        if !validate_rfc(&rfc) {
            bail!("Invalid RFC: {}", rfc);
        }
        request.rfc = Some(rfc);
    }
    if let Some(email) = &request.contact_email {
        if !validate_email(email) {
            bail!("Invalid contact email: {}", email);
        }
    }
    request.phone = request.phone.as_deref().map(format_phone);

    let company = ctx.block_on(ctx.company().update_company(&request))?;
    print_success("Company information updated");
    print_company(&company);
    Ok(())
}

fn cmd_team(ctx: &CliContext) -> Result<()> {
    let members = ctx.block_on(ctx.company().company_employees())?;
    if members.is_empty() {
        print_info("No team members yet");
        return Ok(());
    }

    println!("Team members ({}):", members.len());
    for member in &members {
        println!(
            "  #{:<5} {:<24} {:<32} {:<16} {}",
            member.id,
            member.name,
            member.email,
            member.primary_role(),
            or_dash(member.position.as_deref())
        );
    }
    Ok(())
}

fn cmd_add_member(
    ctx: &CliContext,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    position: Option<String>,
    role: Option<i64>,
) -> Result<()> {
    let name = value_or_prompt(name, "Name")?;
    let email = value_or_prompt(email, "Email")?;
    let password = password_or_prompt(None, "Initial password")?;

    let role_id = match role {
        Some(id) => id,
        None => {
            let roles = ctx.block_on(ctx.users().roles())?;
            let labels: Vec<String> = roles.iter().map(|r| r.name.clone()).collect();
            let index = prompt_select("Role", &labels)?;
            roles[index].id
        }
    };

    let member = NewTeamMember {
        name,
        email,
        password,
        phone: phone.as_deref().map(format_phone),
        position,
        timezone: None,
        roles: vec![role_id],
    };
    let created = ctx.block_on(ctx.company().add_employee(&member))?;
    print_success(&format!("Added {} <{}>", created.name, created.email));
    Ok(())
}

fn cmd_logo_upload(ctx: &CliContext, path: &str) -> Result<()> {
    let path = expand_path(path);
    if !path.is_file() {
        bail!("Logo file not found: {}", path.display());
    }
    let upload = ctx.block_on(ctx.company().upload_logo(&path))?;
    print_success(&format!("Logo uploaded: {}", upload.logo_url));
    Ok(())
}

fn cmd_logo_delete(ctx: &CliContext) -> Result<()> {
    ctx.block_on(ctx.company().delete_logo())?;
    print_success("Logo deleted");
    Ok(())
}
