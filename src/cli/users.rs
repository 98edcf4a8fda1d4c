//! User, role and permission commands.

use crate::cli::common::{
    or_dash, password_or_prompt, print_info, print_success, prompt_confirm, value_or_prompt,
    CliContext,
};
use crate::models::{
    CreateRoleRequest, CreateUserRequest, Permission, Role, UpdateRoleRequest, UpdateUserRequest,
    User,
};
use crate::utils::validation::{format_phone, validate_email, MIN_MEMBER_PASSWORD};
use anyhow::{bail, Result};
use clap::Subcommand;
use std::collections::BTreeMap;

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// List users
    List,
    /// Show one user
    Show { id: i64 },
    /// Create a user (password is prompted)
    Create {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(short, long)]
        role: i64,
    },
    /// Update user fields
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        role: Option<i64>,
    },
    /// Delete a user
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Re-enable a user
    Activate { id: i64 },
    /// Disable a user without deleting it
    Deactivate { id: i64 },
    /// Send an invitation email
    Invite {
        email: String,
        #[arg(short, long)]
        role: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum RolesCommand {
    /// List roles
    List,
    /// Show one role and its permissions
    Show { id: i64 },
    /// Create a role
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Permission ids, comma separated
        #[arg(short, long, value_delimiter = ',')]
        permissions: Vec<String>,
    },
    /// Update a role
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Replaces the permission list
        #[arg(long, value_delimiter = ',')]
        permissions: Option<Vec<String>>,
    },
    /// Delete a role
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Execute a users subcommand.
pub fn execute(ctx: &CliContext, command: UsersCommand) -> Result<()> {
    ctx.require_login()?;
    match command {
        UsersCommand::List => cmd_list(ctx),
        UsersCommand::Show { id } => cmd_show(ctx, id),
        UsersCommand::Create {
            name,
            email,
            phone,
            role,
        } => cmd_create(ctx, name, email, phone, role),
        UsersCommand::Update {
            id,
            name,
            email,
            phone,
            role,
        } => cmd_update(
            ctx,
            id,
            UpdateUserRequest {
                name,
                email,
                phone: phone.as_deref().map(format_phone),
                role_id: role,
                is_active: None,
            },
        ),
        UsersCommand::Delete { id, yes } => cmd_delete(ctx, id, yes),
        UsersCommand::Activate { id } => cmd_set_active(ctx, id, true),
        UsersCommand::Deactivate { id } => cmd_set_active(ctx, id, false),
        UsersCommand::Invite { email, role } => cmd_invite(ctx, &email, role),
    }
}

/// Execute a roles subcommand.
pub fn execute_roles(ctx: &CliContext, command: RolesCommand) -> Result<()> {
    ctx.require_login()?;
    match command {
        RolesCommand::List => cmd_roles(ctx),
        RolesCommand::Show { id } => cmd_role(ctx, id),
        RolesCommand::Create {
            name,
            description,
            permissions,
        } => cmd_create_role(
            ctx,
            &CreateRoleRequest {
                name,
                description,
                permissions,
            },
        ),
        RolesCommand::Update {
            id,
            name,
            description,
            permissions,
        } => cmd_update_role(
            ctx,
            id,
            &UpdateRoleRequest {
                name,
                description,
                permissions,
            },
        ),
        RolesCommand::Delete { id, yes } => cmd_delete_role(ctx, id, yes),
    }
}

fn role_name(user: &User) -> &str {
    user.role.as_ref().map_or("-", |r| r.name.as_str())
}

fn print_user(user: &User) {
    let state = if user.is_active { "active" } else { "inactive" };
    println!("{} <{}> ({})", user.name, user.email, state);
    println!("  User id:    {}", user.id);
    println!("  Role:       {}", role_name(user));
    println!("  Phone:      {}", or_dash(user.phone.as_deref()));
    println!("  Last login: {}", or_dash(user.last_login.as_deref()));
}

fn cmd_list(ctx: &CliContext) -> Result<()> {
    let users = ctx.block_on(ctx.users().users())?;
    if users.is_empty() {
        print_info("No users");
        return Ok(());
    }

    println!("Users ({}):", users.len());
    for user in &users {
        println!(
            "  #{:<5} {:<24} {:<32} {:<16} {}",
            user.id,
            user.name,
            user.email,
            role_name(user),
            if user.is_active { "active" } else { "inactive" }
        );
    }
    Ok(())
}

fn cmd_show(ctx: &CliContext, id: i64) -> Result<()> {
    let user = ctx.block_on(ctx.users().user(id))?;
    print_user(&user);
    Ok(())
}

fn cmd_create(
    ctx: &CliContext,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    role_id: i64,
) -> Result<()> {
    let name = value_or_prompt(name, "Name")?;
    let email = value_or_prompt(email, "Email")?;
    if !validate_email(&email) {
        bail!("Invalid email");
    }
    let password = password_or_prompt(None, "Password")?;
    if password.chars().count() < MIN_MEMBER_PASSWORD {
        bail!("Password must be at least {} characters", MIN_MEMBER_PASSWORD);
    }

    let request = CreateUserRequest {
        name,
        email,
        phone: phone.as_deref().map(format_phone),
        password,
        role_id,
    };
    let user = ctx.block_on(ctx.users().create_user(&request))?;
    print_success(&format!("Created user {} <{}>", user.name, user.email));
    Ok(())
}

fn cmd_update(ctx: &CliContext, id: i64, request: UpdateUserRequest) -> Result<()> {
    if request == UpdateUserRequest::default() {
        bail!("Nothing to update. Pass --name, --email, --phone or --role");
    }
    if let Some(email) = &request.email {
        if !validate_email(email) {
            bail!("Invalid email");
        }
    }
    let user = ctx.block_on(ctx.users().update_user(id, &request))?;
    print_success("User updated");
    print_user(&user);
    Ok(())
}

fn cmd_delete(ctx: &CliContext, id: i64, yes: bool) -> Result<()> {
    if !yes && !prompt_confirm(&format!("Delete user #{}?", id))? {
        print_info("Cancelled");
        return Ok(());
    }
    ctx.block_on(ctx.users().delete_user(id))?;
    print_success(&format!("User #{} deleted", id));
    Ok(())
}

fn cmd_set_active(ctx: &CliContext, id: i64, is_active: bool) -> Result<()> {
    let user = ctx.block_on(ctx.users().toggle_user_status(id, is_active))?;
    print_success(&format!(
        "{} is now {}",
        user.name,
        if user.is_active { "active" } else { "inactive" }
    ));
    Ok(())
}

fn cmd_invite(ctx: &CliContext, email: &str, role_id: i64) -> Result<()> {
    if !validate_email(email) {
        bail!("Invalid email");
    }
    let outcome = ctx.block_on(ctx.users().invite_user(email, role_id))?;
    if outcome.success {
        print_success(&outcome.message);
        Ok(())
    } else {
        bail!("{}", outcome.message)
    }
}

fn print_role(role: &Role) {
    let kind = if role.is_system_role { " (system)" } else { "" };
    println!("{} (#{}){}", role.name, role.id, kind);
    if !role.description.is_empty() {
        println!("  {}", role.description);
    }
    if role.permissions.is_empty() {
        println!("  No permissions");
    } else {
        println!("  Permissions: {}", role.permissions.join(", "));
    }
}

fn cmd_roles(ctx: &CliContext) -> Result<()> {
    let roles = ctx.block_on(ctx.users().roles())?;
    if roles.is_empty() {
        print_info("No roles");
        return Ok(());
    }
    println!("Roles ({}):", roles.len());
    for role in &roles {
        println!(
            "  #{:<5} {:<20} {} permissions{}",
            role.id,
            role.name,
            role.permissions.len(),
            if role.is_system_role { ", system" } else { "" }
        );
    }
    Ok(())
}

fn cmd_role(ctx: &CliContext, id: i64) -> Result<()> {
    let role = ctx.block_on(ctx.users().role(id))?;
    print_role(&role);
    Ok(())
}

fn cmd_create_role(ctx: &CliContext, request: &CreateRoleRequest) -> Result<()> {
    if request.name.trim().is_empty() {
        bail!("Role name is required");
    }
    let role = ctx.block_on(ctx.users().create_role(request))?;
    print_success(&format!("Created role {}", role.name));
    print_role(&role);
    Ok(())
}

fn cmd_update_role(ctx: &CliContext, id: i64, request: &UpdateRoleRequest) -> Result<()> {
    if *request == UpdateRoleRequest::default() {
        bail!("Nothing to update. Pass --name, --description or --permissions");
    }
    let role = ctx.block_on(ctx.users().update_role(id, request))?;
    print_success("Role updated");
    print_role(&role);
    Ok(())
}

fn cmd_delete_role(ctx: &CliContext, id: i64, yes: bool) -> Result<()> {
    if !yes && !prompt_confirm(&format!("Delete role #{}?", id))? {
        print_info("Cancelled");
        return Ok(());
    }
    ctx.block_on(ctx.users().delete_role(id))?;
    print_success(&format!("Role #{} deleted", id));
    Ok(())
}

/// List every permission, grouped by module
pub fn cmd_permissions(ctx: &CliContext) -> Result<()> {
    ctx.require_login()?;
    let permissions = ctx.block_on(ctx.users().permissions())?;
    if permissions.is_empty() {
        print_info("No permissions defined");
        return Ok(());
    }

    let mut by_module: BTreeMap<&str, Vec<&Permission>> = BTreeMap::new();
    for permission in &permissions {
        let module = if permission.module.is_empty() {
            "general"
        } else {
            permission.module.as_str()
        };
        by_module.entry(module).or_default().push(permission);
    }

    for (module, entries) in by_module {
        println!("{}:", module);
        for permission in entries {
            println!("  {:<28} {}", permission.id, permission.name);
        }
    }
    Ok(())
}
