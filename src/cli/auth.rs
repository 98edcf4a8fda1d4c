//! Account commands: login, logout, registration and password recovery.

use crate::cli::common::{
    password_or_prompt, print_error, print_info, print_success, print_warning,
    prompt_string, value_or_prompt, CliContext,
};
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest};
use crate::session::token_preview;
use crate::utils::validation::{validate_password, validate_registration};
use anyhow::{bail, Result};

fn report_login(response: &LoginResponse, action: &str) -> Result<()> {
    if !response.success {
        bail!(
            "{}",
            response
                .message
                .clone()
                .unwrap_or_else(|| format!("{} failed", action))
        );
    }
    match &response.user {
        Some(user) => print_success(&format!("{} as {} <{}>", action, user.name, user.email)),
        None => print_success(&format!("{} succeeded", action)),
    }
    Ok(())
}

pub fn cmd_login(
    ctx: &CliContext,
    email: Option<String>,
    password: Option<String>,
    remember: bool,
) -> Result<()> {
    let auth = ctx.auth();
    let email = match email {
        Some(email) => email,
        None => {
            let saved = auth.saved_email()?;
            let email = prompt_string("Email", saved.as_deref())?;
            if email.is_empty() {
                bail!("Email is required");
            }
            email
        }
    };
    let password = password_or_prompt(password, "Password")?;

    let credentials = LoginRequest {
        email,
        password,
        remember,
    };
    let response = ctx.block_on(auth.login(&credentials));
    report_login(&response, "Logged in")
}

pub fn cmd_logout(ctx: &CliContext) -> Result<()> {
    if !ctx.auth().is_authenticated()? {
        print_info("Not logged in");
        return Ok(());
    }
    ctx.block_on(ctx.auth().logout())?;
    print_success("Logged out");
    Ok(())
}

pub fn cmd_register(
    ctx: &CliContext,
    name: Option<String>,
    email: Option<String>,
    company_name: Option<String>,
) -> Result<()> {
    let form = RegisterRequest {
        name: value_or_prompt(name, "Full name")?,
        email: value_or_prompt(email, "Email")?,
        company_name: value_or_prompt(company_name, "Company name")?,
        password: password_or_prompt(None, "Password")?,
        password_confirmation: password_or_prompt(None, "Confirm password")?,
    };
    validate_registration(&form)?;

    let strength = validate_password(&form.password);
    for problem in &strength.errors {
        print_warning(&format!("Weak password: {}", problem.to_lowercase()));
    }

    let response = ctx.block_on(ctx.auth().register(&form));
    report_login(&response, "Registered")
}

pub fn cmd_whoami(ctx: &CliContext, verify: bool) -> Result<()> {
    let auth = ctx.auth();
    let Some(token) = auth.token()? else {
        print_info("Not logged in");
        return Ok(());
    };

    if let Some(user) = auth.current_user()? {
        println!("{} <{}>", user.name, user.email);
        println!("  User id:  {}", user.id);
        if let Some(company) = &user.company {
            println!("  Company:  {} (#{})", company.name, company.id);
        } else if let Some(company_id) = user.company_id {
            println!("  Company:  #{}", company_id);
        }
    }
    println!("  Token:    {}", token_preview(&token));
    println!("  API:      {}", ctx.client.base_url());

    if verify {
        if ctx.block_on(auth.verify_token()) {
            print_success("Token is valid");
        } else {
            print_error("Token was rejected; you have been logged out");
        }
    }
    Ok(())
}

pub fn cmd_refresh(ctx: &CliContext) -> Result<()> {
    ctx.require_login()?;
    if ctx.block_on(ctx.auth().refresh_token()) {
        print_success("Token refreshed");
        Ok(())
    } else {
        bail!("Could not refresh the token")
    }
}

pub fn cmd_forgot_password(ctx: &CliContext, email: Option<String>) -> Result<()> {
    let email = value_or_prompt(email, "Email")?;
    let outcome = ctx.block_on(ctx.auth().forgot_password(&email));
    if outcome.success {
        print_success(&outcome.message);
        Ok(())
    } else {
        bail!("{}", outcome.message)
    }
}

pub fn cmd_reset_password(
    ctx: &CliContext,
    token: Option<String>,
    email: Option<String>,
) -> Result<()> {
    let token = value_or_prompt(token, "Reset token")?;
    let email = value_or_prompt(email, "Email")?;
    let password = password_or_prompt(None, "New password")?;
    let password_confirmation = password_or_prompt(None, "Confirm new password")?;

    if password != password_confirmation {
        bail!("Passwords do not match");
    }
    let strength = validate_password(&password);
    if !strength.is_valid {
        bail!("Password too weak: {}", strength.errors.join(", ").to_lowercase());
    }

    let request = ResetPasswordRequest {
        token,
        email,
        password,
        password_confirmation,
    };
    let outcome = ctx.block_on(ctx.auth().reset_password(&request));
    if outcome.success {
        print_success(&outcome.message);
        print_info(&format!(
            "Log in again with: trackgpx login --email {}",
            request.email
        ));
        Ok(())
    } else {
        bail!("{}", outcome.message)
    }
}
