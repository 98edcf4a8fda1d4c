//! Payment CLI commands.
//!
//! Card data typed here goes to the payment provider only; the backend
//! receives the resulting token.

use crate::cli::common::{
    or_dash, password_or_prompt, print_info, print_success, print_warning, prompt_confirm,
    prompt_string, CliContext,
};
use crate::models::{CardData, PaymentMethod, Transaction, TransactionStatus};
use crate::utils::{format_amount, mask_card_number, validate_card};
use anyhow::{bail, Result};
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum PaymentsCommand {
    /// List saved cards
    Cards,
    /// Add a card (tokenized with the payment provider)
    AddCard {
        /// Cardholder name as printed on the card
        #[arg(long)]
        holder: Option<String>,
    },
    /// Delete a saved card
    DeleteCard {
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Make a card the default payment method
    SetDefault { id: String },
    /// List billing transactions
    Transactions {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Show one transaction
    Transaction { id: String },
}

/// Execute a payments subcommand.
pub fn execute(ctx: &CliContext, command: PaymentsCommand) -> Result<()> {
    ctx.require_login()?;
    match command {
        PaymentsCommand::Cards => cmd_cards(ctx),
        PaymentsCommand::AddCard { holder } => cmd_add_card(ctx, holder),
        PaymentsCommand::DeleteCard { id, yes } => cmd_delete_card(ctx, &id, yes),
        PaymentsCommand::SetDefault { id } => cmd_set_default(ctx, &id),
        PaymentsCommand::Transactions { page, limit } => cmd_transactions(ctx, page, limit),
        PaymentsCommand::Transaction { id } => cmd_transaction(ctx, &id),
    }
}

fn print_method(method: &PaymentMethod) {
    let marker = if method.is_default { " (default)" } else { "" };
    println!("  {:<24} {}{}", method.id, method.summary(), marker);
    println!("  {:<24} {}", "", method.card.holder_name);
}

fn cmd_cards(ctx: &CliContext) -> Result<()> {
    let methods = ctx.block_on(ctx.payments().payment_methods())?;
    if methods.is_empty() {
        print_info("No saved cards. Add one with: trackgpx payments add-card");
        return Ok(());
    }

    println!("Saved cards ({}):", methods.len());
    for method in &methods {
        print_method(method);
    }
    Ok(())
}

fn cmd_add_card(ctx: &CliContext, holder: Option<String>) -> Result<()> {
    let gateway = ctx.gateway()?;
    if !gateway.is_available() {
        bail!("Payment provider is not configured. Set [openpay] merchant_id and public_key in the config file");
    }

    // Card numbers are read hidden, like passwords
    let card_number = password_or_prompt(None, "Card number")?;
    let check = validate_card(&card_number);
    if !check.is_valid {
        bail!("Invalid card number");
    }
    print_info(&format!(
        "{} card {}",
        check.brand,
        mask_card_number(&card_number)
    ));

    let holder_name = match holder {
        Some(h) => h,
        None => prompt_string("Cardholder name", None)?,
    };
    let expiration_month = prompt_string("Expiration month (MM)", None)?;
    let expiration_year = prompt_string("Expiration year (YY)", None)?;
    let cvv2 = password_or_prompt(None, "Security code")?;

    let card = CardData {
        card_number,
        holder_name,
        expiration_month,
        expiration_year,
        cvv2,
    };

    let method = ctx.block_on(ctx.payments().add_card(&gateway, &card))?;
    print_success(&format!("Card added: {}", method.summary()));
    Ok(())
}

fn cmd_delete_card(ctx: &CliContext, id: &str, yes: bool) -> Result<()> {
    if !yes && !prompt_confirm(&format!("Delete card {}?", id))? {
        print_info("Cancelled");
        return Ok(());
    }
    ctx.block_on(ctx.payments().delete_payment_method(id))?;
    print_success("Card deleted");
    Ok(())
}

fn cmd_set_default(ctx: &CliContext, id: &str) -> Result<()> {
    let method = ctx.block_on(ctx.payments().set_default_payment_method(id))?;
    print_success(&format!("Default card: {}", method.summary()));
    Ok(())
}

fn print_transaction_row(tx: &Transaction) {
    println!(
        "  {:<22} {:<26} {:>14} {:<10} {}",
        tx.id,
        or_dash(Some(&tx.created_at)),
        format_amount(tx.amount, &tx.currency),
        tx.status,
        or_dash(Some(&tx.description))
    );
}

fn cmd_transactions(ctx: &CliContext, page: u32, limit: u32) -> Result<()> {
    if limit == 0 {
        bail!("--limit must be at least 1");
    }
    let listing = ctx.block_on(ctx.payments().transactions(page, limit))?;
    if listing.data.is_empty() {
        print_info("No transactions");
        return Ok(());
    }

    let pages = listing.total.div_ceil(u64::from(listing.limit.max(1)));
    println!(
        "Transactions (page {} of {}, {} total):",
        listing.page,
        pages.max(1),
        listing.total
    );
    for tx in &listing.data {
        print_transaction_row(tx);
    }
    Ok(())
}

fn cmd_transaction(ctx: &CliContext, id: &str) -> Result<()> {
    let tx = ctx.block_on(ctx.payments().transaction(id))?;
    println!("Transaction {}", tx.id);
    println!("  Amount:       {}", format_amount(tx.amount, &tx.currency));
    println!("  Status:       {}", tx.status);
    println!("  Description:  {}", or_dash(Some(&tx.description)));
    println!("  Method:       {}", or_dash(Some(&tx.payment_method)));
    println!("  Date:         {}", or_dash(Some(&tx.created_at)));
    if tx.status == TransactionStatus::Failed {
        print_warning("This charge failed; check the card on file");
    }
    Ok(())
}
