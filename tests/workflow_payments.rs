//! Integration tests for the add-card contract and payment listings.
//!
//! The card goes to the payment provider, never to the backend; the
//! backend only receives the provider token and the device session id.

mod common;

use anyhow::Result;
use axum::http::Method;
use common::{TestEnv, MERCHANT_ID};
use serde_json::json;
use trackgpx::models::{CardData, TransactionStatus};
use trackgpx::services::{GatewayError, PaymentGateway, PaymentService};

const CARD_NUMBER: &str = "4242 4242 4242 4242";

fn tokens_path() -> String {
    format!("/v1/{}/tokens", MERCHANT_ID)
}

fn card() -> CardData {
    CardData {
        card_number: CARD_NUMBER.to_string(),
        holder_name: "Ana Torres".to_string(),
        expiration_month: "12".to_string(),
        expiration_year: "39".to_string(),
        cvv2: "123".to_string(),
    }
}

fn add_card_answer() -> serde_json::Value {
    json!({
        "success": true,
        "data": {
            "id": "card_01",
            "brand": "visa",
            "last_four": "4242",
            "expiration_month": "12",
            "expiration_year": "2039",
            "holder_name": "Ana Torres",
            "is_default": true
        }
    })
}

// ============================================================================
// ADD CARD
// ============================================================================

#[tokio::test]
async fn add_card_tokenizes_then_registers_token() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend
        .ok(Method::GET, "/oa/logo.htm", json!({}))
        .ok(Method::POST, &tokens_path(), json!({ "id": "tok_visa_01" }))
        .ok(Method::POST, "/billing/payment-methods/add-card", add_card_answer());

    let payments = PaymentService::new(env.client.clone());
    let method = payments.add_card(&env.gateway(), &card()).await?;

    assert_eq!(method.id, "card_01");
    assert_eq!(method.card.last4, "4242");
    assert_eq!(method.card.exp_year, 2039);
    assert!(method.is_default);

    // Fingerprint, then token, then backend
    let beacon = env.backend.position_of("/oa/logo.htm").unwrap();
    let token = env.backend.position_of(&tokens_path()).unwrap();
    let register = env
        .backend
        .position_of("/billing/payment-methods/add-card")
        .unwrap();
    assert!(beacon < token && token < register);

    // Provider gets the card, spaces stripped, with basic auth
    let token_request = &env.backend.requests_to(&tokens_path())[0];
    assert_eq!(token_request.json()["card_number"], "4242424242424242");
    assert_eq!(token_request.json()["holder_name"], "Ana Torres");
    assert!(token_request
        .header("authorization")
        .is_some_and(|h| h.starts_with("Basic ")));

    // Backend gets only the token and the same session id as the beacon
    let beacon_request = &env.backend.requests_to("/oa/logo.htm")[0];
    let session_id = beacon_request
        .query
        .as_deref()
        .and_then(|q| q.split('&').find_map(|kv| kv.strip_prefix("s=")))
        .unwrap()
        .to_string();
    let register_request = &env.backend.requests_to("/billing/payment-methods/add-card")[0];
    assert_eq!(
        register_request.json(),
        json!({ "token_id": "tok_visa_01", "device_session_id": session_id })
    );
    assert!(!register_request.body.contains("4242424242424242"));
    assert!(!register_request.body.contains("cvv2"));
    Ok(())
}

#[tokio::test]
async fn invalid_card_is_rejected_before_any_request() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    let mut bad = card();
    bad.card_number = "4242 4242 4242 4241".to_string();

    let err = PaymentService::new(env.client.clone())
        .add_card(&env.gateway(), &bad)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid card number");
    assert!(env.backend.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn expired_card_is_rejected_locally() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    let mut expired = card();
    expired.expiration_year = "20".to_string();

    let err = PaymentService::new(env.client.clone())
        .add_card(&env.gateway(), &expired)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid or past expiration date");
    assert!(env.backend.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn provider_rejection_stops_before_backend() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend.ok(Method::GET, "/oa/logo.htm", json!({})).respond(
        Method::POST,
        &tokens_path(),
        402,
        json!({ "error_code": 3001, "description": "The card was declined" }),
    );

    let err = PaymentService::new(env.client.clone())
        .add_card(&env.gateway(), &card())
        .await
        .unwrap_err();

    match err.downcast_ref::<GatewayError>() {
        Some(GatewayError::Rejected { code, message }) => {
            assert_eq!(*code, Some(3001));
            assert_eq!(message, "Card declined");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(env
        .backend
        .requests_to("/billing/payment-methods/add-card")
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn beacon_failure_does_not_block_tokenization() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    // No route for the beacon: it answers 404
    env.backend
        .ok(Method::POST, &tokens_path(), json!({ "data": { "id": "tok_nested" } }))
        .ok(Method::POST, "/billing/payment-methods/add-card", add_card_answer());

    let method = PaymentService::new(env.client.clone())
        .add_card(&env.gateway(), &card())
        .await?;

    assert_eq!(method.id, "card_01");
    assert_eq!(
        env.backend.requests_to("/billing/payment-methods/add-card")[0].json()["token_id"],
        "tok_nested"
    );
    Ok(())
}

#[tokio::test]
async fn unconfigured_gateway_is_not_available() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    let gateway = env.unconfigured_gateway();

    assert!(!gateway.is_available());
    assert!(matches!(
        gateway.device_session_id().await,
        Err(GatewayError::NotConfigured)
    ));

    let err = PaymentService::new(env.client.clone())
        .add_card(&gateway, &card())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "payment provider is not available");
    assert!(env.backend.requests().is_empty());
    Ok(())
}

// ============================================================================
// LISTINGS
// ============================================================================

#[tokio::test]
async fn payment_methods_accept_flat_and_nested_shapes() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend.ok(
        Method::GET,
        "/billing/payment-methods/get-all-cards",
        json!({
            "success": true,
            "data": { "cards": [
                { "id": "c1", "brand": "visa", "last_four": "1111", "is_default": true },
                { "id": "c2", "card": { "brand": "mastercard", "last4": "4444",
                  "exp_month": 3, "exp_year": 2031, "holder_name": "ANA" } },
                { "brand": "amex" }
            ]}
        }),
    );

    let methods = PaymentService::new(env.client.clone())
        .payment_methods()
        .await?;

    assert_eq!(methods.len(), 2);
    assert_eq!(methods[0].card.last4, "1111");
    assert_eq!(methods[0].card.holder_name, "TITULAR");
    assert!(methods[0].is_default);
    assert_eq!(methods[1].card.brand, "mastercard");
    assert_eq!(methods[1].card.exp_month, 3);
    Ok(())
}

#[tokio::test]
async fn delete_and_set_default_hit_card_routes() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend
        .ok(Method::DELETE, "/billing/payment-methods/c1", json!({ "success": true }))
        .ok(
            Method::POST,
            "/billing/payment-methods/c2/set-default",
            json!({ "data": { "id": "c2", "brand": "visa", "last4": "4242", "is_default": true } }),
        );

    let payments = PaymentService::new(env.client.clone());
    payments.delete_payment_method("c1").await?;
    let method = payments.set_default_payment_method("c2").await?;

    assert!(method.is_default);
    assert_eq!(env.backend.requests().len(), 2);
    Ok(())
}

#[tokio::test]
async fn transactions_are_paginated() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend.ok(
        Method::GET,
        "/billing/transactions",
        json!({
            "data": [
                { "id": 91, "amount": "299.00", "currency": "MXN", "status": "completed",
                  "description": "Plan Pro", "created_at": "2026-10-01T10:00:00Z" },
                { "id": "tx-92", "amount": 150, "status": "failed" }
            ],
            "total": 12, "page": 2, "limit": 2
        }),
    );

    let page = PaymentService::new(env.client.clone())
        .transactions(2, 2)
        .await?;

    assert_eq!(page.total, 12);
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0].id, "91");
    assert_eq!(page.data[0].amount, 299.0);
    assert_eq!(page.data[1].status, TransactionStatus::Failed);

    let sent = &env.backend.requests_to("/billing/transactions")[0];
    assert_eq!(sent.query.as_deref(), Some("page=2&limit=2"));
    Ok(())
}
