//! Integration tests for the plan catalog and account administration.

mod common;

use anyhow::Result;
use axum::http::Method;
use common::TestEnv;
use serde_json::json;
use trackgpx::models::{BillingCycle, CreateRoleRequest, CreateUserRequest, UpdateRoleRequest};
use trackgpx::services::plan_service::calculate_price;
use trackgpx::services::{PlanService, UserService};

fn catalog() -> serde_json::Value {
    json!({ "success": true, "data": [
        { "id": 1, "name": "Basic", "price": "199.00", "max_vehicles": 3, "max_users": 2,
          "features": ["Live tracking"] },
        { "id": 2, "name": "Pro", "price": 499, "max_vehicles": "10", "max_users": 5,
          "features": ["Live tracking", "Alerts", "Reports"] },
        { "id": 3, "name": "Legacy", "price": 99, "max_vehicles": 50, "is_active": false },
        { "id": 4, "name": "Fleet", "price": 1499, "max_vehicles": 40, "max_users": 20 }
    ]})
}

// ============================================================================
// PLANS
// ============================================================================

#[tokio::test]
async fn plans_decode_lenient_numbers() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend
        .ok(Method::GET, "/billing/plans/get-all-plan", catalog());

    let plans = PlanService::new(env.client.clone()).plans().await?;

    assert_eq!(plans.len(), 4);
    assert_eq!(plans[0].price, 199.0);
    assert_eq!(plans[1].max_vehicles, 10);
    assert_eq!(plans[1].currency, "MXN");
    assert!(!plans[2].is_active);

    let annual = calculate_price(&plans[1], BillingCycle::Annual);
    assert_eq!(annual.final_price, 4990.0);
    assert_eq!(annual.savings, 998.0);
    Ok(())
}

#[tokio::test]
async fn non_list_plan_payload_yields_no_plans() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend.ok(
        Method::GET,
        "/billing/plans/get-all-plan",
        json!({ "success": true, "data": { "message": "maintenance" } }),
    );

    let plans = PlanService::new(env.client.clone()).plans().await?;
    assert!(plans.is_empty());
    Ok(())
}

#[tokio::test]
async fn recommendation_skips_inactive_and_falls_back_to_largest() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend
        .ok(Method::GET, "/billing/plans/get-all-plan", catalog());
    let plans = PlanService::new(env.client.clone());

    let small = plans.recommended_plan(3).await?.unwrap();
    assert_eq!(small.name, "Basic");

    // Legacy would fit 45 vehicles but is no longer offered
    let large = plans.recommended_plan(45).await?.unwrap();
    assert_eq!(large.name, "Fleet");
    Ok(())
}

#[tokio::test]
async fn compare_posts_plan_ids() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend.ok(
        Method::POST,
        "/plans/compare",
        json!({ "data": {
            "plans": [
                { "id": 1, "name": "Basic", "price": 199 },
                { "id": 2, "name": "Pro", "price": 499 }
            ],
            "comparison": { "cheapest": "Basic" }
        }}),
    );

    let comparison = PlanService::new(env.client.clone())
        .compare_plans(&[1, 2])
        .await?;

    assert_eq!(comparison.plans.len(), 2);
    assert_eq!(comparison.comparison["cheapest"], "Basic");
    assert_eq!(
        env.backend.requests_to("/plans/compare")[0].json(),
        json!({ "plan_ids": [1, 2] })
    );
    Ok(())
}

// ============================================================================
// USERS
// ============================================================================

#[tokio::test]
async fn user_crud_round() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    let user = json!({ "id": 21, "name": "Eva", "email": "eva@acme.mx", "role_id": 2,
                       "role": { "id": 2, "name": "Viewer" }, "is_active": true });
    env.backend
        .ok(Method::GET, "/users", json!({ "data": [user.clone()] }))
        .ok(Method::POST, "/users", json!({ "data": user.clone() }))
        .ok(
            Method::PATCH,
            "/users/21/status",
            json!({ "data": { "id": 21, "name": "Eva", "email": "eva@acme.mx", "is_active": false } }),
        )
        .ok(Method::DELETE, "/users/21", json!({ "success": true }));

    let users = UserService::new(env.client.clone());

    let listed = users.users().await?;
    assert_eq!(listed[0].role.as_ref().map(|r| r.name.as_str()), Some("Viewer"));

    let created = users
        .create_user(&CreateUserRequest {
            name: "Eva".to_string(),
            email: "eva@acme.mx".to_string(),
            phone: None,
            password: "secret1".to_string(),
            role_id: 2,
        })
        .await?;
    assert_eq!(created.id, 21);

    let toggled = users.toggle_user_status(21, false).await?;
    assert!(!toggled.is_active);
    assert_eq!(
        env.backend.requests_to("/users/21/status")[0].json(),
        json!({ "is_active": false })
    );

    users.delete_user(21).await?;
    assert_eq!(env.backend.requests_to("/users/21").len(), 1);
    Ok(())
}

#[tokio::test]
async fn invite_defaults_message() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend.ok(Method::POST, "/users/invite", json!({}));

    let outcome = UserService::new(env.client.clone())
        .invite_user("new@acme.mx", 3)
        .await?;

    assert!(outcome.success);
    assert_eq!(outcome.message, "Invitation sent");
    assert_eq!(
        env.backend.requests_to("/users/invite")[0].json(),
        json!({ "email": "new@acme.mx", "role_id": 3 })
    );
    Ok(())
}

// ============================================================================
// ROLES AND PERMISSIONS
// ============================================================================

#[tokio::test]
async fn roles_and_permissions() -> Result<()> {
    let env = TestEnv::logged_in().await?;
    env.backend
        .ok(
            Method::GET,
            "/roles",
            json!([{ "id": 1, "name": "Admin", "permissions": ["*"], "is_system_role": true }]),
        )
        .ok(
            Method::POST,
            "/roles",
            json!({ "data": { "id": 5, "name": "Dispatcher", "permissions": ["devices.view"] } }),
        )
        .ok(
            Method::PUT,
            "/roles/5",
            json!({ "data": { "id": 5, "name": "Dispatch", "permissions": ["devices.view"] } }),
        )
        .ok(
            Method::GET,
            "/permissions",
            json!({ "data": [
                { "id": "devices.view", "name": "View devices", "module": "devices" },
                { "id": "map.view", "name": "View map", "module": "map" }
            ]}),
        );

    let users = UserService::new(env.client.clone());

    let roles = users.roles().await?;
    assert!(roles[0].is_system_role);

    let created = users
        .create_role(&CreateRoleRequest {
            name: "Dispatcher".to_string(),
            description: String::new(),
            permissions: vec!["devices.view".to_string()],
        })
        .await?;
    assert_eq!(created.id, 5);

    let renamed = users
        .update_role(
            5,
            &UpdateRoleRequest {
                name: Some("Dispatch".to_string()),
                ..UpdateRoleRequest::default()
            },
        )
        .await?;
    assert_eq!(renamed.name, "Dispatch");
    assert_eq!(
        env.backend.requests_to("/roles/5")[0].json(),
        json!({ "name": "Dispatch" })
    );

    let permissions = users.permissions().await?;
    assert_eq!(permissions.len(), 2);
    assert_eq!(permissions[1].module, "map");
    Ok(())
}
