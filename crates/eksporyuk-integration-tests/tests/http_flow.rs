//! Integration test: the HTTP API end to end.
//!
//! Drives the real router with requests carrying real session cookies:
//! 1. Bootstrap an admin and register a member
//! 2. Log both in and carry the Set-Cookie session
//! 3. Enrol the member as an affiliate and buy a credit package
//! 4. Book a referred sale and settle the platform shares
//! 5. Withdraw: reject once, then approve
//! 6. Log out and verify the session is gone

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use eksporyuk_db::queries::users;
use eksporyuk_ledger::wallet;
use eksporyuk_server::config::{BootstrapConfig, ServerConfig};
use eksporyuk_server::{bootstrap_admin, router, AppState};
use eksporyuk_types::user::Role;
use serde_json::{json, Value};
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "owner@eksporyuk.id";
const ADMIN_PASSWORD: &str = "admin-password";

struct Harness {
    app: Router,
    state: AppState,
    founder_id: String,
    cofounder_id: String,
}

fn harness() -> Harness {
    let conn = eksporyuk_db::open_memory().expect("open DB");
    let recipient = |email: &str| {
        users::insert(
            &conn,
            &users::NewUser {
                email,
                name: email,
                role: Role::Member,
                password_hash: "unused",
                password_salt: "unused",
            },
            1,
        )
        .expect("insert recipient")
        .id
    };
    let founder_id = recipient("founder@eksporyuk.id");
    let cofounder_id = recipient("cofounder@eksporyuk.id");

    let bootstrap = BootstrapConfig {
        admin_email: ADMIN_EMAIL.into(),
        admin_password: ADMIN_PASSWORD.into(),
        admin_name: "Owner".into(),
    };
    bootstrap_admin(&conn, &bootstrap)
        .expect("bootstrap")
        .expect("admin created");
    assert!(
        bootstrap_admin(&conn, &bootstrap).expect("bootstrap").is_none(),
        "bootstrap is skipped once an admin exists"
    );

    let mut config = ServerConfig::default();
    config.revenue.founder_user_id = founder_id.clone();
    config.revenue.cofounder_user_id = cofounder_id.clone();
    config.affiliate.self_service_top_up = true;
    let state = AppState::new(conn, config);
    Harness {
        app: router(state.clone()),
        state,
        founder_id,
        cofounder_id,
    }
}

struct Reply {
    status: StatusCode,
    json: Value,
    set_cookie: Option<String>,
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        req = req.header(header::COOKIE, cookie);
    }
    let body = match body {
        Some(json) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(req.body(body).expect("request"))
        .await
        .expect("response");
    let status = resp.status();
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    Reply {
        status,
        json,
        set_cookie,
    }
}

/// Log in and return the `name=value` part of the session cookie.
async fn login(app: &Router, email: &str, password: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "login failed: {}", reply.json);
    let cookie = reply.set_cookie.expect("login sets a cookie");
    assert!(cookie.contains("HttpOnly"));
    cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .trim()
        .to_string()
}

#[tokio::test]
async fn affiliate_lifecycle_over_http() {
    let h = harness();

    // =========================================================
    // Step 1: a member registers; the admin came from bootstrap
    // =========================================================
    let reply = send(
        &h.app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": " Rina@Mail.ID ", "name": "Rina", "password": "rina-secret" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.json["email"], "rina@mail.id");
    assert_eq!(reply.json["role"], "MEMBER");
    let rina_id = reply.json["id"].as_str().expect("id").to_string();

    let reply = send(
        &h.app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": "rina@mail.id", "name": "Other", "password": "another-one" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    // =========================================================
    // Step 2: sessions
    // =========================================================
    let admin = login(&h.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let rina = login(&h.app, "RINA@mail.id", "rina-secret").await;

    let reply = send(
        &h.app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "rina@mail.id", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(&h.app, Method::GET, "/auth/me", Some(&rina), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json["id"], rina_id.as_str());

    // =========================================================
    // Step 3: enrolment and credits
    // =========================================================
    let reply = send(&h.app, Method::GET, "/affiliate/credits", Some(&rina), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = send(
        &h.app,
        Method::POST,
        "/admin/affiliates",
        Some(&rina),
        Some(json!({ "userId": rina_id })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN, "members cannot enrol themselves");

    let reply = send(
        &h.app,
        Method::POST,
        "/admin/affiliates",
        Some(&admin),
        Some(json!({ "userId": rina_id, "affiliateCode": "RINA", "commissionRate": 20 })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let affiliate_id = reply.json["id"].as_str().expect("id").to_string();

    let reply = send(&h.app, Method::GET, "/auth/me", Some(&rina), None).await;
    assert_eq!(reply.json["role"], "AFFILIATE");

    let reply = send(
        &h.app,
        Method::POST,
        "/affiliate/credits",
        Some(&rina),
        Some(json!({ "packageName": "Basic" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json["credit"]["balance"], 150);

    let reply = send(
        &h.app,
        Method::POST,
        "/admin/affiliate/credits",
        Some(&admin),
        Some(json!({ "affiliateId": affiliate_id, "type": "DEDUCT", "amount": 500 })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.json["error"]["data"]["available"], 150);

    let reply = send(&h.app, Method::GET, "/affiliate/credits", Some(&rina), None).await;
    assert_eq!(reply.json["balance"], 150);
    assert_eq!(reply.json["transactions"].as_array().expect("array").len(), 1);

    // =========================================================
    // Step 4: a referred sale of 500 000 at 20%
    // =========================================================
    let reply = send(
        &h.app,
        Method::POST,
        "/admin/sales",
        Some(&admin),
        Some(json!({ "transactionId": "INV-9", "amount": 500_000, "affiliateId": affiliate_id })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.json["conversion"]["commissionAmount"], 100_000);
    let shares = reply.json["pendingRevenue"].as_array().expect("array").clone();
    assert_eq!(shares.len(), 3);
    let shared: i64 = shares.iter().map(|s| s["amount"].as_i64().expect("amount")).sum();
    assert_eq!(shared, 400_000);

    let reply = send(
        &h.app,
        Method::POST,
        "/admin/sales",
        Some(&admin),
        Some(json!({ "transactionId": "INV-9", "amount": 500_000 })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply =
        send(&h.app, Method::GET, "/affiliate/conversions?status=unpaid", Some(&rina), None).await;
    assert_eq!(reply.json["total"], 1);

    let reply = send(
        &h.app,
        Method::GET,
        "/admin/pending-revenue?status=PENDING",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(reply.json["pendingRevenue"].as_array().expect("array").len(), 3);
    for share in &shares {
        let id = share["id"].as_str().expect("id");
        let reply = send(
            &h.app,
            Method::POST,
            &format!("/admin/pending-revenue/{id}/approve"),
            Some(&admin),
            Some(json!({})),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json["status"], "APPROVED");
    }
    {
        let db = h.state.db.lock().await;
        let founder = wallet::summary(&db, &h.founder_id).expect("founder wallet");
        let cofounder = wallet::summary(&db, &h.cofounder_id).expect("cofounder wallet");
        // 400 000 - 15% = 340 000 → 204 000 / 136 000
        assert_eq!(founder.balance, 204_000);
        assert_eq!(cofounder.balance, 136_000);
        assert_eq!(founder.balance_pending + cofounder.balance_pending, 0);
    }

    // =========================================================
    // Step 5: withdrawals
    // =========================================================
    let reply = send(&h.app, Method::GET, "/wallet", Some(&rina), None).await;
    assert_eq!(reply.json["balance"], 100_000);

    let reply = send(
        &h.app,
        Method::POST,
        "/affiliate/payouts",
        Some(&rina),
        Some(json!({ "amount": 60_000 })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.json["netAmount"], 55_000);
    let first = reply.json["id"].as_str().expect("id").to_string();

    let reply = send(
        &h.app,
        Method::PATCH,
        &format!("/admin/payouts/{first}"),
        Some(&admin),
        Some(json!({ "action": "reject" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST, "rejection needs a reason");

    let reply = send(
        &h.app,
        Method::PATCH,
        &format!("/admin/payouts/{first}"),
        Some(&admin),
        Some(json!({ "action": "reject", "rejectedReason": "account name mismatch" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json["status"], "REJECTED");

    let reply = send(&h.app, Method::GET, "/wallet", Some(&rina), None).await;
    assert_eq!(reply.json["balance"], 100_000);

    let reply = send(
        &h.app,
        Method::POST,
        "/affiliate/payouts",
        Some(&rina),
        Some(json!({ "amount": 100_000 })),
    )
    .await;
    let second = reply.json["id"].as_str().expect("id").to_string();
    let reply = send(
        &h.app,
        Method::PATCH,
        &format!("/admin/payouts/{second}"),
        Some(&admin),
        Some(json!({ "action": "approve" })),
    )
    .await;
    assert_eq!(reply.json["status"], "APPROVED");
    let reply = send(
        &h.app,
        Method::PATCH,
        &format!("/admin/payouts/{second}"),
        Some(&admin),
        Some(json!({ "action": "approve" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = send(&h.app, Method::GET, "/wallet", Some(&rina), None).await;
    assert_eq!(reply.json["balance"], 0);
    assert_eq!(reply.json["totalPayout"], 100_000);

    // =========================================================
    // Step 6: logout
    // =========================================================
    let reply = send(&h.app, Method::POST, "/auth/logout", Some(&rina), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.set_cookie.expect("cleared cookie").contains("Max-Age=0"));
    let reply = send(&h.app, Method::GET, "/auth/me", Some(&rina), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn withdrawal_settings_are_validated() {
    let conn = eksporyuk_db::open_memory().expect("open DB");
    let bootstrap = BootstrapConfig {
        admin_email: ADMIN_EMAIL.into(),
        admin_password: ADMIN_PASSWORD.into(),
        admin_name: "Owner".into(),
    };
    bootstrap_admin(&conn, &bootstrap)
        .expect("bootstrap")
        .expect("admin created");
    let app = router(AppState::new(conn, ServerConfig::default()));

    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let reply = send(&app, Method::GET, "/admin/settings/withdrawal", Some(&admin), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json["withdrawalMinAmount"], 50_000);

    let reply = send(
        &app,
        Method::PUT,
        "/admin/settings/withdrawal",
        Some(&admin),
        Some(json!({ "withdrawalMinAmount": 10_000, "withdrawalAdminFee": 10_000 })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}
