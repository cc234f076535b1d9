//! HTTP behaviour of every route, driven through the router in-process.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};

use common::*;

const RELAY_URI: &str = "/api/send-transactions/SwapTokensAndStakeDev";

fn members() -> FakeStore {
    let store = FakeStore::new()
        .with_field_id("fldWallet", "Wallet")
        .with_field_id("fldTier", "Tier");
    store.seed(
        "Members",
        vec![
            json!({ "Wallet": "0xabc", "Tier": "gold" }),
            json!({ "Wallet": "0xdef", "Tier": "silver" }),
        ],
    );
    store
}

fn relay_request(token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(RELAY_URI)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn mint_args() -> Value {
    json!({
        "to": "0x00000000000000000000000000000000000a11ce",
        "property": "0x0000000000000000000000000000000000000abc",
        "payload": format!("0x{}", "01".repeat(32)),
        "gatewayAddress": "0x0000000000000000000000000000000000000def",
        "amounts": { "token": "0x0000000000000000000000000000000000000001", "input": "1000", "fee": "10" }
    })
}

#[tokio::test]
async fn test_health() {
    let reply = send(app(test_config(), FakeStore::new()), get("/health")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["status"], "ok");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let reply = send(app(test_config(), FakeStore::new()), request).await;
    assert_eq!(reply.headers["x-request-id"], "req-42");
}

// access control by field name

#[tokio::test]
async fn test_access_control_listed_account() {
    let reply = send(
        app(test_config(), members()),
        get("/api/access-control/airtable/Members?account=0xabc&field=Wallet"),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "1");
    assert_eq!(reply.headers["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_access_control_unlisted_account() {
    let reply = send(
        app(test_config(), members()),
        get("/api/access-control/airtable/Members?account=0x999&field=Wallet"),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "0");
}

#[tokio::test]
async fn test_access_control_missing_query_is_zero() {
    let store = members();
    let reply = send(
        app(test_config(), store.clone()),
        get("/api/access-control/airtable/Members?account=0xabc"),
    )
    .await;

    assert_eq!(reply.body, "0");
    assert!(store.selects().is_empty());
}

#[tokio::test]
async fn test_access_control_store_error_is_zero() {
    let store = members();
    store.fail_with("INVALID_PERMISSIONS");
    let reply = send(
        app(test_config(), store),
        get("/api/access-control/airtable/Members?account=0xabc&field=Wallet"),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "0");
}

// access control by field id

#[tokio::test]
async fn test_access_control_by_id_with_conditions() {
    let store = members();
    let uri = format!(
        "/api/access-control/airtable/Members/fldWallet?account=0xabc&additional-conditions={}",
        enc(r#"["fldTier","gold"]"#)
    );
    let reply = send(app(test_config(), store.clone()), get(&uri)).await;

    assert_eq!(reply.body, "1");
    let (_, last) = store.selects().last().cloned().unwrap();
    assert_eq!(
        last.filter_by_formula.as_deref(),
        Some(r#"AND({Wallet}="0xabc", {Tier}="gold")"#)
    );
}

#[tokio::test]
async fn test_access_control_by_id_malformed_condition_is_zero() {
    let uri = format!(
        "/api/access-control/airtable/Members/fldWallet?account=0xabc&additional-conditions={}",
        enc("not json")
    );
    let reply = send(app(test_config(), members()), get(&uri)).await;
    assert_eq!(reply.body, "0");
}

#[tokio::test]
async fn test_access_control_by_id_unknown_field_is_zero() {
    let reply = send(
        app(test_config(), members()),
        get("/api/access-control/airtable/Members/fldNope?account=0xabc"),
    )
    .await;
    assert_eq!(reply.body, "0");
}

// exists

#[tokio::test]
async fn test_exists_found() {
    let reply = send(
        app(test_config(), members()),
        get("/api/airtable/exists/Members?account=0xdef&field=Wallet"),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "message": "success" }));
    assert!(reply.headers.get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_exists_not_found() {
    let reply = send(
        app(test_config(), members()),
        get("/api/airtable/exists/Members?account=0x999&field=Wallet"),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json(), json!({ "message": "error", "error": "Not found" }));
}

#[tokio::test]
async fn test_exists_missing_query() {
    let reply = send(
        app(test_config(), members()),
        get("/api/airtable/exists/Members?field=Wallet"),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["error"], "Missing required paramater: ?account, ?field");
}

// tickets

#[tokio::test]
async fn test_ticket_is_recorded() {
    let store = FakeStore::new();
    let uri = format!("/api/webhooks/tickets/{}/dest/airtable/Tickets", TICKETS_KEY);
    let body = json!({
        "status": "used",
        "id": "12",
        "account": "0xabc",
        "benefit": { "id": "b1", "description": "Free drink" }
    });

    let reply = send(app(test_config(), store.clone()), post_json(&uri, &body)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers["access-control-allow-origin"], "*");
    let json = reply.json();
    assert_eq!(json["message"], "success");
    assert_eq!(json["data"][0]["fields"]["Benefit"], "Free drink");

    let rows = store.rows("Tickets");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fields["Status"], json!("used"));
    assert_eq!(rows[0].fields["Token"], json!("12"));
    assert_eq!(rows[0].fields["Benefit Id"], json!("b1"));
}

#[tokio::test]
async fn test_ticket_wrong_key() {
    let store = FakeStore::new();
    let reply = send(
        app(test_config(), store.clone()),
        post_json(
            "/api/webhooks/tickets/wrong/dest/airtable/Tickets",
            &json!({ "status": "used" }),
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json(), json!({ "message": "Invalid key" }));
    assert!(store.rows("Tickets").is_empty());
}

#[tokio::test]
async fn test_ticket_malformed_body_wins_over_key() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/tickets/wrong/dest/airtable/Tickets")
        .body(Body::from("{"))
        .unwrap();
    let reply = send(app(test_config(), FakeStore::new()), request).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let message = reply.json()["message"].as_str().unwrap_or_default().to_string();
    assert!(message.starts_with("Malformed JSON"), "{}", message);
}

#[tokio::test]
async fn test_ticket_array_body_is_rejected() {
    let store = FakeStore::new();
    let uri = format!("/api/webhooks/tickets/{}/dest/airtable/Tickets", TICKETS_KEY);
    let reply = send(
        app(test_config(), store.clone()),
        post_json(&uri, &json!(["used", "12", "0xabc"])),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.json()["message"],
        "Malformed JSON: expected an object, got an array"
    );
    assert!(store.rows("Tickets").is_empty());
}

#[tokio::test]
async fn test_ticket_without_field_map() {
    let mut config = test_config();
    config.tickets.fields.clear();
    let uri = format!("/api/webhooks/tickets/{}/dest/airtable/Tickets", TICKETS_KEY);

    let reply = send(app(config, FakeStore::new()), post_json(&uri, &json!({}))).await;
    assert_eq!(reply.json()["message"], "WEBHOOK_TICKETS_FIELDS is missing");
}

// sync routes without a reachable node

#[tokio::test]
async fn test_stokens_webhook_missing_query() {
    let reply = send(
        app(test_config(), FakeStore::new()),
        get(&format!("/api/webhooks/s-tokens/{}/airtable/Tokens", STOKENS)),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.json(),
        json!({ "error": "Missing required paramater: ?fields, ?primaryKey" })
    );
}

#[tokio::test]
async fn test_stokens_cron_missing_settings() {
    let reply = send(
        app(test_config(), FakeStore::new()),
        get("/api/crons/s-tokens/dest/airtable"),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let error = reply.json()["error"].as_str().unwrap_or_default().to_string();
    assert!(error.starts_with("Missing required env: PROPERTY_ADDRESS"));
}

#[tokio::test]
async fn test_stokens_invalid_from_block() {
    let fields = r#"[["account","Wallet"],["block","Block"],["time","Minted At"],["t_id","Token"],["t_name","Name"],["t_payload","Payload"],["t_lock","Locked"]]"#;
    let uri = format!(
        "/api/webhooks/s-tokens/{}/airtable/Tokens?fields={}&primaryKey=Token&fromBlock=soon",
        STOKENS,
        enc(fields)
    );
    let reply = send(app(test_config(), FakeStore::new()), get(&uri)).await;
    assert_eq!(reply.json()["error"], "Invalid fromBlock: soon");
}

#[tokio::test]
async fn test_nfts_unreachable_node_is_zero() {
    let fields = r#"[["account","Wallet"],["block","Block"],["t_id","Token"],["t_name","Name"],["t_payload","Payload"]]"#;
    let uri = format!(
        "/api/webhooks/nfts/{}/airtable/Passes?fields={}",
        STOKENS,
        enc(fields)
    );
    let store = FakeStore::new();
    let reply = send(app(test_config(), store.clone()), get(&uri)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "0");
    assert!(store.rows("Passes").is_empty());
}

#[tokio::test]
async fn test_nfts_missing_fields_is_zero() {
    let reply = send(
        app(test_config(), FakeStore::new()),
        get(&format!("/api/webhooks/nfts/{}/airtable/Passes", STOKENS)),
    )
    .await;
    assert_eq!(reply.body, "0");
}

// relay

#[tokio::test]
async fn test_relay_requires_bearer() {
    let reply = send(
        app(test_config(), FakeStore::new()),
        relay_request(None, &json!({})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(
        app(test_config(), FakeStore::new()),
        relay_request(Some("wrong"), &json!({})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_relay_missing_rpc_url() {
    let reply = send(
        app(test_config(), FakeStore::new()),
        relay_request(Some(API_KEY), &json!({ "chainId": 137, "args": mint_args() })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json(), json!({ "message": "missing parameter: rpcUrl" }));
}

#[tokio::test]
async fn test_relay_unknown_chain() {
    let body = json!({ "rpcUrl": DEAD_RPC, "chainId": 1, "args": mint_args() });
    let reply = send(
        app(test_config(), FakeStore::new()),
        relay_request(Some(API_KEY), &body),
    )
    .await;
    assert_eq!(reply.json(), json!({ "message": "unexpected chainId: 1" }));
}

#[tokio::test]
async fn test_relay_without_wallet() {
    let body = json!({ "rpcUrl": DEAD_RPC, "chainId": 137, "args": mint_args() });
    let reply = send(
        app(test_config(), FakeStore::new()),
        relay_request(Some(API_KEY), &body),
    )
    .await;
    assert_eq!(reply.json(), json!({ "message": "wallet error" }));
}

#[tokio::test]
async fn test_relay_unreachable_node() {
    let mut config = test_config();
    config.secrets.private_key = Some(ANVIL_KEY.to_string());
    let body = json!({ "rpcUrl": DEAD_RPC, "chainId": 137, "args": mint_args() });

    let reply = send(app(config, FakeStore::new()), relay_request(Some(API_KEY), &body)).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let json = reply.json();
    assert_eq!(json["message"], "failed to send the transaction");
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_relay_bad_argument_is_not_sent() {
    let mut config = test_config();
    config.secrets.private_key = Some(ANVIL_KEY.to_string());
    let mut args = mint_args();
    args["to"] = json!("nobody");
    let body = json!({ "rpcUrl": DEAD_RPC, "chainId": 137, "args": args });

    let reply = send(app(config, FakeStore::new()), relay_request(Some(API_KEY), &body)).await;

    let json = reply.json();
    assert_eq!(json["message"], "failed to send the transaction");
    assert!(json["error"].as_str().unwrap_or_default().starts_with("invalid to"));
}
