mod common;

use alloy::primitives::{Address, U256};
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use common::*;
use nft_openaction_kit::api::kit_api::{CalldataResponse, HealthResponse};
use nft_openaction_kit::api::{create_kit_router, KitApiState};
use nft_openaction_kit::types::ActionDataParams;
use nft_openaction_kit::{KitConfig, MintRecord, NftOpenActionKit};

fn test_server(price: Option<U256>) -> (TestServer, KitConfig) {
    let config = KitConfig::new("test-key");
    let registry = mock_registry(&config, price, Arc::new(Mutex::new(Vec::new())));
    let kit = NftOpenActionKit::with_registry(config.clone(), registry).unwrap();
    let server = TestServer::new(create_kit_router(KitApiState::new(Arc::new(kit)))).unwrap();
    (server, config)
}

fn params_json(config: &KitConfig) -> Value {
    serde_json::to_value(ActionDataParams {
        post: post_with_record(config, &zora_base_record()),
        profile_id: "0x0100".to_string(),
        profile_owner_address: SENDER,
        sender_address: SENDER,
        src_chain_id: 137,
        quantity: U256::from(1u64),
        payment_token: Address::ZERO,
        executing_client_profile_id: "0x05".to_string(),
        mirrorer_profile_id: None,
        mirror_pub_id: None,
        source_url: None,
    })
    .unwrap()
}

#[tokio::test]
async fn test_health_lists_platforms() {
    let (server, _) = test_server(Some(U256::from(PRICE)));

    let response = server.get("/health").await;
    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.platforms, vec!["Zora".to_string()]);
}

#[tokio::test]
async fn test_calldata_for_zora_post() {
    let (server, _) = test_server(Some(U256::from(PRICE)));

    let response = server
        .post("/api/calldata")
        .json(&json!({
            "contentUri": "Mint it https://zora.co/collect/base:0x9D2fC5fFE5939efD1d573F975BC5EEFd364779ae/3",
            "publishingClientProfileId": "0x01"
        }))
        .await;
    response.assert_status_ok();
    let body: CalldataResponse = response.json();
    let calldata = body.calldata.unwrap();
    assert!(calldata.starts_with("0x"));

    let record = MintRecord::decode_hex(&calldata).unwrap();
    assert_eq!(record.target_contract, NFT_CONTRACT);
    assert_eq!(record.chain_id, U256::from(8453u64));
}

#[tokio::test]
async fn test_calldata_null_without_nft_link() {
    let (server, _) = test_server(Some(U256::from(PRICE)));

    let response = server
        .post("/api/calldata")
        .json(&json!({ "contentUri": "gm, no links today", "publishingClientProfileId": "0x01" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "calldata": null }));
}

#[tokio::test]
async fn test_action_data_without_module_is_bad_request() {
    let (server, config) = test_server(Some(U256::from(PRICE)));
    let mut body = params_json(&config);
    body["post"]["actionModules"] = json!(["0x0000000000000000000000000000000000000001"]);

    let response = server.post("/api/action-data").json(&body).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn test_action_data_without_price_is_unprocessable() {
    let (server, config) = test_server(None);

    let response = server.post("/api/action-data").json(&params_json(&config)).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}
