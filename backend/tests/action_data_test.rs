mod common;

use alloy::primitives::{Address, U256};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use nft_openaction_kit::types::ActionDataParams;
use nft_openaction_kit::{KitConfig, KitError, NftOpenActionKit};

fn config_for(server: &MockServer) -> KitConfig {
    let mut config = KitConfig::new("test-key");
    config.endpoints.bridge_api_url = format!("{}/api/getBoxAction", server.uri());
    config
}

fn params(config: &KitConfig, mirrored: bool) -> ActionDataParams {
    ActionDataParams {
        post: post_with_record(config, &zora_base_record()),
        profile_id: "0x0100".to_string(),
        profile_owner_address: SENDER,
        sender_address: SENDER,
        src_chain_id: 137,
        quantity: U256::from(2u64),
        payment_token: Address::ZERO,
        executing_client_profile_id: "0x05".to_string(),
        mirrorer_profile_id: mirrored.then(|| "0x07".to_string()),
        mirror_pub_id: mirrored.then(|| "0x03".to_string()),
        source_url: None,
    }
}

fn bridge_reply() -> Value {
    json!({
        "success": true,
        "tx": { "to": "0x028f6aeE3CF9e1cA725f4C47d9460801b6c7508A", "data": "0x" },
        "arbitraryData": { "lensActionData": "0xc0ffee" },
        "tokenPayment": { "tokenAddress": "0x0000000000000000000000000000000000000000", "amount": "1600000000000000n" },
        "bridgeFee": { "tokenAddress": "0x0000000000000000000000000000000000000000", "amount": "20000000000000n" }
    })
}

#[tokio::test]
async fn test_action_data_from_post_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/getBoxAction"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bridge_reply()))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let calls = Arc::new(Mutex::new(Vec::new()));
    let registry = mock_registry(&config, Some(U256::from(PRICE)), calls.clone());
    let kit = NftOpenActionKit::with_registry(config.clone(), registry).unwrap();

    let data = kit.action_data_from_post(&params(&config, false)).await.unwrap();

    assert_eq!(data.act_arguments.action_module_data.to_vec(), vec![0xc0, 0xff, 0xee]);
    assert_eq!(data.act_arguments.publication_acted_profile_id, U256::from(1u64));
    assert_eq!(data.act_arguments.publication_acted_id, U256::from(42u64));
    assert_eq!(data.act_arguments.actor_profile_id, U256::from(256u64));
    assert_eq!(data.act_arguments.referrer_profile_ids, vec![U256::from(5u64)]);
    assert_eq!(data.act_arguments.referrer_pub_ids, vec![U256::ZERO]);
    assert_eq!(data.ui_data.nft_name, "Onchain Summer");
    assert_eq!(data.ui_data.dst_chain_id, Some(8453));
    assert_eq!(data.act_arguments_formatted.payment_token.amount, U256::from(1_600_000_000_000_000u64));
    assert_eq!(data.act_arguments_formatted.payment_token.chain_id, 137);
    assert!(data.act_arguments_formatted.bridge_fee.is_some());

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls, vec!["get_price", "get_minter_address", "get_args", "get_ui_data"]);

    let requests = server.received_requests().await.unwrap();
    let arguments = requests[0]
        .url
        .query_pairs()
        .find(|(key, _)| key == "arguments")
        .map(|(_, value)| value.into_owned())
        .unwrap();
    let request: Value = serde_json::from_str(&arguments).unwrap();
    assert_eq!(request["sender"], SENDER.to_checksum(None));
    assert_eq!(request["srcChainId"], 137);
    assert_eq!(request["dstChainId"], 8453);
    assert_eq!(request["slippage"], 3);
    assert_eq!(request["actionType"], "lens-open-action");
    assert_eq!(request["actionConfig"]["functionCall"], "processPublicationAction");
    assert_eq!(request["actionConfig"]["contractAddress"], MINTER.to_checksum(None));
    assert_eq!(request["actionConfig"]["cost"]["amount"], format!("{}n", 2 * PRICE));
    assert_eq!(request["actionConfig"]["cost"]["isNative"], true);
    assert_eq!(request["actionConfig"]["args"][2], "2n");
}

#[tokio::test]
async fn test_mirrored_act_credits_mirrorer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/getBoxAction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bridge_reply()))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let registry = mock_registry(&config, Some(U256::from(PRICE)), Arc::new(Mutex::new(Vec::new())));
    let kit = NftOpenActionKit::with_registry(config.clone(), registry).unwrap();

    let data = kit.action_data_from_post(&params(&config, true)).await.unwrap();
    assert_eq!(data.act_arguments.referrer_profile_ids, vec![U256::from(7u64), U256::from(5u64)]);
    assert_eq!(data.act_arguments.referrer_pub_ids, vec![U256::from(3u64), U256::ZERO]);
}

#[tokio::test]
async fn test_missing_price_stops_before_bridge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bridge_reply()))
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let registry = mock_registry(&config, None, Arc::new(Mutex::new(Vec::new())));
    let kit = NftOpenActionKit::with_registry(config.clone(), registry).unwrap();

    let result = kit.action_data_from_post(&params(&config, false)).await;
    assert!(matches!(result, Err(KitError::NoPrice)));
}

#[tokio::test]
async fn test_rejected_bridge_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/getBoxAction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": "false", "error": "route not found" })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let registry = mock_registry(&config, Some(U256::from(PRICE)), Arc::new(Mutex::new(Vec::new())));
    let kit = NftOpenActionKit::with_registry(config.clone(), registry).unwrap();

    match kit.action_data_from_post(&params(&config, false)).await {
        Err(KitError::NoActionResponse(reason)) => assert_eq!(reason, "route not found"),
        other => panic!("expected NoActionResponse, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_missing_action_data_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/getBoxAction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let registry = mock_registry(&config, Some(U256::from(PRICE)), Arc::new(Mutex::new(Vec::new())));
    let kit = NftOpenActionKit::with_registry(config.clone(), registry).unwrap();

    let result = kit.action_data_from_post(&params(&config, false)).await;
    assert!(matches!(result, Err(KitError::NoActionResponse(_))));
}

#[tokio::test]
async fn test_bridge_http_error_surfaces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let registry = mock_registry(&config, Some(U256::from(PRICE)), Arc::new(Mutex::new(Vec::new())));
    let kit = NftOpenActionKit::with_registry(config.clone(), registry).unwrap();

    let result = kit.action_data_from_post(&params(&config, false)).await;
    assert!(matches!(result, Err(KitError::Bridge(_))));
}
