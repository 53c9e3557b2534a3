use std::sync::Arc;
use std::time::Duration;

use crate::support::{
    helpers::{init_tracing, provider, provider_error, POLKADOT, XX},
    mock_relay::{IndexerReply, MockRelay},
};
use anyhow::Result;
use mixrpc::{
    spawn_stats_reporter, ConnectionState, ProviderError, RpcProvider,
};
use serde_json::json;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const RELAY: &[u8] = b"relay-R";
const TX_HASH: &str = "0xabc123";

#[tokio::test]
async fn submit_and_track_transaction() -> Result<()> {
    init_tracing();
    let relay = MockRelay::new(RELAY, &[XX, POLKADOT]);
    relay.answer("author_submitExtrinsic", json!(TX_HASH));
    relay.push_indexer(IndexerReply::Json(json!({
        "data": {"extrinsic": [{"block_number": 12345, "timestamp": 1_700_000_000_000i64}]}
    })));

    let provider = provider(relay.clone(), RELAY, XX, 3);
    provider.connect().await?;
    assert_eq!(provider.state(), ConnectionState::Connected);
    assert_eq!(provider.supported_networks(), vec![XX.to_string(), POLKADOT.to_string()]);

    let chain = provider.send("system_chain", vec![], true).await?;
    assert_eq!(chain, json!("xx network"));
    assert_eq!(provider.stats().total.bytes_sent, 0);
    assert!(relay.posts().is_empty());

    let hash = provider
        .send("author_submitExtrinsic", vec![json!("0xdeadbeef")], false)
        .await?;
    assert_eq!(hash, json!(TX_HASH));
    assert_eq!(relay.posts(), vec![XX.to_string()]);

    let inclusion = provider.fetch_inclusion(TX_HASH).await?;
    assert_eq!(inclusion.height, 12345);
    assert_eq!(inclusion.timestamp.timestamp_millis(), 1_700_000_000_000);
    assert_eq!(relay.posts(), vec![XX.to_string(), "/xx/indexer".to_string()]);

    assert!(relay.sessions().iter().all(|session| *session == 7));

    let stats = provider.stats();
    assert_eq!(stats.total.requests, 2);
    assert_eq!(stats.total.errors, 0);
    assert_eq!(stats.active.requests, 0);
    Ok(())
}

#[tokio::test]
async fn rpc_error_reply_keeps_code_and_message() -> Result<()> {
    init_tracing();
    let relay = MockRelay::new(RELAY, &[XX]);
    let provider = provider(relay.clone(), RELAY, XX, 3);
    provider.connect().await?;

    let err = provider
        .send("chain_getFinalizedHead", vec![], false)
        .await
        .unwrap_err();
    match provider_error(&err) {
        ProviderError::Rpc { code, message } => {
            assert_eq!(*code, -32601);
            assert_eq!(message, "Method not found");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(format!("{err}"), "-32601: Method not found");
    assert_eq!(provider.stats().total.errors, 1);
    Ok(())
}

#[tokio::test]
async fn unreachable_relay_fails_connect() -> Result<()> {
    init_tracing();
    let relay = MockRelay::new(RELAY, &[XX]);
    let provider = provider(relay.clone(), b"some-other-relay", XX, 3);

    let err = provider.connect().await.unwrap_err();
    assert!(matches!(provider_error(&err), ProviderError::Transport { .. }));
    assert_eq!(provider.state(), ConnectionState::Disconnected);

    let err = provider
        .send("chain_getHeader", vec![], false)
        .await
        .unwrap_err();
    assert_eq!(provider_error(&err), &ProviderError::NotConnected);
    Ok(())
}

#[tokio::test]
async fn polkadot_well_known_answers_before_connect() -> Result<()> {
    init_tracing();
    let relay = MockRelay::new(RELAY, &[POLKADOT]);
    let provider = provider(relay.clone(), RELAY, POLKADOT, 3);

    let genesis = provider
        .send("chain_getBlockHash", vec![json!(0)], false)
        .await?;
    assert_eq!(
        genesis,
        json!("0x91b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c3")
    );

    let properties = provider.send("system_properties", vec![], false).await?;
    assert_eq!(properties["tokenSymbol"], json!("DOT"));

    let err = provider
        .send("chain_getBlockHash", vec![json!(1)], false)
        .await
        .unwrap_err();
    assert_eq!(provider_error(&err), &ProviderError::NotConnected);
    assert!(relay.posts().is_empty());
    Ok(())
}

#[tokio::test]
async fn provider_works_behind_trait_object() -> Result<()> {
    init_tracing();
    let relay = MockRelay::new(RELAY, &[XX]);
    relay.answer("chain_getHeader", json!({"number": "0x10"}));

    let provider: Arc<dyn RpcProvider> = Arc::new(provider(relay.clone(), RELAY, XX, 3));
    provider.connect().await?;
    assert!(provider.is_connected());

    let calls = (0..4).map(|_| provider.send("chain_getHeader", vec![], true));
    for header in futures::future::join_all(calls).await {
        assert_eq!(header?["number"], json!("0x10"));
    }
    assert_eq!(relay.posts().len(), 1);
    assert_eq!(provider.stats().total.cached, 3);

    provider.disconnect().await?;
    assert!(!provider.is_connected());
    Ok(())
}

#[tokio::test]
async fn stats_reporter_follows_provider_traffic() -> Result<()> {
    init_tracing();
    let relay = MockRelay::new(RELAY, &[XX]);
    relay.answer("system_health", json!({"peers": 3}));
    let provider = provider(relay, RELAY, XX, 3);
    provider.connect().await?;

    let shutdown = CancellationToken::new();
    let reporter = spawn_stats_reporter(
        provider.stats_tracker(),
        shutdown.clone(),
        Duration::from_millis(5),
    );

    provider.send("system_health", vec![], false).await?;
    tokio::time::sleep(Duration::from_millis(20)).await;

    shutdown.cancel();
    timeout(Duration::from_secs(1), reporter).await??;
    assert_eq!(provider.stats().total.requests, 1);
    Ok(())
}
