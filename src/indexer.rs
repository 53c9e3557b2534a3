//! Transaction-inclusion lookups against a network's indexer, reached
//! through the relay. Indexers lag the chain, so an empty answer is retried
//! up to a fixed number of full round trips with no delay in between.

use crate::rpc::error::ProviderError;
use crate::rpc::well_known::{POLKADOT_MAINNET, XX_MAINNET};
use crate::runtime::config::DEFAULT_INDEXER_ATTEMPTS;
use crate::transport::client::RelayClient;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const FLAT_LIST_QUERY: &str = r#"
query MyQuery($hash: String = "") {
  extrinsic(where: {hash: {_eq: $hash}}) {
    block_number
    timestamp
  }
}
"#;

const EDGE_GRAPH_QUERY: &str = r#"
query MyQuery($hash: String = "") {
  extrinsicsConnection(orderBy: id_ASC, where: {hash_eq: $hash}) {
    edges {
      node {
        block {
          height
          timestamp
        }
      }
    }
  }
}
"#;

/// Where and when a transaction was included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inclusion {
    pub height: u64,
    pub timestamp: DateTime<Utc>,
}

/// Response layout of a network's indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerSchema {
    /// `data.extrinsic[]` rows carrying `block_number` and `timestamp`.
    FlatList,
    /// `data.extrinsicsConnection.edges[].node.block` with `height` and `timestamp`.
    EdgeGraph,
}

impl IndexerSchema {
    pub fn for_network(network: &str) -> Option<Self> {
        match network {
            XX_MAINNET => Some(Self::FlatList),
            POLKADOT_MAINNET => Some(Self::EdgeGraph),
            _ => None,
        }
    }

    pub fn query(&self) -> &'static str {
        match self {
            Self::FlatList => FLAT_LIST_QUERY,
            Self::EdgeGraph => EDGE_GRAPH_QUERY,
        }
    }

    pub fn parse(&self, response: &Value) -> Result<Inclusion, ProviderError> {
        match self {
            Self::FlatList => {
                let response: GraphQlResponse<FlatListData> = from_value(response)?;
                let row = response
                    .data
                    .extrinsic
                    .into_iter()
                    .next()
                    .ok_or_else(|| ProviderError::not_found("indexer returned no extrinsic"))?;
                Ok(Inclusion {
                    height: row.block_number,
                    timestamp: row.timestamp.to_utc()?,
                })
            }
            Self::EdgeGraph => {
                let response: GraphQlResponse<EdgeGraphData> = from_value(response)?;
                let edge = response
                    .data
                    .extrinsics_connection
                    .edges
                    .into_iter()
                    .next()
                    .ok_or_else(|| ProviderError::not_found("indexer returned no extrinsic"))?;
                Ok(Inclusion {
                    height: edge.node.block.height,
                    timestamp: edge.node.block.timestamp.to_utc()?,
                })
            }
        }
    }
}

/// Relay route of a network's indexer: `/xx/mainnet` maps to `/xx/indexer`.
pub fn indexer_route(network: &str) -> String {
    network.replacen("mainnet", "indexer", 1)
}

#[derive(Serialize)]
struct IndexerQuery<'a> {
    query: &'a str,
    variables: QueryVariables<'a>,
}

#[derive(Serialize)]
struct QueryVariables<'a> {
    hash: &'a str,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: T,
}

#[derive(Deserialize)]
struct FlatListData {
    extrinsic: Vec<FlatListRow>,
}

#[derive(Deserialize)]
struct FlatListRow {
    block_number: u64,
    timestamp: RawTimestamp,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeGraphData {
    extrinsics_connection: EdgeConnection,
}

#[derive(Deserialize)]
struct EdgeConnection {
    edges: Vec<Edge>,
}

#[derive(Deserialize)]
struct Edge {
    node: EdgeNode,
}

#[derive(Deserialize)]
struct EdgeNode {
    block: EdgeBlock,
}

#[derive(Deserialize)]
struct EdgeBlock {
    height: u64,
    timestamp: RawTimestamp,
}

/// Indexers report either epoch milliseconds or an RFC 3339 string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl RawTimestamp {
    fn to_utc(&self) -> Result<DateTime<Utc>, ProviderError> {
        match self {
            RawTimestamp::Millis(millis) => millis_to_utc(*millis),
            RawTimestamp::Text(text) => match DateTime::parse_from_rfc3339(text) {
                Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
                Err(err) => match text.parse::<i64>() {
                    Ok(millis) => millis_to_utc(millis),
                    Err(_) => Err(ProviderError::decode(format!(
                        "invalid indexer timestamp {text:?}: {err}"
                    ))),
                },
            },
        }
    }
}

fn millis_to_utc(millis: i64) -> Result<DateTime<Utc>, ProviderError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| ProviderError::decode(format!("indexer timestamp {millis} out of range")))
}

fn from_value<T: for<'de> Deserialize<'de>>(response: &Value) -> Result<T, ProviderError> {
    T::deserialize(response)
        .map_err(|err| ProviderError::decode(format!("unexpected indexer response: {err}")))
}

/// Looks up `tx_hash` on `network`'s indexer with the default attempt bound.
pub async fn fetch_inclusion(network: &str, tx_hash: &str, client: &RelayClient) -> Result<Inclusion> {
    fetch_inclusion_with_attempts(network, tx_hash, client, DEFAULT_INDEXER_ATTEMPTS).await
}

/// Sends the inclusion query up to `attempts` times, retrying only when the
/// reply cannot be parsed. Relay and transport failures end the lookup at once.
pub async fn fetch_inclusion_with_attempts(
    network: &str,
    tx_hash: &str,
    client: &RelayClient,
    attempts: usize,
) -> Result<Inclusion> {
    let schema = IndexerSchema::for_network(network).ok_or_else(|| {
        ProviderError::UnsupportedNetwork {
            network: network.to_owned(),
        }
    })?;

    let payload = serde_json::to_vec(&IndexerQuery {
        query: schema.query(),
        variables: QueryVariables { hash: tx_hash },
    })
    .context("failed to encode indexer query")?;

    let route = indexer_route(network);
    let attempts = attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let (response, _) = client.request(&route, &payload).await?;

        match schema.parse(&response) {
            Ok(inclusion) => {
                tracing::debug!(
                    attempt,
                    network,
                    tx_hash,
                    height = inclusion.height,
                    "indexer reported transaction inclusion"
                );
                return Ok(inclusion);
            }
            Err(err) if err.is_parse_failure() && attempt < attempts => {
                tracing::warn!(
                    attempt,
                    network,
                    route = %route,
                    error = %err,
                    "indexer has not caught up; retrying"
                );
            }
            Err(err) => {
                tracing::error!(
                    attempt,
                    network,
                    tx_hash,
                    error = %err,
                    "indexer lookup exhausted retries"
                );
                return Err(err.into());
            }
        }
    }
}
