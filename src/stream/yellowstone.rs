//! Concrete [`Transport`] backed by a Yellowstone-style Geyser gRPC service.
//!
//! Grounded in the wiring pattern from `feels-indexer`'s geyser client
//! (connect, build a `SubscribeRequest`, drain the response stream) but
//! actually issues the subscription instead of stubbing the client out.

use super::transport::{
    PongSink, RawTransaction, StreamMessage, SubscribeRequest, Subscription, Transport, TransportError,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use yellowstone_grpc_client::GeyserGrpcClient;
use yellowstone_grpc_proto::geyser::{
    CommitmentLevel, SubscribeRequestFilterTransactions, SubscribeRequestPing, SubscribeUpdateTransaction,
};
use yellowstone_grpc_proto::prelude::{subscribe_update::UpdateOneof, SubscribeRequest as ProtoSubscribeRequest};

type PongSinkStream =
    Pin<Box<dyn futures::Sink<ProtoSubscribeRequest, Error = yellowstone_grpc_client::GeyserGrpcClientError> + Send>>;

/// Writes a `{ping: {id}}` request back on the subscription's write-half in
/// response to a server ping, which is how this transport answers the
/// `{pong: {id}}` contract (§6) over the Geyser wire shape. Writes are
/// serialised by the inner async mutex, matching §4.3's "ping/pong writes
/// are serialised per stream".
struct YellowstonePongSink {
    sink: AsyncMutex<PongSinkStream>,
}

#[async_trait]
impl PongSink for YellowstonePongSink {
    async fn send_pong(&self, id: i32) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        sink.send(ProtoSubscribeRequest { ping: Some(SubscribeRequestPing { id }), ..Default::default() })
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))
    }
}

pub struct YellowstoneTransport {
    endpoint: String,
    token: Option<String>,
}

impl YellowstoneTransport {
    pub fn new(endpoint: String, token: String) -> Self {
        let token = if token.is_empty() { None } else { Some(token) };
        Self { endpoint, token }
    }

    fn commitment(level: &str) -> CommitmentLevel {
        match level {
            "finalized" => CommitmentLevel::Finalized,
            "processed" => CommitmentLevel::Processed,
            _ => CommitmentLevel::Confirmed,
        }
    }

    fn build_request(request: &SubscribeRequest) -> ProtoSubscribeRequest {
        let mut transactions = HashMap::new();
        transactions.insert(
            "program_filter".to_string(),
            SubscribeRequestFilterTransactions {
                vote: Some(false),
                failed: Some(false),
                signature: None,
                account_include: request.program_ids.clone(),
                account_exclude: vec![],
                account_required: vec![],
            },
        );

        ProtoSubscribeRequest {
            transactions,
            commitment: Some(Self::commitment(&request.commitment).into()),
            ..Default::default()
        }
    }

    fn convert(update: SubscribeUpdateTransaction) -> Option<RawTransaction> {
        let tx_info = update.transaction?;
        let signature = bs58::encode(&tx_info.signature).into_string();
        let meta = tx_info.meta.unwrap_or_default();
        let logs = meta.log_messages;

        let transaction = tx_info.transaction?;
        let message = transaction.message?;
        let accounts: Vec<String> = message.account_keys.iter().map(|k| bs58::encode(k).into_string()).collect();

        let instruction_data = message
            .instructions
            .first()
            .map(|ix| ix.data.clone())
            .filter(|d| !d.is_empty());

        let program_ids: Vec<String> = message
            .instructions
            .iter()
            .filter_map(|ix| accounts.get(ix.program_id_index as usize).cloned())
            .collect();

        Some(RawTransaction {
            signature,
            slot: update.slot,
            block_time: Utc::now(),
            accounts,
            program_ids,
            logs,
            instruction_data,
        })
    }
}

#[async_trait]
impl Transport for YellowstoneTransport {
    async fn subscribe(&self, request: SubscribeRequest) -> Result<Subscription, TransportError> {
        let mut client = GeyserGrpcClient::build_from_shared(self.endpoint.clone())
            .map_err(|e| TransportError::Connection(e.to_string()))?
            .x_token(self.token.clone())
            .map_err(|e| TransportError::Connection(e.to_string()))?
            .connect()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let proto_request = Self::build_request(&request);
        let (sink, mut incoming) = client
            .subscribe_with_request(Some(proto_request))
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let pong: Arc<dyn PongSink> =
            Arc::new(YellowstonePongSink { sink: AsyncMutex::new(Box::pin(sink)) });

        let stream = async_stream::stream! {
            while let Some(update) = incoming.next().await {
                match update {
                    Ok(update) => match update.update_oneof {
                        Some(UpdateOneof::Transaction(tx)) => {
                            if let Some(raw) = YellowstoneTransport::convert(tx) {
                                yield Ok(StreamMessage::Transaction(raw));
                            }
                        }
                        Some(UpdateOneof::Ping(ping)) => {
                            yield Ok(StreamMessage::Ping(ping.id));
                        }
                        Some(UpdateOneof::Pong(pong)) => {
                            yield Ok(StreamMessage::Ping(pong.id));
                        }
                        _ => {}
                    },
                    Err(status) => {
                        yield Err(TransportError::Connection(status.to_string()));
                        break;
                    }
                }
            }
        };

        Ok(Subscription { stream: Box::pin(stream), pong })
    }
}
