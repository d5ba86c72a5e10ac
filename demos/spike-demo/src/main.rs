//! Thin illustration of `get_info` + `upload_program` against a fake,
//! in-memory hub — no Bluetooth involved. Not a CLI: this binary exists to
//! show how `spike-core`'s sans-IO pieces compose, not to drive a real hub.

use std::sync::Arc;
use std::time::Duration;

use spike_core::coordinator::FrameSink;
use spike_core::env::TokioEnvironment;
use spike_core::{Dispatcher, HubError, RequestCoordinator, UploadOrchestrator};
use spike_proto::messages::InfoResponse;
use spike_proto::Message;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_PROGRAM: &[u8] = b"print('hello from the spike demo')\n";

/// Replies to each request the way a real hub would for a healthy upload:
/// `InfoResponse` with a small negotiated chunk size, and an `ok` status on
/// every start/chunk/flow request.
struct FakeHub {
    dispatcher: Arc<Dispatcher>,
}

impl FrameSink for FakeHub {
    async fn send(&self, message: &Message) -> Result<(), HubError> {
        let reply = match message {
            Message::InfoRequest => Some(Message::InfoResponse(InfoResponse {
                rpc_major: 1,
                rpc_minor: 0,
                max_packet_size: 20,
                max_chunk_size: 64,
                raw: vec![0u8; 13],
            })),
            Message::StartFileUploadRequest { .. } => {
                Some(Message::StartFileUploadResponse { ok: true })
            },
            Message::TransferChunkRequest { .. } => {
                Some(Message::TransferChunkResponse { ok: true })
            },
            Message::ProgramFlowRequest { .. } => Some(Message::ProgramFlowResponse { ok: true }),
            _ => None,
        };
        if let Some(reply) = reply {
            self.dispatcher.dispatch(reply);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "spike_demo=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let dispatcher = Arc::new(Dispatcher::new());
    let coordinator = RequestCoordinator::new(dispatcher.clone(), TokioEnvironment);
    let hub = FakeHub { dispatcher };

    let info_reply = coordinator
        .request(&hub, Message::InfoRequest, Message::InfoResponse(blank_info()).id(), Duration::from_secs(5))
        .await?;
    let info = match info_reply {
        Message::InfoResponse(info) => info,
        other => return Err(format!("unexpected reply to InfoRequest: {other:?}").into()),
    };
    info!(max_packet_size = info.max_packet_size, max_chunk_size = info.max_chunk_size, "negotiated sizing");

    let orchestrator = UploadOrchestrator::new(&coordinator);
    orchestrator.upload(&hub, "demo.py", 0, DEMO_PROGRAM, info.max_chunk_size as usize).await?;

    info!(bytes = DEMO_PROGRAM.len(), "program uploaded and started in slot 0");
    Ok(())
}

fn blank_info() -> InfoResponse {
    InfoResponse { rpc_major: 0, rpc_minor: 0, max_packet_size: 0, max_chunk_size: 0, raw: Vec::new() }
}
