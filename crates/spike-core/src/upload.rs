//! Multi-step file-upload workflow: start, chunked transfer with a running
//! CRC, then start the program.
//!
//! Grounded on the original hub's `upload_program` sequence (info lookup,
//! start-file-upload, chunked transfer threading a running CRC, then a
//! program-flow start) but expressed as a plain async function over
//! [`crate::RequestCoordinator`] rather than inline script glue.

use std::time::Duration;

use spike_proto::{Message, crc32};

use crate::coordinator::{FrameSink, RequestCoordinator};
use crate::env::Environment;
use crate::error::HubError;

/// Default per-step timeout for start-file-upload and transfer-chunk
/// requests.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// Drives the start / chunk-transfer / program-flow sequence for one
/// upload.
pub struct UploadOrchestrator<'a, E: Environment> {
    coordinator: &'a RequestCoordinator<E>,
}

impl<'a, E: Environment> UploadOrchestrator<'a, E> {
    /// Creates an orchestrator over the given coordinator.
    #[must_use]
    pub fn new(coordinator: &'a RequestCoordinator<E>) -> Self {
        Self { coordinator }
    }

    /// Uploads `data` into `slot` under `name`, using `max_chunk_size` as
    /// the per-chunk payload bound, then starts the program.
    ///
    /// `max_chunk_size` should be a multiple of 4: the CRC accumulator
    /// pads each call to a 4-byte boundary internally, so a non-aligned
    /// chunk size only produces a bit-exact running CRC at the very last
    /// (necessarily short) chunk, matching the real hub's own tolerance
    /// for a short final chunk.
    pub async fn upload<S: FrameSink>(
        &self,
        sink: &S,
        name: &str,
        slot: u8,
        data: &[u8],
        max_chunk_size: usize,
    ) -> Result<(), HubError> {
        let whole_crc = crc32(data, 0);

        let start = self
            .coordinator
            .request(
                sink,
                Message::StartFileUploadRequest { name: name.to_string(), slot, crc: whole_crc },
                Message::StartFileUploadResponse { ok: true }.id(),
                DEFAULT_STEP_TIMEOUT,
            )
            .await?;
        expect_ok(&start, "start file upload")?;

        let mut running = crc32(&[], 0);
        let chunk_size = max_chunk_size.max(1);
        for chunk in data.chunks(chunk_size) {
            running = crc32(chunk, running);
            let reply = self
                .coordinator
                .request(
                    sink,
                    Message::TransferChunkRequest { running_crc: running, data: chunk.to_vec() },
                    Message::TransferChunkResponse { ok: true }.id(),
                    DEFAULT_STEP_TIMEOUT,
                )
                .await?;
            expect_ok(&reply, "transfer chunk")?;
        }

        let flow = self
            .coordinator
            .request(
                sink,
                Message::ProgramFlowRequest { stop: false, slot },
                Message::ProgramFlowResponse { ok: true }.id(),
                DEFAULT_STEP_TIMEOUT,
            )
            .await?;
        expect_ok(&flow, "start program")
    }
}

fn expect_ok(message: &Message, step: &'static str) -> Result<(), HubError> {
    let ok = match message {
        Message::StartFileUploadResponse { ok }
        | Message::TransferChunkResponse { ok }
        | Message::ProgramFlowResponse { ok } => *ok,
        _ => false,
    };
    if ok { Ok(()) } else { Err(HubError::HubFailure(step.to_string())) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use spike_proto::messages::Message as M;

    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::env::TokioEnvironment;

    /// Replies to each request with a scripted, always-ok response and
    /// records every outbound message so the test can assert ordering.
    struct ScriptedSink {
        dispatcher: Arc<Dispatcher>,
        sent: std::sync::Mutex<Vec<Message>>,
    }

    impl FrameSink for ScriptedSink {
        async fn send(&self, message: &Message) -> Result<(), HubError> {
            self.sent.lock().unwrap().push(message.clone());
            let reply = match message {
                Message::StartFileUploadRequest { .. } => {
                    Some(M::StartFileUploadResponse { ok: true })
                },
                Message::TransferChunkRequest { .. } => Some(M::TransferChunkResponse { ok: true }),
                Message::ProgramFlowRequest { .. } => Some(M::ProgramFlowResponse { ok: true }),
                _ => None,
            };
            if let Some(reply) = reply {
                self.dispatcher.dispatch(reply);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn uploads_1024_zero_bytes_in_four_256_byte_chunks_with_matching_prefix_crcs() {
        let dispatcher = Arc::new(Dispatcher::new());
        let coordinator = RequestCoordinator::new(dispatcher.clone(), TokioEnvironment);
        let sink = ScriptedSink { dispatcher, sent: std::sync::Mutex::new(Vec::new()) };
        let orchestrator = UploadOrchestrator::new(&coordinator);

        let data = vec![0u8; 1024];
        orchestrator.upload(&sink, "main.py", 0, &data, 256).await.unwrap();

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 6); // start + 4 chunks + program-flow

        let Message::StartFileUploadRequest { crc, .. } = &sent[0] else {
            panic!("expected start-file-upload first");
        };
        assert_eq!(*crc, crc32(&data, 0));

        let mut running = crc32(&[], 0);
        for (i, expected_chunk) in data.chunks(256).enumerate() {
            running = crc32(expected_chunk, running);
            let Message::TransferChunkRequest { running_crc, data: chunk } = &sent[1 + i] else {
                panic!("expected transfer-chunk at position {i}");
            };
            assert_eq!(*running_crc, running);
            assert_eq!(chunk, expected_chunk);
        }

        assert!(matches!(sent[5], Message::ProgramFlowRequest { stop: false, slot: 0 }));
    }

    #[tokio::test]
    async fn hub_failure_aborts_the_upload() {
        let dispatcher = Arc::new(Dispatcher::new());
        let coordinator = RequestCoordinator::new(dispatcher.clone(), TokioEnvironment);

        struct RejectingSink {
            dispatcher: Arc<Dispatcher>,
        }
        impl FrameSink for RejectingSink {
            async fn send(&self, message: &Message) -> Result<(), HubError> {
                if let Message::StartFileUploadRequest { .. } = message {
                    self.dispatcher.dispatch(M::StartFileUploadResponse { ok: false });
                }
                Ok(())
            }
        }

        let sink = RejectingSink { dispatcher };
        let orchestrator = UploadOrchestrator::new(&coordinator);
        let err = orchestrator.upload(&sink, "main.py", 0, b"abc", 64).await.unwrap_err();
        assert!(matches!(err, HubError::HubFailure(_)));
    }
}
