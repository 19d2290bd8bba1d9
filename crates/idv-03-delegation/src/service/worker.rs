//! Worker side of the delegation protocol.
//!
//! Requests are executed concurrently; responses are written back in
//! completion order, tagged with the request's correlation id.

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::local::invoke;
use crate::adapters::{FrameReader, FrameWriter};
use crate::domain::{DelegationRequest, DelegationResponse, FunctionRegistry};
use crate::error::{DelegationError, DelegationResult};

/// Serves delegation requests from a master.
pub struct WorkerRuntime {
    functions: Arc<FunctionRegistry>,
}

impl WorkerRuntime {
    pub fn new(functions: Arc<FunctionRegistry>) -> Self {
        Self { functions }
    }

    /// Serve one master link until it closes. Returns the number of
    /// requests received.
    ///
    /// In-flight executions finish and their responses are flushed before
    /// this returns.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> DelegationResult<usize>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (replies, mut outgoing) = mpsc::unbounded_channel::<DelegationResponse>();
        let writer_task = tokio::spawn(async move {
            let mut frames = FrameWriter::new(writer);
            while let Some(response) = outgoing.recv().await {
                frames.send(&response).await?;
            }
            Ok::<(), DelegationError>(())
        });

        let mut frames = FrameReader::new(reader);
        let mut served = 0;
        let read_result = loop {
            match frames.next_frame::<DelegationRequest>().await {
                Ok(Some(request)) => {
                    served += 1;
                    self.spawn_request(request, replies.clone());
                }
                Ok(None) => break Ok(()),
                Err(DelegationError::Codec(e)) => {
                    warn!("[idv-03] Dropping malformed request: {}", e);
                }
                Err(e) => break Err(e),
            }
        };
        drop(replies);

        match writer_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("[idv-03] Master link closed before all responses were sent: {}", e),
            Err(e) => warn!("[idv-03] Response writer aborted: {}", e),
        }
        info!(served, "[idv-03] Master link closed");
        read_result.map(|()| served)
    }

    fn spawn_request(
        &self,
        request: DelegationRequest,
        replies: mpsc::UnboundedSender<DelegationResponse>,
    ) {
        let functions = self.functions.clone();
        tokio::spawn(async move {
            let correlation_id = request.correlation_id;
            let function = request.function.clone();
            debug!(correlation_id = %correlation_id, function = %function, "[idv-03] Executing delegated task");

            let run = tokio::spawn(async move {
                invoke(&functions, &request.function, request.args).await
            });
            let response = match run.await {
                Ok(Ok(result)) => DelegationResponse::ok(correlation_id, result),
                Ok(Err(e)) => DelegationResponse::err(correlation_id, e.to_string()),
                Err(e) => DelegationResponse::err(
                    correlation_id,
                    format!("function {} aborted: {}", function, e),
                ),
            };
            let _ = replies.send(response);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{function, CorrelationId};
    use serde_json::{json, Value};
    use shared_types::HandlerId;
    use std::time::Duration;

    #[tokio::test]
    async fn test_responses_follow_completion_order() {
        let functions = Arc::new(FunctionRegistry::new());
        functions.register(
            "sleep",
            function(|args: Value| async move {
                let ms = args.as_u64().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok::<_, String>(json!(ms))
            }),
        );
        let worker = WorkerRuntime::new(functions);

        let (master_side, worker_side) = tokio::io::duplex(64 * 1024);
        let (wr, ww) = tokio::io::split(worker_side);
        let serving = tokio::spawn(async move { worker.serve(wr, ww).await });

        let (mr, mw) = tokio::io::split(master_side);
        let mut requests = FrameWriter::new(mw);
        let mut responses = FrameReader::new(mr);
        let slow = CorrelationId::new();
        let fast = CorrelationId::new();
        for (id, ms) in [(slow, 80u64), (fast, 5)] {
            requests
                .send(&DelegationRequest {
                    correlation_id: id,
                    function: HandlerId::from("sleep"),
                    args: json!(ms),
                })
                .await
                .unwrap();
        }

        let first: DelegationResponse = responses.next_frame().await.unwrap().unwrap();
        let second: DelegationResponse = responses.next_frame().await.unwrap().unwrap();
        assert_eq!(first.correlation_id, fast);
        assert_eq!(second.correlation_id, slow);
        assert_eq!(second.into_result(), Ok(json!(80)));

        drop(requests);
        drop(responses);
        assert_eq!(serving.await.unwrap().unwrap(), 2);
    }
}
