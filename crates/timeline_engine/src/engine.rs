use std::sync::{mpsc, Arc};
use std::thread;

use crate::fetch::{ChannelProgressSink, FetcherConfig, TimelineFetcher};
use crate::types::{EngineEvent, FetchId, FetchRequest};

enum EngineCommand {
    Enqueue {
        fetch_id: FetchId,
        request: FetchRequest,
    },
}

/// Owns a worker thread with its own tokio runtime so callers can enqueue
/// fetches and poll for events without being async themselves.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: FetcherConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let fetcher = Arc::new(TimelineFetcher::new(config));

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            while let Ok(command) = cmd_rx.recv() {
                let fetcher = fetcher.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(&fetcher, command, event_tx).await;
                });
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn enqueue(&self, fetch_id: FetchId, request: FetchRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Enqueue { fetch_id, request });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }
}

async fn handle_command(
    fetcher: &TimelineFetcher,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Enqueue { fetch_id, request } => {
            let sink = ChannelProgressSink::new(event_tx.clone());
            let result = fetcher.fetch(fetch_id, &request, &sink).await;
            let _ = event_tx.send(EngineEvent::FetchCompleted { fetch_id, result });
        }
    }
}
