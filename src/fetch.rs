use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::model::{ContainerItem, LevelKind, LogTarget, NamespaceItem, PodItem, Ticket};
use crate::provider::ResourceProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Namespaces,
    Pods { namespace: String },
    Containers { pod: PodItem },
    Logs { target: LogTarget },
}

impl Query {
    pub fn kind(&self) -> LevelKind {
        match self {
            Self::Namespaces => LevelKind::Namespaces,
            Self::Pods { .. } => LevelKind::Pods,
            Self::Containers { .. } => LevelKind::Containers,
            Self::Logs { .. } => LevelKind::Logs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: Ticket,
    pub query: Query,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Namespaces(Result<Vec<NamespaceItem>, String>),
    Pods(Result<Vec<PodItem>, String>),
    Containers(Result<Vec<ContainerItem>, String>),
    /// Log text, or an explanation of why the stream could not be read.
    Logs(String),
}

impl Payload {
    pub fn kind(&self) -> LevelKind {
        match self {
            Self::Namespaces(_) => LevelKind::Namespaces,
            Self::Pods(_) => LevelKind::Pods,
            Self::Containers(_) => LevelKind::Containers,
            Self::Logs(_) => LevelKind::Logs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMessage {
    pub ticket: Ticket,
    pub fetched_at: DateTime<Local>,
    pub payload: Payload,
}

impl FetchMessage {
    pub fn new(ticket: Ticket, payload: Payload) -> Self {
        Self {
            ticket,
            fetched_at: Local::now(),
            payload,
        }
    }

    pub fn kind(&self) -> LevelKind {
        self.payload.kind()
    }
}

/// Runs each request on its own task and posts exactly one message back.
#[derive(Clone)]
pub struct FetchGateway {
    provider: Arc<dyn ResourceProvider>,
    tx: mpsc::UnboundedSender<FetchMessage>,
}

impl FetchGateway {
    pub fn new(provider: Arc<dyn ResourceProvider>, tx: mpsc::UnboundedSender<FetchMessage>) -> Self {
        Self { provider, tx }
    }

    pub fn issue(&self, request: FetchRequest) {
        debug!("fetch issued ticket={} kind={}", request.ticket, request.query.kind());
        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let message = run_query(provider.as_ref(), request).await;
            if tx.send(message).is_err() {
                debug!("fetch completed after the event loop closed");
            }
        });
    }
}

pub async fn run_query(provider: &dyn ResourceProvider, request: FetchRequest) -> FetchMessage {
    let FetchRequest { ticket, query } = request;
    let payload = match query {
        Query::Namespaces => Payload::Namespaces(
            provider
                .list_namespaces()
                .await
                .map_err(|error| report(ticket, LevelKind::Namespaces, &error)),
        ),
        Query::Pods { namespace } => Payload::Pods(
            provider
                .list_pods(&namespace)
                .await
                .map_err(|error| report(ticket, LevelKind::Pods, &error)),
        ),
        Query::Containers { pod } => Payload::Containers(
            provider
                .list_containers(&pod)
                .await
                .map_err(|error| report(ticket, LevelKind::Containers, &error)),
        ),
        Query::Logs { target } => match provider.read_logs(&target).await {
            Ok(text) => Payload::Logs(text),
            Err(error) => {
                warn!("log stream for {target} failed: {error}");
                Payload::Logs(error.to_string())
            }
        },
    };

    FetchMessage::new(ticket, payload)
}

fn report(ticket: Ticket, kind: LevelKind, error: &anyhow::Error) -> String {
    warn!("fetch {ticket} for {kind} failed: {error:#}");
    compact_error(error)
}

pub fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}
