use anyhow::Result;
use futures::future::BoxFuture;
use std::fmt::{Display, Formatter};

use crate::model::{ContainerItem, LogTarget, NamespaceItem, PodItem};

/// The four remote queries the browser drills through.
///
/// Futures are `'static` so the fetch gateway can run them on their own task;
/// implementations clone whatever session handle they need into the future.
pub trait ResourceProvider: Send + Sync + 'static {
    fn list_namespaces(&self) -> BoxFuture<'static, Result<Vec<NamespaceItem>>>;

    fn list_pods(&self, namespace: &str) -> BoxFuture<'static, Result<Vec<PodItem>>>;

    /// Containers of `pod`, init containers first.
    fn list_containers(&self, pod: &PodItem) -> BoxFuture<'static, Result<Vec<ContainerItem>>>;

    /// Opens the log stream for `target` and drains it to completion.
    fn read_logs(
        &self,
        target: &LogTarget,
    ) -> BoxFuture<'static, std::result::Result<String, LogStreamError>>;
}

#[derive(Debug)]
pub enum LogStreamError {
    Open(anyhow::Error),
    Read(anyhow::Error),
}

impl Display for LogStreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(error) => write!(f, "Error in opening log stream: {error:#}"),
            Self::Read(error) => write!(f, "Error copying logs from stream: {error:#}"),
        }
    }
}

impl std::error::Error for LogStreamError {}
