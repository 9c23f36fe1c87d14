use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use futures::io::AsyncReadExt;
use k8s_openapi::api::core::v1::{ContainerStatus, Namespace, Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use std::collections::HashMap;

use crate::config::LogOptions;
use crate::model::{ContainerItem, ContainerKind, LogTarget, NamespaceItem, PodItem};
use crate::provider::{LogStreamError, ResourceProvider};

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
    log_options: LogOptions,
}

impl KubeGateway {
    pub async fn new(context: Option<String>, log_options: LogOptions) -> Result<Self> {
        let kubeconfig = Kubeconfig::read().ok();

        let config = if let Some(kubeconfig_value) = kubeconfig.clone() {
            let options = KubeConfigOptions {
                context: context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig_value, &options)
                .await
                .context("failed to infer Kubernetes configuration")?
        } else {
            if let Some(context) = context.as_deref() {
                anyhow::bail!("kubeconfig not found; cannot select context '{context}'");
            }
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let cluster = config.cluster_url.to_string();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;
        let context = context
            .or_else(|| {
                kubeconfig
                    .as_ref()
                    .and_then(|cfg| cfg.current_context.clone())
            })
            .unwrap_or_else(|| "in-cluster".to_string());

        Ok(Self {
            client,
            context,
            cluster,
            log_options,
        })
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    fn log_params(&self, container: &str) -> LogParams {
        LogParams {
            container: Some(container.to_string()),
            tail_lines: self.log_options.tail_lines,
            timestamps: self.log_options.timestamps,
            previous: self.log_options.previous,
            ..LogParams::default()
        }
    }
}

impl ResourceProvider for KubeGateway {
    fn list_namespaces(&self) -> BoxFuture<'static, Result<Vec<NamespaceItem>>> {
        let client = self.client.clone();
        async move {
            let namespaces: Api<Namespace> = Api::all(client);
            let list = namespaces
                .list(&ListParams::default())
                .await
                .context("failed to list namespaces")?;
            Ok(list.into_iter().map(|namespace| namespace_item(&namespace)).collect())
        }
        .boxed()
    }

    fn list_pods(&self, namespace: &str) -> BoxFuture<'static, Result<Vec<PodItem>>> {
        let client = self.client.clone();
        let namespace = namespace.to_string();
        async move {
            let pods: Api<Pod> = Api::namespaced(client, &namespace);
            let list = pods
                .list(&ListParams::default())
                .await
                .with_context(|| format!("failed to list pods in {namespace}"))?;
            Ok(list
                .into_iter()
                .map(|pod| pod_item(&pod, &namespace))
                .collect())
        }
        .boxed()
    }

    fn list_containers(&self, pod: &PodItem) -> BoxFuture<'static, Result<Vec<ContainerItem>>> {
        let client = self.client.clone();
        let namespace = pod.namespace.clone();
        let name = pod.name.clone();
        async move {
            let pods: Api<Pod> = Api::namespaced(client, &namespace);
            let pod = pods
                .get(&name)
                .await
                .with_context(|| format!("failed to fetch pod {namespace}/{name}"))?;
            Ok(pod_containers(&pod))
        }
        .boxed()
    }

    fn read_logs(
        &self,
        target: &LogTarget,
    ) -> BoxFuture<'static, std::result::Result<String, LogStreamError>> {
        let client = self.client.clone();
        let params = self.log_params(&target.container);
        let target = target.clone();
        async move {
            let pods: Api<Pod> = Api::namespaced(client, &target.namespace);
            let stream = pods.log_stream(&target.pod, &params).await.map_err(|error| {
                LogStreamError::Open(anyhow::Error::new(error).context(format!("logs of {target}")))
            })?;

            let mut stream = Box::pin(stream);
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).await.map_err(|error| {
                LogStreamError::Read(anyhow::Error::new(error).context(format!("logs of {target}")))
            })?;

            Ok(String::from_utf8_lossy(&buf).into_owned())
        }
        .boxed()
    }
}

fn namespace_item(namespace: &Namespace) -> NamespaceItem {
    NamespaceItem {
        name: namespace.name_any(),
        phase: namespace
            .status
            .as_ref()
            .and_then(|status| status.phase.clone())
            .unwrap_or_else(|| "Active".to_string()),
        age: human_age(namespace.metadata.creation_timestamp.as_ref()),
    }
}

fn pod_item(pod: &Pod, namespace: &str) -> PodItem {
    let (ready, total, restarts) = pod.status.as_ref().map(pod_readiness).unwrap_or((0, 0, 0));
    let spec = pod.spec.as_ref();
    PodItem {
        name: pod.name_any(),
        namespace: pod.namespace().unwrap_or_else(|| namespace.to_string()),
        phase: pod
            .status
            .as_ref()
            .and_then(|status| status.phase.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        ready,
        total,
        restarts,
        age: human_age(pod.metadata.creation_timestamp.as_ref()),
        init_containers: spec
            .and_then(|spec| spec.init_containers.as_ref())
            .into_iter()
            .flatten()
            .map(|container| container.name.clone())
            .collect(),
        containers: spec
            .into_iter()
            .flat_map(|spec| spec.containers.iter())
            .map(|container| container.name.clone())
            .collect(),
    }
}

fn pod_containers(pod: &Pod) -> Vec<ContainerItem> {
    let mut statuses = HashMap::<&str, &ContainerStatus>::new();
    if let Some(status) = pod.status.as_ref() {
        for container in status
            .init_container_statuses
            .iter()
            .flatten()
            .chain(status.container_statuses.iter().flatten())
        {
            statuses.insert(container.name.as_str(), container);
        }
    }

    let mut items = Vec::new();
    if let Some(spec) = pod.spec.as_ref() {
        let init = spec
            .init_containers
            .iter()
            .flatten()
            .map(|container| (container, ContainerKind::Init));
        let regular = spec
            .containers
            .iter()
            .map(|container| (container, ContainerKind::Regular));
        for (container, kind) in init.chain(regular) {
            let mut item = ContainerItem::new(container.name.clone(), kind);
            if let Some(image) = container.image.clone() {
                item.image = image;
            }
            if let Some(status) = statuses.get(container.name.as_str()) {
                item.state = container_state(status);
            }
            items.push(item);
        }
    }

    items
}

fn container_state(container: &ContainerStatus) -> String {
    if let Some(state) = container.state.as_ref() {
        if state.running.is_some() {
            return "Running".to_string();
        }
        if let Some(waiting) = state.waiting.as_ref() {
            return waiting
                .reason
                .clone()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "Waiting".to_string());
        }
        if let Some(terminated) = state.terminated.as_ref() {
            return terminated
                .reason
                .clone()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| format!("Exit({})", terminated.exit_code));
        }
    }

    "Unknown".to_string()
}

fn pod_readiness(status: &PodStatus) -> (usize, usize, i32) {
    let container_statuses = status.container_statuses.as_deref().unwrap_or(&[]);
    let total = container_statuses.len();
    let ready = container_statuses
        .iter()
        .filter(|container| container.ready)
        .count();
    let restarts = container_statuses
        .iter()
        .map(|container| container.restart_count)
        .sum();

    (ready, total, restarts)
}

fn human_age(timestamp: Option<&Time>) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_string();
    };

    let elapsed_seconds =
        (k8s_openapi::jiff::Timestamp::now().as_second() - timestamp.0.as_second()).max(0);
    format_elapsed_seconds(elapsed_seconds)
}

fn format_elapsed_seconds(seconds: i64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }

    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }

    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }

    format!("{seconds}s")
}

#[cfg(test)]
mod tests {
    use super::{format_elapsed_seconds, pod_containers, pod_item};
    use crate::model::ContainerKind;
    use k8s_openapi::api::core::v1::{
        Container, ContainerState, ContainerStateWaiting, ContainerStatus, Pod, PodSpec,
        PodStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn container(name: &str) -> Container {
        Container {
            name: name.to_string(),
            image: Some(format!("registry/{name}:1")),
            ..Container::default()
        }
    }

    fn sample_pod() -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("web-0".to_string()),
                namespace: Some("shop".to_string()),
                ..ObjectMeta::default()
            },
            spec: Some(PodSpec {
                containers: vec![container("app"), container("proxy")],
                init_containers: Some(vec![container("migrate")]),
                ..PodSpec::default()
            }),
            status: Some(PodStatus {
                phase: Some("Pending".to_string()),
                container_statuses: Some(vec![
                    ContainerStatus {
                        name: "app".to_string(),
                        ready: true,
                        restart_count: 2,
                        ..ContainerStatus::default()
                    },
                    ContainerStatus {
                        name: "proxy".to_string(),
                        ready: false,
                        restart_count: 1,
                        state: Some(ContainerState {
                            waiting: Some(ContainerStateWaiting {
                                reason: Some("CrashLoopBackOff".to_string()),
                                ..ContainerStateWaiting::default()
                            }),
                            ..ContainerState::default()
                        }),
                        ..ContainerStatus::default()
                    },
                ]),
                ..PodStatus::default()
            }),
        }
    }

    #[test]
    fn pod_item_summarizes_readiness_and_handle() {
        let item = pod_item(&sample_pod(), "fallback");
        assert_eq!(item.name, "web-0");
        assert_eq!(item.namespace, "shop");
        assert_eq!(item.phase, "Pending");
        assert_eq!((item.ready, item.total, item.restarts), (1, 2, 3));
        assert_eq!(item.init_containers, vec!["migrate".to_string()]);
        assert_eq!(
            item.containers,
            vec!["app".to_string(), "proxy".to_string()]
        );
        assert_eq!(item.age, "-");
    }

    #[test]
    fn pod_containers_lists_init_first_with_state() {
        let items = pod_containers(&sample_pod());
        let summary = items
            .iter()
            .map(|item| (item.name.as_str(), item.kind, item.state.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                ("migrate", ContainerKind::Init, "Unknown"),
                ("app", ContainerKind::Regular, "Unknown"),
                ("proxy", ContainerKind::Regular, "CrashLoopBackOff"),
            ]
        );
        assert_eq!(items[0].image, "registry/migrate:1");
    }

    #[test]
    fn pod_without_spec_has_no_containers() {
        let pod = Pod {
            spec: None,
            ..sample_pod()
        };
        assert!(pod_containers(&pod).is_empty());
    }

    #[test]
    fn elapsed_seconds_use_largest_unit() {
        assert_eq!(format_elapsed_seconds(42), "42s");
        assert_eq!(format_elapsed_seconds(61), "1m");
        assert_eq!(format_elapsed_seconds(7_200), "2h");
        assert_eq!(format_elapsed_seconds(200_000), "2d");
    }
}
