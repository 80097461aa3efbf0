//! Lifecycle tests for the Docker engine against a recording API double.
//!
//! No daemon is needed; the double returns canned responses and records the
//! requests the engine issues.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerCreateResponse, ContainerSummary, CreateImageInfo};
use futures::StreamExt;

use service_engine::docker::{DockerApi, ImageStream};
use service_engine::{DockerEngine, Engine, EngineError, LabelFilters, ServiceSpec};

/// Sets a flag when dropped, so tests can see when a stream was released.
struct DropFlag(Arc<AtomicBool>);

impl DropFlag {
    fn touch(&self) {}
}

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone, Copy)]
enum Failure {
    NotFound,
    ServerError,
    Conflict,
    Network,
}

impl Failure {
    fn error(self) -> BollardError {
        match self {
            Failure::NotFound => BollardError::DockerResponseServerError {
                status_code: 404,
                message: "No such container: missing-id".to_string(),
            },
            Failure::ServerError => BollardError::DockerResponseServerError {
                status_code: 500,
                message: "cannot stop container: permission denied".to_string(),
            },
            Failure::Conflict => BollardError::DockerResponseServerError {
                status_code: 409,
                message: "container is running: stop the container before removing".to_string(),
            },
            Failure::Network => BollardError::from(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )),
        }
    }
}

#[derive(Clone, Copy)]
enum PullScript {
    /// Three progress messages, then completion.
    Complete,
    /// One progress message, an error, then a message that must not be read.
    FailMidway,
    /// Never yields.
    Hang,
}

#[derive(Clone)]
struct RecordingApi {
    inner: Arc<Inner>,
}

struct Inner {
    failure: Option<Failure>,
    containers: Vec<ContainerSummary>,
    pull: PullScript,
    created: Mutex<Vec<(String, Config<String>)>>,
    listed: Mutex<Vec<ListContainersOptions<String>>>,
    calls: Mutex<Vec<String>>,
    pulled: Mutex<Vec<(String, String)>>,
    stream_dropped: Arc<AtomicBool>,
    items_read: Arc<AtomicUsize>,
}

impl RecordingApi {
    fn new() -> Self {
        Self::build(None, Vec::new(), PullScript::Complete)
    }

    fn failing(failure: Failure) -> Self {
        Self::build(Some(failure), Vec::new(), PullScript::Complete)
    }

    fn with_containers(containers: Vec<ContainerSummary>) -> Self {
        Self::build(None, containers, PullScript::Complete)
    }

    fn with_pull(pull: PullScript) -> Self {
        Self::build(None, Vec::new(), pull)
    }

    fn build(failure: Option<Failure>, containers: Vec<ContainerSummary>, pull: PullScript) -> Self {
        Self {
            inner: Arc::new(Inner {
                failure,
                containers,
                pull,
                created: Mutex::new(Vec::new()),
                listed: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
                pulled: Mutex::new(Vec::new()),
                stream_dropped: Arc::new(AtomicBool::new(false)),
                items_read: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    fn outcome(&self, call: String) -> Result<(), BollardError> {
        self.inner.calls.lock().unwrap().push(call);
        match self.inner.failure {
            Some(failure) => Err(failure.error()),
            None => Ok(()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().unwrap().clone()
    }

    fn stream_dropped(&self) -> bool {
        self.inner.stream_dropped.load(Ordering::SeqCst)
    }

    fn items_read(&self) -> usize {
        self.inner.items_read.load(Ordering::SeqCst)
    }
}

fn progress(status: &str) -> Result<CreateImageInfo, BollardError> {
    Ok(CreateImageInfo {
        status: Some(status.to_string()),
        ..Default::default()
    })
}

#[async_trait]
impl DockerApi for RecordingApi {
    async fn create_container(
        &self,
        options: Option<CreateContainerOptions<String>>,
        config: Config<String>,
    ) -> Result<ContainerCreateResponse, BollardError> {
        let name = options.map(|o| o.name).unwrap_or_default();
        self.outcome(format!("create {name}"))?;
        self.inner.created.lock().unwrap().push((name.clone(), config));
        Ok(ContainerCreateResponse {
            id: format!("id-{name}"),
            warnings: Vec::new(),
        })
    }

    async fn start_container(
        &self,
        id: &str,
        _options: Option<StartContainerOptions<String>>,
    ) -> Result<(), BollardError> {
        self.outcome(format!("start {id}"))
    }

    async fn list_containers(
        &self,
        options: Option<ListContainersOptions<String>>,
    ) -> Result<Vec<ContainerSummary>, BollardError> {
        self.outcome("list".to_string())?;
        self.inner
            .listed
            .lock()
            .unwrap()
            .push(options.unwrap_or_default());
        Ok(self.inner.containers.clone())
    }

    async fn stop_container(
        &self,
        id: &str,
        options: Option<StopContainerOptions>,
    ) -> Result<(), BollardError> {
        assert!(options.is_none(), "stop must use the runtime grace period");
        self.outcome(format!("stop {id}"))
    }

    async fn remove_container(
        &self,
        id: &str,
        _options: Option<RemoveContainerOptions>,
    ) -> Result<(), BollardError> {
        self.outcome(format!("remove {id}"))
    }

    fn create_image_stream(&self, options: Option<CreateImageOptions<String>>) -> ImageStream {
        let image = options
            .map(|o| (o.from_image, o.tag))
            .unwrap_or_default();
        self.inner.pulled.lock().unwrap().push(image);

        let flag = DropFlag(self.inner.stream_dropped.clone());
        let read = self.inner.items_read.clone();
        let items = match self.inner.pull {
            PullScript::Complete => vec![
                progress("Pulling fs layer"),
                progress("Download complete"),
                progress("Status: Downloaded newer image"),
            ],
            PullScript::FailMidway => vec![
                progress("Pulling fs layer"),
                Err(Failure::Network.error()),
                progress("Download complete"),
            ],
            PullScript::Hang => {
                return futures::stream::pending::<Result<CreateImageInfo, BollardError>>()
                    .map(move |item| {
                        flag.touch();
                        item
                    })
                    .boxed();
            }
        };

        futures::stream::iter(items)
            .map(move |item| {
                flag.touch();
                read.fetch_add(1, Ordering::SeqCst);
                item
            })
            .boxed()
    }
}

fn engine(api: &RecordingApi) -> DockerEngine<RecordingApi> {
    DockerEngine::with_api(api.clone())
}

fn summary(id: &str, state: &str, labels: &[(&str, &str)]) -> ContainerSummary {
    ContainerSummary {
        id: Some(id.to_string()),
        state: Some(state.to_string()),
        labels: Some(
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        ),
        ..Default::default()
    }
}

// ============================================================================
// create
// ============================================================================

#[tokio::test]
async fn test_create_sends_translated_config() {
    let api = RecordingApi::new();
    let mut spec = ServiceSpec::new("nginx:1.25")
        .with_label("app", "web")
        .with_port("8080:80")
        .with_port("127.0.0.1:8081:80")
        .with_mem_limit(268_435_456);
    spec.oom_score_adj = 100;

    let id = engine(&api).create_container("web-0", &spec).await.unwrap();
    assert_eq!(id, "id-web-0");

    let created = api.inner.created.lock().unwrap();
    let (name, config) = &created[0];
    assert_eq!(name, "web-0");
    assert_eq!(config.image.as_deref(), Some("nginx:1.25"));
    assert!(config.networking_config.is_none());

    let host = config.host_config.as_ref().unwrap();
    assert_eq!(host.memory, Some(268_435_456));
    assert_eq!(host.oom_score_adj, Some(100));
    assert_eq!(host.oom_kill_disable, Some(false));
    let bindings = host.port_bindings.as_ref().unwrap()["80/tcp"]
        .as_ref()
        .unwrap();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[1].host_ip.as_deref(), Some("127.0.0.1"));
}

#[tokio::test]
async fn test_create_rejects_bad_port_before_calling_runtime() {
    let api = RecordingApi::new();
    let spec = ServiceSpec::new("nginx").with_port("abc:8080");

    let err = engine(&api).create_container("web-0", &spec).await.unwrap_err();
    assert!(matches!(err, EngineError::Translation(_)));
    assert!(err.to_string().contains("abc:8080"));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_create_runtime_failure_passes_through() {
    let api = RecordingApi::failing(Failure::Conflict);
    let err = engine(&api)
        .create_container("web-0", &ServiceSpec::new("nginx"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Runtime(_)));
}

// ============================================================================
// start / stop / remove
// ============================================================================

#[tokio::test]
async fn test_start_not_found_is_normalized() {
    let api = RecordingApi::failing(Failure::NotFound);
    let err = engine(&api).start_container("missing-id").await.unwrap_err();

    assert!(err.is_not_found());
    assert!(matches!(err, EngineError::InstanceNotFound { ref id } if id == "missing-id"));
}

#[tokio::test]
async fn test_start_network_fault_is_runtime_error() {
    let api = RecordingApi::failing(Failure::Network);
    let err = engine(&api).start_container("missing-id").await.unwrap_err();

    assert!(!err.is_not_found());
    assert!(matches!(err, EngineError::Runtime(_)));
}

#[tokio::test]
async fn test_start_success() {
    let api = RecordingApi::new();
    engine(&api).start_container("abc").await.unwrap();
    assert_eq!(api.calls(), vec!["start abc"]);
}

#[tokio::test]
async fn test_stop_not_found_is_normalized() {
    let api = RecordingApi::failing(Failure::NotFound);
    let err = engine(&api).stop_container("missing-id").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_stop_other_failures_are_not_collapsed_into_not_found() {
    for failure in [Failure::ServerError, Failure::Network] {
        let api = RecordingApi::failing(failure);
        let err = engine(&api).stop_container("abc").await.unwrap_err();
        assert!(matches!(err, EngineError::Runtime(_)), "got {err:?}");
    }
}

#[tokio::test]
async fn test_remove_classification() {
    let api = RecordingApi::failing(Failure::NotFound);
    assert!(engine(&api)
        .remove_container("missing-id")
        .await
        .unwrap_err()
        .is_not_found());

    let api = RecordingApi::failing(Failure::Conflict);
    let err = engine(&api).remove_container("abc").await.unwrap_err();
    assert!(matches!(err, EngineError::Runtime(_)));
    assert!(err.to_string().contains("stop the container"));
}

// ============================================================================
// list
// ============================================================================

#[tokio::test]
async fn test_list_builds_label_filters() {
    let api = RecordingApi::new();
    let keys = BTreeSet::from(["app".to_string()]);
    let key_values = BTreeMap::from([("env".to_string(), "prod".to_string())]);

    let instances = engine(&api)
        .list_containers(&keys, &key_values, false)
        .await
        .unwrap();
    assert!(instances.is_empty());

    let listed = api.inner.listed.lock().unwrap();
    assert!(!listed[0].all);
    assert_eq!(
        listed[0].filters.get("label"),
        Some(&vec!["app".to_string(), "env=prod".to_string()])
    );
}

#[tokio::test]
async fn test_list_include_stopped_requests_all() {
    let api = RecordingApi::new();
    engine(&api)
        .list_matching(&LabelFilters::new(), true)
        .await
        .unwrap();

    let listed = api.inner.listed.lock().unwrap();
    assert!(listed[0].all);
    assert!(listed[0].filters.is_empty());
}

#[tokio::test]
async fn test_list_projects_instances_in_order() {
    let api = RecordingApi::with_containers(vec![
        summary("a", "running", &[("app", "web")]),
        summary("b", "exited", &[("app", "web")]),
        summary("c", "paused", &[]),
        summary("d", "restarting", &[]),
    ]);

    let instances = engine(&api)
        .list_matching(&LabelFilters::new().with_key("app"), true)
        .await
        .unwrap();

    let ids: Vec<&str> = instances.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    let running: Vec<bool> = instances.iter().map(|i| i.running).collect();
    assert_eq!(running, vec![true, false, false, false]);
    assert_eq!(instances[0].labels["app"], "web");
}

#[tokio::test]
async fn test_list_runtime_failure() {
    let api = RecordingApi::failing(Failure::Network);
    let err = engine(&api)
        .list_matching(&LabelFilters::new(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Runtime(_)));
}

// ============================================================================
// pull
// ============================================================================

#[tokio::test]
async fn test_pull_drains_stream() {
    let api = RecordingApi::new();
    engine(&api).pull_image("nginx:1.25").await.unwrap();

    assert_eq!(
        *api.inner.pulled.lock().unwrap(),
        vec![("nginx".to_string(), "1.25".to_string())]
    );
    assert_eq!(api.items_read(), 3);
    assert!(api.stream_dropped());
}

#[tokio::test]
async fn test_pull_sends_tag_for_each_reference_form() {
    let api = RecordingApi::new();
    let engine = engine(&api);
    let digest = "sha256:0d17b565c37bcbd895e9d92315a05c1c3c9a29f762b011a10c54a66cd53c9b31";

    for reference in [
        "nginx".to_string(),
        "nginx:1.25".to_string(),
        "host:5000/img".to_string(),
        format!("img@{digest}"),
    ] {
        engine.pull_image(&reference).await.unwrap();
    }

    let sent: Vec<(String, String)> = api.inner.pulled.lock().unwrap().clone();
    let expected: Vec<(String, String)> = [
        ("nginx", "latest"),
        ("nginx", "1.25"),
        ("host:5000/img", "latest"),
        ("img", digest),
    ]
    .iter()
    .map(|(image, tag)| (image.to_string(), tag.to_string()))
    .collect();
    assert_eq!(sent, expected);
}

#[tokio::test]
async fn test_pull_failure_midway_releases_stream() {
    let api = RecordingApi::with_pull(PullScript::FailMidway);
    let err = engine(&api).pull_image("nginx:1.25").await.unwrap_err();

    assert!(matches!(err, EngineError::Runtime(_)));
    assert_eq!(api.items_read(), 2);
    assert!(api.stream_dropped());
}

#[tokio::test(start_paused = true)]
async fn test_pull_cancelled_by_deadline_releases_stream() {
    let api = RecordingApi::with_pull(PullScript::Hang);
    let engine = engine(&api);

    let result = tokio::time::timeout(Duration::from_secs(5), engine.pull_image("slow")).await;
    assert!(result.is_err());
    assert!(api.stream_dropped());
}

// ============================================================================
// concurrency
// ============================================================================

#[tokio::test]
async fn test_engine_shared_across_tasks() {
    let api = RecordingApi::new();
    let engine = Arc::new(engine(&api));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.start_container(&format!("c{i}")).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut calls = api.calls();
    calls.sort();
    assert_eq!(calls, vec!["start c0", "start c1", "start c2", "start c3"]);
}
