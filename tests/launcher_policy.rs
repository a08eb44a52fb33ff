//! Launch policy tests against a recording engine.
//!
//! These cover what the launcher sends to the engine: namespace sharing,
//! identity, ulimits and call sequencing. No daemon is needed.

use async_trait::async_trait;
use hostlaunch::launcher::{
    ContainerHandle, ContainerLauncher, ContainerSpec, EngineClient, HostSystem, ImageHandle,
    LaunchError, LaunchRequest, LimitName, ResourceLimit, Result,
};
use std::io;
use std::sync::{Arc, Mutex};

/// Host with uid 1, gid 2 and (1, 2) for every limit.
struct FakeHost;

impl HostSystem for FakeHost {
    fn resource_limit(&self, _name: LimitName) -> io::Result<(i64, i64)> {
        Ok((1, 2))
    }

    fn user_id(&self) -> u32 {
        1
    }

    fn group_id(&self) -> u32 {
        2
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    GetImage(String),
    Create(String),
    Get(String),
}

/// Engine double that records calls and create requests.
#[derive(Default)]
struct RecordingEngine {
    image_user: Option<String>,
    fail_image: bool,
    fail_create: bool,
    fail_get: bool,
    calls: Mutex<Vec<Call>>,
    created: Mutex<Vec<ContainerSpec>>,
}

impl RecordingEngine {
    fn with_image_user(user: Option<&str>) -> Self {
        Self {
            image_user: user.map(String::from),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn last_spec(&self) -> ContainerSpec {
        self.created
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no create request recorded")
    }
}

#[async_trait]
impl EngineClient for RecordingEngine {
    async fn get_image(&self, reference: &str) -> Result<ImageHandle> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::GetImage(reference.to_string()));
        if self.fail_image {
            return Err(LaunchError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "engine socket closed",
            )));
        }
        Ok(ImageHandle {
            id: format!("sha256:{}", reference.len()),
            reference: reference.to_string(),
            user: self.image_user.clone(),
        })
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Create(spec.name.clone()));
        if self.fail_create {
            return Err(LaunchError::ContainerCreation {
                name: spec.name.clone(),
                reason: "a container with this name already exists".to_string(),
            });
        }
        self.created.lock().unwrap().push(spec.clone());
        Ok(ContainerHandle {
            id: "c0ffee".to_string(),
            name: spec.name.clone(),
            status: Some("created".to_string()),
        })
    }

    async fn get_container(&self, name: &str) -> Result<ContainerHandle> {
        self.calls.lock().unwrap().push(Call::Get(name.to_string()));
        if self.fail_get {
            return Err(LaunchError::EngineQuery(format!(
                "Container not found: {}",
                name
            )));
        }
        Ok(ContainerHandle {
            id: "c0ffee".to_string(),
            name: name.to_string(),
            status: Some("created".to_string()),
        })
    }
}

fn launcher() -> ContainerLauncher {
    ContainerLauncher::new(Arc::new(FakeHost))
}

fn image(user: Option<&str>) -> ImageHandle {
    ImageHandle {
        id: "sha256:abc".to_string(),
        reference: "foo/bar:release".to_string(),
        user: user.map(String::from),
    }
}

fn overrides() -> Vec<String> {
    vec![
        "nproc:10000:10000".to_string(),
        "nofile:10000:10000".to_string(),
        "core:-1:-1".to_string(),
    ]
}

fn expected_limits() -> Vec<ResourceLimit> {
    vec![
        ResourceLimit {
            name: LimitName::Nproc,
            soft: 10000,
            hard: 10000,
        },
        ResourceLimit {
            name: LimitName::Nofile,
            soft: 10000,
            hard: 10000,
        },
        ResourceLimit {
            name: LimitName::Core,
            soft: -1,
            hard: -1,
        },
    ]
}

#[tokio::test]
async fn test_image_with_user_sets_no_identity() {
    let engine = RecordingEngine::default();
    let mut request = LaunchRequest::from_image("foo", image(Some("user"))).command(["cmd"]);
    request.ulimits = overrides();

    let handle = launcher().launch(&engine, &request).await.unwrap();
    assert_eq!(handle.name, "foo");

    let spec = engine.last_spec();
    assert_eq!(spec.name, "foo");
    assert_eq!(spec.command, vec!["cmd".to_string()]);
    assert_eq!(spec.entrypoint, None);
    assert_eq!(spec.user, None);
    assert_eq!(spec.ulimits, expected_limits());
    assert_eq!(
        engine.calls(),
        vec![Call::Create("foo".to_string()), Call::Get("foo".to_string())]
    );
}

#[tokio::test]
async fn test_image_without_user_runs_as_invoker() {
    let engine = RecordingEngine::default();
    let mut request = LaunchRequest::from_image("foo", image(None))
        .entrypoint(["entrypoint"])
        .command(["cmd"]);
    request.ulimits = overrides();

    launcher().launch(&engine, &request).await.unwrap();

    let spec = engine.last_spec();
    assert_eq!(spec.user.as_deref(), Some("1:2"));
    assert_eq!(spec.entrypoint, Some(vec!["entrypoint".to_string()]));
    assert_eq!(spec.ulimits, expected_limits());
}

#[tokio::test]
async fn test_host_sharing_flags_always_set() {
    let requests = [
        LaunchRequest::from_image("a", image(None)),
        LaunchRequest::from_image("b", image(Some("app")))
            .entrypoint(["/init"])
            .ulimit("stack:8192:-1"),
        LaunchRequest::from_image("c", image(None)).bind("/srv:/srv:ro"),
    ];

    for request in &requests {
        let engine = RecordingEngine::default();
        launcher().launch(&engine, request).await.unwrap();

        let spec = engine.last_spec();
        assert_eq!(spec.network_mode, "host");
        assert_eq!(spec.ipc_mode, "host");
        assert_eq!(spec.pid_mode, "host");
        assert!(spec.detach);
        assert!(spec.tty);
        assert!(spec.stdin_open);
    }
}

#[tokio::test]
async fn test_no_overrides_uses_host_limits() {
    let engine = RecordingEngine::default();
    let request = LaunchRequest::from_image("foo", image(None));

    launcher().launch(&engine, &request).await.unwrap();

    let spec = engine.last_spec();
    let names: Vec<LimitName> = spec.ulimits.iter().map(|l| l.name).collect();
    assert_eq!(names, LimitName::ALL.to_vec());
    assert!(spec.ulimits.iter().all(|l| l.soft == 1 && l.hard == 2));
}

#[tokio::test]
async fn test_reference_is_looked_up_by_path() {
    let engine = RecordingEngine::with_image_user(Some("www-data"));
    let request = LaunchRequest::from_reference("web", "docker://host:1275/foo/bar:release");

    launcher().launch(&engine, &request).await.unwrap();

    assert_eq!(
        engine.calls(),
        vec![
            Call::GetImage("host:1275/foo/bar:release".to_string()),
            Call::Create("web".to_string()),
            Call::Get("web".to_string()),
        ]
    );
    assert_eq!(engine.last_spec().user, None);
}

#[tokio::test]
async fn test_file_reference_rejected_before_any_call() {
    let engine = RecordingEngine::default();
    let request = LaunchRequest::from_reference("foo", "file:///foo/bar");

    let result = launcher().launch(&engine, &request).await;
    assert!(matches!(result, Err(LaunchError::Validation(_))));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_image_lookup_failure_is_engine_query_error() {
    let engine = RecordingEngine {
        fail_image: true,
        ..Default::default()
    };
    let request = LaunchRequest::from_reference("foo", "foo/bar");

    let result = launcher().launch(&engine, &request).await;
    assert!(
        matches!(result, Err(LaunchError::EngineQuery(ref msg)) if msg.contains("foo/bar")),
        "unexpected result: {:?}",
        result
    );
    assert_eq!(engine.calls(), vec![Call::GetImage("foo/bar".to_string())]);
}

#[tokio::test]
async fn test_malformed_override_creates_nothing() {
    let engine = RecordingEngine::default();
    let request = LaunchRequest::from_image("foo", image(None)).ulimit("nofile:lots:1");

    let result = launcher().launch(&engine, &request).await;
    assert!(matches!(result, Err(LaunchError::Validation(_))));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_create_failure_stops_launch() {
    let engine = RecordingEngine {
        fail_create: true,
        ..Default::default()
    };
    let request = LaunchRequest::from_image("foo", image(None));

    let result = launcher().launch(&engine, &request).await;
    assert!(
        matches!(result, Err(LaunchError::ContainerCreation { ref name, .. }) if name == "foo")
    );
    assert_eq!(engine.calls(), vec![Call::Create("foo".to_string())]);
}

#[tokio::test]
async fn test_get_failure_is_engine_query_error() {
    let engine = RecordingEngine {
        fail_get: true,
        ..Default::default()
    };
    let request = LaunchRequest::from_image("foo", image(None));

    let result = launcher().launch(&engine, &request).await;
    assert!(matches!(result, Err(LaunchError::EngineQuery(_))));
    assert_eq!(
        engine.calls(),
        vec![Call::Create("foo".to_string()), Call::Get("foo".to_string())]
    );
}

#[tokio::test]
async fn test_concurrent_launches_are_independent() {
    let engine = Arc::new(RecordingEngine::default());
    let launcher = launcher();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            let launcher = launcher.clone();
            tokio::spawn(async move {
                let request = LaunchRequest::from_image(format!("app-{}", i), image(None))
                    .ulimit(format!("nofile:{}:{}", i, i));
                launcher.launch(engine.as_ref(), &request).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let created = engine.created.lock().unwrap();
    assert_eq!(created.len(), 8);
    for spec in created.iter() {
        let i: i64 = spec.name.trim_start_matches("app-").parse().unwrap();
        assert_eq!(
            spec.ulimits,
            vec![ResourceLimit {
                name: LimitName::Nofile,
                soft: i,
                hard: i,
            }]
        );
    }
}
