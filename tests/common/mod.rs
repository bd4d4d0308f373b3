//! Shared fixtures for reconciler integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use haproxy_reconciler::config::DeployConfig;
use haproxy_reconciler::deploy::{
    BackupManager, BackupSnapshot, ConfigFiles, DeploymentController, FsConfigFiles,
    ProcessFailure, ProxyControl,
};
use haproxy_reconciler::inventory::{ExposureMode, ServicePort, ServiceRecord};
use haproxy_reconciler::render::TemplateRenderer;
use haproxy_reconciler::Reconciler;

pub const TEMPLATE: &str = "\
global
    daemon

{% for service in services %}
backend {{ service.name }}
    server {{ service.name }} {{ service.external_address }}:{{ service.exposed_port }} check
{% endfor %}
";

/// Number of backend sections in a rendered config.
pub fn backend_count(content: &str) -> usize {
    content.lines().filter(|l| l.starts_with("backend ")).count()
}

/// A proxy-tagged, node-exposed record with one node port per entry in `node_ports`.
pub fn tagged(name: &str, node_ports: &[u16]) -> ServiceRecord {
    ServiceRecord {
        name: name.to_string(),
        namespace: Some("default".to_string()),
        labels: BTreeMap::from([
            ("haproxy".to_string(), "true".to_string()),
            ("haproxy_url".to_string(), format!("{}.example.com", name)),
        ]),
        exposure: ExposureMode::NodePort,
        ports: node_ports
            .iter()
            .map(|p| ServicePort { name: None, port: 80, node_port: Some(*p) })
            .collect(),
    }
}

/// A record nobody asked to proxy.
pub fn untagged(name: &str) -> ServiceRecord {
    ServiceRecord {
        name: name.to_string(),
        namespace: Some("default".to_string()),
        labels: BTreeMap::new(),
        exposure: ExposureMode::ClusterIp,
        ports: vec![ServicePort { name: None, port: 80, node_port: None }],
    }
}

#[derive(Default)]
struct ProxyState {
    validate_script: VecDeque<bool>,
    restart_script: VecDeque<bool>,
    validated: Vec<String>,
    restarted_with: Vec<String>,
}

/// Scripted stand-in for the proxy binary and service manager.
///
/// Records the content it validated and the content of the active file at
/// every restart. Unscripted calls succeed.
#[derive(Clone)]
pub struct FakeProxy {
    active: PathBuf,
    state: Arc<Mutex<ProxyState>>,
}

impl FakeProxy {
    pub fn new(active: impl Into<PathBuf>) -> Self {
        Self {
            active: active.into(),
            state: Arc::new(Mutex::new(ProxyState::default())),
        }
    }

    pub fn script_validation(&self, results: &[bool]) {
        self.state.lock().unwrap().validate_script.extend(results);
    }

    pub fn script_restarts(&self, results: &[bool]) {
        self.state.lock().unwrap().restart_script.extend(results);
    }

    pub fn validated(&self) -> Vec<String> {
        self.state.lock().unwrap().validated.clone()
    }

    pub fn restarted_with(&self) -> Vec<String> {
        self.state.lock().unwrap().restarted_with.clone()
    }

    pub fn invocations(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.validated.len() + state.restarted_with.len()
    }
}

#[async_trait]
impl ProxyControl for FakeProxy {
    async fn validate(&self, config: &Path) -> Result<(), ProcessFailure> {
        let content = std::fs::read_to_string(config).unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        state.validated.push(content);
        if state.validate_script.pop_front().unwrap_or(true) {
            Ok(())
        } else {
            Err(ProcessFailure::Exit {
                command: format!("haproxy -q -c -f {}", config.display()),
                status: "exit status: 1".to_string(),
            })
        }
    }

    async fn restart(&self) -> Result<(), ProcessFailure> {
        let content = std::fs::read_to_string(&self.active).unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        state.restarted_with.push(content);
        if state.restart_script.pop_front().unwrap_or(true) {
            Ok(())
        } else {
            Err(ProcessFailure::Exit {
                command: "systemctl restart haproxy".to_string(),
                status: "exit status: 1".to_string(),
            })
        }
    }
}

/// Real file copies, except into paths under a blocked prefix.
#[derive(Clone, Default)]
pub struct FakeFiles {
    blocked: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeFiles {
    pub fn block(&self, prefix: impl Into<PathBuf>) {
        self.blocked.lock().unwrap().push(prefix.into());
    }
}

#[async_trait]
impl ConfigFiles for FakeFiles {
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let blocked = self.blocked.lock().unwrap().iter().any(|p| to.starts_with(p));
        if blocked {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "blocked by test"));
        }
        FsConfigFiles.copy(from, to).await
    }
}

/// Temp directory laid out like a deployment.
pub struct Fixture {
    pub dir: TempDir,
    pub proxy: FakeProxy,
    pub files: FakeFiles,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("templates")).unwrap();
        std::fs::write(dir.path().join("templates").join("haproxy.cfg.j2"), TEMPLATE).unwrap();
        let proxy = FakeProxy::new(dir.path().join("haproxy.cfg"));
        Self {
            dir,
            proxy,
            files: FakeFiles::default(),
        }
    }

    pub fn active(&self) -> PathBuf {
        self.dir.path().join("haproxy.cfg")
    }

    pub fn staging(&self) -> PathBuf {
        self.dir.path().join("haproxy.cfg.new")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.dir.path().join("backup")
    }

    pub fn read_active(&self) -> String {
        std::fs::read_to_string(self.active()).unwrap()
    }

    pub fn write_active(&self, content: &str) {
        std::fs::write(self.active(), content).unwrap();
    }

    pub fn backups(&self) -> Vec<BackupSnapshot> {
        BackupManager::new(self.backup_dir()).list().unwrap()
    }

    pub fn deploy_config() -> DeployConfig {
        DeployConfig {
            max_restart_attempts: 3,
            retry_base_delay_ms: 0,
            retry_max_delay_ms: 0,
            require_backup: false,
        }
    }

    pub fn controller(&self, config: &DeployConfig) -> DeploymentController<FakeFiles, FakeProxy> {
        DeploymentController::new(
            self.files.clone(),
            self.proxy.clone(),
            BackupManager::new(self.backup_dir()),
            self.active(),
            config,
        )
    }

    pub fn reconciler(&self) -> Reconciler<TemplateRenderer, FakeFiles, FakeProxy> {
        self.reconciler_with_template("haproxy.cfg.j2")
    }

    pub fn reconciler_with_template(&self, template: &str) -> Reconciler<TemplateRenderer, FakeFiles, FakeProxy> {
        let renderer = TemplateRenderer::new(self.dir.path().join("templates"), template);
        Reconciler::new(renderer, self.controller(&Self::deploy_config()), self.staging())
    }
}
