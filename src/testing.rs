//! In-memory stand-ins for the host, the container runtime and artifact sources.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write as _;
use std::path::Path;

use crate::config::{ArtifactSources, Settings};
use crate::context::{Context, Verbosity};
use crate::error::{AppError, Result};
use crate::process::{CommandOutput, CommandSpec, ProcessRunner};
use crate::provision::ArtifactFetcher;
use crate::runtime::{ContainerInfo, ContainerRuntime, ContainerSpec};

type Reply = Box<dyn Fn(&CommandSpec) -> CommandOutput>;

/// Records every command and answers with a canned reply.
pub(crate) struct FakeRunner {
    calls: RefCell<Vec<CommandSpec>>,
    reply: Reply,
}

impl FakeRunner {
    pub fn ok() -> Self {
        Self::replying(|_| CommandOutput::ok(""))
    }

    pub fn replying(reply: impl Fn(&CommandSpec) -> CommandOutput + 'static) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            reply: Box::new(reply),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(CommandSpec::command_line)
            .collect()
    }
}

impl ProcessRunner for FakeRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(command.clone());
        Ok((self.reply)(command))
    }
}

#[derive(Default)]
struct RuntimeState {
    containers: BTreeMap<String, ContainerInfo>,
    networks: BTreeSet<String>,
    missing_images: BTreeSet<String>,
    next_id: u32,
    ops: Vec<String>,
    fail_on: Option<String>,
    /// Container removed on its nth inspection, counted down per inspect.
    vanish_at: Option<(String, usize)>,
}

/// Container runtime keeping its objects in memory and logging each mutation.
#[derive(Default)]
pub(crate) struct FakeRuntime {
    state: RefCell<RuntimeState>,
}

impl FakeRuntime {
    /// Operations issued so far, e.g. `start genomizer-server-dev1`.
    pub fn ops(&self) -> Vec<String> {
        self.state.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }

    /// Make the given operation fail with a runtime error.
    pub fn fail_on(&self, op: &str) {
        self.state.borrow_mut().fail_on = Some(op.to_string());
    }

    pub fn without_image(&self, image: &str) {
        self.state.borrow_mut().missing_images.insert(image.to_string());
    }

    pub fn insert(&self, name: &str, info: ContainerInfo) {
        self.state
            .borrow_mut()
            .containers
            .insert(name.to_string(), info);
    }

    /// Drop a container behind the manager's back.
    pub fn vanish(&self, name: &str) {
        self.state.borrow_mut().containers.remove(name);
    }

    /// Drop `name` right before its `nth` inspection (1-based) answers.
    pub fn vanish_at_inspection(&self, name: &str, nth: usize) {
        self.state.borrow_mut().vanish_at = Some((name.to_string(), nth));
    }

    pub fn container(&self, name: &str) -> Option<ContainerInfo> {
        self.state.borrow().containers.get(name).cloned()
    }

    pub fn container_count(&self) -> usize {
        self.state.borrow().containers.len()
    }

    pub fn has_network(&self, name: &str) -> bool {
        self.state.borrow().networks.contains(name)
    }

    fn record(&self, op: String) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_on.as_deref() == Some(op.as_str()) {
            return Err(AppError::runtime(&op, "injected failure"));
        }
        state.ops.push(op);
        Ok(())
    }

    fn with_container<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut ContainerInfo) -> Result<()>,
    {
        let mut state = self.state.borrow_mut();
        let info = state
            .containers
            .get_mut(name)
            .ok_or_else(|| AppError::runtime(name, "No such container"))?;
        f(info)
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>> {
        let mut state = self.state.borrow_mut();
        let due = match state.vanish_at.as_mut() {
            Some((target, remaining)) if target == name => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            _ => false,
        };
        if due {
            state.vanish_at = None;
            state.containers.remove(name);
        }
        Ok(state.containers.get(name).cloned())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        self.record(format!("create {}", spec.name))?;
        let mut state = self.state.borrow_mut();
        if state.containers.contains_key(&spec.name) {
            return Err(AppError::runtime("create", "Conflict. The container name is already in use"));
        }
        state.next_id += 1;
        let id = format!("{:012x}", state.next_id);
        let info = ContainerInfo {
            id: id.clone(),
            running: false,
            memory_bytes: spec.memory_mib.map(|m| u64::from(m) * 1024 * 1024).unwrap_or(0),
            // Docker raises any requested share count below 2 to 2.
            cpu_shares: spec.cpu_shares.map(|s| u64::from(s.max(2))).unwrap_or(0),
            binds: spec
                .mounts
                .iter()
                .map(|m| (m.target.clone(), m.source.clone()))
                .collect(),
            ports: spec.ports.iter().map(|(h, c)| (*c, Some(*h))).collect(),
        };
        state.containers.insert(spec.name.clone(), info);
        Ok(id)
    }

    async fn start_container(&self, name: &str) -> Result<()> {
        self.record(format!("start {name}"))?;
        self.with_container(name, |info| {
            info.running = true;
            Ok(())
        })
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        self.record(format!("stop {name}"))?;
        self.with_container(name, |info| {
            info.running = false;
            Ok(())
        })
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        self.record(format!("rm {name}"))?;
        self.with_container(name, |info| {
            if info.running {
                Err(AppError::runtime("remove", "container is running"))
            } else {
                Ok(())
            }
        })?;
        self.state.borrow_mut().containers.remove(name);
        Ok(())
    }

    async fn network_exists(&self, name: &str) -> Result<bool> {
        Ok(self.has_network(name))
    }

    async fn create_network(&self, name: &str) -> Result<()> {
        self.record(format!("network create {name}"))?;
        if !self.state.borrow_mut().networks.insert(name.to_string()) {
            return Err(AppError::runtime("network create", "network already exists"));
        }
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<()> {
        self.record(format!("network rm {name}"))?;
        self.state.borrow_mut().networks.remove(name);
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        Ok(!self.state.borrow().missing_images.contains(image))
    }

    async fn build_image(&self, image: &str, _context: &Path) -> Result<()> {
        self.record(format!("build {image}"))?;
        self.state.borrow_mut().missing_images.remove(image);
        Ok(())
    }

    async fn exec_interactive(&self, name: &str, command: &[&str]) -> Result<()> {
        self.record(format!("exec {name} {}", command.join(" ")))
    }

    async fn print_logs(&self, name: &str) -> Result<()> {
        self.record(format!("logs {name}"))
    }
}

/// Serves fixed bodies per URL and remembers what was fetched.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    bodies: BTreeMap<String, Vec<u8>>,
    fetched: RefCell<Vec<String>>,
}

impl FakeFetcher {
    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    /// Serves every default artifact URL.
    pub fn serving(sources: &ArtifactSources) -> Self {
        let mut fetcher = Self::default()
            .with(&sources.server_jar, "server-jar")
            .with(&sources.tester_jar, "tester-jar")
            .with(
                &sources.resources,
                tar_gz(&[("resources-1.0/", None), ("resources-1.0/genome.txt", Some("ACGT"))]),
            )
            .with(
                &sources.web_client,
                tar_gz(&[("genomizer-web-master/index.html", Some("<html></html>"))]),
            );
        for url in &sources.sql {
            fetcher = fetcher.with(url, "CREATE TABLE t ();");
        }
        fetcher
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }
}

impl ArtifactFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        self.fetched.borrow_mut().push(url.to_string());
        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| AppError::network_with_url(url, "404 Not Found"))?;
        fs::write(dest, body)?;
        Ok(())
    }
}

/// Build a gzip'd tarball; `None` content marks a directory.
pub(crate) fn tar_gz(entries: &[(&str, Option<&str>)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        match content {
            Some(content) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(content.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder
                    .append_data(&mut header, path, content.as_bytes())
                    .unwrap();
            }
            None => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                header.set_cksum();
                builder
                    .append_data(&mut header, path, &[] as &[u8])
                    .unwrap();
            }
        }
    }
    let mut encoder = builder.into_inner().unwrap();
    encoder.flush().unwrap();
    encoder.finish().unwrap()
}

/// Context rooted at `root` with templates, cert tool and a fixed host IP.
pub(crate) fn context(root: &Path) -> Context {
    let settings = Settings {
        host_ip: Some("10.1.2.3".to_string()),
        ..Settings::default()
    };
    let templates = root.join(&settings.templates_dir);
    fs::create_dir_all(&templates).unwrap();
    fs::write(
        templates.join("settings.cfg"),
        "databaseHost = genomizer-postgres\nlisten = 127.0.0.1\n",
    )
    .unwrap();
    fs::write(
        templates.join("nginx.conf"),
        "upstream app { server genomizer-server:7000; }\nallow 127.0.0.1;\n",
    )
    .unwrap();
    Context::new(Verbosity::Normal, root, settings)
}

/// Cert-tool stand-in: writes the three certificate files into the directory argument.
pub(crate) fn cert_tool_runner() -> FakeRunner {
    FakeRunner::replying(|command| {
        if let Some(dir) = command.args.first() {
            let dir = Path::new(dir);
            fs::create_dir_all(dir).unwrap();
            for name in crate::provision::CERT_FILES {
                fs::write(dir.join(name), name).unwrap();
            }
        }
        CommandOutput::ok("")
    })
}
