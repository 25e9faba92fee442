//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tfdrift::ports::{CommandFuture, CommandOutput, CommandRunner, Invocation};

/// A scratch directory of terraform projects.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates one project directory with a `main.tf` per name.
    pub fn with_projects(names: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            let project = dir.path().join("infra").join(name);
            std::fs::create_dir_all(&project).unwrap();
            std::fs::write(project.join("main.tf"), "resource \"null_resource\" \"a\" {}\n").unwrap();
        }
        Self { dir }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("infra")
    }

    pub fn project(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    /// An empty file standing in for the terraform executable.
    pub fn executable(&self) -> PathBuf {
        let path = self.dir.path().join("terraform");
        std::fs::write(&path, "").unwrap();
        path
    }
}

/// Answers terraform invocations the way a real install would, keyed on the
/// project directory name.
pub struct FakeTerraform {
    version: String,
    drifted: Vec<String>,
    broken_init: Vec<String>,
    calls: Mutex<Vec<Invocation>>,
}

impl FakeTerraform {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            drifted: Vec::new(),
            broken_init: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn drifted(mut self, project: &str) -> Self {
        self.drifted.push(project.to_string());
        self
    }

    pub fn broken_init(mut self, project: &str) -> Self {
        self.broken_init.push(project.to_string());
        self
    }

    pub fn into_runner(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, invocation: &Invocation) -> CommandOutput {
        let project = invocation
            .workdir
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let drifted = self.drifted.contains(&project);
        let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();

        match args.as_slice() {
            ["version", "-json"] => ok(&format!("{{\"terraform_version\":\"{}\"}}", self.version)),
            ["init", ..] if self.broken_init.contains(&project) => {
                exit(1, "Error: Failed to get existing workspaces")
            }
            ["init", ..] => ok("Terraform has been successfully initialized!"),
            ["show", "-json", ..] => ok(&format!(
                "{{\"format_version\":\"1.0\",\"terraform_version\":\"{}\",\"values\":{{\"root_module\":{{\"resources\":[{{\"address\":\"null_resource.a\"}}]}}}}}}",
                self.version
            )),
            ["plan", ..] => exit(if drifted { 2 } else { 0 }, ""),
            ["show", "-no-color", _] if drifted => ok(
                "Terraform will perform the following actions:\n\n  # null_resource.b will be created\n\nPlan: 1 to add, 0 to change, 0 to destroy.\n",
            ),
            ["show", "-no-color", _] => ok("No changes. Your infrastructure matches the configuration.\n"),
            _ => exit(1, "unexpected invocation"),
        }
    }
}

impl CommandRunner for FakeTerraform {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> CommandFuture<'a> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(invocation.clone());
            Ok(self.respond(invocation))
        })
    }
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput { exit_code: 0, stdout: stdout.to_string(), stderr: String::new() }
}

fn exit(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput { exit_code: code, stdout: String::new(), stderr: stderr.to_string() }
}
