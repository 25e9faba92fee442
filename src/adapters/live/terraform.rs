//! Live adapter for the planning tool ports, driving the `terraform` CLI.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ConfigureError, ToolError};
use crate::ports::command::{CommandOutput, CommandRunner, Invocation};
use crate::ports::filesystem::FileSystem;
use crate::ports::tool::{
    InstallFuture, PlanningTool, StateSnapshot, ToolFuture, ToolInstaller, ToolProvider,
};

#[cfg(windows)]
const BINARY: &str = "terraform.exe";
#[cfg(not(windows))]
const BINARY: &str = "terraform";

/// Resolves an installed `terraform` executable of an exact version.
///
/// Candidates are checked in order: the explicit executable (when configured,
/// it is the only candidate), `<install_dir>/<version>/terraform`, then the
/// first executable `terraform` on `PATH`. The first candidate found must
/// report the requested version or resolution fails; later candidates are not
/// tried.
pub struct TerraformInstaller {
    runner: Arc<dyn CommandRunner>,
    fs: Arc<dyn FileSystem>,
    executable: Option<PathBuf>,
    install_dir: Option<PathBuf>,
    search_path: Option<OsString>,
}

impl TerraformInstaller {
    /// Creates an installer that searches the process `PATH`.
    pub fn new(runner: Arc<dyn CommandRunner>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            runner,
            fs,
            executable: None,
            install_dir: None,
            search_path: std::env::var_os("PATH"),
        }
    }

    /// Pins resolution to a single executable.
    #[must_use]
    pub fn with_executable(mut self, executable: Option<PathBuf>) -> Self {
        self.executable = executable;
        self
    }

    /// Adds a directory holding per-version installs.
    #[must_use]
    pub fn with_install_dir(mut self, install_dir: Option<PathBuf>) -> Self {
        self.install_dir = install_dir;
        self
    }

    /// Replaces the `PATH` value searched for the executable.
    #[must_use]
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    fn resolve(&self, version: &str) -> Result<PathBuf, ConfigureError> {
        let mut searched = Vec::new();
        if let Some(executable) = &self.executable {
            if self.is_file(executable) {
                return Ok(executable.clone());
            }
            searched.push(executable.display().to_string());
        } else {
            if let Some(dir) = &self.install_dir {
                let candidate = dir.join(version).join(BINARY);
                if self.is_file(&candidate) {
                    return Ok(candidate);
                }
                searched.push(candidate.display().to_string());
            }
            if let Some(path) = &self.search_path {
                let cwd = std::env::current_dir().unwrap_or_default();
                match which::which_in(BINARY, Some(path), cwd) {
                    Ok(found) => return Ok(found),
                    Err(e) => debug!(error = %e, "no terraform on PATH"),
                }
                searched.push("PATH".to_string());
            }
        }

        Err(ConfigureError::ToolNotFound {
            version: version.to_string(),
            searched: if searched.is_empty() { "nothing".into() } else { searched.join(", ") },
        })
    }

    fn is_file(&self, path: &Path) -> bool {
        self.fs.exists(path) && !self.fs.is_dir(path)
    }

    async fn verify(&self, executable: &Path, version: &str) -> Result<(), ConfigureError> {
        let invocation = Invocation::new(executable).args(["version", "-json"]);
        let query_failed =
            |source| ConfigureError::VersionQuery { path: executable.to_path_buf(), source };

        let output = self.runner.run(&invocation).await.map_err(query_failed)?;
        let output = check_status(output).map_err(query_failed)?;
        let reported: VersionJson = serde_json::from_str(&output.stdout)
            .map_err(|e| query_failed(ToolError::Output(format!("version -json: {e}"))))?;

        if reported.terraform_version != version {
            return Err(ConfigureError::VersionMismatch {
                path: executable.to_path_buf(),
                expected: version.to_string(),
                found: reported.terraform_version,
            });
        }
        Ok(())
    }
}

impl ToolInstaller for TerraformInstaller {
    fn install<'a>(&'a self, version: &'a str) -> InstallFuture<'a> {
        Box::pin(async move {
            let version = version.trim_start_matches('v');
            let executable = self.resolve(version)?;

            self.verify(&executable, version).await?;
            info!(path = %executable.display(), version, "using terraform");

            let binding: Arc<dyn ToolProvider> = Arc::new(TerraformBinding {
                executable,
                version: version.to_string(),
                runner: Arc::clone(&self.runner),
                fs: Arc::clone(&self.fs),
            });
            Ok(binding)
        })
    }
}

/// A verified `terraform` executable.
pub struct TerraformBinding {
    executable: PathBuf,
    version: String,
    runner: Arc<dyn CommandRunner>,
    fs: Arc<dyn FileSystem>,
}

impl ToolProvider for TerraformBinding {
    fn version(&self) -> &str {
        &self.version
    }

    fn bind(&self, workdir: &Path) -> Result<Box<dyn PlanningTool>, ConfigureError> {
        if !self.fs.is_dir(workdir) {
            return Err(ConfigureError::InvalidWorkdir {
                path: workdir.to_path_buf(),
                reason: "not a directory".into(),
            });
        }
        Ok(Box::new(TerraformCli {
            executable: self.executable.clone(),
            workdir: workdir.to_path_buf(),
            runner: Arc::clone(&self.runner),
        }))
    }
}

/// `terraform` bound to one project directory.
pub struct TerraformCli {
    executable: PathBuf,
    workdir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl TerraformCli {
    async fn exec(&self, args: Vec<String>) -> Result<CommandOutput, ToolError> {
        let invocation = Invocation::new(&self.executable)
            .args(args)
            .current_dir(&self.workdir)
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0");
        debug!(workdir = %self.workdir.display(), args = ?invocation.args, "running terraform");
        self.runner.run(&invocation).await
    }
}

impl PlanningTool for TerraformCli {
    fn init<'a>(&'a self, backend_config: Option<&'a str>) -> ToolFuture<'a, ()> {
        Box::pin(async move {
            let mut args = strings(["init", "-upgrade", "-input=false", "-no-color"]);
            if let Some(config) = backend_config.filter(|c| !c.is_empty()) {
                args.push(format!("-backend-config={config}"));
            }
            check_status(self.exec(args).await?)?;
            Ok(())
        })
    }

    fn show_state(&self) -> ToolFuture<'_, StateSnapshot> {
        Box::pin(async move {
            let output = check_status(self.exec(strings(["show", "-json", "-no-color"])).await?)?;
            parse_state(&output.stdout)
        })
    }

    fn plan<'a>(&'a self, out: &'a str) -> ToolFuture<'a, i32> {
        Box::pin(async move {
            let mut args =
                strings(["plan", "-detailed-exitcode", "-input=false", "-no-color"]);
            args.push(format!("-out={out}"));
            let output = self.exec(args).await?;
            match output.exit_code {
                1 => Err(failure(&output)),
                code => Ok(code),
            }
        })
    }

    fn show_plan_raw<'a>(&'a self, plan_file: &'a Path) -> ToolFuture<'a, String> {
        Box::pin(async move {
            let mut args = strings(["show", "-no-color"]);
            args.push(plan_file.display().to_string());
            let output = check_status(self.exec(args).await?)?;
            Ok(output.stdout)
        })
    }
}

#[derive(Deserialize)]
struct VersionJson {
    terraform_version: String,
}

#[derive(Deserialize)]
struct ShowJson {
    #[serde(default)]
    terraform_version: String,
    #[serde(default)]
    values: Option<StateValues>,
}

#[derive(Deserialize)]
struct StateValues {
    #[serde(default)]
    root_module: Option<StateModule>,
}

#[derive(Deserialize)]
struct StateModule {
    #[serde(default)]
    resources: Vec<StateResource>,
    #[serde(default)]
    child_modules: Vec<StateModule>,
}

#[derive(Deserialize)]
struct StateResource {
    address: String,
}

fn parse_state(json: &str) -> Result<StateSnapshot, ToolError> {
    let show: ShowJson = serde_json::from_str(json)
        .map_err(|e| ToolError::Output(format!("show -json: {e}")))?;

    let mut resources = Vec::new();
    let mut pending: Vec<&StateModule> =
        show.values.as_ref().and_then(|v| v.root_module.as_ref()).into_iter().collect();
    while let Some(module) = pending.pop() {
        resources.extend(module.resources.iter().map(|r| r.address.clone()));
        pending.extend(module.child_modules.iter());
    }
    resources.sort();

    Ok(StateSnapshot { terraform_version: show.terraform_version, resources })
}

fn check_status(output: CommandOutput) -> Result<CommandOutput, ToolError> {
    if output.exit_code == 0 {
        Ok(output)
    } else {
        Err(failure(&output))
    }
}

fn failure(output: &CommandOutput) -> ToolError {
    ToolError::Failed { code: output.exit_code, stderr: output.stderr.trim().to_string() }
}

fn strings<const N: usize>(args: [&str; N]) -> Vec<String> {
    args.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::adapters::live::filesystem::LiveFileSystem;
    use crate::ports::command::CommandFuture;

    /// Answers invocations from a closure and remembers them.
    struct ScriptedRunner {
        calls: Mutex<Vec<Invocation>>,
        respond: Box<dyn Fn(&Invocation) -> Result<CommandOutput, ToolError> + Send + Sync>,
    }

    impl ScriptedRunner {
        fn new(
            respond: impl Fn(&Invocation) -> Result<CommandOutput, ToolError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self { calls: Mutex::new(Vec::new()), respond: Box::new(respond) })
        }

        fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run<'a>(&'a self, invocation: &'a Invocation) -> CommandFuture<'a> {
            self.calls.lock().unwrap().push(invocation.clone());
            let result = (self.respond)(invocation);
            Box::pin(async move { result })
        }
    }

    fn out(exit_code: i32, stdout: &str) -> Result<CommandOutput, ToolError> {
        Ok(CommandOutput { exit_code, stdout: stdout.into(), stderr: String::new() })
    }

    fn fake_binary(dir: &Path) -> PathBuf {
        let path = dir.join(BINARY);
        std::fs::write(&path, "").unwrap();
        path
    }

    #[tokio::test]
    async fn install_verifies_explicit_executable() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_binary(dir.path());
        let runner = ScriptedRunner::new(|_| out(0, r#"{"terraform_version":"1.7.0"}"#));

        let installer = TerraformInstaller::new(runner.clone(), Arc::new(LiveFileSystem))
            .with_executable(Some(binary.clone()));
        let provider = installer.install("v1.7.0").await.unwrap();

        assert_eq!(provider.version(), "1.7.0");
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, binary);
        assert_eq!(calls[0].args, vec!["version", "-json"]);
    }

    #[tokio::test]
    async fn install_rejects_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_binary(dir.path());
        let runner = ScriptedRunner::new(|_| out(0, r#"{"terraform_version":"1.5.7"}"#));

        let installer = TerraformInstaller::new(runner, Arc::new(LiveFileSystem))
            .with_executable(Some(binary));
        let err = installer.install("1.7.0").await.err().unwrap();

        assert!(matches!(
            err,
            ConfigureError::VersionMismatch { ref found, .. } if found == "1.5.7"
        ));
    }

    #[tokio::test]
    async fn install_prefers_versioned_install_dir_over_path() {
        let install_dir = tempfile::tempdir().unwrap();
        let versioned = install_dir.path().join("1.7.0");
        std::fs::create_dir_all(&versioned).unwrap();
        let binary = fake_binary(&versioned);
        let path_dir = tempfile::tempdir().unwrap();
        fake_binary(path_dir.path());
        let runner = ScriptedRunner::new(|_| out(0, r#"{"terraform_version":"1.7.0"}"#));

        let installer = TerraformInstaller::new(runner.clone(), Arc::new(LiveFileSystem))
            .with_install_dir(Some(install_dir.path().to_path_buf()))
            .with_search_path(Some(path_dir.path().as_os_str().to_owned()));
        installer.install("1.7.0").await.unwrap();

        assert_eq!(runner.calls()[0].program, binary);
    }

    #[tokio::test]
    async fn install_without_any_binary_is_not_found() {
        let empty = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new(|_| out(0, ""));

        let installer = TerraformInstaller::new(runner.clone(), Arc::new(LiveFileSystem))
            .with_search_path(Some(empty.path().as_os_str().to_owned()));
        let err = installer.install("1.7.0").await.err().unwrap();

        assert!(matches!(err, ConfigureError::ToolNotFound { .. }));
        assert!(runner.calls().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn install_skips_non_executable_files_on_path() {
        use std::os::unix::fs::PermissionsExt;

        let shadow = tempfile::tempdir().unwrap();
        let stale = fake_binary(shadow.path());
        std::fs::set_permissions(&stale, std::fs::Permissions::from_mode(0o644)).unwrap();
        let real = tempfile::tempdir().unwrap();
        let binary = fake_binary(real.path());
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        let search_path = std::env::join_paths([shadow.path(), real.path()]).unwrap();
        let runner = ScriptedRunner::new(|_| out(0, r#"{"terraform_version":"1.7.0"}"#));

        let installer = TerraformInstaller::new(runner.clone(), Arc::new(LiveFileSystem))
            .with_search_path(Some(search_path));
        installer.install("1.7.0").await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, binary);
    }

    #[tokio::test]
    async fn install_reports_every_place_searched() {
        let install_dir = tempfile::tempdir().unwrap();
        let empty = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new(|_| out(0, ""));

        let installer = TerraformInstaller::new(runner, Arc::new(LiveFileSystem))
            .with_install_dir(Some(install_dir.path().to_path_buf()))
            .with_search_path(Some(empty.path().as_os_str().to_owned()));
        let err = installer.install("1.7.0").await.err().unwrap();

        let message = err.to_string();
        assert!(message.contains(&install_dir.path().join("1.7.0").display().to_string()), "{message}");
        assert!(message.contains("PATH"), "{message}");
    }

    #[tokio::test]
    async fn bind_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_binary(dir.path());
        let runner = ScriptedRunner::new(|_| out(0, r#"{"terraform_version":"1.7.0"}"#));
        let provider = TerraformInstaller::new(runner, Arc::new(LiveFileSystem))
            .with_executable(Some(binary))
            .install("1.7.0")
            .await
            .unwrap();

        let err = provider.bind(&dir.path().join("missing")).err().unwrap();
        assert!(matches!(err, ConfigureError::InvalidWorkdir { .. }));
    }

    fn bound_cli(runner: Arc<ScriptedRunner>, workdir: &Path) -> TerraformCli {
        TerraformCli {
            executable: PathBuf::from("/opt/terraform"),
            workdir: workdir.to_path_buf(),
            runner,
        }
    }

    #[tokio::test]
    async fn init_passes_backend_config_and_runs_in_workdir() {
        let runner = ScriptedRunner::new(|_| out(0, ""));
        let cli = bound_cli(runner.clone(), Path::new("/infra/network"));

        cli.init(Some("backend.hcl")).await.unwrap();

        let call = &runner.calls()[0];
        assert_eq!(call.workdir.as_deref(), Some(Path::new("/infra/network")));
        assert_eq!(call.args.first().map(String::as_str), Some("init"));
        assert!(call.args.contains(&"-upgrade".to_string()));
        assert!(call.args.contains(&"-backend-config=backend.hcl".to_string()));
        assert!(call.env.contains(&("TF_IN_AUTOMATION".to_string(), "1".to_string())));
    }

    #[tokio::test]
    async fn init_failure_carries_stderr() {
        let runner = ScriptedRunner::new(|_| {
            Ok(CommandOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: "Error: Failed to get existing workspaces\n".into(),
            })
        });
        let cli = bound_cli(runner, Path::new("/infra/network"));

        let err = cli.init(None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "exited with status 1: Error: Failed to get existing workspaces"
        );
    }

    #[tokio::test]
    async fn plan_passes_detailed_exit_codes_through() {
        for (code, expected) in [(0, Some(0)), (2, Some(2)), (3, Some(3)), (1, None)] {
            let runner = ScriptedRunner::new(move |_| out(code, ""));
            let cli = bound_cli(runner.clone(), Path::new("/infra/app"));

            let result = cli.plan("app.tfplan").await;
            assert_eq!(result.ok(), expected, "exit code {code}");
            assert!(runner.calls()[0].args.contains(&"-out=app.tfplan".to_string()));
            assert!(runner.calls()[0].args.contains(&"-detailed-exitcode".to_string()));
        }
    }

    #[tokio::test]
    async fn plan_killed_by_a_signal_is_an_error() {
        let runner = ScriptedRunner::new(|invocation| {
            Err(ToolError::Terminated {
                program: invocation.program.display().to_string(),
                status: "signal: 9 (SIGKILL)".into(),
            })
        });
        let cli = bound_cli(runner, Path::new("/infra/app"));

        let err = cli.plan("app.tfplan").await.unwrap_err();
        assert!(matches!(err, ToolError::Terminated { .. }));
    }

    #[tokio::test]
    async fn show_state_collects_nested_resource_addresses() {
        let state = r#"{
            "format_version": "1.0",
            "terraform_version": "1.7.0",
            "values": {
                "root_module": {
                    "resources": [{"address": "aws_s3_bucket.logs"}],
                    "child_modules": [
                        {"resources": [{"address": "module.vpc.aws_vpc.main"}]}
                    ]
                }
            }
        }"#;
        let runner = ScriptedRunner::new(move |_| out(0, state));
        let cli = bound_cli(runner, Path::new("/infra/app"));

        let snapshot = cli.show_state().await.unwrap();
        assert_eq!(snapshot.terraform_version, "1.7.0");
        assert_eq!(snapshot.resources, vec!["aws_s3_bucket.logs", "module.vpc.aws_vpc.main"]);
    }

    #[tokio::test]
    async fn show_state_without_state_has_no_resources() {
        let runner = ScriptedRunner::new(|_| out(0, r#"{"format_version":"1.0"}"#));
        let cli = bound_cli(runner, Path::new("/infra/app"));

        let snapshot = cli.show_state().await.unwrap();
        assert_eq!(snapshot, StateSnapshot::default());
    }

    #[tokio::test]
    async fn show_plan_raw_returns_stdout() {
        let runner =
            ScriptedRunner::new(|_| out(0, "Plan: 1 to add, 0 to change, 0 to destroy.\n"));
        let cli = bound_cli(runner.clone(), Path::new("/infra/app"));

        let text = cli.show_plan_raw(Path::new("/infra/app/app.tfplan")).await.unwrap();
        assert!(text.starts_with("Plan: 1 to add"));
        assert_eq!(runner.calls()[0].args, vec!["show", "-no-color", "/infra/app/app.tfplan"]);
    }
}
