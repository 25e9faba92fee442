//! Scripted planning tools for pipeline and orchestrator tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use super::result::project_name;
use crate::error::{ConfigureError, ToolError};
use crate::ports::tool::{PlanningTool, StateSnapshot, ToolFuture, ToolProvider};

/// How a scripted project responds to each tool call.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    pub init: Result<(), String>,
    pub panic_on_init: bool,
    pub state_version: Option<String>,
    pub plan: Result<i32, String>,
    pub plan_delay: Option<Duration>,
    pub raw_plan: Result<String, String>,
}

impl Script {
    pub fn no_changes() -> Self {
        Self {
            init: Ok(()),
            panic_on_init: false,
            state_version: Some("1.7.0".into()),
            plan: Ok(0),
            plan_delay: None,
            raw_plan: Ok("No changes. Your infrastructure matches the configuration.\n".into()),
        }
    }

    pub fn drift(summary_line: &str) -> Self {
        Self {
            plan: Ok(2),
            raw_plan: Ok(format!(
                "Terraform will perform the following actions:\n\n  + resource\n\n{summary_line}\n"
            )),
            ..Self::no_changes()
        }
    }

    pub fn init_failure() -> Self {
        Self { init: Err("Error: backend unreachable".into()), ..Self::no_changes() }
    }
}

/// Tool provider answering from per-project scripts.
pub(crate) struct ScriptedTools {
    scripts: HashMap<String, Script>,
    default: Script,
    fatal_bind: Option<String>,
    binds: Mutex<Vec<(String, Instant)>>,
    backend_configs: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptedTools {
    pub fn new(default: Script) -> Self {
        Self {
            scripts: HashMap::new(),
            default,
            fatal_bind: None,
            binds: Mutex::new(Vec::new()),
            backend_configs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with(mut self, project: &str, script: Script) -> Self {
        self.scripts.insert(project.to_string(), script);
        self
    }

    pub fn fatal_bind_for(mut self, project: &str) -> Self {
        self.fatal_bind = Some(project.to_string());
        self
    }

    /// Project names with the instant each was bound, in bind order.
    pub fn binds(&self) -> Vec<(String, Instant)> {
        self.binds.lock().unwrap().clone()
    }

    pub fn backend_configs(&self) -> Vec<Option<String>> {
        self.backend_configs.lock().unwrap().clone()
    }
}

impl ToolProvider for ScriptedTools {
    fn version(&self) -> &str {
        "1.7.0"
    }

    fn bind(&self, workdir: &Path) -> Result<Box<dyn PlanningTool>, ConfigureError> {
        let name = project_name(workdir);
        self.binds.lock().unwrap().push((name.clone(), Instant::now()));
        if self.fatal_bind.as_deref() == Some(name.as_str()) {
            return Err(ConfigureError::InvalidWorkdir {
                path: workdir.to_path_buf(),
                reason: "scripted failure".into(),
            });
        }
        let script = self.scripts.get(&name).unwrap_or(&self.default).clone();
        Ok(Box::new(ScriptedTool { script, backend_configs: Arc::clone(&self.backend_configs) }))
    }
}

struct ScriptedTool {
    script: Script,
    backend_configs: Arc<Mutex<Vec<Option<String>>>>,
}

fn failed(message: &str) -> ToolError {
    ToolError::Failed { code: 1, stderr: message.to_string() }
}

impl PlanningTool for ScriptedTool {
    fn init<'a>(&'a self, backend_config: Option<&'a str>) -> ToolFuture<'a, ()> {
        Box::pin(async move {
            self.backend_configs.lock().unwrap().push(backend_config.map(str::to_string));
            assert!(!self.script.panic_on_init, "scripted panic during init");
            self.script.init.clone().map_err(|m| failed(&m))
        })
    }

    fn show_state(&self) -> ToolFuture<'_, StateSnapshot> {
        Box::pin(async move {
            match &self.script.state_version {
                Some(version) => Ok(StateSnapshot {
                    terraform_version: version.clone(),
                    resources: Vec::new(),
                }),
                None => Err(ToolError::Output("no state".into())),
            }
        })
    }

    fn plan<'a>(&'a self, _out: &'a str) -> ToolFuture<'a, i32> {
        Box::pin(async move {
            if let Some(delay) = self.script.plan_delay {
                tokio::time::sleep(delay).await;
            }
            self.script.plan.clone().map_err(|m| failed(&m))
        })
    }

    fn show_plan_raw<'a>(&'a self, _plan_file: &'a Path) -> ToolFuture<'a, String> {
        Box::pin(async move { self.script.raw_plan.clone().map_err(|m| failed(&m)) })
    }
}

/// Absolute-looking project paths under a fake root.
pub(crate) fn projects(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(|name| PathBuf::from("/nonexistent/infra").join(name)).collect()
}
