//! The host application's extension registry, seen from the reloader.

use std::collections::HashSet;
use std::process::Command;

use anyhow::{Context, bail};

use crate::module_id::ModuleId;

/// Registry of active units owned by the host application.
///
/// Calls are synchronous from the reloader's point of view: it never issues
/// a second call before the previous one returns.
pub trait ExtensionRegistry {
    /// Whether `module` is currently active.
    fn contains(&self, module: &ModuleId) -> bool;

    /// Load a unit that is not yet active.
    fn load(&mut self, module: &ModuleId) -> anyhow::Result<()>;

    /// Reload a unit that is already active.
    fn reload(&mut self, module: &ModuleId) -> anyhow::Result<()>;
}

impl<R: ExtensionRegistry + ?Sized> ExtensionRegistry for Box<R> {
    fn contains(&self, module: &ModuleId) -> bool {
        (**self).contains(module)
    }

    fn load(&mut self, module: &ModuleId) -> anyhow::Result<()> {
        (**self).load(module)
    }

    fn reload(&mut self, module: &ModuleId) -> anyhow::Result<()> {
        (**self).reload(module)
    }
}

/// Placeholder replaced by the module identifier in command templates.
pub const MODULE_PLACEHOLDER: &str = "{module}";

/// Environment variable carrying the module identifier to spawned commands.
pub const MODULE_ENV: &str = "EXT_RELOAD_MODULE";

/// Registry that delegates to shell commands.
///
/// The active set lives in memory: a unit becomes active after its load
/// command succeeds. With no command configured for an operation the call
/// only records and logs it.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    load_cmd: Option<String>,
    reload_cmd: Option<String>,
    active: HashSet<ModuleId>,
}

impl CommandRegistry {
    pub fn new(load_cmd: Option<String>, reload_cmd: Option<String>) -> Self {
        Self {
            load_cmd,
            reload_cmd,
            active: HashSet::new(),
        }
    }

    /// Mark modules as already active, e.g. those the host loaded at startup.
    pub fn with_active(mut self, modules: impl IntoIterator<Item = ModuleId>) -> Self {
        self.active.extend(modules);
        self
    }

    pub fn active(&self) -> &HashSet<ModuleId> {
        &self.active
    }

    fn run(&self, op: &str, template: Option<&str>, module: &ModuleId) -> anyhow::Result<()> {
        let Some(template) = template else {
            crate::debug_event!("registry", op, "{module} (no command configured)");
            return Ok(());
        };

        let command = template.replace(MODULE_PLACEHOLDER, module.as_str());
        crate::debug_event!("registry", "exec", "{command}");

        let status = shell(&command)
            .env(MODULE_ENV, module.as_str())
            .status()
            .with_context(|| format!("failed to spawn {op} command for '{module}'"))?;

        if !status.success() {
            bail!("{op} command for '{module}' exited with {status}");
        }
        Ok(())
    }
}

impl ExtensionRegistry for CommandRegistry {
    fn contains(&self, module: &ModuleId) -> bool {
        self.active.contains(module)
    }

    fn load(&mut self, module: &ModuleId) -> anyhow::Result<()> {
        self.run("load", self.load_cmd.as_deref(), module)?;
        self.active.insert(module.clone());
        Ok(())
    }

    fn reload(&mut self, module: &ModuleId) -> anyhow::Result<()> {
        self.run("reload", self.reload_cmd.as_deref(), module)
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
