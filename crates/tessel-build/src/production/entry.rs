//! Production entry decoration.

use std::path::Path;

use tessel_config::ProjectConfig;

use super::AnalyseInfo;
use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::registry::HookRegistry;

/// Module the generated entry imports its environment setters from.
pub const ENV_RUNTIME_MODULE: &str = "tessel/env";

/// Name the production entry hook is registered under.
pub const PROD_ENTRY_HOOK: &str = "prod-entry";

/// The header and body of a generated entry, edited by entry hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryBuilder {
    header: String,
    body: String,
}

impl EntryBuilder {
    pub fn new(header: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            body: body.into(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn pipe_header(&mut self, f: impl FnOnce(String) -> String) -> &mut Self {
        self.header = f(std::mem::take(&mut self.header));
        self
    }

    pub fn pipe_body(&mut self, f: impl FnOnce(String) -> String) -> &mut Self {
        self.body = f(std::mem::take(&mut self.body));
        self
    }

    /// The entry source: header first, then body.
    pub fn render(&self) -> String {
        format!("{}\n\n{}\n", self.header.trim_end(), self.body.trim_end())
    }
}

/// What an entry hook may look at.
#[derive(Debug, Clone, Copy)]
pub struct EntryHookContext<'a> {
    pub project_root: &'a Path,
    pub env: &'a str,
    pub config: &'a ProjectConfig,
    pub info: &'a AnalyseInfo,
}

/// Run every registered entry hook over `entry`, in registration order.
pub fn decorate_entry(ctx: &BuildContext, info: &AnalyseInfo, entry: &mut EntryBuilder) -> Result<()> {
    let hook_ctx = EntryHookContext {
        project_root: ctx.project_root(),
        env: ctx.env(),
        config: ctx.config(),
        info,
    };
    for hook in ctx.hooks().entry_hooks() {
        tracing::debug!(hook = hook.name(), "decorating entry");
        hook.decorate(&hook_ctx, entry).map_err(|e| BuildError::Pipeline {
            hook: hook.name().to_string(),
            message: format!("{e:#}"),
        })?;
    }
    Ok(())
}

/// Register the hook flagging production entries.
///
/// In the `prod` environment it appends `setEnvProd()` to the header and, when
/// the project declares a custom environment, `setCustomEnv(<json>)` to the body.
pub fn register_prod_entry_hook(registry: &mut HookRegistry) -> &mut HookRegistry {
    registry.add_entry_hook(PROD_ENTRY_HOOK, |ctx: &EntryHookContext<'_>, entry: &mut EntryBuilder| {
        if ctx.env != "prod" {
            return Ok(());
        }

        entry.pipe_header(|header| format!("{header}\nsetEnvProd();"));

        if let Some(custom_env) = &ctx.config.custom_env {
            let json = serde_json::to_string(custom_env)?;
            entry.pipe_body(|body| format!("{body}\nsetCustomEnv({json});"));
        }
        Ok(())
    })
}
