//! Per-file script compilation through Rolldown.
//!
//! Every file is compiled on its own: the entry is served from memory and
//! every import is kept external, after passing through the
//! [`ImportRewriter`]. The result is a transpiled copy of the file, not a
//! bundle.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rolldown::{BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem, OutputFormat, SourceMapType};
use rolldown_common::{ModuleType, Output, ResolvedExternal};
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext, __inner::SharedPluginable,
};

use super::{CompiledScript, ScriptCompiler, ScriptInput};
use crate::error::{BuildError, Result};
use crate::options::{IMPORT_REWRITE_PLUGIN, ModuleSystem, ScriptOptions};
use crate::rewrite::ImportRewriter;

/// [`ScriptCompiler`] backed by Rolldown.
#[derive(Debug, Clone, Default)]
pub struct RolldownScriptCompiler;

impl RolldownScriptCompiler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScriptCompiler for RolldownScriptCompiler {
    async fn compile(&self, input: ScriptInput<'_>, options: &ScriptOptions) -> Result<CompiledScript> {
        let entry = input.path.to_string_lossy().to_string();

        for plugin in options.plugins.iter().filter(|p| *p != IMPORT_REWRITE_PLUGIN) {
            tracing::debug!(plugin = %plugin, "rolldown compiler ignores unknown plugin");
        }
        let rewriter = if options.has_plugin(IMPORT_REWRITE_PLUGIN) {
            options.rewriter.clone()
        } else {
            ImportRewriter::identity()
        };

        let bundler_options = BundlerOptions {
            input: Some(vec![InputItem {
                name: input
                    .path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string()),
                import: entry.clone(),
            }]),
            cwd: input.path.parent().map(Path::to_path_buf),
            format: Some(match options.module_system {
                ModuleSystem::CommonJs => OutputFormat::Cjs,
                ModuleSystem::EsModule => OutputFormat::Esm,
            }),
            sourcemap: options.source_maps.then_some(SourceMapType::Inline),
            ..Default::default()
        };

        let plugin: SharedPluginable = Arc::new(ImportRewritePlugin::new(
            rewriter,
            entry,
            input.source.to_string(),
        ));

        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(bundler_options)
            .with_plugins(vec![plugin])
            .build()
            .map_err(|e| BuildError::compilation(input.path, format!("{e:?}")))?;

        let output = bundler
            .generate()
            .await
            .map_err(|e| BuildError::compilation(input.path, format!("{e:?}")))?;

        output
            .assets
            .iter()
            .find_map(|item| match item {
                Output::Chunk(chunk) if chunk.is_entry => Some(CompiledScript {
                    code: chunk.code.clone(),
                }),
                _ => None,
            })
            .ok_or_else(|| BuildError::compilation(input.path, "compiler produced no output"))
    }
}

/// Serves the entry source and keeps every import external, rewritten.
#[derive(Debug, Clone)]
pub struct ImportRewritePlugin {
    rewriter: ImportRewriter,
    entry: String,
    source: Arc<str>,
}

impl ImportRewritePlugin {
    pub fn new(rewriter: ImportRewriter, entry: String, source: String) -> Self {
        Self {
            rewriter,
            entry,
            source: source.into(),
        }
    }
}

impl Plugin for ImportRewritePlugin {
    fn name(&self) -> Cow<'static, str> {
        "tessel-import-rewrite".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let importer = args.importer.map(str::to_string);
        let rewriter = self.rewriter.clone();
        let entry = self.entry.clone();

        async move {
            let Some(importer) = importer else {
                return Ok(Some(HookResolveIdOutput {
                    id: entry.into(),
                    external: Some(ResolvedExternal::Bool(false)),
                    ..Default::default()
                }));
            };

            let rewritten = rewriter.rewrite_import(&specifier, Path::new(&importer));
            if rewritten != specifier {
                tracing::trace!(from = %specifier, to = %rewritten, "rewrote import");
            }
            Ok(Some(HookResolveIdOutput {
                id: rewritten.into(),
                external: Some(ResolvedExternal::Bool(true)),
                ..Default::default()
            }))
        }
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let entry = self.entry.clone();
        let source = Arc::clone(&self.source);

        async move {
            if id != entry {
                return Ok(None);
            }
            Ok(Some(HookLoadOutput {
                code: source.to_string().into(),
                module_type: Some(infer_module_type(&id)),
                ..Default::default()
            }))
        }
    }
}

fn infer_module_type(path: &str) -> ModuleType {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("tsx") => ModuleType::Tsx,
        Some("ts") | Some("mts") | Some("cts") => ModuleType::Ts,
        Some("jsx") => ModuleType::Jsx,
        _ => ModuleType::Js,
    }
}
