use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rolldown::{BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem, OutputFormat};
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext,
    __inner::SharedPluginable,
};

use super::{ComponentBundleRequest, ComponentBundler, StyleCompiler, StyleInput};
use crate::error::{BuildError, Result};
use crate::output::write_bundle;

/// [`ComponentBundler`] running one Rolldown production pass over all entries.
///
/// Stylesheet sources imported by the components are compiled through the
/// configured [`StyleCompiler`] and bundled as CSS, so every entry yields a
/// `<name>.js` and a `<name>.css`.
#[derive(Clone)]
pub struct RolldownComponentBundler {
    style: Arc<dyn StyleCompiler>,
}

impl RolldownComponentBundler {
    pub fn new(style: Arc<dyn StyleCompiler>) -> Self {
        Self { style }
    }
}

#[async_trait]
impl ComponentBundler for RolldownComponentBundler {
    async fn bundle(&self, request: ComponentBundleRequest<'_>) -> Result<Vec<PathBuf>> {
        let options = BundlerOptions {
            input: Some(
                request
                    .entries
                    .iter()
                    .map(|(name, path)| InputItem {
                        name: Some(name.clone()),
                        import: path.to_string_lossy().to_string(),
                    })
                    .collect(),
            ),
            cwd: Some(request.project_root.to_path_buf()),
            format: Some(OutputFormat::Esm),
            minify: Some(rolldown::RawMinifyOptions::from(true)),
            ..Default::default()
        };

        let plugin: SharedPluginable = Arc::new(StyleLoadPlugin {
            style: Arc::clone(&self.style),
            extension: format!(".{}", request.style_extension),
            include_paths: request.include_paths.to_vec(),
        });

        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(options)
            .with_plugins(vec![plugin])
            .build()
            .map_err(|e| BuildError::from_rolldown_batch(&e))?;

        let output = bundler
            .generate()
            .await
            .map_err(|e| BuildError::from_rolldown_batch(&e))?;

        let written = write_bundle(&output, request.out_dir).await?;
        tracing::debug!(files = written.len(), "component bundle written");
        Ok(written.into_iter().map(|f| PathBuf::from(f.name)).collect())
    }
}

/// Compiles stylesheet sources on load and hands them to Rolldown as CSS.
#[derive(Clone)]
struct StyleLoadPlugin {
    style: Arc<dyn StyleCompiler>,
    extension: String,
    include_paths: Vec<PathBuf>,
}

impl std::fmt::Debug for StyleLoadPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyleLoadPlugin")
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

impl Plugin for StyleLoadPlugin {
    fn name(&self) -> Cow<'static, str> {
        "tessel-component-styles".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Load
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let style = Arc::clone(&self.style);
        let extension = self.extension.clone();
        let include_paths = self.include_paths.clone();

        async move {
            if !id.ends_with(&extension) {
                return Ok(None);
            }

            let css = style
                .compile(StyleInput {
                    path: Path::new(&id),
                    include_paths: &include_paths,
                })
                .await?;

            Ok(Some(HookLoadOutput {
                code: css.into(),
                module_type: Some(ModuleType::Css),
                ..Default::default()
            }))
        }
    }
}
