//! Script compiler options and the mutator pipeline that produces them.

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::registry::OptionMutator;
use crate::rewrite::ImportRewriter;
use crate::targets::BuildTarget;

/// Name of the compiler plugin that applies the [`ImportRewriter`].
pub const IMPORT_REWRITE_PLUGIN: &str = "import-rewrite";

/// Module system of emitted scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleSystem {
    #[default]
    CommonJs,
    EsModule,
}

/// Language level of emitted scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptTarget {
    Es5,
    #[default]
    Es2015,
}

/// Options handed to the script compiler for one target.
///
/// Values are immutable once folded; every mutator receives and returns an
/// owned value.
#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    pub module_system: ModuleSystem,
    pub target: ScriptTarget,
    /// Emit inline source maps
    pub source_maps: bool,
    /// Compiler plugins, by name, in application order
    pub plugins: Vec<String>,
    pub rewriter: ImportRewriter,
}

impl ScriptOptions {
    /// Base options for `target` before any registered mutator runs.
    pub fn for_target(ctx: &BuildContext, target: &BuildTarget) -> Result<Self> {
        let config = ctx.config();
        let mut plugins = Vec::new();
        let mut rewriter = ImportRewriter::identity();

        if target.kind.rewrites_imports() {
            if config.css_extract {
                rewriter = rewriter
                    .with_style_rewrite(&config.style_extension, &config.compiled_style_extension)?;
            }
            if target.resolve_packages {
                rewriter = rewriter.with_packages(ctx.packages().to_vec(), &config.source_dir);
            }
            plugins.push(IMPORT_REWRITE_PLUGIN.to_string());
        }

        Ok(Self {
            module_system: target.kind.module_system(),
            target: target.kind.script_target(),
            source_maps: ctx.is_development(),
            plugins,
            rewriter,
        })
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p == name)
    }
}

/// Fold `mutators` over `base` in registration order.
///
/// `[f, g]` yields `g(f(base))`. The first failing mutator aborts the fold.
pub fn build_options(base: ScriptOptions, mutators: &[OptionMutator]) -> Result<ScriptOptions> {
    mutators.iter().try_fold(base, |options, mutator| {
        mutator.call(options).map_err(|e| BuildError::Pipeline {
            hook: mutator.name().to_string(),
            message: format!("{e:#}"),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HookRegistry;
    use crate::targets::{TargetKind, TargetLayout};
    use tessel_config::{PackageInfo, ProjectConfig};

    #[test]
    fn mutators_apply_left_to_right() {
        let mut registry = HookRegistry::new();
        registry
            .add_option_mutator("f", |mut o: ScriptOptions| {
                o.plugins.push("f".into());
                Ok(o)
            })
            .add_option_mutator("g", |mut o: ScriptOptions| {
                o.plugins.push("g".into());
                Ok(o)
            });
        let hooks = registry.freeze();

        let folded = build_options(ScriptOptions::default(), hooks.option_mutators()).unwrap();
        assert_eq!(folded.plugins, ["f", "g"]);
    }

    #[test]
    fn later_mutators_override_earlier_ones() {
        let mut registry = HookRegistry::new();
        registry
            .add_option_mutator("maps-on", |mut o: ScriptOptions| {
                o.source_maps = true;
                Ok(o)
            })
            .add_option_mutator("maps-off", |mut o: ScriptOptions| {
                o.source_maps = false;
                Ok(o)
            });
        let hooks = registry.freeze();

        let folded = build_options(ScriptOptions::default(), hooks.option_mutators()).unwrap();
        assert!(!folded.source_maps);
    }

    #[test]
    fn failing_mutator_aborts_with_its_name() {
        let mut registry = HookRegistry::new();
        registry
            .add_option_mutator("broken", |_: ScriptOptions| anyhow::bail!("bad preset"))
            .add_option_mutator("never", |_: ScriptOptions| panic!("must not run"));
        let hooks = registry.freeze();

        let err = build_options(ScriptOptions::default(), hooks.option_mutators()).unwrap_err();
        match err {
            BuildError::Pipeline { hook, message } => {
                assert_eq!(hook, "broken");
                assert!(message.contains("bad preset"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn base_options_follow_the_target() {
        let config = ProjectConfig {
            css_extract: true,
            ..ProjectConfig::default()
        };
        let ctx = BuildContext::builder("/pkgs", config)
            .packages(vec![PackageInfo::new("ui", "/pkgs/ui")])
            .build_unchecked();
        let layout = TargetLayout::resolve(&ctx, None, true);

        let main = ScriptOptions::for_target(&ctx, layout.get(TargetKind::Main).unwrap()).unwrap();
        assert_eq!(main.module_system, ModuleSystem::CommonJs);
        assert!(main.has_plugin(IMPORT_REWRITE_PLUGIN));
        assert!(main.rewriter.rewrites_styles());
        assert!(main.rewriter.resolves_packages());

        let esm5 = ScriptOptions::for_target(&ctx, layout.get(TargetKind::Esm5).unwrap()).unwrap();
        assert_eq!(esm5.module_system, ModuleSystem::EsModule);
        assert_eq!(esm5.target, ScriptTarget::Es5);
        assert!(esm5.plugins.is_empty());
        assert!(!esm5.rewriter.rewrites_styles());
    }

    #[test]
    fn source_maps_only_in_development() {
        let ctx = BuildContext::builder("/p", ProjectConfig::default())
            .mode(crate::context::BuildMode::Production)
            .build_unchecked();
        let layout = TargetLayout::resolve(&ctx, None, false);
        let main = ScriptOptions::for_target(&ctx, &layout.targets()[0]).unwrap();
        assert!(!main.source_maps);
    }
}
