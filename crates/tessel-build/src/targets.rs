//! Output targets and where they live on disk.
//!
//! The default layout is `<dist>/<package?>/{main,module,esm5}`. Material
//! component projects instead emit `<sourceRoot>/{lib,es}` and have no
//! down-levelled target.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tessel_config::PackageInfo;

use crate::context::BuildContext;
use crate::options::{ModuleSystem, ScriptTarget};

/// One compiled output variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Main,
    Module,
    Esm5,
    Lib,
    Es,
}

impl TargetKind {
    /// Directory name of the target below its layout root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Module => "module",
            Self::Esm5 => "esm5",
            Self::Lib => "lib",
            Self::Es => "es",
        }
    }

    pub fn module_system(self) -> ModuleSystem {
        match self {
            Self::Main | Self::Lib => ModuleSystem::CommonJs,
            Self::Module | Self::Es | Self::Esm5 => ModuleSystem::EsModule,
        }
    }

    pub fn script_target(self) -> ScriptTarget {
        match self {
            Self::Esm5 => ScriptTarget::Es5,
            _ => ScriptTarget::Es2015,
        }
    }

    /// The down-levelled target ships raw style sources instead of compiled ones.
    pub fn carries_style_sources(self) -> bool {
        matches!(self, Self::Esm5)
    }

    pub fn compiles_styles(self) -> bool {
        !self.carries_style_sources()
    }

    /// Whether scripts of this target are compiled with the import rewriter.
    pub fn rewrites_imports(self) -> bool {
        !self.carries_style_sources()
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A target with its resolved output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub kind: TargetKind,
    pub out_dir: PathBuf,
    /// Rewrite local package names to relative source paths
    pub resolve_packages: bool,
}

/// The set of targets for one build invocation, in launch order.
#[derive(Debug, Clone)]
pub struct TargetLayout {
    targets: Vec<BuildTarget>,
}

impl TargetLayout {
    /// Resolve the layout for a whole-project or single-package build.
    pub fn resolve(ctx: &BuildContext, package: Option<&PackageInfo>, whole_project: bool) -> Self {
        let config = ctx.config();

        let (root, kinds): (PathBuf, &[TargetKind]) = if config.material_component {
            let root = package
                .map(|p| p.root_path.clone())
                .unwrap_or_else(|| ctx.source_root());
            (root, &[TargetKind::Lib, TargetKind::Es])
        } else {
            let mut root = ctx.dist_root();
            if let Some(package) = package {
                root.push(&package.name);
            }
            (root, &[TargetKind::Main, TargetKind::Module, TargetKind::Esm5])
        };

        let targets = kinds
            .iter()
            .map(|&kind| BuildTarget {
                kind,
                out_dir: root.join(kind.dir_name()),
                resolve_packages: whole_project && kind.rewrites_imports(),
            })
            .collect();

        Self { targets }
    }

    pub fn targets(&self) -> &[BuildTarget] {
        &self.targets
    }

    pub fn get(&self, kind: TargetKind) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| t.kind == kind)
    }

    /// The two targets that receive component stylesheets: the first gets the
    /// bundler output, the second a copy of it.
    pub fn component_style_dirs(&self) -> Option<(PathBuf, PathBuf)> {
        match self.targets.as_slice() {
            [first, second, ..] => Some((first.out_dir.clone(), second.out_dir.clone())),
            _ => None,
        }
    }
}
