//! Import specifier rewriting applied while compiling scripts.
//!
//! Two rules, first match wins:
//!
//! 1. With style extraction enabled, a specifier naming a stylesheet source
//!    (`./button.scss`, or a sub-path form such as `theme.scss/dark`) has its
//!    extension replaced by the compiled extension.
//! 2. With package resolution enabled, a specifier equal to the name of a local
//!    package is replaced by the relative path to that package's source root.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;
use regex::Regex;
use tessel_config::PackageInfo;

use crate::error::{BuildError, Result};

/// One import statement observed during script compilation.
#[derive(Debug, Clone, Copy)]
pub struct ImportRecord<'a> {
    /// Raw specifier text
    pub specifier: &'a str,
    /// File containing the import
    pub importer: &'a Path,
}

/// Rewrites import specifiers for one build target.
///
/// Cheap to clone; the package table is shared.
#[derive(Debug, Clone, Default)]
pub struct ImportRewriter {
    style: Option<StyleRule>,
    packages: Option<PackageRule>,
}

#[derive(Debug, Clone)]
struct StyleRule {
    pattern: Regex,
    compiled_extension: String,
}

#[derive(Debug, Clone)]
struct PackageRule {
    packages: Arc<[PackageInfo]>,
    source_dir: PathBuf,
}

impl ImportRewriter {
    /// A rewriter that returns every specifier unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Enable the stylesheet rule: `*.{source}` becomes `*.{compiled}`.
    pub fn with_style_rewrite(mut self, source: &str, compiled: &str) -> Result<Self> {
        // One pattern covers `foo.scss` and `foo.scss/sub/path`.
        let pattern = Regex::new(&format!(
            r"^(?P<stem>.+?)\.{}(?P<rest>/.*)?$",
            regex::escape(source)
        ))
        .map_err(|e| BuildError::Configuration(format!("invalid style extension '{source}': {e}")))?;

        self.style = Some(StyleRule {
            pattern,
            compiled_extension: compiled.to_string(),
        });
        Ok(self)
    }

    /// Enable the package rule against the given local packages.
    ///
    /// `source_dir` is the source subdirectory of every package (usually `src`).
    pub fn with_packages(mut self, packages: Vec<PackageInfo>, source_dir: impl Into<PathBuf>) -> Self {
        self.packages = Some(PackageRule {
            packages: packages.into(),
            source_dir: source_dir.into(),
        });
        self
    }

    pub fn rewrites_styles(&self) -> bool {
        self.style.is_some()
    }

    pub fn resolves_packages(&self) -> bool {
        self.packages.is_some()
    }

    /// Rewrite one import record.
    pub fn rewrite(&self, record: &ImportRecord<'_>) -> String {
        self.rewrite_import(record.specifier, record.importer)
    }

    /// Rewrite `specifier` as imported from `importer`.
    pub fn rewrite_import(&self, specifier: &str, importer: &Path) -> String {
        if let Some(style) = &self.style {
            if let Some(caps) = style.pattern.captures(specifier) {
                let rest = caps.name("rest").map_or("", |m| m.as_str());
                return format!("{}.{}{}", &caps["stem"], style.compiled_extension, rest);
            }
        }

        if let Some(rule) = &self.packages {
            if let Some(package) = rule.packages.iter().find(|p| p.name == specifier) {
                let from = importer.parent().unwrap_or(importer);
                let to = package.source_root(&rule.source_dir);
                return relative_specifier(from, &to);
            }
        }

        specifier.to_string()
    }
}

/// Relative import specifier from directory `from` to `to`.
///
/// Always starts with `./` or `../` so it is never mistaken for a bare
/// package name.
pub(crate) fn relative_specifier(from: &Path, to: &Path) -> String {
    let relative = relative_path(&from.clean(), &to.clean());
    let text = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    if text.is_empty() {
        ".".to_string()
    } else if text.starts_with("..") {
        text
    } else {
        format!("./{text}")
    }
}

fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to[common..] {
        out.push(component.as_os_str());
    }
    out
}
