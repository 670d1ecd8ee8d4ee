//! File selection for the streams.
//!
//! A [`FileSet`] is a list of root directories, a base directory that output
//! paths are made relative to, and the extensions the owning stream consumes.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::targets::TargetKind;

/// Script sources compiled by the script stream.
pub const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx"];

/// Static assets copied verbatim by the resource mover.
pub const RESOURCE_EXTENSIONS: &[&str] = &[
    "js", "png", "jpg", "jpeg", "gif", "woff", "woff2", "eot", "ttf", "svg",
];

/// Raw stylesheet sources carried along by the down-levelled target.
pub const STYLE_SOURCE_EXTENSIONS: &[&str] = &["css", "scss", "less"];

const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// Where a stream looks for its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceScope {
    /// The project source directory and every package
    WholeProject,
    /// The source directory below one root
    Scoped(PathBuf),
}

impl SourceScope {
    /// Scope of a script stream.
    ///
    /// `source_path` is the root of the package being built; without one the
    /// project root is used.
    pub fn for_scripts(whole_project: bool, source_path: Option<&Path>, ctx: &BuildContext) -> Self {
        if whole_project {
            Self::WholeProject
        } else {
            Self::Scoped(
                source_path
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| ctx.project_root().to_path_buf()),
            )
        }
    }

    /// Scope of a stylesheet stream.
    ///
    /// Extraction from the root aggregates every package's styles, so it
    /// widens to the whole project.
    pub fn for_styles(whole_project: bool, source_path: Option<&Path>, ctx: &BuildContext) -> Self {
        let extracting_root = ctx.selected_source().is_root() && ctx.config().css_extract;
        Self::for_scripts(whole_project || extracting_root, source_path, ctx)
    }

    /// Scope of the resource mover; `scope_override` replaces the selected
    /// source when deciding whether extraction widens the scope.
    pub fn for_resources(
        whole_project: bool,
        source_path: Option<&Path>,
        scope_override: Option<&str>,
        ctx: &BuildContext,
    ) -> Self {
        let selected_root = match scope_override {
            Some(_) => false,
            None => ctx.selected_source().is_root(),
        };
        let extracting_root = selected_root && ctx.config().css_extract;
        Self::for_scripts(whole_project || extracting_root, source_path, ctx)
    }
}

/// A concrete selection of files on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSet {
    base: PathBuf,
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
    /// Output directories that may live below a root
    excluded: Vec<PathBuf>,
}

/// A selected file with its path relative to the set's base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub relative: PathBuf,
}

impl FileSet {
    pub fn new<S: AsRef<str>>(scope: &SourceScope, ctx: &BuildContext, extensions: &[S]) -> Self {
        let config = ctx.config();
        let (base, roots) = match scope {
            SourceScope::WholeProject => {
                let root = ctx.project_root().to_path_buf();
                let roots = vec![
                    config.source_root(&root),
                    config.packages_root(&root),
                ];
                (root, roots)
            }
            SourceScope::Scoped(source_path) => {
                let src = source_path.join(&config.source_dir);
                (src.clone(), vec![src])
            }
        };

        Self {
            base,
            roots,
            extensions: extensions
                .iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            excluded: output_dirs(ctx),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether `path` belongs to this set (used to filter watch events).
    pub fn matches(&self, path: &Path) -> bool {
        self.has_extension(path)
            && self.roots.iter().any(|root| path.starts_with(root))
            && !self.is_excluded(path)
            && !path
                .components()
                .any(|c| c.as_os_str().to_str().is_some_and(|name| SKIPPED_DIRS.contains(&name)))
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.iter().any(|dir| path.starts_with(dir))
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Make `path` relative to the base, if it lives below it.
    pub fn relativize(&self, path: &Path) -> Option<SourceFile> {
        path.strip_prefix(&self.base).ok().map(|relative| SourceFile {
            path: path.to_path_buf(),
            relative: relative.to_path_buf(),
        })
    }

    /// List every matching file, sorted by relative path.
    ///
    /// Missing roots are skipped; `node_modules` and hidden directories are
    /// never entered.
    pub fn collect(&self) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();
        for root in self.roots.iter().filter(|r| r.is_dir()) {
            let walker = WalkDir::new(root)
                .follow_links(true)
                .into_iter()
                .filter_entry(|entry| {
                    entry.depth() == 0 || !(is_skipped_dir(entry) || self.is_excluded(entry.path()))
                });
            for entry in walker {
                let entry = entry.map_err(|e| walk_error(root, e))?;
                if entry.file_type().is_file() && self.has_extension(entry.path()) {
                    if let Some(file) = self.relativize(entry.path()) {
                        files.push(file);
                    }
                }
            }
        }
        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        files.dedup_by(|a, b| a.path == b.path);
        tracing::trace!(base = %self.base.display(), count = files.len(), "collected files");
        Ok(files)
    }
}

/// Every directory a target may write to. Material component outputs sit
/// next to package sources, so they are excluded explicitly.
fn output_dirs(ctx: &BuildContext) -> Vec<PathBuf> {
    let mut dirs = vec![ctx.dist_root()];
    if ctx.config().material_component {
        let roots = std::iter::once(ctx.project_root()).chain(ctx.packages().iter().map(|p| p.root_path.as_path()));
        for root in roots {
            for kind in [TargetKind::Lib, TargetKind::Es] {
                dirs.push(root.join(kind.dir_name()));
            }
        }
    }
    dirs
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || SKIPPED_DIRS.contains(&name))
}

fn walk_error(root: &Path, err: walkdir::Error) -> BuildError {
    let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    BuildError::fs(path, source)
}

/// The input extensions a stream consumes within one target.
#[derive(Debug, Clone)]
pub struct Selector {
    pub stream: String,
    pub extensions: Vec<String>,
}

/// Reject overlapping selectors within one target.
///
/// Streams of a target write into the same directory; overlapping inputs would
/// silently overwrite each other's output.
pub fn validate_partitions(target: &str, selectors: &[Selector]) -> Result<()> {
    for (i, a) in selectors.iter().enumerate() {
        for b in &selectors[i + 1..] {
            let shared: Vec<&str> = a
                .extensions
                .iter()
                .filter(|ext| b.extensions.iter().any(|other| other.eq_ignore_ascii_case(ext)))
                .map(String::as_str)
                .collect();
            if !shared.is_empty() {
                return Err(BuildError::Configuration(format!(
                    "streams '{}' and '{}' of target '{target}' both select .{} files",
                    a.stream,
                    b.stream,
                    shared.join(", .")
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tessel_config::{PackageInfo, ProjectConfig};

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn ctx(root: &Path, config: ProjectConfig) -> BuildContext {
        BuildContext::builder(root, config).build_unchecked()
    }

    #[test]
    fn whole_project_covers_src_and_packages() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "src/index.ts");
        touch(root, "packages/ui/src/button.tsx");
        touch(root, "packages/ui/node_modules/dep/index.ts");
        touch(root, "src/.cache/x.ts");
        touch(root, "other/skip.ts");
        touch(root, "src/readme.md");

        let ctx = ctx(root, ProjectConfig::default());
        let set = FileSet::new(&SourceScope::WholeProject, &ctx, SCRIPT_EXTENSIONS);
        let rel: Vec<_> = set.collect().unwrap().into_iter().map(|f| f.relative).collect();
        assert_eq!(
            rel,
            [
                PathBuf::from("packages/ui/src/button.tsx"),
                PathBuf::from("src/index.ts"),
            ]
        );
    }

    #[test]
    fn material_outputs_next_to_packages_are_not_inputs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "packages/ui/src/icon.svg");
        touch(root, "packages/ui/lib/icon.svg");
        touch(root, "packages/ui/es/icon.svg");

        let ctx = BuildContext::builder(
            root,
            ProjectConfig {
                material_component: true,
                ..ProjectConfig::default()
            },
        )
        .packages(vec![PackageInfo::new("ui", root.join("packages/ui"))])
        .build_unchecked();
        let set = FileSet::new(&SourceScope::WholeProject, &ctx, RESOURCE_EXTENSIONS);

        let rel: Vec<_> = set.collect().unwrap().into_iter().map(|f| f.relative).collect();
        assert_eq!(rel, [PathBuf::from("packages/ui/src/icon.svg")]);
        assert!(!set.matches(&root.join("packages/ui/lib/icon.svg")));
    }

    #[test]
    fn scoped_sets_are_relative_to_the_source_dir() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "packages/ui/src/a/b.ts");
        touch(root, "packages/ui/test/c.ts");

        let ctx = ctx(root, ProjectConfig::default());
        let scope = SourceScope::for_scripts(false, Some(&root.join("packages/ui")), &ctx);
        let set = FileSet::new(&scope, &ctx, SCRIPT_EXTENSIONS);
        let files = set.collect().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, PathBuf::from("a/b.ts"));
    }

    #[test]
    fn style_scope_widens_when_extracting_from_root() {
        let ctx = ctx(
            Path::new("/p"),
            ProjectConfig {
                css_extract: true,
                ..ProjectConfig::default()
            },
        );
        let pkg = Path::new("/p/packages/ui");
        assert_eq!(SourceScope::for_styles(false, Some(pkg), &ctx), SourceScope::WholeProject);
        assert_eq!(
            SourceScope::for_scripts(false, Some(pkg), &ctx),
            SourceScope::Scoped(pkg.to_path_buf())
        );
        assert_eq!(
            SourceScope::for_resources(false, Some(pkg), Some("ui"), &ctx),
            SourceScope::Scoped(pkg.to_path_buf())
        );
        assert_eq!(
            SourceScope::for_resources(false, Some(pkg), None, &ctx),
            SourceScope::WholeProject
        );
    }

    #[test]
    fn matches_filters_watch_events() {
        let ctx = ctx(Path::new("/p"), ProjectConfig::default());
        let set = FileSet::new(&SourceScope::WholeProject, &ctx, &["scss"]);
        assert!(set.matches(Path::new("/p/src/a.scss")));
        assert!(set.matches(Path::new("/p/src/A.SCSS")));
        assert!(!set.matches(Path::new("/p/src/a.ts")));
        assert!(!set.matches(Path::new("/p/dist/a.scss")));
        assert!(!set.matches(Path::new("/p/packages/x/node_modules/a.scss")));
    }

    #[test]
    fn resources_never_overlap_compiled_inputs() {
        for ext in RESOURCE_EXTENSIONS {
            assert!(!SCRIPT_EXTENSIONS.contains(ext));
            assert!(!STYLE_SOURCE_EXTENSIONS.contains(ext));
        }
    }

    #[test]
    fn overlapping_selectors_are_rejected() {
        let script = Selector {
            stream: "script".into(),
            extensions: vec!["ts".into(), "tsx".into()],
        };
        let style = Selector {
            stream: "style".into(),
            extensions: vec!["scss".into()],
        };
        let resources = Selector {
            stream: "resources".into(),
            extensions: vec!["png".into(), "scss".into()],
        };

        validate_partitions("main", &[script.clone(), style.clone()]).unwrap();
        let err = validate_partitions("main", &[script, style, resources]).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("'style' and 'resources'"));
    }
}
