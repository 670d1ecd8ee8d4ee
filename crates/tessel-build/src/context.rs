//! The immutable context every build component receives.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tessel_config::{PackageInfo, ProjectConfig, discover_packages};

use crate::compilers::Engines;
use crate::error::{BuildError, Result};
use crate::registry::Hooks;

/// Default quiet period before a watch pass runs.
pub const DEFAULT_WATCH_DEBOUNCE: Duration = Duration::from_millis(100);

/// Development or production build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

/// Which sources the invocation was started for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectedSource {
    /// The project root itself
    #[default]
    Root,
    /// One local package, by name
    Package(String),
}

impl SelectedSource {
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }
}

/// Everything a build reads, threaded explicitly into every stream.
///
/// Built once per invocation with [`BuildContext::builder`] and never mutated.
#[derive(Clone)]
pub struct BuildContext {
    project_root: PathBuf,
    config: ProjectConfig,
    mode: BuildMode,
    env: String,
    selected: SelectedSource,
    packages: Vec<PackageInfo>,
    hooks: Arc<Hooks>,
    engines: Engines,
    watch_debounce: Duration,
}

impl BuildContext {
    pub fn builder(project_root: impl Into<PathBuf>, config: ProjectConfig) -> BuildContextBuilder {
        BuildContextBuilder {
            project_root: project_root.into(),
            config,
            mode: BuildMode::default(),
            env: "dev".to_string(),
            selected: SelectedSource::default(),
            packages: None,
            hooks: None,
            engines: None,
            watch_debounce: DEFAULT_WATCH_DEBOUNCE,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn is_development(&self) -> bool {
        self.mode == BuildMode::Development
    }

    /// Environment name, e.g. `dev` or `prod`.
    pub fn env(&self) -> &str {
        &self.env
    }

    pub fn selected_source(&self) -> &SelectedSource {
        &self.selected
    }

    /// Local packages known to the project.
    pub fn packages(&self) -> &[PackageInfo] {
        &self.packages
    }

    pub fn package(&self, name: &str) -> Option<&PackageInfo> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn hooks(&self) -> &Arc<Hooks> {
        &self.hooks
    }

    pub fn engines(&self) -> &Engines {
        &self.engines
    }

    pub fn watch_debounce(&self) -> Duration {
        self.watch_debounce
    }

    /// Root of the selected sources: the project, or the selected package.
    pub fn source_root(&self) -> PathBuf {
        match &self.selected {
            SelectedSource::Package(name) => self
                .package(name)
                .map(|p| p.root_path.clone())
                .unwrap_or_else(|| self.project_root.clone()),
            SelectedSource::Root => self.project_root.clone(),
        }
    }

    pub fn dist_root(&self) -> PathBuf {
        self.config.dist_root(&self.project_root)
    }

    pub fn temp_root(&self) -> PathBuf {
        self.config.temp_root(&self.project_root)
    }

    /// Directory stylesheet imports are resolved against.
    pub fn dependency_dir(&self) -> PathBuf {
        self.project_root.join("node_modules")
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("project_root", &self.project_root)
            .field("mode", &self.mode)
            .field("env", &self.env)
            .field("selected", &self.selected)
            .field("packages", &self.packages.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`BuildContext`].
pub struct BuildContextBuilder {
    project_root: PathBuf,
    config: ProjectConfig,
    mode: BuildMode,
    env: String,
    selected: SelectedSource,
    packages: Option<Vec<PackageInfo>>,
    hooks: Option<Arc<Hooks>>,
    engines: Option<Engines>,
    watch_debounce: Duration,
}

impl BuildContextBuilder {
    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = env.into();
        self
    }

    pub fn selected_source(mut self, selected: SelectedSource) -> Self {
        self.selected = selected;
        self
    }

    /// Use these packages instead of scanning the packages directory.
    pub fn packages(mut self, packages: Vec<PackageInfo>) -> Self {
        self.packages = Some(packages);
        self
    }

    pub fn hooks(mut self, hooks: Arc<Hooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn engines(mut self, engines: Engines) -> Self {
        self.engines = Some(engines);
        self
    }

    pub fn watch_debounce(mut self, debounce: Duration) -> Self {
        self.watch_debounce = debounce;
        self
    }

    /// Validate the configuration, discover packages and build the context.
    ///
    /// # Errors
    ///
    /// Fails before any stream starts when the configuration is invalid or
    /// names a package that does not exist.
    pub fn build(mut self) -> Result<BuildContext> {
        self.config.validate(&self.project_root)?;

        if self.packages.is_none() {
            let packages_root = self.config.packages_root(&self.project_root);
            self.packages = Some(discover_packages(&packages_root)?);
        }

        if let SelectedSource::Package(name) = &self.selected {
            let known = self.packages.iter().flatten().any(|p| &p.name == name);
            if !known {
                return Err(BuildError::Configuration(format!(
                    "package '{name}' was not found under {}",
                    self.config.packages_root(&self.project_root).display()
                )));
            }
        }

        Ok(self.build_unchecked())
    }

    /// Build without validation or package discovery.
    pub fn build_unchecked(self) -> BuildContext {
        BuildContext {
            project_root: self.project_root,
            config: self.config,
            mode: self.mode,
            env: self.env,
            selected: self.selected,
            packages: self.packages.unwrap_or_default(),
            hooks: self.hooks.unwrap_or_else(Hooks::empty),
            engines: self.engines.unwrap_or_default(),
            watch_debounce: self.watch_debounce,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn source_root_follows_selection() {
        let ctx = BuildContext::builder("/p", ProjectConfig::default())
            .packages(vec![PackageInfo::new("ui", "/p/packages/ui")])
            .selected_source(SelectedSource::Package("ui".into()))
            .build_unchecked();
        assert_eq!(ctx.source_root(), PathBuf::from("/p/packages/ui"));
        assert_eq!(ctx.dist_root(), PathBuf::from("/p/dist"));
        assert_eq!(ctx.dependency_dir(), PathBuf::from("/p/node_modules"));
    }

    #[test]
    fn unknown_package_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        let err = BuildContext::builder(dir.path(), ProjectConfig::default())
            .packages(Vec::new())
            .selected_source(SelectedSource::Package("ghost".into()))
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn build_discovers_packages() {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("packages/ui");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("package.json"), r#"{ "name": "ui" }"#).unwrap();

        let ctx = BuildContext::builder(dir.path(), ProjectConfig::default())
            .build()
            .unwrap();
        assert_eq!(ctx.packages().len(), 1);
        assert_eq!(ctx.packages()[0].name, "ui");
    }

    #[test]
    fn defaults_to_development() {
        let ctx = BuildContext::builder("/p", ProjectConfig::default()).build_unchecked();
        assert!(ctx.is_development());
        assert_eq!(ctx.env(), "dev");
        assert!(ctx.selected_source().is_root());
    }
}
