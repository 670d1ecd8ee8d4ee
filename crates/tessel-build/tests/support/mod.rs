//! Fake engines and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use tessel_build::compilers::{
    CompiledScript, ComponentBundleRequest, ComponentBundler, Engines, ScriptCompiler, ScriptInput,
    StyleCompiler, StyleInput,
};
use tessel_build::{BuildError, ModuleSystem, Result, ScriptOptions};

/// Records every compiled script and echoes its source with a marker line.
#[derive(Default)]
pub struct RecordingScriptCompiler {
    pub calls: Mutex<Vec<(PathBuf, ModuleSystem)>>,
    /// File name that fails to compile
    pub fail_on: Option<String>,
}

impl RecordingScriptCompiler {
    pub fn failing_on(name: &str) -> Self {
        Self {
            fail_on: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn compiled(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.calls.lock().iter().map(|(p, _)| p.clone()).collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ScriptCompiler for RecordingScriptCompiler {
    async fn compile(&self, input: ScriptInput<'_>, options: &ScriptOptions) -> Result<CompiledScript> {
        self.calls
            .lock()
            .push((input.relative.to_path_buf(), options.module_system));

        let name = input.path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if self.fail_on.as_deref() == Some(name) {
            return Err(BuildError::compilation(input.path, "unexpected token"));
        }

        Ok(CompiledScript {
            code: format!("// {:?}\n{}", options.module_system, input.source),
        })
    }
}

/// Returns stylesheet sources unchanged; they must already be valid CSS.
#[derive(Default)]
pub struct PassthroughStyleCompiler {
    pub calls: Mutex<Vec<PathBuf>>,
    pub fail_on: Option<String>,
}

impl PassthroughStyleCompiler {
    pub fn failing_on(name: &str) -> Self {
        Self {
            fail_on: Some(name.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl StyleCompiler for PassthroughStyleCompiler {
    async fn compile(&self, input: StyleInput<'_>) -> Result<String> {
        self.calls.lock().push(input.path.to_path_buf());
        let name = input.path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if self.fail_on.as_deref() == Some(name) {
            return Err(BuildError::compilation(input.path, "undefined variable"));
        }
        tokio::fs::read_to_string(input.path)
            .await
            .map_err(|e| BuildError::fs(input.path, e))
    }
}

/// Writes what a real bundler would: a script and a stylesheet per entry,
/// plus a shared chunk and an asset directory.
#[derive(Default)]
pub struct ScriptedComponentBundler {
    pub passes: Mutex<usize>,
    pub fail: bool,
    /// Entries that get no stylesheet
    pub without_css: Vec<String>,
}

#[async_trait]
impl ComponentBundler for ScriptedComponentBundler {
    async fn bundle(&self, request: ComponentBundleRequest<'_>) -> Result<Vec<PathBuf>> {
        *self.passes.lock() += 1;
        if self.fail {
            return Err(BuildError::Bundler("entry could not be resolved".to_string()));
        }

        let mut written = Vec::new();
        let mut write = |name: String, content: &str| {
            let path = request.out_dir.join(&name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            written.push(PathBuf::from(name));
        };
        for (name, _) in request.entries {
            write(format!("{name}.js"), "export default 1;");
            if !self.without_css.contains(name) {
                write(format!("{name}.css"), ".root{color:red}");
            }
        }
        write("chunk-shared.js".to_string(), "export const x = 1;");
        write("assets/logo.png".to_string(), "png");
        Ok(written)
    }
}

/// A temporary project with fake engines wired in.
pub struct Fixture {
    pub dir: TempDir,
    pub scripts: Arc<RecordingScriptCompiler>,
    pub styles: Arc<PassthroughStyleCompiler>,
    pub components: Arc<ScriptedComponentBundler>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_engines(
            RecordingScriptCompiler::default(),
            PassthroughStyleCompiler::default(),
            ScriptedComponentBundler::default(),
        )
    }

    pub fn with_engines(
        scripts: RecordingScriptCompiler,
        styles: PassthroughStyleCompiler,
        components: ScriptedComponentBundler,
    ) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            scripts: Arc::new(scripts),
            styles: Arc::new(styles),
            components: Arc::new(components),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root().join(rel).exists()
    }

    pub fn engines(&self) -> Engines {
        Engines::new(
            Arc::clone(&self.scripts) as _,
            Arc::clone(&self.styles) as _,
            Arc::clone(&self.components) as _,
        )
    }

    /// Sorted file names directly inside `rel`.
    pub fn list(&self, rel: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.root().join(rel))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}
