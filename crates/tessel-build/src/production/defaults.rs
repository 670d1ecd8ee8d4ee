//! Default production collaborators.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use rolldown::{
    BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem, OutputFormat, Platform,
};
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext, __inner::SharedPluginable,
};
use walkdir::WalkDir;

use super::entry::{ENV_RUNTIME_MODULE, EntryBuilder, decorate_entry};
use super::{
    AnalyseInfo, BuildStats, BundleRequest, EntryGenerator, PageInfo, ProductionBundler,
    ProjectAnalyzer, SiteGenerator,
};
use crate::context::{BuildContext, BuildMode};
use crate::error::{BuildError, Result};
use crate::output::{write_bundle, write_file};
use crate::rewrite::relative_specifier;

/// File name of the generated entry inside the temp directory.
pub const ENTRY_FILE_NAME: &str = "entry.tsx";

/// Service worker location relative to the temp directory.
pub const SERVICE_WORKER_TEMPLATE: &str = "static/sw.js";

const PAGE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];

/// Finds pages under `<src>/pages`, a layout under `<src>/layouts/index.*`
/// and a service worker at `<src>/static/sw.js`.
#[derive(Debug, Clone)]
pub struct DirectoryAnalyzer {
    pages_dir: PathBuf,
    layouts_dir: PathBuf,
}

impl Default for DirectoryAnalyzer {
    fn default() -> Self {
        Self {
            pages_dir: PathBuf::from("pages"),
            layouts_dir: PathBuf::from("layouts"),
        }
    }
}

impl DirectoryAnalyzer {
    fn find_pages(&self, pages_root: &Path) -> Result<Vec<PageInfo>> {
        if !pages_root.is_dir() {
            return Ok(Vec::new());
        }

        let mut pages = Vec::new();
        for entry in WalkDir::new(pages_root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| pages_root.to_path_buf(), Path::to_path_buf);
                BuildError::fs(path, e.into_io_error().unwrap_or_else(|| std::io::Error::other("walk failed")))
            })?;
            if !entry.file_type().is_file() || !has_extension(entry.path(), PAGE_EXTENSIONS) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(pages_root) else {
                continue;
            };
            pages.push(PageInfo {
                route: route_for(relative),
                file: entry.path().to_path_buf(),
            });
        }
        Ok(pages)
    }
}

#[async_trait]
impl ProjectAnalyzer for DirectoryAnalyzer {
    async fn analyse(&self, ctx: &BuildContext) -> Result<AnalyseInfo> {
        let src = ctx.config().source_root(ctx.project_root());
        let pages = self.find_pages(&src.join(&self.pages_dir))?;

        let layouts = src.join(&self.layouts_dir);
        let layout = PAGE_EXTENSIONS
            .iter()
            .map(|ext| layouts.join(format!("index.{ext}")))
            .find(|p| p.is_file());

        let service_worker = Some(src.join("static/sw.js")).filter(|p| p.is_file());

        tracing::debug!(
            pages = pages.len(),
            layout = layout.is_some(),
            service_worker = service_worker.is_some(),
            "project analysed"
        );
        Ok(AnalyseInfo {
            pages,
            layout,
            service_worker,
        })
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.contains(&e))
}

/// URL route of a page file relative to the pages directory.
fn route_for(relative: &Path) -> String {
    let mut segments: Vec<String> = relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.last().is_some_and(|s| s == "index") {
        segments.pop();
    }
    format!("/{}", segments.join("/"))
}

/// Writes `<temp>/entry.tsx` importing every page and the layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEntryGenerator;

impl TemplateEntryGenerator {
    fn template(temp: &Path, info: &AnalyseInfo) -> EntryBuilder {
        let import_path = |file: &Path| relative_specifier(temp, &file.with_extension(""));

        let mut header = format!("import {{ setEnvProd, setCustomEnv }} from '{ENV_RUNTIME_MODULE}';");
        for (index, page) in info.pages.iter().enumerate() {
            let _ = write!(header, "\nimport Page{index} from '{}';", import_path(&page.file));
        }
        if let Some(layout) = &info.layout {
            let _ = write!(header, "\nimport Layout from '{}';", import_path(layout));
        }

        let mut body = String::from("export const routes = [");
        for (index, page) in info.pages.iter().enumerate() {
            let _ = write!(body, "\n  {{ path: '{}', component: Page{index} }},", page.route);
        }
        body.push_str("\n];\n");
        body.push_str(if info.layout.is_some() {
            "export const layout = Layout;"
        } else {
            "export const layout = null;"
        });

        EntryBuilder::new(header, body)
    }
}

#[async_trait]
impl EntryGenerator for TemplateEntryGenerator {
    async fn create_entry(&self, ctx: &BuildContext, info: &AnalyseInfo) -> Result<PathBuf> {
        let temp = ctx.temp_root();
        let mut entry = Self::template(&temp, info);
        decorate_entry(ctx, info, &mut entry)?;

        let path = temp.join(ENTRY_FILE_NAME);
        write_file(&path, entry.render().as_bytes()).await?;
        tracing::debug!(path = %path.display(), "entry written");
        Ok(path)
    }
}

/// Bundles the entry with Rolldown, minified in production mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolldownProductionBundler;

#[async_trait]
impl ProductionBundler for RolldownProductionBundler {
    async fn bundle(&self, request: BundleRequest<'_>) -> Result<BuildStats> {
        let started = Instant::now();
        let options = BundlerOptions {
            input: Some(vec![InputItem {
                name: Some("main".to_string()),
                import: request.entry.to_string_lossy().to_string(),
            }]),
            cwd: Some(request.project_root.to_path_buf()),
            format: Some(OutputFormat::Esm),
            platform: Some(Platform::Browser),
            minify: Some(rolldown::RawMinifyOptions::from(
                request.mode == BuildMode::Production,
            )),
            ..Default::default()
        };

        let runtime: SharedPluginable = Arc::new(EnvRuntimePlugin);
        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(options)
            .with_plugins(vec![runtime])
            .build()
            .map_err(|e| BuildError::from_rolldown_batch(&e))?;

        let output = bundler
            .generate()
            .await
            .map_err(|e| BuildError::from_rolldown_batch(&e))?;

        let assets = write_bundle(&output, request.out_dir).await?;
        let stats = BuildStats {
            out_dir: request.out_dir.to_path_buf(),
            assets,
            duration: started.elapsed(),
        };
        tracing::info!(
            env = request.env,
            assets = stats.assets.len(),
            bytes = stats.total_size(),
            duration_ms = stats.duration.as_millis() as u64,
            "production bundle written"
        );
        Ok(stats)
    }
}

const ENV_RUNTIME_ID: &str = "\0tessel-env";

const ENV_RUNTIME_SOURCE: &str = "\
export function setEnvProd() { globalThis.__TESSEL_ENV__ = 'prod'; }
export function setCustomEnv(env) { globalThis.__TESSEL_CUSTOM_ENV__ = env; }
";

/// Serves the environment setters the generated entry imports.
#[derive(Debug)]
struct EnvRuntimePlugin;

impl Plugin for EnvRuntimePlugin {
    fn name(&self) -> Cow<'static, str> {
        "tessel-env-runtime".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let matches = args.specifier == ENV_RUNTIME_MODULE;
        async move {
            Ok(matches.then(|| HookResolveIdOutput {
                id: ENV_RUNTIME_ID.into(),
                ..Default::default()
            }))
        }
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let matches = args.id == ENV_RUNTIME_ID;
        async move {
            Ok(matches.then(|| HookLoadOutput {
                code: ENV_RUNTIME_SOURCE.into(),
                ..Default::default()
            }))
        }
    }
}

/// Writes one `index.html` per page route and stages the service worker
/// template in the temp directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSiteGenerator;

impl HtmlSiteGenerator {
    fn render(stats: &BuildStats) -> String {
        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n",
        );
        for css in stats.assets_with_extension("css") {
            let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"/{}\">", css.name);
        }
        html.push_str("</head>\n<body>\n<div id=\"root\"></div>\n");
        for chunk in stats.entry_chunks() {
            let _ = writeln!(html, "<script type=\"module\" src=\"/{}\"></script>", chunk.name);
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

#[async_trait]
impl SiteGenerator for HtmlSiteGenerator {
    async fn generate(&self, ctx: &BuildContext, info: &AnalyseInfo, stats: &BuildStats) -> Result<()> {
        let dist = ctx.dist_root();
        let html = Self::render(stats);

        let mut routes: Vec<&str> = info.pages.iter().map(|p| p.route.as_str()).collect();
        if !routes.contains(&"/") {
            routes.push("/");
        }
        for route in routes {
            let dir = dist.join(route.trim_start_matches('/'));
            write_file(&dir.join("index.html"), html.as_bytes()).await?;
        }

        if let Some(sw) = &info.service_worker {
            let staged = ctx.temp_root().join(SERVICE_WORKER_TEMPLATE);
            let content = tokio::fs::read(sw).await.map_err(|e| BuildError::fs(sw, e))?;
            write_file(&staged, &content).await?;
            tracing::debug!(path = %staged.display(), "service worker staged");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::EmittedFile;
    use std::fs;
    use tempfile::TempDir;
    use tessel_config::ProjectConfig;

    #[test]
    fn routes_drop_extension_and_index() {
        assert_eq!(route_for(Path::new("index.tsx")), "/");
        assert_eq!(route_for(Path::new("about.tsx")), "/about");
        assert_eq!(route_for(Path::new("blog/index.ts")), "/blog");
        assert_eq!(route_for(Path::new("blog/post.jsx")), "/blog/post");
    }

    #[tokio::test]
    async fn analyser_finds_pages_layout_and_service_worker() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("pages/blog")).unwrap();
        fs::create_dir_all(src.join("layouts")).unwrap();
        fs::create_dir_all(src.join("static")).unwrap();
        fs::write(src.join("pages/index.tsx"), "").unwrap();
        fs::write(src.join("pages/blog/post.tsx"), "").unwrap();
        fs::write(src.join("pages/readme.md"), "").unwrap();
        fs::write(src.join("layouts/index.tsx"), "").unwrap();
        fs::write(src.join("static/sw.js"), "").unwrap();

        let ctx = BuildContext::builder(dir.path(), ProjectConfig::default()).build_unchecked();
        let info = DirectoryAnalyzer::default().analyse(&ctx).await.unwrap();

        let routes: Vec<_> = info.pages.iter().map(|p| p.route.as_str()).collect();
        assert_eq!(routes, ["/blog/post", "/"]);
        assert_eq!(info.layout, Some(src.join("layouts/index.tsx")));
        assert_eq!(info.service_worker, Some(src.join("static/sw.js")));
    }

    #[tokio::test]
    async fn entry_imports_pages_relative_to_temp() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let info = AnalyseInfo {
            pages: vec![PageInfo {
                route: "/".into(),
                file: root.join("src/pages/index.tsx"),
            }],
            layout: None,
            service_worker: None,
        };
        let ctx = BuildContext::builder(root, ProjectConfig::default()).build_unchecked();

        let path = TemplateEntryGenerator.create_entry(&ctx, &info).await.unwrap();
        assert_eq!(path, root.join(".temp/entry.tsx"));

        let source = fs::read_to_string(path).unwrap();
        assert!(source.contains("import Page0 from '../src/pages/index';"));
        assert!(source.contains("{ path: '/', component: Page0 }"));
        assert!(source.contains("export const layout = null;"));
    }

    #[tokio::test]
    async fn site_generator_writes_html_and_stages_service_worker() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/static")).unwrap();
        fs::write(root.join("src/static/sw.js"), "self.x = 1;").unwrap();

        let info = AnalyseInfo {
            pages: vec![PageInfo {
                route: "/about".into(),
                file: root.join("src/pages/about.tsx"),
            }],
            layout: None,
            service_worker: Some(root.join("src/static/sw.js")),
        };
        let stats = BuildStats {
            out_dir: root.join("dist"),
            assets: vec![
                EmittedFile { name: "main.js".into(), size: 10, is_entry: true },
                EmittedFile { name: "main.css".into(), size: 4, is_entry: false },
            ],
            ..BuildStats::default()
        };
        let ctx = BuildContext::builder(root, ProjectConfig::default()).build_unchecked();

        HtmlSiteGenerator.generate(&ctx, &info, &stats).await.unwrap();

        let index = fs::read_to_string(root.join("dist/index.html")).unwrap();
        assert!(index.contains("<script type=\"module\" src=\"/main.js\"></script>"));
        assert!(index.contains("href=\"/main.css\""));
        assert!(root.join("dist/about/index.html").is_file());
        assert_eq!(
            fs::read_to_string(root.join(".temp/static/sw.js")).unwrap(),
            "self.x = 1;"
        );
    }
}
