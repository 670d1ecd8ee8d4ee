//! Multi-target builds against fake engines.

mod support;

use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use support::{Fixture, PassthroughStyleCompiler, RecordingScriptCompiler, ScriptedComponentBundler};
use tessel_build::{
    BuildContext, BuildError, BuildRequest, HookRegistry, ModuleSystem, SelectedSource, StreamKind,
    TargetKind, build, build_settled,
};
use tessel_config::ProjectConfig;

fn project(fx: &Fixture) {
    fx.write("src/index.ts", "export const a = 1;")
        .write("src/util/helpers.tsx", "export const b = 2;")
        .write("src/styles/app.scss", ".app{color:red}")
        .write("src/styles/_vars.scss", ".unused{color:blue}")
        .write("src/logo.svg", "<svg/>")
        .write("src/vendor.js", "window.v = 1;")
        .write("packages/ui/package.json", r#"{ "name": "ui" }"#)
        .write("packages/ui/src/button.ts", "export const button = 1;");
}

fn context(fx: &Fixture, config: ProjectConfig) -> BuildContext {
    BuildContext::builder(fx.root(), config)
        .engines(fx.engines())
        .build()
        .unwrap()
}

#[tokio::test]
async fn whole_project_build_writes_every_target() {
    let fx = Fixture::new();
    project(&fx);
    let ctx = context(&fx, ProjectConfig::default());

    let report = build(&ctx, BuildRequest::whole_project()).await.unwrap();

    let kinds: Vec<_> = report.targets.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, [TargetKind::Main, TargetKind::Module, TargetKind::Esm5]);
    assert!(report.watch.is_none());

    for target in ["main", "module", "esm5"] {
        assert!(fx.exists(&format!("dist/{target}/src/index.js")));
        assert!(fx.exists(&format!("dist/{target}/src/util/helpers.js")));
        assert!(fx.exists(&format!("dist/{target}/packages/ui/src/button.js")));
        assert!(fx.exists(&format!("dist/{target}/src/logo.svg")));
        assert!(fx.exists(&format!("dist/{target}/src/vendor.js")));
    }

    // Compiled styles for main/module, raw sources for esm5.
    assert_eq!(fx.read("dist/main/src/styles/app.css"), ".app{color:red}");
    assert!(fx.exists("dist/module/src/styles/app.css"));
    assert!(!fx.exists("dist/main/src/styles/_vars.css"));
    assert!(!fx.exists("dist/main/src/styles/app.scss"));
    assert!(fx.exists("dist/esm5/src/styles/app.scss"));
    assert!(!fx.exists("dist/esm5/src/styles/app.css"));

    let main = &report.targets[0];
    let streams: Vec<_> = main.streams.iter().map(|s| s.kind).collect();
    assert_eq!(streams, [StreamKind::Script, StreamKind::Style, StreamKind::Resources]);
    assert_eq!(main.files_written(), 3 + 1 + 2);

    let esm5 = &report.targets[2];
    let streams: Vec<_> = esm5.streams.iter().map(|s| s.kind).collect();
    assert_eq!(streams, [StreamKind::Script, StreamKind::Resources]);
}

#[tokio::test]
async fn targets_compile_with_their_module_system() {
    let fx = Fixture::new();
    fx.write("src/index.ts", "export {};");
    let ctx = context(&fx, ProjectConfig::default());

    build(&ctx, BuildRequest::default()).await.unwrap();

    let calls = fx.scripts.calls.lock().clone();
    let systems: Vec<_> = calls.iter().map(|(_, system)| *system).collect();
    assert_eq!(systems.len(), 3);
    assert_eq!(systems.iter().filter(|s| **s == ModuleSystem::CommonJs).count(), 1);
    assert!(fx.read("dist/main/index.js").starts_with("// CommonJs"));
    assert!(fx.read("dist/module/index.js").starts_with("// EsModule"));
    assert!(fx.read("dist/esm5/index.js").starts_with("// EsModule"));
}

#[tokio::test]
async fn package_builds_are_scoped_and_nested() {
    let fx = Fixture::new();
    project(&fx);
    let ctx = context(&fx, ProjectConfig::default());
    let package = ctx.package("ui").unwrap().clone();

    let report = build(&ctx, BuildRequest::package(&package)).await.unwrap();

    assert_eq!(report.targets[0].out_dir, fx.root().join("dist/ui/main"));
    assert!(fx.exists("dist/ui/main/button.js"));
    assert!(fx.exists("dist/ui/module/button.js"));
    assert!(!fx.exists("dist/ui/main/index.js"));
    assert_eq!(fx.scripts.compiled(), vec![PathBuf::from("button.ts"); 3]);
}

#[tokio::test]
async fn first_stream_failure_is_returned_unchanged() {
    let fx = Fixture::with_engines(
        RecordingScriptCompiler::failing_on("helpers.tsx"),
        PassthroughStyleCompiler::default(),
        ScriptedComponentBundler::default(),
    );
    project(&fx);
    let ctx = context(&fx, ProjectConfig::default());

    let err = build(&ctx, BuildRequest::whole_project()).await.unwrap_err();

    match err {
        BuildError::Compilation { file, message } => {
            assert_eq!(file, fx.root().join("src/util/helpers.tsx"));
            assert_eq!(message, "unexpected token");
        }
        other => panic!("expected a compilation error, got {other:?}"),
    }
}

#[tokio::test]
async fn settled_build_reports_each_target() {
    let fx = Fixture::with_engines(
        RecordingScriptCompiler::default(),
        PassthroughStyleCompiler::failing_on("app.scss"),
        ScriptedComponentBundler::default(),
    );
    project(&fx);
    let ctx = context(&fx, ProjectConfig::default());

    let settled = build_settled(&ctx, BuildRequest::whole_project()).await.unwrap();

    assert!(!settled.is_success());
    let outcomes: Vec<_> = settled
        .targets
        .iter()
        .map(|t| (t.kind, t.result.is_ok()))
        .collect();
    assert_eq!(
        outcomes,
        [
            (TargetKind::Main, false),
            (TargetKind::Module, false),
            (TargetKind::Esm5, true),
        ]
    );
    assert!(matches!(
        settled.targets[0].result,
        Err(BuildError::Compilation { ref message, .. }) if message == "undefined variable"
    ));
    // Scripts of the failed targets still completed.
    assert!(fx.exists("dist/main/src/index.js"));
}

fn component_config() -> ProjectConfig {
    let mut entries = IndexMap::new();
    entries.insert("Button".to_string(), PathBuf::from("src/Button.tsx"));
    ProjectConfig {
        component_entries: Some(entries),
        css_extract: true,
        ..ProjectConfig::default()
    }
}

#[tokio::test]
async fn component_entries_replace_the_style_stream() {
    let fx = Fixture::new();
    fx.write("src/Button.tsx", "import './button.scss';")
        .write("src/button.scss", ".button{color:red}");
    let ctx = context(&fx, component_config());

    let report = build(&ctx, BuildRequest::default()).await.unwrap();

    assert_eq!(*fx.components.passes.lock(), 1);
    assert!(fx.styles.calls.lock().is_empty());

    // The bundler's Button.js was filtered out; this one is the script stream's,
    // which only starts after filtering.
    assert_eq!(fx.list("dist/main"), ["Button.css", "Button.js"]);
    assert!(fx.read("dist/main/Button.js").starts_with("// CommonJs"));
    assert_eq!(fx.read("dist/main/Button.css"), ".root{color:red}");
    assert_eq!(fx.read("dist/module/Button.css"), ".root{color:red}");
    assert!(!fx.exists("dist/main/chunk-shared.js"));
    assert!(!fx.exists("dist/main/assets"));

    let first = &report.targets[0];
    assert_eq!(first.streams[0].kind, StreamKind::ComponentStyles);
    assert_eq!(first.streams[0].files_written, 1);
    assert!(report.targets.iter().all(|t| t.streams.iter().all(|s| s.kind != StreamKind::Style)));
}

fn extracting_config() -> ProjectConfig {
    ProjectConfig {
        css_extract: true,
        ..ProjectConfig::default()
    }
}

#[tokio::test]
async fn extraction_from_the_root_bundles_every_package_stylesheet() {
    let fx = Fixture::new();
    fx.write("src/index.ts", "export {};")
        .write("src/a.scss", "/* banner */\n.a{color:red}")
        .write("packages/ui/package.json", r#"{ "name": "ui" }"#)
        .write("packages/ui/src/b.scss", ".b{color:blue}");
    let ctx = context(&fx, extracting_config());

    let report = build(&ctx, BuildRequest::default()).await.unwrap();

    for target in ["main", "module"] {
        let bundle = fx.read(&format!("dist/{target}/index.css"));
        let (a, b) = (bundle.find(".a").unwrap(), bundle.find(".b").unwrap());
        assert!(b < a, "sources are bundled in path order: {bundle}");
        assert!(!bundle.contains("banner"));
        assert!(!fx.exists(&format!("dist/{target}/a.css")));
        assert!(!fx.exists(&format!("dist/{target}/src/a.css")));
    }
    assert!(!fx.exists("dist/esm5/index.css"));
    assert!(fx.exists("dist/esm5/src/a.scss"));

    let style = report.targets[0]
        .streams
        .iter()
        .find(|s| s.kind == StreamKind::Style)
        .unwrap();
    assert_eq!(style.files_written, 1);
}

#[tokio::test]
async fn extraction_without_stylesheets_writes_no_bundle() {
    let fx = Fixture::new();
    fx.write("src/app.scss", ".app{color:red}")
        .write("packages/ui/package.json", r#"{ "name": "ui" }"#)
        .write("packages/ui/src/button.ts", "export {};");
    let ctx = BuildContext::builder(fx.root(), extracting_config())
        .engines(fx.engines())
        .selected_source(SelectedSource::Package("ui".into()))
        .build()
        .unwrap();
    let package = ctx.package("ui").unwrap().clone();

    let report = build(&ctx, BuildRequest::package(&package)).await.unwrap();

    assert!(fx.exists("dist/ui/main/button.js"));
    assert!(!fx.exists("dist/ui/main/index.css"));
    assert!(!fx.exists("dist/ui/module/index.css"));
    let style = report.targets[0]
        .streams
        .iter()
        .find(|s| s.kind == StreamKind::Style)
        .unwrap();
    assert_eq!(style.files_written, 0);
}

fn material_config() -> ProjectConfig {
    ProjectConfig {
        material_component: true,
        ..ProjectConfig::default()
    }
}

#[tokio::test]
async fn material_builds_write_lib_and_es_and_are_repeatable() {
    let fx = Fixture::new();
    fx.write("src/index.ts", "export {};")
        .write("src/app.scss", ".app{color:red}")
        .write("src/logo.svg", "<svg/>");
    let ctx = context(&fx, material_config());

    build(&ctx, BuildRequest::default()).await.unwrap();
    let report = build(&ctx, BuildRequest::default()).await.unwrap();

    let kinds: Vec<_> = report.targets.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, [TargetKind::Lib, TargetKind::Es]);
    assert!(report
        .targets
        .iter()
        .all(|t| t.streams.iter().any(|s| s.kind == StreamKind::Style)));

    for target in ["lib", "es"] {
        assert!(fx.exists(&format!("{target}/index.js")));
        assert!(fx.exists(&format!("{target}/app.css")));
        assert!(fx.exists(&format!("{target}/logo.svg")));
    }
    assert!(fx.read("lib/index.js").starts_with("// CommonJs"));
    assert!(fx.read("es/index.js").starts_with("// EsModule"));
    assert!(!fx.exists("esm5"));
    assert!(!fx.exists("dist"));
    assert!(!fx.exists("lib/lib"));
    assert_eq!(fx.scripts.compiled(), vec![PathBuf::from("index.ts"); 4]);
}

#[tokio::test]
async fn material_package_outputs_are_not_inputs_of_later_builds() {
    let fx = Fixture::new();
    fx.write("src/index.ts", "export {};")
        .write("packages/ui/package.json", r#"{ "name": "ui" }"#)
        .write("packages/ui/src/button.ts", "export {};")
        .write("packages/ui/src/icon.svg", "<svg/>");
    let ctx = context(&fx, material_config());
    let package = ctx.package("ui").unwrap().clone();

    build(&ctx, BuildRequest::package(&package)).await.unwrap();
    build(&ctx, BuildRequest::package(&package)).await.unwrap();
    assert!(fx.exists("packages/ui/lib/button.js"));
    assert!(fx.exists("packages/ui/es/icon.svg"));
    assert!(!fx.exists("packages/ui/lib/lib"));

    build(&ctx, BuildRequest::whole_project()).await.unwrap();
    assert!(fx.exists("lib/packages/ui/src/button.js"));
    assert!(fx.exists("lib/packages/ui/src/icon.svg"));
    assert!(!fx.exists("lib/packages/ui/lib"));
    assert!(!fx.exists("lib/packages/ui/es"));
}

#[tokio::test]
async fn component_bundler_failure_aborts_before_other_streams() {
    let fx = Fixture::with_engines(
        RecordingScriptCompiler::default(),
        PassthroughStyleCompiler::default(),
        ScriptedComponentBundler {
            fail: true,
            ..ScriptedComponentBundler::default()
        },
    );
    fx.write("src/Button.tsx", "export {};");
    let ctx = context(&fx, component_config());

    let err = build_settled(&ctx, BuildRequest::default()).await.unwrap_err();

    assert!(matches!(err, BuildError::Bundler(_)));
    assert!(fx.scripts.calls.lock().is_empty());
}

#[tokio::test]
async fn option_mutators_shape_every_target() {
    let fx = Fixture::new();
    fx.write("src/index.ts", "export {};");
    let mut registry = HookRegistry::new();
    registry.add_option_mutator("force-esm", |mut options: tessel_build::ScriptOptions| {
        options.module_system = ModuleSystem::EsModule;
        Ok(options)
    });
    let ctx = BuildContext::builder(fx.root(), ProjectConfig::default())
        .engines(fx.engines())
        .hooks(registry.freeze())
        .build()
        .unwrap();

    build(&ctx, BuildRequest::default()).await.unwrap();

    assert!(fx.read("dist/main/index.js").starts_with("// EsModule"));
}

#[tokio::test]
async fn failing_option_mutator_stops_the_build_before_compiling() {
    let fx = Fixture::new();
    fx.write("src/index.ts", "export {};");
    let mut registry = HookRegistry::new();
    registry.add_option_mutator("broken", |_| anyhow::bail!("bad plugin options"));
    let ctx = BuildContext::builder(fx.root(), ProjectConfig::default())
        .engines(fx.engines())
        .hooks(registry.freeze())
        .build()
        .unwrap();

    let err = build(&ctx, BuildRequest::default()).await.unwrap_err();

    assert!(matches!(err, BuildError::Pipeline { ref hook, .. } if hook == "broken"));
    assert!(fx.scripts.calls.lock().is_empty());
    assert!(!fx.exists("dist"));
}

#[tokio::test(flavor = "multi_thread")]
async fn watch_session_reports_later_passes_until_stopped() {
    let fx = Fixture::new();
    fx.write("src/index.ts", "export const a = 1;");
    let ctx = BuildContext::builder(fx.root(), ProjectConfig::default())
        .engines(fx.engines())
        .watch_debounce(Duration::from_millis(20))
        .build()
        .unwrap();

    let report = build(&ctx, BuildRequest::default().watching(true)).await.unwrap();
    let mut session = report.watch.expect("watch session");
    assert!(session.handles().iter().all(|h| h.is_running()));
    assert_eq!(fx.scripts.calls.lock().len(), 3);

    fx.write("src/index.ts", "export const a = 2;");

    let event = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = session.next_event().await.expect("watcher alive");
            if event.stream == StreamKind::Script {
                break event;
            }
        }
    })
    .await
    .expect("a rebuild pass");

    assert_eq!(event.changed, [fx.root().join("src/index.ts")]);
    assert!(matches!(event.outcome, Ok(1)));

    session.stop().await;
}
