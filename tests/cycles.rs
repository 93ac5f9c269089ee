// Drives a plugin through consecutive build cycles the way a build integration would.
use materialize::{
    Artifact, ArtifactSet, BuildContext, BuildCycle, ConfigError, Decision, Materializer, Options,
    OutputFileSystem,
};
use std::path::Path;

fn artifacts(entries: &[(&str, &str)]) -> ArtifactSet {
    entries
        .iter()
        .map(|(path, content)| (*path, Artifact::new(*content)))
        .collect()
}

fn active_plugin(options: Options, cwd: &Path) -> Materializer {
    let mut plugin = Materializer::new(options.with_log(false));
    let context = BuildContext::new(OutputFileSystem::Memory, cwd).with_output_path("dist");

    assert!(plugin.initialize(&context).unwrap());

    plugin
}

fn read(cwd: &Path, path: &str) -> String {
    std::fs::read_to_string(cwd.join(path)).unwrap()
}

#[test]
fn first_cycle_writes_artifact() {
    let cwd = tempfile::tempdir().unwrap();
    let mut plugin = active_plugin(Options::default(), cwd.path());

    let report = plugin
        .on_cycle_complete(&BuildCycle::new(artifacts(&[(
            "dist/app.js",
            "console.log(1)",
        )])))
        .unwrap();

    assert_eq!(report.written(), 1);
    assert_eq!(report.artifacts[0].destination, "dist/app.js");
    assert_eq!(read(cwd.path(), "dist/app.js"), "console.log(1)");
}

#[test]
fn identical_second_cycle_writes_nothing() {
    let cwd = tempfile::tempdir().unwrap();
    let mut plugin = active_plugin(Options::default(), cwd.path());
    let cycle = BuildCycle::new(artifacts(&[
        ("dist/app.js", "console.log(1)"),
        ("dist/css/site.css", "body{}"),
    ]));

    plugin.on_cycle_complete(&cycle).unwrap();
    let modified_before = std::fs::metadata(cwd.path().join("dist/app.js"))
        .unwrap()
        .modified()
        .unwrap();

    let report = plugin.on_cycle_complete(&cycle).unwrap();

    assert_eq!(report.written(), 0);
    assert_eq!(report.skipped(), 2);
    assert_eq!(
        std::fs::metadata(cwd.path().join("dist/app.js"))
            .unwrap()
            .modified()
            .unwrap(),
        modified_before
    );
}

#[test]
fn changed_content_is_rewritten() {
    let cwd = tempfile::tempdir().unwrap();
    let mut plugin = active_plugin(Options::default(), cwd.path());

    plugin
        .on_cycle_complete(&BuildCycle::new(artifacts(&[
            ("dist/app.js", "console.log(1)"),
            ("dist/vendor.js", "lib()"),
        ])))
        .unwrap();
    let report = plugin
        .on_cycle_complete(&BuildCycle::new(artifacts(&[
            ("dist/app.js", "console.log(2)"),
            ("dist/vendor.js", "lib()"),
        ])))
        .unwrap();

    let decisions: Vec<(&str, &Decision)> = report
        .artifacts
        .iter()
        .map(|a| (a.asset_path.as_str(), &a.decision))
        .collect();

    assert_eq!(
        decisions,
        vec![
            ("app.js", &Decision::Written),
            ("vendor.js", &Decision::SkippedUnchanged)
        ]
    );
    assert_eq!(read(cwd.path(), "dist/app.js"), "console.log(2)");
}

#[test]
fn inclusion_pattern_limits_writes() {
    let cwd = tempfile::tempdir().unwrap();
    let options = Options::default().with_test_pattern(r"\.css$").unwrap();
    let mut plugin = active_plugin(options, cwd.path());

    let report = plugin
        .on_cycle_complete(&BuildCycle::new(artifacts(&[
            ("dist/app.js", "console.log(1)"),
            ("dist/style.css", "body{}"),
        ])))
        .unwrap();

    assert_eq!(report.written(), 1);
    assert_eq!(report.filtered(), 1);
    assert!(!cwd.path().join("dist/app.js").exists());
    assert_eq!(read(cwd.path(), "dist/style.css"), "body{}");
}

#[test]
fn disabled_hash_index_rewrites_every_cycle() {
    let cwd = tempfile::tempdir().unwrap();
    let mut plugin = active_plugin(Options::default().with_hash_index(false), cwd.path());
    let cycle = BuildCycle::new(artifacts(&[("dist/app.js", "console.log(1)")]));

    for _ in 0..3 {
        let report = plugin.on_cycle_complete(&cycle).unwrap();

        assert_eq!(report.written(), 1);
    }

    assert!(plugin.writer().unwrap().index().is_empty());
}

#[test]
fn query_variants_share_a_file() {
    let cwd = tempfile::tempdir().unwrap();
    let mut plugin = active_plugin(Options::default(), cwd.path());

    let report = plugin
        .on_cycle_complete(&BuildCycle::new(artifacts(&[
            ("dist/app.js?v=1", "one"),
            ("dist/app.js?v=2", "two"),
        ])))
        .unwrap();

    assert_eq!(report.written(), 2);
    assert_eq!(plugin.writer().unwrap().index().len(), 2);
    assert_eq!(read(cwd.path(), "dist/app.js"), "two");
}

#[test]
fn independent_plugins_keep_separate_indexes() {
    let cwd = tempfile::tempdir().unwrap();
    let cycle = BuildCycle::new(artifacts(&[("dist/app.js", "console.log(1)")]));

    let mut first = active_plugin(Options::default(), cwd.path());
    first.on_cycle_complete(&cycle).unwrap();

    let mut second = active_plugin(Options::default(), cwd.path());
    let report = second.on_cycle_complete(&cycle).unwrap();

    assert_eq!(report.written(), 1);
}

#[test]
fn non_boolean_option_fails_construction() {
    let table: toml::Table = toml::from_str(r#"useHashIndex = "yes""#).unwrap();

    let result = Materializer::from_table(table);

    assert!(matches!(result, Err(ConfigError::InvalidUseHashIndex { .. })));
}
