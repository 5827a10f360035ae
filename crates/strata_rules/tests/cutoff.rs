//! Early cutoff: edits that do not change what a rule observed stop
//! propagating at that rule.

mod common;

use std::time::{Duration, SystemTime};

use common::{path, text, Workspace};
use strata_engine::RuleKind;
use strata_rules::rules::{ParseFile, TypeCheck};
use strata_rules::Lite;

fn workspace() -> Workspace {
    Workspace::new(&[
        ("a.src", "def x: int\n"),
        ("b.src", "import \"a.src\"\nuse x\n"),
    ])
}

#[tokio::test]
async fn whitespace_edit_does_not_recheck_importer() {
    let ws = workspace();
    let host = ws.host();
    host.request::<TypeCheck<Lite>>(path("b.src")).await.unwrap();
    let before = host.stats();
    assert_eq!(before.computations_of(RuleKind::TypeCheck), 2);

    assert!(host
        .on_file_changed(path("a.src"), text("\n\n    def x: int\n"))
        .unwrap());
    let checked = host.request::<TypeCheck<Lite>>(path("b.src")).await.unwrap();
    assert_eq!(checked.module.uses.len(), 1);

    let after = host.stats();
    // `a.src` is checked again; its interface is unchanged, so `b.src` is not.
    assert_eq!(after.computations_of(RuleKind::TypeCheck), 3);
    assert_eq!(after.computations_of(RuleKind::GenerateInterface), 2);
    assert!(after.cutoffs > before.cutoffs);
}

#[tokio::test]
async fn interface_change_rechecks_importer() {
    let ws = workspace();
    let host = ws.host();
    host.request::<TypeCheck<Lite>>(path("b.src")).await.unwrap();

    host.on_file_changed(path("a.src"), text("def x: int\ndef y: bool\n"))
        .unwrap();
    host.request::<TypeCheck<Lite>>(path("b.src")).await.unwrap();
    assert_eq!(host.stats().computations_of(RuleKind::TypeCheck), 4);
}

#[tokio::test]
async fn identical_buffer_changes_nothing() {
    let ws = workspace();
    let host = ws.host();
    assert!(host
        .on_file_changed(path("a.src"), text("def x: int\n"))
        .unwrap());
    host.request::<TypeCheck<Lite>>(path("b.src")).await.unwrap();
    let before = host.stats();

    assert!(!host
        .on_file_changed(path("a.src"), text("def x: int\n"))
        .unwrap());
    host.request::<TypeCheck<Lite>>(path("b.src")).await.unwrap();
    assert_eq!(host.stats().computations, before.computations);
}

#[tokio::test]
async fn timestamp_only_change_stops_at_summary() {
    let ws = workspace();
    let host = ws.host();
    host.request::<TypeCheck<Lite>>(path("b.src")).await.unwrap();
    let before = host.stats();

    let file = std::fs::File::options()
        .write(true)
        .open(ws.root().join("a.src"))
        .unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(3600))
        .unwrap();
    drop(file);

    assert!(host.on_file_changed(path("a.src"), None).unwrap());
    host.request::<TypeCheck<Lite>>(path("b.src")).await.unwrap();

    let after = host.stats();
    assert_eq!(
        after.computations_of(RuleKind::ModSummary),
        before.computations_of(RuleKind::ModSummary) + 1
    );
    assert_eq!(
        after.computations_of(RuleKind::ParseFile),
        before.computations_of(RuleKind::ParseFile)
    );
    assert_eq!(
        after.computations_of(RuleKind::TypeCheck),
        before.computations_of(RuleKind::TypeCheck)
    );
}

#[tokio::test]
async fn parse_result_follows_the_buffer_then_the_disk() {
    let ws = workspace();
    let host = ws.host();
    host.on_file_changed(path("a.src"), text("def y: str\n")).unwrap();
    let parsed = host.request::<ParseFile<Lite>>(path("a.src")).await.unwrap();
    assert_eq!(&*parsed.source.text, "def y: str\n");

    host.on_file_closed(path("a.src")).unwrap();
    let parsed = host.request::<ParseFile<Lite>>(path("a.src")).await.unwrap();
    assert_eq!(&*parsed.source.text, "def x: int\n");
}
