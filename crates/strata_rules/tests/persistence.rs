//! Interfaces persisted by one host are reused by the next.

mod common;

use common::{config, path, Workspace};
use strata_engine::RuleKind;
use strata_rules::rules::{GenerateInterface, TypeCheck};
use strata_rules::Lite;

const PERSISTENT: &str = r#"
[workspace]
name = "w"

[engine]
persist_interfaces = true
"#;

fn workspace() -> Workspace {
    Workspace::new(&[
        ("a.src", "def x: int\n"),
        ("b.src", "import \"a.src\"\nuse x\n"),
    ])
}

#[tokio::test]
async fn restart_reuses_persisted_interface() {
    let ws = workspace();
    {
        let host = ws.host_with(config(PERSISTENT));
        host.request::<TypeCheck<Lite>>(path("b.src")).await.unwrap();
        host.shutdown();
    }
    assert!(ws.root().join(".strata-cache/manifest.json").exists());

    let host = ws.host_with(config(PERSISTENT));
    let checked = host.request::<TypeCheck<Lite>>(path("b.src")).await.unwrap();
    assert_eq!(checked.module.uses.len(), 1);
    // Only `b.src` is checked; the interface of `a.src` comes from disk.
    assert_eq!(host.stats().computations_of(RuleKind::TypeCheck), 1);
}

#[tokio::test]
async fn edited_source_is_not_served_from_disk() {
    let ws = workspace();
    {
        let host = ws.host_with(config(PERSISTENT));
        host.request::<GenerateInterface<Lite>>(path("a.src")).await.unwrap();
        host.shutdown();
    }
    ws.write("a.src", "def x: int\ndef y: str\n");

    let host = ws.host_with(config(PERSISTENT));
    let interface = host.request::<GenerateInterface<Lite>>(path("a.src")).await.unwrap();
    assert_eq!(interface.defs.len(), 2);
    assert_eq!(host.stats().computations_of(RuleKind::TypeCheck), 1);
}

#[tokio::test]
async fn without_persistence_nothing_is_written() {
    let ws = workspace();
    let host = ws.host();
    host.request::<TypeCheck<Lite>>(path("b.src")).await.unwrap();
    host.shutdown();
    assert!(!ws.root().join(".strata-cache").exists());
}

#[tokio::test]
async fn garbage_collection_keeps_live_artifacts() {
    let ws = workspace();
    let host = ws.host_with(config(PERSISTENT));
    host.set_files_of_interest([path("b.src")]).unwrap();
    host.check_files_of_interest().await.unwrap();

    let report = host.collect_garbage().unwrap();
    assert_eq!(report.artifacts, 0);
    assert!(ws.root().join(".strata-cache/manifest.json").exists());
}

#[tokio::test]
async fn garbage_collection_forgets_deleted_files() {
    let ws = workspace();
    {
        let host = ws.host_with(config(PERSISTENT));
        host.request::<GenerateInterface<Lite>>(path("b.src")).await.unwrap();
        host.shutdown();
    }
    std::fs::remove_file(ws.root().join("b.src")).unwrap();

    let host = ws.host_with(config(PERSISTENT));
    let report = host.collect_garbage().unwrap();
    assert_eq!(report.artifacts, 1);

    // The interface of `a.src` survives and is still served from disk.
    host.request::<GenerateInterface<Lite>>(path("a.src")).await.unwrap();
    assert_eq!(host.stats().computations_of(RuleKind::TypeCheck), 0);
}
