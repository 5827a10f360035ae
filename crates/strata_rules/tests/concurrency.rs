//! Concurrent requests share evaluations.

mod common;

use std::sync::Arc;

use common::{path, text, Workspace};
use strata_engine::RuleKind;
use strata_rules::rules::TypeCheck;
use strata_rules::Lite;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_type_checks_run_once() {
    let ws = Workspace::new(&[
        ("a.src", "def x: int\n"),
        ("b.src", "import \"a.src\"\nuse x\n"),
    ]);
    let host = Arc::new(ws.host());

    let first = {
        let host = host.clone();
        tokio::spawn(async move { host.request::<TypeCheck<Lite>>(path("b.src")).await })
    };
    let second = {
        let host = host.clone();
        tokio::spawn(async move { host.request::<TypeCheck<Lite>>(path("b.src")).await })
    };
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    // One evaluation for each of `a.src` and `b.src`.
    assert_eq!(host.stats().computations_of(RuleKind::TypeCheck), 2);
    assert_eq!(host.session_builds(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checks_of_a_dirty_file_recompute_once() {
    let ws = Workspace::new(&[
        ("a.src", "def x: int\n"),
        ("b.src", "import \"a.src\"\nuse x\n"),
    ]);
    let host = Arc::new(ws.host());
    host.request::<TypeCheck<Lite>>(path("b.src")).await.unwrap();
    let checks = host.stats().computations_of(RuleKind::TypeCheck);
    let interfaces = host.stats().computations_of(RuleKind::GenerateInterface);

    host.on_file_changed(path("a.src"), text("def x: int\ndef y: bool\n"))
        .unwrap();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let host = host.clone();
            tokio::spawn(async move { host.request::<TypeCheck<Lite>>(path("b.src")).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    // `a.src` and `b.src` once each.
    assert_eq!(host.stats().computations_of(RuleKind::TypeCheck), checks + 2);
    assert_eq!(
        host.stats().computations_of(RuleKind::GenerateInterface),
        interfaces + 1
    );
    assert_eq!(host.session_builds(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn checking_many_files_publishes_each_once() {
    let mut files = vec![("base.src".to_string(), "def shared: int\n".to_string())];
    for i in 0..16 {
        files.push((
            format!("m{i}.src"),
            format!("import \"base.src\"\ndef own{i}: bool\nuse shared\nuse own{i}\n"),
        ));
    }
    let refs: Vec<(&str, &str)> = files.iter().map(|(p, t)| (p.as_str(), t.as_str())).collect();
    let ws = Workspace::new(&refs);
    let host = ws.host();
    host.set_files_of_interest(files.iter().map(|(p, _)| path(p)))
        .unwrap();

    let errors = host.check_files_of_interest().await.unwrap();
    assert_eq!(errors, 0);
    assert_eq!(host.sink().publish_count(), 17);
    assert!(host.sink().all().is_empty());
    assert_eq!(host.stats().computations_of(RuleKind::TypeCheck), 17);
    assert_eq!(host.stats().computations_of(RuleKind::GenerateInterface), 1);
    assert_eq!(host.session_builds(), 1);
}
