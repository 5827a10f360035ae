//! What each file reports, and how client settings shape it.

mod common;

use common::{path, text, Workspace};
use strata_config::ClientSettings;
use strata_diagnostics::Severity;
use strata_rules::codes;
use strata_rules::lite::codes as lite_codes;

#[tokio::test]
async fn syntax_errors_are_reported_with_positions() {
    let ws = Workspace::new(&[("a.src", "def x: int\nfrobnicate\ndef : int\n")]);
    let host = ws.host();
    let diags = host.diagnostics(path("a.src")).await.unwrap();
    let found: Vec<_> = diags.iter().map(|d| d.code).collect();
    assert_eq!(found, vec![lite_codes::UNKNOWN_DIRECTIVE, lite_codes::MALFORMED_DEF]);
    assert!(diags.iter().all(|d| d.span.is_some()));
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let ws = Workspace::new(&[]);
    let host = ws.host();
    let diags = host.diagnostics(path("nope.src")).await.unwrap();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::FILE_NOT_FOUND);
}

#[tokio::test]
async fn unresolved_import_points_at_the_import() {
    let ws = Workspace::new(&[("a.src", "def x: int\nimport \"gone.src\"\nuse x\n")]);
    let host = ws.host();
    let diags = host.diagnostics(path("a.src")).await.unwrap();
    assert_eq!(diags.len(), 1, "{diags:?}");
    assert_eq!(diags[0].code, codes::UNRESOLVED_IMPORT);
    assert_eq!(diags[0].span.map(|s| s.start), Some(11));
}

#[tokio::test]
async fn broken_import_blocks_the_importer() {
    let ws = Workspace::new(&[
        ("a.src", "def x int\n"),
        ("b.src", "import \"a.src\"\nuse x\n"),
    ]);
    let host = ws.host();
    let diags = host.diagnostics(path("b.src")).await.unwrap();
    assert_eq!(diags.len(), 1, "{diags:?}");
    assert_eq!(diags[0].code, codes::DEPENDENCY_ERRORS);
    assert!(diags[0].is_error());

    host.on_file_changed(path("a.src"), text("def x: int\n")).unwrap();
    assert!(host.diagnostics(path("b.src")).await.unwrap().is_empty());
}

#[tokio::test]
async fn warnings_only_for_files_of_interest() {
    let ws = Workspace::new(&[("a.src", "def x: int\n"), ("b.src", "import \"a.src\"\n")]);
    let host = ws.host();
    assert!(host.diagnostics(path("b.src")).await.unwrap().is_empty());

    host.set_files_of_interest([path("b.src")]).unwrap();
    let diags = host.diagnostics(path("b.src")).await.unwrap();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::UNUSED_IMPORT);
    assert_eq!(diags[0].severity, Severity::Warning);

    host.on_client_settings_changed(Some(ClientSettings {
        max_diagnostics_per_file: 100,
        report_warnings: false,
    }))
    .unwrap();
    assert!(host.diagnostics(path("b.src")).await.unwrap().is_empty());

    host.on_client_settings_changed(None).unwrap();
    assert_eq!(host.diagnostics(path("b.src")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn diagnostics_are_capped_per_file() {
    let ws = Workspace::new(&[("a.src", "use a\nuse b\nuse c\nuse d\n")]);
    let host = ws.host();
    assert_eq!(host.diagnostics(path("a.src")).await.unwrap().len(), 4);

    host.on_client_settings_changed(Some(ClientSettings {
        max_diagnostics_per_file: 2,
        report_warnings: true,
    }))
    .unwrap();
    let diags = host.diagnostics(path("a.src")).await.unwrap();
    assert_eq!(diags.len(), 2);
    assert!(diags[0].span.unwrap().start < diags[1].span.unwrap().start);
}

#[tokio::test]
async fn cap_keeps_errors_over_earlier_warnings() {
    let ws = Workspace::new(&[
        ("a.src", "def x: int\n"),
        ("b.src", "import \"a.src\"\nimport \"gone.src\"\n"),
    ]);
    let host = ws.host();
    host.set_files_of_interest([path("b.src")]).unwrap();
    let found: Vec<_> = host
        .diagnostics(path("b.src"))
        .await
        .unwrap()
        .iter()
        .map(|d| d.code)
        .collect();
    assert_eq!(found, vec![codes::UNUSED_IMPORT, codes::UNRESOLVED_IMPORT]);

    for cap in [1, 0] {
        host.on_client_settings_changed(Some(ClientSettings {
            max_diagnostics_per_file: cap,
            report_warnings: true,
        }))
        .unwrap();
        let diags = host.diagnostics(path("b.src")).await.unwrap();
        assert_eq!(diags.len(), 1, "cap {cap}: {diags:?}");
        assert_eq!(diags[0].code, codes::UNRESOLVED_IMPORT);
        assert!(diags[0].is_error());
    }
}

#[tokio::test]
async fn zero_cap_hides_warnings_only() {
    let ws = Workspace::new(&[("a.src", "def x: int\n"), ("b.src", "import \"a.src\"\n")]);
    let host = ws.host();
    host.set_files_of_interest([path("b.src")]).unwrap();
    host.on_client_settings_changed(Some(ClientSettings {
        max_diagnostics_per_file: 0,
        report_warnings: true,
    }))
    .unwrap();
    assert!(host.diagnostics(path("b.src")).await.unwrap().is_empty());
}

#[tokio::test]
async fn non_utf8_file_is_not_reported_as_missing() {
    let ws = Workspace::new(&[("b.src", "import \"blob.src\"\n")]);
    std::fs::write(ws.root().join("blob.src"), [0x64, 0x65, 0x66, 0xff, 0x0a]).unwrap();
    let host = ws.host();

    let diags = host.diagnostics(path("blob.src")).await.unwrap();
    assert_eq!(diags.len(), 1, "{diags:?}");
    assert_eq!(diags[0].code, codes::FILE_NOT_UTF8);
    assert!(diags[0].message.contains("not valid UTF-8"));

    let importer = host.diagnostics(path("b.src")).await.unwrap();
    assert!(importer.iter().all(|d| d.code != codes::UNRESOLVED_IMPORT), "{importer:?}");
    assert_eq!(importer[0].code, codes::DEPENDENCY_ERRORS);

    host.on_file_changed(path("blob.src"), text("def y: int\n")).unwrap();
    assert!(host.diagnostics(path("blob.src")).await.unwrap().is_empty());
}

#[tokio::test]
async fn check_publishes_to_the_sink() {
    let ws = Workspace::new(&[("good.src", "def x: int\n"), ("bad.src", "use y\n")]);
    let host = ws.host();
    host.set_files_of_interest(host.discover().unwrap()).unwrap();
    assert_eq!(host.files_of_interest().len(), 2);

    let errors = host.check_files_of_interest().await.unwrap();
    assert_eq!(errors, 1);
    assert!(host.sink().for_file(&path("good.src")).is_empty());
    assert_eq!(host.sink().for_file(&path("bad.src"))[0].code, lite_codes::UNKNOWN_NAME);
}
