//! `strata check`: diagnostics for a whole workspace or selected files.
//!
//! Every selected file becomes a file of interest, so warnings are reported
//! for all of them. Files are checked in parallel on the runtime and share
//! compiler sessions per build unit. With interface persistence enabled, the
//! manifest is written before exiting so the next run starts warm.

use strata_diagnostics::{Diagnostic, Severity, TerminalRenderer};
use strata_rules::{Frontend, Host};
use strata_source::SourceFile;

use crate::workspace::Workspace;
use crate::{CheckArgs, GlobalArgs, ReportFormat};

/// Runs the `strata check` command.
///
/// Returns exit code 0 if no errors were found, 1 otherwise.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let workspace = Workspace::open(global)?;

    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!("   Checking {}", workspace.config.workspace.name);
    }

    let runtime = workspace.runtime()?;
    runtime.block_on(check(&workspace, args, global))
}

async fn check(
    workspace: &Workspace,
    args: &CheckArgs,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let host = workspace.host()?;
    let files = if args.files.is_empty() {
        host.discover()?
    } else {
        args.files.iter().map(|f| workspace.source_path(f)).collect()
    };

    if files.is_empty() {
        if !global.quiet {
            eprintln!("warning: no source files found");
        }
        return Ok(0);
    }

    host.load_sources(&files)?;
    host.set_files_of_interest(files)?;
    let errors = host.check_files_of_interest().await?;
    let diagnostics = host.sink().all();

    match args.format {
        ReportFormat::Text => {
            render_text(&host, &diagnostics, global.color);
            if !global.quiet {
                let warnings = diagnostics
                    .iter()
                    .filter(|d| d.severity == Severity::Warning)
                    .count();
                eprintln!("   Result: {errors} error(s), {warnings} warning(s)");
            }
        }
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&diagnostics)?;
            println!("{json}");
        }
    }

    if global.verbose {
        let stats = host.stats();
        eprintln!(
            "   Engine: {} computation(s), {} cutoff(s), {} session build(s)",
            stats.computations,
            stats.cutoffs,
            host.session_builds()
        );
    }

    host.shutdown();
    Ok(if errors > 0 { 1 } else { 0 })
}

fn render_text<F: Frontend>(host: &Host<F>, diagnostics: &[Diagnostic], color: bool) {
    let renderer = TerminalRenderer::new(color);
    let mut current: Option<SourceFile> = None;
    for diag in diagnostics {
        if current.as_ref().map(|f| &f.path) != Some(&diag.path) {
            current = host
                .vfs()
                .read(&diag.path)
                .ok()
                .map(|snapshot| SourceFile::new(diag.path.clone(), snapshot.text));
        }
        eprintln!("{}", renderer.render(diag, current.as_ref()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::tests::{global, workspace};

    fn args(files: &[&str]) -> CheckArgs {
        CheckArgs {
            files: files.iter().map(|f| f.to_string()).collect(),
            format: ReportFormat::Text,
        }
    }

    #[test]
    fn clean_workspace_exits_zero() {
        let tmp = workspace(&[
            ("a.src", "def x: int\n"),
            ("b.src", "import \"a.src\"\nuse x\n"),
        ]);
        assert_eq!(run(&args(&[]), &global(tmp.path())).unwrap(), 0);
    }

    #[test]
    fn errors_exit_one() {
        let tmp = workspace(&[("a.src", "use missing\n")]);
        assert_eq!(run(&args(&[]), &global(tmp.path())).unwrap(), 1);
    }

    #[test]
    fn only_selected_files_are_reported() {
        let tmp = workspace(&[("good.src", "def x: int\n"), ("bad.src", "oops\n")]);
        assert_eq!(run(&args(&["good.src"]), &global(tmp.path())).unwrap(), 0);
        assert_eq!(run(&args(&["bad.src"]), &global(tmp.path())).unwrap(), 1);
    }

    #[test]
    fn import_cycle_is_an_error() {
        let tmp = workspace(&[
            ("a.src", "import \"b.src\"\n"),
            ("b.src", "import \"a.src\"\n"),
        ]);
        assert_eq!(run(&args(&[]), &global(tmp.path())).unwrap(), 1);
    }

    #[test]
    fn empty_workspace_is_clean() {
        let tmp = workspace(&[]);
        assert_eq!(run(&args(&[]), &global(tmp.path())).unwrap(), 0);
    }

    #[test]
    fn json_format() {
        let tmp = workspace(&[("a.src", "use missing\n")]);
        let args = CheckArgs {
            files: Vec::new(),
            format: ReportFormat::Json,
        };
        assert_eq!(run(&args, &global(tmp.path())).unwrap(), 1);
    }
}
