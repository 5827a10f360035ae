//! `strata gc`: prune the interface cache.

use crate::workspace::Workspace;
use crate::GlobalArgs;

/// Runs the `strata gc` command.
///
/// Every source file under the configured roots counts as live. Interfaces
/// persisted for files that no longer exist are forgotten and their artifacts
/// deleted.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let workspace = Workspace::open(global)?;
    if !workspace.config.engine.persist_interfaces {
        if !global.quiet {
            eprintln!("warning: interface persistence is disabled, nothing to collect");
        }
        return Ok(0);
    }

    let runtime = workspace.runtime()?;
    let report = runtime.block_on(async {
        let host = workspace.host()?;
        host.set_files_of_interest(host.discover()?)?;
        let report = host.collect_garbage();
        host.shutdown();
        Ok::<_, Box<dyn std::error::Error>>(report?)
    })?;

    if !global.quiet {
        eprintln!("   Removed {} interface artifact(s)", report.artifacts);
    }
    Ok(0)
}
