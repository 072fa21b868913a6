//! Resolve command.

use std::path::Path;

use crate::topology::TopologyResolver;

/// Print each project root on its own line. Resolution problems go to stderr.
pub fn run(workspace: &Path) -> anyhow::Result<()> {
    let resolver = TopologyResolver::new();
    match resolver.try_resolve(workspace) {
        Ok(roots) => {
            for root in roots {
                println!("{root}");
            }
        }
        Err(e) => eprintln!("warning: {e}"),
    }
    Ok(())
}
