//! Handler for `trellis resolve`.

use miette::Result;

use trellis_ops::ops_resolve::{self, ResolveOptions};

pub fn exec(depth: Option<usize>, reasons: bool, conflicts: bool) -> Result<()> {
    let project_root = super::project_root()?;
    let opts = ResolveOptions {
        depth,
        reasons,
        conflicts,
    };
    ops_resolve::resolve(&project_root, &opts)
}
