//! Handler for `trellis why`.

use miette::Result;

use trellis_ops::ops_resolve;

pub fn exec(module: &str) -> Result<()> {
    let project_root = super::project_root()?;
    ops_resolve::why(&project_root, module)
}
