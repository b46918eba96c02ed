//! Handler for `trellis lock`.

use miette::Result;

use trellis_ops::ops_lock;

pub fn exec(verbose: bool) -> Result<()> {
    let project_root = super::project_root()?;
    ops_lock::lock(&project_root, verbose)
}
