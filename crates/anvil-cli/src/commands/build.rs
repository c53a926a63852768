//! `anvil build` - build a target and its transitive producers

use super::CommonArgs;
use anyhow::Result;

pub struct BuildArgs {
    pub target: Option<String>,
    pub common: CommonArgs,
}

pub fn run(args: BuildArgs) -> Result<()> {
    super::execute(&args.common, args.target.as_deref())
}
