//! `anvil clean` - execute the @clean action

use super::CommonArgs;
use anyhow::Result;

pub fn run(common: CommonArgs) -> Result<()> {
    super::execute(&common, Some("@clean"))
}
