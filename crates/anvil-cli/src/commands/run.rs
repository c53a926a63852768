//! `anvil run` - build and execute the @run action

use super::CommonArgs;
use anyhow::Result;

pub fn run(common: CommonArgs) -> Result<()> {
    super::execute(&common, Some("@run"))
}
