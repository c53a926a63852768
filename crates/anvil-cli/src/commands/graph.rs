//! `anvil graph` - print the resolved build order

use super::CommonArgs;
use anyhow::Result;
use anvil_engine::BuildSession;

pub fn run(target: Option<&str>, common: CommonArgs) -> Result<()> {
    let project = super::load(&common)?;
    let session = BuildSession::new(&project.registry);
    let order = session.plan(&project.namespace, target)?;

    if common.json {
        println!("{}", serde_json::to_string_pretty(&order)?);
    } else {
        for name in order {
            println!("{}", name);
        }
    }
    Ok(())
}
