use miette::Result;

use dlindex_core::manifest::ENV_FILE;
use dlindex_util::redact::MASK;

use super::Context;

pub fn exec(ctx: &Context, reveal: bool) -> Result<()> {
    let project = ctx.project()?;
    let env_path = project.root.join(ENV_FILE);

    if project.env.is_empty() {
        println!("No environment variables configured.");
        println!("  {ENV_FILE}: {}", env_path.display());
        return Ok(());
    }

    println!("{ENV_FILE} ({} entries):", project.env.len());
    for (key, value) in &project.env {
        let display_value = if reveal { value.as_str() } else { MASK };
        println!("  {key} = {display_value}");
    }

    Ok(())
}
