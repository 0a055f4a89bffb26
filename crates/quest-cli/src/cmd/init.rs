use crate::output::print_json;
use anyhow::Context;
use quest_core::config::Config;
use std::path::Path;

pub fn run(root: &Path, project: &str, json: bool) -> anyhow::Result<()> {
    let config_path = quest_core::paths::config_path(root);
    if config_path.exists() {
        anyhow::bail!("already initialized: {}", config_path.display());
    }

    let config = Config::new(project);
    config.save(root).context("failed to write config")?;

    if json {
        print_json(&serde_json::json!({
            "project": project,
            "config": config_path,
        }))?;
    } else {
        println!("Initialized project '{project}' in {}", root.display());
    }
    Ok(())
}
