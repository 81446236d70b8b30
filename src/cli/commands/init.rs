//! Init command - create tierbox.toml for a project

use crate::cli::args::InitArgs;
use crate::config::schema::PROJECT_TEMPLATE;
use crate::config::{project_name_from_dir, ConfigManager};
use crate::error::{TierboxError, TierboxResult};
use crate::ui::{self, UiContext};
use std::path::{Path, PathBuf};
use tokio::fs;
use toml_edit::DocumentMut;

/// Execute the init command
pub async fn execute(args: InitArgs, manager: &ConfigManager) -> TierboxResult<()> {
    let ctx = UiContext::detect();

    let target_dir = match args.path {
        Some(ref p) => p.clone(),
        None => {
            std::env::current_dir().map_err(|e| TierboxError::io("getting current directory", e))?
        }
    };

    let config_path = write_project_config(&target_dir, args.force).await?;
    ui::step_ok_detail(
        &ctx,
        "Created project config",
        &config_path.display().to_string(),
    );

    if manager.ensure_global().await? {
        ui::step_ok_detail(
            &ctx,
            "Created global config",
            &manager.path().display().to_string(),
        );
    }

    ui::remark(
        &ctx,
        "Add packages and envs under [[install]], then run: tierbox",
    );
    Ok(())
}

/// Write a project config named after `dir`; refuses to overwrite unless
/// `force` is set
async fn write_project_config(dir: &Path, force: bool) -> TierboxResult<PathBuf> {
    let config_path = ConfigManager::project_config_path(dir);

    if config_path.exists() && !force {
        return Err(TierboxError::User(format!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        )));
    }

    ensure_dir(dir).await?;

    // Relative paths like "." have no file name until canonicalized
    let named_dir = fs::canonicalize(dir)
        .await
        .unwrap_or_else(|_| dir.to_path_buf());
    let content = render_template(&project_name_from_dir(&named_dir))?;

    fs::write(&config_path, content)
        .await
        .map_err(|e| TierboxError::io(format!("writing {}", config_path.display()), e))?;

    Ok(config_path)
}

/// Fill the project name into the template, keeping its comments
fn render_template(name: &str) -> TierboxResult<String> {
    let mut doc: DocumentMut = PROJECT_TEMPLATE.parse()?;
    doc["project"]["name"] = toml_edit::value(name);
    Ok(doc.to_string())
}

async fn ensure_dir(dir: &Path) -> TierboxResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| TierboxError::io(format!("creating directory {}", dir.display()), e))?;
    }
    Ok(())
}
