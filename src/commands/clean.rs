use roq::config::{RoqConfig, base_path_from_config};

use crate::CleanArgs;

pub async fn run(args: &CleanArgs) -> Result<(), anyhow::Error> {
    let (config, config_path) = RoqConfig::load_from_arg(args.config_file.as_deref())?;

    // Get the base path for resolving relative paths
    let base_path = base_path_from_config(&config_path);

    // Delete the generated site folder
    let site_path = base_path.join(&config.site.output);
    let site_path = site_path.canonicalize().unwrap_or(site_path);

    if site_path == base_path || base_path.starts_with(&site_path) {
        return Err(anyhow::anyhow!(
            "Refusing to delete {}: it contains the site sources",
            site_path.display()
        ));
    }

    if site_path.exists() {
        if args.dry_run {
            println!("Would delete {}", site_path.display());
        } else {
            tokio::fs::remove_dir_all(&site_path).await?;
            println!("Deleted {}", site_path.display());
        }
    } else {
        tracing::debug!("{} does not exist, nothing to clean", site_path.display());
    }

    Ok(())
}
