use roq::build::Builder;
use roq::config::{RoqConfig, Strictness, base_path_from_config};

use crate::BuildArgs;

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    let (mut config, config_path) = RoqConfig::load_from_arg(args.config_file.as_deref())?;

    // Command line flags only ever widen what the file allows
    config.site.draft |= args.drafts;
    config.site.future |= args.future;
    if args.strict {
        config.strictness = Strictness::FailFast;
    }

    // Get the base path for resolving relative paths
    let base_path = base_path_from_config(&config_path);

    let builder = Builder::new(config, base_path);
    let result = builder.build().await?;

    println!(
        "Built site to {} ({} pages, {} redirects, {} static files; {} written, {} unchanged)",
        result.output_dir.display(),
        result.pages,
        result.redirects,
        result.static_files,
        result.files_written,
        result.unchanged
    );

    Ok(())
}
