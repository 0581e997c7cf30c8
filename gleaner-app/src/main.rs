use anyhow::Result;
use gleaner_common::observability::LogConfig;
use gleaner_config::{DEFAULT_CONFIG_FILE, SettingsLoader};
use pipeline::{Pipeline, startup};
mod pipeline;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = startup(
        SettingsLoader::new().with_file(DEFAULT_CONFIG_FILE),
        LogConfig::default(),
    )?;

    let pipeline = Pipeline::build(&settings).await?;
    pipeline.run(&settings.urls, &settings.output_path).await
}
