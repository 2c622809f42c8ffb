use std::path::PathBuf;

use hf_hub::api::tokio::{Api, ApiError};

/// Download a model's `config.json` from the Hugging Face Hub.
/// If the file exists in the cache, it will not be downloaded again.
pub async fn download_model_config(model_name: &str) -> Result<PathBuf, ApiError> {
    let api = Api::new()?;
    let repo = api.model(model_name.to_string());

    let config_filepath = repo.get("config.json").await?;

    debug!("{} config cached at {}", model_name, config_filepath.display());

    Ok(config_filepath)
}
