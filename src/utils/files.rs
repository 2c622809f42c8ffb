use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, io};

/// Read a JSON document from the given path
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> io::Result<T> {
    let bytes = fs::read(path).await?;

    Ok(serde_json::from_slice(&bytes)?)
}

/// Write a value as pretty-printed JSON, creating parent directories as needed
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');

    fs::write(path, json).await
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn writes_into_missing_directories() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested/deeper/values.json");

        let values = BTreeMap::from([("eval_f1".to_string(), 0.5)]);
        write_json(&path, &values).await?;

        let read: BTreeMap<String, f64> = read_json(&path).await?;
        assert_eq!(read, values);

        Ok(())
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_data() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").await?;

        let err = read_json::<BTreeMap<String, f64>>(&path).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        Ok(())
    }
}
