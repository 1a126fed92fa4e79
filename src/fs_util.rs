use std::fs;

use camino::Utf8Path;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ReplayError;

pub fn ensure_dir(path: &Utf8Path) -> Result<(), ReplayError> {
    fs::create_dir_all(path.as_std_path())
        .map_err(|err| ReplayError::Filesystem(format!("create {path}: {err}")))
}

pub fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<T, ReplayError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| ReplayError::Filesystem(format!("read {path}: {err}")))?;
    serde_json::from_str(&content).map_err(|err| ReplayError::DatasetParse {
        path: path.to_string(),
        message: err.to_string(),
    })
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ReplayError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    ensure_dir(parent)?;
    let temp = tempfile::Builder::new()
        .prefix(".indy-replay")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ReplayError::Filesystem(err.to_string()))?;
    fs::write(temp.path(), content).map_err(|err| ReplayError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| ReplayError::Filesystem(err.to_string()))?;
    Ok(())
}

pub fn write_json_pretty<T: Serialize + ?Sized>(
    path: &Utf8Path,
    value: &T,
) -> Result<(), ReplayError> {
    let content =
        serde_json::to_vec_pretty(value).map_err(|err| ReplayError::Filesystem(err.to_string()))?;
    write_bytes_atomic(path, &content)
}

pub fn format_json_file(path: &Utf8Path) -> Result<(), ReplayError> {
    let value: serde_json::Value = read_json(path)?;
    write_json_pretty(path, &value)
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn format_pretty_prints_in_place() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("build.json")).unwrap();
        fs::write(path.as_std_path(), br#"{"id":"1","temporaryBuild":false}"#).unwrap();

        format_json_file(&path).unwrap();

        let content = fs::read_to_string(path.as_std_path()).unwrap();
        assert!(content.contains("\n  \"id\": \"1\""));
    }

    #[test]
    fn malformed_json_names_the_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("info.json")).unwrap();
        fs::write(path.as_std_path(), b"{not json").unwrap();

        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        assert!(err.to_string().contains("info.json"));
    }
}
