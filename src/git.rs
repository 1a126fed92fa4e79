use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::ReplayError;

pub trait DatasetSource: Send + Sync {
    fn fetch(&self, repo: &str, clear_cache: bool) -> Result<Utf8PathBuf, ReplayError>;
}

#[derive(Debug, Clone)]
pub struct GitDatasetSource {
    cache_dir: Utf8PathBuf,
    git: Option<PathBuf>,
}

impl GitDatasetSource {
    pub fn new(cache_dir: Utf8PathBuf) -> Self {
        Self {
            cache_dir,
            git: find_in_path("git"),
        }
    }

    pub fn clone_dir(&self, repo: &str) -> Utf8PathBuf {
        self.cache_dir.join(repo_dir_name(repo))
    }

    fn run_git(&self, args: &[&str], cwd: Option<&Path>) -> Result<(), ReplayError> {
        let git = self
            .git
            .as_ref()
            .ok_or_else(|| ReplayError::MissingTool("git".to_string()))?;
        let mut cmd = Command::new(git);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = cmd
            .output()
            .map_err(|err| ReplayError::GitClone(err.to_string()))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("git {} failed", args.join(" "))
        } else {
            stderr
        };
        Err(ReplayError::GitClone(message))
    }
}

impl DatasetSource for GitDatasetSource {
    fn fetch(&self, repo: &str, clear_cache: bool) -> Result<Utf8PathBuf, ReplayError> {
        let local = Utf8Path::new(repo);
        if local.as_std_path().is_dir() {
            tracing::info!(dir = %local, "using local dataset directory");
            return Ok(local.to_path_buf());
        }

        let target = self.clone_dir(repo);
        if clear_cache && target.as_std_path().exists() {
            tracing::info!(dir = %target, "clearing cached dataset clone");
            fs::remove_dir_all(target.as_std_path())
                .map_err(|err| ReplayError::Filesystem(err.to_string()))?;
        }
        if target.as_std_path().exists() {
            tracing::info!(dir = %target, "updating cached dataset clone");
            self.run_git(&["pull", "--ff-only"], Some(target.as_std_path()))?;
            return Ok(target);
        }

        fs::create_dir_all(self.cache_dir.as_std_path())
            .map_err(|err| ReplayError::Filesystem(err.to_string()))?;
        tracing::info!(%repo, dir = %target, "cloning dataset repository");
        self.run_git(&["clone", "--depth", "1", repo, target.as_str()], None)?;
        Ok(target)
    }
}

pub fn repo_dir_name(repo: &str) -> String {
    let name = repo
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(repo);
    let name = name.strip_suffix(".git").unwrap_or(name);
    if name.is_empty() {
        "dataset".to_string()
    } else {
        name.to_string()
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_names() {
        assert_eq!(
            repo_dir_name("https://gitlab.example.com/nos/nos-integrationtest-dataset"),
            "nos-integrationtest-dataset"
        );
        assert_eq!(repo_dir_name("git@gitlab.example.com:nos/data.git"), "data");
    }

    #[test]
    fn local_directory_is_used_directly() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let source = GitDatasetSource::new(dir.join("cache"));
        assert_eq!(source.fetch(dir.as_str(), false).unwrap(), dir);
    }
}
