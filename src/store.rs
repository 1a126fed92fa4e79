use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::ReplayError;
use crate::fs_util::ensure_dir;

pub const INFO_JSON: &str = "info.json";
pub const BUILD_JSON: &str = "build.json";
pub const GROUP_BUILD_JSON: &str = "group-build.json";
pub const DEPENDENCY_GRAPH_JSON: &str = "dependency-graph.json";
pub const BUILD_QUEUE_YAML: &str = "build-queue.yaml";
pub const DA_JSON: &str = "da.json";
pub const TRACKING_JSON: &str = "tracking.json";
pub const ALIGN_LOG: &str = "align.log";
pub const BUILDS_DIR: &str = "builds";

#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: Utf8PathBuf,
}

impl DatasetLayout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn build_dir(&self, build_id: &str) -> Utf8PathBuf {
        self.root.join(build_id)
    }

    pub fn info_path(&self, build_id: &str) -> Utf8PathBuf {
        self.build_dir(build_id).join(INFO_JSON)
    }

    pub fn build_json_path(&self, build_id: &str, group_build: bool) -> Utf8PathBuf {
        let name = if group_build { GROUP_BUILD_JSON } else { BUILD_JSON };
        self.build_dir(build_id).join(name)
    }

    pub fn dependency_graph_path(&self, build_id: &str) -> Utf8PathBuf {
        self.build_dir(build_id).join(DEPENDENCY_GRAPH_JSON)
    }

    pub fn build_queue_path(&self, build_id: &str) -> Utf8PathBuf {
        self.build_dir(build_id).join(BUILD_QUEUE_YAML)
    }

    pub fn sub_builds_dir(&self, build_id: &str) -> Utf8PathBuf {
        self.build_dir(build_id).join(BUILDS_DIR)
    }

    pub fn sub_build_dir(&self, build_id: &str, sub_build_id: &str) -> Utf8PathBuf {
        self.sub_builds_dir(build_id).join(sub_build_id)
    }
}

pub fn da_path(build_dir: &Utf8Path) -> Utf8PathBuf {
    build_dir.join(DA_JSON)
}

pub fn tracking_path(build_dir: &Utf8Path) -> Utf8PathBuf {
    build_dir.join(TRACKING_JSON)
}

pub fn align_log_path(build_dir: &Utf8Path) -> Utf8PathBuf {
    build_dir.join(ALIGN_LOG)
}

#[derive(Debug, Clone)]
pub struct Staging {
    download_dir: Utf8PathBuf,
    upload_dir: Utf8PathBuf,
}

impl Staging {
    pub fn new(download_dir: Utf8PathBuf, upload_dir: Utf8PathBuf) -> Self {
        Self {
            download_dir,
            upload_dir,
        }
    }

    pub fn ensure(&self) -> Result<(), ReplayError> {
        ensure_dir(&self.download_dir)?;
        ensure_dir(&self.upload_dir)
    }

    pub fn download_file(&self, url: &str) -> Utf8PathBuf {
        self.download_dir.join(url_basename(url))
    }

    pub fn upload_cache_file(&self, url: &str) -> Utf8PathBuf {
        self.upload_dir.join(url_basename(url))
    }

    pub fn clear_upload_cache(&self) -> Result<(), ReplayError> {
        if self.upload_dir.as_std_path().exists() {
            fs::remove_dir_all(self.upload_dir.as_std_path())
                .map_err(|err| ReplayError::Filesystem(err.to_string()))?;
        }
        ensure_dir(&self.upload_dir)
    }
}

pub fn url_basename(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(without_query)
}
