use std::sync::LazyLock;

use regex::Regex;

use crate::error::ReplayError;

static MAVEN_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)REST Client returned.*?\}").unwrap());
static NPM_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)Got project manipulator result data.*?\}""#).unwrap());

pub const BUILD_TYPE_MVN: &str = "MVN";
pub const BUILD_TYPE_NPM: &str = "NPM";

pub fn metadata_paths(align_log: &str, build_type: &str) -> Result<Vec<String>, ReplayError> {
    match build_type {
        BUILD_TYPE_MVN => Ok(maven_metadata_paths(align_log)),
        BUILD_TYPE_NPM => Ok(npm_metadata_paths(align_log)),
        other => Err(ReplayError::InvalidBuildType(other.to_string())),
    }
}

pub fn maven_metadata_paths(align_log: &str) -> Vec<String> {
    let mut paths = Vec::new();
    for block in MAVEN_BLOCK_RE.find_iter(align_log) {
        let Some(gavs) = block_body(block.as_str(), 1) else {
            continue;
        };
        let mut count = 0usize;
        for gav in gavs.split(',') {
            let mut parts = gav.split(':');
            let (Some(group_id), Some(artifact_id)) = (parts.next(), parts.next()) else {
                continue;
            };
            let group_id = group_id.trim();
            let artifact_id = artifact_id.trim();
            if group_id.is_empty() || artifact_id.is_empty() {
                continue;
            }
            paths.push(format!(
                "{}/{artifact_id}/maven-metadata.xml",
                group_id.replace('.', "/")
            ));
            count += 1;
        }
        tracing::debug!(count, "metadata paths in alignment block");
    }
    tracing::info!(total = paths.len(), "maven metadata paths extracted");
    paths
}

pub fn npm_metadata_paths(align_log: &str) -> Vec<String> {
    let mut paths = Vec::new();
    for block in NPM_BLOCK_RE.find_iter(align_log) {
        let Some(items) = block_body(block.as_str(), 2) else {
            continue;
        };
        for item in items.split(',') {
            let Some((key, value)) = item.split_once(':') else {
                continue;
            };
            let key = key.trim().trim_matches('"');
            let value = value.trim().trim_matches('"');
            if key == "name" {
                paths.push(value.to_string());
                break;
            }
        }
    }
    tracing::info!(total = paths.len(), "npm metadata paths extracted");
    paths
}

fn block_body(block: &str, tail: usize) -> Option<&str> {
    let start = block.find('{')? + 1;
    let end = block.len().checked_sub(tail)?;
    if start >= end {
        return None;
    }
    Some(&block[start..end])
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn maven_paths_from_rest_client_blocks() {
        let log = "\
[INFO] REST Client returned {org.apache.commons:commons-lang3:3.12.0, io.netty:netty-all:4.1.0}
[INFO] something else
[INFO] REST Client returned {}
";
        assert_eq!(
            maven_metadata_paths(log),
            vec![
                "org/apache/commons/commons-lang3/maven-metadata.xml",
                "io/netty/netty-all/maven-metadata.xml",
            ]
        );
    }

    #[test]
    fn maven_block_may_span_lines() {
        let log = "REST Client returned {com.example:a:1,\n com.example:b:2}";
        assert_eq!(maven_metadata_paths(log).len(), 2);
    }

    #[test]
    fn npm_name_from_manipulator_result() {
        let log = r#"[INFO] Got project manipulator result data: "{"name":"@scope/pkg","version":"1.0.0-redhat-00001"}""#;
        assert_eq!(npm_metadata_paths(log), vec!["@scope/pkg"]);
    }

    #[test]
    fn unknown_build_type_is_rejected() {
        assert_matches!(
            metadata_paths("", "GRADLE"),
            Err(ReplayError::InvalidBuildType(_))
        );
    }
}
