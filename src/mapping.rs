use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{BuildName, PackageType, TrackedContent, UrlPair};
use crate::error::ReplayError;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"redhat-([0-9]+)").unwrap());

pub type JobMap = BTreeMap<String, UrlPair>;

pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim();
    let mut base = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

pub fn server_root(url: &str) -> Result<String, ReplayError> {
    let parsed =
        reqwest::Url::parse(url).map_err(|err| ReplayError::InvalidUrl(format!("{url}: {err}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ReplayError::InvalidUrl(url.to_string()))?;
    Ok(match parsed.port() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    })
}

pub fn join_path(parts: &[&str]) -> String {
    let mut joined = String::new();
    for part in parts.iter().filter(|part| !part.is_empty()) {
        if joined.is_empty() {
            joined.push_str(part);
            continue;
        }
        match (joined.ends_with('/'), part.starts_with('/')) {
            (true, true) => joined.push_str(&part[1..]),
            (false, false) => {
                joined.push('/');
                joined.push_str(part);
            }
            _ => joined.push_str(part),
        }
    }
    joined
}

pub fn alter_upload_path(raw_path: &str, build_number: &str) -> String {
    VERSION_RE
        .replace_all(raw_path, format!("redhat-{build_number}").as_str())
        .into_owned()
}

/// `{target}api/folo/track/{build}/{type}/group/{build}{path}`
pub fn folo_track_url(
    target_base: &str,
    build_name: &BuildName,
    package_type: PackageType,
    path: &str,
) -> String {
    let base = normalize_base_url(target_base);
    let group = format!(
        "{base}api/folo/track/{build}/{package_type}/group/{build}",
        build = build_name.as_str()
    );
    join_path(&[&group, path])
}

pub fn content_url(base: &str, store_path: &str, path: &str) -> String {
    let base = normalize_base_url(base);
    join_path(&[&base, "api/content", store_path, path])
}

pub fn download_entries(
    target_base: &str,
    build_name: &BuildName,
    package_type: PackageType,
    record: &TrackedContent,
) -> JobMap {
    let mut jobs = JobMap::new();
    for entry in &record.downloads {
        let target = folo_track_url(target_base, build_name, package_type, &entry.path);
        jobs.insert(entry.path.clone(), UrlPair::target_only(target));
    }
    jobs
}

pub fn upload_entries(
    original_base: &str,
    target_base: &str,
    build_name: &BuildName,
    package_type: PackageType,
    record: &TrackedContent,
) -> Result<JobMap, ReplayError> {
    let mut jobs = JobMap::new();
    for entry in &record.uploads {
        let store_key = entry.store_key()?;
        let source = content_url(original_base, &store_key.to_path(), &entry.path);
        let altered = alter_upload_path(&entry.path, build_name.build_number());
        let target = folo_track_url(target_base, build_name, package_type, &altered);
        jobs.insert(entry.path.clone(), UrlPair::new(source, target));
    }
    Ok(jobs)
}

pub fn original_base_url(record: &TrackedContent) -> Option<String> {
    record
        .uploads
        .iter()
        .filter_map(|entry| entry.local_url.as_deref())
        .find_map(|url| server_root(url).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrackedContentEntry;

    fn entry(path: &str, store_key: &str) -> TrackedContentEntry {
        TrackedContentEntry {
            path: path.to_string(),
            store_key: store_key.to_string(),
            ..TrackedContentEntry::default()
        }
    }

    fn build_name() -> BuildName {
        "build-test-912345".parse().unwrap()
    }

    #[test]
    fn normalize_adds_scheme_and_slash() {
        assert_eq!(normalize_base_url("indy.example.com"), "http://indy.example.com/");
        assert_eq!(normalize_base_url("https://indy/"), "https://indy/");
    }

    #[test]
    fn join_collapses_slashes() {
        assert_eq!(join_path(&["http://x/", "/api", "a/", "/b"]), "http://x/api/a/b");
        assert_eq!(join_path(&["a", "", "b"]), "a/b");
    }

    #[test]
    fn alter_rewrites_every_qualifier() {
        assert_eq!(
            alter_upload_path("/org/foo/1.0.0.redhat-00003/foo-1.0.0.redhat-00003.jar", "912345"),
            "/org/foo/1.0.0.redhat-912345/foo-1.0.0.redhat-912345.jar"
        );
    }

    #[test]
    fn alter_without_qualifier_is_noop() {
        let path = "/org/foo/1.0/foo-1.0.pom";
        assert_eq!(alter_upload_path(path, "912345"), path);
    }

    #[test]
    fn alter_is_idempotent() {
        let once = alter_upload_path("/a/1.0-redhat-3/a.pom", "912345");
        assert_eq!(alter_upload_path(&once, "912345"), once);
    }

    #[test]
    fn download_mapping_uses_scratch_group() {
        let record = TrackedContent {
            downloads: vec![entry("/foo/1.0/foo-1.0.jar", "maven:remote:central")],
            ..TrackedContent::default()
        };
        let jobs = download_entries("http://x", &build_name(), PackageType::Maven, &record);
        assert_eq!(
            jobs["/foo/1.0/foo-1.0.jar"],
            UrlPair::target_only(
                "http://x/api/folo/track/build-test-912345/maven/group/build-test-912345/foo/1.0/foo-1.0.jar"
            )
        );
    }

    #[test]
    fn upload_mapping_rewrites_target_only() {
        let record = TrackedContent {
            uploads: vec![entry("/foo/1.0-redhat-3/foo.pom", "maven:hosted:orig")],
            ..TrackedContent::default()
        };
        let jobs = upload_entries(
            "http://orig",
            "http://x",
            &build_name(),
            PackageType::Maven,
            &record,
        )
        .unwrap();
        let pair = &jobs["/foo/1.0-redhat-3/foo.pom"];
        assert_eq!(
            pair.source,
            "http://orig/api/content/maven/hosted/orig/foo/1.0-redhat-3/foo.pom"
        );
        assert!(pair.target.ends_with("/1.0-redhat-912345/foo.pom"));
    }

    #[test]
    fn duplicate_paths_keep_last_entry() {
        let record = TrackedContent {
            uploads: vec![
                entry("/a/a.pom", "maven:hosted:first"),
                entry("/a/a.pom", "maven:hosted:second"),
            ],
            ..TrackedContent::default()
        };
        let jobs =
            upload_entries("o", "t", &build_name(), PackageType::Maven, &record).unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(jobs["/a/a.pom"].source.contains("/hosted/second/"));
    }

    #[test]
    fn original_base_from_local_url() {
        let mut upload = entry("/a/a.pom", "maven:hosted:orig");
        upload.local_url =
            Some("http://indy.example.com:8080/api/content/maven/hosted/orig/a/a.pom".to_string());
        let record = TrackedContent {
            uploads: vec![upload],
            ..TrackedContent::default()
        };
        assert_eq!(
            original_base_url(&record).as_deref(),
            Some("http://indy.example.com:8080")
        );
    }
}
