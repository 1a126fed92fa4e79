use indy_replay::domain::{BuildName, PackageType, TrackedContent, TrackedContentEntry, UrlPair};
use indy_replay::mapping::{alter_upload_path, download_entries, upload_entries};

fn entry(path: &str, store_key: &str) -> TrackedContentEntry {
    TrackedContentEntry {
        path: path.to_string(),
        store_key: store_key.to_string(),
        ..TrackedContentEntry::default()
    }
}

#[test]
fn download_scenario() {
    let name: BuildName = "build-test-912345".parse().unwrap();
    let record = TrackedContent {
        downloads: vec![entry("/foo/1.0/foo-1.0.jar", "maven:remote:central")],
        ..TrackedContent::default()
    };
    let jobs = download_entries("http://x", &name, PackageType::Maven, &record);
    assert_eq!(
        jobs.get("/foo/1.0/foo-1.0.jar"),
        Some(&UrlPair::new(
            "",
            "http://x/api/folo/track/build-test-912345/maven/group/build-test-912345/foo/1.0/foo-1.0.jar"
        ))
    );
}

#[test]
fn upload_scenario() {
    let name: BuildName = "build-test-912345".parse().unwrap();
    let record = TrackedContent {
        uploads: vec![entry("/foo/1.0-redhat-3/foo.pom", "maven:hosted:orig")],
        ..TrackedContent::default()
    };
    let jobs =
        upload_entries("http://orig", "http://x", &name, PackageType::Maven, &record).unwrap();
    let pair = &jobs["/foo/1.0-redhat-3/foo.pom"];
    assert!(pair.target.ends_with("/1.0-redhat-912345/foo.pom"));
    assert!(pair.source.ends_with("/api/content/maven/hosted/orig/foo/1.0-redhat-3/foo.pom"));
}

#[test]
fn npm_uploads_use_npm_group() {
    let name: BuildName = "build-test-900001".parse().unwrap();
    let record = TrackedContent {
        uploads: vec![entry("/pkg/-/pkg-1.0.0-redhat-00002.tgz", "npm:hosted:orig")],
        ..TrackedContent::default()
    };
    let jobs = upload_entries("http://orig", "http://x", &name, PackageType::Npm, &record).unwrap();
    assert_eq!(
        jobs["/pkg/-/pkg-1.0.0-redhat-00002.tgz"].target,
        "http://x/api/folo/track/build-test-900001/npm/group/build-test-900001/pkg/-/pkg-1.0.0-redhat-900001.tgz"
    );
}

#[test]
fn bad_store_key_fails_mapping() {
    let name: BuildName = "build-test-900001".parse().unwrap();
    let record = TrackedContent {
        uploads: vec![entry("/a/a.pom", "nonsense")],
        ..TrackedContent::default()
    };
    assert!(upload_entries("http://orig", "http://x", &name, PackageType::Maven, &record).is_err());
}

#[test]
fn rewrite_only_touches_qualifier() {
    assert_eq!(
        alter_upload_path("/redhat/tools/2.0.redhat-1/tools-2.0.redhat-1-sources.jar", "955555"),
        "/redhat/tools/2.0.redhat-955555/tools-2.0.redhat-955555-sources.jar"
    );
}
