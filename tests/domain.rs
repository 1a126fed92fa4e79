use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use indy_replay::domain::{BuildName, PackageType, StoreKey, StoreType, TrackedContent};

#[test]
fn build_names_are_in_range() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let name = BuildName::generate_with(&mut rng);
        assert!(name.as_str().starts_with("build-test-"));
        let number: u32 = name.build_number().parse().unwrap();
        assert!((900_000..999_999).contains(&number));
        assert_eq!(name.build_number().len(), 6);
    }
}

#[test]
fn unseeded_build_names_differ() {
    let names = (0..20)
        .map(|_| BuildName::generate().to_string())
        .collect::<HashSet<_>>();
    assert!(names.len() > 1);
}

#[test]
fn tracking_record_with_null_lists() {
    let json = r#"{"key":{"id":"build-1"},"uploads":null,"downloads":null}"#;
    let record: TrackedContent = serde_json::from_str(json).unwrap();
    assert!(record.uploads.is_empty());
    assert!(record.downloads.is_empty());
    assert_eq!(record.key.id, "build-1");
}

#[test]
fn tracking_entry_store_key() {
    let record: TrackedContent = serde_json::from_str(
        r#"{
            "key": {"id": "build-1"},
            "uploads": [{
                "accessChannel": "NATIVE",
                "path": "/@scope/pkg/-/pkg-1.0.0-redhat-1.tgz",
                "storeKey": "npm:hosted:build-1",
                "md5": "abc",
                "size": 10,
                "timestamps": [1700000000000]
            }]
        }"#,
    )
    .unwrap();
    let key = record.uploads[0].store_key().unwrap();
    assert_eq!(key, StoreKey::new(PackageType::Npm, StoreType::Hosted, "build-1"));
}

#[test]
fn package_type_from_build_type() {
    assert_eq!(PackageType::from_build_type("NPM"), PackageType::Npm);
    assert_eq!(PackageType::from_build_type("MVN"), PackageType::Maven);
    assert_eq!("npm".parse::<PackageType>().unwrap(), PackageType::Npm);
    assert!("gradle".parse::<PackageType>().is_err());
}
