use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

pub const BUILD_TEST_PREFIX: &str = "build-test-";
pub const DEFAULT_SHARED_GROUP: &str = "builds-untested+shared-imports+public";
pub const DEFAULT_MVN_CENTRAL: &str = "central";
pub const DEFAULT_NPM_CENTRAL: &str = "npmjs";

const BUILD_NUMBER_MIN: u32 = 900_000;
const BUILD_NUMBER_MAX: u32 = 999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Maven,
    Npm,
}

impl PackageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Maven => "maven",
            PackageType::Npm => "npm",
        }
    }

    pub fn from_build_type(build_type: &str) -> Self {
        if build_type.eq_ignore_ascii_case("NPM") {
            PackageType::Npm
        } else {
            PackageType::Maven
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = ReplayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "maven" => Ok(PackageType::Maven),
            "npm" => Ok(PackageType::Npm),
            _ => Err(ReplayError::InvalidPackageType(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    Hosted,
    Group,
    Remote,
}

impl StoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreType::Hosted => "hosted",
            StoreType::Group => "group",
            StoreType::Remote => "remote",
        }
    }
}

impl FromStr for StoreType {
    type Err = ReplayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "hosted" => Ok(StoreType::Hosted),
            "group" => Ok(StoreType::Group),
            "remote" => Ok(StoreType::Remote),
            _ => Err(ReplayError::InvalidStoreKey(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub package_type: String,
    pub store_type: StoreType,
    pub name: String,
}

impl StoreKey {
    pub fn new(package_type: PackageType, store_type: StoreType, name: &str) -> Self {
        Self {
            package_type: package_type.as_str().to_string(),
            store_type,
            name: name.to_string(),
        }
    }

    pub fn to_path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.package_type,
            self.store_type.as_str(),
            self.name
        )
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.package_type,
            self.store_type.as_str(),
            self.name
        )
    }
}

impl FromStr for StoreKey {
    type Err = ReplayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts = value.trim().split(':').collect::<Vec<_>>();
        let (package_type, store_type, name) = match parts.as_slice() {
            [package_type, store_type, name] => (*package_type, *store_type, *name),
            // pre-package-type keys were always maven
            [store_type, name] => ("maven", *store_type, *name),
            _ => return Err(ReplayError::InvalidStoreKey(value.to_string())),
        };
        if package_type.is_empty() || name.is_empty() {
            return Err(ReplayError::InvalidStoreKey(value.to_string()));
        }
        let store_type = store_type
            .parse::<StoreType>()
            .map_err(|_| ReplayError::InvalidStoreKey(value.to_string()))?;
        Ok(Self {
            package_type: package_type.to_string(),
            store_type,
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingKey {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackedContent {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub uploads: Vec<TrackedContentEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub downloads: Vec<TrackedContentEntry>,
    #[serde(default)]
    pub key: TrackingKey,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedContentEntry {
    #[serde(default)]
    pub access_channel: String,
    pub path: String,
    #[serde(default)]
    pub origin_url: Option<String>,
    #[serde(default)]
    pub local_url: Option<String>,
    #[serde(default)]
    pub effect: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub timestamps: Option<Vec<i64>>,
    pub store_key: String,
}

impl TrackedContentEntry {
    pub fn store_key(&self) -> Result<StoreKey, ReplayError> {
        self.store_key.parse()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<TrackedContentEntry>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Vec<TrackedContentEntry>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    pub package_type: PackageType,
    pub central_name: String,
    pub shared_group: String,
}

impl BuildMetadata {
    pub fn for_package_type(package_type: PackageType) -> Self {
        Self::with_shared_group(package_type, DEFAULT_SHARED_GROUP)
    }

    pub fn with_shared_group(package_type: PackageType, shared_group: &str) -> Self {
        let central_name = match package_type {
            PackageType::Maven => DEFAULT_MVN_CENTRAL,
            PackageType::Npm => DEFAULT_NPM_CENTRAL,
        };
        Self {
            package_type,
            central_name: central_name.to_string(),
            shared_group: shared_group.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildName(String);

impl BuildName {
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rng())
    }

    pub fn generate_with<R: Rng>(rng: &mut R) -> Self {
        let number = rng.random_range(BUILD_NUMBER_MIN..BUILD_NUMBER_MAX);
        Self(format!("{BUILD_TEST_PREFIX}{number}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn build_number(&self) -> &str {
        self.0.strip_prefix(BUILD_TEST_PREFIX).unwrap_or(&self.0)
    }

    pub fn is_test_repo(name: &str) -> bool {
        name.starts_with(BUILD_TEST_PREFIX)
    }
}

impl fmt::Display for BuildName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BuildName {
    type Err = ReplayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let valid = trimmed
            .strip_prefix(BUILD_TEST_PREFIX)
            .map(|rest| !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit()))
            .unwrap_or(false);
        if !valid {
            return Err(ReplayError::InvalidBuildName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlPair {
    pub source: String,
    pub target: String,
}

impl UrlPair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn target_only(target: impl Into<String>) -> Self {
        Self::new(String::new(), target)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn parse_store_key() {
        let key: StoreKey = "maven:hosted:orig".parse().unwrap();
        assert_eq!(key.package_type, "maven");
        assert_eq!(key.store_type, StoreType::Hosted);
        assert_eq!(key.to_path(), "maven/hosted/orig");
        assert_eq!(key.to_string(), "maven:hosted:orig");
    }

    #[test]
    fn parse_legacy_store_key() {
        let key: StoreKey = "group:public".parse().unwrap();
        assert_eq!(key.to_path(), "maven/group/public");
    }

    #[test]
    fn parse_store_key_invalid() {
        assert_matches!(
            "maven:shelf:orig".parse::<StoreKey>(),
            Err(ReplayError::InvalidStoreKey(_))
        );
        assert_matches!(
            "orig".parse::<StoreKey>(),
            Err(ReplayError::InvalidStoreKey(_))
        );
    }

    #[test]
    fn build_metadata_defaults() {
        let maven = BuildMetadata::for_package_type(PackageType::Maven);
        assert_eq!(maven.central_name, "central");
        assert_eq!(maven.shared_group, DEFAULT_SHARED_GROUP);

        let npm = BuildMetadata::for_package_type(PackageType::Npm);
        assert_eq!(npm.central_name, "npmjs");
    }

    #[test]
    fn seeded_build_names_are_deterministic() {
        let first = BuildName::generate_with(&mut StdRng::seed_from_u64(7));
        let second = BuildName::generate_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(first, second);
    }

    #[test]
    fn build_name_number() {
        let name: BuildName = "build-test-912345".parse().unwrap();
        assert_eq!(name.build_number(), "912345");
        assert_matches!(
            "build-912345".parse::<BuildName>(),
            Err(ReplayError::InvalidBuildName(_))
        );
    }
}
