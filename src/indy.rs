use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::Value;

use crate::domain::{BuildMetadata, BuildName, PackageType, StoreKey, StoreType, TrackedContent};
use crate::error::ReplayError;
use crate::mapping::normalize_base_url;

pub trait IndyClient: Send + Sync {
    fn download(&self, url: &str, destination: &Path) -> Result<(), ReplayError>;
    fn upload(&self, url: &str, source: &Path) -> Result<(), ReplayError>;
    fn get_text(&self, url: &str) -> Result<String, ReplayError>;
    fn put_json(&self, url: &str, body: &Value) -> Result<(), ReplayError>;
    fn post_json(&self, url: &str, body: Option<&Value>) -> Result<String, ReplayError>;
    fn delete(&self, url: &str) -> Result<(), ReplayError>;
}

#[derive(Clone)]
pub struct IndyHttpClient {
    client: Client,
}

impl IndyHttpClient {
    pub fn new(timeout_secs: u64) -> Result<Self, ReplayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("indy-replay/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ReplayError::IndyHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| ReplayError::IndyHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn handle_status(url: &str, response: Response) -> Result<Response, ReplayError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Indy request failed".to_string());
        Err(ReplayError::IndyStatus {
            status,
            url: url.to_string(),
            message,
        })
    }

    fn send(
        &self,
        url: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<Response, ReplayError> {
        let response = request
            .send()
            .map_err(|err| ReplayError::IndyHttp(format!("{url}: {err}")))?;
        Self::handle_status(url, response)
    }
}

impl IndyClient for IndyHttpClient {
    fn download(&self, url: &str, destination: &Path) -> Result<(), ReplayError> {
        let mut response = self.send(url, self.client.get(url))?;
        let mut file =
            File::create(destination).map_err(|err| ReplayError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| ReplayError::Filesystem(err.to_string()))?;
        Ok(())
    }

    fn upload(&self, url: &str, source: &Path) -> Result<(), ReplayError> {
        let file = File::open(source).map_err(|err| {
            ReplayError::Filesystem(format!("open {}: {err}", source.display()))
        })?;
        self.send(url, self.client.put(url).body(file))?;
        Ok(())
    }

    fn get_text(&self, url: &str) -> Result<String, ReplayError> {
        let response = self.send(url, self.client.get(url))?;
        response
            .text()
            .map_err(|err| ReplayError::IndyHttp(format!("{url}: {err}")))
    }

    fn put_json(&self, url: &str, body: &Value) -> Result<(), ReplayError> {
        self.send(
            url,
            self.client
                .put(url)
                .header(CONTENT_TYPE, "application/json")
                .json(body),
        )?;
        Ok(())
    }

    fn post_json(&self, url: &str, body: Option<&Value>) -> Result<String, ReplayError> {
        let mut request = self.client.post(url).header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.send(url, request)?;
        response
            .text()
            .map_err(|err| ReplayError::IndyHttp(format!("{url}: {err}")))
    }

    fn delete(&self, url: &str) -> Result<(), ReplayError> {
        self.send(url, self.client.delete(url))?;
        Ok(())
    }
}

pub fn store_admin_url(
    base: &str,
    package_type: PackageType,
    store_type: StoreType,
    name: &str,
) -> String {
    format!(
        "{}api/admin/stores/{package_type}/{}/{name}",
        normalize_base_url(base),
        store_type.as_str()
    )
}

pub fn folo_record_url(base: &str, tracking_id: &str) -> String {
    format!(
        "{}api/folo/admin/{tracking_id}/record",
        normalize_base_url(base)
    )
}

pub fn folo_report_url(base: &str, build_id: &str) -> String {
    format!(
        "{}api/folo/admin/build-{build_id}/report",
        normalize_base_url(base)
    )
}

pub fn fetch_tracking_record(
    client: &dyn IndyClient,
    base: &str,
    tracking_id: &str,
) -> Result<TrackedContent, ReplayError> {
    let url = folo_record_url(base, tracking_id);
    tracing::info!(%url, "fetching folo tracking record");
    let body = client.get_text(&url)?;
    serde_json::from_str(&body).map_err(|err| ReplayError::DatasetParse {
        path: url,
        message: err.to_string(),
    })
}

pub fn seal_tracking_record(
    client: &dyn IndyClient,
    base: &str,
    tracking_id: &str,
) -> Result<(), ReplayError> {
    client.post_json(&folo_record_url(base, tracking_id), None)?;
    Ok(())
}

pub fn hosted_store_body(package_type: PackageType, name: &BuildName) -> Value {
    let key = StoreKey::new(package_type, StoreType::Hosted, name.as_str());
    serde_json::json!({
        "type": "hosted",
        "key": key.to_string(),
        "packageType": package_type.as_str(),
        "name": name.as_str(),
        "description": format!("Scratch hosted repository for replay {name}"),
        "disabled": false,
        "allow_snapshots": true,
        "allow_releases": true,
        "authoritative_index": false,
        "metadata": {
            "changelog": format!("Create hosted repository {name}")
        }
    })
}

pub fn group_store_body(meta: &BuildMetadata, name: &BuildName) -> Value {
    let key = StoreKey::new(meta.package_type, StoreType::Group, name.as_str());
    let constituents = vec![
        StoreKey::new(meta.package_type, StoreType::Hosted, name.as_str()).to_string(),
        StoreKey::new(meta.package_type, StoreType::Group, &meta.shared_group).to_string(),
    ];
    serde_json::json!({
        "type": "group",
        "key": key.to_string(),
        "packageType": meta.package_type.as_str(),
        "name": name.as_str(),
        "description": format!("Scratch group for replay {name}"),
        "disabled": false,
        "constituents": constituents,
        "metadata": {
            "changelog": format!("Create group {name}")
        }
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsPromoteRequest {
    pub source: String,
    pub target: String,
    pub paths: Vec<String>,
    pub purge_source: bool,
    pub dry_run: bool,
    pub fire_events: bool,
}

impl PathsPromoteRequest {
    pub fn new(source: &StoreKey, target: &StoreKey, paths: Vec<String>) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            paths,
            purge_source: false,
            dry_run: false,
            fire_events: true,
        }
    }
}

pub fn promote_url(base: &str) -> String {
    format!("{}api/promotion/paths/promote", normalize_base_url(base))
}

pub fn rollback_url(base: &str) -> String {
    format!("{}api/promotion/paths/rollback", normalize_base_url(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_urls() {
        assert_eq!(
            store_admin_url(
                "indy:8080",
                PackageType::Maven,
                StoreType::Hosted,
                "build-test-900001"
            ),
            "http://indy:8080/api/admin/stores/maven/hosted/build-test-900001"
        );
        assert_eq!(
            folo_report_url("http://indy/", "AMJMVSDA5EAAA"),
            "http://indy/api/folo/admin/build-AMJMVSDA5EAAA/report"
        );
    }

    #[test]
    fn group_body_lists_hosted_and_shared_group() {
        let name: BuildName = "build-test-900001".parse().unwrap();
        let meta = BuildMetadata::for_package_type(PackageType::Npm);
        let body = group_store_body(&meta, &name);
        assert_eq!(body["key"], "npm:group:build-test-900001");
        assert_eq!(
            body["constituents"],
            serde_json::json!([
                "npm:hosted:build-test-900001",
                "npm:group:builds-untested+shared-imports+public"
            ])
        );
    }
}
