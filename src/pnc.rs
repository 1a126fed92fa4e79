use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::ReplayError;

pub trait PncClient: Send + Sync {
    fn fetch_build(&self, pnc_base: &str, build_id: &str) -> Result<String, ReplayError>;
    fn fetch_group_build(&self, pnc_base: &str, build_id: &str) -> Result<String, ReplayError>;
    fn fetch_dependency_graph(
        &self,
        pnc_base: &str,
        group_build_id: &str,
    ) -> Result<String, ReplayError>;
    fn fetch_align_log(&self, pnc_base: &str, build_id: &str) -> Result<String, ReplayError>;
}

#[derive(Clone)]
pub struct PncHttpClient {
    client: Client,
}

impl PncHttpClient {
    pub fn new(timeout_secs: u64) -> Result<Self, ReplayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("indy-replay/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ReplayError::PncHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| ReplayError::PncHttp(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn build_url(pnc_base: &str, build_id: &str) -> String {
        format!("{}/pnc-rest/v2/builds/{build_id}", pnc_base.trim_end_matches('/'))
    }

    pub fn group_build_url(pnc_base: &str, build_id: &str) -> String {
        format!(
            "{}/pnc-rest/v2/group-builds/{build_id}",
            pnc_base.trim_end_matches('/')
        )
    }

    fn get_text(&self, url: &str) -> Result<String, ReplayError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ReplayError::PncHttp(format!("{url}: {err}")))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "PNC request failed".to_string());
            return Err(ReplayError::PncStatus {
                status,
                url: url.to_string(),
                message,
            });
        }
        response
            .text()
            .map_err(|err| ReplayError::PncHttp(format!("{url}: {err}")))
    }
}

impl PncClient for PncHttpClient {
    fn fetch_build(&self, pnc_base: &str, build_id: &str) -> Result<String, ReplayError> {
        self.get_text(&Self::build_url(pnc_base, build_id))
    }

    fn fetch_group_build(&self, pnc_base: &str, build_id: &str) -> Result<String, ReplayError> {
        self.get_text(&Self::group_build_url(pnc_base, build_id))
    }

    fn fetch_dependency_graph(
        &self,
        pnc_base: &str,
        group_build_id: &str,
    ) -> Result<String, ReplayError> {
        let url = format!(
            "{}/dependency-graph",
            Self::group_build_url(pnc_base, group_build_id)
        );
        self.get_text(&url)
    }

    fn fetch_align_log(&self, pnc_base: &str, build_id: &str) -> Result<String, ReplayError> {
        let url = format!("{}/logs/align", Self::build_url(pnc_base, build_id));
        self.get_text(&url)
    }
}
