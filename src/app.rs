use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::Value;

use crate::align;
use crate::config::Settings;
use crate::dataset::{BuildQueue, DatasetInfo, DependencyGraph, parse_build_summary};
use crate::dispatch::{DispatchReport, run_jobs};
use crate::domain::{
    BuildMetadata, BuildName, PackageType, StoreKey, StoreType, TrackedContent, UrlPair,
};
use crate::error::ReplayError;
use crate::fs_util::{
    ensure_dir, format_json_file, read_json, write_bytes_atomic, write_json_pretty,
};
use crate::git::DatasetSource;
use crate::indy::{
    IndyClient, PathsPromoteRequest, fetch_tracking_record, folo_report_url, promote_url,
    rollback_url, seal_tracking_record,
};
use crate::mapping::{
    JobMap, alter_upload_path, content_url, download_entries, original_base_url, upload_entries,
};
use crate::pnc::PncClient;
use crate::repos::{delete_test_repos, prepare_repos};
use crate::store::{DatasetLayout, Staging, align_log_path, da_path, tracking_path};

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub dry_run: bool,
    pub clear_cache: bool,
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayResult {
    pub build_name: String,
    pub package_type: String,
    pub target_indy: String,
    pub downloads: DispatchReport,
    pub uploads: DispatchReport,
    pub uploaded_paths: Vec<String>,
    pub sealed: bool,
    pub started_at: String,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone)]
pub struct IntegrationRequest {
    pub indy_base_url: String,
    pub dataset_repo: String,
    pub build_id: String,
    pub promote_target: Option<String>,
    pub migrate_target: Option<String>,
    pub dry_run: bool,
    pub clear_cache: bool,
    pub keep_repos: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationResult {
    pub build_id: String,
    pub dataset_dir: String,
    pub report_path: String,
    pub builds: Vec<BuildRunResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildRunResult {
    pub build_dir: String,
    pub metadata: Option<DispatchReport>,
    pub replay: ReplayResult,
    pub promoted: bool,
    pub rolled_back: bool,
    pub cleaned_up: bool,
}

#[derive(Debug, Clone)]
pub struct DatasetRequest {
    pub pnc_base_url: String,
    pub indy_base_url: String,
    pub build_id: String,
    pub group_build: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetResult {
    pub build_id: String,
    pub dataset_dir: String,
    pub build_type: String,
    pub builds: Vec<String>,
    pub written: Vec<String>,
    pub missing_tracking: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupResult {
    pub build_name: String,
    pub deleted: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    pub fn phase(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            elapsed: None,
        }
    }

    pub fn finished(message: impl Into<String>, started: Instant) -> Self {
        Self {
            message: message.into(),
            elapsed: Some(started.elapsed()),
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<I: IndyClient, P: PncClient, D: DatasetSource> {
    settings: Settings,
    indy: I,
    pnc: P,
    datasets: D,
}

impl<I: IndyClient, P: PncClient, D: DatasetSource> App<I, P, D> {
    pub fn new(settings: Settings, indy: I, pnc: P, datasets: D) -> Self {
        Self {
            settings,
            indy,
            pnc,
            datasets,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn indy(&self) -> &I {
        &self.indy
    }

    pub fn build_test(
        &self,
        original_indy: &str,
        folo_id: &str,
        target_indy: &str,
        package_type: PackageType,
        options: ReplayOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ReplayResult, ReplayError> {
        sink.event(ProgressEvent::phase(format!(
            "phase=Resolve; folo record {folo_id}"
        )));
        let record = fetch_tracking_record(&self.indy, original_indy, folo_id)?;
        self.replay(original_indy, target_indy, package_type, &record, options, sink)
    }

    pub fn replay(
        &self,
        original_indy: &str,
        target_indy: &str,
        package_type: PackageType,
        record: &TrackedContent,
        options: ReplayOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ReplayResult, ReplayError> {
        self.replay_as(
            BuildName::generate(),
            original_indy,
            target_indy,
            package_type,
            record,
            options,
            sink,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn replay_as(
        &self,
        build_name: BuildName,
        original_indy: &str,
        target_indy: &str,
        package_type: PackageType,
        record: &TrackedContent,
        options: ReplayOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ReplayResult, ReplayError> {
        let start = Instant::now();
        let started_at = iso_timestamp();
        let meta = BuildMetadata::with_shared_group(package_type, &self.settings.shared_group);

        sink.event(ProgressEvent::phase(format!(
            "phase=Prepare; scratch repos {build_name}"
        )));
        prepare_repos(&self.indy, target_indy, &build_name, &meta, options.dry_run)?;

        let staging = Staging::new(
            self.settings.download_dir.clone(),
            self.settings.upload_dir.clone(),
        );
        staging.ensure()?;
        if options.clear_cache {
            staging.clear_upload_cache()?;
        }

        let downloads = download_entries(target_indy, &build_name, package_type, record);
        let download_report =
            self.run_phase("downloads", options.workers, &downloads, sink, |pair| {
                self.download_job(pair, &staging, options.dry_run)
            })?;

        let uploads = upload_entries(
            original_indy,
            target_indy,
            &build_name,
            package_type,
            record,
        )?;
        let upload_report = self.run_phase("uploads", options.workers, &uploads, sink, |pair| {
            self.upload_job(pair, &staging, options.dry_run)
        })?;

        let sealed = if options.dry_run {
            tracing::info!(build = %build_name, "dry run: skip sealing folo record");
            false
        } else {
            match seal_tracking_record(&self.indy, target_indy, build_name.as_str()) {
                Ok(()) => {
                    tracing::info!(build = %build_name, "folo record sealed");
                    true
                }
                Err(err) => {
                    tracing::warn!(build = %build_name, error = %err, "folo record sealing failed");
                    false
                }
            }
        };

        let uploaded_paths = uploads
            .keys()
            .map(|path| alter_upload_path(path, build_name.build_number()))
            .collect();

        sink.event(ProgressEvent::finished(
            format!("phase=Replay; {build_name} done"),
            start,
        ));
        Ok(ReplayResult {
            build_name: build_name.to_string(),
            package_type: package_type.to_string(),
            target_indy: target_indy.to_string(),
            downloads: download_report,
            uploads: upload_report,
            uploaded_paths,
            sealed,
            started_at,
            elapsed_ms: start.elapsed().as_millis(),
        })
    }

    fn run_phase<F>(
        &self,
        phase: &str,
        workers: usize,
        jobs: &JobMap,
        sink: &dyn ProgressSink,
        job: F,
    ) -> Result<DispatchReport, ReplayError>
    where
        F: Fn(&UrlPair) -> bool + Sync,
    {
        if jobs.is_empty() {
            return Ok(DispatchReport {
                total: 0,
                attempted: 0,
                failed: 0,
            });
        }
        let start = Instant::now();
        sink.event(ProgressEvent::phase(format!(
            "phase=Transfer; {phase}: {} artifacts",
            jobs.len()
        )));
        let report = run_jobs(workers, jobs, job);
        if !report.succeeded() {
            tracing::error!(
                phase,
                failed = report.failed,
                attempted = report.attempted,
                total = report.total,
                "job set failed"
            );
            return Err(ReplayError::PhaseFailed {
                phase: phase.to_string(),
                failed: report.failed,
                total: report.total,
            });
        }
        sink.event(ProgressEvent::finished(
            format!("phase=Transfer; {phase} finished"),
            start,
        ));
        Ok(report)
    }

    fn download_job(&self, pair: &UrlPair, staging: &Staging, dry_run: bool) -> bool {
        if dry_run {
            tracing::info!(url = %pair.target, "dry run: skip download");
            return true;
        }
        let destination = staging.download_file(&pair.target);
        match self.indy.download(&pair.target, destination.as_std_path()) {
            Ok(()) => {
                tracing::debug!(url = %pair.target, "downloaded");
                true
            }
            Err(err) => {
                tracing::error!(url = %pair.target, error = %err, "download failed");
                false
            }
        }
    }

    fn upload_job(&self, pair: &UrlPair, staging: &Staging, dry_run: bool) -> bool {
        if dry_run {
            tracing::info!(from = %pair.source, to = %pair.target, "dry run: skip upload");
            return true;
        }
        let cache_file = staging.upload_cache_file(&pair.source);
        if !cache_file.as_std_path().exists() {
            if let Err(err) = self.indy.download(&pair.source, cache_file.as_std_path()) {
                tracing::error!(url = %pair.source, error = %err, "fetching upload source failed");
                // a partial file would be mistaken for a cached one next time
                let _ = std::fs::remove_file(cache_file.as_std_path());
                return false;
            }
        }
        match self.indy.upload(&pair.target, cache_file.as_std_path()) {
            Ok(()) => {
                tracing::debug!(url = %pair.target, "uploaded");
                true
            }
            Err(err) => {
                tracing::error!(url = %pair.target, error = %err, "upload failed");
                false
            }
        }
    }

    pub fn integration_test(
        &self,
        request: IntegrationRequest,
        sink: &dyn ProgressSink,
    ) -> Result<IntegrationResult, ReplayError> {
        sink.event(ProgressEvent::phase(format!(
            "phase=Resolve; dataset {}",
            request.dataset_repo
        )));
        let dataset_root = self
            .datasets
            .fetch(&request.dataset_repo, request.clear_cache)?;
        let layout = DatasetLayout::new(dataset_root);
        let info: DatasetInfo = read_json(&layout.info_path(&request.build_id))?;

        let mut builds = Vec::new();
        for build_dir in replay_dirs(&layout, &request.build_id)? {
            builds.push(self.integration_build(&request, &info, &build_dir, sink)?);
        }

        let report_path = self
            .settings
            .target_dir
            .join(format!("integration-{}.json", request.build_id));
        let result = IntegrationResult {
            build_id: request.build_id,
            dataset_dir: layout.root().to_string(),
            report_path: report_path.to_string(),
            builds,
        };
        write_json_pretty(&report_path, &result)?;
        tracing::info!(report = %report_path, "integration summary written");
        Ok(result)
    }

    fn integration_build(
        &self,
        request: &IntegrationRequest,
        info: &DatasetInfo,
        build_dir: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<BuildRunResult, ReplayError> {
        let package_type = info.package_type();

        let metadata = self.retrieve_metadata(&request.indy_base_url, info, build_dir, sink)?;

        let record: TrackedContent = read_json(&tracking_path(build_dir))?;
        let original_indy =
            original_base_url(&record).unwrap_or_else(|| request.indy_base_url.clone());
        let target_indy = request
            .migrate_target
            .clone()
            .unwrap_or_else(|| request.indy_base_url.clone());

        let options = ReplayOptions {
            dry_run: request.dry_run,
            clear_cache: request.clear_cache,
            workers: self.settings.workers,
        };
        let replay = self.replay(
            &original_indy,
            &target_indy,
            package_type,
            &record,
            options,
            sink,
        )?;

        // metadata verification around promotion is not implemented yet
        tracing::debug!(build = %replay.build_name, "metadata verification skipped");

        let promote_target = request
            .promote_target
            .clone()
            .unwrap_or_else(|| self.settings.promote_target.clone());
        let promotion = self.promote(
            &target_indy,
            package_type,
            &replay,
            &promote_target,
            request.migrate_target.is_none(),
            request.dry_run,
            sink,
        );

        let cleaned_up = if request.keep_repos {
            tracing::info!(build = %replay.build_name, "keeping scratch repos");
            false
        } else {
            delete_test_repos(
                &self.indy,
                &target_indy,
                package_type,
                &replay.build_name,
                request.dry_run,
            )
        };

        let (promoted, rolled_back) = promotion?;
        Ok(BuildRunResult {
            build_dir: build_dir.to_string(),
            metadata,
            replay,
            promoted,
            rolled_back,
            cleaned_up,
        })
    }

    fn retrieve_metadata(
        &self,
        indy_base_url: &str,
        info: &DatasetInfo,
        build_dir: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<Option<DispatchReport>, ReplayError> {
        let da_file = da_path(build_dir);
        if !da_file.as_std_path().exists() {
            tracing::warn!(file = %da_file, "no DA metadata list, skipping lookup");
            return Ok(None);
        }
        let paths: Vec<String> = read_json(&da_file)?;
        let store = StoreKey::new(info.package_type(), StoreType::Group, info.da_group());
        let jobs = paths
            .iter()
            .map(|path| {
                let url = content_url(indy_base_url, &store.to_path(), path);
                (path.clone(), UrlPair::target_only(url))
            })
            .collect::<JobMap>();

        let start = Instant::now();
        sink.event(ProgressEvent::phase(format!(
            "phase=Verify; metadata lookup: {} files",
            jobs.len()
        )));
        let report = run_jobs(self.settings.metadata_workers, &jobs, |pair| {
            match self.indy.get_text(&pair.target) {
                Ok(_) => true,
                Err(err) => {
                    tracing::warn!(url = %pair.target, error = %err, "metadata lookup failed");
                    false
                }
            }
        });
        if !report.succeeded() {
            tracing::warn!(
                failed = report.failed,
                total = report.total,
                "some metadata lookups failed"
            );
        }
        sink.event(ProgressEvent::finished("phase=Verify; metadata lookup done", start));
        Ok(Some(report))
    }

    #[allow(clippy::too_many_arguments)]
    fn promote(
        &self,
        target_indy: &str,
        package_type: PackageType,
        replay: &ReplayResult,
        promote_target: &str,
        rollback: bool,
        dry_run: bool,
        sink: &dyn ProgressSink,
    ) -> Result<(bool, bool), ReplayError> {
        if replay.uploaded_paths.is_empty() {
            return Ok((false, false));
        }
        let source = StoreKey::new(package_type, StoreType::Hosted, &replay.build_name);
        let target = StoreKey::new(package_type, StoreType::Hosted, promote_target);
        let request = PathsPromoteRequest::new(&source, &target, replay.uploaded_paths.clone());

        sink.event(ProgressEvent::phase(format!(
            "phase=Promote; {source} -> {target}: {} paths",
            request.paths.len()
        )));
        if dry_run {
            tracing::info!(%source, %target, "dry run: skip promotion");
            return Ok((false, false));
        }

        let body =
            serde_json::to_value(&request).map_err(|err| ReplayError::IndyHttp(err.to_string()))?;
        let response = self.indy.post_json(&promote_url(target_indy), Some(&body))?;
        tracing::info!(%source, %target, "promotion finished");
        if !rollback {
            return Ok((true, false));
        }

        let promote_result: Value =
            serde_json::from_str(&response).map_err(|err| ReplayError::DatasetParse {
                path: promote_url(target_indy),
                message: err.to_string(),
            })?;
        self.indy
            .post_json(&rollback_url(target_indy), Some(&promote_result))?;
        tracing::info!(%source, %target, "promotion rolled back");
        Ok((true, true))
    }

    pub fn generate_dataset(
        &self,
        request: DatasetRequest,
        sink: &dyn ProgressSink,
    ) -> Result<DatasetResult, ReplayError> {
        let layout = DatasetLayout::new(self.settings.dataset_dir.clone());
        let build_dir = layout.build_dir(&request.build_id);
        ensure_dir(&build_dir)?;
        let mut written = Vec::new();

        sink.event(ProgressEvent::phase(format!(
            "phase=Resolve; {} {}",
            if request.group_build { "group build" } else { "build" },
            request.build_id
        )));
        let build_json = layout.build_json_path(&request.build_id, request.group_build);
        if !build_json.as_std_path().exists() {
            let body = if request.group_build {
                self.pnc
                    .fetch_group_build(&request.pnc_base_url, &request.build_id)?
            } else {
                self.pnc.fetch_build(&request.pnc_base_url, &request.build_id)?
            };
            write_bytes_atomic(&build_json, body.as_bytes())?;
            format_json_file(&build_json)?;
            written.push(build_json.to_string());
        }

        let summary = parse_build_summary(&read_json::<Value>(&build_json)?);

        let graph = if request.group_build {
            let graph_path = layout.dependency_graph_path(&request.build_id);
            if !graph_path.as_std_path().exists() {
                let body = self
                    .pnc
                    .fetch_dependency_graph(&request.pnc_base_url, &request.build_id)?;
                write_bytes_atomic(&graph_path, body.as_bytes())?;
                format_json_file(&graph_path)?;
                written.push(graph_path.to_string());
            }
            Some(read_json::<DependencyGraph>(&graph_path)?)
        } else {
            None
        };

        // group builds carry no build type of their own, their member builds do
        let build_type = match &graph {
            Some(graph) if summary.build_type.is_empty() => {
                graph.first_build_type().unwrap_or_default()
            }
            _ => summary.build_type.clone(),
        };

        let info_path = layout.info_path(&request.build_id);
        if !info_path.as_std_path().exists() {
            let info = DatasetInfo {
                pnc_base_url: request.pnc_base_url.clone(),
                build_id: request.build_id.clone(),
                build_type: build_type.clone(),
                temporary_build: summary.temporary_build,
            };
            write_json_pretty(&info_path, &info)?;
            written.push(info_path.to_string());
        }

        let mut builds = Vec::new();
        let mut missing_tracking = Vec::new();
        if let Some(graph) = graph {
            ensure_dir(&layout.sub_builds_dir(&request.build_id))?;
            for sub_build_id in graph.vertices.keys() {
                let sub_dir = layout.sub_build_dir(&request.build_id, sub_build_id);
                let sub_build_type = graph
                    .vertex_build_type(sub_build_id)
                    .unwrap_or_else(|| build_type.clone());
                let files = self.generate_build_files(
                    &request,
                    &sub_dir,
                    sub_build_id,
                    &sub_build_type,
                    &mut missing_tracking,
                )?;
                written.extend(files);
                builds.push(sub_build_id.clone());
            }

            let queue_path = layout.build_queue_path(&request.build_id);
            if !queue_path.as_std_path().exists() {
                let queue = BuildQueue::from_graph(&graph)?;
                write_bytes_atomic(&queue_path, queue.to_yaml()?.as_bytes())?;
                written.push(queue_path.to_string());
            }
        } else {
            let files = self.generate_build_files(
                &request,
                &build_dir,
                &request.build_id,
                &build_type,
                &mut missing_tracking,
            )?;
            written.extend(files);
            builds.push(request.build_id.clone());
        }

        Ok(DatasetResult {
            build_id: request.build_id,
            dataset_dir: build_dir.to_string(),
            build_type,
            builds,
            written,
            missing_tracking,
        })
    }

    fn generate_build_files(
        &self,
        request: &DatasetRequest,
        build_dir: &Utf8PathBuf,
        build_id: &str,
        build_type: &str,
        missing_tracking: &mut Vec<String>,
    ) -> Result<Vec<String>, ReplayError> {
        ensure_dir(build_dir)?;
        let mut written = Vec::new();

        let align_file = align_log_path(build_dir);
        let mut align_log = None;
        if !align_file.as_std_path().exists() {
            let log = self.pnc.fetch_align_log(&request.pnc_base_url, build_id)?;
            write_bytes_atomic(&align_file, log.as_bytes())?;
            written.push(align_file.to_string());
            align_log = Some(log);
        }

        let da_file = da_path(build_dir);
        if !da_file.as_std_path().exists() {
            let log = match align_log {
                Some(log) => log,
                None => std::fs::read_to_string(align_file.as_std_path())
                    .map_err(|err| ReplayError::Filesystem(format!("read {align_file}: {err}")))?,
            };
            let paths = align::metadata_paths(&log, build_type)?;
            write_json_pretty(&da_file, &paths)?;
            written.push(da_file.to_string());
        }

        let tracking_file = tracking_path(build_dir);
        if !tracking_file.as_std_path().exists() {
            let url = folo_report_url(&request.indy_base_url, build_id);
            match self.indy.get_text(&url) {
                Ok(report) => {
                    write_bytes_atomic(&tracking_file, report.as_bytes())?;
                    written.push(tracking_file.to_string());
                }
                Err(err) => {
                    tracing::warn!(build = build_id, error = %err, "tracking report unavailable");
                    missing_tracking.push(build_id.to_string());
                }
            }
        }

        Ok(written)
    }

    pub fn cleanup(
        &self,
        indy_url: &str,
        package_type: PackageType,
        build_name: &str,
        dry_run: bool,
    ) -> CleanupResult {
        let deleted = delete_test_repos(&self.indy, indy_url, package_type, build_name, dry_run);
        CleanupResult {
            build_name: build_name.to_string(),
            deleted,
        }
    }
}

pub fn replay_dirs(
    layout: &DatasetLayout,
    build_id: &str,
) -> Result<Vec<Utf8PathBuf>, ReplayError> {
    let build_dir = layout.build_dir(build_id);
    if tracking_path(&build_dir).as_std_path().exists() {
        return Ok(vec![build_dir]);
    }

    let queue_path = layout.build_queue_path(build_id);
    if !queue_path.as_std_path().exists() {
        return Err(ReplayError::DatasetNotFound(
            tracking_path(&build_dir).to_string(),
        ));
    }
    let content = std::fs::read_to_string(queue_path.as_std_path())
        .map_err(|err| ReplayError::Filesystem(format!("read {queue_path}: {err}")))?;
    let queue: BuildQueue =
        serde_yaml::from_str(&content).map_err(|err| ReplayError::DatasetParse {
            path: queue_path.to_string(),
            message: err.to_string(),
        })?;
    Ok(queue
        .stages
        .iter()
        .flat_map(|stage| stage.builds.iter())
        .map(|sub_build_id| layout.sub_build_dir(build_id, sub_build_id))
        .filter(|dir| tracking_path(dir).as_std_path().exists())
        .collect())
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
