use crate::domain::{BuildMetadata, BuildName, PackageType, StoreType};
use crate::error::ReplayError;
use crate::indy::{IndyClient, group_store_body, hosted_store_body, store_admin_url};

pub fn prepare_repos(
    client: &dyn IndyClient,
    indy_url: &str,
    build_name: &BuildName,
    meta: &BuildMetadata,
    dry_run: bool,
) -> Result<(), ReplayError> {
    if dry_run {
        tracing::info!(build = %build_name, "dry run: skip creating hosted and group repos");
        return Ok(());
    }
    prepare_hosted(client, indy_url, build_name, meta.package_type)?;
    prepare_group(client, indy_url, build_name, meta)
}

fn prepare_hosted(
    client: &dyn IndyClient,
    indy_url: &str,
    build_name: &BuildName,
    package_type: PackageType,
) -> Result<(), ReplayError> {
    let url = store_admin_url(indy_url, package_type, StoreType::Hosted, build_name.as_str());
    tracing::info!(build = %build_name, "creating hosted repo");
    client
        .put_json(&url, &hosted_store_body(package_type, build_name))
        .map_err(|err| {
            ReplayError::RepoSetup(format!("hosted repo {build_name} creation failed: {err}"))
        })?;
    tracing::info!(build = %build_name, %url, "hosted repo created");
    Ok(())
}

fn prepare_group(
    client: &dyn IndyClient,
    indy_url: &str,
    build_name: &BuildName,
    meta: &BuildMetadata,
) -> Result<(), ReplayError> {
    let url = store_admin_url(
        indy_url,
        meta.package_type,
        StoreType::Group,
        build_name.as_str(),
    );
    tracing::info!(build = %build_name, "creating group repo");
    client
        .put_json(&url, &group_store_body(meta, build_name))
        .map_err(|err| {
            ReplayError::RepoSetup(format!("group repo {build_name} creation failed: {err}"))
        })?;
    tracing::info!(build = %build_name, %url, "group repo created");
    Ok(())
}

/// Names without the `build-test-` prefix are refused and nothing is sent to the server.
pub fn delete_test_repos(
    client: &dyn IndyClient,
    indy_url: &str,
    package_type: PackageType,
    build_name: &str,
    dry_run: bool,
) -> bool {
    if !BuildName::is_test_repo(build_name) {
        tracing::warn!(build = build_name, "refusing to delete repos that are not test repos");
        return false;
    }
    if dry_run {
        tracing::info!(build = build_name, "dry run: skip deleting group and hosted repos");
        return true;
    }

    let group_url = store_admin_url(indy_url, package_type, StoreType::Group, build_name);
    match client.delete(&group_url) {
        Ok(()) => tracing::info!(build = build_name, "group repo deleted"),
        Err(err) => tracing::warn!(build = build_name, error = %err, "group repo deletion failed"),
    }

    let hosted_url = format!(
        "{}?deleteContent=true",
        store_admin_url(indy_url, package_type, StoreType::Hosted, build_name)
    );
    match client.delete(&hosted_url) {
        Ok(()) => tracing::info!(build = build_name, "hosted repo deleted"),
        Err(err) => tracing::warn!(build = build_name, error = %err, "hosted repo deletion failed"),
    }
    true
}
