//! Remote lookup of device schemas through the harp whoami list.
//!
//! Network access needs the `harp_remote` feature. Without it every fetch returns
//! [`ContractError::FeatureNotEnabled`].

use crate::config::HarpSettings;
use crate::error::{AppResult, ContractError};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// One entry of the whoami list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEntry {
    /// Device name.
    #[serde(default)]
    pub name: Option<String>,
    /// Repository holding the device schema.
    #[serde(default)]
    pub repository_url: Option<String>,
}

/// Known devices keyed by whoami id.
pub type WhoAmIList = BTreeMap<u16, DeviceEntry>;

#[derive(Deserialize)]
struct WhoAmIFile {
    devices: WhoAmIList,
}

static WHO_AM_I_CACHE: Lazy<Mutex<HashMap<String, Arc<WhoAmIList>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Parses the `devices:` mapping of a whoami list.
pub fn parse_who_am_i_list(text: &str) -> AppResult<WhoAmIList> {
    let file: WhoAmIFile = serde_yaml::from_str(text)?;
    Ok(file.devices)
}

/// Candidate `device.yml` URLs for a device repository, in lookup order.
pub fn device_yml_candidates(repository_url: &str, release: &str) -> Vec<String> {
    let repository_url = repository_url.trim_end_matches('/');
    [
        format!("{repository_url}/{release}/device.yml"),
        format!("{repository_url}/{release}/software/bonsai/device.yml"),
    ]
    .into_iter()
    .map(|url| url.replacen("://github.com", "://raw.githubusercontent.com", 1))
    .collect()
}

/// Fetches `url` as text with the configured timeout.
#[cfg(feature = "harp_remote")]
pub fn fetch_text(url: &str, settings: &HarpSettings) -> AppResult<String> {
    debug!(url, "fetching remote harp resource");
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(settings.request_timeout_secs))
        .build()?;
    let response = client.get(url).send()?.error_for_status()?;
    Ok(response.text()?)
}

/// Always fails; remote lookups need the `harp_remote` feature.
#[cfg(not(feature = "harp_remote"))]
pub fn fetch_text(url: &str, _settings: &HarpSettings) -> AppResult<String> {
    debug!(url, "remote harp lookup requested without harp_remote");
    Err(ContractError::FeatureNotEnabled("harp_remote".to_string()))
}

/// The whoami list at `settings.whoami_url`, fetched once per URL.
pub fn fetch_who_am_i_list(settings: &HarpSettings) -> AppResult<Arc<WhoAmIList>> {
    let url = settings.whoami_url.as_str();
    if let Some(list) = WHO_AM_I_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(url)
    {
        return Ok(Arc::clone(list));
    }

    let list = Arc::new(parse_who_am_i_list(&fetch_text(url, settings)?)?);
    WHO_AM_I_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(url.to_string(), Arc::clone(&list));
    Ok(list)
}

/// Text of the `device.yml` for the device registered under `who_am_i`.
pub fn fetch_device_yml(who_am_i: u16, settings: &HarpSettings) -> AppResult<String> {
    let list = fetch_who_am_i_list(settings)?;
    let entry = list.get(&who_am_i).ok_or_else(|| {
        ContractError::Lookup(format!("WhoAmI {who_am_i} not found in whoami list"))
    })?;
    let repository_url = entry.repository_url.as_deref().ok_or_else(|| {
        ContractError::Source(format!("WhoAmI {who_am_i} has no repositoryUrl"))
    })?;

    for url in device_yml_candidates(repository_url, &settings.release) {
        match fetch_text(&url, settings) {
            Ok(text) => return Ok(text),
            Err(err) => debug!(url, error = %err, "device.yml candidate not usable"),
        }
    }
    Err(ContractError::Source(format!(
        "device.yml for WhoAmI {who_am_i} not found in {repository_url}"
    )))
}
