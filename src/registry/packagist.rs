use crate::composer::is_platform_package;
use crate::constraint::version::{Version, normalize};
use crate::error::{Result, UpkeepError};
use crate::registry::{PackageRegistry, RequirementMap};
use regex::Regex;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::net::IpAddr;
use std::io::Read;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_REGISTRY: &str = "https://repo.packagist.org";
const MAX_METADATA_BYTES: u64 = 32 * 1024 * 1024;
const UNSET_MARKER: &str = "__unset";

static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([_.-]?[a-z0-9]+)*/[a-z0-9](([_.]|-{1,2})?[a-z0-9]+)*$")
        .expect("package name pattern compiles")
});

/// Metadata for one package as served by the Composer v2 endpoint.
#[derive(Debug, Clone, Default)]
pub struct PackageMetadata {
    pub releases: Vec<Release>,
    pub replacement: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Release {
    pub version: String,
    pub require: RequirementMap,
}

impl PackageMetadata {
    fn find_release(&self, version: &str) -> Option<&Release> {
        let wanted = normalize(version);
        if let Some(release) = self
            .releases
            .iter()
            .find(|r| normalize(&r.version) == wanted)
        {
            return Some(release);
        }

        // `1.2` in a lock file and `1.2.0` in the registry name the same release
        let wanted = Version::parse(&wanted);
        self.releases.iter().find(|r| {
            let candidate = Version::parse(&r.version);
            candidate.stability() == wanted.stability()
                && candidate.compare(&wanted) == Some(Ordering::Equal)
        })
    }
}

/// Packagist (or any Composer v2 metadata mirror) client.
///
/// Every package is fetched at most once per instance; failures are cached
/// as empty metadata so a run never retries a lookup.
pub struct PackagistRegistry {
    client: Client,
    base_url: String,
    cache: Mutex<HashMap<String, Arc<PackageMetadata>>>,
}

impl PackagistRegistry {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Self::validate_registry_url(base_url)?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("upkeep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpkeepError::Registry(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn metadata(&self, name: &str) -> Arc<PackageMetadata> {
        let key = name.to_ascii_lowercase();
        if let Some(metadata) = self.lock_cache().get(&key) {
            return Arc::clone(metadata);
        }

        // Fetch without the lock held; the first stored result wins
        let metadata = match self.fetch_metadata(&key) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => PackageMetadata::default(),
            Err(e) => {
                warn!(package = %key, error = %e, "registry lookup failed, treating as empty");
                PackageMetadata::default()
            }
        };

        Arc::clone(
            self.lock_cache()
                .entry(key)
                .or_insert_with(|| Arc::new(metadata)),
        )
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, Arc<PackageMetadata>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fetch_metadata(&self, name: &str) -> Result<Option<PackageMetadata>> {
        if is_platform_package(name) || !PACKAGE_NAME.is_match(name) {
            debug!(package = %name, "not a registry package, skipping lookup");
            return Ok(None);
        }

        let metadata_url = format!("{}/p2/{}.json", self.base_url, name);
        debug!(url = %metadata_url, "fetching package metadata");

        let response = match self.client.get(&metadata_url).send() {
            Ok(resp) => resp,
            Err(e) => {
                warn!(url = %metadata_url, error = %e, "request failed");
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            debug!(url = %metadata_url, status = %response.status(), "no metadata");
            return Ok(None);
        }

        if let Some(length) = response.content_length() {
            if length > MAX_METADATA_BYTES {
                return Err(UpkeepError::Registry(format!(
                    "metadata for {name} exceeded {MAX_METADATA_BYTES} bytes"
                )));
            }
        }

        let text = read_limited(response, MAX_METADATA_BYTES, name)?;
        parse_metadata(name, &text).map(Some)
    }

    fn validate_registry_url(url: &str) -> Result<()> {
        let parsed = Url::parse(url)
            .map_err(|_| UpkeepError::Config(format!("Invalid registry URL: {url}")))?;

        match parsed.scheme() {
            "https" | "http" => {}
            scheme => {
                return Err(UpkeepError::Config(format!(
                    "Unsupported registry scheme: {scheme}"
                )));
            }
        }

        if let Some(host) = parsed.host_str() {
            if Self::is_private_host(host) {
                return Err(UpkeepError::Config(format!(
                    "Registry host '{host}' is not allowed"
                )));
            }
        }

        Ok(())
    }

    fn is_private_host(host: &str) -> bool {
        if host.eq_ignore_ascii_case("localhost") {
            return true;
        }

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<IpAddr>() {
            match ip {
                IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
                IpAddr::V6(v6) => v6.is_loopback() || v6.is_unique_local(),
            }
        } else {
            false
        }
    }
}

impl PackageRegistry for PackagistRegistry {
    fn list_versions(&self, name: &str) -> Vec<String> {
        self.metadata(name)
            .releases
            .iter()
            .map(|r| r.version.clone())
            .collect()
    }

    fn requirements(&self, name: &str, version: &str) -> RequirementMap {
        self.metadata(name)
            .find_release(version)
            .map(|r| r.require.clone())
            .unwrap_or_default()
    }

    fn replacement(&self, name: &str) -> Option<String> {
        self.metadata(name).replacement.clone()
    }
}

#[derive(Debug, Deserialize)]
struct MetadataDocument {
    #[serde(default)]
    packages: HashMap<String, Vec<Map<String, Value>>>,
    #[serde(default)]
    minified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseEntry {
    version: String,
    #[serde(default)]
    require: Value,
    #[serde(default)]
    abandoned: Value,
}

fn parse_metadata(name: &str, text: &str) -> Result<PackageMetadata> {
    let document: MetadataDocument = serde_json::from_str(text)?;
    let minified = document.minified.as_deref() == Some("composer/2.0");

    let entries = document
        .packages
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, entries)| entries)
        .unwrap_or_default();

    let entries = if minified { expand_minified(entries) } else { entries };

    let mut metadata = PackageMetadata::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let entry: ReleaseEntry = match serde_json::from_value(Value::Object(entry)) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(package = %name, error = %e, "skipping malformed release entry");
                continue;
            }
        };

        // Newest release carries the current abandonment status
        if index == 0 {
            metadata.replacement = entry.abandoned.as_str().map(str::to_string);
        }

        metadata.releases.push(Release {
            version: entry.version,
            require: requirement_map(&entry.require),
        });
    }

    Ok(metadata)
}

/// Read at most `limit` bytes; chunked responses carry no length up front.
fn read_limited<R: Read>(reader: R, limit: u64, name: &str) -> Result<String> {
    let mut text = String::new();
    reader
        .take(limit + 1)
        .read_to_string(&mut text)
        .map_err(|e| UpkeepError::Registry(e.to_string()))?;

    if text.len() as u64 > limit {
        return Err(UpkeepError::Registry(format!(
            "metadata for {name} exceeded {limit} bytes"
        )));
    }
    Ok(text)
}

/// Each minified entry only lists fields that differ from the previous one.
fn expand_minified(entries: Vec<Map<String, Value>>) -> Vec<Map<String, Value>> {
    let mut expanded = Vec::with_capacity(entries.len());
    let mut previous: Map<String, Value> = Map::new();

    for entry in entries {
        let mut current = previous.clone();
        for (key, value) in entry {
            if value.as_str() == Some(UNSET_MARKER) {
                current.remove(&key);
            } else {
                current.insert(key, value);
            }
        }
        expanded.push(current.clone());
        previous = current;
    }

    expanded
}

/// Requirement maps arrive as objects, or as `[]` when empty.
pub(crate) fn requirement_map(value: &Value) -> RequirementMap {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIFIED: &str = r#"{
        "packages": {
            "acme/bundle": [
                {"name": "acme/bundle", "version": "v8.2.0", "require": {"php": ">=8.1", "acme/core": "^3.0"}, "abandoned": "acme/next-bundle"},
                {"version": "v8.1.5", "require": {"php": ">=8.0", "acme/core": "^2.0"}},
                {"version": "v8.1.0", "require": "__unset"},
                {"version": "v8.1.0-beta1"}
            ]
        },
        "minified": "composer/2.0"
    }"#;

    #[test]
    fn accepts_https_registry() {
        assert!(PackagistRegistry::validate_registry_url("https://repo.packagist.org").is_ok());
    }

    #[test]
    fn rejects_invalid_scheme() {
        let err = PackagistRegistry::validate_registry_url("ftp://example.com").unwrap_err();
        assert!(matches!(err, UpkeepError::Config(_)));
    }

    #[test]
    fn rejects_private_host() {
        let err = PackagistRegistry::validate_registry_url("https://127.0.0.1/repo").unwrap_err();
        assert!(matches!(err, UpkeepError::Config(_)));
        let err = PackagistRegistry::validate_registry_url("http://localhost:8080").unwrap_err();
        assert!(matches!(err, UpkeepError::Config(_)));
    }

    #[test]
    fn expands_minified_entries() {
        let metadata = parse_metadata("acme/bundle", MINIFIED).unwrap();
        let versions: Vec<&str> = metadata.releases.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["v8.2.0", "v8.1.5", "v8.1.0", "v8.1.0-beta1"]);

        let second = &metadata.releases[1].require;
        assert_eq!(second.get("acme/core").map(String::as_str), Some("^2.0"));
        assert!(metadata.releases[2].require.is_empty());
        assert!(metadata.releases[3].require.is_empty());
    }

    #[test]
    fn reads_replacement_from_newest_release() {
        let metadata = parse_metadata("acme/bundle", MINIFIED).unwrap();
        assert_eq!(metadata.replacement.as_deref(), Some("acme/next-bundle"));
    }

    #[test]
    fn finds_release_by_normalized_version() {
        let metadata = parse_metadata("acme/bundle", MINIFIED).unwrap();
        let release = metadata.find_release("8.1.5").unwrap();
        assert_eq!(release.version, "v8.1.5");
        assert_eq!(metadata.find_release("8.2").unwrap().version, "v8.2.0");
        assert!(metadata.find_release("9.0.0").is_none());
    }

    #[test]
    fn empty_require_array_is_an_empty_map() {
        let value: Value = serde_json::from_str("[]").unwrap();
        assert!(requirement_map(&value).is_empty());
    }

    #[test]
    fn platform_names_are_never_fetched() {
        let registry =
            PackagistRegistry::new(DEFAULT_REGISTRY, Duration::from_millis(10)).unwrap();
        assert!(registry.fetch_metadata("php").unwrap().is_none());
        assert!(registry.fetch_metadata("ext-json").unwrap().is_none());
        assert!(registry.fetch_metadata("Not A Name").unwrap().is_none());
    }

    #[test]
    fn php_http_vendor_is_a_registry_package() {
        assert!(!is_platform_package("php-http/discovery"));
        assert!(PACKAGE_NAME.is_match("php-http/discovery"));
    }

    #[test]
    fn lookups_are_memoized() {
        let registry =
            PackagistRegistry::new(DEFAULT_REGISTRY, Duration::from_millis(10)).unwrap();
        let first = registry.metadata("ext-json");
        let second = registry.metadata("EXT-JSON");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.releases.is_empty());
    }

    #[test]
    fn body_over_limit_is_rejected() {
        let body = b"{\"packages\": {}}";
        assert!(read_limited(&body[..], 64, "acme/bundle").is_ok());

        let err = read_limited(&body[..], 8, "acme/bundle").unwrap_err();
        assert!(matches!(err, UpkeepError::Registry(_)));
        assert!(err.to_string().contains("exceeded 8 bytes"));
    }

    #[test]
    #[ignore] // Requires network access
    fn fetches_real_package() {
        let registry = PackagistRegistry::new(DEFAULT_REGISTRY, Duration::from_secs(5)).unwrap();
        let versions = registry.stable_versions_descending("monolog/monolog");
        assert!(!versions.is_empty());
    }
}
