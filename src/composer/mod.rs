pub mod lock;
pub mod outdated;

pub use lock::{ComposerLockFile, LockSnapshot, LockState};
#[cfg(test)]
pub use lock::{InstalledPackage, Manifest};
pub use outdated::{OutdatedPackage, OutdatedReport, OutdatedScanner, apply_ignore_list};

/// Runtime, extension and plugin-API requirements that no registry serves.
/// Registry packages are always `vendor/name`; platform names never contain a slash.
pub fn is_platform_package(name: &str) -> bool {
    !name.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_platform_packages() {
        assert!(is_platform_package("php"));
        assert!(is_platform_package("php-64bit"));
        assert!(is_platform_package("ext-intl"));
        assert!(is_platform_package("lib-icu"));
        assert!(is_platform_package("composer-plugin-api"));
        assert!(!is_platform_package("symfony/console"));
        assert!(!is_platform_package("php-http/client-common"));
        assert!(!is_platform_package("php-http/discovery"));
        assert!(!is_platform_package("ext-vendor/polyfill"));
        assert!(!is_platform_package("lib-tools/parser"));
        assert!(!is_platform_package("composer/semver"));
    }
}
