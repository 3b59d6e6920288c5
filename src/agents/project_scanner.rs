use crate::config::CONFIG_FILE;
use crate::error::{Result, UpkeepError};
use std::path::{Path, PathBuf};
use tracing::warn;

/// ProjectScannerAgent validates the Composer project layout
pub struct ProjectScannerAgent {
    project_path: PathBuf,
}

impl ProjectScannerAgent {
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    /// Validates the project structure
    pub fn validate(&self) -> Result<ProjectInfo> {
        if !self.project_path.is_dir() {
            return Err(UpkeepError::ProjectValidation(format!(
                "{} is not a directory",
                self.project_path.display()
            )));
        }

        let manifest_path = self.project_path.join("composer.json");
        if !manifest_path.is_file() {
            return Err(UpkeepError::ProjectValidation(
                "composer.json not found".to_string(),
            ));
        }

        // A missing lock is allowed; versions then come from composer.json ranges
        let lock_path = self.project_path.join("composer.lock");
        let has_lock = lock_path.is_file();
        if !has_lock {
            warn!(path = %lock_path.display(), "composer.lock not found");
        }

        let config_path = self.project_path.join(CONFIG_FILE);
        let config_path = config_path.is_file().then_some(config_path);

        Ok(ProjectInfo {
            project_path: self.project_path.clone(),
            manifest_path,
            lock_path,
            has_lock,
            config_path,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProjectInfo {
    #[allow(dead_code)]
    pub project_path: PathBuf,
    #[allow(dead_code)]
    pub manifest_path: PathBuf,
    #[allow(dead_code)]
    pub lock_path: PathBuf,
    pub has_lock: bool,
    pub config_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn requires_composer_json() {
        let dir = TempDir::new().unwrap();
        let err = ProjectScannerAgent::new(dir.path()).validate().unwrap_err();
        assert!(matches!(err, UpkeepError::ProjectValidation(_)));
        assert!(err.to_string().contains("composer.json"));
    }

    #[test]
    fn rejects_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(ProjectScannerAgent::new(&missing).validate().is_err());
    }

    #[test]
    fn detects_lock_and_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("composer.json"), "{}").unwrap();

        let info = ProjectScannerAgent::new(dir.path()).validate().unwrap();
        assert!(!info.has_lock);
        assert!(info.config_path.is_none());

        fs::write(dir.path().join("composer.lock"), r#"{"packages": []}"#).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "timeout_secs = 3\n").unwrap();

        let info = ProjectScannerAgent::new(dir.path()).validate().unwrap();
        assert!(info.has_lock);
        assert_eq!(info.config_path, Some(dir.path().join(CONFIG_FILE)));
        assert_eq!(info.manifest_path, dir.path().join("composer.json"));
    }
}
