use crate::config::Config;
use crate::error::Result;
use crate::registry::{PackageRegistry, PackagistRegistry};
use std::sync::Arc;
use std::time::Duration;

pub struct RegistryFactory;

impl RegistryFactory {
    pub fn create(config: &Config) -> Result<Arc<dyn PackageRegistry>> {
        let client =
            PackagistRegistry::new(&config.registry, Duration::from_secs(config.timeout_secs))?;
        Ok(Arc::new(client))
    }
}
