use async_trait::async_trait;

use crate::config::{SourceConfig, VariantSpec};
use crate::contract::{PageFetcher, ReleaseInfo, ReleaseSource, VersionEntry};
use crate::error::SourceError;
use crate::{listing, resolve};

/// [`ReleaseSource`] backed by the APKMirror website.
pub struct ApkMirror<F> {
    fetcher: F,
    config: SourceConfig,
}

impl<F: PageFetcher> ApkMirror<F> {
    pub fn new(fetcher: F, config: SourceConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

#[async_trait]
impl<F: PageFetcher> ReleaseSource for ApkMirror<F> {
    async fn list_versions(&self, variant: &VariantSpec) -> Result<Vec<VersionEntry>, SourceError> {
        listing::list_versions(&self.fetcher, &self.config, variant).await
    }

    async fn resolve(
        &self,
        variant: &VariantSpec,
        version: &str,
    ) -> Result<Option<ReleaseInfo>, SourceError> {
        resolve::resolve(&self.fetcher, &self.config, variant, version).await
    }
}
