use super::{Publisher, UploadInput};
use crate::model::{Platform, PlatformResult};
use anyhow::Result;

/// Placeholder publisher for platforms without a configured automation command.
#[derive(Debug, Clone)]
pub struct DummyPublisher {
    platform: Platform,
}

impl DummyPublisher {
    pub fn new(platform: Platform) -> Self {
        DummyPublisher { platform }
    }
}

impl Publisher for DummyPublisher {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn upload(&mut self, input: &UploadInput<'_>) -> Result<PlatformResult> {
        Ok(PlatformResult {
            id: Some(input.item.content_id.clone()),
            ..PlatformResult::success(format!("about:blank#{}", self.platform))
        })
    }
}
