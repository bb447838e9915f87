//! Publisher capability and the per-run registry.
//!
//! Each platform is served by one `Publisher` implementation. The registry is
//! built once per run and hands the same instance every item for its platform,
//! so session state (logins, browser contexts) can persist across calls.
mod command;
mod dummy;

pub use command::CommandPublisher;
pub use dummy::DummyPublisher;

use crate::config::Config;
use crate::model::{ContentItem, Platform, PlatformResult};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything a publisher receives for one item.
#[derive(Debug, Serialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct UploadInput<'a> {
    pub item: &'a ContentItem,
    pub rendered_body: &'a str,
    pub media_paths: &'a [PathBuf],
}

/// Platform-specific publish action.
///
/// Expected failures should come back as `PlatformResult::failure`; returned
/// errors are tolerated and recorded the same way by the dispatcher.
pub trait Publisher {
    fn platform(&self) -> Platform;

    /// Establish a session. Must be idempotent.
    fn login(&mut self) -> Result<()> {
        Ok(())
    }

    fn upload(&mut self, input: &UploadInput<'_>) -> Result<PlatformResult>;
}

/// Stand-in for a publisher whose setup failed.
struct UnavailablePublisher {
    platform: Platform,
    reason: String,
}

impl Publisher for UnavailablePublisher {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn upload(&mut self, _input: &UploadInput<'_>) -> Result<PlatformResult> {
        Err(anyhow!("publisher unavailable: {}", self.reason))
    }
}

struct Slot {
    publisher: Box<dyn Publisher>,
    logged_in: bool,
}

/// Platform → publisher instance for one run.
#[derive(Default)]
pub struct PublisherRegistry {
    slots: BTreeMap<Platform, Slot>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        PublisherRegistry::default()
    }

    /// Build publishers for `selected`: a command publisher where a command is
    /// configured, the dummy publisher otherwise.
    ///
    /// A command that cannot be set up only disables its own platform: every
    /// item for it fails with the setup error while other platforms publish.
    pub fn from_config(config: &Config, selected: &[Platform]) -> Self {
        let mut registry = PublisherRegistry::new();
        for &platform in selected {
            if registry.contains(platform) {
                continue;
            }
            let settings = config.settings_for(platform);
            match settings.and_then(|settings| settings.command.as_deref()) {
                Some(command) => {
                    let settings = settings.cloned().unwrap_or_default();
                    match CommandPublisher::new(platform, command, settings) {
                        Ok(publisher) => registry.register(Box::new(publisher)),
                        Err(err) => {
                            let reason = format!("{err:#}");
                            tracing::warn!(%platform, error = %reason, "publisher unavailable");
                            let publisher = UnavailablePublisher { platform, reason };
                            registry.register(Box::new(publisher));
                        }
                    }
                }
                None => {
                    tracing::debug!(%platform, "no publish command; using dummy publisher");
                    registry.register(Box::new(DummyPublisher::new(platform)));
                }
            }
        }
        registry
    }

    /// Register (or replace) the publisher for its platform.
    pub fn register(&mut self, publisher: Box<dyn Publisher>) {
        let platform = publisher.platform();
        self.slots.insert(
            platform,
            Slot {
                publisher,
                logged_in: false,
            },
        );
    }

    pub fn contains(&self, platform: Platform) -> bool {
        self.slots.contains_key(&platform)
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.slots.keys().copied().collect()
    }

    /// Log in on first use, then upload through the platform's publisher.
    pub fn publish(
        &mut self,
        platform: Platform,
        input: &UploadInput<'_>,
    ) -> Result<PlatformResult> {
        let slot = self
            .slots
            .get_mut(&platform)
            .ok_or_else(|| anyhow!("no publisher registered for {platform}"))?;
        if !slot.logged_in {
            slot.publisher.login()?;
            slot.logged_in = true;
        }
        slot.publisher.upload(input)
    }
}
