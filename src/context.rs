//! Service context bundling all port trait objects.

use std::sync::Arc;

use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::adapters::live::process::LiveCommandRunner;
use crate::ports::clock::Clock;
use crate::ports::command::CommandRunner;
use crate::ports::filesystem::FileSystem;
use crate::ports::id_gen::IdGenerator;

/// Bundles all port trait objects into a single context.
///
/// Fields are reference counted because scan workers run on separate tasks
/// and each holds its own handle to the ports it needs.
#[derive(Clone)]
pub struct ServiceContext {
    /// Clock for obtaining the current time.
    pub clock: Arc<dyn Clock>,
    /// Filesystem for discovery, cache cleanup and report output.
    pub fs: Arc<dyn FileSystem>,
    /// ID generator for scan identifiers.
    pub id_gen: Arc<dyn IdGenerator>,
    /// Runner for external processes.
    pub runner: Arc<dyn CommandRunner>,
}

impl ServiceContext {
    /// Creates a live context with real adapters for every port.
    #[must_use]
    pub fn live() -> Self {
        Self {
            clock: Arc::new(LiveClock),
            fs: Arc::new(LiveFileSystem),
            id_gen: Arc::new(LiveIdGenerator),
            runner: Arc::new(LiveCommandRunner),
        }
    }

    /// Returns a copy of this context with a different command runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Returns a copy of this context with a different clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext").finish_non_exhaustive()
    }
}
