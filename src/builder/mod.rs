//! Build pipeline.
//!
//! A [`Builder`] owns the run configuration and an ordered list of
//! [`Step`]s. Steps always run in clean, build, pack, test order and each
//! one decides from the configuration whether it has anything to do.

pub mod context;
pub mod steps;

use std::sync::Arc;

use anyhow::Result;

use crate::errors::BuildkitError;
use crate::util::Shell;

pub use context::{BuildConfig, BuildType, Workflow};
pub use steps::{StepBuild, StepClean, StepPack, StepTest};

/// Pipeline position of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StepKind {
    Clean,
    Build,
    Pack,
    Test,
}

/// What a step sees while it runs.
pub struct StepContext<'a> {
    pub config: &'a BuildConfig,
    pub shell: &'a Arc<Shell>,
}

/// One phase of the pipeline.
pub trait Step {
    fn kind(&self) -> StepKind;

    /// Run the step. Implementations return immediately when their
    /// workflow flag is off.
    fn run(&self, cx: &StepContext<'_>) -> Result<()>;
}

/// Runs the step pipeline for one configuration.
pub struct Builder {
    steps: Vec<Box<dyn Step>>,
    config: Option<BuildConfig>,
    shell: Arc<Shell>,
}

impl Builder {
    /// Create a builder with the standard clean, build, pack and test steps.
    pub fn new(shell: Arc<Shell>) -> Self {
        let mut builder = Builder::empty(shell);
        builder.setup_steps();
        builder
    }

    /// Create a builder without any steps.
    pub fn empty(shell: Arc<Shell>) -> Self {
        Builder {
            steps: Vec::new(),
            config: None,
            shell,
        }
    }

    fn setup_steps(&mut self) {
        self.register(Box::new(StepClean));
        self.register(Box::new(StepBuild));
        self.register(Box::new(StepPack));
        self.register(Box::new(StepTest));
    }

    /// Add a step at its pipeline position. Steps of the same kind keep
    /// their registration order.
    pub fn register(&mut self, step: Box<dyn Step>) {
        let at = self
            .steps
            .iter()
            .position(|s| s.kind() > step.kind())
            .unwrap_or(self.steps.len());
        self.steps.insert(at, step);
    }

    /// Kinds of the registered steps, in execution order.
    pub fn step_kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|s| s.kind()).collect()
    }

    /// Store the configuration for the next [`run`](Self::run).
    pub fn setup(&mut self, config: BuildConfig) {
        self.config = Some(config);
    }

    /// Run every step in order. The first failing step stops the pipeline
    /// and its error is returned unchanged.
    pub fn run(&self) -> Result<()> {
        let config = self.config.as_ref().ok_or_else(|| {
            BuildkitError::InvalidArgument("builder has not been set up".to_string())
        })?;

        tracing::debug!(
            "running pipeline for {} ({})",
            config.project_name,
            config.build_type()
        );

        let cx = StepContext {
            config,
            shell: &self.shell,
        };
        for step in &self.steps {
            tracing::debug!("step {:?}", step.kind());
            step.run(&cx)?;
        }
        Ok(())
    }

    pub fn setup_and_run(&mut self, config: BuildConfig) -> Result<()> {
        self.setup(config);
        self.run()
    }
}
