//! Scripted tasks operating on switch devices.

pub mod dummy_task;

pub use dummy_task::DummyTask;

use crate::error::Result;

/// A one-shot procedure run on demand.
pub trait ModuleTask {
    /// Name used in log output.
    fn name(&self) -> &str;

    /// Task body. Errors propagate to the caller unchanged.
    fn run_task(&self) -> Result<()>;

    /// Run the task, logging start and outcome.
    fn run(&self) -> Result<()> {
        log::info!("[{}] task started", self.name());
        let result = self.run_task();
        match &result {
            Ok(()) => log::info!("[{}] task finished", self.name()),
            Err(e) => log::error!("[{}] task failed: {}", self.name(), e),
        }
        result
    }
}
