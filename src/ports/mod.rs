//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the scanner core and an external
//! system (time, filesystem, IDs, processes, the planning tool).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod command;
pub mod filesystem;
pub mod id_gen;
pub mod tool;

pub use clock::Clock;
pub use command::{CommandFuture, CommandOutput, CommandRunner, Invocation};
pub use filesystem::FileSystem;
pub use id_gen::IdGenerator;
pub use tool::{
    InstallFuture, PlanningTool, StateSnapshot, ToolFuture, ToolInstaller, ToolProvider,
};
