pub mod compiler;
pub mod registry;

pub use compiler::compile;
pub use registry::TriggerRegistry;
