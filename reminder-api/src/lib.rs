pub mod handlers;
pub mod server;

pub use server::{run, ApiState};
