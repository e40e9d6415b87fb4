pub mod dispatcher;
pub mod lifecycle;
pub mod payload;
pub mod push;

pub use dispatcher::{run, Dispatcher};
pub use lifecycle::EndpointLifecycle;
pub use push::PushClient;
