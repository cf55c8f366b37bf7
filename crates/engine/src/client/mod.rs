pub mod connect;
pub mod error;
pub mod fake;
pub mod live;
pub mod ops;
pub mod options;
pub mod runtime;
pub mod tunnel;

pub use connect::{LiveConnector, RuntimeConnector};
pub use error::RuntimeError;
pub use fake::{FakeConnector, FakeRuntime};
pub use ops::{with_timeout, RuntimeOps};
pub use options::{ConnectionOptions, Transport};
pub use runtime::RuntimeClient;
