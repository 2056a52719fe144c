//! Gateway dispatcher.
//!
//! Keep the public surface small: build a [`Gateway`] once, then issue calls
//! through [`Gateway::call`] or the [`CallBuilder`] returned by
//! [`Gateway::request`].

pub mod builder;
pub mod call;
pub mod core;
pub mod signals;

pub use builder::GatewayBuilder;
pub use call::CallBuilder;
pub use self::core::Gateway;
pub use signals::SignalsSnapshot;
