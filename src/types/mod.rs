//! 类型模块：网关调用涉及的核心数据类型。
//!
//! # Types Module
//!
//! Strongly-typed building blocks shared by every gateway call.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Operation`] | Named remote action with an explicit [`OperationKind`] |
//! | [`Identity`] | Caller identity, including the reserved public and admin identities |
//! | [`Envelope`] | Wire envelope sent to the backend |
//! | [`GatewayResponse`] | Normalized backend response |

pub mod envelope;
pub mod identity;
pub mod operation;

pub use envelope::{Envelope, GatewayResponse, STATUS_SUCCESS};
pub use identity::Identity;
pub use operation::{Operation, OperationKind};
