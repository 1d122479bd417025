//! # HMS Core
//!
//! 医院管理系统的核心模块，提供领域模型、错误定义、请求上下文和通用工具。

pub mod context;
pub mod error;
pub mod models;
pub mod utils;

pub use context::{access, AuthenticatedUser, RequestContext};
pub use error::{HmsError, Result};
pub use models::*;
