//! # HMS Web模块
//!
//! 基于 axum 的服务端渲染页面：会话、登录注册、各业务页面与表单处理

pub mod auth;
pub mod error;
pub mod forms;
pub mod pages;
pub mod server;
pub mod session;
pub mod state;
pub mod views;

#[cfg(test)]
mod tests;

pub use error::AppError;
pub use server::{router, WebServer};
pub use session::{MemorySessionStore, SessionStore};
pub use state::{AppState, WebSettings};
