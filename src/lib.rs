//! llm-gateway: HTTP gateway in front of a local LLM runtime
//! llm-gateway：本地LLM运行时的HTTP网关

// Shared modules / 共享模块
pub mod config;
pub mod runtime;

// Service-specific modules / 服务特定模块
pub mod adapter;
pub mod gateway;

// Re-exports / 重新导出
pub use config::*;
