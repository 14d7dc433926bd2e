//! # 助手模块

mod service;

pub use service::{AssistantService, ResolvedModel};
