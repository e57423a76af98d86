//! # Runtime 模块
//!
//! 解释器核心，负责命令执行与作用域管理。
//!
//! ## 模块结构
//!
//! - [`engine`]：解释器与执行循环
//! - [`executor`]：名称解析与表达式求值

pub mod engine;
pub mod executor;

pub use engine::{Interpreter, InterpreterConfig};
