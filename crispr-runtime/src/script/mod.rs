//! # Script 模块
//!
//! 脚本解析相关功能，包括 AST 定义和解析器实现。
//!
//! ## 模块结构
//!
//! - [`ast`]：带位置信息的语法树
//! - [`parser`]：逐行的递归下降解析器

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::{ParseResult, Parser, parse_expression};
