//! # 标准模块 `std`
//!
//! 不需要 `load` 即可使用；无前缀命令默认解析到这里。
//!
//! ## 命令
//!
//! | 命令 | 说明 |
//! |------|------|
//! | `load <module> [as <alias>]` | 加载模块 |
//! | `set <$var> <value>` | 设置变量（`$module.key` 写入模块配置） |
//! | `print <value>...` | 输出 |
//! | `raw <to> <data> [value] [--from addr]` | 交易 |
//! | `rpc <method> [params...]` | RPC 调用 |
//! | `switch <network>` | 切换链 |
//! | `batch (` | 将块内交易打包为一个 batched action |
//! | `for <$var> of <array> (` | 循环 |
//! | `halt` | 停止执行 |
//!
//! ## 辅助函数
//!
//! - `@me`：已连接账户
//! - `@date(date[, offset])`：unix 时间戳

mod control;
mod helpers;
mod load;
mod set;
mod tx;

use std::sync::Arc;

use crate::module::{CustomType, ModuleDescriptor};
use crate::script::ast::BlockExpression;
use crate::value::Value;

pub use tx::{KNOWN_NETWORKS, NetworkType};

/// 标准模块名
pub const STD_MODULE: &str = "std";

/// 构造标准模块
pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(STD_MODULE)
        .with_command(load::Load)
        .with_command(set::Set)
        .with_command(control::Print)
        .with_command(tx::Raw)
        .with_command(tx::Rpc)
        .with_command(tx::Switch)
        .with_command(control::Batch)
        .with_command(control::For)
        .with_command(control::Halt)
        .with_helper(helpers::Me)
        .with_helper(helpers::Date)
}

/// 固定关键字参数，如 `load x as y` 中的 `as`
pub struct Keyword(pub &'static str);

impl Keyword {
    pub fn arg_type(keyword: &'static str) -> crate::module::ArgType {
        crate::module::ArgType::Custom(Arc::new(Self(keyword)))
    }
}

impl CustomType for Keyword {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        match value {
            Value::String(s) if s == self.0 => Ok(()),
            other => Err(format!("expected keyword '{}', but got {other}", self.0)),
        }
    }

    fn completions(&self, _ctx: &crate::module::TypeContext<'_>) -> Vec<String> {
        vec![self.0.to_string()]
    }
}

/// 取出 `block` 类型参数中的命令块
fn block_arg(value: &Value) -> Option<&BlockExpression> {
    match value.as_node().map(|node| &node.kind) {
        Some(crate::script::ast::NodeKind::Block(block)) => Some(block),
        _ => None,
    }
}
