//! # 参数类型
//!
//! 命令与辅助函数的参数声明。声明是纯数据，校验与收窄由执行器统一完成。

use std::fmt;
use std::sync::Arc;

use crate::bindings::BindingsManager;
use crate::error::ComparisonType;
use crate::module::registry::ModuleRegistry;
use crate::value::Value;

/// 自定义类型可访问的只读上下文
pub struct TypeContext<'a> {
    pub bindings: &'a BindingsManager,
    pub registry: &'a ModuleRegistry,
}

/// 自定义参数类型
///
/// `validate` 必须实现；`completions` 与 `resolve` 可选。
pub trait CustomType: Send + Sync {
    fn name(&self) -> &'static str;

    /// 校验求值后的值，失败时返回原因
    fn validate(&self, value: &Value) -> Result<(), String>;

    /// 编辑器补全候选
    fn completions(&self, _ctx: &TypeContext<'_>) -> Vec<String> {
        Vec::new()
    }

    /// 校验通过后把值转换为命令实际使用的形式
    fn resolve(&self, value: Value, _ctx: &TypeContext<'_>) -> Result<Value, String> {
        Ok(value)
    }
}

/// 参数类型
#[derive(Clone)]
pub enum ArgType {
    Address,
    Bool,
    Number,
    String,
    Bytes,
    /// 恰好 32 字节
    Bytes32,
    /// 必须是 `$name` 节点，传入变量名（不求值）
    Variable,
    /// 必须是命令块，传入未求值的块节点
    Block,
    /// 可加载的模块名（不求值）
    Module,
    Any,
    Custom(Arc<dyn CustomType>),
}

impl ArgType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Bytes32 => "bytes32",
            Self::Variable => "variable",
            Self::Block => "block",
            Self::Module => "module",
            Self::Any => "any",
            Self::Custom(t) => t.name(),
        }
    }

    /// 参数节点是否按原样传入而不求值
    pub fn is_unevaluated(&self) -> bool {
        matches!(self, Self::Variable | Self::Block | Self::Module)
    }
}

impl fmt::Debug for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArgType({})", self.name())
    }
}

/// 位置参数声明
#[derive(Debug, Clone)]
pub struct ArgDef {
    pub name: &'static str,
    pub ty: ArgType,
    pub optional: bool,
    /// 吸收剩余所有参数（只能是最后一个）
    pub rest: bool,
}

impl ArgDef {
    pub fn new(name: &'static str, ty: ArgType) -> Self {
        Self {
            name,
            ty,
            optional: false,
            rest: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn rest(mut self) -> Self {
        self.rest = true;
        self
    }
}

/// 命名选项声明 `--name value`
#[derive(Debug, Clone)]
pub struct OptDef {
    pub name: &'static str,
    pub ty: ArgType,
}

impl OptDef {
    pub fn new(name: &'static str, ty: ArgType) -> Self {
        Self { name, ty }
    }
}

/// 由参数声明推导数量约束
pub fn arity_of(args: &[ArgDef]) -> ComparisonType {
    let required = args.iter().filter(|a| !a.optional && !a.rest).count();
    let max = if args.iter().any(|a| a.rest) {
        None
    } else {
        Some(args.len())
    };
    ComparisonType::from_bounds(required, max)
}
