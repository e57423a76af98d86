//! # Error 模块
//!
//! 定义 crispr-runtime 中使用的错误类型。
//!
//! ## 分类
//!
//! - [`ParseError`]：解析期错误，由解析器收集而不是抛出
//! - [`ExpressionError`] / [`HelperFunctionError`] / [`CommandError`]：求值期错误，
//!   绑定到出错的 AST 节点位置
//! - [`FrameworkError`]：与具体节点无关的框架级错误

use std::fmt;

use thiserror::Error;

use crate::bindings::BindingError;
use crate::context::ClientError;
use crate::num::NumError;
use crate::script::ast::{Location, Position};

/// 解析错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// 无法识别的语法
    InvalidSyntax,
    /// 字符串未闭合
    UnterminatedString,
    /// 数组缺少 `]`
    UnterminatedArray,
    /// 数组中出现空元素（连续逗号）
    EmptyArrayElement,
    /// 括号表达式或参数列表缺少 `)`
    UnclosedParenthesis,
    /// 命令块缺少结束行 `)`
    UnclosedBlock,
    /// 带冒号但模块/命令部分非法的命令名
    InvalidCommandName,
    /// 非法数字字面量
    InvalidNumber,
    /// 嵌套超出 [`crate::script::parser::MAX_PARSE_DEPTH`]
    TooDeeplyNested,
    /// 完整表达式之后的多余内容
    TrailingContent,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidSyntax => "InvalidSyntax",
            Self::UnterminatedString => "UnterminatedString",
            Self::UnterminatedArray => "UnterminatedArray",
            Self::EmptyArrayElement => "EmptyArrayElement",
            Self::UnclosedParenthesis => "UnclosedParenthesis",
            Self::UnclosedBlock => "UnclosedBlock",
            Self::InvalidCommandName => "InvalidCommandName",
            Self::InvalidNumber => "InvalidNumber",
            Self::TooDeeplyNested => "TooDeeplyNested",
            Self::TrailingContent => "TrailingContent",
        };
        f.write_str(name)
    }
}

/// 解析错误
#[derive(Error, Debug, Clone, PartialEq)]
#[error("ParseError({kind}) at {position}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 期望描述，如 `expecting ']'`
    pub message: String,
    pub position: Position,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }
}

/// 命令/辅助函数调用错误类别
///
/// 模块或名称无法解析与参数错误是不同的类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallErrorKind {
    /// 模块未加载或不存在
    ModuleNotFound,
    /// 模块中没有该命令/辅助函数
    NotFound,
    /// 参数数量错误
    Arity,
    /// 参数类型或取值错误
    InvalidArgument,
    /// 需要 action callback 但未提供
    MissingActionCallback,
    /// 执行体本身失败
    Failed,
}

/// 表达式求值错误
#[derive(Error, Debug, Clone, PartialEq)]
#[error("ExpressionError({loc}): {message}")]
pub struct ExpressionError {
    pub message: String,
    pub loc: Location,
}

impl ExpressionError {
    pub fn new(message: impl Into<String>, loc: Location) -> Self {
        Self {
            message: message.into(),
            loc,
        }
    }
}

/// 辅助函数错误
#[derive(Error, Debug, Clone, PartialEq)]
#[error("HelperFunctionError(@{helper}, {loc}): {message}")]
pub struct HelperFunctionError {
    pub helper: String,
    pub kind: CallErrorKind,
    pub message: String,
    pub loc: Location,
}

impl HelperFunctionError {
    pub fn new(
        helper: impl Into<String>,
        kind: CallErrorKind,
        message: impl Into<String>,
        loc: Location,
    ) -> Self {
        Self {
            helper: helper.into(),
            kind,
            message: message.into(),
            loc,
        }
    }
}

/// 命令错误
#[derive(Error, Debug, Clone, PartialEq)]
#[error("CommandError({command}, {loc}): {message}")]
pub struct CommandError {
    /// 带模块前缀的完整命令名
    pub command: String,
    pub kind: CallErrorKind,
    pub message: String,
    pub loc: Location,
}

impl CommandError {
    pub fn new(
        command: impl Into<String>,
        kind: CallErrorKind,
        message: impl Into<String>,
        loc: Location,
    ) -> Self {
        Self {
            command: command.into(),
            kind,
            message: message.into(),
            loc,
        }
    }
}

/// 框架级错误（与节点无关）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameworkError {
    #[error("ErrorException: {0}")]
    Exception(String),

    #[error("ErrorInvalid: {0}")]
    Invalid(String),

    #[error("ErrorNotFound: {0}")]
    NotFound(String),
}

/// 运行时错误
///
/// 解释过程中任何错误都会立即中止剩余脚本。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Helper(#[from] HelperFunctionError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Framework(#[from] FrameworkError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Num(#[from] NumError),
}

impl RuntimeError {
    /// 出错节点的位置（框架级错误没有位置）
    pub fn location(&self) -> Option<Location> {
        match self {
            Self::Expression(e) => Some(e.loc),
            Self::Helper(e) => Some(e.loc),
            Self::Command(e) => Some(e.loc),
            _ => None,
        }
    }
}

/// crispr-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrisprError {
    /// 解析错误（一次解析收集到的全部错误）
    #[error("{} parse error(s), first: {}", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
    Parse(Vec<ParseError>),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Result 类型别名
pub type CrisprResult<T> = Result<T, CrisprError>;

/// 参数数量比较方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonType {
    /// 恰好 n 个
    Equal(usize),
    /// 至少 n 个
    Greater(usize),
    /// 介于 min 与 max 之间（含边界）
    Between(usize, usize),
}

impl ComparisonType {
    /// 由必需参数个数和最大个数推导比较方式（`None` 表示不限）
    pub fn from_bounds(required: usize, max: Option<usize>) -> Self {
        match max {
            None => Self::Greater(required),
            Some(max) if max == required => Self::Equal(required),
            Some(max) => Self::Between(required, max),
        }
    }

    pub fn accepts(&self, received: usize) -> bool {
        match *self {
            Self::Equal(n) => received == n,
            Self::Greater(n) => received >= n,
            Self::Between(min, max) => (min..=max).contains(&received),
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "argument" } else { "arguments" }
}

/// 统一的长度不匹配消息
pub fn length_mismatch_message(expected: ComparisonType, received: usize) -> String {
    let expected = match expected {
        ComparisonType::Equal(n) => format!("{n} {}", plural(n)),
        ComparisonType::Greater(n) => format!("at least {n} {}", plural(n)),
        ComparisonType::Between(min, max) => format!("between {min} and {max} arguments"),
    };
    format!("invalid number of arguments. Expected {expected}, but got {received}")
}

/// 校验参数数量，失败时返回统一消息
pub fn check_arity(expected: ComparisonType, received: usize) -> Result<(), String> {
    if expected.accepts(received) {
        Ok(())
    } else {
        Err(length_mismatch_message(expected, received))
    }
}
