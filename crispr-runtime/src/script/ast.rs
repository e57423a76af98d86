//! # AST 模块
//!
//! 定义脚本的抽象语法树（Abstract Syntax Tree）。
//!
//! ## 设计说明
//!
//! AST 是解析器的输出，解析后只读。解释器读取 AST 并产生 Action，
//! 从不修改节点。每个节点都携带源码位置，错误消息原样引用该位置。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::num::{MAX_EXPONENT, Num, NumError, pow10};

/// 源码中的一个位置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 行号（从 1 开始）
    pub line: usize,
    /// 列号（从 0 开始，按字符计）
    pub col: usize,
    /// 字节偏移（从 0 开始）
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, col: usize, offset: usize) -> Self {
        Self { line, col, offset }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// 节点覆盖的源码区间 `[start, end)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// 偏移是否落在区间内（含结束位置，便于光标定位）
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start.offset <= offset && offset <= self.end.offset
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)
    }
}

/// 时间单位后缀
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    /// 30 天
    Month,
    /// 365 天
    Year,
}

impl TimeUnit {
    /// 按匹配优先级排列（`mo` 必须先于 `m`）
    pub const ALL: [TimeUnit; 7] = [
        TimeUnit::Month,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
        TimeUnit::Day,
        TimeUnit::Week,
        TimeUnit::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Minute => "m",
            Self::Hour => "h",
            Self::Day => "d",
            Self::Week => "w",
            Self::Month => "mo",
            Self::Year => "y",
        }
    }

    /// 对应的秒数
    pub fn seconds(&self) -> u64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
            Self::Week => 604_800,
            Self::Month => 2_592_000,
            Self::Year => 31_536_000,
        }
    }

    pub fn from_suffix(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == s)
    }
}

/// 数字字面量
///
/// 保留原始组成部分，数值为 `value × 10^power × time_unit 秒数`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberLiteral {
    /// 尾数（十进制字符串，可含小数点）
    pub value: String,
    /// 10 的幂；`wei`/`gwei`/`eth` 分别为 0/9/18
    pub power: i64,
    pub time_unit: Option<TimeUnit>,
}

impl NumberLiteral {
    /// 计算精确值
    pub fn to_num(&self) -> Result<Num, NumError> {
        let mantissa = Num::from_decimal_string(&self.value)?;
        let exp = u32::try_from(self.power.unsigned_abs())
            .ok()
            .filter(|e| *e <= MAX_EXPONENT)
            .ok_or_else(|| NumError::ExponentTooLarge(self.power.to_string()))?;
        let scale = Num::from_int(pow10(exp));
        let scaled = if self.power < 0 {
            mantissa.div(&scale)?
        } else {
            &mantissa * &scale
        };
        Ok(match self.time_unit {
            Some(unit) => &scaled * &Num::from_int(unit.seconds()),
            None => scaled,
        })
    }
}

/// 二元算术运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOperator {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Sub),
            '*' => Some(Self::Mul),
            '/' => Some(Self::Div),
            '%' => Some(Self::Mod),
            '^' => Some(Self::Pow),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
            Self::Mod => '%',
            Self::Pow => '^',
        }
    }

    /// 优先级，数值越大结合越紧
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Add | Self::Sub => 1,
            Self::Mul | Self::Div | Self::Mod => 2,
            Self::Pow => 3,
        }
    }

    pub fn is_right_assoc(&self) -> bool {
        matches!(self, Self::Pow)
    }
}

/// 方法调用 `target::method(args)`
///
/// 链式调用通过嵌套表示：`a::b()::c()` 的 target 是 `a::b()`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpression {
    pub target: Box<Node>,
    pub method: String,
    pub args: Vec<Node>,
}

/// 辅助函数调用 `@name(args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperFunctionExpression {
    pub name: String,
    pub args: Vec<Node>,
}

/// 算术表达式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArithmeticExpression {
    pub operator: BinaryOperator,
    pub left: Box<Node>,
    pub right: Box<Node>,
}

/// 命令块：按源码顺序排列的命令
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockExpression {
    pub commands: Vec<CommandExpression>,
}

impl BlockExpression {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

/// 命名选项 `--name value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOpt {
    pub name: String,
    pub value: Node,
    pub loc: Location,
}

/// 事件捕获 `-> EventName $a $b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCapture {
    pub event: String,
    /// 按事件参数位置绑定的变量名（不含 `$`）
    pub variables: Vec<String>,
    pub loc: Location,
}

/// 命令表达式
///
/// `[module:]name arg* [--opt value]* [-> Event $var...]* [block]`
///
/// 尾随命令块作为最后一个位置参数（[`NodeKind::Block`]）保存在 `args` 中。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandExpression {
    pub module: Option<String>,
    pub name: String,
    pub args: Vec<Node>,
    pub opts: Vec<CommandOpt>,
    pub captures: Vec<EventCapture>,
    pub loc: Location,
}

impl CommandExpression {
    /// 带模块前缀的完整名称
    pub fn full_name(&self) -> String {
        match &self.module {
            Some(module) => format!("{module}:{}", self.name),
            None => self.name.clone(),
        }
    }

    /// 尾随命令块
    pub fn block(&self) -> Option<&BlockExpression> {
        match self.args.last().map(|n| &n.kind) {
            Some(NodeKind::Block(block)) => Some(block),
            _ => None,
        }
    }

    pub fn opt(&self, name: &str) -> Option<&CommandOpt> {
        self.opts.iter().find(|o| o.name == name)
    }
}

/// AST 节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: Location,
}

/// 节点类别
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// `0x` + 40 位十六进制
    AddressLiteral(String),
    BoolLiteral(bool),
    NumberLiteral(NumberLiteral),
    StringLiteral(String),
    /// `0x` + 偶数位十六进制
    BytesLiteral(String),
    /// `0x` + 奇数位十六进制，按整数求值
    HexLiteral(String),
    /// 不带引号的名称，如 `token-manager.open:0`
    Bareword(String),
    /// `$name`（不含 `$`）
    Variable(String),
    Array(Vec<Node>),
    Call(CallExpression),
    Helper(HelperFunctionExpression),
    Arithmetic(ArithmeticExpression),
    Block(BlockExpression),
}

impl Node {
    pub fn new(kind: NodeKind, loc: Location) -> Self {
        Self { kind, loc }
    }

    /// 用于错误消息的类别名
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::AddressLiteral(_) => "AddressLiteral",
            NodeKind::BoolLiteral(_) => "BoolLiteral",
            NodeKind::NumberLiteral(_) => "NumberLiteral",
            NodeKind::StringLiteral(_) => "StringLiteral",
            NodeKind::BytesLiteral(_) => "BytesLiteral",
            NodeKind::HexLiteral(_) => "HexLiteral",
            NodeKind::Bareword(_) => "Bareword",
            NodeKind::Variable(_) => "VariableIdentifier",
            NodeKind::Array(_) => "ArrayExpression",
            NodeKind::Call(_) => "CallExpression",
            NodeKind::Helper(_) => "HelperFunctionExpression",
            NodeKind::Arithmetic(_) => "ArithmeticExpression",
            NodeKind::Block(_) => "BlockExpression",
        }
    }

    /// 是否为字面量（可在无副作用的情况下同步求值）
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::AddressLiteral(_)
                | NodeKind::BoolLiteral(_)
                | NodeKind::NumberLiteral(_)
                | NodeKind::StringLiteral(_)
                | NodeKind::BytesLiteral(_)
                | NodeKind::HexLiteral(_)
                | NodeKind::Bareword(_)
        )
    }

    pub fn as_variable(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// 裸词或字符串字面量的文本
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Bareword(s) | NodeKind::StringLiteral(s) => Some(s),
            _ => None,
        }
    }
}
