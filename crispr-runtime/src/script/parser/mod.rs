//! # Parser 模块
//!
//! 手写递归下降的脚本解析器（无 regex 依赖）。
//!
//! ## 架构
//!
//! ```text
//! 原始文本 → [命令行识别] → CommandExpression → [参数解析] → Node
//!                ↓ 出错
//!          记录 ParseError，跳到下一行继续
//! ```
//!
//! ## 设计原则
//!
//! - 按行解析：一行一个命令，命令块以行尾 `(` 开始、以单独一行 `)` 结束
//! - 容错解析：错误被收集而不是抛出，已解析的部分（包括未闭合的块）保留在 AST 中
//! - 位置追踪：每个节点记录行、列、偏移
//!
//! ## 模块结构
//!
//! - `cursor`: 字符游标
//! - `literal`: 字面量解析（数字、字符串、十六进制、裸词）
//! - `expr_parser`: 表达式解析（数组、算术、辅助函数、方法调用）
//! - `command`: 命令行与命令块解析

mod command;
mod cursor;
mod expr_parser;
mod literal;

#[cfg(test)]
mod tests;

use crate::error::{CrisprError, ParseError, ParseErrorKind};
use crate::script::ast::BlockExpression;

use cursor::Cursor;

pub use expr_parser::parse_expression;

/// 默认最大嵌套深度（块、括号、数组、参数列表合计）
pub const MAX_PARSE_DEPTH: usize = 32;

/// 一次解析的结果
///
/// 即使有错误，`ast` 也包含所有成功解析的命令。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResult {
    pub ast: BlockExpression,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// 有任何错误时返回 [`CrisprError::Parse`]
    pub fn into_result(self) -> Result<BlockExpression, CrisprError> {
        if self.errors.is_empty() {
            Ok(self.ast)
        } else {
            Err(CrisprError::Parse(self.errors))
        }
    }
}

/// 脚本解析器
#[derive(Debug, Clone)]
pub struct Parser {
    max_depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            max_depth: MAX_PARSE_DEPTH,
        }
    }

    /// 指定最大嵌套深度
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// 解析脚本文本
    ///
    /// 不会失败：所有问题都记录在 [`ParseResult::errors`] 中。
    pub fn parse(&self, text: &str) -> ParseResult {
        let mut state = ScriptParser::new(text, self.max_depth);
        let commands = state.parse_command_lines(false);
        ParseResult {
            ast: BlockExpression { commands },
            errors: state.errors,
        }
    }
}

/// 解析过程中的可变状态
pub(crate) struct ScriptParser<'a> {
    cursor: Cursor<'a>,
    errors: Vec<ParseError>,
    depth: usize,
    max_depth: usize,
}

impl<'a> ScriptParser<'a> {
    fn new(text: &'a str, max_depth: usize) -> Self {
        Self {
            cursor: Cursor::new(text),
            errors: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    /// 在当前位置构造错误
    fn error(&self, kind: ParseErrorKind, message: impl Into<String>) -> ParseError {
        ParseError::new(kind, message, self.cursor.position())
    }

    /// 进入一层嵌套
    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.error(
                ParseErrorKind::TooDeeplyNested,
                format!("nesting deeper than {} levels", self.max_depth),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// 描述当前字符，用于错误消息
    fn describe_next(&self) -> String {
        match self.cursor.peek() {
            None => "end of input".to_string(),
            Some('\n') => "end of line".to_string(),
            Some(c) => format!("'{c}'"),
        }
    }
}
