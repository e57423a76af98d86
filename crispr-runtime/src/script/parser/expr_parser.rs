//! # 表达式解析器
//!
//! 解析命令参数位置上的表达式：
//!
//! - 字面量与变量
//! - 数组 `[a, b]`
//! - 括号算术 `(a + b * c)`，按优先级爬升，`^` 右结合
//! - 辅助函数 `@name(args)`，无参时括号可省略
//! - 方法调用 `target::method(args)`，可链式

use super::ScriptParser;
use super::literal::is_name_start;
use crate::error::{ParseError, ParseErrorKind};
use crate::script::ast::{
    ArithmeticExpression, BinaryOperator, CallExpression, HelperFunctionExpression, Location, Node,
    NodeKind,
};

/// 解析单个表达式（整个输入必须恰好是一个表达式）
///
/// # 示例
///
/// ```ignore
/// let node = parse_expression("(1 + 2) ")?;
/// ```
pub fn parse_expression(text: &str) -> Result<Node, ParseError> {
    let mut parser = ScriptParser::new(text, super::MAX_PARSE_DEPTH);
    parser.cursor.skip_inline_ws();
    let node = parser.parse_argument()?;
    parser.cursor.skip_inline_ws();
    if !parser.cursor.is_eof() {
        return Err(parser.error(
            ParseErrorKind::TrailingContent,
            format!("unexpected {} after expression", parser.describe_next()),
        ));
    }
    Ok(node)
}

impl ScriptParser<'_> {
    /// 参数位置上的表达式
    pub(super) fn parse_argument(&mut self) -> Result<Node, ParseError> {
        let node = match self.cursor.peek() {
            Some('[') => return self.parse_array(),
            Some('(') => return self.parse_parenthesized(),
            Some('"' | '\'') => return self.parse_string(),
            Some('@') => self.parse_helper()?,
            Some('$') => self.parse_variable()?,
            Some('0') if self.cursor.starts_with("0x") => self.parse_hex()?,
            Some(c) if c.is_ascii_digit() => return self.parse_number(),
            Some('-') if self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                return self.parse_number();
            }
            Some(c) if is_name_start(c) => return self.parse_bareword(),
            _ => {
                return Err(self.error(
                    ParseErrorKind::InvalidSyntax,
                    format!("expecting an argument, got {}", self.describe_next()),
                ));
            }
        };
        self.parse_call_chain(node)
    }

    /// 地址、变量、辅助函数之后的 `::method(args)` 链
    fn parse_call_chain(&mut self, mut target: Node) -> Result<Node, ParseError> {
        while self.cursor.starts_with("::") {
            if matches!(target.kind, NodeKind::BytesLiteral(_) | NodeKind::HexLiteral(_)) {
                return Err(self.error(
                    ParseErrorKind::InvalidSyntax,
                    "method calls need an address, variable or helper target",
                ));
            }
            self.cursor.eat("::");
            let method = self.parse_identifier("method name")?;
            if self.cursor.peek() != Some('(') {
                return Err(self.error(
                    ParseErrorKind::InvalidSyntax,
                    format!("expecting '(' after method {method}"),
                ));
            }
            let args = self.parse_call_args()?;
            let loc = self.cursor.span_from(target.loc.start);
            target = Node::new(
                NodeKind::Call(CallExpression {
                    target: Box::new(target),
                    method,
                    args,
                }),
                loc,
            );
        }
        Ok(target)
    }

    /// `@name` 或 `@name(args)`
    fn parse_helper(&mut self) -> Result<Node, ParseError> {
        let start = self.cursor.position();
        self.cursor.bump();
        match self.cursor.peek() {
            Some(c) if is_name_start(c) => {}
            _ => {
                return Err(self.error(
                    ParseErrorKind::InvalidSyntax,
                    format!("expecting helper name after '@', got {}", self.describe_next()),
                ));
            }
        }
        let name = self.eat_name().to_string();
        let args = if self.cursor.peek() == Some('(') {
            self.parse_call_args()?
        } else {
            Vec::new()
        };
        Ok(Node::new(
            NodeKind::Helper(HelperFunctionExpression { name, args }),
            self.cursor.span_from(start),
        ))
    }

    /// `(a, b, c)`，允许空列表
    fn parse_call_args(&mut self) -> Result<Vec<Node>, ParseError> {
        let open = self.cursor.position();
        self.cursor.bump();
        self.enter()?;
        let mut args = Vec::new();
        self.cursor.skip_inline_ws();
        if self.cursor.eat(")") {
            self.leave();
            return Ok(args);
        }
        loop {
            self.cursor.skip_inline_ws();
            match self.cursor.peek() {
                None | Some('\n') => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnclosedParenthesis,
                        "expecting ')'",
                        open,
                    ));
                }
                Some(',' | ')') => {
                    return Err(self.error(ParseErrorKind::InvalidSyntax, "expecting an argument"));
                }
                _ => {}
            }
            args.push(self.parse_argument()?);
            self.cursor.skip_inline_ws();
            match self.cursor.peek() {
                Some(',') => {
                    self.cursor.bump();
                }
                Some(')') => {
                    self.cursor.bump();
                    break;
                }
                None | Some('\n') => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnclosedParenthesis,
                        "expecting ')'",
                        open,
                    ));
                }
                _ => {
                    return Err(self.error(
                        ParseErrorKind::InvalidSyntax,
                        format!("expecting ',' or ')', got {}", self.describe_next()),
                    ));
                }
            }
        }
        self.leave();
        Ok(args)
    }

    /// `[a, b]`
    fn parse_array(&mut self) -> Result<Node, ParseError> {
        let start = self.cursor.position();
        self.cursor.bump();
        self.enter()?;
        let mut items = Vec::new();
        self.cursor.skip_inline_ws();
        if !self.cursor.eat("]") {
            loop {
                self.cursor.skip_inline_ws();
                match self.cursor.peek() {
                    None | Some('\n') => {
                        return Err(ParseError::new(
                            ParseErrorKind::UnterminatedArray,
                            "expecting ']'",
                            start,
                        ));
                    }
                    Some(',' | ']') => {
                        return Err(self.error(
                            ParseErrorKind::EmptyArrayElement,
                            "expecting an array element",
                        ));
                    }
                    _ => {}
                }
                items.push(self.parse_argument()?);
                self.cursor.skip_inline_ws();
                match self.cursor.peek() {
                    Some(',') => {
                        self.cursor.bump();
                    }
                    Some(']') => {
                        self.cursor.bump();
                        break;
                    }
                    None | Some('\n') => {
                        return Err(ParseError::new(
                            ParseErrorKind::UnterminatedArray,
                            "expecting ']'",
                            start,
                        ));
                    }
                    _ => {
                        return Err(self.error(
                            ParseErrorKind::InvalidSyntax,
                            format!("expecting ',' or ']', got {}", self.describe_next()),
                        ));
                    }
                }
            }
        }
        self.leave();
        Ok(Node::new(NodeKind::Array(items), self.cursor.span_from(start)))
    }

    /// `( expr )`：结果节点的位置覆盖括号本身
    fn parse_parenthesized(&mut self) -> Result<Node, ParseError> {
        let start = self.cursor.position();
        self.cursor.bump();
        self.enter()?;
        self.cursor.skip_inline_ws();
        let mut node = self.parse_binary(0)?;
        self.cursor.skip_inline_ws();
        match self.cursor.peek() {
            Some(')') => {
                self.cursor.bump();
            }
            None | Some('\n') => {
                return Err(ParseError::new(
                    ParseErrorKind::UnclosedParenthesis,
                    "expecting ')'",
                    start,
                ));
            }
            _ => {
                return Err(self.error(
                    ParseErrorKind::InvalidSyntax,
                    format!("expecting operator or ')', got {}", self.describe_next()),
                ));
            }
        }
        self.leave();
        node.loc = self.cursor.span_from(start);
        Ok(node)
    }

    /// 优先级爬升
    fn parse_binary(&mut self, min_prec: u8) -> Result<Node, ParseError> {
        let mut left = self.parse_operand()?;
        loop {
            self.cursor.skip_inline_ws();
            let Some(op) = self.cursor.peek().and_then(BinaryOperator::from_char) else {
                break;
            };
            if op.precedence() < min_prec {
                break;
            }
            self.cursor.bump();
            self.cursor.skip_inline_ws();
            let next_min = if op.is_right_assoc() {
                op.precedence()
            } else {
                op.precedence() + 1
            };
            let right = self.parse_binary(next_min)?;
            let loc = Location::new(left.loc.start, right.loc.end);
            left = Node::new(
                NodeKind::Arithmetic(ArithmeticExpression {
                    operator: op,
                    left: Box::new(left),
                    right: Box::new(right),
                }),
                loc,
            );
        }
        Ok(left)
    }

    /// 算术操作数
    fn parse_operand(&mut self) -> Result<Node, ParseError> {
        match self.cursor.peek() {
            Some('(') => self.parse_parenthesized(),
            Some('$' | '@') => self.parse_argument(),
            Some('0') if self.cursor.starts_with("0x") => self.parse_argument(),
            Some(c) if c.is_ascii_digit() => self.parse_number(),
            Some('-') if self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.parse_number()
            }
            None | Some('\n') => Err(self.error(
                ParseErrorKind::UnclosedParenthesis,
                "expecting an operand",
            )),
            _ => Err(self.error(
                ParseErrorKind::InvalidSyntax,
                format!(
                    "expecting number, variable, helper or '(', got {}",
                    self.describe_next()
                ),
            )),
        }
    }
}
