//! # 字面量解析
//!
//! 数字、字符串、`0x` 十六进制、布尔值、裸词与变量名。

use super::ScriptParser;
use crate::error::{ParseError, ParseErrorKind};
use crate::script::ast::{Node, NodeKind, NumberLiteral, TimeUnit};

const ADDRESS_HEX_LEN: usize = 40;

/// 裸词首字符
pub(super) fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_bareword_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '-' | '_')
}

/// 标识符（方法名、事件名）
pub(super) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> ScriptParser<'a> {
    /// 读取一个不包含 `::` 的名称
    ///
    /// `::` 留给方法调用，`a::b` 中只读取 `a`。
    pub(super) fn eat_name(&mut self) -> &'a str {
        let start = self.cursor.remaining();
        let mut len = 0;
        while let Some(c) = self.cursor.peek() {
            if c == ':' && self.cursor.peek_nth(1) == Some(':') {
                break;
            }
            if !is_bareword_char(c) {
                break;
            }
            len += c.len_utf8();
            self.cursor.bump();
        }
        &start[..len]
    }

    /// 读取标识符 `[A-Za-z_][A-Za-z0-9_]*`
    pub(super) fn parse_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        match self.cursor.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => {
                return Err(self.error(
                    ParseErrorKind::InvalidSyntax,
                    format!("expecting {what}, got {}", self.describe_next()),
                ));
            }
        }
        Ok(self.cursor.eat_while(is_ident_char).to_string())
    }

    /// 裸词或布尔值
    pub(super) fn parse_bareword(&mut self) -> Result<Node, ParseError> {
        let start = self.cursor.position();
        let word = self.eat_name().to_string();
        if word.is_empty() {
            return Err(self.error(
                ParseErrorKind::InvalidSyntax,
                format!("expecting a name, got {}", self.describe_next()),
            ));
        }
        let kind = match word.as_str() {
            "true" => NodeKind::BoolLiteral(true),
            "false" => NodeKind::BoolLiteral(false),
            _ => NodeKind::Bareword(word),
        };
        Ok(Node::new(kind, self.cursor.span_from(start)))
    }

    /// `$name`
    pub(super) fn parse_variable(&mut self) -> Result<Node, ParseError> {
        let start = self.cursor.position();
        self.cursor.bump();
        match self.cursor.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => {
                return Err(self.error(
                    ParseErrorKind::InvalidSyntax,
                    format!("expecting variable name after '$', got {}", self.describe_next()),
                ));
            }
        }
        let name = self.eat_name().to_string();
        Ok(Node::new(NodeKind::Variable(name), self.cursor.span_from(start)))
    }

    /// 单引号或双引号字符串，内容按字面保留（不处理转义）
    pub(super) fn parse_string(&mut self) -> Result<Node, ParseError> {
        let start = self.cursor.position();
        let Some(quote) = self.cursor.bump() else {
            return Err(self.error(ParseErrorKind::InvalidSyntax, "expecting string"));
        };
        let mut text = String::new();
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedString,
                        format!("expecting closing {quote}"),
                        start,
                    ));
                }
                Some(c) if c == quote => {
                    self.cursor.bump();
                    break;
                }
                Some(c) => {
                    text.push(c);
                    self.cursor.bump();
                }
            }
        }
        Ok(Node::new(NodeKind::StringLiteral(text), self.cursor.span_from(start)))
    }

    /// `0x` 开头的地址、字节串或十六进制数
    pub(super) fn parse_hex(&mut self) -> Result<Node, ParseError> {
        let start = self.cursor.position();
        self.cursor.eat("0x");
        let digits = self.cursor.eat_while(|c| c.is_ascii_hexdigit()).to_string();
        if self.cursor.peek().is_some_and(is_ident_char) {
            return Err(self.error(
                ParseErrorKind::InvalidSyntax,
                format!("invalid hex digit {}", self.describe_next()),
            ));
        }
        let literal = format!("0x{digits}");
        let kind = if digits.len() == ADDRESS_HEX_LEN {
            NodeKind::AddressLiteral(literal)
        } else if digits.len() % 2 == 0 {
            NodeKind::BytesLiteral(literal)
        } else {
            NodeKind::HexLiteral(literal)
        };
        Ok(Node::new(kind, self.cursor.span_from(start)))
    }

    /// 数字字面量
    ///
    /// `-?digits(.digits)?` + 可选幂后缀（`eth`/`gwei`/`wei`/`eN`）+ 可选时间单位。
    pub(super) fn parse_number(&mut self) -> Result<Node, ParseError> {
        let start = self.cursor.position();
        let mut value = String::new();
        if self.cursor.eat("-") {
            value.push('-');
        }
        let int_part = self.cursor.eat_while(|c| c.is_ascii_digit());
        if int_part.is_empty() {
            return Err(self.error(ParseErrorKind::InvalidNumber, "expecting digits"));
        }
        value.push_str(int_part);

        if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.cursor.bump();
            value.push('.');
            value.push_str(self.cursor.eat_while(|c| c.is_ascii_digit()));
        }

        // `eth` 必须先于指数 `e` 匹配
        let power = if self.cursor.eat("eth") {
            18
        } else if self.cursor.eat("gwei") {
            9
        } else if self.cursor.eat("wei") {
            0
        } else {
            self.parse_exponent()?
        };

        let time_unit = TimeUnit::ALL
            .into_iter()
            .find(|unit| self.cursor.starts_with(unit.as_str()));
        if let Some(unit) = time_unit {
            self.cursor.eat(unit.as_str());
        }

        if self.cursor.peek().is_some_and(|c| is_ident_char(c) || c == '.') {
            return Err(ParseError::new(
                ParseErrorKind::InvalidNumber,
                format!("invalid number literal, unexpected {}", self.describe_next()),
                start,
            ));
        }

        Ok(Node::new(
            NodeKind::NumberLiteral(NumberLiteral {
                value,
                power,
                time_unit,
            }),
            self.cursor.span_from(start),
        ))
    }

    /// `e18` / `e-3`；没有数字时不消费任何字符
    fn parse_exponent(&mut self) -> Result<i64, ParseError> {
        if self.cursor.peek() != Some('e') {
            return Ok(0);
        }
        let mut ahead = self.cursor;
        ahead.bump();
        let negative = ahead.eat("-");
        let digits = ahead.eat_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Ok(0);
        }
        let exp: i64 = digits
            .parse()
            .map_err(|_| self.error(ParseErrorKind::InvalidNumber, format!("exponent {digits} too large")))?;
        self.cursor = ahead;
        Ok(if negative { -exp } else { exp })
    }
}
