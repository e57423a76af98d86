//! # 命令解析
//!
//! 一行一个命令：
//!
//! ```text
//! [module:]name arg* [--opt value]* [-> Event $var...]* [(]
//! ```
//!
//! 行尾的 `(` 打开命令块，块内逐行是命令，单独一行 `)` 结束块。

use super::ScriptParser;
use super::cursor::is_arg_delimiter;
use crate::error::{ParseError, ParseErrorKind};
use crate::script::ast::{BlockExpression, CommandExpression, CommandOpt, EventCapture, Node, NodeKind};

/// 模块名与命令名的单段格式 `[A-Za-z][A-Za-z0-9-]*`
fn is_valid_segment(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl ScriptParser<'_> {
    /// 逐行解析命令，直到 EOF 或（嵌套时）结束行 `)`
    pub(super) fn parse_command_lines(&mut self, nested: bool) -> Vec<CommandExpression> {
        self.parse_command_lines_inner(nested).0
    }

    /// 返回 (命令, 是否遇到结束行)
    fn parse_command_lines_inner(&mut self, nested: bool) -> (Vec<CommandExpression>, bool) {
        let mut commands = Vec::new();
        loop {
            self.cursor.skip_trivia();
            if self.cursor.is_eof() {
                return (commands, false);
            }

            if self.cursor.peek() == Some(')') {
                if nested {
                    self.cursor.bump();
                    if !self.cursor.at_line_end() {
                        self.cursor.skip_inline_ws();
                        let err = self.error(
                            ParseErrorKind::TrailingContent,
                            format!("unexpected {} after ')'", self.describe_next()),
                        );
                        self.errors.push(err);
                    }
                    self.cursor.skip_line();
                    return (commands, true);
                }
                let err = self.error(ParseErrorKind::InvalidSyntax, "unexpected ')' outside of a block");
                self.errors.push(err);
                self.cursor.skip_line();
                continue;
            }

            let depth = self.depth;
            match self.parse_command() {
                Ok(command) => commands.push(command),
                Err(err) => {
                    self.depth = depth;
                    self.errors.push(err);
                    self.cursor.skip_line();
                }
            }
        }
    }

    fn parse_command(&mut self) -> Result<CommandExpression, ParseError> {
        let start = self.cursor.position();
        let (module, name) = self.parse_command_name()?;

        let mut args = Vec::new();
        let mut opts = Vec::new();
        let mut captures = Vec::new();

        loop {
            self.cursor.skip_inline_ws();
            if self.cursor.at_line_end() {
                self.cursor.skip_comment();
                break;
            }

            if self.cursor.starts_with("--") {
                opts.push(self.parse_option()?);
            } else if self.cursor.starts_with("->") {
                captures.push(self.parse_capture()?);
            } else if self.is_block_start() {
                args.push(self.parse_block()?);
                // 块之后命令结束，结束行已被消费
                return Ok(CommandExpression {
                    module,
                    name,
                    args,
                    opts,
                    captures,
                    loc: self.cursor.span_from(start),
                });
            } else {
                args.push(self.parse_argument()?);
            }
            self.expect_delimiter()?;
        }

        Ok(CommandExpression {
            module,
            name,
            args,
            opts,
            captures,
            loc: self.cursor.span_from(start),
        })
    }

    /// `[module:]name`
    fn parse_command_name(&mut self) -> Result<(Option<String>, String), ParseError> {
        let start = self.cursor.position();
        match self.cursor.peek() {
            Some(c) if c.is_ascii_alphabetic() => {}
            _ => {
                return Err(self.error(
                    ParseErrorKind::InvalidSyntax,
                    format!("expecting command name, got {}", self.describe_next()),
                ));
            }
        }
        let raw = self
            .cursor
            .eat_while(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_' | '.'));
        if !is_arg_delimiter(self.cursor.peek()) && !self.is_block_start() {
            return Err(self.error(
                ParseErrorKind::InvalidCommandName,
                format!("invalid command name, unexpected {}", self.describe_next()),
            ));
        }

        let invalid = || {
            ParseError::new(
                ParseErrorKind::InvalidCommandName,
                format!("invalid command name '{raw}'. Expecting [module:]command"),
                start,
            )
        };
        match raw.split_once(':') {
            Some((module, name)) => {
                if is_valid_segment(module) && is_valid_segment(name) {
                    Ok((Some(module.to_string()), name.to_string()))
                } else {
                    Err(invalid())
                }
            }
            None if is_valid_segment(raw) => Ok((None, raw.to_string())),
            None => Err(invalid()),
        }
    }

    /// `--name value`
    fn parse_option(&mut self) -> Result<CommandOpt, ParseError> {
        let start = self.cursor.position();
        self.cursor.eat("--");
        let name = self.cursor.eat_while(|c| c.is_ascii_alphanumeric() || c == '-').to_string();
        if !is_valid_segment(&name) {
            return Err(self.error(
                ParseErrorKind::InvalidSyntax,
                format!("expecting option name after '--', got {}", self.describe_next()),
            ));
        }
        self.cursor.skip_inline_ws();
        if self.cursor.at_line_end() {
            return Err(self.error(
                ParseErrorKind::InvalidSyntax,
                format!("expecting a value for option --{name}"),
            ));
        }
        let value = self.parse_argument()?;
        Ok(CommandOpt {
            name,
            value,
            loc: self.cursor.span_from(start),
        })
    }

    /// `-> Event $a $b`
    fn parse_capture(&mut self) -> Result<EventCapture, ParseError> {
        let start = self.cursor.position();
        self.cursor.eat("->");
        self.cursor.skip_inline_ws();
        let event = self.parse_identifier("event name")?;

        let mut variables = Vec::new();
        loop {
            let mut ahead = self.cursor;
            ahead.skip_inline_ws();
            if ahead.peek() != Some('$') {
                break;
            }
            self.cursor = ahead;
            if let NodeKind::Variable(var) = self.parse_variable()?.kind {
                variables.push(var);
            }
        }
        if variables.is_empty() {
            return Err(self.error(
                ParseErrorKind::InvalidSyntax,
                format!("expecting at least one variable to capture {event}"),
            ));
        }
        Ok(EventCapture {
            event,
            variables,
            loc: self.cursor.span_from(start),
        })
    }

    /// `(` 之后到行尾只有空白或注释
    fn is_block_start(&self) -> bool {
        if self.cursor.peek() != Some('(') {
            return false;
        }
        let mut ahead = self.cursor;
        ahead.bump();
        ahead.at_line_end()
    }

    /// 命令块
    ///
    /// 缺少结束行时记录 [`ParseErrorKind::UnclosedBlock`]，但保留已解析的命令。
    fn parse_block(&mut self) -> Result<Node, ParseError> {
        let start = self.cursor.position();
        self.enter()?;
        self.cursor.skip_line();
        let (commands, closed) = self.parse_command_lines_inner(true);
        if !closed {
            self.errors.push(ParseError::new(
                ParseErrorKind::UnclosedBlock,
                "expecting ')' to close the block",
                start,
            ));
        }
        self.leave();
        Ok(Node::new(
            NodeKind::Block(BlockExpression { commands }),
            self.cursor.span_from(start),
        ))
    }

    /// 参数之后必须是分隔符
    fn expect_delimiter(&self) -> Result<(), ParseError> {
        if is_arg_delimiter(self.cursor.peek()) {
            Ok(())
        } else {
            Err(self.error(
                ParseErrorKind::TrailingContent,
                format!("expecting whitespace after argument, got {}", self.describe_next()),
            ))
        }
    }
}
