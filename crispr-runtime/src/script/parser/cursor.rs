//! # 字符游标
//!
//! 手写解析器的底层读取工具，同时维护行、列、字节偏移。

use crate::script::ast::{Location, Position};

/// 源码游标
///
/// `Copy` 便于前瞻：复制一份向前试探，不影响原游标。
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    src: &'a str,
    offset: usize,
    line: usize,
    col: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            offset: 0,
            line: 1,
            col: 0,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.col, self.offset)
    }

    /// 从 `start` 到当前位置的区间
    pub fn span_from(&self, start: Position) -> Location {
        Location::new(start, self.position())
    }

    pub fn remaining(&self) -> &'a str {
        &self.src[self.offset..]
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.src.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.remaining().chars().nth(n)
    }

    pub fn starts_with(&self, s: &str) -> bool {
        self.remaining().starts_with(s)
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// 消费指定前缀（不跨行）
    pub fn eat(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            for _ in s.chars() {
                self.bump();
            }
            true
        } else {
            false
        }
    }

    /// 消费满足条件的连续字符，返回对应切片
    pub fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'a str {
        let start = self.offset;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
        &self.src[start..self.offset]
    }

    /// 跳过行内空白（不含换行）
    pub fn skip_inline_ws(&mut self) {
        self.eat_while(|c| c == ' ' || c == '\t' || c == '\r');
    }

    /// 跳过 `#` 注释（不消费换行）
    pub fn skip_comment(&mut self) {
        if self.peek() == Some('#') {
            self.eat_while(|c| c != '\n');
        }
    }

    /// 当前行是否已结束（行内空白与注释之后为换行或 EOF）
    pub fn at_line_end(&self) -> bool {
        let mut ahead = *self;
        ahead.skip_inline_ws();
        ahead.skip_comment();
        matches!(ahead.peek(), None | Some('\n'))
    }

    /// 跳到下一行开头
    pub fn skip_line(&mut self) {
        self.eat_while(|c| c != '\n');
        self.bump();
    }

    /// 跳过空白、注释与空行
    pub fn skip_trivia(&mut self) {
        loop {
            self.skip_inline_ws();
            self.skip_comment();
            if self.peek() == Some('\n') {
                self.bump();
            } else {
                break;
            }
        }
    }
}

/// 参数之间的分隔：空白、换行、注释或 EOF
pub fn is_arg_delimiter(c: Option<char>) -> bool {
    matches!(c, None | Some(' ' | '\t' | '\r' | '\n' | '#'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_tracking() {
        let mut c = Cursor::new("ab\ncd");
        c.bump();
        c.bump();
        assert_eq!(c.position(), Position::new(1, 2, 2));
        c.bump();
        assert_eq!(c.position(), Position::new(2, 0, 3));
        assert_eq!(c.peek(), Some('c'));
    }

    #[test]
    fn test_at_line_end_with_comment() {
        let mut c = Cursor::new("   # trailing\nnext");
        assert!(c.at_line_end());
        c.skip_trivia();
        assert_eq!(c.remaining(), "next");
        assert_eq!(c.position().line, 2);
    }

    #[test]
    fn test_eat_while_returns_slice() {
        let mut c = Cursor::new("abc123 rest");
        assert_eq!(c.eat_while(|ch| ch.is_ascii_alphanumeric()), "abc123");
        assert!(c.eat(" "));
        assert_eq!(c.remaining(), "rest");
    }
}
