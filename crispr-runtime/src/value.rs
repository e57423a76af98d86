//! # Value 模块
//!
//! 求值后的参数值。命令与辅助函数的参数都以 [`Value`] 传递，
//! 每种自定义类型自己负责收窄与校验。

use std::fmt;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::num::Num;
use crate::script::ast::{Node, NodeKind};

/// 脚本值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Value {
    /// `0x` 前缀的 20 字节地址
    Address(String),
    Number(Num),
    String(String),
    /// `0x` 前缀的十六进制字节串
    Bytes(String),
    Bool(bool),
    Array(Vec<Value>),
    /// 未求值的节点引用（`variable` 与 `block` 类型参数）
    Node(Box<Node>),
}

impl Value {
    /// 用于错误消息的类型名
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Address(_) => "address",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Bool(_) => "bool",
            Self::Array(_) => "array",
            Self::Node(_) => "node",
        }
    }

    pub fn as_address(&self) -> Option<&str> {
        match self {
            Self::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<&Num> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&str> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// 转为 JSON，供 wallet/rpc action 参数使用
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Address(s) | Self::String(s) | Self::Bytes(s) => serde_json::Value::String(s.clone()),
            Self::Number(n) => serde_json::Value::String(n.to_string()),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Self::Node(node) => serde_json::Value::String(node.type_name().to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(s) | Self::String(s) | Self::Bytes(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Node(node) => write!(f, "<{}>", node.type_name()),
        }
    }
}

/// 是否为 `0x` + 40 位十六进制
pub fn is_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// 是否为 `0x` 前缀、偶数位的十六进制字节串
pub fn is_hex_bytes(s: &str) -> bool {
    s.strip_prefix("0x").is_some_and(|hex| {
        hex.len() % 2 == 0 && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

/// 同步求值字面量节点
///
/// 非字面量返回 `None`；数字字面量溢出等错误也返回 `None`，由完整求值路径报告。
pub fn literal_value(node: &Node) -> Option<Value> {
    match &node.kind {
        NodeKind::AddressLiteral(a) => Some(Value::Address(a.clone())),
        NodeKind::BoolLiteral(b) => Some(Value::Bool(*b)),
        NodeKind::NumberLiteral(n) => n.to_num().ok().map(Value::Number),
        NodeKind::StringLiteral(s) | NodeKind::Bareword(s) => Some(Value::String(s.clone())),
        NodeKind::BytesLiteral(b) => Some(Value::Bytes(b.clone())),
        NodeKind::HexLiteral(h) => hex_to_num(h).map(Value::Number),
        _ => None,
    }
}

/// `0x` 前缀十六进制转整数
pub fn hex_to_num(hex: &str) -> Option<Num> {
    let digits = hex.strip_prefix("0x")?;
    if digits.is_empty() {
        return Some(Num::zero());
    }
    BigInt::parse_bytes(digits.as_bytes(), 16).map(Num::from_int)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ast::{Location, NumberLiteral};

    #[test]
    fn test_is_address() {
        assert!(is_address("0x44fA8E6f47987339850636F88629646662444217"));
        assert!(!is_address("0x44fA8E6f47987339850636F8862964666244421"));
        assert!(!is_address("44fA8E6f47987339850636F88629646662444217aa"));
        assert!(!is_address("0xZZfA8E6f47987339850636F88629646662444217"));
    }

    #[test]
    fn test_is_hex_bytes() {
        assert!(is_hex_bytes("0x"));
        assert!(is_hex_bytes("0xdeadbeef"));
        assert!(!is_hex_bytes("0xabc"));
    }

    #[test]
    fn test_literal_value() {
        let loc = Location::default();
        let node = Node::new(
            NodeKind::NumberLiteral(NumberLiteral {
                value: "1".into(),
                power: 3,
                time_unit: None,
            }),
            loc,
        );
        assert_eq!(literal_value(&node), Some(Value::Number(Num::from_int(1000))));

        let node = Node::new(NodeKind::HexLiteral("0xfff".into()), loc);
        assert_eq!(literal_value(&node), Some(Value::Number(Num::from_int(4095))));

        let node = Node::new(NodeKind::Variable("x".into()), loc);
        assert_eq!(literal_value(&node), None);
    }

    #[test]
    fn test_display() {
        let v = Value::Array(vec![
            Value::Number(Num::from_int(1)),
            Value::String("a".into()),
            Value::Bool(true),
        ]);
        assert_eq!(v.to_string(), "[1, a, true]");
    }

    #[test]
    fn test_serde_shape() {
        let v = Value::Number(Num::from_int(5));
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "number", "value": "5" }));
    }
}
