//! # CallScript 模块
//!
//! EVM call script 编解码。
//!
//! ## 格式
//!
//! ```text
//! 0x00000001                       script id
//! [address: 20 bytes][length: 4 bytes, big-endian][calldata: length bytes] ...
//! ```
//!
//! 解码保留原始大小写，因此 `encode(decode(s)) == s`。

use serde::{Deserialize, Serialize};

use crate::error::FrameworkError;

/// 当前支持的脚本格式 ID
pub const CALLSCRIPT_ID: &str = "0x00000001";

const ADDRESS_HEX_LEN: usize = 40;
const LENGTH_HEX_LEN: usize = 8;

/// call script 中的一次调用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallScriptAction {
    /// `0x` 前缀地址
    pub to: String,
    /// `0x` 前缀 calldata
    pub data: String,
}

impl CallScriptAction {
    pub fn new(to: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            data: data.into(),
        }
    }
}

/// 编码为 call script
pub fn encode_call_script(actions: &[CallScriptAction]) -> Result<String, FrameworkError> {
    let mut script = String::from(CALLSCRIPT_ID);
    for action in actions {
        let to = strip_hex(&action.to, "address")?;
        if to.len() != ADDRESS_HEX_LEN {
            return Err(FrameworkError::Invalid(format!(
                "invalid call script address {}",
                action.to
            )));
        }
        let data = strip_hex(&action.data, "calldata")?;
        if data.len() % 2 != 0 {
            return Err(FrameworkError::Invalid(format!(
                "calldata {} has an odd number of hex digits",
                action.data
            )));
        }
        let length = u32::try_from(data.len() / 2)
            .map_err(|_| FrameworkError::Invalid("calldata too long".to_string()))?;

        script.push_str(to);
        script.push_str(&hex::encode(length.to_be_bytes()));
        script.push_str(data);
    }
    Ok(script)
}

/// 解码 call script
pub fn decode_call_script(script: &str) -> Result<Vec<CallScriptAction>, FrameworkError> {
    let body = script
        .strip_prefix(CALLSCRIPT_ID)
        .ok_or_else(|| FrameworkError::Invalid("Not a call script".to_string()))?;

    let mut actions = Vec::new();
    let mut rest = body;
    while !rest.is_empty() {
        let to = take(&mut rest, ADDRESS_HEX_LEN, "address")?;
        let length_hex = take(&mut rest, LENGTH_HEX_LEN, "calldata length")?;

        let mut length_bytes = [0u8; 4];
        hex::decode_to_slice(length_hex, &mut length_bytes).map_err(|e| {
            FrameworkError::Invalid(format!("invalid calldata length {length_hex}: {e}"))
        })?;
        let length = u32::from_be_bytes(length_bytes) as usize;

        let data = take(&mut rest, length * 2, "calldata")?;
        if hex::decode(to).is_err() || hex::decode(data).is_err() {
            return Err(FrameworkError::Invalid(
                "call script contains non-hex characters".to_string(),
            ));
        }

        actions.push(CallScriptAction::new(format!("0x{to}"), format!("0x{data}")));
    }
    Ok(actions)
}

fn take<'a>(rest: &mut &'a str, len: usize, what: &str) -> Result<&'a str, FrameworkError> {
    if rest.len() < len || !rest.is_char_boundary(len) {
        return Err(FrameworkError::Invalid(format!(
            "call script truncated while reading {what}"
        )));
    }
    let (head, tail) = rest.split_at(len);
    *rest = tail;
    Ok(head)
}

fn strip_hex<'a>(s: &'a str, what: &str) -> Result<&'a str, FrameworkError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| FrameworkError::Invalid(format!("{what} {s} must start with 0x")))?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(FrameworkError::Invalid(format!("{what} {s} is not hex")));
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0x44fA8E6f47987339850636F88629646662444217";
    const AGENT: &str = "0x1aDc1a4d4b2e8A9c1B8f8e3d5C6B7A8E9F0a1B2C";

    #[test]
    fn test_decode_then_encode_is_identity() {
        let script = encode_call_script(&[
            CallScriptAction::new(TOKEN, "0xa9059cbb0000000000000000000000000000000000000000000000000000000000000001"),
            CallScriptAction::new(AGENT, "0x"),
        ])
        .unwrap();

        let decoded = decode_call_script(&script).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].to, TOKEN);
        assert_eq!(decoded[1].data, "0x");
        assert_eq!(encode_call_script(&decoded).unwrap(), script);
    }

    #[test]
    fn test_encoding_layout() {
        let script = encode_call_script(&[CallScriptAction::new(TOKEN, "0xdeadbeef")]).unwrap();
        assert_eq!(
            script,
            format!("0x00000001{}00000004deadbeef", &TOKEN[2..])
        );
    }

    #[test]
    fn test_empty_script() {
        assert_eq!(decode_call_script(CALLSCRIPT_ID).unwrap(), vec![]);
        assert_eq!(encode_call_script(&[]).unwrap(), CALLSCRIPT_ID);
    }

    #[test]
    fn test_not_a_call_script() {
        let err = decode_call_script("0x00000002").unwrap_err();
        assert_eq!(err, FrameworkError::Invalid("Not a call script".to_string()));
        assert!(err.to_string().contains("Not a call script"));
    }

    #[test]
    fn test_truncated_script() {
        let script = encode_call_script(&[CallScriptAction::new(TOKEN, "0xdeadbeef")]).unwrap();
        let truncated = &script[..script.len() - 2];
        assert!(matches!(
            decode_call_script(truncated),
            Err(FrameworkError::Invalid(msg)) if msg.contains("truncated")
        ));
    }

    #[test]
    fn test_encode_rejects_bad_address() {
        assert!(encode_call_script(&[CallScriptAction::new("0x1234", "0x")]).is_err());
        assert!(encode_call_script(&[CallScriptAction::new(TOKEN, "0xabc")]).is_err());
    }
}
