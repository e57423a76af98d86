//! # Action 模块
//!
//! 定义解释器交给外部执行器的所有 Action。
//! Action 是解释器与执行器之间的**唯一输出**。
//!
//! ## 设计原则
//!
//! - **声明式**：Action 描述"做什么"，不描述"怎么做"
//! - **无副作用**：解释器从不执行 Action，只追加到结果列表或交给 callback
//! - **可序列化**：执行器可以是另一个进程

use serde::{Deserialize, Serialize};

use crate::num::Num;
use crate::value::Value;

/// 交易
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAction {
    pub to: String,
    /// `0x` 前缀 calldata
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Num>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<Num>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<Num>,
}

impl TransactionAction {
    pub fn new(to: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: Num) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }
}

/// 交给已连接钱包的请求（切换链、签名等）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletAction {
    pub method: String,
    pub params: Vec<serde_json::Value>,
}

/// 直接发往节点的 RPC 调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcAction {
    pub method: String,
    pub params: Vec<serde_json::Value>,
}

/// 作为一个整体提交的一组交易
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchedAction {
    pub chain_id: u64,
    pub from: String,
    pub actions: Vec<TransactionAction>,
}

/// 控制信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminalAction {
    /// 停止执行后续命令
    Halt,
}

/// 解释结果中的一项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Transaction(TransactionAction),
    Wallet(WalletAction),
    Rpc(RpcAction),
    Batched(BatchedAction),
    Terminal { signal: TerminalAction },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transaction(_) => "transaction",
            Self::Wallet(_) => "wallet",
            Self::Rpc(_) => "rpc",
            Self::Batched(_) => "batched",
            Self::Terminal { .. } => "terminal",
        }
    }

    pub fn as_transaction(&self) -> Option<&TransactionAction> {
        match self {
            Self::Transaction(tx) => Some(tx),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }
}

impl From<TransactionAction> for Action {
    fn from(tx: TransactionAction) -> Self {
        Self::Transaction(tx)
    }
}

/// 已解码的事件日志
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    pub address: String,
    pub event: String,
    pub args: Vec<Value>,
}

/// 执行器返回的类回执结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub logs: Vec<EventLog>,
}

impl Receipt {
    /// 第一个名称匹配的事件
    pub fn find_event(&self, event: &str) -> Option<&EventLog> {
        self.logs.iter().find(|log| log.event == event)
    }
}
