//! # Context 模块
//!
//! 解释器依赖的外部协作者接口。核心不实现任何链上访问，
//! 只按约定调用注入的对象，失败以错误形式向上传播。

use async_trait::async_trait;
use thiserror::Error;

use crate::action::{Action, Receipt};
use crate::value::Value;

/// 外部协作者返回的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("client error: {0}")]
pub struct ClientError(pub String);

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// 链访问客户端
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ClientError>;

    /// 已连接的账户地址
    async fn connected_account(&self) -> Result<String, ClientError>;

    async fn transaction_count(&self, address: &str) -> Result<u64, ClientError>;

    /// 只读合约调用，返回已解码的结果
    async fn read_contract(&self, address: &str, method: &str, args: &[Value]) -> Result<Value, ClientError>;

    /// 切换底层传输到指定链
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ClientError>;
}

/// Action 的即时分发
///
/// 需要立刻拿到执行结果的命令（事件捕获）通过它分发 Action。
#[async_trait]
pub trait ActionCallback: Send + Sync {
    async fn dispatch(&self, action: &Action) -> Result<Receipt, ClientError>;
}

/// 不连接任何链的客户端
///
/// 链 ID 与账户是固定值，合约读取总是失败。适合离线生成 Action。
#[derive(Debug, Clone)]
pub struct OfflineClient {
    pub chain_id: u64,
    pub account: String,
}

impl OfflineClient {
    pub fn new(chain_id: u64, account: impl Into<String>) -> Self {
        Self {
            chain_id,
            account: account.into(),
        }
    }
}

impl Default for OfflineClient {
    fn default() -> Self {
        Self::new(1, "0x0000000000000000000000000000000000000000")
    }
}

#[async_trait]
impl ChainClient for OfflineClient {
    async fn chain_id(&self) -> Result<u64, ClientError> {
        Ok(self.chain_id)
    }

    async fn connected_account(&self) -> Result<String, ClientError> {
        Ok(self.account.clone())
    }

    async fn transaction_count(&self, _address: &str) -> Result<u64, ClientError> {
        Ok(0)
    }

    async fn read_contract(&self, address: &str, method: &str, _args: &[Value]) -> Result<Value, ClientError> {
        Err(ClientError::new(format!(
            "cannot call {address}::{method}() without a connected client"
        )))
    }

    async fn switch_chain(&self, _chain_id: u64) -> Result<(), ClientError> {
        Ok(())
    }
}
