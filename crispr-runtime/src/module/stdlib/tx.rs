//! 交易类命令：`raw`、`rpc`、`switch`

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::action::{Action, RpcAction, TransactionAction, WalletAction};
use crate::error::RuntimeError;
use crate::module::{ArgDef, ArgType, Command, CommandContext, CustomType, OptDef, TypeContext};
use crate::num::Num;
use crate::value::Value;

/// 已知网络名 → 链 ID
pub const KNOWN_NETWORKS: &[(&str, u64)] = &[
    ("mainnet", 1),
    ("sepolia", 11_155_111),
    ("holesky", 17_000),
    ("gnosis", 100),
    ("polygon", 137),
    ("optimism", 10),
    ("arbitrum", 42_161),
    ("base", 8_453),
];

fn network_chain_id(name: &str) -> Option<u64> {
    KNOWN_NETWORKS
        .iter()
        .find(|(network, _)| network.eq_ignore_ascii_case(name))
        .map(|(_, id)| *id)
}

/// 网络参数：链 ID 或已知网络名，解析为链 ID
pub struct NetworkType;

impl CustomType for NetworkType {
    fn name(&self) -> &'static str {
        "network"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        match value {
            Value::Number(n) if n.to_u64().is_some() => Ok(()),
            Value::String(name) if network_chain_id(name).is_some() => Ok(()),
            Value::String(name) => Err(format!("unknown network {name}")),
            other => Err(format!("expected a chain id or network name, but got {}", other.type_name())),
        }
    }

    fn completions(&self, _ctx: &TypeContext<'_>) -> Vec<String> {
        KNOWN_NETWORKS.iter().map(|(name, _)| name.to_string()).collect()
    }

    fn resolve(&self, value: Value, _ctx: &TypeContext<'_>) -> Result<Value, String> {
        match value {
            Value::String(name) => network_chain_id(&name)
                .map(|id| Value::Number(Num::from_int(id)))
                .ok_or_else(|| format!("unknown network {name}")),
            other => Ok(other),
        }
    }
}

pub struct Raw;

#[async_trait]
impl Command for Raw {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn args(&self) -> Vec<ArgDef> {
        vec![
            ArgDef::new("to", ArgType::Address),
            ArgDef::new("data", ArgType::Bytes),
            ArgDef::new("value", ArgType::Number).optional(),
        ]
    }

    fn opts(&self) -> Vec<OptDef> {
        vec![OptDef::new("from", ArgType::Address)]
    }

    fn description(&self) -> &'static str {
        "send a transaction with raw calldata"
    }

    async fn run(&self, ctx: &mut CommandContext<'_>, args: Vec<Value>) -> Result<Vec<Action>, RuntimeError> {
        let (Some(to), Some(data)) = (
            args.first().and_then(Value::as_address),
            args.get(1).and_then(Value::as_bytes),
        ) else {
            return Err(ctx.invalid("expecting <to> <data>"));
        };

        let mut tx = TransactionAction::new(to, data);
        if let Some(value) = args.get(2).and_then(Value::as_num) {
            if !value.is_integer() || value.is_negative() {
                return Err(ctx.invalid(format!("<value>: expected a non-negative integer, but got {value}")));
            }
            tx = tx.with_value(value.clone());
        }
        if let Some(from) = ctx.opt("from").and_then(Value::as_address) {
            tx = tx.with_from(from);
        }
        Ok(vec![tx.into()])
    }
}

pub struct Rpc;

#[async_trait]
impl Command for Rpc {
    fn name(&self) -> &'static str {
        "rpc"
    }

    fn args(&self) -> Vec<ArgDef> {
        vec![
            ArgDef::new("method", ArgType::String),
            ArgDef::new("params", ArgType::Any).rest(),
        ]
    }

    fn description(&self) -> &'static str {
        "send a raw JSON-RPC request to the node"
    }

    async fn run(&self, ctx: &mut CommandContext<'_>, args: Vec<Value>) -> Result<Vec<Action>, RuntimeError> {
        let Some((method, params)) = args.split_first() else {
            return Err(ctx.invalid("expecting <method>"));
        };
        let method = method.as_str().unwrap_or_default().to_string();
        Ok(vec![Action::Rpc(RpcAction {
            method,
            params: params.iter().map(Value::to_json).collect(),
        })])
    }
}

pub struct Switch;

#[async_trait]
impl Command for Switch {
    fn name(&self) -> &'static str {
        "switch"
    }

    fn args(&self) -> Vec<ArgDef> {
        vec![ArgDef::new("network", ArgType::Custom(Arc::new(NetworkType)))]
    }

    fn description(&self) -> &'static str {
        "switch the connected wallet to another chain"
    }

    async fn run(&self, ctx: &mut CommandContext<'_>, args: Vec<Value>) -> Result<Vec<Action>, RuntimeError> {
        let Some(chain_id) = args.first().and_then(Value::as_num).and_then(Num::to_u64) else {
            return Err(ctx.invalid("<network>: expected a chain id"));
        };

        ctx.client().switch_chain(chain_id).await?;
        debug!(chain_id, "switched chain");

        Ok(vec![Action::Wallet(WalletAction {
            method: "wallet_switchEthereumChain".to_string(),
            params: vec![serde_json::json!({ "chainId": format!("0x{chain_id:x}") })],
        })])
    }
}
