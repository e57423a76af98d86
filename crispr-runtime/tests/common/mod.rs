//! 集成测试共用的模拟客户端、callback 与测试模块

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crispr_runtime::{
    Action, ActionCallback, ArgDef, ArgType, ChainClient, ClientError, Command, CommandContext, EventLog, Helper,
    HelperContext, Interpreter, ModuleDescriptor, ModuleRegistry, Num, Receipt, RuntimeError, TransactionAction,
    Value,
};

pub const ACCOUNT: &str = "0xc125218F4Df091eE40624784caF7F47B9738086f";
pub const DAI: &str = "0x44fA8E6f47987339850636F88629646662444217";
pub const VAULT: &str = "0xBA12222222228d8Ba445958a75a0704d566BF2C8";

/// 固定链 ID 与账户，`balanceOf` 总是返回 42
#[derive(Default)]
pub struct MockClient {
    pub switched: Mutex<Vec<u64>>,
}

#[async_trait]
impl ChainClient for MockClient {
    async fn chain_id(&self) -> Result<u64, ClientError> {
        Ok(100)
    }

    async fn connected_account(&self) -> Result<String, ClientError> {
        Ok(ACCOUNT.to_string())
    }

    async fn transaction_count(&self, _address: &str) -> Result<u64, ClientError> {
        Ok(7)
    }

    async fn read_contract(&self, _address: &str, method: &str, _args: &[Value]) -> Result<Value, ClientError> {
        match method {
            "balanceOf" => Ok(Value::Number(Num::from_int(42))),
            other => Err(ClientError::new(format!("execution reverted: {other}"))),
        }
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ClientError> {
        self.switched.lock().unwrap().push(chain_id);
        Ok(())
    }
}

/// 记录所有分发的 Action；交易回执带一个 `Transfer(to, value)` 事件
#[derive(Default)]
pub struct RecordingCallback {
    pub dispatched: Mutex<Vec<Action>>,
}

#[async_trait]
impl ActionCallback for RecordingCallback {
    async fn dispatch(&self, action: &Action) -> Result<Receipt, ClientError> {
        self.dispatched.lock().unwrap().push(action.clone());
        let logs = match action {
            Action::Transaction(tx) => vec![EventLog {
                address: tx.to.clone(),
                event: "Transfer".to_string(),
                args: vec![
                    Value::Address(tx.to.clone()),
                    Value::Number(tx.value.clone().unwrap_or_else(Num::zero)),
                ],
            }],
            _ => Vec::new(),
        };
        Ok(Receipt {
            transaction_hash: Some("0x01".to_string()),
            logs,
        })
    }
}

/// `sample:pick <a> [b]`：接受 1 到 2 个参数，什么都不做
pub struct Pick;

#[async_trait]
impl Command for Pick {
    fn name(&self) -> &'static str {
        "pick"
    }

    fn args(&self) -> Vec<ArgDef> {
        vec![
            ArgDef::new("a", ArgType::Any),
            ArgDef::new("b", ArgType::Any).optional(),
        ]
    }

    async fn run(&self, _ctx: &mut CommandContext<'_>, _args: Vec<Value>) -> Result<Vec<Action>, RuntimeError> {
        Ok(Vec::new())
    }
}

/// `sample:pay <to> <amount>`：转账交易
pub struct Pay;

#[async_trait]
impl Command for Pay {
    fn name(&self) -> &'static str {
        "pay"
    }

    fn args(&self) -> Vec<ArgDef> {
        vec![
            ArgDef::new("to", ArgType::Address),
            ArgDef::new("amount", ArgType::Number),
        ]
    }

    async fn run(&self, _ctx: &mut CommandContext<'_>, args: Vec<Value>) -> Result<Vec<Action>, RuntimeError> {
        let to = args[0].as_address().unwrap_or_default();
        let amount = args[1].as_num().cloned().unwrap_or_else(Num::zero);
        Ok(vec![TransactionAction::new(to, "0x").with_value(amount).into()])
    }
}

/// `sample:leak`：压入作用域后不弹出
pub struct Leak;

#[async_trait]
impl Command for Leak {
    fn name(&self) -> &'static str {
        "leak"
    }

    fn args(&self) -> Vec<ArgDef> {
        Vec::new()
    }

    async fn run(&self, ctx: &mut CommandContext<'_>, _args: Vec<Value>) -> Result<Vec<Action>, RuntimeError> {
        ctx.enter_scope("leak")?;
        Ok(Vec::new())
    }
}

/// `@double(n)`
pub struct Double;

#[async_trait]
impl Helper for Double {
    fn name(&self) -> &'static str {
        "double"
    }

    fn args(&self) -> Vec<ArgDef> {
        vec![ArgDef::new("n", ArgType::Number)]
    }

    async fn run(&self, _ctx: &HelperContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let n = args[0].as_num().cloned().unwrap_or_else(Num::zero);
        Ok(Value::Number(&n + &n))
    }
}

pub fn sample_module() -> ModuleDescriptor {
    ModuleDescriptor::new("sample")
        .with_command(Pick)
        .with_command(Pay)
        .with_command(Leak)
        .with_helper(Double)
}

pub fn registry() -> Arc<ModuleRegistry> {
    Arc::new(ModuleRegistry::new().with_module("sample", sample_module).unwrap())
}

pub fn interpreter() -> Interpreter {
    Interpreter::new(registry(), Arc::new(MockClient::default()))
}

pub fn interpreter_with_callback() -> (Interpreter, Arc<RecordingCallback>) {
    let callback = Arc::new(RecordingCallback::default());
    let interpreter = interpreter().with_action_callback(callback.clone());
    (interpreter, callback)
}

pub fn num(s: &str) -> Num {
    Num::from_decimal_string(s).unwrap()
}
