//! # Engine 模块
//!
//! 树遍历解释器。
//!
//! ## 执行模型
//!
//! ```text
//! interpret(text) -> Result<Vec<Action>, CrisprError>
//! ```
//!
//! 1. 解析脚本，有任何解析错误则直接返回
//! 2. 按源码顺序逐条执行命令：解析模块与命令 → 求值参数 → 校验 → 运行
//! 3. 命令产生的 Action 追加到结果列表；提供了 action callback 时改为立即分发
//! 4. 任意运行时错误立即中止，已累积的 Action 全部丢弃

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::Action;
use crate::bindings::BindingsManager;
use crate::context::{ActionCallback, ChainClient};
use crate::error::{CallErrorKind, CommandError, CrisprError, CrisprResult, FrameworkError, RuntimeError};
use crate::module::stdlib::STD_MODULE;
use crate::module::{CommandContext, ModuleRegistry};
use crate::runtime::executor;
use crate::script::ast::{BlockExpression, CommandExpression};
use crate::script::parser::Parser;

/// 解释器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// 无前缀命令所属的模块
    pub default_module: String,
    /// 嵌套命令块的最大深度
    pub max_block_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            default_module: STD_MODULE.to_string(),
            max_block_depth: 64,
        }
    }
}

/// 脚本解释器
///
/// # 使用示例
///
/// ```ignore
/// let mut interpreter = Interpreter::new(Arc::new(ModuleRegistry::new()), Arc::new(OfflineClient::default()));
/// let actions = interpreter.interpret("raw 0x… 0x 1eth").await?;
///
/// // 执行器依次处理 actions...
/// ```
pub struct Interpreter {
    pub(crate) config: InterpreterConfig,
    pub(crate) registry: Arc<ModuleRegistry>,
    pub(crate) client: Arc<dyn ChainClient>,
    action_callback: Option<Arc<dyn ActionCallback>>,
    pub(crate) bindings: BindingsManager,
    halted: bool,
    logs: Vec<String>,
}

impl Interpreter {
    pub fn new(registry: Arc<ModuleRegistry>, client: Arc<dyn ChainClient>) -> Self {
        Self {
            config: InterpreterConfig::default(),
            registry,
            client,
            action_callback: None,
            bindings: BindingsManager::new(),
            halted: false,
            logs: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// 提供后，Action 在产生时立即分发而不是返回
    pub fn with_action_callback(mut self, callback: Arc<dyn ActionCallback>) -> Self {
        self.action_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn bindings(&self) -> &BindingsManager {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut BindingsManager {
        &mut self.bindings
    }

    pub fn client(&self) -> Arc<dyn ChainClient> {
        self.client.clone()
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn action_callback(&self) -> Option<&Arc<dyn ActionCallback>> {
        self.action_callback.as_ref()
    }

    pub(crate) fn take_action_callback(&mut self) -> Option<Arc<dyn ActionCallback>> {
        self.action_callback.take()
    }

    pub(crate) fn restore_action_callback(&mut self, callback: Option<Arc<dyn ActionCallback>>) {
        self.action_callback = callback;
    }

    /// `print` 输出的记录
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub(crate) fn log(&mut self, line: String) {
        self.logs.push(line);
    }

    /// 是否已被 `halt` 停止
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// 解析并解释脚本
    pub async fn interpret(&mut self, text: &str) -> CrisprResult<Vec<Action>> {
        let ast = Parser::new().parse(text).into_result()?;
        self.interpret_ast(&ast).await.map_err(CrisprError::from)
    }

    /// 解释已解析的脚本
    ///
    /// 出错时返回错误，已产生的 Action 不返回。
    pub async fn interpret_ast(&mut self, ast: &BlockExpression) -> Result<Vec<Action>, RuntimeError> {
        self.halted = false;
        self.interpret_block(ast).await
    }

    /// 在当前作用域中按顺序执行命令
    pub fn interpret_block<'a>(
        &'a mut self,
        block: &'a BlockExpression,
    ) -> BoxFuture<'a, Result<Vec<Action>, RuntimeError>> {
        async move {
            let mut actions = Vec::new();
            for command in &block.commands {
                if self.halted {
                    break;
                }
                let produced = self.run_command(command).await?;
                actions.extend(produced);
            }
            Ok(actions)
        }
        .boxed()
    }

    /// 为命令块压入新作用域，超过 `max_block_depth` 时失败
    ///
    /// 调用者负责在所有退出路径上弹出。
    pub fn enter_block_scope(&mut self, scope: &str) -> Result<(), RuntimeError> {
        if self.bindings.scope_depth() > self.config.max_block_depth {
            return Err(FrameworkError::Exception(format!(
                "maximum block depth of {} exceeded",
                self.config.max_block_depth
            ))
            .into());
        }
        self.bindings.enter_scope(scope);
        Ok(())
    }

    /// 在新作用域中执行命令块，成功与失败路径都会弹出作用域
    pub fn interpret_nested_block<'a>(
        &'a mut self,
        block: &'a BlockExpression,
        scope: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Action>, RuntimeError>> {
        async move {
            self.enter_block_scope(scope)?;
            let result = self.interpret_block(block).await;
            self.bindings.exit_scope()?;
            result
        }
        .boxed()
    }

    async fn run_command(&mut self, node: &CommandExpression) -> Result<Vec<Action>, RuntimeError> {
        debug!(
            command = %node.full_name(),
            line = node.loc.start.line,
            scope = self.bindings.current_scope_name(),
            "executing command"
        );

        let (module, command) =
            executor::resolve_command(&self.bindings, &self.registry, &self.config.default_module, node)?;
        let (args, opts) = self.evaluate_command_args(command.as_ref(), node).await?;

        let depth = self.bindings.scope_depth();
        let result = {
            let mut ctx = CommandContext::new(self, module, node, opts);
            command.run(&mut ctx, args).await
        };
        let left_open = self.bindings.scope_depth();
        if left_open != depth {
            self.bindings.unwind_to(depth);
        }
        let actions = result?;
        if left_open != depth {
            return Err(FrameworkError::Exception(format!(
                "command {} changed the scope depth from {depth} to {left_open}",
                node.full_name()
            ))
            .into());
        }
        self.process_actions(node, actions).await
    }

    /// 处理命令产生的 Action
    ///
    /// - 终止信号：停止解释，原样返回
    /// - 有事件捕获：经 callback 分发并从回执绑定变量
    /// - 有 callback：立即分发，不返回
    /// - 否则：返回给调用者
    async fn process_actions(
        &mut self,
        node: &CommandExpression,
        actions: Vec<Action>,
    ) -> Result<Vec<Action>, RuntimeError> {
        if actions.iter().any(Action::is_terminal) {
            self.halted = true;
        }

        let callback = match (&self.action_callback, node.captures.is_empty()) {
            (Some(callback), _) => callback.clone(),
            (None, true) => return Ok(actions),
            (None, false) => {
                return Err(CommandError::new(
                    node.full_name(),
                    CallErrorKind::MissingActionCallback,
                    "event capture needs an action callback",
                    node.loc,
                )
                .into());
            }
        };

        let mut kept = Vec::new();
        let mut receipts = Vec::new();
        for action in actions {
            if action.is_terminal() {
                kept.push(action);
                continue;
            }
            debug!(kind = action.kind(), "dispatching action");
            receipts.push(callback.dispatch(&action).await?);
        }

        for capture in &node.captures {
            let log = receipts
                .iter()
                .find_map(|receipt| receipt.find_event(&capture.event))
                .ok_or_else(|| {
                    CommandError::new(
                        node.full_name(),
                        CallErrorKind::Failed,
                        format!("event {} not found in the transaction receipt", capture.event),
                        capture.loc,
                    )
                })?;
            for (index, variable) in capture.variables.iter().enumerate() {
                let value = log.args.get(index).cloned().ok_or_else(|| {
                    CommandError::new(
                        node.full_name(),
                        CallErrorKind::InvalidArgument,
                        format!(
                            "event {} has {} arguments, cannot capture ${variable}",
                            capture.event,
                            log.args.len()
                        ),
                        capture.loc,
                    )
                })?;
                self.bindings.set_user(variable.clone(), value, true)?;
            }
        }
        Ok(kept)
    }
}
