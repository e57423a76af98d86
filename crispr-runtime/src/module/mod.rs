//! # Module 模块
//!
//! 命令与辅助函数的插件框架。
//!
//! ## 概念
//!
//! - [`Command`]：可产生 Action、可带命令块的脚本词汇
//! - [`Helper`]：`@name(args)`，返回单个值
//! - [`ModuleDescriptor`]：一组命令和辅助函数
//! - [`ModuleInstance`]：已加载（可能带别名）的模块，存放在 MODULE 绑定空间
//! - [`ModuleRegistry`]：模块名 → 构造函数，显式传入解释器
//!
//! 命令和辅助函数的声明是纯数据（名称 + [`ArgDef`] 列表），
//! 数量与类型校验由执行器统一完成，`run` 只处理已校验的值。

pub mod registry;
pub mod stdlib;
pub mod types;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::action::{Action, Receipt};
use crate::bindings::BindingsManager;
use crate::context::ChainClient;
use crate::error::{CallErrorKind, CommandError, HelperFunctionError, RuntimeError};
use crate::runtime::Interpreter;
use crate::script::ast::{BlockExpression, CommandExpression, Location, Node};
use crate::value::{Value, literal_value};

pub use registry::{ModuleFactory, ModuleRegistry};
pub use types::{ArgDef, ArgType, CustomType, OptDef, TypeContext, arity_of};

/// 脚本命令
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    /// 位置参数声明
    fn args(&self) -> Vec<ArgDef>;

    /// 命名选项声明
    fn opts(&self) -> Vec<OptDef> {
        Vec::new()
    }

    fn description(&self) -> &'static str {
        ""
    }

    /// 执行命令
    ///
    /// `args` 已通过数量与类型校验，顺序与声明一致；
    /// 省略的可选参数不出现，rest 参数展开在末尾。
    async fn run(&self, ctx: &mut CommandContext<'_>, args: Vec<Value>) -> Result<Vec<Action>, RuntimeError>;

    /// 补全用的预执行：只更新缓存绑定，无副作用
    fn run_eager(&self, _ctx: &mut EagerContext<'_>, _node: &CommandExpression) {}
}

/// 辅助函数
#[async_trait]
pub trait Helper: Send + Sync {
    fn name(&self) -> &'static str;

    fn args(&self) -> Vec<ArgDef>;

    fn description(&self) -> &'static str {
        ""
    }

    async fn run(&self, ctx: &HelperContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError>;

    /// 补全用的同步求值；无法静态确定时返回 `None`
    fn run_eager(&self, _ctx: &EagerContext<'_>, _args: &[Value]) -> Option<Value> {
        None
    }
}

/// 模块描述：一组命令和辅助函数
pub struct ModuleDescriptor {
    name: String,
    commands: IndexMap<String, Arc<dyn Command>>,
    helpers: IndexMap<String, Arc<dyn Helper>>,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: IndexMap::new(),
            helpers: IndexMap::new(),
        }
    }

    pub fn with_command(mut self, command: impl Command + 'static) -> Self {
        self.commands.insert(command.name().to_string(), Arc::new(command));
        self
    }

    pub fn with_helper(mut self, helper: impl Helper + 'static) -> Self {
        self.helpers.insert(helper.name().to_string(), Arc::new(helper));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn helper(&self, name: &str) -> Option<Arc<dyn Helper>> {
        self.helpers.get(name).cloned()
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn helper_names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// 已加载的模块
#[derive(Debug, Clone)]
pub struct ModuleInstance {
    pub name: String,
    /// `load x as y` 中的 `y`
    pub alias: Option<String>,
    pub descriptor: Arc<ModuleDescriptor>,
}

impl ModuleInstance {
    pub fn new(descriptor: Arc<ModuleDescriptor>) -> Self {
        Self {
            name: descriptor.name().to_string(),
            alias: None,
            descriptor,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// 脚本中引用该模块应使用的前缀
    pub fn prefix(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// 命令执行上下文
///
/// 持有解释器的可变引用，命令通过它访问绑定、客户端、callback，
/// 以及递归解释嵌套命令块。
pub struct CommandContext<'a> {
    interpreter: &'a mut Interpreter,
    module: ModuleInstance,
    node: &'a CommandExpression,
    opts: IndexMap<String, Value>,
}

impl<'a> CommandContext<'a> {
    pub(crate) fn new(
        interpreter: &'a mut Interpreter,
        module: ModuleInstance,
        node: &'a CommandExpression,
        opts: IndexMap<String, Value>,
    ) -> Self {
        Self {
            interpreter,
            module,
            node,
            opts,
        }
    }

    pub fn module(&self) -> &ModuleInstance {
        &self.module
    }

    /// 当前命令节点
    pub fn node(&self) -> &CommandExpression {
        self.node
    }

    pub fn opt(&self, name: &str) -> Option<&Value> {
        self.opts.get(name)
    }

    pub fn bindings(&self) -> &BindingsManager {
        self.interpreter.bindings()
    }

    pub fn bindings_mut(&mut self) -> &mut BindingsManager {
        self.interpreter.bindings_mut()
    }

    pub fn client(&self) -> Arc<dyn ChainClient> {
        self.interpreter.client()
    }

    pub fn registry(&self) -> &ModuleRegistry {
        self.interpreter.registry()
    }

    pub fn has_action_callback(&self) -> bool {
        self.interpreter.action_callback().is_some()
    }

    /// 已被 `halt` 停止
    pub fn is_halted(&self) -> bool {
        self.interpreter.is_halted()
    }

    /// 追加一行到解释器的输出记录
    pub fn log(&mut self, line: String) {
        self.interpreter.log(line);
    }

    /// 在新作用域中解释命令块，任何退出路径都会弹出作用域
    pub async fn interpret_nested_block(&mut self, block: &BlockExpression) -> Result<Vec<Action>, RuntimeError> {
        let scope = self.node.full_name();
        self.interpreter.interpret_nested_block(block, &scope).await
    }

    /// 压入受 `max_block_depth` 限制的作用域，命令负责在所有路径上弹出
    pub fn enter_scope(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.interpreter.enter_block_scope(name)
    }

    /// 在当前作用域中解释命令块（作用域由命令自己管理）
    pub async fn interpret_block(&mut self, block: &BlockExpression) -> Result<Vec<Action>, RuntimeError> {
        self.interpreter.interpret_block(block).await
    }

    /// 暂停 action callback 的情况下解释命令块
    ///
    /// 块内产生的 Action 全部返回给调用者；callback 在任何退出路径都会恢复。
    pub async fn interpret_block_without_callback(
        &mut self,
        block: &BlockExpression,
    ) -> Result<Vec<Action>, RuntimeError> {
        let callback = self.interpreter.take_action_callback();
        let scope = self.node.full_name();
        let result = self.interpreter.interpret_nested_block(block, &scope).await;
        self.interpreter.restore_action_callback(callback);
        result
    }

    /// 立即分发 Action，需要 action callback
    pub async fn dispatch(&self, action: &Action) -> Result<Receipt, RuntimeError> {
        let Some(callback) = self.interpreter.action_callback() else {
            return Err(self.error(
                CallErrorKind::MissingActionCallback,
                "this command needs an action callback to run",
            ));
        };
        Ok(callback.dispatch(action).await?)
    }

    pub fn error(&self, kind: CallErrorKind, message: impl Into<String>) -> RuntimeError {
        CommandError::new(self.node.full_name(), kind, message, self.node.loc).into()
    }

    /// 命令执行失败
    pub fn fail(&self, message: impl Into<String>) -> RuntimeError {
        self.error(CallErrorKind::Failed, message)
    }

    /// 参数取值非法
    pub fn invalid(&self, message: impl Into<String>) -> RuntimeError {
        self.error(CallErrorKind::InvalidArgument, message)
    }
}

/// 辅助函数执行上下文
pub struct HelperContext<'a> {
    pub client: &'a dyn ChainClient,
    pub bindings: &'a BindingsManager,
    pub(crate) name: &'a str,
    pub(crate) loc: Location,
}

impl HelperContext<'_> {
    pub fn fail(&self, message: impl Into<String>) -> RuntimeError {
        HelperFunctionError::new(self.name, CallErrorKind::Failed, message, self.loc).into()
    }

    pub fn invalid(&self, message: impl Into<String>) -> RuntimeError {
        HelperFunctionError::new(self.name, CallErrorKind::InvalidArgument, message, self.loc).into()
    }
}

/// 补全用的预执行上下文
///
/// 只操作缓存绑定，永远不触碰解释器的实时绑定。
pub struct EagerContext<'a> {
    pub bindings: &'a mut BindingsManager,
    pub registry: &'a ModuleRegistry,
}

impl EagerContext<'_> {
    /// 不执行任何副作用地求出节点的值
    ///
    /// 支持字面量、缓存中的变量、数组，以及提供了同步求值的辅助函数。
    pub fn static_value(&self, node: &Node) -> Option<Value> {
        use crate::script::ast::NodeKind;

        if let Some(value) = literal_value(node) {
            return Some(value);
        }
        match &node.kind {
            NodeKind::Variable(name) => self
                .bindings
                .get_value(name, crate::bindings::BindingsSpace::User)
                .filter(|v| !matches!(v, Value::Node(_)))
                .cloned(),
            NodeKind::Array(items) => items
                .iter()
                .map(|item| self.static_value(item))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            NodeKind::Helper(helper) => {
                let args = helper
                    .args
                    .iter()
                    .map(|arg| self.static_value(arg))
                    .collect::<Option<Vec<_>>>()?;
                let implementation =
                    crate::runtime::executor::resolve_helper(self.bindings, self.registry, &helper.name)?;
                implementation.run_eager(self, &args)
            }
            _ => None,
        }
    }
}
