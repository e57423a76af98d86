//! # Executor 模块
//!
//! 名称解析与表达式求值。
//!
//! ## 职责
//!
//! - 命令：模块前缀 → 别名 → 模块实例 → 命令实现
//! - 辅助函数：依次查找 `std` 与已加载模块
//! - 节点求值：自底向上，参数严格从左到右
//! - 参数校验：数量（统一消息）与类型

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::bindings::{BindingValue, BindingsManager, BindingsSpace};
use crate::error::{
    CallErrorKind, CommandError, ExpressionError, HelperFunctionError, RuntimeError, check_arity,
};
use crate::module::stdlib::STD_MODULE;
use crate::module::{
    ArgDef, ArgType, Command, Helper, HelperContext, ModuleInstance, ModuleRegistry, TypeContext, arity_of,
};
use crate::num::Num;
use crate::runtime::Interpreter;
use crate::script::ast::{
    ArithmeticExpression, BinaryOperator, CallExpression, CommandExpression, HelperFunctionExpression, Location,
    Node, NodeKind,
};
use crate::value::{Value, hex_to_num, is_address};

/// 按前缀解析模块
///
/// 失败时返回描述原因的消息。
pub fn resolve_module(
    bindings: &BindingsManager,
    registry: &ModuleRegistry,
    prefix: &str,
) -> Result<ModuleInstance, String> {
    if let Some(target) = bindings.get_text(prefix, BindingsSpace::Alias) {
        if let Some(module) = bindings.get_module(target) {
            return Ok(module.clone());
        }
    }
    if let Some(module) = bindings.get_module(prefix) {
        if let Some(alias) = &module.alias {
            return Err(format!(
                "module {prefix} was loaded as {alias}, use {alias}:<command> instead"
            ));
        }
        return Ok(module.clone());
    }
    if prefix == STD_MODULE {
        return Ok(ModuleInstance::new(registry.std_module()));
    }
    if registry.contains(prefix) {
        Err(format!("module {prefix} is not loaded, use `load {prefix}` first"))
    } else {
        Err(format!("module {prefix} not found"))
    }
}

/// 解析命令节点对应的模块与实现
pub fn resolve_command(
    bindings: &BindingsManager,
    registry: &ModuleRegistry,
    default_module: &str,
    node: &CommandExpression,
) -> Result<(ModuleInstance, Arc<dyn Command>), RuntimeError> {
    let error = |kind, message: String| CommandError::new(node.full_name(), kind, message, node.loc);

    let module = match node.module.as_deref() {
        Some(prefix) => resolve_module(bindings, registry, prefix),
        // 无前缀命令总能使用默认模块，即便它被以别名加载
        None => bindings
            .get_module(default_module)
            .cloned()
            .map(Ok)
            .unwrap_or_else(|| resolve_module(bindings, registry, default_module)),
    }
    .map_err(|message| error(CallErrorKind::ModuleNotFound, message))?;

    let command = module.descriptor.command(&node.name).ok_or_else(|| {
        error(
            CallErrorKind::NotFound,
            format!("command {} not found in module {}", node.name, module.prefix()),
        )
    })?;
    Ok((module, command))
}

/// 查找辅助函数：先 `std`，再按加载顺序查找已加载模块
pub fn resolve_helper(
    bindings: &BindingsManager,
    registry: &ModuleRegistry,
    name: &str,
) -> Option<Arc<dyn Helper>> {
    registry.std_module().helper(name).or_else(|| {
        bindings
            .loaded_modules()
            .into_iter()
            .filter(|module| module.name != STD_MODULE)
            .find_map(|module| module.descriptor.helper(name))
    })
}

/// 参数所属的调用方，用于构造带位置的错误
#[derive(Clone, Copy)]
enum Caller<'a> {
    Command(&'a CommandExpression),
    Helper(&'a str, Location),
}

impl Caller<'_> {
    fn error(&self, kind: CallErrorKind, message: impl Into<String>) -> RuntimeError {
        match *self {
            Self::Command(node) => CommandError::new(node.full_name(), kind, message, node.loc).into(),
            Self::Helper(name, loc) => HelperFunctionError::new(name, kind, message, loc).into(),
        }
    }
}

/// 按声明类型收窄已求值的值
fn coerce(value: Value, ty: &ArgType, ctx: &TypeContext<'_>) -> Result<Value, String> {
    let mismatch = |value: &Value| format!("expected {}, but got {}", ty.name(), value.type_name());
    match (ty, value) {
        (ArgType::Any, value) => Ok(value),
        (ArgType::Address, Value::Address(a)) => Ok(Value::Address(a)),
        (ArgType::Address, Value::String(s)) if is_address(&s) => Ok(Value::Address(s)),
        (ArgType::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
        (ArgType::Number, Value::Number(n)) => Ok(Value::Number(n)),
        (ArgType::String, Value::String(s) | Value::Address(s)) => Ok(Value::String(s)),
        (ArgType::Bytes, Value::Bytes(b)) => Ok(Value::Bytes(b)),
        (ArgType::Bytes32, Value::Bytes(b)) if b.len() == 66 => Ok(Value::Bytes(b)),
        (ArgType::Custom(custom), value) => {
            custom.validate(&value)?;
            custom.resolve(value, ctx)
        }
        (_, value) => Err(mismatch(&value)),
    }
}

impl Interpreter {
    /// 求值并校验命令的位置参数与选项
    pub(crate) async fn evaluate_command_args(
        &mut self,
        command: &dyn Command,
        node: &CommandExpression,
    ) -> Result<(Vec<Value>, IndexMap<String, Value>), RuntimeError> {
        let caller = Caller::Command(node);
        let args = self.evaluate_args(&command.args(), &node.args, caller).await?;

        let opt_defs = command.opts();
        let mut opts = IndexMap::new();
        for opt in &node.opts {
            let Some(def) = opt_defs.iter().find(|d| d.name == opt.name) else {
                return Err(caller.error(
                    CallErrorKind::InvalidArgument,
                    format!("unknown option --{}", opt.name),
                ));
            };
            if opts.contains_key(&opt.name) {
                return Err(caller.error(
                    CallErrorKind::InvalidArgument,
                    format!("option --{} given more than once", opt.name),
                ));
            }
            let value = self.evaluate_typed(&opt.value, &def.ty, def.name, caller).await?;
            opts.insert(opt.name.clone(), value);
        }
        Ok((args, opts))
    }

    /// 数量校验后按声明逐个求值
    async fn evaluate_args(
        &mut self,
        defs: &[ArgDef],
        nodes: &[Node],
        caller: Caller<'_>,
    ) -> Result<Vec<Value>, RuntimeError> {
        check_arity(arity_of(defs), nodes.len()).map_err(|message| caller.error(CallErrorKind::Arity, message))?;

        let mut values = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            let Some(def) = defs.get(index).or_else(|| defs.last().filter(|d| d.rest)) else {
                break;
            };
            values.push(self.evaluate_typed(node, &def.ty, def.name, caller).await?);
        }
        Ok(values)
    }

    /// 按类型求值单个参数
    async fn evaluate_typed(
        &mut self,
        node: &Node,
        ty: &ArgType,
        arg_name: &str,
        caller: Caller<'_>,
    ) -> Result<Value, RuntimeError> {
        let invalid = |message: String| caller.error(CallErrorKind::InvalidArgument, format!("<{arg_name}>: {message}"));

        match ty {
            ArgType::Variable => node
                .as_variable()
                .map(|name| Value::String(name.to_string()))
                .ok_or_else(|| invalid(format!("expected a variable, but got {}", node.type_name()))),
            ArgType::Block => match node.kind {
                NodeKind::Block(_) => Ok(Value::Node(Box::new(node.clone()))),
                _ => Err(invalid(format!("expected a block, but got {}", node.type_name()))),
            },
            ArgType::Module => node
                .as_name()
                .map(|name| Value::String(name.to_string()))
                .ok_or_else(|| invalid(format!("expected a module name, but got {}", node.type_name()))),
            _ => {
                let value = self.evaluate_node(node).await?;
                let ctx = TypeContext {
                    bindings: &self.bindings,
                    registry: &self.registry,
                };
                coerce(value, ty, &ctx).map_err(invalid)
            }
        }
    }

    /// 求值表达式节点
    pub fn evaluate_node<'a>(&'a mut self, node: &'a Node) -> BoxFuture<'a, Result<Value, RuntimeError>> {
        async move {
            let expression_error = |message: String| -> RuntimeError { ExpressionError::new(message, node.loc).into() };

            match &node.kind {
                NodeKind::AddressLiteral(a) => Ok(Value::Address(a.clone())),
                NodeKind::BoolLiteral(b) => Ok(Value::Bool(*b)),
                NodeKind::StringLiteral(s) => Ok(Value::String(s.clone())),
                NodeKind::BytesLiteral(b) => Ok(Value::Bytes(b.clone())),
                NodeKind::NumberLiteral(n) => n
                    .to_num()
                    .map(Value::Number)
                    .map_err(|e| expression_error(e.to_string())),
                NodeKind::HexLiteral(h) => hex_to_num(h)
                    .map(Value::Number)
                    .ok_or_else(|| expression_error(format!("invalid hex number {h}"))),
                NodeKind::Bareword(word) => Ok(self.resolve_bareword(word)),
                NodeKind::Variable(name) => self
                    .lookup_variable(name)
                    .ok_or_else(|| expression_error(format!("variable ${name} not found"))),
                NodeKind::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.evaluate_node(item).await?);
                    }
                    Ok(Value::Array(values))
                }
                NodeKind::Call(call) => self.evaluate_call(call, node.loc).await,
                NodeKind::Helper(helper) => self.evaluate_helper(helper, node.loc).await,
                NodeKind::Arithmetic(arithmetic) => self.evaluate_arithmetic(arithmetic, node.loc).await,
                NodeKind::Block(_) => Err(expression_error("a block cannot be used as a value".to_string())),
            }
        }
        .boxed()
    }

    /// 有 ADDR 绑定的裸词求值为地址，否则为字符串
    fn resolve_bareword(&self, word: &str) -> Value {
        match self.bindings.get_binding_value(word, BindingsSpace::Addr) {
            Some(BindingValue::Value(Value::Address(a))) => Value::Address(a.clone()),
            Some(BindingValue::Text(a)) if is_address(a) => Value::Address(a.clone()),
            _ => Value::String(word.to_string()),
        }
    }

    /// USER 空间优先，其次 CONFIG（`$module.key`）
    fn lookup_variable(&self, name: &str) -> Option<Value> {
        self.bindings
            .get_value(name, BindingsSpace::User)
            .or_else(|| self.bindings.get_value(name, BindingsSpace::Config))
            .cloned()
    }

    async fn evaluate_call(&mut self, call: &CallExpression, loc: Location) -> Result<Value, RuntimeError> {
        let target = self.evaluate_node(&call.target).await?;
        let address = match &target {
            Value::Address(a) => a.clone(),
            Value::String(s) if is_address(s) => s.clone(),
            other => {
                return Err(ExpressionError::new(
                    format!("call target must be an address, but got {}", other.type_name()),
                    loc,
                )
                .into());
            }
        };

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.evaluate_node(arg).await?);
        }

        self.client
            .read_contract(&address, &call.method, &args)
            .await
            .map_err(|e| ExpressionError::new(format!("{}::{}() failed: {e}", address, call.method), loc).into())
    }

    async fn evaluate_helper(
        &mut self,
        helper: &HelperFunctionExpression,
        loc: Location,
    ) -> Result<Value, RuntimeError> {
        let implementation = resolve_helper(&self.bindings, &self.registry, &helper.name).ok_or_else(|| {
            HelperFunctionError::new(
                &helper.name,
                CallErrorKind::NotFound,
                format!("helper @{} not found", helper.name),
                loc,
            )
        })?;

        let caller = Caller::Helper(&helper.name, loc);
        let args = self.evaluate_args(&implementation.args(), &helper.args, caller).await?;

        let ctx = HelperContext {
            client: self.client.as_ref(),
            bindings: &self.bindings,
            name: &helper.name,
            loc,
        };
        implementation.run(&ctx, args).await
    }

    async fn evaluate_arithmetic(
        &mut self,
        arithmetic: &ArithmeticExpression,
        loc: Location,
    ) -> Result<Value, RuntimeError> {
        let left = self.evaluate_node(&arithmetic.left).await?;
        let right = self.evaluate_node(&arithmetic.right).await?;

        let operand = |value: &Value, side: &str| -> Result<Num, RuntimeError> {
            value.as_num().cloned().ok_or_else(|| {
                ExpressionError::new(
                    format!(
                        "invalid {side} operand. Expected a number, but got {}",
                        value.type_name()
                    ),
                    loc,
                )
                .into()
            })
        };
        let l = operand(&left, "left")?;
        let r = operand(&right, "right")?;

        let result = match arithmetic.operator {
            BinaryOperator::Add => Ok(&l + &r),
            BinaryOperator::Sub => Ok(&l - &r),
            BinaryOperator::Mul => Ok(&l * &r),
            BinaryOperator::Div => l.div(&r),
            BinaryOperator::Mod => l.rem(&r),
            BinaryOperator::Pow => l.pow(&r),
        };
        result
            .map(Value::Number)
            .map_err(|e| ExpressionError::new(e.to_string(), loc).into())
    }
}
