//! # Crispr Runtime
//!
//! 链上操作脚本语言的核心运行时库。
//!
//! ## 架构概述
//!
//! `crispr-runtime` 是纯逻辑核心，不直接访问网络。
//! 它通过 **Action 驱动模式** 与宿主层（Host）通信：
//!
//! ```text
//! Host                               Runtime
//!   │                                   │
//!   │──── script text ────────────────►│ interpret()
//!   │                                   │   ├─ ChainClient（只读查询）
//!   │◄─── Vec<Action> ─────────────────│   └─ ActionCallback（事件捕获时即时分发）
//!   │                                   │
//! ```
//!
//! ## 核心类型
//!
//! - [`Interpreter`]：树遍历解释器
//! - [`Action`]：解释器交给执行器的输出
//! - [`Value`]：求值后的参数值
//! - [`Num`]：精确有理数
//! - [`ModuleRegistry`]：可加载模块表
//!
//! ## 使用示例
//!
//! ```ignore
//! use crispr_runtime::{Interpreter, ModuleRegistry, OfflineClient};
//!
//! let mut interpreter = Interpreter::new(
//!     Arc::new(ModuleRegistry::new()),
//!     Arc::new(OfflineClient::default()),
//! );
//! let actions = interpreter.interpret(script_text).await?;
//!
//! for action in actions {
//!     executor.execute(action);
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`num`]：精确有理数
//! - [`script`]：脚本解析（AST 和 Parser）
//! - [`value`]：求值结果
//! - [`action`]：Action 定义
//! - [`bindings`]：作用域符号表
//! - [`module`]：命令/辅助函数框架与标准模块
//! - [`runtime`]：执行引擎
//! - [`completion`]：编辑器补全
//! - [`diagnostic`]：静态检查
//! - [`callscript`]：call script 编解码
//! - [`error`]：错误类型定义

pub mod action;
pub mod bindings;
pub mod callscript;
pub mod completion;
pub mod context;
pub mod diagnostic;
pub mod error;
pub mod module;
pub mod num;
pub mod runtime;
pub mod script;
pub mod value;

// 重导出核心类型
pub use action::{
    Action, BatchedAction, EventLog, Receipt, RpcAction, TerminalAction, TransactionAction, WalletAction,
};
pub use bindings::{Binding, BindingError, BindingValue, BindingsManager, BindingsSpace};
pub use callscript::{CallScriptAction, decode_call_script, encode_call_script};
pub use completion::{Completer, CompletionItem, CompletionItemKind};
pub use context::{ActionCallback, ChainClient, ClientError, OfflineClient};
pub use diagnostic::{Diagnostic, DiagnosticLevel, DiagnosticResult, analyze_script, analyze_script_with};
pub use error::{
    CallErrorKind, CommandError, ComparisonType, CrisprError, CrisprResult, ExpressionError, FrameworkError,
    HelperFunctionError, ParseError, ParseErrorKind, RuntimeError,
};
pub use module::{
    ArgDef, ArgType, Command, CommandContext, CustomType, EagerContext, Helper, HelperContext, ModuleDescriptor,
    ModuleInstance, ModuleRegistry, OptDef,
};
pub use num::{Num, NumError};
pub use runtime::{Interpreter, InterpreterConfig};
pub use script::{ParseResult, Parser};
pub use value::Value;
