//! # 诊断模块
//!
//! 提供脚本静态检查和诊断 API，不依赖 IO 或链访问。
//!
//! 只解析、不执行：命令是否存在、模块是否先加载后使用，
//! 都由 AST 与模块注册表判断。

use std::collections::HashMap;

use crate::module::ModuleRegistry;
use crate::module::stdlib::STD_MODULE;
use crate::script::ast::{BlockExpression, CommandExpression, NodeKind};
use crate::script::parser::Parser;

/// 诊断级别，按严重程度递增排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    Info,
    /// 脚本能运行，但很可能不符合预期
    Warn,
    /// 脚本运行时必然失败
    Error,
}

impl DiagnosticLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    /// 从 1 开始；与具体行无关时为 `None`
    pub line: Option<usize>,
    pub message: String,
    /// 诊断详情（可选，如命令全名）
    pub detail: Option<String>,
}

impl Diagnostic {
    fn with_level(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            line: None,
            message: message.into(),
            detail: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Error, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Warn, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Info, message)
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.level)?;
        if let Some(line) = self.line {
            write!(f, " line {line}")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {detail}")?;
        }
        Ok(())
    }
}

/// 一次分析得到的全部诊断，按发现顺序排列
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn merge(&mut self, other: DiagnosticResult) {
        self.extend(other.diagnostics);
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == DiagnosticLevel::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 不低于 `min_level` 的诊断
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.level >= min_level).collect()
    }
}

impl Extend<Diagnostic> for DiagnosticResult {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.diagnostics.extend(iter);
    }
}

//=============================================================================
// 脚本分析 API
//=============================================================================

/// 分析脚本，使用只含 `std` 的注册表
pub fn analyze_script(text: &str) -> DiagnosticResult {
    analyze_script_with(text, &ModuleRegistry::new())
}

/// 分析脚本，返回诊断结果
///
/// 执行以下检查：
/// - 解析错误（Error）
/// - 无前缀命令不在 `std` 中（Error）
/// - 带前缀命令的模块在此之前没有被 `load`（Warn）
/// - 已加载模块中不存在的命令（Error）
pub fn analyze_script_with(text: &str, registry: &ModuleRegistry) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    let parsed = Parser::new().parse(text);

    for error in &parsed.errors {
        result.push(
            Diagnostic::error(format!("{}: {}", error.kind, error.message)).with_line(error.position.line),
        );
    }

    let mut analyzer = Analyzer {
        registry,
        loaded: HashMap::new(),
        result,
    };
    analyzer.block(&parsed.ast);
    analyzer.result
}

struct Analyzer<'a> {
    registry: &'a ModuleRegistry,
    /// 脚本中可用的前缀 → 模块名
    loaded: HashMap<String, String>,
    result: DiagnosticResult,
}

impl Analyzer<'_> {
    fn block(&mut self, block: &BlockExpression) {
        for command in &block.commands {
            self.command(command);
        }
    }

    fn command(&mut self, command: &CommandExpression) {
        let line = command.loc.start.line;
        match command.module.as_deref() {
            None | Some(STD_MODULE) => {
                if self.registry.std_module().command(&command.name).is_none() {
                    self.result.push(
                        Diagnostic::error(format!("unknown command {}", command.name))
                            .with_line(line)
                            .with_detail(command.full_name()),
                    );
                }
            }
            Some(prefix) => match self.loaded.get(prefix) {
                None => self.result.push(
                    Diagnostic::warn(format!("module {prefix} is used before it is loaded"))
                        .with_line(line)
                        .with_detail(command.full_name()),
                ),
                Some(module) => {
                    let known = self
                        .registry
                        .load(module)
                        .is_ok_and(|descriptor| descriptor.command(&command.name).is_some());
                    if !known {
                        self.result.push(
                            Diagnostic::error(format!("unknown command {} in module {prefix}", command.name))
                                .with_line(line),
                        );
                    }
                }
            },
        }

        if command.module.is_none() && command.name == "load" {
            self.record_load(command);
        }
        if let Some(block) = command.block() {
            self.block(block);
        }
    }

    fn record_load(&mut self, command: &CommandExpression) {
        let Some(module) = command.args.first().and_then(|n| n.as_name()) else {
            return;
        };
        if !self.registry.contains(module) {
            self.result.push(
                Diagnostic::error(format!("module {module} not found"))
                    .with_line(command.loc.start.line),
            );
            return;
        }
        let alias = command
            .args
            .get(2)
            .or_else(|| command.opt("as").map(|o| &o.value))
            .and_then(|n| match &n.kind {
                NodeKind::Bareword(s) | NodeKind::StringLiteral(s) => Some(s.clone()),
                _ => None,
            });
        self.loaded.insert(alias.unwrap_or_else(|| module.to_string()), module.to_string());
    }
}
