//! # 补全模块
//!
//! 编辑器补全：给定脚本与光标位置，返回候选项。
//!
//! ## 流程
//!
//! 1. 解析光标所在行之前的文本
//! 2. 在绑定的缓存副本上预执行（`run_eager`）光标可见的命令，
//!    光标所在的未闭合块会进入对应作用域
//! 3. 按光标所在行的上下文给出候选：命令名、`@` 辅助函数、`$` 变量、`--` 选项、参数类型
//!
//! 补全永远不修改解释器的实时绑定。

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bindings::{BindingsManager, BindingsSpace};
use crate::error::ParseErrorKind;
use crate::module::stdlib::STD_MODULE;
use crate::module::{ArgType, Command, EagerContext, ModuleRegistry, TypeContext};
use crate::runtime::Interpreter;
use crate::runtime::executor::resolve_command;
use crate::script::ast::{BlockExpression, NodeKind};
use crate::script::parser::Parser;

/// 候选项类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionItemKind {
    Command,
    Helper,
    Variable,
    /// 选项名与参数取值
    Field,
}

/// 补全候选
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub kind: CompletionItemKind,
    pub label: String,
    pub insert_text: String,
}

impl CompletionItem {
    fn new(kind: CompletionItemKind, label: impl Into<String>, insert_text: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            insert_text: insert_text.into(),
        }
    }
}

/// 补全器
///
/// 持有绑定的基准副本，每次补全再复制一份作为缓存。
pub struct Completer {
    registry: Arc<ModuleRegistry>,
    bindings: BindingsManager,
    default_module: String,
}

impl Completer {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            registry,
            bindings: BindingsManager::new(),
            default_module: STD_MODULE.to_string(),
        }
    }

    /// 以解释器当前的绑定为基准
    pub fn from_interpreter(interpreter: &Interpreter) -> Self {
        Self {
            registry: interpreter.registry.clone(),
            bindings: interpreter.bindings().snapshot(),
            default_module: interpreter.config().default_module.clone(),
        }
    }

    /// 在 `line`（从 1 开始）、`col`（从 0 开始）处补全
    pub fn complete(&self, text: &str, line: usize, col: usize) -> Vec<CompletionItem> {
        let (before, current) = split_at_cursor(text, line, col);

        let mut cache = self.bindings.snapshot();
        let parsed = Parser::new().parse(before);
        let unclosed: HashSet<usize> = parsed
            .errors
            .iter()
            .filter(|e| e.kind == ParseErrorKind::UnclosedBlock)
            .map(|e| e.position.offset)
            .collect();
        self.run_eager_block(&mut cache, &parsed.ast, &unclosed);

        self.complete_line(&cache, current)
    }

    /// 预执行块内命令；进入光标所在的未闭合块
    fn run_eager_block(&self, cache: &mut BindingsManager, block: &BlockExpression, unclosed: &HashSet<usize>) {
        for command in &block.commands {
            // 带块命令的预执行结果（如 `for` 的循环变量）只在块内可见
            let block_arg = command.args.last().and_then(|node| match &node.kind {
                NodeKind::Block(inner) => Some((inner, unclosed.contains(&node.loc.start.offset))),
                _ => None,
            });
            let depth = cache.scope_depth();
            if block_arg.is_some() {
                cache.enter_scope(command.full_name());
            }

            if let Ok((_, implementation)) = resolve_command(cache, &self.registry, &self.default_module, command) {
                let mut ctx = EagerContext {
                    bindings: &mut *cache,
                    registry: &self.registry,
                };
                implementation.run_eager(&mut ctx, command);
            }

            match block_arg {
                Some((inner, true)) => {
                    self.run_eager_block(cache, inner, unclosed);
                    return;
                }
                // 块已闭合：丢弃块内绑定，预执行钩子多压入的作用域一并弹出
                _ => cache.unwind_to(depth),
            }
        }
    }

    fn complete_line(&self, cache: &BindingsManager, current: &str) -> Vec<CompletionItem> {
        let tokens = tokenize(current);
        let ends_with_space = current.is_empty() || current.ends_with(char::is_whitespace);
        let word = if ends_with_space {
            ""
        } else {
            tokens.last().copied().unwrap_or("")
        };
        let finished = if ends_with_space {
            &tokens[..]
        } else {
            &tokens[..tokens.len().saturating_sub(1)]
        };

        let mut items = if finished.is_empty() {
            self.command_items(cache)
        } else if word.starts_with('@') {
            self.helper_items(cache)
        } else if word.starts_with('$') {
            variable_items(cache)
        } else {
            self.argument_items(cache, finished, word)
        };

        items.retain(|item| item.label.starts_with(word) || item.insert_text.starts_with(word));
        items
    }

    fn command_items(&self, cache: &BindingsManager) -> Vec<CompletionItem> {
        let mut items = Vec::new();
        let default = cache
            .get_module(&self.default_module)
            .map(|m| m.descriptor.clone())
            .or_else(|| self.registry.load(&self.default_module).ok());
        if let Some(default) = &default {
            items.extend(
                default
                    .command_names()
                    .map(|name| CompletionItem::new(CompletionItemKind::Command, name, format!("{name} "))),
            );
        }
        for module in cache.loaded_modules() {
            if module.name == self.default_module {
                continue;
            }
            let prefix = module.prefix();
            items.extend(module.descriptor.command_names().map(|name| {
                let label = format!("{prefix}:{name}");
                let insert = format!("{label} ");
                CompletionItem::new(CompletionItemKind::Command, label, insert)
            }));
        }
        items
    }

    fn helper_items(&self, cache: &BindingsManager) -> Vec<CompletionItem> {
        let std_module = self.registry.std_module();
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        let loaded = cache.loaded_modules();
        let descriptors = std::iter::once(&std_module).chain(loaded.iter().map(|m| &m.descriptor));
        for descriptor in descriptors {
            for name in descriptor.helper_names() {
                if !seen.insert(name.to_string()) {
                    continue;
                }
                let takes_args = descriptor.helper(name).is_some_and(|h| !h.args().is_empty());
                let insert = if takes_args {
                    format!("@{name}(")
                } else {
                    format!("@{name}")
                };
                items.push(CompletionItem::new(CompletionItemKind::Helper, format!("@{name}"), insert));
            }
        }
        items
    }

    /// 按当前参数的声明类型补全
    fn argument_items(&self, cache: &BindingsManager, finished: &[&str], word: &str) -> Vec<CompletionItem> {
        let Some(command) = self.command_for(cache, finished[0]) else {
            return Vec::new();
        };

        if word.starts_with("--") {
            return command
                .opts()
                .iter()
                .map(|opt| CompletionItem::new(CompletionItemKind::Field, format!("--{}", opt.name), format!("--{} ", opt.name)))
                .collect();
        }
        // 选项的取值
        if finished.last().is_some_and(|t| t.starts_with("--")) {
            let name = &finished[finished.len() - 1][2..];
            return command
                .opts()
                .into_iter()
                .find(|opt| opt.name == name)
                .map(|opt| self.type_items(cache, &opt.ty))
                .unwrap_or_default();
        }

        let index = positional_index(&finished[1..]);
        let defs = command.args();
        let Some(def) = defs.get(index).or_else(|| defs.last().filter(|d| d.rest)) else {
            return Vec::new();
        };
        self.type_items(cache, &def.ty)
    }

    fn command_for(&self, cache: &BindingsManager, token: &str) -> Option<Arc<dyn Command>> {
        let (module, name) = match token.split_once(':') {
            Some((module, name)) => (Some(module.to_string()), name.to_string()),
            None => (None, token.to_string()),
        };
        let node = crate::script::ast::CommandExpression {
            module,
            name,
            args: Vec::new(),
            opts: Vec::new(),
            captures: Vec::new(),
            loc: Default::default(),
        };
        resolve_command(cache, &self.registry, &self.default_module, &node)
            .ok()
            .map(|(_, command)| command)
    }

    fn type_items(&self, cache: &BindingsManager, ty: &ArgType) -> Vec<CompletionItem> {
        let field = |label: String| CompletionItem::new(CompletionItemKind::Field, label.clone(), label);
        match ty {
            ArgType::Module => self.registry.names().map(|n| field(n.to_string())).collect(),
            ArgType::Bool => vec![field("true".to_string()), field("false".to_string())],
            ArgType::Custom(custom) => {
                let ctx = TypeContext {
                    bindings: cache,
                    registry: &self.registry,
                };
                custom.completions(&ctx).into_iter().map(field).collect()
            }
            ArgType::Variable => variable_items(cache),
            ArgType::Block => Vec::new(),
            _ => {
                let mut items = variable_items(cache);
                items.extend(self.helper_items(cache));
                items
            }
        }
    }
}

fn variable_items(cache: &BindingsManager) -> Vec<CompletionItem> {
    cache
        .get_all_binding_identifiers(&[BindingsSpace::User])
        .into_iter()
        .map(|id| {
            let label = format!("${id}");
            CompletionItem::new(CompletionItemKind::Variable, label.clone(), label)
        })
        .collect()
}

/// 跳过选项及其取值后的位置参数个数
fn positional_index(args: &[&str]) -> usize {
    let mut count = 0;
    let mut skip_value = false;
    for token in args {
        if skip_value {
            skip_value = false;
        } else if token.starts_with("--") {
            skip_value = true;
        } else {
            count += 1;
        }
    }
    count
}

/// 光标之前的完整行，以及光标所在行光标之前的部分
fn split_at_cursor(text: &str, line: usize, col: usize) -> (&str, &str) {
    let mut line_start = 0;
    for _ in 1..line.max(1) {
        match text[line_start..].find('\n') {
            Some(i) => line_start += i + 1,
            None => {
                line_start = text.len();
                break;
            }
        }
    }
    let line_text = text[line_start..].split('\n').next().unwrap_or("");
    let cursor = line_text
        .char_indices()
        .nth(col)
        .map_or(line_text.len(), |(i, _)| i);
    (&text[..line_start], line_text[..cursor].trim_start())
}

/// 按空白切分，引号、括号内的空白不切分
fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, c) if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&line[s..i]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&line[s..]);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_str()).collect()
    }

    fn completer() -> Completer {
        Completer::new(Arc::new(ModuleRegistry::new()))
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("set $x [1, 2]"), vec!["set", "$x", "[1, 2]"]);
        assert_eq!(tokenize("print 'a b' @date(now, '+1d')"), vec!["print", "'a b'", "@date(now, '+1d')"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_split_at_cursor() {
        let text = "set $a 1\nprint $a\n";
        assert_eq!(split_at_cursor(text, 2, 3), ("set $a 1\n", "pri"));
        assert_eq!(split_at_cursor(text, 1, 0), ("", ""));
    }

    #[test]
    fn test_complete_command_names() {
        let items = completer().complete("", 1, 0);
        let labels = labels(&items);
        assert!(labels.contains(&"load"));
        assert!(labels.contains(&"set"));
        assert!(items.iter().all(|i| i.kind == CompletionItemKind::Command));

        let items = completer().complete("ha", 1, 2);
        assert_eq!(self::labels(&items), vec!["halt"]);
    }

    #[test]
    fn test_complete_variables_from_eager_set() {
        let text = "set $amount 1eth\nset $to 0x44fA8E6f47987339850636F88629646662444217\nprint $";
        let items = completer().complete(text, 3, 7);
        let labels = labels(&items);
        assert!(labels.contains(&"$amount"));
        assert!(labels.contains(&"$to"));
    }

    #[test]
    fn test_complete_inside_open_block() {
        let text = "for $item of [1, 2] (\n  print $";
        let items = completer().complete(text, 2, 9);
        assert_eq!(labels(&items), vec!["$item"]);
    }

    #[test]
    fn test_closed_block_scope_is_not_visible() {
        let text = "for $item of [1, 2] (\n  print $item\n)\nprint $";
        let items = completer().complete(text, 4, 7);
        assert!(items.is_empty());
    }

    #[test]
    fn test_complete_module_and_keyword_args() {
        let items = completer().complete("load ", 1, 5);
        assert_eq!(labels(&items), vec!["std"]);

        let items = completer().complete("load std ", 1, 9);
        assert_eq!(labels(&items), vec!["as"]);

        let items = completer().complete("switch gno", 1, 10);
        assert_eq!(labels(&items), vec!["gnosis"]);
    }

    #[test]
    fn test_complete_options_and_helpers() {
        let items = completer().complete("raw 0x44fA8E6f47987339850636F88629646662444217 0x --", 1, 52);
        assert_eq!(labels(&items), vec!["--from"]);
        assert_eq!(items[0].kind, CompletionItemKind::Field);

        let items = completer().complete("print @", 1, 7);
        let labels = labels(&items);
        assert!(labels.contains(&"@me"));
        assert!(labels.contains(&"@date"));
    }

    #[test]
    fn test_loaded_alias_prefixes_commands() {
        let items = completer().complete("load std as s\n", 2, 0);
        let labels = labels(&items);
        assert!(labels.contains(&"print"));
        assert!(!labels.iter().any(|l| l.starts_with("s:")));
    }

    /// 预执行时压入作用域却不弹出的命令
    struct OpenScope;

    #[async_trait::async_trait]
    impl Command for OpenScope {
        fn name(&self) -> &'static str {
            "open"
        }

        fn args(&self) -> Vec<crate::module::ArgDef> {
            Vec::new()
        }

        async fn run(
            &self,
            _ctx: &mut crate::module::CommandContext<'_>,
            _args: Vec<crate::value::Value>,
        ) -> Result<Vec<crate::action::Action>, crate::error::RuntimeError> {
            Ok(Vec::new())
        }

        fn run_eager(&self, ctx: &mut EagerContext<'_>, _node: &crate::script::ast::CommandExpression) {
            ctx.bindings.enter_scope("open");
            ctx.bindings.set_user("inner", crate::value::Value::Bool(true), true).unwrap();
        }
    }

    fn open_scope_module() -> crate::module::ModuleDescriptor {
        crate::module::ModuleDescriptor::new("scoped").with_command(OpenScope)
    }

    #[test]
    fn test_eager_scope_leak_is_unwound() {
        let registry = ModuleRegistry::new().with_module("scoped", open_scope_module).unwrap();
        let completer = Completer::new(Arc::new(registry));

        let text = "load scoped\nscoped:open\nset $after 1\nprint $";
        let items = completer.complete(text, 4, 7);
        assert_eq!(labels(&items), vec!["$after"]);
    }

    #[test]
    fn test_completion_never_touches_live_bindings() {
        let completer = completer();
        let _ = completer.complete("set $x 1\nprint $", 2, 7);
        assert!(completer.bindings.get_value("x", BindingsSpace::User).is_none());
    }
}
