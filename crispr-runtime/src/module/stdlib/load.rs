//! `load <module> [as <alias>]` / `load <module> --as <alias>`

use async_trait::async_trait;
use tracing::debug;

use super::Keyword;
use crate::action::Action;
use crate::bindings::{Binding, BindingsManager, BindingsSpace};
use crate::error::RuntimeError;
use crate::module::{ArgDef, ArgType, Command, CommandContext, EagerContext, ModuleInstance, OptDef};
use crate::script::ast::CommandExpression;
use crate::value::Value;

pub struct Load;

/// 检查模块名与别名是否可用，返回失败原因
fn check_available(bindings: &BindingsManager, name: &str, alias: Option<&str>) -> Result<(), String> {
    if bindings.has_binding(name, BindingsSpace::Module) {
        return Err(format!("module {name} already loaded"));
    }
    if let Some(alias) = alias {
        if bindings.has_binding(alias, BindingsSpace::Alias) || bindings.has_binding(alias, BindingsSpace::Module) {
            return Err(format!("alias {alias} already in use"));
        }
    }
    Ok(())
}

fn register(bindings: &mut BindingsManager, instance: ModuleInstance) -> Result<(), RuntimeError> {
    let name = instance.name.clone();
    if let Some(alias) = instance.alias.clone() {
        bindings.set_binding(Binding::new(BindingsSpace::Alias, alias, name.as_str()))?;
    }
    bindings.set_binding(Binding::new(BindingsSpace::Module, name, instance))?;
    Ok(())
}

#[async_trait]
impl Command for Load {
    fn name(&self) -> &'static str {
        "load"
    }

    fn args(&self) -> Vec<ArgDef> {
        vec![
            ArgDef::new("module", ArgType::Module),
            ArgDef::new("as", Keyword::arg_type("as")).optional(),
            ArgDef::new("alias", ArgType::String).optional(),
        ]
    }

    fn opts(&self) -> Vec<OptDef> {
        vec![OptDef::new("as", ArgType::String)]
    }

    fn description(&self) -> &'static str {
        "load a module, optionally under an alias"
    }

    async fn run(&self, ctx: &mut CommandContext<'_>, args: Vec<Value>) -> Result<Vec<Action>, RuntimeError> {
        let name = args.first().and_then(Value::as_str).unwrap_or_default().to_string();
        let positional_alias = match args.len() {
            2 => return Err(ctx.invalid("expecting an alias after 'as'")),
            3 => args[2].as_str(),
            _ => None,
        };
        let alias = match (positional_alias, ctx.opt("as").and_then(Value::as_str)) {
            (Some(_), Some(_)) => return Err(ctx.invalid("alias given both with 'as' and --as")),
            (a, b) => a.or(b).map(str::to_string),
        };

        check_available(ctx.bindings(), &name, alias.as_deref()).map_err(|m| ctx.fail(m))?;

        let descriptor = ctx.registry().load(&name)?;
        let mut instance = ModuleInstance::new(descriptor);
        if let Some(alias) = &alias {
            instance = instance.with_alias(alias.clone());
        }
        register(ctx.bindings_mut(), instance)?;
        debug!(module = %name, alias = ?alias, "module loaded");
        Ok(Vec::new())
    }

    fn run_eager(&self, ctx: &mut EagerContext<'_>, node: &CommandExpression) {
        let Some(name) = node.args.first().and_then(|n| n.as_name()) else {
            return;
        };
        let alias = node
            .args
            .get(2)
            .and_then(|n| n.as_name())
            .or_else(|| node.opt("as").and_then(|o| o.value.as_name()));

        if check_available(ctx.bindings, name, alias).is_err() {
            return;
        }
        let Ok(descriptor) = ctx.registry.load(name) else {
            return;
        };
        let mut instance = ModuleInstance::new(descriptor);
        if let Some(alias) = alias {
            instance = instance.with_alias(alias);
        }
        if let Err(e) = register(ctx.bindings, instance) {
            tracing::warn!(module = %name, error = %e, "eager load failed");
        }
    }
}
