//! `set <$var> <value>`

use async_trait::async_trait;

use crate::action::Action;
use crate::bindings::{Binding, BindingsManager, BindingsSpace};
use crate::error::RuntimeError;
use crate::module::{ArgDef, ArgType, Command, CommandContext, EagerContext};
use crate::script::ast::CommandExpression;
use crate::value::Value;

pub struct Set;

/// `$module.key` 且 `module` 已加载时写入 CONFIG 空间
fn is_module_config(bindings: &BindingsManager, name: &str) -> bool {
    let Some((prefix, key)) = name.split_once('.') else {
        return false;
    };
    !key.is_empty()
        && (bindings.get_module(prefix).is_some() || bindings.has_binding(prefix, BindingsSpace::Alias))
}

fn write(bindings: &mut BindingsManager, name: &str, value: Value) -> Result<(), RuntimeError> {
    if is_module_config(bindings, name) {
        bindings.set_binding(Binding::new(BindingsSpace::Config, name, value).mutable())?;
    } else {
        bindings.set_user(name, value, true)?;
    }
    Ok(())
}

#[async_trait]
impl Command for Set {
    fn name(&self) -> &'static str {
        "set"
    }

    fn args(&self) -> Vec<ArgDef> {
        vec![ArgDef::new("variable", ArgType::Variable), ArgDef::new("value", ArgType::Any)]
    }

    fn description(&self) -> &'static str {
        "bind a value to a variable in the current scope"
    }

    async fn run(&self, ctx: &mut CommandContext<'_>, mut args: Vec<Value>) -> Result<Vec<Action>, RuntimeError> {
        let value = args.pop().ok_or_else(|| ctx.invalid("missing value"))?;
        let name = args.pop().and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default();
        write(ctx.bindings_mut(), &name, value)?;
        Ok(Vec::new())
    }

    fn run_eager(&self, ctx: &mut EagerContext<'_>, node: &CommandExpression) {
        let Some(name) = node.args.first().and_then(|n| n.as_variable()) else {
            return;
        };
        let value = match node.args.get(1) {
            Some(arg) => ctx
                .static_value(arg)
                .unwrap_or_else(|| Value::Node(Box::new(arg.clone()))),
            None => return,
        };
        if let Err(e) = write(ctx.bindings, name, value) {
            tracing::warn!(variable = %name, error = %e, "eager set failed");
        }
    }
}
