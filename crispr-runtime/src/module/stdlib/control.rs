//! 控制流与输出：`print`、`batch`、`for`、`halt`

use async_trait::async_trait;
use tracing::info;

use super::{Keyword, block_arg};
use crate::action::{Action, BatchedAction, TerminalAction};
use crate::error::RuntimeError;
use crate::module::{ArgDef, ArgType, Command, CommandContext, EagerContext};
use crate::script::ast::CommandExpression;
use crate::value::Value;

pub struct Print;

#[async_trait]
impl Command for Print {
    fn name(&self) -> &'static str {
        "print"
    }

    fn args(&self) -> Vec<ArgDef> {
        vec![ArgDef::new("values", ArgType::Any).rest()]
    }

    fn description(&self) -> &'static str {
        "print values separated by spaces"
    }

    async fn run(&self, ctx: &mut CommandContext<'_>, args: Vec<Value>) -> Result<Vec<Action>, RuntimeError> {
        let line = args.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
        info!(target: "crispr::print", "{line}");
        ctx.log(line);
        Ok(Vec::new())
    }
}

pub struct Batch;

#[async_trait]
impl Command for Batch {
    fn name(&self) -> &'static str {
        "batch"
    }

    fn args(&self) -> Vec<ArgDef> {
        vec![ArgDef::new("block", ArgType::Block)]
    }

    fn description(&self) -> &'static str {
        "group the transactions of a block into one batched action"
    }

    async fn run(&self, ctx: &mut CommandContext<'_>, args: Vec<Value>) -> Result<Vec<Action>, RuntimeError> {
        let block = args
            .first()
            .and_then(block_arg)
            .ok_or_else(|| ctx.invalid("expecting a block"))?;

        let produced = ctx.interpret_block_without_callback(block).await?;

        let mut transactions = Vec::new();
        let mut terminal = Vec::new();
        for action in produced {
            match action {
                Action::Transaction(tx) => transactions.push(tx),
                action if action.is_terminal() => terminal.push(action),
                other => {
                    return Err(ctx.fail(format!(
                        "only transactions can be batched, but got a {} action",
                        other.kind()
                    )));
                }
            }
        }

        let mut actions = Vec::with_capacity(1 + terminal.len());
        if !transactions.is_empty() {
            let client = ctx.client();
            let chain_id = client.chain_id().await?;
            let from = client.connected_account().await?;
            actions.push(Action::Batched(BatchedAction {
                chain_id,
                from,
                actions: transactions,
            }));
        }
        actions.extend(terminal);
        Ok(actions)
    }
}

pub struct For;

#[async_trait]
impl Command for For {
    fn name(&self) -> &'static str {
        "for"
    }

    fn args(&self) -> Vec<ArgDef> {
        vec![
            ArgDef::new("variable", ArgType::Variable),
            ArgDef::new("of", Keyword::arg_type("of")),
            ArgDef::new("array", ArgType::Any),
            ArgDef::new("block", ArgType::Block),
        ]
    }

    fn description(&self) -> &'static str {
        "run a block once for each element of an array"
    }

    async fn run(&self, ctx: &mut CommandContext<'_>, args: Vec<Value>) -> Result<Vec<Action>, RuntimeError> {
        let [variable, _, array, block] = args.as_slice() else {
            return Err(ctx.invalid("expecting <$var> of <array> <block>"));
        };
        let variable = variable.as_str().unwrap_or_default().to_string();
        let items = array
            .as_array()
            .ok_or_else(|| ctx.invalid(format!("<array>: expected array, but got {}", array.type_name())))?
            .to_vec();
        let block = block_arg(block).ok_or_else(|| ctx.invalid("expecting a block"))?;

        let mut actions = Vec::new();
        for item in items {
            ctx.enter_scope("for")?;
            let bound = ctx.bindings_mut().set_user(variable.clone(), item, true);
            let result = match bound {
                Ok(()) => ctx.interpret_block(block).await,
                Err(e) => Err(e.into()),
            };
            ctx.bindings_mut().exit_scope()?;
            actions.extend(result?);
            if ctx.is_halted() {
                break;
            }
        }
        Ok(actions)
    }

    fn run_eager(&self, ctx: &mut EagerContext<'_>, node: &CommandExpression) {
        let Some(variable) = node.args.first().and_then(|n| n.as_variable()) else {
            return;
        };
        let first = node.args.get(2).and_then(|array| {
            ctx.static_value(array)
                .and_then(|v| v.as_array().and_then(|items| items.first().cloned()))
                .or_else(|| Some(Value::Node(Box::new(array.clone()))))
        });
        let Some(value) = first else {
            return;
        };
        if let Err(e) = ctx.bindings.set_user(variable, value, true) {
            tracing::warn!(variable = %variable, error = %e, "eager for binding failed");
        }
    }
}

pub struct Halt;

#[async_trait]
impl Command for Halt {
    fn name(&self) -> &'static str {
        "halt"
    }

    fn args(&self) -> Vec<ArgDef> {
        Vec::new()
    }

    fn description(&self) -> &'static str {
        "stop the script"
    }

    async fn run(&self, _ctx: &mut CommandContext<'_>, _args: Vec<Value>) -> Result<Vec<Action>, RuntimeError> {
        Ok(vec![Action::Terminal {
            signal: TerminalAction::Halt,
        }])
    }
}
