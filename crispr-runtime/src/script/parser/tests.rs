//! # Parser 测试

use super::*;
use crate::num::Num;
use crate::script::ast::{BinaryOperator, CommandExpression, Node, NodeKind, NumberLiteral, TimeUnit};

fn parse_ok(text: &str) -> BlockExpression {
    let result = Parser::new().parse(text);
    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
    result.ast
}

fn single_command(text: &str) -> CommandExpression {
    let ast = parse_ok(text);
    assert_eq!(ast.commands.len(), 1, "expected one command in {text:?}");
    ast.commands.into_iter().next().unwrap()
}

fn first_error_kind(text: &str) -> ParseErrorKind {
    let result = Parser::new().parse(text);
    result
        .errors
        .first()
        .unwrap_or_else(|| panic!("expected an error for {text:?}"))
        .kind
}

fn number(node: &Node) -> &NumberLiteral {
    match &node.kind {
        NodeKind::NumberLiteral(n) => n,
        other => panic!("expected number, got {other:?}"),
    }
}

// -------------------------------------------------------------------------
// 字面量
// -------------------------------------------------------------------------

#[test]
fn test_number_with_power_and_time_unit() {
    let node = parse_expression("20.3245e18mo").unwrap();
    let lit = number(&node);
    assert_eq!(lit.value, "20.3245");
    assert_eq!(lit.power, 18);
    assert_eq!(lit.time_unit, Some(TimeUnit::Month));

    let expected = &(&Num::from_decimal_string("20.3245").unwrap()
        * &Num::from_int(crate::num::pow10(18)))
        * &Num::from_int(2_592_000u64);
    assert_eq!(lit.to_num().unwrap(), expected);
}

#[test]
fn test_number_unit_suffixes() {
    assert_eq!(number(&parse_expression("1eth").unwrap()).power, 18);
    assert_eq!(number(&parse_expression("3gwei").unwrap()).power, 9);
    assert_eq!(number(&parse_expression("7wei").unwrap()).power, 0);
    assert_eq!(number(&parse_expression("5e-3").unwrap()).power, -3);

    let lit = number(&parse_expression("2.5ethw").unwrap()).clone();
    assert_eq!(lit.power, 18);
    assert_eq!(lit.time_unit, Some(TimeUnit::Week));

    let lit = number(&parse_expression("10m").unwrap()).clone();
    assert_eq!(lit.time_unit, Some(TimeUnit::Minute));
}

#[test]
fn test_negative_number() {
    let lit = number(&parse_expression("-12.5").unwrap()).clone();
    assert_eq!(lit.value, "-12.5");
    assert_eq!(lit.to_num().unwrap(), Num::new(-25, 2).unwrap());
}

#[test]
fn test_invalid_number_suffix() {
    assert_eq!(
        parse_expression("5min").unwrap_err().kind,
        ParseErrorKind::InvalidNumber
    );
    assert_eq!(
        parse_expression("1.2.3").unwrap_err().kind,
        ParseErrorKind::InvalidNumber
    );
}

#[test]
fn test_hex_literal_kinds() {
    let addr = "0x44fA8E6f47987339850636F88629646662444217";
    assert_eq!(
        parse_expression(addr).unwrap().kind,
        NodeKind::AddressLiteral(addr.to_string())
    );
    assert_eq!(
        parse_expression("0xdeadbeef").unwrap().kind,
        NodeKind::BytesLiteral("0xdeadbeef".to_string())
    );
    assert_eq!(
        parse_expression("0xabc").unwrap().kind,
        NodeKind::HexLiteral("0xabc".to_string())
    );
    assert!(parse_expression("0xzz").is_err());
}

#[test]
fn test_strings_and_booleans() {
    assert_eq!(
        parse_expression("\"hello world\"").unwrap().kind,
        NodeKind::StringLiteral("hello world".to_string())
    );
    assert_eq!(
        parse_expression("'it \"quoted\"'").unwrap().kind,
        NodeKind::StringLiteral("it \"quoted\"".to_string())
    );
    assert_eq!(parse_expression("true").unwrap().kind, NodeKind::BoolLiteral(true));
    assert_eq!(parse_expression("false").unwrap().kind, NodeKind::BoolLiteral(false));
    assert_eq!(
        parse_expression("\"open").unwrap_err().kind,
        ParseErrorKind::UnterminatedString
    );
}

#[test]
fn test_bareword_and_variable() {
    assert_eq!(
        parse_expression("token-manager.open:0").unwrap().kind,
        NodeKind::Bareword("token-manager.open:0".to_string())
    );
    assert_eq!(
        parse_expression("$my_var").unwrap().kind,
        NodeKind::Variable("my_var".to_string())
    );
    assert!(parse_expression("$").is_err());
}

// -------------------------------------------------------------------------
// 数组
// -------------------------------------------------------------------------

#[test]
fn test_array_nested_with_whitespace() {
    let node = parse_expression("[ 1, [2,3] ,  \"x\" ]").unwrap();
    let NodeKind::Array(items) = node.kind else {
        panic!("expected array");
    };
    assert_eq!(items.len(), 3);
    assert!(matches!(&items[1].kind, NodeKind::Array(inner) if inner.len() == 2));
    assert_eq!(parse_expression("[]").unwrap().kind, NodeKind::Array(vec![]));
}

#[test]
fn test_array_errors() {
    assert_eq!(
        parse_expression("[1,,2]").unwrap_err().kind,
        ParseErrorKind::EmptyArrayElement
    );
    assert_eq!(
        parse_expression("[1, 2").unwrap_err().kind,
        ParseErrorKind::UnterminatedArray
    );
    assert_eq!(
        parse_expression("[1,]").unwrap_err().kind,
        ParseErrorKind::EmptyArrayElement
    );
}

// -------------------------------------------------------------------------
// 算术
// -------------------------------------------------------------------------

#[test]
fn test_arithmetic_precedence() {
    let node = parse_expression("(120 - 5e22 * 2 ^ 2 + 500e33)").unwrap();
    // ((120 - (5e22 * (2 ^ 2))) + 500e33)
    let NodeKind::Arithmetic(add) = &node.kind else {
        panic!("expected arithmetic");
    };
    assert_eq!(add.operator, BinaryOperator::Add);
    let NodeKind::Arithmetic(sub) = &add.left.kind else {
        panic!("expected subtraction");
    };
    assert_eq!(sub.operator, BinaryOperator::Sub);
    let NodeKind::Arithmetic(mul) = &sub.right.kind else {
        panic!("expected multiplication");
    };
    assert_eq!(mul.operator, BinaryOperator::Mul);
    assert!(matches!(
        &mul.right.kind,
        NodeKind::Arithmetic(pow) if pow.operator == BinaryOperator::Pow
    ));
}

#[test]
fn test_pow_is_right_associative() {
    let node = parse_expression("(2 ^ 3 ^ 2)").unwrap();
    let NodeKind::Arithmetic(outer) = &node.kind else {
        panic!("expected arithmetic");
    };
    assert!(matches!(&outer.left.kind, NodeKind::NumberLiteral(_)));
    assert!(matches!(&outer.right.kind, NodeKind::Arithmetic(_)));
}

#[test]
fn test_arithmetic_location_covers_parentheses() {
    let node = parse_expression("(4 / 0)").unwrap();
    assert_eq!(node.loc.start.offset, 0);
    assert_eq!(node.loc.end.offset, 7);
}

#[test]
fn test_arithmetic_grouping_and_operands() {
    let node = parse_expression("(($a + @fee) * 2)").unwrap();
    let NodeKind::Arithmetic(mul) = &node.kind else {
        panic!("expected arithmetic");
    };
    assert!(matches!(&mul.left.kind, NodeKind::Arithmetic(_)));
}

#[test]
fn test_arithmetic_errors() {
    assert_eq!(
        parse_expression("(1 + 2").unwrap_err().kind,
        ParseErrorKind::UnclosedParenthesis
    );
    assert_eq!(
        parse_expression("(1 + foo)").unwrap_err().kind,
        ParseErrorKind::InvalidSyntax
    );
}

// -------------------------------------------------------------------------
// 辅助函数与方法调用
// -------------------------------------------------------------------------

#[test]
fn test_helper_with_and_without_args() {
    let node = parse_expression("@me").unwrap();
    assert!(matches!(&node.kind, NodeKind::Helper(h) if h.name == "me" && h.args.is_empty()));

    let node = parse_expression("@date(\"2024-01-01\", @token(DAI))").unwrap();
    let NodeKind::Helper(helper) = &node.kind else {
        panic!("expected helper");
    };
    assert_eq!(helper.name, "date");
    assert_eq!(helper.args.len(), 2);
    assert!(matches!(&helper.args[1].kind, NodeKind::Helper(h) if h.name == "token"));
}

#[test]
fn test_chained_call_expression() {
    let node = parse_expression("$token::balanceOf(@me)::toString()").unwrap();
    let NodeKind::Call(outer) = &node.kind else {
        panic!("expected call");
    };
    assert_eq!(outer.method, "toString");
    let NodeKind::Call(inner) = &outer.target.kind else {
        panic!("expected inner call");
    };
    assert_eq!(inner.method, "balanceOf");
    assert_eq!(inner.target.kind, NodeKind::Variable("token".to_string()));
}

#[test]
fn test_call_on_address() {
    let text = "0x44fA8E6f47987339850636F88629646662444217::decimals()";
    let node = parse_expression(text).unwrap();
    assert!(matches!(&node.kind, NodeKind::Call(c) if c.method == "decimals" && c.args.is_empty()));
    assert_eq!(node.loc.end.offset, text.len());
}

#[test]
fn test_call_errors() {
    assert_eq!(
        parse_expression("@f(1,,2)").unwrap_err().kind,
        ParseErrorKind::InvalidSyntax
    );
    assert_eq!(
        parse_expression("@f(1").unwrap_err().kind,
        ParseErrorKind::UnclosedParenthesis
    );
    assert!(parse_expression("$a::").is_err());
}

// -------------------------------------------------------------------------
// 命令
// -------------------------------------------------------------------------

#[test]
fn test_command_with_module_args_and_options() {
    let cmd = single_command("std:raw 0x44fA8E6f47987339850636F88629646662444217 0x 1eth --from $me");
    assert_eq!(cmd.module.as_deref(), Some("std"));
    assert_eq!(cmd.name, "raw");
    assert_eq!(cmd.args.len(), 3);
    assert_eq!(cmd.opts.len(), 1);
    assert_eq!(cmd.opts[0].name, "from");
    assert_eq!(cmd.opts[0].value.kind, NodeKind::Variable("me".to_string()));
}

#[test]
fn test_whitespace_does_not_change_meaning() {
    let tight = single_command("set $a 1");
    let loose = single_command("   set \t $a    1   ");
    assert_eq!(tight.name, loose.name);
    assert_eq!(tight.args.len(), loose.args.len());
    for (a, b) in tight.args.iter().zip(&loose.args) {
        assert_eq!(a.kind, b.kind);
    }
}

#[test]
fn test_comments() {
    let ast = parse_ok("# header\nset $a 1 # trailing\n\n  # indented\nprint $a");
    assert_eq!(ast.commands.len(), 2);
    assert_eq!(ast.commands[1].name, "print");
    assert_eq!(ast.commands[1].loc.start.line, 5);
}

#[test]
fn test_invalid_command_names() {
    assert_eq!(first_error_kind("std:: foo"), ParseErrorKind::InvalidCommandName);
    assert_eq!(first_error_kind("std:1bad x"), ParseErrorKind::InvalidCommandName);
    assert_eq!(first_error_kind(":set x"), ParseErrorKind::InvalidSyntax);
}

#[test]
fn test_event_capture() {
    let cmd = single_command("raw $token 0xa9059cbb -> Transfer $from $to $amount");
    assert_eq!(cmd.captures.len(), 1);
    assert_eq!(cmd.captures[0].event, "Transfer");
    assert_eq!(cmd.captures[0].variables, vec!["from", "to", "amount"]);
    assert_eq!(first_error_kind("raw $t 0x -> Transfer"), ParseErrorKind::InvalidSyntax);
}

#[test]
fn test_argument_must_be_followed_by_delimiter() {
    assert_eq!(first_error_kind("print \"a\"b"), ParseErrorKind::TrailingContent);
}

// -------------------------------------------------------------------------
// 命令块
// -------------------------------------------------------------------------

#[test]
fn test_nested_blocks() {
    let ast = parse_ok(
        "batch (\n  set $a 1\n  for $x of [1, 2] (\n    print $x\n  )\n)\nprint done",
    );
    assert_eq!(ast.commands.len(), 2);
    let batch = &ast.commands[0];
    let block = batch.block().expect("batch has a block");
    assert_eq!(block.commands.len(), 2);
    let inner = block.commands[1].block().expect("for has a block");
    assert_eq!(inner.commands[0].name, "print");
    assert_eq!(ast.commands[1].loc.start.line, 7);
}

#[test]
fn test_paren_with_content_is_arithmetic_not_block() {
    let cmd = single_command("print (1 + 2)");
    assert!(cmd.block().is_none());
    assert!(matches!(cmd.args[0].kind, NodeKind::Arithmetic(_)));
}

#[test]
fn test_unclosed_block_keeps_partial_commands() {
    let result = Parser::new().parse("batch (\n  set $a 1\n  print $a\n");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ParseErrorKind::UnclosedBlock);
    let block = result.ast.commands[0].block().unwrap();
    assert_eq!(block.commands.len(), 2);
}

#[test]
fn test_stray_closing_paren() {
    let result = Parser::new().parse("set $a 1\n)\nprint $a");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.ast.commands.len(), 2);
}

#[test]
fn test_too_deeply_nested() {
    let deep = format!("print {}1{}", "[".repeat(40), "]".repeat(40));
    assert_eq!(first_error_kind(&deep), ParseErrorKind::TooDeeplyNested);

    let shallow = format!("print {}1{}", "[".repeat(5), "]".repeat(5));
    parse_ok(&shallow);
}

// -------------------------------------------------------------------------
// 错误收集
// -------------------------------------------------------------------------

#[test]
fn test_collects_all_errors() {
    let result = Parser::new().parse("print [1,,2]\nset $a 1\nprint \"open\nprint (1 +\nprint ok");
    let kinds: Vec<_> = result.errors.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ParseErrorKind::EmptyArrayElement,
            ParseErrorKind::UnterminatedString,
            ParseErrorKind::UnclosedParenthesis,
        ]
    );
    // 有效行依然被解析
    let names: Vec<_> = result.ast.commands.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["set", "print"]);
    assert_eq!(result.errors[1].position.line, 3);
}

#[test]
fn test_into_result() {
    assert!(Parser::new().parse("set $a 1").into_result().is_ok());
    assert!(matches!(
        Parser::new().parse("set $a [").into_result(),
        Err(CrisprError::Parse(errors)) if errors.len() == 1
    ));
}

#[test]
fn test_empty_script() {
    let result = Parser::new().parse("  \n# only comments\n\n");
    assert!(result.is_ok());
    assert!(result.ast.is_empty());
}
