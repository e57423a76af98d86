//! 辅助函数：`@me`、`@date`

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::RuntimeError;
use crate::module::{ArgDef, ArgType, EagerContext, Helper, HelperContext};
use crate::num::Num;
use crate::script::ast::TimeUnit;
use crate::value::Value;

pub struct Me;

#[async_trait]
impl Helper for Me {
    fn name(&self) -> &'static str {
        "me"
    }

    fn args(&self) -> Vec<ArgDef> {
        Vec::new()
    }

    fn description(&self) -> &'static str {
        "address of the connected account"
    }

    async fn run(&self, ctx: &HelperContext<'_>, _args: Vec<Value>) -> Result<Value, RuntimeError> {
        let account = ctx.client.connected_account().await?;
        Ok(Value::Address(account))
    }
}

pub struct Date;

/// `now`、`YYYY-MM-DD`（UTC 零点）或 RFC 3339
fn parse_date(date: &str) -> Result<i64, String> {
    if date == "now" {
        return Ok(Utc::now().timestamp());
    }
    if let Ok(day) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return day
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| format!("invalid date {date}"));
    }
    DateTime::parse_from_rfc3339(date)
        .map(|dt| dt.timestamp())
        .map_err(|_| format!("invalid date {date}, expected now, YYYY-MM-DD or RFC 3339"))
}

/// `+1d2h`、`-30m`，无符号视为正
fn parse_offset(offset: &str) -> Result<i64, String> {
    let invalid = || format!("invalid offset {offset}");
    let (sign, mut rest) = match offset.as_bytes().first() {
        Some(b'+') => (1, &offset[1..]),
        Some(b'-') => (-1, &offset[1..]),
        _ => (1, offset),
    };
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: i64 = 0;
    while !rest.is_empty() {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return Err(invalid());
        }
        let amount: i64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()).len();
        let unit = TimeUnit::from_suffix(&rest[..unit_len]).ok_or_else(invalid)?;
        rest = &rest[unit_len..];

        let seconds = i64::try_from(unit.seconds()).map_err(|_| invalid())?;
        total = amount
            .checked_mul(seconds)
            .and_then(|s| total.checked_add(s))
            .ok_or_else(invalid)?;
    }
    Ok(sign * total)
}

fn timestamp(args: &[Value]) -> Result<Num, String> {
    let date = args.first().and_then(Value::as_str).unwrap_or("now");
    let mut seconds = parse_date(date)?;
    if let Some(offset) = args.get(1).and_then(Value::as_str) {
        seconds = seconds
            .checked_add(parse_offset(offset)?)
            .ok_or_else(|| format!("date offset {offset} out of range"))?;
    }
    Ok(Num::from_int(seconds))
}

#[async_trait]
impl Helper for Date {
    fn name(&self) -> &'static str {
        "date"
    }

    fn args(&self) -> Vec<ArgDef> {
        vec![
            ArgDef::new("date", ArgType::String),
            ArgDef::new("offset", ArgType::String).optional(),
        ]
    }

    fn description(&self) -> &'static str {
        "unix timestamp of a date, optionally shifted by an offset"
    }

    async fn run(&self, ctx: &HelperContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
        timestamp(&args).map(Value::Number).map_err(|e| ctx.invalid(e))
    }

    fn run_eager(&self, _ctx: &EagerContext<'_>, args: &[Value]) -> Option<Value> {
        timestamp(args).ok().map(Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-01"), Ok(1_704_067_200));
        assert_eq!(parse_date("2024-01-01T01:00:00Z"), Ok(1_704_070_800));
        assert_eq!(parse_date("2024-01-01T02:00:00+01:00"), Ok(1_704_070_800));
        assert!(parse_date("yesterday").is_err());
        assert!(parse_date("now").unwrap() > 1_704_067_200);
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("+1d2h"), Ok(86_400 + 7_200));
        assert_eq!(parse_offset("-30m"), Ok(-1_800));
        assert_eq!(parse_offset("1mo"), Ok(2_592_000));
        assert_eq!(parse_offset("2w1s"), Ok(1_209_601));
        assert!(parse_offset("+").is_err());
        assert!(parse_offset("1x").is_err());
        assert!(parse_offset("d").is_err());
        assert!(parse_offset("5").is_err());
    }

    #[test]
    fn test_timestamp_with_offset() {
        let args = [Value::String("2024-01-01".into()), Value::String("+1d".into())];
        assert_eq!(timestamp(&args), Ok(Num::from_int(1_704_153_600)));
    }

    #[test]
    fn test_timestamp_offset_overflow() {
        let args = [
            Value::String("2024-01-01".into()),
            Value::String("+9223372036854775000s".into()),
        ];
        assert_eq!(
            timestamp(&args),
            Err("date offset +9223372036854775000s out of range".to_string())
        );
    }
}
