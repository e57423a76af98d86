//! # Num 模块
//!
//! 精确有理数运算。脚本中的所有数字字面量和算术表达式都经过 [`Num`]，
//! 因此 `1/3 * 3` 的结果严格等于 `1`，代币金额不会出现精度损失。
//!
//! ## 表示
//!
//! - 分子、分母均为任意精度整数（`BigInt`）
//! - 分母恒为正
//! - 构造时按 GCD 约分，因此结构相等即数学相等

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// 非有限小数渲染时保留的小数位数
pub const DISPLAY_PRECISION: u32 = 18;

/// 幂运算与字面量 `eN` 允许的最大指数绝对值
pub const MAX_EXPONENT: u32 = 1 << 16;

/// 幂运算结果分子、分母各自允许的最大位数
pub const MAX_POW_BITS: u64 = 1 << 20;

/// 有理数运算错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumError {
    /// 分母为零
    #[error("denominator cannot be zero")]
    ZeroDenominator,

    /// 除以零
    #[error("division by zero")]
    DivisionByZero,

    /// 指数不是整数
    #[error("exponent must be an integer, got {0}")]
    NonIntegerExponent(String),

    /// 指数超出可计算范围
    #[error("exponent {0} is too large")]
    ExponentTooLarge(String),

    /// 无法解析的十进制字符串
    #[error("invalid decimal string '{0}'")]
    InvalidDecimal(String),
}

/// 约分后的有理数
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Num {
    numerator: BigInt,
    denominator: BigInt,
}

impl Num {
    /// 由分子、分母构造，自动约分
    pub fn new(numerator: impl Into<BigInt>, denominator: impl Into<BigInt>) -> Result<Self, NumError> {
        let numerator = numerator.into();
        let denominator = denominator.into();
        if denominator.is_zero() {
            return Err(NumError::ZeroDenominator);
        }
        Ok(Self::reduced(numerator, denominator))
    }

    /// 由整数构造
    pub fn from_int(value: impl Into<BigInt>) -> Self {
        Self {
            numerator: value.into(),
            denominator: BigInt::one(),
        }
    }

    pub fn zero() -> Self {
        Self::from_int(0)
    }

    pub fn one() -> Self {
        Self::from_int(1)
    }

    /// 由十进制字符串构造
    ///
    /// 按小数点拆分，分母为 `10^小数位数`。支持可选的前导 `-`。
    ///
    /// ```text
    /// "1.25"  -> 5/4
    /// "-0.5"  -> -1/2
    /// "42"    -> 42/1
    /// ```
    pub fn from_decimal_string(s: &str) -> Result<Self, NumError> {
        let invalid = || NumError::InvalidDecimal(s.to_string());

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };

        let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }
        if body.ends_with('.') {
            return Err(invalid());
        }

        let digits = format!("{int_part}{frac_part}");
        let mut numerator = BigInt::from_str(&digits).map_err(|_| invalid())?;
        if negative {
            numerator = -numerator;
        }
        let denominator = pow10(frac_part.len() as u32);
        Ok(Self::reduced(numerator, denominator))
    }

    pub fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    pub fn denominator(&self) -> &BigInt {
        &self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }

    pub fn is_integer(&self) -> bool {
        self.denominator.is_one()
    }

    pub fn is_negative(&self) -> bool {
        self.numerator.is_negative()
    }

    /// 除法，除数为零时失败
    #[allow(clippy::should_implement_trait)]
    pub fn div(&self, other: &Num) -> Result<Num, NumError> {
        if other.is_zero() {
            return Err(NumError::DivisionByZero);
        }
        Ok(Self::reduced(
            &self.numerator * &other.denominator,
            &self.denominator * &other.numerator,
        ))
    }

    /// 取模（按截断除法的余数），除数为零时失败
    pub fn rem(&self, other: &Num) -> Result<Num, NumError> {
        let quotient = self.div(other)?.to_integer();
        Ok(self - &(other * &Num::from_int(quotient)))
    }

    /// 整数次幂
    ///
    /// 负指数取倒数；非整数指数失败；指数超过 [`MAX_EXPONENT`]
    /// 或结果超过 [`MAX_POW_BITS`] 位时失败。
    pub fn pow(&self, exponent: &Num) -> Result<Num, NumError> {
        if !exponent.is_integer() {
            return Err(NumError::NonIntegerExponent(exponent.to_string()));
        }
        let too_large = || NumError::ExponentTooLarge(exponent.to_string());

        // 0、1、-1 的任意次幂不会增长
        if self.denominator.is_one() && self.numerator.magnitude() <= &BigUint::one() {
            return match exponent.numerator.sign() {
                Sign::Minus if self.numerator.is_zero() => Err(NumError::DivisionByZero),
                _ if self.numerator.is_zero() && exponent.is_zero() => Ok(Num::one()),
                _ if exponent.numerator.is_even() => Ok(if self.numerator.is_zero() {
                    Num::zero()
                } else {
                    Num::one()
                }),
                _ => Ok(self.clone()),
            };
        }

        let magnitude = exponent
            .numerator
            .magnitude()
            .to_u32()
            .filter(|m| *m <= MAX_EXPONENT)
            .ok_or_else(too_large)?;
        let bits = self.numerator.bits().max(self.denominator.bits());
        if bits.saturating_mul(u64::from(magnitude)) > MAX_POW_BITS {
            return Err(too_large());
        }

        let numerator = num_traits::pow(self.numerator.clone(), magnitude as usize);
        let denominator = num_traits::pow(self.denominator.clone(), magnitude as usize);

        if exponent.is_negative() {
            Ok(Self::reduced(denominator, numerator))
        } else {
            Ok(Self::reduced(numerator, denominator))
        }
    }

    /// 比较（等价于 `Ord::cmp`）
    pub fn compare(&self, other: &Num) -> Ordering {
        self.cmp(other)
    }

    pub fn gte(&self, other: &Num) -> bool {
        self >= other
    }

    pub fn lte(&self, other: &Num) -> bool {
        self <= other
    }

    /// 向零截断为整数
    pub fn to_integer(&self) -> BigInt {
        &self.numerator / &self.denominator
    }

    /// 非负整数转换为 `BigUint`，否则返回 `None`
    pub fn to_biguint(&self) -> Option<BigUint> {
        if !self.is_integer() || self.is_negative() {
            return None;
        }
        self.numerator.to_biguint()
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.to_biguint().and_then(|n| n.to_u64())
    }

    /// 规范十进制渲染
    ///
    /// 有限小数精确输出；无限小数保留 [`DISPLAY_PRECISION`] 位（向零截断），
    /// 末尾零全部去掉。
    pub fn to_decimal_string(&self) -> String {
        let negative = self.is_negative();
        let abs_numer = self.numerator.abs();
        let (int_part, remainder) = abs_numer.div_rem(&self.denominator);

        let mut out = String::new();
        if remainder.is_zero() {
            if negative {
                out.push('-');
            }
            out.push_str(&int_part.to_string());
            return out;
        }

        let digits = terminating_digits(&self.denominator).unwrap_or(DISPLAY_PRECISION);
        let scaled = (remainder * pow10(digits)) / &self.denominator;
        let frac = format!("{:0>width$}", scaled.to_string(), width = digits as usize);
        let frac = frac.trim_end_matches('0');

        if frac.is_empty() && int_part.is_zero() {
            return "0".to_string();
        }
        if negative {
            out.push('-');
        }
        out.push_str(&int_part.to_string());
        if !frac.is_empty() {
            out.push('.');
            out.push_str(frac);
        }
        out
    }

    fn reduced(numerator: BigInt, denominator: BigInt) -> Self {
        let (mut numerator, mut denominator) = if denominator.sign() == Sign::Minus {
            (-numerator, -denominator)
        } else {
            (numerator, denominator)
        };
        let gcd = numerator.gcd(&denominator);
        if !gcd.is_zero() && !gcd.is_one() {
            numerator /= &gcd;
            denominator /= &gcd;
        }
        if numerator.is_zero() {
            denominator = BigInt::one();
        }
        Self {
            numerator,
            denominator,
        }
    }
}

/// `10^exp`
pub(crate) fn pow10(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exp as usize)
}

/// 若分母只含因子 2 和 5，返回精确表示所需的小数位数
fn terminating_digits(denominator: &BigInt) -> Option<u32> {
    let two = BigInt::from(2u8);
    let five = BigInt::from(5u8);
    let mut d = denominator.clone();
    let (mut twos, mut fives) = (0u32, 0u32);
    while d.is_even() && !d.is_zero() {
        d /= &two;
        twos += 1;
    }
    while (&d % &five).is_zero() && !d.is_zero() {
        d /= &five;
        fives += 1;
    }
    d.is_one().then_some(twos.max(fives))
}

impl Ord for Num {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.numerator * &other.denominator).cmp(&(&other.numerator * &self.denominator))
    }
}

impl PartialOrd for Num {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for &Num {
    type Output = Num;

    fn add(self, rhs: &Num) -> Num {
        Num::reduced(
            &self.numerator * &rhs.denominator + &rhs.numerator * &self.denominator,
            &self.denominator * &rhs.denominator,
        )
    }
}

impl Sub for &Num {
    type Output = Num;

    fn sub(self, rhs: &Num) -> Num {
        Num::reduced(
            &self.numerator * &rhs.denominator - &rhs.numerator * &self.denominator,
            &self.denominator * &rhs.denominator,
        )
    }
}

impl Mul for &Num {
    type Output = Num;

    fn mul(self, rhs: &Num) -> Num {
        Num::reduced(
            &self.numerator * &rhs.numerator,
            &self.denominator * &rhs.denominator,
        )
    }
}

impl Add for Num {
    type Output = Num;

    fn add(self, rhs: Num) -> Num {
        &self + &rhs
    }
}

impl Sub for Num {
    type Output = Num;

    fn sub(self, rhs: Num) -> Num {
        &self - &rhs
    }
}

impl Mul for Num {
    type Output = Num;

    fn mul(self, rhs: Num) -> Num {
        &self * &rhs
    }
}

impl Neg for Num {
    type Output = Num;

    fn neg(self) -> Num {
        Num {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }
}

impl From<i64> for Num {
    fn from(value: i64) -> Self {
        Num::from_int(value)
    }
}

impl From<u64> for Num {
    fn from(value: u64) -> Self {
        Num::from_int(value)
    }
}

impl From<BigInt> for Num {
    fn from(value: BigInt) -> Self {
        Num::from_int(value)
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

/// 解析 `"n/d"` 或十进制字符串
impl FromStr for Num {
    type Err = NumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((n, d)) => {
                let invalid = || NumError::InvalidDecimal(s.to_string());
                let n = BigInt::from_str(n.trim()).map_err(|_| invalid())?;
                let d = BigInt::from_str(d.trim()).map_err(|_| invalid())?;
                Num::new(n, d)
            }
            None => Num::from_decimal_string(s.trim()),
        }
    }
}

/// 有限小数序列化为十进制字符串，否则为 `"n/d"`，保证可以无损反序列化
impl Serialize for Num {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if terminating_digits(&self.denominator).is_some() {
            serializer.serialize_str(&self.to_decimal_string())
        } else {
            serializer.serialize_str(&format!("{}/{}", self.numerator, self.denominator))
        }
    }
}

impl<'de> Deserialize<'de> for Num {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Num::from_str(&s).map_err(serde::de::Error::custom)
    }
}
