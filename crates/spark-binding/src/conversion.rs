//! 字符串到强类型参数值的转换服务。
//!
//! # 教案级说明
//! - **意图 (Why)**：请求中的查询参数、路径变量、请求头均为字符串，初始化器与绑定目标需要的是
//!   强类型值；转换服务是二者之间唯一的桥梁，并可由全局绑定策略替换。
//! - **契约 (What)**：[`ConversionService::convert`] 返回 `Ok(None)` 表示“源值为空，视为无值”，
//!   由调用方决定是套用默认值还是报告缺失；返回 `Err` 表示源值存在但格式非法。
//! - **权衡 (Trade-offs)**：只覆盖封闭的 [`ValueKind`] 集合，不提供任意类型的转换器注册表。

use std::fmt;

use crate::error::ConversionError;
use crate::value::{ArgumentValue, ValueKind};

/// 转换服务契约。
///
/// 实现必须是 `Send + Sync`：全局策略持有的实例会被所有请求共享。
pub trait ConversionService: Send + Sync + fmt::Debug {
    /// 是否支持转换为 `target`。
    fn can_convert(&self, target: ValueKind) -> bool;

    /// 将 `source` 转换为 `target` 类型。
    fn convert(
        &self,
        source: &str,
        target: ValueKind,
    ) -> Result<Option<ArgumentValue>, ConversionError>;
}

/// 默认转换服务。
///
/// # 教案式说明
/// - **数值**：去除首尾空白后解析；整数额外接受 `0x`/`0X`/`#` 前缀的十六进制写法（可带负号）；
/// - **布尔**：大小写不敏感地接受 `true/on/yes/1` 与 `false/off/no/0`；
/// - **空值**：非文本目标遇到空白源值时返回 `Ok(None)`；文本目标原样保留。
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConversionService;

impl DefaultConversionService {
    pub fn new() -> Self {
        Self
    }
}

impl ConversionService for DefaultConversionService {
    fn can_convert(&self, _target: ValueKind) -> bool {
        true
    }

    fn convert(
        &self,
        source: &str,
        target: ValueKind,
    ) -> Result<Option<ArgumentValue>, ConversionError> {
        let trimmed = source.trim();
        if trimmed.is_empty() && target != ValueKind::Text {
            return Ok(None);
        }

        let value = match target {
            ValueKind::Text => ArgumentValue::Text(source.to_owned()),
            ValueKind::I32 => parse_integer(trimmed, target).and_then(|wide| {
                i32::try_from(wide)
                    .map(ArgumentValue::I32)
                    .map_err(|_| ConversionError::new(source, target, "value out of range"))
            })?,
            ValueKind::I64 => parse_integer(trimmed, target).and_then(|wide| {
                i64::try_from(wide)
                    .map(ArgumentValue::I64)
                    .map_err(|_| ConversionError::new(source, target, "value out of range"))
            })?,
            ValueKind::U64 => parse_integer(trimmed, target).and_then(|wide| {
                u64::try_from(wide)
                    .map(ArgumentValue::U64)
                    .map_err(|_| ConversionError::new(source, target, "value out of range"))
            })?,
            ValueKind::F64 => trimmed
                .parse::<f64>()
                .map(ArgumentValue::F64)
                .map_err(|err| ConversionError::new(source, target, err.to_string()))?,
            ValueKind::Bool => ArgumentValue::Bool(parse_bool(trimmed).ok_or_else(|| {
                ConversionError::new(source, target, "invalid boolean value")
            })?),
        };
        Ok(Some(value))
    }
}

/// 以 `i128` 为中间宽度解析十进制或十六进制整数，范围检查交给调用方。
fn parse_integer(text: &str, target: ValueKind) -> Result<i128, ConversionError> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let hex = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
        .or_else(|| unsigned.strip_prefix('#'));

    // 符号只允许出现在最前面一次，`--5`、`0x-5` 之类的写法一律拒绝。
    let digits = hex.unwrap_or(unsigned);
    if digits.starts_with(['+', '-']) {
        return Err(ConversionError::new(text, target, "misplaced sign"));
    }

    let radix = if hex.is_some() { 16 } else { 10 };
    let magnitude = i128::from_str_radix(digits, radix)
        .map_err(|err| ConversionError::new(text, target, err.to_string()))?;

    if negative {
        magnitude
            .checked_neg()
            .ok_or_else(|| ConversionError::new(text, target, "value out of range"))
    } else {
        Ok(magnitude)
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}
