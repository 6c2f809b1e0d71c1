//! 参数值模型：解析器产出、转换服务生成、初始化器消费的统一值类型。

use std::fmt;

/// 转换目标类型标签。
///
/// - **意图 (Why)**：以封闭枚举替代运行时反射出的参数类型，使注册期即可确定转换目标；
/// - **契约 (What)**：每个变体与 [`ArgumentValue`] 的同名变体一一对应。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Text,
    I32,
    I64,
    U64,
    F64,
    Bool,
}

impl ValueKind {
    /// 类型的稳定名称，用于日志与错误消息。
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::U64 => "u64",
            ValueKind::F64 => "f64",
            ValueKind::Bool => "bool",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已完成类型转换的参数值。
#[derive(Clone, Debug, PartialEq)]
pub enum ArgumentValue {
    Text(String),
    I32(i32),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
}

impl ArgumentValue {
    /// 返回值对应的类型标签。
    pub fn kind(&self) -> ValueKind {
        match self {
            ArgumentValue::Text(_) => ValueKind::Text,
            ArgumentValue::I32(_) => ValueKind::I32,
            ArgumentValue::I64(_) => ValueKind::I64,
            ArgumentValue::U64(_) => ValueKind::U64,
            ArgumentValue::F64(_) => ValueKind::F64,
            ArgumentValue::Bool(_) => ValueKind::Bool,
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Text(value) => write!(f, "\"{value}\""),
            ArgumentValue::I32(value) => write!(f, "{value}"),
            ArgumentValue::I64(value) => write!(f, "{value}"),
            ArgumentValue::U64(value) => write!(f, "{value}"),
            ArgumentValue::F64(value) => write!(f, "{value}"),
            ArgumentValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        ArgumentValue::Text(value.to_owned())
    }
}

impl From<String> for ArgumentValue {
    fn from(value: String) -> Self {
        ArgumentValue::Text(value)
    }
}

/// 从 [`ArgumentValue`] 中提取强类型值。
///
/// # 教案式说明
/// - **意图 (Why)**：初始化器按 Rust 类型读取参数，而不是对枚举做手工匹配；
/// - **契约 (What)**：`KIND` 声明该类型期望的标签；`from_argument` 仅在标签一致时返回 `Some`，
///   不做隐式的数值拓宽，避免 `i64` 被悄悄截断为 `i32`。
pub trait FromArgument: Sized {
    const KIND: ValueKind;

    fn from_argument(value: &ArgumentValue) -> Option<Self>;
}

macro_rules! impl_from_argument {
    ($ty:ty, $variant:ident) => {
        impl FromArgument for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn from_argument(value: &ArgumentValue) -> Option<Self> {
                match value {
                    ArgumentValue::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_from_argument!(String, Text);
impl_from_argument!(i32, I32);
impl_from_argument!(i64, I64);
impl_from_argument!(u64, U64);
impl_from_argument!(f64, F64);
impl_from_argument!(bool, Bool);
