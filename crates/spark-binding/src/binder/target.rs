//! 绑定目标、待绑定属性值与绑定结果。

use std::any::Any;
use std::fmt;

use crate::value::{ArgumentValue, ValueKind};

/// 可被数据绑定器写入的目标对象。
///
/// # 教案式说明
/// - **意图 (Why)**：以显式的字段描述替代运行时反射：目标自己声明哪些字段可写、各是什么类型；
/// - **契约 (What)**：
///   - `field_kind` 返回 `None` 表示未知字段，绑定器按 `ignore_unknown_fields` 决定忽略或报错；
///   - `set_field` 收到的值已转换为 `field_kind` 声明的类型，返回 `Err` 时文本会作为字段错误消息记录；
/// - **设计 (How)**：`Any` 作为父 trait，使调用方能够从绑定器取回具体类型（见
///   [`WebDataBinder::target`](super::WebDataBinder::target)）。
pub trait BindTarget: Any + Send + fmt::Debug {
    fn field_kind(&self, field: &str) -> Option<ValueKind>;

    fn set_field(&mut self, field: &str, value: ArgumentValue) -> Result<(), String>;
}

/// 单个待绑定属性：名称与原始字符串值（多值按出现顺序保存）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyValue {
    name: String,
    values: Vec<String>,
}

impl PropertyValue {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// 标量字段只消费第一个值。
    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// 有序的待绑定属性集合，同名属性只保留首次加入的一份。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyValues {
    values: Vec<PropertyValue>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入一个单值属性；已存在同名属性时忽略。
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_if_absent(name, vec![value.into()]);
        self
    }

    /// 已存在同名属性时返回 `false` 且不做修改。
    pub fn add_if_absent(&mut self, name: impl Into<String>, values: Vec<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.values.push(PropertyValue::new(name, values));
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|value| value.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.iter().find(|value| value.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        let index = self.values.iter().position(|value| value.name == name)?;
        Some(self.values.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyValue> {
        self.values.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.values.iter().map(|value| value.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 字段错误分类。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldErrorCode {
    /// 必填字段缺失或为空白。
    Required,
    /// 原始值无法转换为字段类型。
    TypeMismatch,
    /// 目标不认识该字段且未开启忽略。
    NotWritable,
    /// 目标拒绝写入。
    Rejected,
    /// 由校验器产生，携带校验器自定义的错误码。
    Validation(String),
}

impl FieldErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            FieldErrorCode::Required => "required",
            FieldErrorCode::TypeMismatch => "typeMismatch",
            FieldErrorCode::NotWritable => "notWritable",
            FieldErrorCode::Rejected => "methodInvocation",
            FieldErrorCode::Validation(code) => code,
        }
    }
}

/// 单个字段上的绑定或校验错误。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub object_name: String,
    pub field: String,
    pub code: FieldErrorCode,
    pub rejected_value: Option<String>,
    pub message: String,
}

/// 一次绑定/校验的累计结果。
///
/// - **契约 (What)**：绑定错误不会中断绑定流程，而是逐字段累积；被允许/禁止列表过滤掉的
///   字段记录在 `suppressed_fields` 中，便于审计疑似的批量赋值攻击。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindingResult {
    object_name: String,
    field_errors: Vec<FieldError>,
    suppressed_fields: Vec<String>,
}

impl BindingResult {
    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            field_errors: Vec::new(),
            suppressed_fields: Vec::new(),
        }
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn has_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.field_errors.len()
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    pub fn field_error(&self, field: &str) -> Option<&FieldError> {
        self.field_errors.iter().find(|error| error.field == field)
    }

    /// 记录一个字段错误。
    pub fn reject_value(
        &mut self,
        field: impl Into<String>,
        code: FieldErrorCode,
        rejected_value: Option<String>,
        message: impl Into<String>,
    ) {
        self.field_errors.push(FieldError {
            object_name: self.object_name.clone(),
            field: field.into(),
            code,
            rejected_value,
            message: message.into(),
        });
    }

    pub fn suppressed_fields(&self) -> &[String] {
        &self.suppressed_fields
    }

    pub(crate) fn record_suppressed(&mut self, field: impl Into<String>) {
        self.suppressed_fields.push(field.into());
    }
}

/// 目标对象校验器。
pub trait Validator: Send + Sync + fmt::Debug {
    /// 是否能够校验给定目标。
    fn supports(&self, target: &dyn BindTarget) -> bool;

    /// 校验目标，把发现的问题写入 `errors`。
    fn validate(&self, target: &dyn BindTarget, errors: &mut BindingResult);
}
