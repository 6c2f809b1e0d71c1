//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义绑定上下文对外暴露的错误语义：注册期签名校验、调用期返回值契约、参数解析失败；
//! - 让 `create_data_binder` 的调用方能够区分“配置错误”（致命）与“请求数据错误”（可回传客户端）。
//!
//! ## 设计要求（What）
//! - 所有错误派生 `thiserror::Error`，保证与 `std::error::Error` 生态兼容；
//! - 解析器产生的错误原样向上传播，不做二次包装；
//! - “未命中任何初始化器”不是错误，因此这里没有对应变体。

use std::borrow::Cow;

use thiserror::Error;

use crate::value::{ArgumentValue, ValueKind};

/// crate 内统一的结果别名。
pub type Result<T, E = BindingError> = std::result::Result<T, E>;

/// 数据绑定域的错误枚举。
///
/// # 教案式说明
/// - **意图 (Why)**：以细粒度变体区分“初始化器签名违规”“请求值缺失”“类型转换失败”等场景，
///   便于宿主决定返回 400 还是直接判定为部署缺陷。
/// - **契约 (What)**：
///   - `InvalidInitializerSignature`、`UnexpectedReturnValue`、`UnresolvableParameter` 属于配置错误，
///     出现即意味着注册表本身有问题；
///   - `Missing*`、`TypeMismatch` 来源于请求数据，由参数解析器产生并原样透传；
///   - `MissingArgument`、`ArgumentTypeMismatch` 来源于初始化器代码读取了未声明或类型不符的参数。
/// - **设计权衡 (Trade-offs)**：上下文字段统一使用 `String`，牺牲少量分配换取日志可读性。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BindingError {
    /// 注册期发现初始化器声明了非 unit 返回类型。
    #[error("init-binder method `{method}` must not declare a return value, found `{return_type}`")]
    InvalidInitializerSignature {
        method: Cow<'static, str>,
        return_type: Cow<'static, str>,
    },

    /// 调用期初始化器实际产出了返回值。
    #[error("init-binder method `{method}` returned an unexpected value: {value}")]
    UnexpectedReturnValue {
        method: Cow<'static, str>,
        value: ArgumentValue,
    },

    /// 没有任何解析器支持某个已声明的参数。
    #[error("no argument resolver supports parameter `{parameter}` of init-binder method `{method}`")]
    UnresolvableParameter {
        method: Cow<'static, str>,
        parameter: String,
    },

    /// 必填的查询参数缺失。
    #[error("required request parameter `{name}` of type {kind} is not present")]
    MissingRequestParameter { name: String, kind: ValueKind },

    /// 必填的路径变量缺失。
    #[error("required path variable `{name}` is not present")]
    MissingPathVariable { name: String },

    /// 必填的请求头缺失。
    #[error("required request header `{name}` is not present")]
    MissingRequestHeader { name: String },

    /// 必填的请求属性缺失。
    #[error("required request attribute `{name}` is not present")]
    MissingRequestAttribute { name: String },

    /// 原始请求值无法转换为参数声明的类型。
    #[error("failed to convert value `{value}` of parameter `{parameter}`")]
    TypeMismatch {
        parameter: String,
        value: String,
        #[source]
        source: ConversionError,
    },

    /// 初始化器读取了一个未解析出值的参数。
    #[error("argument `{name}` has no resolved value")]
    MissingArgument { name: String },

    /// 初始化器按错误的类型读取参数。
    #[error("argument `{name}` is {actual}, not {expected}")]
    ArgumentTypeMismatch {
        name: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// 对没有目标对象的绑定器执行了绑定。
    #[error("data binder `{object_name}` has no target to bind to")]
    NoBindTarget { object_name: String },

    /// 请求 URI 或表单体编码非法。
    #[error("malformed request {part}: {detail}")]
    InvalidRequest { part: &'static str, detail: String },

    /// 全局绑定策略配置文档无法解析。
    #[error("invalid binding initializer configuration: {detail}")]
    Configuration { detail: String },
}

impl BindingError {
    /// 是否属于注册表/部署层面的配置错误。
    ///
    /// - **契约 (What)**：返回 `true` 时宿主不应把错误回显给客户端，而应记录并告警。
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            BindingError::InvalidInitializerSignature { .. }
                | BindingError::UnexpectedReturnValue { .. }
                | BindingError::UnresolvableParameter { .. }
                | BindingError::MissingArgument { .. }
                | BindingError::ArgumentTypeMismatch { .. }
                | BindingError::Configuration { .. }
        )
    }
}

/// 字符串到目标类型的转换失败。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("cannot convert `{value}` to {target}: {reason}")]
pub struct ConversionError {
    pub value: String,
    pub target: ValueKind,
    pub reason: String,
}

impl ConversionError {
    pub fn new(value: impl Into<String>, target: ValueKind, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            target,
            reason: reason.into(),
        }
    }
}
