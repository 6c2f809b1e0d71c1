//! 初始化器辅助参数的解析。
//!
//! # 教案级说明
//! - **意图 (Why)**：初始化器除绑定器外还可以声明来自请求的参数（查询参数、路径变量、请求头、
//!   请求属性），
//!   这些值需要在调用前按声明逐个取出并转换类型；
//! - **契约 (What)**：
//!   - 解析器按注册顺序询问，第一个 `supports_parameter` 为真的解析器负责该参数；
//!   - 解析结果 `Ok(None)` 表示“可选参数未提供”；必填缺失与转换失败以错误返回并原样向上传播；
//! - **结构 (How)**：四个内建解析器共享 [`resolve_named_value`] 中的缺省值/必填语义，
//!   差异只在于从交换的哪个部分取原始字符串。

mod path_variable;
mod request_attribute;
mod request_header;
mod request_param;

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::conversion::ConversionService;
use crate::error::{BindingError, Result};
use crate::exchange::ServerWebExchange;
use crate::method::{InitBinderMethod, MethodParameter, ResolvedArguments};
use crate::value::ArgumentValue;

pub use path_variable::PathVariableArgumentResolver;
pub use request_attribute::RequestAttributeArgumentResolver;
pub use request_header::RequestHeaderArgumentResolver;
pub use request_param::RequestParamArgumentResolver;

/// 一次参数解析可见的上下文。
#[derive(Clone, Copy)]
pub struct ResolverContext<'a> {
    exchange: &'a ServerWebExchange,
    conversion_service: &'a dyn ConversionService,
}

impl<'a> ResolverContext<'a> {
    pub fn new(
        exchange: &'a ServerWebExchange,
        conversion_service: &'a dyn ConversionService,
    ) -> Self {
        Self {
            exchange,
            conversion_service,
        }
    }

    pub fn exchange(&self) -> &'a ServerWebExchange {
        self.exchange
    }

    pub fn conversion_service(&self) -> &'a dyn ConversionService {
        self.conversion_service
    }
}

impl fmt::Debug for ResolverContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverContext")
            .field("path", &self.exchange.request().path())
            .field("conversion_service", &self.conversion_service)
            .finish()
    }
}

/// 参数解析器契约。
///
/// 实现需为 `Send + Sync`：解析器在上下文构建后被所有请求共享。
pub trait ArgumentResolver: Send + Sync + fmt::Debug {
    /// 是否负责解析该参数。
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool;

    /// 解析参数值；`Ok(None)` 表示可选参数无值。
    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        context: &ResolverContext<'_>,
    ) -> Result<Option<ArgumentValue>>;
}

/// 有序的解析器组合。
#[derive(Clone, Debug, Default)]
pub struct ArgumentResolverComposite {
    resolvers: Vec<Arc<dyn ArgumentResolver>>,
}

impl ArgumentResolverComposite {
    /// 空组合，不支持任何参数。
    pub fn new() -> Self {
        Self::default()
    }

    /// 内建解析器：查询参数、路径变量、请求头、请求属性。
    pub fn with_defaults() -> Self {
        let mut composite = Self::new();
        composite.add(Arc::new(RequestParamArgumentResolver));
        composite.add(Arc::new(PathVariableArgumentResolver));
        composite.add(Arc::new(RequestHeaderArgumentResolver));
        composite.add(Arc::new(RequestAttributeArgumentResolver));
        composite
    }

    pub fn add(&mut self, resolver: Arc<dyn ArgumentResolver>) {
        self.resolvers.push(resolver);
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// 返回第一个支持该参数的解析器。
    pub fn resolver_for(&self, parameter: &MethodParameter) -> Option<&Arc<dyn ArgumentResolver>> {
        self.resolvers
            .iter()
            .find(|resolver| resolver.supports_parameter(parameter))
    }

    pub fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        self.resolver_for(parameter).is_some()
    }

    /// 按声明顺序解析初始化器的全部参数。
    ///
    /// 任一参数失败即返回该错误，不会产出部分结果。
    pub fn resolve_arguments(
        &self,
        method: &InitBinderMethod,
        context: &ResolverContext<'_>,
    ) -> Result<ResolvedArguments> {
        let mut arguments = ResolvedArguments::new();
        for parameter in method.parameters() {
            let resolver =
                self.resolver_for(parameter)
                    .ok_or_else(|| BindingError::UnresolvableParameter {
                        method: method.name().to_owned().into(),
                        parameter: parameter.to_string(),
                    })?;
            let value = resolver.resolve_argument(parameter, context)?;
            trace!(
                method = method.name(),
                parameter = parameter.name(),
                resolved = value.is_some(),
                "resolved init-binder argument"
            );
            arguments.push(parameter.name(), value);
        }
        Ok(arguments)
    }
}

/// 具名值参数的通用解析流程。
///
/// # 教案式说明
/// - **契约 (What)**：
///   1. 原始值存在且转换出值：直接使用；原始值为空串且声明了默认值时视为缺失；
///   2. 原始值缺失，或转换结果为“无值”（例如空白字符串转数字）：若声明了默认值则转换默认值；
///   3. 仍无值：必填参数返回 `missing()` 构造的错误，可选参数返回 `None`；
///   4. 转换失败一律返回 [`BindingError::TypeMismatch`]。
pub(crate) fn resolve_named_value(
    parameter: &MethodParameter,
    raw: Option<&str>,
    context: &ResolverContext<'_>,
    missing: impl FnOnce() -> BindingError,
) -> Result<Option<ArgumentValue>> {
    // 空串在声明了默认值时等同缺失，文本类型也不例外。
    let raw = raw.filter(|raw| !(raw.is_empty() && parameter.default_value().is_some()));
    let mut value = match raw {
        Some(raw) => convert(parameter, raw, context)?,
        None => None,
    };
    if value.is_none() {
        if let Some(default) = parameter.default_value() {
            value = convert(parameter, default, context)?;
        }
    }
    match value {
        None if parameter.is_required() => Err(missing()),
        value => Ok(value),
    }
}

fn convert(
    parameter: &MethodParameter,
    raw: &str,
    context: &ResolverContext<'_>,
) -> Result<Option<ArgumentValue>> {
    context
        .conversion_service()
        .convert(raw, parameter.kind())
        .map_err(|source| BindingError::TypeMismatch {
            parameter: parameter.name().to_owned(),
            value: raw.to_owned(),
            source,
        })
}
