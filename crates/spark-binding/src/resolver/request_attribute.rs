//! 请求属性解析器。

use crate::error::{BindingError, Result};
use crate::method::{MethodParameter, ParameterSource};
use crate::value::ArgumentValue;

use super::{ArgumentResolver, ResolverContext, resolve_named_value};

/// 读取上游过滤器通过 [`ServerWebExchange::set_attribute`](crate::ServerWebExchange::set_attribute)
/// 写入的请求属性，例如认证阶段解析出的租户标识。
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestAttributeArgumentResolver;

impl ArgumentResolver for RequestAttributeArgumentResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        parameter.source() == ParameterSource::RequestAttribute
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        context: &ResolverContext<'_>,
    ) -> Result<Option<ArgumentValue>> {
        let raw = context.exchange().attribute(parameter.name());
        resolve_named_value(parameter, raw, context, || {
            BindingError::MissingRequestAttribute {
                name: parameter.name().to_owned(),
            }
        })
    }
}
