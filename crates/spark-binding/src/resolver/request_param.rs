//! 查询参数解析器。

use crate::error::{BindingError, Result};
use crate::method::{MethodParameter, ParameterSource};
use crate::value::ArgumentValue;

use super::{ArgumentResolver, ResolverContext, resolve_named_value};

/// 从查询字符串读取参数；同名多值时取第一个。
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestParamArgumentResolver;

impl ArgumentResolver for RequestParamArgumentResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        parameter.source() == ParameterSource::RequestParam
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        context: &ResolverContext<'_>,
    ) -> Result<Option<ArgumentValue>> {
        let raw = context
            .exchange()
            .request()
            .query_params()
            .first(parameter.name());
        resolve_named_value(parameter, raw, context, || {
            BindingError::MissingRequestParameter {
                name: parameter.name().to_owned(),
                kind: parameter.kind(),
            }
        })
    }
}
