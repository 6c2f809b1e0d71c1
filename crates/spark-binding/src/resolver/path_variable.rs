//! 路径变量解析器。

use crate::error::{BindingError, Result};
use crate::method::{MethodParameter, ParameterSource};
use crate::value::ArgumentValue;

use super::{ArgumentResolver, ResolverContext, resolve_named_value};

/// 从路由匹配写入交换的 URI 模板变量读取参数。
#[derive(Clone, Copy, Debug, Default)]
pub struct PathVariableArgumentResolver;

impl ArgumentResolver for PathVariableArgumentResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        parameter.source() == ParameterSource::PathVariable
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        context: &ResolverContext<'_>,
    ) -> Result<Option<ArgumentValue>> {
        let raw = context.exchange().uri_variable(parameter.name());
        resolve_named_value(parameter, raw, context, || BindingError::MissingPathVariable {
            name: parameter.name().to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::DefaultConversionService;
    use crate::exchange::{ServerRequest, ServerWebExchange};
    use crate::value::ValueKind;

    #[test]
    fn reads_uri_variables() {
        let exchange = ServerWebExchange::new(ServerRequest::get("/orders/0x1F").build().unwrap())
            .with_uri_variable("id", "0x1F");
        let conversion = DefaultConversionService::new();
        let context = ResolverContext::new(&exchange, &conversion);

        let id = MethodParameter::path_variable("id", ValueKind::I64);
        assert_eq!(
            PathVariableArgumentResolver
                .resolve_argument(&id, &context)
                .unwrap(),
            Some(ArgumentValue::I64(31))
        );

        let missing = MethodParameter::path_variable("tenant", ValueKind::Text);
        assert!(matches!(
            PathVariableArgumentResolver.resolve_argument(&missing, &context),
            Err(BindingError::MissingPathVariable { name }) if name == "tenant"
        ));
    }
}
