//! 请求头解析器。

use crate::error::{BindingError, Result};
use crate::method::{MethodParameter, ParameterSource};
use crate::value::ArgumentValue;

use super::{ArgumentResolver, ResolverContext, resolve_named_value};

/// 按名称（大小写不敏感）读取请求头的第一个值。
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestHeaderArgumentResolver;

impl ArgumentResolver for RequestHeaderArgumentResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        parameter.source() == ParameterSource::RequestHeader
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        context: &ResolverContext<'_>,
    ) -> Result<Option<ArgumentValue>> {
        let raw = context
            .exchange()
            .request()
            .headers()
            .first(parameter.name());
        resolve_named_value(parameter, raw, context, || {
            BindingError::MissingRequestHeader {
                name: parameter.name().to_owned(),
            }
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
    fn header_names_are_case_insensitive() {
        let request = ServerRequest::get("/")
            .header("X-Debug", "on")
            .build()
            .unwrap();
        let exchange = ServerWebExchange::new(request);
        let conversion = DefaultConversionService::new();
        let context = ResolverContext::new(&exchange, &conversion);

        let debug = MethodParameter::request_header("x-debug", ValueKind::Bool);
        assert_eq!(
            RequestHeaderArgumentResolver
                .resolve_argument(&debug, &context)
                .unwrap(),
            Some(ArgumentValue::Bool(true))
        );

        let locale = MethodParameter::request_header("Accept-Language", ValueKind::Text)
            .with_default_value("en");
        assert_eq!(
            RequestHeaderArgumentResolver
                .resolve_argument(&locale, &context)
                .unwrap(),
            Some(ArgumentValue::Text("en".to_owned()))
        );

        let tenant = MethodParameter::request_header("X-Tenant", ValueKind::Text);
        assert!(matches!(
            RequestHeaderArgumentResolver.resolve_argument(&tenant, &context),
            Err(BindingError::MissingRequestHeader { .. })
        ));
    }
}
