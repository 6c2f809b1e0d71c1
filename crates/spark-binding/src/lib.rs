#![deny(unsafe_code)]
#![doc = r#"
# spark-binding

## 设计目标（Why）
- 为请求处理器提供“按请求新建、按目标名定制”的数据绑定器；
- 以显式注册的 InitBinder 初始化器取代注解扫描，把签名违规、参数无解析器等配置错误前移到启动期；
- 全局绑定策略（转换服务、校验器、集合扩容上限）与局部初始化器分层叠加，互不覆盖职责。

## 核心概念（What）
- [`BindingContext`]：绑定器工厂，`create_data_binder` 是唯一的请求期入口；
- [`InitBinderMethod`]：初始化器注册项，携带名称过滤、参数声明与回调；
- [`WebDataBinder`]：单次请求独占的绑定器，承载允许/禁止/必填字段、转换服务与校验器；
- [`WebBindingInitializer`]：全局策略契约，默认实现为 [`ConfigurableWebBindingInitializer`]；
- [`ArgumentResolver`]：把查询参数、路径变量、请求头、请求属性解析为初始化器的辅助参数。

## 使用方式（How）
```rust
use std::sync::Arc;

use spark_binding::{
    BindingContext, ConfigurableWebBindingInitializer, DefaultConversionService, InitBinderMethod,
    MethodParameter, ServerRequest, ServerWebExchange, ValueKind,
};

let mut policy = ConfigurableWebBindingInitializer::new();
policy.set_conversion_service(Arc::new(DefaultConversionService::new()));

let context = BindingContext::builder()
    .initializer(Arc::new(policy))
    .init_binder(InitBinderMethod::new("protect_id", |binder, _| {
        binder.set_disallowed_fields(["id"]);
    }))?
    .init_binder(
        InitBinderMethod::new("tag_by_param", |binder, args| {
            if let Ok(value) = args.get::<i32>("requestParam") {
                binder.set_disallowed_fields([format!("requestParam-{value}")]);
            }
        })
        .for_attributes(["foo"])
        .with_parameter(MethodParameter::request_param("requestParam", ValueKind::I32)),
    )?
    .build()?;

let exchange = ServerWebExchange::new(ServerRequest::get("/path?requestParam=22").build()?);
let binder = context.create_data_binder(&exchange, None, Some("foo"))?;
assert_eq!(binder.object_name(), "foo");
assert_eq!(binder.disallowed_fields(), Some(&["requestParam-22".to_owned()][..]));
# Ok::<(), spark_binding::BindingError>(())
```

## 模块划分
- `error`：错误枚举与结果别名；
- `value` / `conversion`：强类型参数值与字符串转换服务；
- `exchange`：请求与交换对象；
- `binder`：数据绑定器、绑定目标、绑定结果；
- `initializer`：全局绑定策略与声明式配置；
- `method`：初始化器注册模型；
- `resolver`：辅助参数解析器；
- `context`：绑定上下文与装配器。
"#]

pub mod binder;
pub mod context;
pub mod conversion;
pub mod error;
pub mod exchange;
pub mod initializer;
pub mod method;
pub mod resolver;
pub mod value;

pub use binder::{
    BindTarget, BindingResult, FieldError, FieldErrorCode, PropertyValue, PropertyValues,
    Validator, WebDataBinder,
};
pub use context::{BindingContext, BindingContextBuilder};
pub use conversion::{ConversionService, DefaultConversionService};
pub use error::{BindingError, ConversionError, Result};
pub use exchange::{HttpHeaders, HttpMethod, MultiValueMap, ServerRequest, ServerWebExchange};
pub use initializer::{
    BindingInitializerConfig, ConfigurableWebBindingInitializer, WebBindingInitializer,
};
pub use method::{
    HandlerReturn, InitBinderMethod, MethodParameter, ParameterSource, ResolvedArguments,
    ReturnType,
};
pub use resolver::{
    ArgumentResolver, ArgumentResolverComposite, PathVariableArgumentResolver,
    RequestAttributeArgumentResolver, RequestHeaderArgumentResolver, RequestParamArgumentResolver, ResolverContext,
};
pub use value::{ArgumentValue, FromArgument, ValueKind};
