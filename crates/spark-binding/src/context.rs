//! 绑定上下文：按请求创建数据绑定器，并依次应用匹配的 InitBinder 初始化器。
//!
//! # 教案级说明
//! - **意图 (Why)**：处理器需要在绑定请求数据前定制绑定器（禁止字段、转换服务、校验器等），
//!   这些定制既有应用级的全局策略，也有只针对某个目标名的局部初始化器；
//! - **契约 (What)**：
//!   - [`BindingContext::create_data_binder`] 先应用全局策略，再按注册顺序调用每个名称匹配的初始化器；
//!   - 初始化器不得返回值：注册期拒绝声明了返回类型的初始化器，调用期发现返回值则整次创建失败；
//!   - 参数解析失败与初始化器返回的错误原样向上传播，失败时不会返回半配置的绑定器；
//!   - 构建完成后上下文只读，可在线程间共享；
//! - **设计 (How)**：以 [`BindingContextBuilder`] 显式注册初始化器与解析器，`build` 时一次性校验
//!   每个声明参数都有解析器负责，把配置错误前移到启动阶段。

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::binder::{BindTarget, DEFAULT_OBJECT_NAME, WebDataBinder};
use crate::conversion::{ConversionService, DefaultConversionService};
use crate::error::{BindingError, Result};
use crate::exchange::ServerWebExchange;
use crate::initializer::WebBindingInitializer;
use crate::method::{HandlerReturn, InitBinderMethod};
use crate::resolver::{ArgumentResolver, ArgumentResolverComposite, ResolverContext};

/// 请求级数据绑定器的工厂。
pub struct BindingContext {
    initializer: Option<Arc<dyn WebBindingInitializer>>,
    argument_conversion: Arc<dyn ConversionService>,
    resolvers: ArgumentResolverComposite,
    binder_methods: Vec<InitBinderMethod>,
}

impl BindingContext {
    /// 仅带全局策略、不含任何初始化器的上下文。
    pub fn new(initializer: Option<Arc<dyn WebBindingInitializer>>) -> Self {
        let argument_conversion = argument_conversion(initializer.as_deref());
        Self {
            initializer,
            argument_conversion,
            resolvers: ArgumentResolverComposite::with_defaults(),
            binder_methods: Vec::new(),
        }
    }

    pub fn builder() -> BindingContextBuilder {
        BindingContextBuilder::default()
    }

    /// 为一次请求创建数据绑定器。
    ///
    /// # 教案式说明
    /// - **输入 (Inputs)**：
    ///   - `exchange`：当前请求，初始化器的辅助参数从中解析；
    ///   - `target`：可选的绑定目标；
    ///   - `attribute_name`：目标名，`None` 或空串表示未命名，此时对象名为 `"target"`；
    /// - **流程 (How)**：新建绑定器 → 全局策略 → 依注册顺序筛选 [`InitBinderMethod::is_applicable`]
    ///   为真的初始化器 → 逐个解析参数并调用；
    /// - **失败 (Errors)**：
    ///   - 参数解析错误（如 [`BindingError::MissingRequestParameter`]）原样返回；
    ///   - 初始化器产出返回值时返回 [`BindingError::UnexpectedReturnValue`]；
    ///   - 没有任何初始化器匹配不是错误，返回仅应用了全局策略的绑定器。
    pub fn create_data_binder(
        &self,
        exchange: &ServerWebExchange,
        target: Option<Box<dyn BindTarget>>,
        attribute_name: Option<&str>,
    ) -> Result<WebDataBinder> {
        let attribute_name = attribute_name.filter(|name| !name.is_empty());
        let mut binder =
            WebDataBinder::new(target, attribute_name.unwrap_or(DEFAULT_OBJECT_NAME));
        if let Some(initializer) = &self.initializer {
            initializer.init_binder(&mut binder);
        }

        let context = ResolverContext::new(exchange, self.argument_conversion.as_ref());
        let mut applied = 0_usize;
        for method in self
            .binder_methods
            .iter()
            .filter(|method| method.is_applicable(attribute_name))
        {
            let arguments = self.resolvers.resolve_arguments(method, &context)?;
            match method.invoke(&mut binder, &arguments)? {
                HandlerReturn::Unit => {
                    applied += 1;
                    trace!(
                        object_name = binder.object_name(),
                        method = method.name(),
                        "applied init-binder method"
                    );
                }
                HandlerReturn::Value(value) => {
                    warn!(
                        object_name = binder.object_name(),
                        method = method.name(),
                        %value,
                        "init-binder method returned a value"
                    );
                    return Err(BindingError::UnexpectedReturnValue {
                        method: method.name().to_owned().into(),
                        value,
                    });
                }
            }
        }

        debug!(
            object_name = binder.object_name(),
            path = exchange.request().path(),
            applied,
            "created data binder"
        );
        Ok(binder)
    }

    pub fn initializer(&self) -> Option<&Arc<dyn WebBindingInitializer>> {
        self.initializer.as_ref()
    }

    /// 按注册顺序排列的初始化器。
    pub fn binder_methods(&self) -> &[InitBinderMethod] {
        &self.binder_methods
    }

    pub fn argument_resolvers(&self) -> &ArgumentResolverComposite {
        &self.resolvers
    }
}

impl Default for BindingContext {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for BindingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingContext")
            .field("has_initializer", &self.initializer.is_some())
            .field("argument_conversion", &self.argument_conversion)
            .field("resolvers", &self.resolvers)
            .field("binder_methods", &self.binder_methods)
            .finish()
    }
}

/// 辅助参数沿用全局策略的转换服务；策略未提供时使用默认转换服务。
fn argument_conversion(
    initializer: Option<&dyn WebBindingInitializer>,
) -> Arc<dyn ConversionService> {
    initializer
        .and_then(|initializer| initializer.conversion_service())
        .unwrap_or_else(|| Arc::new(DefaultConversionService::new()))
}

/// [`BindingContext`] 的装配器。
///
/// - **契约 (What)**：解析器以内建的三个解析器打底，自定义解析器追加在其后；
///   初始化器按 [`Self::init_binder`] 的调用顺序执行。
pub struct BindingContextBuilder {
    initializer: Option<Arc<dyn WebBindingInitializer>>,
    resolvers: ArgumentResolverComposite,
    binder_methods: Vec<InitBinderMethod>,
}

impl Default for BindingContextBuilder {
    fn default() -> Self {
        Self {
            initializer: None,
            resolvers: ArgumentResolverComposite::with_defaults(),
            binder_methods: Vec::new(),
        }
    }
}

impl BindingContextBuilder {
    pub fn initializer(mut self, initializer: Arc<dyn WebBindingInitializer>) -> Self {
        self.initializer = Some(initializer);
        self
    }

    /// 追加一个自定义解析器。
    pub fn argument_resolver(mut self, resolver: Arc<dyn ArgumentResolver>) -> Self {
        self.resolvers.add(resolver);
        self
    }

    /// 整体替换解析器组合，包括内建解析器。
    pub fn argument_resolvers(mut self, resolvers: ArgumentResolverComposite) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// 注册一个初始化器。
    ///
    /// 声明了非 unit 返回类型的初始化器在此被拒绝，返回
    /// [`BindingError::InvalidInitializerSignature`]。
    pub fn init_binder(mut self, method: InitBinderMethod) -> Result<Self> {
        if !method.return_type().is_unit() {
            warn!(
                method = method.name(),
                return_type = %method.return_type(),
                "rejected init-binder method declaring a return value"
            );
            return Err(BindingError::InvalidInitializerSignature {
                method: method.name().to_owned().into(),
                return_type: method.return_type().to_string().into(),
            });
        }
        self.binder_methods.push(method);
        Ok(self)
    }

    /// 完成装配。
    ///
    /// 任一初始化器声明的参数没有解析器负责时返回 [`BindingError::UnresolvableParameter`]。
    pub fn build(self) -> Result<BindingContext> {
        for method in &self.binder_methods {
            if let Some(parameter) = method
                .parameters()
                .iter()
                .find(|parameter| !self.resolvers.supports_parameter(parameter))
            {
                return Err(BindingError::UnresolvableParameter {
                    method: method.name().to_owned().into(),
                    parameter: parameter.to_string(),
                });
            }
        }

        debug!(
            binder_methods = self.binder_methods.len(),
            resolvers = self.resolvers.len(),
            has_initializer = self.initializer.is_some(),
            "built binding context"
        );
        Ok(BindingContext {
            argument_conversion: argument_conversion(self.initializer.as_deref()),
            initializer: self.initializer,
            resolvers: self.resolvers,
            binder_methods: self.binder_methods,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ServerRequest;
    use crate::method::{MethodParameter, ReturnType};
    use crate::value::{ArgumentValue, ValueKind};

    fn exchange() -> ServerWebExchange {
        ServerWebExchange::new(ServerRequest::get("/path").build().unwrap())
    }

    #[test]
    fn context_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BindingContext>();
    }

    #[test]
    fn unnamed_binder_uses_default_object_name() {
        let context = BindingContext::default();
        let binder = context.create_data_binder(&exchange(), None, Some("")).unwrap();
        assert_eq!(binder.object_name(), "target");
        assert!(binder.disallowed_fields().is_none());
    }

    #[test]
    fn declared_return_type_is_rejected_at_registration() {
        let method = InitBinderMethod::dynamic(
            "init_binder_return_value",
            ReturnType::Value("String".into()),
            |_, _| Ok(HandlerReturn::Unit),
        );
        let err = BindingContext::builder().init_binder(method).err();
        assert!(matches!(
            err,
            Some(BindingError::InvalidInitializerSignature { ref return_type, .. })
                if return_type == "String"
        ));
    }

    #[test]
    fn unresolvable_parameters_fail_build() {
        let method = InitBinderMethod::new("init", |_, _| {})
            .with_parameter(MethodParameter::request_param("requestParam", ValueKind::I32));
        let err = BindingContext::builder()
            .argument_resolvers(ArgumentResolverComposite::new())
            .init_binder(method)
            .unwrap()
            .build()
            .unwrap_err();
        assert!(err.is_configuration_error());
        assert!(matches!(err, BindingError::UnresolvableParameter { .. }));
    }

    #[test]
    fn fallible_initializer_errors_propagate() {
        let context = BindingContext::builder()
            .init_binder(InitBinderMethod::fallible("init", |binder, _| {
                Err(BindingError::NoBindTarget {
                    object_name: binder.object_name().to_owned(),
                })
            }))
            .unwrap()
            .build()
            .unwrap();
        let err = context.create_data_binder(&exchange(), None, None).unwrap_err();
        assert!(matches!(err, BindingError::NoBindTarget { .. }));
    }

    #[tracing_test::traced_test]
    #[test]
    fn contract_breach_is_logged() {
        let context = BindingContext::builder()
            .init_binder(InitBinderMethod::dynamic(
                "sneaky",
                ReturnType::Unit,
                |_, _| Ok(HandlerReturn::Value(ArgumentValue::from("invalid"))),
            ))
            .unwrap()
            .build()
            .unwrap();

        let err = context.create_data_binder(&exchange(), None, None).unwrap_err();
        assert!(matches!(err, BindingError::UnexpectedReturnValue { .. }));
        assert!(logs_contain("init-binder method returned a value"));
    }

    #[tracing_test::traced_test]
    #[test]
    fn creation_summary_is_logged() {
        let context = BindingContext::builder()
            .init_binder(InitBinderMethod::new("init", |binder, _| {
                binder.set_disallowed_fields(["id"]);
            }))
            .unwrap()
            .build()
            .unwrap();
        context.create_data_binder(&exchange(), None, None).unwrap();
        assert!(logs_contain("applied init-binder method"));
        assert!(logs_contain("created data binder"));
    }
}
