//! 全局绑定策略：在任何 InitBinder 初始化器之前作用于每个新建绑定器。
//!
//! # 教案级说明
//! - **意图 (Why)**：转换服务、校验器、嵌套路径扩容等设置通常是应用级约定，不应在每个处理器里
//!   重复声明；
//! - **契约 (What)**：策略对象在构造后以 `Arc` 共享、只读使用，`init_binder` 不得依赖可变状态；
//! - **配置 (How)**：[`ConfigurableWebBindingInitializer`] 既可用代码装配，也可由
//!   [`BindingInitializerConfig`] 反序列化得到（开启 `config-toml` 特性时支持 TOML 文档）。

use std::sync::Arc;

use serde::Deserialize;

use crate::binder::{DEFAULT_AUTO_GROW_COLLECTION_LIMIT, Validator, WebDataBinder};
use crate::conversion::{ConversionService, DefaultConversionService};

/// 全局绑定策略契约。
pub trait WebBindingInitializer: Send + Sync {
    /// 初始化一个新建的绑定器。
    fn init_binder(&self, binder: &mut WebDataBinder);

    /// 策略提供的转换服务，同时用于转换初始化器的辅助参数。
    fn conversion_service(&self) -> Option<Arc<dyn ConversionService>> {
        None
    }
}

impl<F> WebBindingInitializer for F
where
    F: Fn(&mut WebDataBinder) + Send + Sync,
{
    fn init_binder(&self, binder: &mut WebDataBinder) {
        self(binder)
    }
}

/// 可配置的全局绑定策略。
///
/// # 教案式说明
/// - **契约 (What)**：
///   - 总是写入 `auto_grow_nested_paths` 与集合扩容上限；
///   - `direct_field_access` 为真时切换绑定器为直接字段访问；
///   - 校验器仅在绑定器持有目标且校验器支持该目标时安装；
///   - 转换服务以 `Arc` 共享，绑定器拿到的是同一实例。
#[derive(Clone, Debug)]
pub struct ConfigurableWebBindingInitializer {
    auto_grow_nested_paths: bool,
    auto_grow_collection_limit: usize,
    direct_field_access: bool,
    conversion_service: Option<Arc<dyn ConversionService>>,
    validator: Option<Arc<dyn Validator>>,
}

impl Default for ConfigurableWebBindingInitializer {
    fn default() -> Self {
        Self {
            auto_grow_nested_paths: true,
            auto_grow_collection_limit: DEFAULT_AUTO_GROW_COLLECTION_LIMIT,
            direct_field_access: false,
            conversion_service: None,
            validator: None,
        }
    }
}

impl ConfigurableWebBindingInitializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由声明式配置构造策略。
    pub fn from_config(config: &BindingInitializerConfig) -> Self {
        let mut initializer = Self {
            auto_grow_nested_paths: config.auto_grow_nested_paths,
            auto_grow_collection_limit: config.auto_grow_collection_limit,
            direct_field_access: config.direct_field_access,
            ..Self::default()
        };
        if config.default_conversion_service {
            initializer.set_conversion_service(Arc::new(DefaultConversionService::new()));
        }
        initializer
    }

    pub fn set_auto_grow_nested_paths(&mut self, enabled: bool) {
        self.auto_grow_nested_paths = enabled;
    }

    pub fn is_auto_grow_nested_paths(&self) -> bool {
        self.auto_grow_nested_paths
    }

    pub fn set_auto_grow_collection_limit(&mut self, limit: usize) {
        self.auto_grow_collection_limit = limit;
    }

    pub fn auto_grow_collection_limit(&self) -> usize {
        self.auto_grow_collection_limit
    }

    pub fn set_direct_field_access(&mut self, enabled: bool) {
        self.direct_field_access = enabled;
    }

    pub fn is_direct_field_access(&self) -> bool {
        self.direct_field_access
    }

    pub fn set_conversion_service(&mut self, service: Arc<dyn ConversionService>) {
        self.conversion_service = Some(service);
    }

    pub fn set_validator(&mut self, validator: Arc<dyn Validator>) {
        self.validator = Some(validator);
    }

    pub fn validator(&self) -> Option<&Arc<dyn Validator>> {
        self.validator.as_ref()
    }
}

impl WebBindingInitializer for ConfigurableWebBindingInitializer {
    fn init_binder(&self, binder: &mut WebDataBinder) {
        binder.set_auto_grow_nested_paths(self.auto_grow_nested_paths);
        binder.set_auto_grow_collection_limit(self.auto_grow_collection_limit);
        if self.direct_field_access {
            binder.init_direct_field_access();
        }
        if let Some(validator) = &self.validator {
            if binder
                .bind_target()
                .is_some_and(|target| validator.supports(target))
            {
                binder.set_validator(Arc::clone(validator));
            }
        }
        if let Some(service) = &self.conversion_service {
            binder.set_conversion_service(Arc::clone(service));
        }
    }

    fn conversion_service(&self) -> Option<Arc<dyn ConversionService>> {
        self.conversion_service.clone()
    }
}

/// 全局绑定策略的声明式配置。
///
/// 缺省字段取与 [`ConfigurableWebBindingInitializer::default`] 一致的值；未知字段会被拒绝，
/// 避免拼写错误被静默忽略。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BindingInitializerConfig {
    pub auto_grow_nested_paths: bool,
    pub auto_grow_collection_limit: usize,
    pub direct_field_access: bool,
    /// 为真时安装 [`DefaultConversionService`]。
    pub default_conversion_service: bool,
}

impl Default for BindingInitializerConfig {
    fn default() -> Self {
        Self {
            auto_grow_nested_paths: true,
            auto_grow_collection_limit: DEFAULT_AUTO_GROW_COLLECTION_LIMIT,
            direct_field_access: false,
            default_conversion_service: false,
        }
    }
}

#[cfg(feature = "config-toml")]
impl BindingInitializerConfig {
    /// 从 TOML 文档解析配置。
    pub fn from_toml_str(document: &str) -> crate::Result<Self> {
        toml::from_str(document).map_err(|err| crate::BindingError::Configuration {
            detail: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{BindTarget, BindingResult};
    use crate::value::{ArgumentValue, ValueKind};

    #[derive(Debug)]
    struct Account;

    impl BindTarget for Account {
        fn field_kind(&self, _field: &str) -> Option<ValueKind> {
            None
        }

        fn set_field(&mut self, _field: &str, _value: ArgumentValue) -> Result<(), String> {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct AcceptAll;

    impl Validator for AcceptAll {
        fn supports(&self, _target: &dyn BindTarget) -> bool {
            true
        }

        fn validate(&self, _target: &dyn BindTarget, _errors: &mut BindingResult) {}
    }

    #[test]
    fn applies_flags_and_shared_conversion_service() {
        let service: Arc<dyn ConversionService> = Arc::new(DefaultConversionService::new());
        let mut initializer = ConfigurableWebBindingInitializer::new();
        initializer.set_auto_grow_nested_paths(false);
        initializer.set_auto_grow_collection_limit(8);
        initializer.set_direct_field_access(true);
        initializer.set_conversion_service(Arc::clone(&service));

        let mut binder = WebDataBinder::new(None, "target");
        initializer.init_binder(&mut binder);

        assert!(!binder.is_auto_grow_nested_paths());
        assert_eq!(binder.auto_grow_collection_limit(), 8);
        assert!(binder.is_direct_field_access());
        let installed = binder.conversion_service().expect("应安装全局转换服务");
        assert!(Arc::ptr_eq(installed, &service), "绑定器应共享同一转换服务实例");
    }

    #[test]
    fn validator_requires_target() {
        let mut initializer = ConfigurableWebBindingInitializer::new();
        initializer.set_validator(Arc::new(AcceptAll));

        let mut without_target = WebDataBinder::new(None, "target");
        initializer.init_binder(&mut without_target);
        assert!(without_target.validators().is_empty(), "无目标时不安装校验器");

        let mut with_target = WebDataBinder::new(Some(Box::new(Account)), "account");
        initializer.init_binder(&mut with_target);
        assert_eq!(with_target.validators().len(), 1);
    }

    #[test]
    fn closures_act_as_initializers() {
        let initializer = |binder: &mut WebDataBinder| binder.set_required_fields(["name"]);
        let mut binder = WebDataBinder::new(None, "target");
        initializer.init_binder(&mut binder);
        assert_eq!(binder.required_fields(), Some(&["name".to_owned()][..]));
    }

    #[test]
    fn from_config_installs_default_conversion_service() {
        let config = BindingInitializerConfig {
            default_conversion_service: true,
            ..BindingInitializerConfig::default()
        };
        let initializer = ConfigurableWebBindingInitializer::from_config(&config);
        assert!(initializer.conversion_service().is_some());
        assert!(initializer.is_auto_grow_nested_paths());
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn parses_toml_documents() {
        let config = BindingInitializerConfig::from_toml_str(
            r#"
            auto_grow_collection_limit = 64
            direct_field_access = true
            "#,
        )
        .expect("合法 TOML 应解析成功");
        assert_eq!(config.auto_grow_collection_limit, 64);
        assert!(config.direct_field_access);
        assert!(config.auto_grow_nested_paths, "缺省字段保持默认值");

        let err = BindingInitializerConfig::from_toml_str("auto_grow = true").unwrap_err();
        assert!(matches!(err, crate::BindingError::Configuration { .. }));
    }
}
