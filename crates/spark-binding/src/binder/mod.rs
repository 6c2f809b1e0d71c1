//! 数据绑定器：一次请求、一个目标名称范围内的可变绑定配置。
//!
//! # 教案级说明
//! - **意图 (Why)**：全局绑定策略与 InitBinder 初始化器都通过修改 [`WebDataBinder`] 表达配置，
//!   绑定器再依据这些配置把请求值写入目标对象；
//! - **契约 (What)**：
//!   - 绑定器由 [`BindingContext`](crate::BindingContext) 按请求新建，归调用方独占，不跨请求共享；
//!   - 允许/禁止/必填字段列表在写入时规范化（见 [`pattern::canonical_field_name`]），
//!     匹配支持 `*` 通配符；
//!   - 未设置的列表保持 `None`，与“设置为空列表”可区分；
//! - **结构 (How)**：`pattern` 负责字段名匹配，`target` 定义目标契约与绑定结果，本模块实现
//!   绑定流程本身。

pub mod pattern;
pub mod target;

use std::any::Any;
use std::sync::Arc;

use tracing::trace;

use crate::conversion::{ConversionService, DefaultConversionService};
use crate::error::{BindingError, Result};
use crate::exchange::ServerWebExchange;
use crate::value::{ArgumentValue, ValueKind};

pub use target::{
    BindTarget, BindingResult, FieldError, FieldErrorCode, PropertyValue, PropertyValues,
    Validator,
};

/// 未命名绑定目标的默认对象名。
pub const DEFAULT_OBJECT_NAME: &str = "target";
/// 自动扩容集合的默认上限。
pub const DEFAULT_AUTO_GROW_COLLECTION_LIMIT: usize = 256;
/// 字段标记前缀：`_field` 表示“表单中存在该字段”，用于复选框未勾选时回填空值。
pub const DEFAULT_FIELD_MARKER_PREFIX: &str = "_";
/// 字段默认值前缀：`!field=value` 在 `field` 缺失时提供默认值。
pub const DEFAULT_FIELD_DEFAULT_PREFIX: &str = "!";

/// 面向 Web 请求的数据绑定器。
#[derive(Debug)]
pub struct WebDataBinder {
    object_name: String,
    target: Option<Box<dyn BindTarget>>,
    allowed_fields: Option<Vec<String>>,
    disallowed_fields: Option<Vec<String>>,
    required_fields: Option<Vec<String>>,
    conversion_service: Option<Arc<dyn ConversionService>>,
    validators: Vec<Arc<dyn Validator>>,
    auto_grow_nested_paths: bool,
    auto_grow_collection_limit: usize,
    direct_field_access: bool,
    ignore_unknown_fields: bool,
    ignore_invalid_fields: bool,
    field_marker_prefix: Option<String>,
    field_default_prefix: Option<String>,
    binding_result: BindingResult,
}

impl WebDataBinder {
    /// 以可选目标与对象名构造绑定器，其余设置取默认值。
    pub fn new(target: Option<Box<dyn BindTarget>>, object_name: impl Into<String>) -> Self {
        let object_name = object_name.into();
        Self {
            binding_result: BindingResult::new(object_name.clone()),
            object_name,
            target,
            allowed_fields: None,
            disallowed_fields: None,
            required_fields: None,
            conversion_service: None,
            validators: Vec::new(),
            auto_grow_nested_paths: true,
            auto_grow_collection_limit: DEFAULT_AUTO_GROW_COLLECTION_LIMIT,
            direct_field_access: false,
            ignore_unknown_fields: true,
            ignore_invalid_fields: false,
            field_marker_prefix: Some(DEFAULT_FIELD_MARKER_PREFIX.to_owned()),
            field_default_prefix: Some(DEFAULT_FIELD_DEFAULT_PREFIX.to_owned()),
        }
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    /// 以 trait 对象形式借用目标。
    pub fn bind_target(&self) -> Option<&dyn BindTarget> {
        self.target.as_deref()
    }

    /// 以具体类型借用目标对象。
    pub fn target<T: BindTarget>(&self) -> Option<&T> {
        let target: &dyn Any = self.target.as_deref()?;
        target.downcast_ref::<T>()
    }

    /// 以具体类型可变借用目标对象。
    pub fn target_mut<T: BindTarget>(&mut self) -> Option<&mut T> {
        let target: &mut dyn Any = self.target.as_deref_mut()?;
        target.downcast_mut::<T>()
    }

    /// 取走目标对象，绑定器随后不再持有目标。
    pub fn take_target(&mut self) -> Option<Box<dyn BindTarget>> {
        self.target.take()
    }

    pub fn set_allowed_fields<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_fields = Some(canonical_names(fields));
    }

    pub fn allowed_fields(&self) -> Option<&[String]> {
        self.allowed_fields.as_deref()
    }

    pub fn set_disallowed_fields<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.disallowed_fields = Some(canonical_names(fields));
    }

    pub fn disallowed_fields(&self) -> Option<&[String]> {
        self.disallowed_fields.as_deref()
    }

    pub fn set_required_fields<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.required_fields = Some(canonical_names(fields));
    }

    pub fn required_fields(&self) -> Option<&[String]> {
        self.required_fields.as_deref()
    }

    pub fn set_conversion_service(&mut self, service: Arc<dyn ConversionService>) {
        self.conversion_service = Some(service);
    }

    pub fn conversion_service(&self) -> Option<&Arc<dyn ConversionService>> {
        self.conversion_service.as_ref()
    }

    /// 替换全部校验器。
    pub fn set_validator(&mut self, validator: Arc<dyn Validator>) {
        self.validators = vec![validator];
    }

    pub fn add_validator(&mut self, validator: Arc<dyn Validator>) {
        self.validators.push(validator);
    }

    pub fn validators(&self) -> &[Arc<dyn Validator>] {
        &self.validators
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

    /// 切换为直接字段访问模式。
    pub fn init_direct_field_access(&mut self) {
        self.direct_field_access = true;
    }

    pub fn is_direct_field_access(&self) -> bool {
        self.direct_field_access
    }

    pub fn set_ignore_unknown_fields(&mut self, ignore: bool) {
        self.ignore_unknown_fields = ignore;
    }

    pub fn is_ignore_unknown_fields(&self) -> bool {
        self.ignore_unknown_fields
    }

    pub fn set_ignore_invalid_fields(&mut self, ignore: bool) {
        self.ignore_invalid_fields = ignore;
    }

    pub fn is_ignore_invalid_fields(&self) -> bool {
        self.ignore_invalid_fields
    }

    pub fn set_field_marker_prefix(&mut self, prefix: Option<String>) {
        self.field_marker_prefix = prefix;
    }

    pub fn field_marker_prefix(&self) -> Option<&str> {
        self.field_marker_prefix.as_deref()
    }

    pub fn set_field_default_prefix(&mut self, prefix: Option<String>) {
        self.field_default_prefix = prefix;
    }

    pub fn field_default_prefix(&self) -> Option<&str> {
        self.field_default_prefix.as_deref()
    }

    pub fn binding_result(&self) -> &BindingResult {
        &self.binding_result
    }

    /// 字段是否允许绑定。
    ///
    /// - **契约 (What)**：未配置允许列表时全部允许；配置后只放行命中的字段；
    ///   禁止列表在允许列表之后生效，命中即拒绝。
    pub fn is_allowed(&self, field: &str) -> bool {
        let allowed = self
            .allowed_fields
            .as_deref()
            .is_none_or(|patterns| patterns.is_empty() || pattern::simple_match_any(patterns, field));
        let disallowed = self
            .disallowed_fields
            .as_deref()
            .is_some_and(|patterns| pattern::simple_match_any(patterns, field));
        allowed && !disallowed
    }

    /// 收集交换中的可绑定值并绑定到目标。
    ///
    /// # 教案式说明
    /// - **来源顺序 (How)**：查询参数 → 表单字段 → URI 模板变量；同名时先出现者胜出，
    ///   因此 URI 变量永远不会覆盖显式提交的请求值；
    /// - **契约 (What)**：与 [`Self::bind`] 相同。
    pub fn bind_exchange(&mut self, exchange: &ServerWebExchange) -> Result<&BindingResult> {
        let request = exchange.request();
        let mut values = PropertyValues::new();
        for (name, raw) in request.query_params().iter() {
            values.add_if_absent(name, raw.to_vec());
        }
        for (name, raw) in request.form_data().iter() {
            values.add_if_absent(name, raw.to_vec());
        }
        for (name, raw) in exchange.uri_variables() {
            values.add_if_absent(name.as_str(), vec![raw.clone()]);
        }
        self.bind(values)
    }

    /// 将属性值绑定到目标对象。
    ///
    /// # 教案式说明
    /// - **流程 (How)**：
    ///   1. 展开 `!field` 默认值与 `_field` 标记；
    ///   2. 过滤允许/禁止列表外的字段并记录为 suppressed；
    ///   3. 检查必填字段；
    ///   4. 逐字段转换并写入目标，失败记入 [`BindingResult`]；
    /// - **契约 (What)**：没有目标时返回 [`BindingError::NoBindTarget`]；字段级问题不会中断绑定，
    ///   而是累积在返回的绑定结果中。
    pub fn bind(&mut self, mut values: PropertyValues) -> Result<&BindingResult> {
        if self.target.is_none() {
            return Err(BindingError::NoBindTarget {
                object_name: self.object_name.clone(),
            });
        }

        self.check_field_defaults(&mut values);
        self.check_field_markers(&mut values);
        self.check_allowed_fields(&mut values);
        let missing = self.check_required_fields(&values);
        self.apply_property_values(&values, &missing);
        Ok(&self.binding_result)
    }

    /// 以所有支持目标的校验器校验目标。
    pub fn validate(&mut self) -> Result<&BindingResult> {
        let Some(target) = self.target.as_deref() else {
            return Err(BindingError::NoBindTarget {
                object_name: self.object_name.clone(),
            });
        };
        for validator in &self.validators {
            if validator.supports(target) {
                validator.validate(target, &mut self.binding_result);
            }
        }
        Ok(&self.binding_result)
    }

    fn check_field_defaults(&self, values: &mut PropertyValues) {
        let Some(prefix) = self.field_default_prefix.as_deref() else {
            return;
        };
        for name in values.names() {
            let Some(field) = name.strip_prefix(prefix) else {
                continue;
            };
            if let Some(default) = values.remove(&name) {
                if self.is_writable(field) && !values.contains(field) {
                    values.add_if_absent(field, default.values().to_vec());
                }
            }
        }
    }

    fn check_field_markers(&self, values: &mut PropertyValues) {
        let Some(prefix) = self.field_marker_prefix.as_deref() else {
            return;
        };
        for name in values.names() {
            let Some(field) = name.strip_prefix(prefix) else {
                continue;
            };
            values.remove(&name);
            if values.contains(field) {
                continue;
            }
            // 仅布尔字段存在有意义的“空值”，其余类型保持未绑定。
            if self.field_kind(field) == Some(ValueKind::Bool) {
                values.add_if_absent(field, vec!["false".to_owned()]);
            }
        }
    }

    fn check_allowed_fields(&mut self, values: &mut PropertyValues) {
        for name in values.names() {
            let canonical = pattern::canonical_field_name(&name);
            if !self.is_allowed(&canonical) {
                values.remove(&name);
                trace!(
                    object_name = %self.object_name,
                    field = %canonical,
                    "field suppressed by allowed/disallowed lists"
                );
                self.binding_result.record_suppressed(canonical);
            }
        }
    }

    /// 返回本次绑定中因必填缺失而被拒绝的字段（规范名）。
    fn check_required_fields(&mut self, values: &PropertyValues) -> Vec<String> {
        let Some(required) = self.required_fields.clone() else {
            return Vec::new();
        };
        let mut missing = Vec::new();
        for field in required {
            let present = values
                .iter()
                .filter(|property| pattern::canonical_field_name(property.name()) == field)
                .filter_map(PropertyValue::first)
                .any(|raw| !raw.trim().is_empty());
            if !present {
                let message = format!("field `{field}` is required");
                self.binding_result.reject_value(
                    field.clone(),
                    FieldErrorCode::Required,
                    None,
                    message,
                );
                missing.push(field);
            }
        }
        missing
    }

    fn apply_property_values(&mut self, values: &PropertyValues, missing: &[String]) {
        let conversion: Arc<dyn ConversionService> = self
            .conversion_service
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultConversionService::new()));

        for property in values.iter() {
            // 本次必填检查已经报告过的字段不再写入。
            if missing.contains(&pattern::canonical_field_name(property.name())) {
                continue;
            }
            let Some(kind) = self.field_kind(property.name()) else {
                if !self.ignore_unknown_fields {
                    self.binding_result.reject_value(
                        property.name(),
                        FieldErrorCode::NotWritable,
                        property.first().map(str::to_owned),
                        format!("field `{}` is not writable", property.name()),
                    );
                }
                continue;
            };
            let raw = property.first().unwrap_or_default();
            let converted = match conversion.convert(raw, kind) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(err) => {
                    if !self.ignore_invalid_fields {
                        self.binding_result.reject_value(
                            property.name(),
                            FieldErrorCode::TypeMismatch,
                            Some(raw.to_owned()),
                            err.to_string(),
                        );
                    }
                    continue;
                }
            };
            self.write_field(property.name(), raw, converted);
        }
    }

    fn write_field(&mut self, field: &str, raw: &str, value: ArgumentValue) {
        let Some(target) = self.target.as_deref_mut() else {
            return;
        };
        if let Err(message) = target.set_field(field, value) {
            self.binding_result.reject_value(
                field,
                FieldErrorCode::Rejected,
                Some(raw.to_owned()),
                message,
            );
        }
    }

    fn field_kind(&self, field: &str) -> Option<ValueKind> {
        self.target.as_deref().and_then(|target| target.field_kind(field))
    }

    fn is_writable(&self, field: &str) -> bool {
        self.field_kind(field).is_some()
    }
}

fn canonical_names<I, S>(fields: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|field| pattern::canonical_field_name(field.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Order {
        id: Option<i64>,
        name: Option<String>,
        qty: Option<i32>,
        gift: Option<bool>,
    }

    impl BindTarget for Order {
        fn field_kind(&self, field: &str) -> Option<ValueKind> {
            match field {
                "id" => Some(ValueKind::I64),
                "name" => Some(ValueKind::Text),
                "qty" => Some(ValueKind::I32),
                "gift" => Some(ValueKind::Bool),
                _ => None,
            }
        }

        fn set_field(&mut self, field: &str, value: ArgumentValue) -> std::result::Result<(), String> {
            match (field, value) {
                ("id", ArgumentValue::I64(id)) => self.id = Some(id),
                ("name", ArgumentValue::Text(name)) => self.name = Some(name),
                ("qty", ArgumentValue::I32(qty)) if qty < 0 => {
                    return Err("quantity must not be negative".to_owned());
                }
                ("qty", ArgumentValue::I32(qty)) => self.qty = Some(qty),
                ("gift", ArgumentValue::Bool(gift)) => self.gift = Some(gift),
                (field, value) => return Err(format!("unexpected {field}={value}")),
            }
            Ok(())
        }
    }

    fn order_binder() -> WebDataBinder {
        WebDataBinder::new(Some(Box::new(Order::default())), "order")
    }

    #[test]
    fn fresh_binder_has_no_field_lists() {
        let binder = WebDataBinder::new(None, DEFAULT_OBJECT_NAME);
        assert_eq!(binder.object_name(), "target");
        assert!(binder.disallowed_fields().is_none());
        assert!(binder.allowed_fields().is_none());
        assert!(binder.conversion_service().is_none());
        assert!(binder.is_auto_grow_nested_paths());
        assert_eq!(binder.auto_grow_collection_limit(), 256);
    }

    #[test]
    fn disallowed_fields_are_canonicalized_and_matched() {
        let mut binder = WebDataBinder::new(None, "order");
        binder.set_disallowed_fields([" id ", "meta['secret']", "*Token"]);
        assert_eq!(
            binder.disallowed_fields(),
            Some(&["id".to_owned(), "meta[secret]".to_owned(), "*Token".to_owned()][..])
        );
        assert!(!binder.is_allowed("id"));
        assert!(!binder.is_allowed("meta[secret]"));
        assert!(!binder.is_allowed("csrfToken"));
        assert!(binder.is_allowed("name"));
    }

    #[test]
    fn allowed_list_restricts_before_disallowed_list() {
        let mut binder = WebDataBinder::new(None, "order");
        binder.set_allowed_fields(["name", "q*"]);
        binder.set_disallowed_fields(["qty"]);
        assert!(binder.is_allowed("name"));
        assert!(binder.is_allowed("quote"));
        assert!(!binder.is_allowed("qty"), "禁止列表优先于允许列表");
        assert!(!binder.is_allowed("id"));
    }

    #[test]
    fn bind_converts_and_suppresses_disallowed_fields() {
        let mut binder = order_binder();
        binder.set_disallowed_fields(["id"]);

        let values = PropertyValues::new()
            .with("id", "99")
            .with("name", "widget")
            .with("qty", "3");
        let result = binder.bind(values).expect("存在目标时绑定应成功");
        assert!(!result.has_errors());
        assert_eq!(result.suppressed_fields(), &["id".to_owned()][..]);

        let order = binder.target::<Order>().expect("目标类型应可还原");
        assert_eq!(order.id, None);
        assert_eq!(order.name.as_deref(), Some("widget"));
        assert_eq!(order.qty, Some(3));
    }

    #[test]
    fn bind_collects_field_errors() {
        let mut binder = order_binder();
        binder.set_required_fields(["name"]);
        binder.set_ignore_unknown_fields(false);

        let values = PropertyValues::new()
            .with("qty", "many")
            .with("unknown", "x")
            .with("id", "-5")
            .with("name", "  ");
        let result = binder.bind(values).unwrap();

        assert_eq!(
            result.field_error("name").map(|error| &error.code),
            Some(&FieldErrorCode::Required)
        );
        assert_eq!(
            result.field_error("qty").map(|error| &error.code),
            Some(&FieldErrorCode::TypeMismatch)
        );
        assert_eq!(
            result.field_error("unknown").map(|error| &error.code),
            Some(&FieldErrorCode::NotWritable)
        );
        assert_eq!(result.error_count(), 3);
        assert_eq!(binder.target::<Order>().and_then(|order| order.id), Some(-5));
    }

    #[test]
    fn quoted_keys_satisfy_canonical_required_fields() {
        let mut binder = order_binder();
        binder.set_required_fields(["meta['tag']"]);
        let result = binder
            .bind(PropertyValues::new().with("meta[\"tag\"]", "x"))
            .unwrap();
        assert!(result.field_error("meta[tag]").is_none(), "引号写法应满足规范化后的必填字段");
    }

    #[test]
    fn earlier_errors_do_not_block_later_binds() {
        let mut binder = order_binder();
        let first = binder.bind(PropertyValues::new().with("qty", "many")).unwrap();
        assert!(first.field_error("qty").is_some());

        binder.bind(PropertyValues::new().with("qty", "4")).unwrap();
        assert_eq!(binder.target::<Order>().and_then(|order| order.qty), Some(4));
    }

    #[test]
    fn validation_errors_do_not_block_later_binds() {
        let mut binder = order_binder();
        binder.set_validator(Arc::new(NameRequired));
        assert!(binder.validate().unwrap().field_error("name").is_some());

        binder.bind(PropertyValues::new().with("name", "widget")).unwrap();
        assert_eq!(
            binder.target::<Order>().and_then(|order| order.name.as_deref()),
            Some("widget")
        );
    }

    #[test]
    fn rejected_writes_are_reported() {
        let mut binder = order_binder();
        let result = binder.bind(PropertyValues::new().with("qty", "-1")).unwrap();
        let error = result.field_error("qty").expect("目标拒绝写入应记录错误");
        assert_eq!(error.code, FieldErrorCode::Rejected);
        assert_eq!(error.rejected_value.as_deref(), Some("-1"));
    }

    #[test]
    fn ignore_invalid_fields_drops_conversion_errors() {
        let mut binder = order_binder();
        binder.set_ignore_invalid_fields(true);
        let result = binder.bind(PropertyValues::new().with("qty", "many")).unwrap();
        assert!(!result.has_errors());
    }

    #[test]
    fn field_defaults_and_markers() {
        let mut binder = order_binder();
        let values = PropertyValues::new()
            .with("!name", "fallback")
            .with("_gift", "on")
            .with("!qty", "1")
            .with("qty", "4");
        binder.bind(values).unwrap();

        let order = binder.target::<Order>().unwrap();
        assert_eq!(order.name.as_deref(), Some("fallback"));
        assert_eq!(order.gift, Some(false), "标记存在而字段缺失时布尔字段回填 false");
        assert_eq!(order.qty, Some(4), "显式值优先于默认值");
    }

    #[test]
    fn bind_without_target_fails() {
        let mut binder = WebDataBinder::new(None, "ghost");
        let err = binder.bind(PropertyValues::new()).unwrap_err();
        assert!(matches!(err, BindingError::NoBindTarget { object_name } if object_name == "ghost"));
    }

    #[test]
    fn bind_exchange_prefers_request_values_over_uri_variables() {
        use crate::exchange::ServerRequest;

        let request = ServerRequest::post("/orders/7?name=query")
            .form_body("name=form&qty=2")
            .build()
            .unwrap();
        let exchange = ServerWebExchange::new(request)
            .with_uri_variable("id", "7")
            .with_uri_variable("name", "uri");

        let mut binder = order_binder();
        binder.bind_exchange(&exchange).unwrap();
        let order = binder.target::<Order>().unwrap();
        assert_eq!(order.name.as_deref(), Some("query"));
        assert_eq!(order.qty, Some(2));
        assert_eq!(order.id, Some(7));
    }

    #[derive(Debug)]
    struct NameRequired;

    impl Validator for NameRequired {
        fn supports(&self, target: &dyn BindTarget) -> bool {
            (target as &dyn Any).is::<Order>()
        }

        fn validate(&self, target: &dyn BindTarget, errors: &mut BindingResult) {
            let order = (target as &dyn Any).downcast_ref::<Order>();
            if order.is_some_and(|order| order.name.is_none()) {
                errors.reject_value(
                    "name",
                    FieldErrorCode::Validation("NotNull".to_owned()),
                    None,
                    "name must be set",
                );
            }
        }
    }

    #[test]
    fn validate_runs_supporting_validators() {
        let mut binder = order_binder();
        binder.set_validator(Arc::new(NameRequired));
        let result = binder.validate().unwrap();
        assert_eq!(
            result.field_error("name").map(|error| error.code.as_str()),
            Some("NotNull")
        );
    }

    #[test]
    fn take_target_returns_ownership() {
        let mut binder = order_binder();
        binder.bind(PropertyValues::new().with("qty", "5")).unwrap();
        let target = binder.take_target().expect("应取回目标");
        let order = (target as Box<dyn Any>).downcast::<Order>().unwrap();
        assert_eq!(order.qty, Some(5));
        assert!(!binder.has_target());
    }
}
