//! InitBinder 初始化器的注册模型：名称过滤、参数声明、返回类型与回调。
//!
//! # 教案级说明
//! - **意图 (Why)**：以显式注册取代注解扫描：每个初始化器在装配期声明它作用于哪些目标名、
//!   需要哪些辅助参数、返回什么；
//! - **契约 (What)**：
//!   - 名称过滤为空时作用于所有请求（包括未命名目标）；非空时仅在目标名与其中之一完全相等时生效；
//!   - 通过 [`InitBinderMethod::new`] 注册的回调在类型上就无法返回值；
//!   - 通过 [`InitBinderMethod::dynamic`] 注册的回调需自报返回类型，供桥接脚本/插件等动态来源，
//!     上下文会在注册期与调用期分别校验；
//! - **设计 (How)**：回调以 `Arc<dyn Fn>` 保存，使注册表可克隆且跨线程共享。

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::binder::WebDataBinder;
use crate::error::{BindingError, Result};
use crate::value::{ArgumentValue, FromArgument, ValueKind};

/// 辅助参数的取值来源。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParameterSource {
    /// 查询参数。
    RequestParam,
    /// 路由匹配出的 URI 模板变量。
    PathVariable,
    /// 请求头。
    RequestHeader,
    /// 上游过滤器写入交换的请求属性。
    RequestAttribute,
}

impl fmt::Display for ParameterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParameterSource::RequestParam => "request parameter",
            ParameterSource::PathVariable => "path variable",
            ParameterSource::RequestHeader => "request header",
            ParameterSource::RequestAttribute => "request attribute",
        })
    }
}

/// 初始化器声明的一个辅助参数。
///
/// - **契约 (What)**：`index` 从 1 开始，0 号位置固定留给绑定器本身，在注册时按声明顺序分配；
///   提供默认值的参数自动视为非必填。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodParameter {
    index: usize,
    name: String,
    source: ParameterSource,
    kind: ValueKind,
    required: bool,
    default_value: Option<String>,
}

impl MethodParameter {
    pub fn new(source: ParameterSource, name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            index: 0,
            name: name.into(),
            source,
            kind,
            required: true,
            default_value: None,
        }
    }

    pub fn request_param(name: impl Into<String>, kind: ValueKind) -> Self {
        Self::new(ParameterSource::RequestParam, name, kind)
    }

    pub fn path_variable(name: impl Into<String>, kind: ValueKind) -> Self {
        Self::new(ParameterSource::PathVariable, name, kind)
    }

    pub fn request_header(name: impl Into<String>, kind: ValueKind) -> Self {
        Self::new(ParameterSource::RequestHeader, name, kind)
    }

    pub fn request_attribute(name: impl Into<String>, kind: ValueKind) -> Self {
        Self::new(ParameterSource::RequestAttribute, name, kind)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self.required = false;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> ParameterSource {
        self.source
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }
}

impl fmt::Display for MethodParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} `{}`: {}",
            self.index, self.source, self.name, self.kind
        )
    }
}

/// 初始化器声明的返回类型。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReturnType {
    Unit,
    /// 非 unit 返回，携带类型名用于诊断。
    Value(Cow<'static, str>),
}

impl ReturnType {
    pub fn is_unit(&self) -> bool {
        matches!(self, ReturnType::Unit)
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Unit => f.write_str("()"),
            ReturnType::Value(name) => f.write_str(name),
        }
    }
}

/// 初始化器一次调用的实际产出。
#[derive(Clone, Debug, PartialEq)]
pub enum HandlerReturn {
    Unit,
    Value(ArgumentValue),
}

/// 按声明顺序排列的已解析辅助参数。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedArguments {
    values: Vec<(String, Option<ArgumentValue>)>,
}

impl ResolvedArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: Option<ArgumentValue>) {
        self.values.push((name.into(), value));
    }

    /// 读取必有值的参数。
    pub fn get<T: FromArgument>(&self, name: &str) -> Result<T> {
        self.get_opt(name)?
            .ok_or_else(|| BindingError::MissingArgument {
                name: name.to_owned(),
            })
    }

    /// 读取可能无值的参数；参数未声明时同样报告缺失。
    pub fn get_opt<T: FromArgument>(&self, name: &str) -> Result<Option<T>> {
        let (_, value) = self
            .values
            .iter()
            .find(|(candidate, _)| candidate == name)
            .ok_or_else(|| BindingError::MissingArgument {
                name: name.to_owned(),
            })?;
        let Some(value) = value else {
            return Ok(None);
        };
        T::from_argument(value)
            .map(Some)
            .ok_or_else(|| BindingError::ArgumentTypeMismatch {
                name: name.to_owned(),
                expected: T::KIND,
                actual: value.kind(),
            })
    }

    pub fn raw(&self, name: &str) -> Option<&ArgumentValue> {
        self.values
            .iter()
            .find(|(candidate, _)| candidate == name)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

type BinderCallback =
    dyn Fn(&mut WebDataBinder, &ResolvedArguments) -> Result<HandlerReturn> + Send + Sync;

/// 注册到绑定上下文的 InitBinder 初始化器。
#[derive(Clone)]
pub struct InitBinderMethod {
    name: Cow<'static, str>,
    attribute_names: Vec<String>,
    parameters: Vec<MethodParameter>,
    return_type: ReturnType,
    callback: Arc<BinderCallback>,
}

impl InitBinderMethod {
    /// 注册一个无返回值的初始化器。
    ///
    /// 回调签名本身保证不会产出返回值，是首选的注册方式。
    pub fn new<F>(name: impl Into<Cow<'static, str>>, callback: F) -> Self
    where
        F: Fn(&mut WebDataBinder, &ResolvedArguments) + Send + Sync + 'static,
    {
        Self::from_callback(
            name.into(),
            ReturnType::Unit,
            Arc::new(move |binder: &mut WebDataBinder, args: &ResolvedArguments| {
                callback(binder, args);
                Ok(HandlerReturn::Unit)
            }),
        )
    }

    /// 注册一个可失败的无返回值初始化器，回调的错误会原样中止绑定器创建。
    pub fn fallible<F>(name: impl Into<Cow<'static, str>>, callback: F) -> Self
    where
        F: Fn(&mut WebDataBinder, &ResolvedArguments) -> Result<()> + Send + Sync + 'static,
    {
        Self::from_callback(
            name.into(),
            ReturnType::Unit,
            Arc::new(move |binder: &mut WebDataBinder, args: &ResolvedArguments| {
                callback(binder, args).map(|()| HandlerReturn::Unit)
            }),
        )
    }

    /// 注册一个自报返回类型的动态初始化器。
    ///
    /// # 教案式说明
    /// - **意图 (Why)**：脚本、插件等来源的处理器无法在 Rust 类型层面约束返回值；
    /// - **契约 (What)**：`declared` 非 unit 时注册即被拒绝；声明为 unit 但调用时仍产出值的，
    ///   在调用期以 [`BindingError::UnexpectedReturnValue`] 失败。
    pub fn dynamic<F>(name: impl Into<Cow<'static, str>>, declared: ReturnType, callback: F) -> Self
    where
        F: Fn(&mut WebDataBinder, &ResolvedArguments) -> Result<HandlerReturn>
            + Send
            + Sync
            + 'static,
    {
        Self::from_callback(name.into(), declared, Arc::new(callback))
    }

    fn from_callback(
        name: Cow<'static, str>,
        return_type: ReturnType,
        callback: Arc<BinderCallback>,
    ) -> Self {
        Self {
            name,
            attribute_names: Vec::new(),
            parameters: Vec::new(),
            return_type,
            callback,
        }
    }

    /// 限定初始化器只作用于给定的目标名。
    pub fn for_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_names
            .extend(names.into_iter().map(Into::into).filter(|name: &String| !name.is_empty()));
        self
    }

    /// 追加一个辅助参数声明，序号按追加顺序分配。
    pub fn with_parameter(mut self, mut parameter: MethodParameter) -> Self {
        parameter.index = self.parameters.len() + 1;
        self.parameters.push(parameter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    pub fn parameters(&self) -> &[MethodParameter] {
        &self.parameters
    }

    pub fn return_type(&self) -> &ReturnType {
        &self.return_type
    }

    /// 判断初始化器是否作用于给定目标名。
    ///
    /// - **契约 (What)**：`attribute_name` 为 `None` 或空串视为未命名目标，只匹配无过滤条件的初始化器；
    ///   比较为大小写敏感的完全相等。
    pub fn is_applicable(&self, attribute_name: Option<&str>) -> bool {
        if self.attribute_names.is_empty() {
            return true;
        }
        attribute_name
            .filter(|name| !name.is_empty())
            .is_some_and(|name| self.attribute_names.iter().any(|candidate| candidate == name))
    }

    pub(crate) fn invoke(
        &self,
        binder: &mut WebDataBinder,
        arguments: &ResolvedArguments,
    ) -> Result<HandlerReturn> {
        (self.callback)(binder, arguments)
    }
}

impl fmt::Debug for InitBinderMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitBinderMethod")
            .field("name", &self.name)
            .field("attribute_names", &self.attribute_names)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .finish()
    }
}
