//! 请求交换（exchange）模型：参数解析器与数据绑定器读取请求数据的唯一入口。
//!
//! # 教案级说明
//! - **意图 (Why)**：绑定上下文不关心传输层，只需要一个只读视图来获取查询参数、请求头、
//!   表单字段与路由匹配出的 URI 模板变量；
//! - **契约 (What)**：[`ServerRequest`] 构造后不可变；[`ServerWebExchange`] 在请求之外承载
//!   路由层写入的 URI 变量与字符串属性；
//! - **设计 (How)**：查询串与表单体经 `serde_urlencoded` 解码（含百分号解码与 `+` 还原空格），
//!   多值参数按出现顺序保存在 [`MultiValueMap`] 中。

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{BindingError, Result};

/// 请求方法。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 有序的多值映射：键按字典序迭代，同一键下的值保持插入顺序。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiValueMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl MultiValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个值，不覆盖已有值。
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key.into()).or_default().push(value.into());
    }

    /// 读取键下的第一个值。
    pub fn first(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// 读取键下的全部值。
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 解码 `application/x-www-form-urlencoded` 文本。
    pub fn from_urlencoded(encoded: &str) -> std::result::Result<Self, serde_urlencoded::de::Error> {
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(encoded)?;
        let mut map = Self::new();
        for (key, value) in pairs {
            map.add(key, value);
        }
        Ok(map)
    }
}

/// 请求头集合，名称大小写不敏感。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    inner: MultiValueMap,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        self.inner.add(name.to_ascii_lowercase(), value);
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.inner.first(&name.to_ascii_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.inner.get(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// 不可变的请求视图。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerRequest {
    method: HttpMethod,
    path: String,
    raw_query: Option<String>,
    query_params: MultiValueMap,
    headers: HttpHeaders,
    form_data: MultiValueMap,
}

impl ServerRequest {
    /// 以方法与 URI（`/path?query`）开始构造请求。
    pub fn builder(method: HttpMethod, uri: impl Into<String>) -> ServerRequestBuilder {
        ServerRequestBuilder {
            method,
            uri: uri.into(),
            headers: HttpHeaders::new(),
            form_body: None,
        }
    }

    /// `GET` 请求的便捷入口。
    pub fn get(uri: impl Into<String>) -> ServerRequestBuilder {
        Self::builder(HttpMethod::Get, uri)
    }

    /// `POST` 请求的便捷入口。
    pub fn post(uri: impl Into<String>) -> ServerRequestBuilder {
        Self::builder(HttpMethod::Post, uri)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    pub fn query_params(&self) -> &MultiValueMap {
        &self.query_params
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn form_data(&self) -> &MultiValueMap {
        &self.form_data
    }
}

/// [`ServerRequest`] 构造器。
///
/// - **契约 (What)**：`build` 才会解析 URI 与表单体；编码非法时返回
///   [`BindingError::InvalidRequest`]，不会产出半成品请求。
#[derive(Clone, Debug)]
pub struct ServerRequestBuilder {
    method: HttpMethod,
    uri: String,
    headers: HttpHeaders,
    form_body: Option<String>,
}

impl ServerRequestBuilder {
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// 附加 `application/x-www-form-urlencoded` 请求体，并补齐对应的 `Content-Type`。
    pub fn form_body(mut self, body: impl Into<String>) -> Self {
        if self.headers.first("content-type").is_none() {
            self.headers
                .add("content-type", "application/x-www-form-urlencoded");
        }
        self.form_body = Some(body.into());
        self
    }

    pub fn build(self) -> Result<ServerRequest> {
        // 片段标识符不会发送到服务端，解析前直接丢弃。
        let without_fragment = self
            .uri
            .split_once('#')
            .map_or(self.uri.as_str(), |(head, _)| head);

        let (path, raw_query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, Some(query.to_owned())),
            None => (without_fragment, None),
        };

        let query_params = match raw_query.as_deref() {
            Some(query) => {
                MultiValueMap::from_urlencoded(query).map_err(|err| BindingError::InvalidRequest {
                    part: "query",
                    detail: err.to_string(),
                })?
            }
            None => MultiValueMap::new(),
        };

        let form_data = match self.form_body.as_deref() {
            Some(body) => {
                MultiValueMap::from_urlencoded(body).map_err(|err| BindingError::InvalidRequest {
                    part: "form body",
                    detail: err.to_string(),
                })?
            }
            None => MultiValueMap::new(),
        };

        let normalized_path = if path.is_empty() { "/" } else { path };

        Ok(ServerRequest {
            method: self.method,
            path: normalized_path.to_owned(),
            raw_query,
            query_params,
            headers: self.headers,
            form_data,
        })
    }
}

/// 一次请求处理的交换对象。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerWebExchange {
    request: ServerRequest,
    uri_variables: BTreeMap<String, String>,
    attributes: BTreeMap<String, String>,
}

impl ServerWebExchange {
    pub fn new(request: ServerRequest) -> Self {
        Self {
            request,
            uri_variables: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn request(&self) -> &ServerRequest {
        &self.request
    }

    /// 记录路由匹配得到的 URI 模板变量。
    pub fn with_uri_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.uri_variables.insert(name.into(), value.into());
        self
    }

    pub fn uri_variable(&self, name: &str) -> Option<&str> {
        self.uri_variables.get(name).map(String::as_str)
    }

    pub fn uri_variables(&self) -> &BTreeMap<String, String> {
        &self.uri_variables
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

impl From<ServerRequest> for ServerWebExchange {
    fn from(request: ServerRequest) -> Self {
        Self::new(request)
    }
}
