//! Header names and MIME types shared by the client and the server
//! 客户端与服务端共享的头部名称和MIME类型

pub const CHARSET_UTF8: &str = "charset=UTF-8";

// MIME
pub const MIME_APPLICATION_JSON: &str = "application/json";
pub const MIME_APPLICATION_JSON_CHARSET_UTF8: &str = "application/json; charset=UTF-8";
pub const MIME_APPLICATION_XML: &str = "application/xml";
pub const MIME_TEXT_XML: &str = "text/xml";
pub const MIME_TEXT_PLAIN_CHARSET_UTF8: &str = "text/plain; charset=UTF-8";
pub const MIME_APPLICATION_FORM: &str = "application/x-www-form-urlencoded";
pub const MIME_MULTIPART_FORM: &str = "multipart/form-data";

// Headers
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_COOKIE: &str = "Cookie";
pub const HEADER_SET_COOKIE: &str = "Set-Cookie";
pub const HEADER_LOCATION: &str = "Location";

/// Bearer auth scheme / Bearer认证方案
pub const AUTH_SCHEME_BEARER: &str = "Bearer";

/// `Authorization` value for a bearer token / Bearer令牌的`Authorization`值
pub fn bearer(token: &str) -> String {
    format!("{} {}", AUTH_SCHEME_BEARER, token)
}

/// Case- and space-insensitive match against the two JSON content types
/// 忽略大小写和空格匹配两种JSON内容类型
pub fn is_json_content_type(value: &str) -> bool {
    let normalize = |s: &str| s.replace(' ', "").to_ascii_uppercase();
    let value = normalize(value);
    value == normalize(MIME_APPLICATION_JSON) || value == normalize(MIME_APPLICATION_JSON_CHARSET_UTF8)
}
