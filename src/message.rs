//! Response envelope shared by every endpoint.

use axum::{extract::FromRequestParts, http::{header::ACCEPT_LANGUAGE, request::Parts}};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::error::AppError;

/// Response codes carried in `respCode`.
pub mod codes {
    pub const SUCCESS: &str = "000";
    pub const FIELD_NOT_NULL: &str = "100";
    pub const FIELD_NOT_VALID: &str = "101";
    pub const FIELD_EXISTED: &str = "102";
    pub const FIELD_NOT_FOUND: &str = "103";
    pub const NOT_FOUND: &str = "104";
    pub const UNAUTHORIZED: &str = "401";
    pub const FORBIDDEN: &str = "403";
    pub const SYSTEM_ERROR: &str = "500";
    pub const UNDEFINED: &str = "999";
}

/// Literal description used for codes without a catalog entry.
pub const UNDEFINED_DESC: &str = "UNDEFINED";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespMessage {
    pub resp_code: String,
    pub resp_desc: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale { #[default] En, Vi }

impl Locale {
    /// Picks the first language tag of an `Accept-Language` header.
    pub fn from_header(value: &str) -> Self {
        let primary = value.split(',').next().unwrap_or("").trim().to_ascii_lowercase();
        if primary.starts_with("vi") { Self::Vi } else { Self::En }
    }
}

/// Builds `RespMessage`s with descriptions in the request's language.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageBuilder { locale: Locale }

impl MessageBuilder {
    pub const fn new(locale: Locale) -> Self { Self { locale } }

    pub fn success<T: Serialize>(&self, data: T) -> Result<RespMessage, AppError> {
        let data = serde_json::to_value(data).map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(self.build(codes::SUCCESS, &[], data))
    }

    pub fn failure<T: Serialize>(&self, code: &str, params: &[&str], data: T) -> Result<RespMessage, AppError> {
        let data = serde_json::to_value(data).map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(self.build(code, params, data))
    }

    pub fn build(&self, code: &str, params: &[&str], data: serde_json::Value) -> RespMessage {
        RespMessage { resp_code: code.to_string(), resp_desc: describe(code, self.locale, params), data }
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MessageBuilder {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();
        Ok(Self::new(locale))
    }
}

fn template(code: &str, locale: Locale) -> Option<&'static str> {
    use codes::*;
    let pair = match code {
        SUCCESS => ("Success", "Thành công"),
        FIELD_NOT_NULL => ("{0} must not be null", "{0} không được để trống"),
        FIELD_NOT_VALID => ("{0} is not valid", "{0} không hợp lệ"),
        FIELD_EXISTED => ("{0} already exists", "{0} đã tồn tại"),
        FIELD_NOT_FOUND => ("{0} not found", "Không tìm thấy {0}"),
        NOT_FOUND => ("Resource not found", "Không tìm thấy dữ liệu"),
        UNAUTHORIZED => ("Unauthorized", "Chưa xác thực"),
        FORBIDDEN => ("Access denied", "Không có quyền truy cập"),
        SYSTEM_ERROR => ("System error", "Lỗi hệ thống"),
        _ => return None,
    };
    Some(match locale { Locale::En => pair.0, Locale::Vi => pair.1 })
}

/// Localized description of `code` with `{n}` placeholders filled from `params`.
pub fn describe(code: &str, locale: Locale, params: &[&str]) -> String {
    let Some(template) = template(code, locale) else {
        return UNDEFINED_DESC.to_string();
    };
    let filled = params
        .iter()
        .enumerate()
        .fold(template.to_string(), |acc, (i, p)| acc.replace(&format!("{{{i}}}"), p));
    // drop placeholders nobody supplied
    filled
        .split_whitespace()
        .filter(|w| !(w.starts_with('{') && w.ends_with('}')))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_uses_code_000() {
        let msg = MessageBuilder::default().success(vec![1, 2]).unwrap();
        assert_eq!(msg.resp_code, codes::SUCCESS);
        assert_eq!(msg.resp_desc, "Success");
        assert_eq!(msg.data, serde_json::json!([1, 2]));
    }

    #[test]
    fn placeholders_are_filled() {
        assert_eq!(describe(codes::FIELD_NOT_NULL, Locale::En, &["Email"]), "Email must not be null");
        assert_eq!(describe(codes::FIELD_NOT_FOUND, Locale::Vi, &["Brand"]), "Không tìm thấy Brand");
    }

    #[test]
    fn missing_params_are_dropped() {
        assert_eq!(describe(codes::FIELD_NOT_VALID, Locale::En, &[]), "is not valid");
        assert_eq!(describe(codes::FIELD_NOT_FOUND, Locale::Vi, &[]), "Không tìm thấy");
    }

    #[test]
    fn unknown_code_is_undefined() {
        assert_eq!(describe("777", Locale::Vi, &[]), UNDEFINED_DESC);
    }

    #[test]
    fn locale_from_header() {
        assert_eq!(Locale::from_header("vi-VN,vi;q=0.9,en;q=0.8"), Locale::Vi);
        assert_eq!(Locale::from_header("en-US"), Locale::En);
        assert_eq!(Locale::from_header(""), Locale::En);
    }

    #[test]
    fn serializes_camel_case() {
        let msg = MessageBuilder::new(Locale::Vi).failure(codes::NOT_FOUND, &[], ()).unwrap();
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["respCode"], "104");
        assert_eq!(json["respDesc"], "Không tìm thấy dữ liệu");
        assert!(json["data"].is_null());
    }
}
