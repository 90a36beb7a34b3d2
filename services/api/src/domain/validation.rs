//! Input validation rules shared by use cases.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

use crate::error::ApiError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Mail providers accepted for new registrations.
pub const ALLOWED_EMAIL_DOMAINS: &[&str] = &[
    "qq.com",
    "163.com",
    "126.com",
    "sina.com",
    "sina.cn",
    "sohu.com",
    "yeah.net",
    "139.com",
    "wo.cn",
    "189.cn",
    "aliyun.com",
    "foxmail.com",
    "gmail.com",
    "outlook.com",
    "hotmail.com",
    "yahoo.com",
    "icloud.com",
    "live.com",
    "msn.com",
    "aol.com",
    "protonmail.com",
    "zoho.com",
];

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 50;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const SPACE_NAME_MAX_CHARS: usize = 100;
pub const EVENT_TITLE_MAX_CHARS: usize = 200;

pub const PASSWORD_POLICY_MESSAGE: &str = "密码必须至少8位，包含字母和数字";

/// Trim and lowercase; emails are stored in this form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_allowed_email_domain(email: &str) -> bool {
    email
        .rsplit_once('@')
        .is_some_and(|(_, domain)| ALLOWED_EMAIL_DOMAINS.contains(&domain.to_lowercase().as_str()))
}

pub fn is_valid_username(username: &str) -> bool {
    let len = username.chars().count();
    (USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len)
}

/// At least 8 characters with one ASCII letter and one digit.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN_CHARS
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// First character of the local part, then `***@domain`.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => match local.chars().next() {
            Some(first) => format!("{first}***@{domain}"),
            None => format!("***@{domain}"),
        },
        None => email.to_owned(),
    }
}

// ── Result-returning checks ──────────────────────────────────────────────────

pub fn ensure_email_format(email: &str) -> Result<(), ApiError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ApiError::validation("邮箱格式不正确"))
    }
}

pub fn ensure_registrable_email(email: &str) -> Result<(), ApiError> {
    ensure_email_format(email)?;
    if !is_allowed_email_domain(email) {
        return Err(ApiError::validation(
            "请使用常用邮箱注册(如 QQ、163、Gmail 等)",
        ));
    }
    Ok(())
}

pub fn ensure_username(username: &str) -> Result<(), ApiError> {
    if is_valid_username(username) {
        Ok(())
    } else {
        Err(ApiError::validation("用户名长度必须在3-50个字符之间"))
    }
}

pub fn ensure_password(password: &str) -> Result<(), ApiError> {
    if is_strong_password(password) {
        Ok(())
    } else {
        Err(ApiError::validation(PASSWORD_POLICY_MESSAGE))
    }
}

pub fn ensure_space_name(name: &str) -> Result<(), ApiError> {
    let len = name.trim().chars().count();
    if len == 0 || len > SPACE_NAME_MAX_CHARS {
        return Err(ApiError::validation("空间名称长度必须在1-100个字符之间"));
    }
    Ok(())
}

pub fn ensure_event_title(title: &str) -> Result<(), ApiError> {
    let len = title.trim().chars().count();
    if len == 0 || len > EVENT_TITLE_MAX_CHARS {
        return Err(ApiError::validation("标题长度必须在1-200个字符之间"));
    }
    Ok(())
}

/// `YYYY-MM-DD`
pub fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::validation("日期格式错误，应为 YYYY-MM-DD"))
}

/// `HH:MM` or `HH:MM:SS`; blank means "no time".
pub fn parse_time(value: &str) -> Result<Option<NaiveTime>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map(Some)
        .map_err(|_| ApiError::validation("时间格式错误，应为 HH:MM"))
}

/// Lowercase extension without the dot.
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
