use crate::utils::error::{Result, SetupError};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 驗證 git 倉庫位址，接受 URL 形式與 scp 形式（git@host:owner/repo.git）
pub fn validate_repository_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(SetupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    static SCP_LIKE: OnceLock<Regex> = OnceLock::new();
    let scp_like = SCP_LIKE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9.-]+:[^\s:]+$").expect("static regex")
    });
    if scp_like.is_match(url_str) {
        return Ok(());
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" | "ssh" | "git" | "file" => Ok(()),
            scheme => Err(SetupError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(SetupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_http_url(field_name: &str, url_str: &str) -> Result<()> {
    match Url::parse(url_str) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(SetupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Unsupported URL scheme: {}", url.scheme()),
        }),
        Err(e) => Err(SetupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

/// 相對路徑元件：不可為空、不可含 `/`、`..` 或 NUL
pub fn validate_path_component(field_name: &str, value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        Some("Path cannot be empty")
    } else if value.contains('\0') {
        Some("Path contains null bytes")
    } else if value.contains('/') || value == ".." || value == "." {
        Some("Must be a single path component")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SetupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// 家目錄會原樣寫進 systemd 單元與 cron 行，只接受絕對路徑且不含空白或特殊字元
pub fn validate_home_path(field_name: &str, value: &str) -> Result<()> {
    static HOME: OnceLock<Regex> = OnceLock::new();
    let home = HOME.get_or_init(|| Regex::new(r"^/[A-Za-z0-9._@+/-]*$").expect("static regex"));

    let reason = if !value.starts_with('/') {
        Some("Home directory must be an absolute path")
    } else if !home.is_match(value) || value.split('/').any(|part| part == "..") {
        Some("Home directory may only contain [A-Za-z0-9._@+-/], without whitespace or '..'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SetupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// 使用者、群組與服務名稱
pub fn validate_unix_name(field_name: &str, value: &str) -> Result<()> {
    static NAME: OnceLock<Regex> = OnceLock::new();
    let name = NAME.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("static regex"));

    if !name.is_match(value) {
        return Err(SetupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Must start with a lowercase letter or '_' and contain only [a-z0-9_-]"
                .to_string(),
        });
    }
    Ok(())
}

/// 五欄位 cron 排程運算式
pub fn validate_cron_expression(field_name: &str, value: &str) -> Result<()> {
    static FIELD: OnceLock<Regex> = OnceLock::new();
    let field = FIELD.get_or_init(|| Regex::new(r"^[0-9A-Za-z*/,\-]+$").expect("static regex"));

    let fields: Vec<&str> = value.split_whitespace().collect();
    if fields.len() != 5 || !fields.iter().all(|f| field.is_match(f)) {
        return Err(SetupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Expected five cron fields (minute hour day month weekday)".to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SetupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(SetupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
