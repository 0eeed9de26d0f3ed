//! Soil Monitor 的 `Config.py` 內容模型與修補規則。
//!
//! 只處理兩種欄位：
//! - `SERIAL_PORT = '<value>'`
//! - `DB_CONFIG = { 'host': "...", 'port': 3306, ... }` 內的鍵值
//!
//! 其餘內容（註解、縮排、引號風格）維持原樣。

use crate::config::{DatabaseOverrides, SerialPolicy};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn serial_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*SERIAL_PORT[ \t]*=[ \t]*(?P<quote>['"])(?P<value>(?:\\.|[^\\'"\n])*)['"]"#)
            .expect("static regex")
    })
}

fn db_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*DB_CONFIG[ \t]*=[ \t]*\{[^}]*\}").expect("static regex"))
}

/// 序列埠修補決策
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerialDecision {
    Replace { from: String, to: String },
    Keep(String),
    Unrecognized(String),
    Missing,
}

/// placeholder → target；已知硬體值不變；其他值不動並警告
pub fn decide_serial(current: Option<&str>, policy: &SerialPolicy) -> SerialDecision {
    match current {
        None => SerialDecision::Missing,
        Some(value) if value == policy.placeholder => SerialDecision::Replace {
            from: value.to_string(),
            to: policy.target.clone(),
        },
        Some(value) if value == policy.target || policy.recognized.iter().any(|r| r == value) => {
            SerialDecision::Keep(value.to_string())
        }
        Some(value) => SerialDecision::Unrecognized(value.to_string()),
    }
}

/// DB_CONFIG 欄位值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbValue {
    Text(String),
    Number(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfigFile {
    content: String,
}

impl AppConfigFile {
    pub fn parse(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }

    pub fn serial_port(&self) -> Option<String> {
        serial_regex()
            .captures(&self.content)
            .and_then(|caps| caps.name("value"))
            .map(|m| unescape_python(m.as_str()))
    }

    /// 回傳是否有變更；找不到欄位時回傳 false
    pub fn set_serial_port(&mut self, value: &str) -> bool {
        let Some(caps) = serial_regex().captures(&self.content) else {
            return false;
        };
        let Some(current) = caps.name("value") else {
            return false;
        };
        let escaped = escape_python(value);
        if current.as_str() == escaped {
            return false;
        }

        let range = current.range();
        self.content.replace_range(range, &escaped);
        true
    }

    pub fn db_value(&self, key: &str) -> Option<DbValue> {
        let block = db_block_regex().find(&self.content)?;
        let block_text = block.as_str();

        if let Some(caps) = db_text_regex(key).captures(block_text) {
            return caps
                .name("value")
                .map(|m| DbValue::Text(unescape_python(m.as_str())));
        }
        db_number_regex(key)
            .captures(block_text)
            .and_then(|caps| caps.name("value"))
            .and_then(|m| m.as_str().parse().ok())
            .map(DbValue::Number)
    }

    /// 只替換 DB_CONFIG 區塊內已存在的鍵
    pub fn set_db_value(&mut self, key: &str, value: &DbValue) -> bool {
        let Some(block) = db_block_regex().find(&self.content) else {
            return false;
        };
        let offset = block.start();
        let block_text = block.as_str().to_string();

        let replacement = match value {
            DbValue::Text(text) => db_text_regex(key).captures(&block_text).and_then(|caps| {
                let current = caps.name("value")?;
                let escaped = escape_python(text);
                (current.as_str() != escaped).then(|| (current.range(), escaped))
            }),
            DbValue::Number(number) => {
                db_number_regex(key).captures(&block_text).and_then(|caps| {
                    let current = caps.name("value")?;
                    (current.as_str() != number.to_string())
                        .then(|| (current.range(), number.to_string()))
                })
            }
        };

        match replacement {
            Some((range, text)) => {
                self.content
                    .replace_range(range.start + offset..range.end + offset, &text);
                true
            }
            None => false,
        }
    }
}

fn db_text_regex(key: &str) -> Regex {
    Regex::new(&format!(
        r#"['"]{}['"][ \t]*:[ \t]*(?P<quote>['"])(?P<value>(?:\\.|[^\\'"\n])*)['"]"#,
        regex::escape(key)
    ))
    .expect("escaped key regex")
}

fn db_number_regex(key: &str) -> Regex {
    Regex::new(&format!(
        r#"['"]{}['"][ \t]*:[ \t]*(?P<value>\d+)"#,
        regex::escape(key)
    ))
    .expect("escaped key regex")
}

fn escape_python(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
}

fn unescape_python(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// 一次修補的結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOutcome {
    pub serial: SerialDecision,
    /// 被覆寫的 DB_CONFIG 鍵
    pub db_fields: Vec<String>,
    /// 不存在於 DB_CONFIG 的覆寫鍵
    pub db_missing: Vec<String>,
    pub changed: bool,
}

pub fn apply_patch(
    file: &mut AppConfigFile,
    policy: &SerialPolicy,
    overrides: &DatabaseOverrides,
) -> PatchOutcome {
    let serial = decide_serial(file.serial_port().as_deref(), policy);
    let mut changed = false;
    if let SerialDecision::Replace { to, .. } = &serial {
        changed |= file.set_serial_port(to);
    }

    let mut db_fields = Vec::new();
    let mut db_missing = Vec::new();
    let requested = [
        ("host", overrides.host.clone().map(DbValue::Text)),
        ("port", overrides.port.map(DbValue::Number)),
        ("user", overrides.user.clone().map(DbValue::Text)),
        ("password", overrides.password.clone().map(DbValue::Text)),
        ("database", overrides.database.clone().map(DbValue::Text)),
    ];
    for (key, value) in requested {
        let Some(value) = value else { continue };
        if file.db_value(key).is_none() {
            db_missing.push(key.to_string());
        } else if file.set_db_value(key, &value) {
            db_fields.push(key.to_string());
            changed = true;
        }
    }

    PatchOutcome {
        serial,
        db_fields,
        db_missing,
        changed,
    }
}
