//! 通用工具函数：表单字段校验与账号凭据

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::NaiveDate;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

use crate::error::{HmsError, Result};

/// 必填文本字段，去除首尾空白后不能为空
pub fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(HmsError::Validation(format!("{} is required", field)))
    } else {
        Ok(value.to_string())
    }
}

/// 可选文本字段，空白视为未填写
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 解析正整数主键
pub fn parse_id(field: &str, value: &str) -> Result<i64> {
    match required(field, value)?.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(HmsError::Validation(format!("{} must be a valid id", field))),
    }
}

/// 解析不小于 `min` 的整数
pub fn parse_int_at_least(field: &str, value: &str, min: i64) -> Result<i64> {
    let n = required(field, value)?
        .parse::<i64>()
        .map_err(|_| HmsError::Validation(format!("{} must be a whole number", field)))?;
    if n < min {
        return Err(HmsError::Validation(format!(
            "{} must be at least {}",
            field, min
        )));
    }
    Ok(n)
}

/// 解析非负金额
pub fn parse_amount(field: &str, value: &str) -> Result<f64> {
    match required(field, value)?.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => Ok(amount),
        _ => Err(HmsError::Validation(format!(
            "{} must be a non-negative amount",
            field
        ))),
    }
}

/// 解析 YYYY-MM-DD 日期
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&required(field, value)?, "%Y-%m-%d")
        .map_err(|_| HmsError::Validation(format!("{} must be a date (YYYY-MM-DD)", field)))
}

/// 解析存储枚举
pub fn parse_choice<T>(field: &str, value: &str) -> Result<T>
where
    T: FromStr<Err = HmsError>,
{
    required(field, value)?.parse::<T>()
}

/// 根据员工姓名和编号生成用户名：名字首字母 + 姓氏 + 员工编号，全部小写
pub fn derive_username(first_name: &str, last_name: &str, staff_id: i64) -> String {
    let initial = first_name
        .trim()
        .chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_string())
        .unwrap_or_default();
    let last: String = last_name.chars().filter(|c| c.is_alphanumeric()).collect();
    format!("{}{}{}", initial, last, staff_id).to_lowercase()
}

/// 一次性临时凭据，仅在创建时交给管理员
#[derive(Clone, PartialEq, Eq)]
pub struct TemporaryCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

const TEMP_PASSWORD_LEN: usize = 16;

/// 生成 16 位字母数字临时密码
pub fn generate_temp_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// 使用 Argon2 计算加盐哈希
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HmsError::Internal(format!("Failed to hash password: {}", e)))
}

/// 重新计算并比对密码哈希；哈希格式损坏视为不匹配
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash could not be parsed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    #[test]
    fn test_required_and_optional() {
        assert_eq!(required("Name", "  Ada ").unwrap(), "Ada");
        assert!(matches!(
            required("Name", "   "),
            Err(HmsError::Validation(msg)) if msg == "Name is required"
        ));
        assert_eq!(optional(Some("  ")), None);
        assert_eq!(optional(Some(" a@b.c ")), Some("a@b.c".to_string()));
        assert_eq!(optional(None), None);
    }

    #[test]
    fn test_numeric_parsing() {
        assert_eq!(parse_id("Room", "12").unwrap(), 12);
        assert!(parse_id("Room", "0").is_err());
        assert!(parse_id("Room", "abc").is_err());
        assert_eq!(parse_int_at_least("Capacity", "1", 1).unwrap(), 1);
        assert!(parse_int_at_least("Capacity", "0", 1).is_err());
        assert_eq!(parse_amount("Amount", "12.50").unwrap(), 12.5);
        assert!(parse_amount("Amount", "-1").is_err());
        assert!(parse_amount("Amount", "NaN").is_err());
    }

    #[test]
    fn test_date_and_choice() {
        assert_eq!(
            parse_date("Date of birth", "1990-02-15").unwrap(),
            NaiveDate::from_ymd_opt(1990, 2, 15).unwrap()
        );
        assert!(parse_date("Date of birth", "15/02/1990").is_err());
        assert_eq!(parse_choice::<Gender>("Gender", "Female").unwrap(), Gender::Female);
        assert!(parse_choice::<Gender>("Gender", "").is_err());
    }

    #[test]
    fn test_derive_username() {
        assert_eq!(derive_username("John", "Doe", 42), "jdoe42");
        assert_eq!(derive_username("mary", "O'Neil Smith", 7), "moneilsmith7");
    }

    #[test]
    fn test_temp_password_shape() {
        let password = generate_temp_password();
        assert_eq!(password.len(), 16);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, generate_temp_password());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret", "not-a-hash"));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = TemporaryCredentials {
            username: "jdoe1".to_string(),
            password: "abcdef0123456789".to_string(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("jdoe1"));
        assert!(!printed.contains("abcdef0123456789"));
    }
}
