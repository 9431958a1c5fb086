//! Input checks shared by the services. Each helper returns a 400 on failure.

use url::Url;

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Trim `value` and reject it when nothing is left.
pub fn non_empty(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Normalise an email address (trimmed, lowercased) after a shape check.
pub fn email(value: &str) -> AppResult<String> {
    let email = value.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::bad_request("email must be a valid email address"));
    }
    Ok(email)
}

pub fn password(value: &str) -> AppResult<()> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn positive_quantity(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::bad_request("quantity must be greater than 0"));
    }
    Ok(())
}

pub fn price(price: i64) -> AppResult<()> {
    if price <= 0 {
        return Err(AppError::bad_request("price must be greater than 0"));
    }
    Ok(())
}

pub fn stock(stock: i32) -> AppResult<()> {
    if stock < 0 {
        return Err(AppError::bad_request("stock_quantity must not be negative"));
    }
    Ok(())
}

/// Only absolute http(s) URLs are accepted for product images.
pub fn image_url(value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
            Ok(trimmed.to_string())
        }
        _ => Err(AppError::bad_request("image_url must be an absolute http(s) URL")),
    }
}

/// Build an ILIKE pattern that matches `needle` as a literal substring.
pub fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
