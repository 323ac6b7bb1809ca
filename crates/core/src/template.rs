use chrono::{Datelike, NaiveDateTime, Timelike};
use thiserror::Error;

pub const DEFAULT_TEMPLATE: &str = "{year}-{month}-{day}-{hour}{minute}{second}{subsec}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("テンプレートが空です")]
    Empty,
    #[error("テンプレートの波括弧が対応していません")]
    UnbalancedBraces,
    #[error("未知のトークンです: {{{0}}}")]
    UnknownToken(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Token(Token),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Date,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    /// 1/10 秒の 1 桁。100 ミリ秒刻みの衝突回避がここに現れる。
    Subsec,
}

pub fn parse_template(template: &str) -> Result<Vec<TemplatePart>, TemplateError> {
    if template.trim().is_empty() {
        return Err(TemplateError::Empty);
    }

    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '{' => {
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                let mut name = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    if inner == '{' {
                        return Err(TemplateError::UnbalancedBraces);
                    }
                    name.push(inner);
                }
                if !closed {
                    return Err(TemplateError::UnbalancedBraces);
                }
                parts.push(TemplatePart::Token(parse_token(&name)?));
            }
            '}' => return Err(TemplateError::UnbalancedBraces),
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }
    Ok(parts)
}

fn parse_token(name: &str) -> Result<Token, TemplateError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "date" => Ok(Token::Date),
        "year" => Ok(Token::Year),
        "month" => Ok(Token::Month),
        "day" => Ok(Token::Day),
        "hour" => Ok(Token::Hour),
        "minute" => Ok(Token::Minute),
        "second" => Ok(Token::Second),
        "subsec" => Ok(Token::Subsec),
        other => Err(TemplateError::UnknownToken(other.to_string())),
    }
}

pub fn validate_template(template: &str) -> Result<(), TemplateError> {
    parse_template(template).map(|_| ())
}

pub fn render_template(parts: &[TemplatePart], datetime: &NaiveDateTime) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            TemplatePart::Literal(text) => out.push_str(text),
            TemplatePart::Token(token) => render_token(&mut out, *token, datetime),
        }
    }
    out
}

fn render_token(out: &mut String, token: Token, datetime: &NaiveDateTime) {
    use std::fmt::Write;
    let _ = match token {
        Token::Date => write!(
            out,
            "{:04}{:02}{:02}{:02}{:02}{:02}",
            datetime.year(),
            datetime.month(),
            datetime.day(),
            datetime.hour(),
            datetime.minute(),
            datetime.second()
        ),
        Token::Year => write!(out, "{:04}", datetime.year()),
        Token::Month => write!(out, "{:02}", datetime.month()),
        Token::Day => write!(out, "{:02}", datetime.day()),
        Token::Hour => write!(out, "{:02}", datetime.hour()),
        Token::Minute => write!(out, "{:02}", datetime.minute()),
        Token::Second => write!(out, "{:02}", datetime.second()),
        Token::Subsec => write!(out, "{}", (datetime.nanosecond() / 100_000_000) % 10),
    };
}
