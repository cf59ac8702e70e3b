use crate::metadata::CaptureMetadata;
use crate::sanitize::sanitize_component;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Token(Token),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    CameraPrefix,
    FocalLength,
    Date,
    Time,
    Exposure,
    Aperture,
    Iso,
    Temperature,
    Suffix,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,
    #[error("unbalanced braces in template")]
    UnbalancedBraces,
    #[error("unknown template token: {0}")]
    UnknownToken(String),
}

/// Everything a template token can draw from for one file.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub metadata: &'a CaptureMetadata,
    pub camera_prefix: &'a str,
    pub original_name: &'a str,
}

pub fn parse_template(input: &str) -> Result<Vec<TemplatePart>, TemplateError> {
    if input.is_empty() {
        return Err(TemplateError::Empty);
    }

    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '{' => {
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                let mut token = String::new();
                let mut found_close = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        found_close = true;
                        break;
                    }
                    if next == '{' {
                        return Err(TemplateError::UnbalancedBraces);
                    }
                    token.push(next);
                }
                if !found_close || token.is_empty() {
                    return Err(TemplateError::UnbalancedBraces);
                }
                parts.push(TemplatePart::Token(parse_token(&token)?));
            }
            '}' => return Err(TemplateError::UnbalancedBraces),
            _ => literal.push(ch),
        }
    }

    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }

    Ok(parts)
}

pub fn render_template(parts: &[TemplatePart], ctx: &RenderContext<'_>) -> String {
    let mut output = String::new();
    for part in parts {
        match part {
            TemplatePart::Literal(s) => output.push_str(s),
            TemplatePart::Token(token) => {
                let value = match token {
                    Token::CameraPrefix => ctx.camera_prefix.to_string(),
                    Token::FocalLength => ctx.metadata.focal_length_label(),
                    Token::Date => ctx.metadata.date.clone(),
                    Token::Time => ctx.metadata.time.clone(),
                    Token::Exposure => ctx.metadata.exposure.to_fixed(),
                    Token::Aperture => ctx.metadata.aperture.clone(),
                    Token::Iso => ctx.metadata.iso.clone(),
                    Token::Temperature => ctx.metadata.temperature_label().to_string(),
                    Token::Suffix => name_suffix(ctx.original_name).to_string(),
                };
                output.push_str(&sanitize_component(&value));
            }
        }
    }

    output
}

/// Last `_`-separated segment of the original name, extension included.
pub fn name_suffix(original_name: &str) -> &str {
    original_name.rsplit('_').next().unwrap_or(original_name)
}

fn parse_token(token: &str) -> Result<Token, TemplateError> {
    match token {
        "camera_prefix" => Ok(Token::CameraPrefix),
        "focal_length" => Ok(Token::FocalLength),
        "date" => Ok(Token::Date),
        "time" => Ok(Token::Time),
        "exposure" => Ok(Token::Exposure),
        "aperture" => Ok(Token::Aperture),
        "iso" => Ok(Token::Iso),
        "temperature" => Ok(Token::Temperature),
        "suffix" => Ok(Token::Suffix),
        other => Err(TemplateError::UnknownToken(other.to_string())),
    }
}
