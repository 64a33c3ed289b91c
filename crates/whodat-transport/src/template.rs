//! Validated `{field}` templates.
//!
//! The Bot API endpoint is configured as a template such as
//! `https://api.telegram.org/bot{token}/{method}`. Templates are checked once
//! against a fixed set of field names and can then be filled in steps: the
//! token when the client is built, the method on every call.
//!
//! Only bare `{name}` fields are accepted. `{{` and `}}` stand for literal
//! braces. Format specs (`{name:x}`) and conversions (`{name!r}`) are
//! rejected, as are fields outside the allowed set.

use std::fmt;

use crate::error::{TemplateError, TemplateResult};

/// Field names a template may use.
#[derive(Debug, Clone, Copy)]
pub struct TemplateFields {
    /// Fields that must appear at least once.
    pub required: &'static [&'static str],
    /// Fields that may appear.
    pub optional: &'static [&'static str],
}

impl TemplateFields {
    fn allows(&self, name: &str) -> bool {
        self.required.contains(&name) || self.optional.contains(&name)
    }
}

/// Fields of a Bot API URL template.
pub const API_URL_FIELDS: TemplateFields = TemplateFields {
    required: &["token", "method"],
    optional: &[],
};

/// Default Bot API URL template.
pub const DEFAULT_API_URL_TEMPLATE: &str = "https://api.telegram.org/bot{token}/{method}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A parsed and validated template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parses `source` and checks its fields against `fields`.
    ///
    /// Fields are checked left to right; missing required fields are
    /// reported last, all at once.
    pub fn parse(source: &str, fields: &TemplateFields) -> TemplateResult<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '{' | '}' if chars.peek().map(|&(_, next)| next) == Some(ch) => {
                    chars.next();
                    literal.push(ch);
                }
                '}' => return Err(TemplateError::Unbalanced(offset)),
                '{' => {
                    let start = offset + 1;
                    let end = source[start..]
                        .find('}')
                        .map(|len| start + len)
                        .ok_or(TemplateError::Unbalanced(offset))?;
                    while chars.next_if(|&(index, _)| index <= end).is_some() {}

                    let name = parse_field(&source[start..end])?;
                    if !fields.allows(name) {
                        return Err(TemplateError::UnexpectedField(name.to_string()));
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(name.to_string()));
                }
                _ => literal.push(ch),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let template = Self { segments };

        let mut missing: Vec<String> = fields
            .required
            .iter()
            .filter(|name| !template.fields().any(|field| field == **name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(TemplateError::MissingFields(missing));
        }

        Ok(template)
    }

    /// Iterates over the fields still present, in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Returns a template with the given fields substituted.
    ///
    /// Fields without a value stay fields; values for names the template
    /// does not use are ignored.
    pub fn fill(&self, values: &[(&str, &str)]) -> Self {
        let segments = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Field(name) => match lookup(values, name) {
                    Some(value) => Segment::Literal(value.to_string()),
                    None => segment.clone(),
                },
                Segment::Literal(_) => segment.clone(),
            })
            .collect();
        Self { segments }
    }

    /// Renders the template to a string.
    ///
    /// Fields without a value are written back as `{name}`.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => match lookup(values, name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        out
    }
}

/// Writes the template back in source form, braces escaped.
impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    f.write_str(&text.replace('{', "{{").replace('}', "}}"))?
                }
                Segment::Field(name) => write!(f, "{{{name}}}")?,
            }
        }
        Ok(())
    }
}

fn lookup<'a>(values: &[(&str, &'a str)], name: &str) -> Option<&'a str> {
    values
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| *value)
}

/// Splits `name!conversion:spec` and rejects anything but a bare name.
fn parse_field(field: &str) -> TemplateResult<&str> {
    let (head, spec) = match field.split_once(':') {
        Some((head, spec)) => (head, Some(spec)),
        None => (field, None),
    };
    let (name, conversion) = match head.split_once('!') {
        Some((name, conversion)) => (name, Some(conversion)),
        None => (head, None),
    };

    if spec.is_some() {
        return Err(TemplateError::FormatSpec(name.to_string()));
    }
    if conversion.is_some() {
        return Err(TemplateError::Conversion(name.to_string()));
    }
    Ok(name)
}

// =============================================================================
// URL Template
// =============================================================================

/// Bot API URL template with `{token}` and `{method}` fields.
///
/// Once the token is bound the rendered URL contains a credential, so the
/// `Debug` output never shows the template text.
#[derive(Clone)]
pub struct UrlTemplate {
    template: Template,
}

impl UrlTemplate {
    /// Parses and validates an API URL template.
    pub fn parse(source: &str) -> TemplateResult<Self> {
        Template::parse(source, &API_URL_FIELDS).map(|template| Self { template })
    }

    /// Returns a copy with the bot token substituted.
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            template: self.template.fill(&[("token", token)]),
        }
    }

    /// Renders the endpoint URL for `method`.
    pub fn url_for(&self, method: &str) -> String {
        self.template.render(&[("method", method)])
    }

    /// Returns `true` once the token has been substituted.
    pub fn has_token(&self) -> bool {
        !self.template.fields().any(|field| field == "token")
    }
}

impl Default for UrlTemplate {
    fn default() -> Self {
        Self {
            template: Template {
                segments: vec![
                    Segment::Literal("https://api.telegram.org/bot".into()),
                    Segment::Field("token".into()),
                    Segment::Literal("/".into()),
                    Segment::Field("method".into()),
                ],
            },
        }
    }
}

impl fmt::Debug for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlTemplate")
            .field("has_token", &self.has_token())
            .finish_non_exhaustive()
    }
}
