//! Instructional prompt template.

use thiserror::Error;

/// Placeholder replaced by the user's message.
pub const MESSAGE_PLACEHOLDER: &str = "{message}";

/// Default template: assistant role prefix followed by the literal message.
pub const DEFAULT_TEMPLATE: &str = "
You are a helpful assistant, skilled in explaining complex concepts in simple terms.

{message}
";

/// Template error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template has no {{message}} placeholder")]
    MissingPlaceholder,
}

/// Prompt template with a single message slot.
///
/// The message is inserted verbatim; braces inside it are not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    prefix: String,
    suffix: String,
}

impl PromptTemplate {
    /// Parse a template containing one `{message}` placeholder.
    ///
    /// # Errors
    /// Returns error if the placeholder is missing.
    pub fn new(template: &str) -> Result<Self, TemplateError> {
        let (prefix, suffix) = template
            .split_once(MESSAGE_PLACEHOLDER)
            .ok_or(TemplateError::MissingPlaceholder)?;
        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Substitute the message into the template.
    #[must_use]
    pub fn render(&self, message: &str) -> String {
        let mut out = String::with_capacity(self.prefix.len() + message.len() + self.suffix.len());
        out.push_str(&self.prefix);
        out.push_str(message);
        out.push_str(&self.suffix);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        let (prefix, suffix) = DEFAULT_TEMPLATE
            .split_once(MESSAGE_PLACEHOLDER)
            .unwrap_or((DEFAULT_TEMPLATE, ""));
        Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_render() {
        let rendered = PromptTemplate::default().render("What is 2+2?");
        assert_eq!(
            rendered,
            "\nYou are a helpful assistant, skilled in explaining complex concepts in simple terms.\n\nWhat is 2+2?\n"
        );
    }

    #[test]
    fn test_render_empty_message() {
        let rendered = PromptTemplate::default().render("");
        assert!(rendered.ends_with("simple terms.\n\n\n"));
    }

    #[test]
    fn test_braces_in_message_are_literal() {
        let template = PromptTemplate::new("Q: {message}!").unwrap();
        assert_eq!(template.render("{message} {x}"), "Q: {message} {x}!");
    }

    #[test]
    fn test_missing_placeholder() {
        assert_eq!(
            PromptTemplate::new("no slot"),
            Err(TemplateError::MissingPlaceholder)
        );
    }
}
