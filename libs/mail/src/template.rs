use handlebars::Handlebars;
use serde::Deserialize;
use serde::Serialize;

use crate::MailError;

/// Subject and body templates in handlebars syntax, e.g. `Hi {{firstName}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct MailTemplate {
    pub subject: String,
    pub body: String,
}

impl MailTemplate {
    pub fn render<T: Serialize>(&self, values: &T) -> Result<(String, String), MailError> {
        Ok((render(&self.subject, values)?, render(&self.body, values)?))
    }
}

/// Renders `template` without HTML escaping; the output is a plain text mail.
pub fn render<T: Serialize>(template: &str, values: &T) -> Result<String, MailError> {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    registry
        .render_template(template, values)
        .map_err(|err| MailError::Template(err.to_string()))
}
