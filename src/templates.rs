use handlebars::Handlebars;
use std::sync::Arc;

use crate::error::PipelineError;

pub type Hbs = Arc<Handlebars<'static>>;

const MESSAGE_TEMPLATES: [(&str, &str); 6] = [
    ("document", include_str!("../templates/messages/document.hbs")),
    ("document_extended", include_str!("../templates/messages/document_extended.hbs")),
    ("dividend", include_str!("../templates/messages/dividend.hbs")),
    ("dividend_extended", include_str!("../templates/messages/dividend_extended.hbs")),
    ("price", include_str!("../templates/messages/price.hbs")),
    ("price_extended", include_str!("../templates/messages/price_extended.hbs")),
];

pub fn build_handlebars() -> Result<Hbs, PipelineError> {
    let mut hb = Handlebars::new();

    // plain-text chat messages, nothing to escape
    hb.register_escape_fn(handlebars::no_escape);
    hb.set_strict_mode(true);

    for (name, source) in MESSAGE_TEMPLATES {
        hb.register_template_string(name, source)
            .map_err(|e| PipelineError::Render(format!("template {name}: {e}")))?;
    }

    Ok(Arc::new(hb))
}
