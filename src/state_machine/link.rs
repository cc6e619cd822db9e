//! WhatsApp deep-link building

use url::Url;

/// Build a `wa.me` deep link with a URL-encoded text body.
pub fn whatsapp_link(number: &str, body: &str) -> String {
    let base = format!("https://wa.me/{number}");
    match Url::parse_with_params(&base, [("text", body)]) {
        Ok(url) => url.into(),
        // A malformed number cannot produce a valid URL; fall back to the
        // bare chat link.
        Err(_) => base,
    }
}

/// Default outbound message when a node has no template of its own.
pub fn default_contact_body(user_name: &str, project_info: &str) -> String {
    format!("Olá! Meu nome é {user_name} e gostaria de falar sobre: {project_info}")
}
