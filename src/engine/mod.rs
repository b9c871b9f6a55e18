//! Engine modules: the pure part of installer generation.
//!
//! The engine turns resolved attributes into a method selection, an EAP
//! configuration block and an ordered profile plan. Nothing in here performs
//! I/O; the staging, emission and packaging layers consume its output.

pub mod eap_config;
pub mod profiles;
pub mod selector;

/// Escape text for use inside XML element content or attribute values.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
