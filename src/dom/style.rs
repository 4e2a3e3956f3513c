//! Inline style and dataset name helpers.

/// Parse inline style text into `(property, value)` declarations.
pub(crate) fn parse_declarations(text: &str) -> Vec<(String, String)> {
    text.split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some((name, value.to_string()))
        })
        .collect()
}

pub(crate) fn serialize_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(name, value)| format!("{}: {};", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `backgroundColor` → `background-color`; kebab-case names pass through.
pub(crate) fn css_property_name(name: &str) -> String {
    if name == "cssFloat" {
        return "float".to_string();
    }
    if name.contains('-') {
        return name.to_ascii_lowercase();
    }
    camel_to_kebab(name)
}

/// `contactId` → `data-contact-id`
pub(crate) fn dataset_attribute(key: &str) -> String {
    format!("data-{}", camel_to_kebab(key))
}

fn camel_to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
