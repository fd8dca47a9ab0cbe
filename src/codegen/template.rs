use std::collections::{BTreeSet, HashMap};

use crate::error::{ScaffoldError, ScaffoldResult};

pub const ENTITY_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/templates/entity.rs.tmpl"
));

/// Substitutes `{{ key }}` placeholders. Every placeholder must have a value.
pub fn render_template(template: &str, vars: &HashMap<&str, String>) -> ScaffoldResult<String> {
    let mut output = String::with_capacity(template.len() + 128);
    let mut missing = BTreeSet::new();
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        output.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or_else(|| ScaffoldError::Template("template has unclosed placeholder".to_string()))?;
        let key = after[..close].trim();
        if key.is_empty() {
            return Err(ScaffoldError::Template(
                "template has empty placeholder".to_string(),
            ));
        }
        match vars.get(key) {
            Some(value) => output.push_str(value),
            None => {
                missing.insert(key.to_string());
            }
        }
        rest = &after[close + 2..];
    }
    output.push_str(rest);

    if !missing.is_empty() {
        let keys: Vec<_> = missing.into_iter().collect();
        return Err(ScaffoldError::Template(format!(
            "template placeholders missing values: {}",
            keys.join(", ")
        )));
    }
    Ok(output)
}
