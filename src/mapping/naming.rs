use std::collections::HashSet;

const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Path keywords, which are not valid even as raw identifiers.
const RESERVED_PATH_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

pub fn to_snake_case(input: &str) -> String {
    let mut out = String::new();
    let mut prev_underscore = false;
    let mut prev_lower_or_digit = false;

    for ch in input.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase() {
                if prev_lower_or_digit && !prev_underscore {
                    out.push('_');
                }
                out.push(ch.to_ascii_lowercase());
            } else {
                out.push(ch);
            }
            prev_underscore = false;
            prev_lower_or_digit = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        } else {
            if !prev_underscore {
                out.push('_');
                prev_underscore = true;
            }
            prev_lower_or_digit = false;
        }
    }

    let trimmed = out.trim_matches('_').to_string();
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed
    }
}

pub fn to_pascal_case(input: &str) -> String {
    let mut out = String::new();
    for segment in input.split('_').filter(|s| !s.is_empty()) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            for ch in chars {
                out.push(ch);
            }
        }
    }
    if out.is_empty() {
        "Entity".to_string()
    } else {
        out
    }
}

/// Class-style name for a table: `blog_post` → `BlogPost`. No
/// singularization is attempted.
pub fn entity_name(table: &str) -> String {
    let name = to_pascal_case(&to_snake_case(table));
    if name.starts_with(|ch: char| ch.is_ascii_digit()) {
        format!("T{name}")
    } else {
        rust_ident(&name)
    }
}

/// Field-style name for a column: `createdAt` → `created_at`.
pub fn field_name(column: &str) -> String {
    let name = to_snake_case(column);
    if name.starts_with(|ch: char| ch.is_ascii_digit()) {
        format!("c_{name}")
    } else {
        name
    }
}

/// Suffixes names that collide with Rust keywords: `type` → `type_`.
/// Raw identifiers are avoided because sea-orm derives column variants
/// from the field name (`r#type` would become `RType`).
pub fn rust_ident(name: &str) -> String {
    if is_keyword(name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

pub fn is_keyword(name: &str) -> bool {
    RESERVED_PATH_KEYWORDS.contains(&name) || RUST_KEYWORDS.contains(&name)
}

pub fn validate_ident(input: &str, label: &str) -> Result<(), String> {
    let mut chars = input.chars();
    let Some(first) = chars.next() else {
        return Err(format!("{label} cannot be empty"));
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(format!("{label} must start with a letter or underscore"));
    }
    if !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(format!("{label} must be alphanumeric or underscore"));
    }
    Ok(())
}

pub fn escape_rust_string(input: &str) -> String {
    input.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Hands out unique names, suffixing `2`, `3`, ... on collision.
#[derive(Debug, Default)]
pub struct NameAllocator {
    taken: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
