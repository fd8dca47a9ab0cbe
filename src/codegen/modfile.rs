//! Keeps the destination `mod.rs` in step with generated entity files
//! without disturbing anything written by hand.

use crate::error::{ScaffoldError, ScaffoldResult};

pub const EMPTY_MOD_FILE: &str = "#[allow(unused_imports)]\npub mod prelude {\n}\n";

/// Adds `pub mod <module>;` and the prelude re-export for one entity.
/// Returns the new contents and whether anything changed.
pub fn update_entities_mod(
    contents: &str,
    module: &str,
    entity: &str,
) -> ScaffoldResult<(String, bool)> {
    let mut lines: Vec<String> = contents.lines().map(|line| line.to_string()).collect();
    let mut changed = false;

    if !lines.iter().any(|line| line.contains("pub mod prelude {")) {
        lines.splice(0..0, EMPTY_MOD_FILE.lines().map(str::to_string));
        changed = true;
    }

    let prelude_line = format!("    pub use super::{module}::Entity as {entity};");
    if !line_exists(&lines, &prelude_line) {
        insert_in_block(&mut lines, "pub mod prelude {", prelude_line)?;
        changed = true;
    }

    let mod_line = format!("pub mod {module};");
    if !line_exists(&lines, &mod_line) {
        insert_after_last_match(
            &mut lines,
            |line| {
                let line = line.trim();
                line.starts_with("pub mod ") && line.ends_with(';')
            },
            mod_line,
        );
        changed = true;
    }

    Ok((reconstruct(contents, &lines), changed))
}

fn line_exists(lines: &[String], line: &str) -> bool {
    lines.iter().any(|existing| existing.trim() == line.trim())
}

fn insert_in_block(lines: &mut Vec<String>, block_start: &str, new_line: String) -> ScaffoldResult<()> {
    let start_idx = lines
        .iter()
        .position(|line| line.contains(block_start))
        .ok_or_else(|| ScaffoldError::Template(format!("failed to find block '{block_start}'")))?;

    let mut depth = count_braces(&lines[start_idx]);
    let mut idx = start_idx + 1;
    while idx < lines.len() {
        depth += count_braces(&lines[idx]);
        if depth == 0 {
            lines.insert(idx, new_line);
            return Ok(());
        }
        idx += 1;
    }
    Err(ScaffoldError::Template(format!(
        "failed to locate end of block '{block_start}'"
    )))
}

fn insert_after_last_match(
    lines: &mut Vec<String>,
    predicate: impl Fn(&str) -> bool,
    new_line: String,
) {
    let insert_idx = lines
        .iter()
        .rposition(|line| predicate(line))
        .map(|idx| idx + 1);
    match insert_idx {
        Some(idx) => lines.insert(idx, new_line),
        None => lines.push(new_line),
    }
}

fn count_braces(line: &str) -> i32 {
    line.chars().fold(0, |count, ch| match ch {
        '{' => count + 1,
        '}' => count - 1,
        _ => count,
    })
}

fn reconstruct(original: &str, lines: &[String]) -> String {
    let mut out = lines.join("\n");
    if original.is_empty() || original.ends_with('\n') {
        out.push('\n');
    }
    out
}
