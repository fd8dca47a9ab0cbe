/// A declared column type split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlType {
    pub name: String,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: bool,
}

const SIZED_BY_PRECISION: &[&str] = &["decimal", "numeric", "dec", "number"];

/// Parses declarations such as `VARCHAR(100)`, `numeric(10, 2)` or
/// `bigint(20) unsigned`. Arguments of string-like types become the length,
/// arguments of fixed-point types become precision and scale. Arguments of
/// any other type (display widths like `bigint(20)`) are dropped.
pub fn parse_sql_type(raw: &str) -> SqlType {
    let lowered = raw.trim().to_ascii_lowercase();
    let (head, args, tail) = match (lowered.find('('), lowered.rfind(')')) {
        (Some(open), Some(close)) if close > open => (
            lowered[..open].trim(),
            Some(&lowered[open + 1..close]),
            lowered[close + 1..].trim(),
        ),
        _ => (lowered.as_str(), None, ""),
    };

    let mut words: Vec<&str> = head.split_whitespace().collect();
    words.extend(tail.split_whitespace());
    let unsigned = words.contains(&"unsigned");
    words.retain(|word| !matches!(*word, "unsigned" | "zerofill"));
    let name = words.join(" ");

    let numbers: Vec<u32> = args
        .map(|args| {
            args.split(',')
                .filter_map(|part| part.trim().parse::<u32>().ok())
                .collect()
        })
        .unwrap_or_default();

    let mut sql_type = SqlType {
        name,
        unsigned,
        ..SqlType::default()
    };

    if SIZED_BY_PRECISION.contains(&sql_type.name.as_str()) {
        sql_type.precision = numbers.first().copied();
        sql_type.scale = numbers.get(1).copied();
    } else if is_length_sized(&sql_type.name) {
        sql_type.length = numbers.first().copied();
    }
    sql_type
}

fn is_length_sized(name: &str) -> bool {
    name.contains("char") || name.contains("binary") || name == "bit varying"
}
