use std::sync::LazyLock;

use regex::Regex;

pub const NAME_MIN_LENGTH: usize = 2;
pub const NAME_MAX_LENGTH: usize = 100;

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ .:/]").unwrap());
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_-]").unwrap());
static DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());
static TRAILING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?[_-]((?:\d{2,4}[-/])?\d{2,4})$").unwrap());

/// Turns a free-text title into a catalog name: lowercase ASCII letters,
/// digits, `-` and `_`, between 2 and 100 characters long.
pub fn title_to_name(title: &str) -> String {
    let folded = fold_to_ascii(title);
    let name = SEPARATORS.replace_all(&folded, "-");
    let name = DISALLOWED.replace_all(&name, "").to_lowercase();
    let name = DASHES.replace_all(&name, "-");
    let mut name = name.trim_matches('-').to_string();

    // leave room for de-clashing suffixes
    let max_length = NAME_MAX_LENGTH - 5;
    if name.len() > max_length {
        name = match TRAILING_YEAR.captures(&name) {
            Some(caps) => {
                let year = caps[1].to_string();
                format!("{}-{}", &name[..max_length - year.len() - 1], year)
            }
            None => name[..max_length].to_string(),
        };
    }

    to_length(name, NAME_MIN_LENGTH, NAME_MAX_LENGTH)
}

fn to_length(mut name: String, min: usize, max: usize) -> String {
    while name.len() < min {
        name.push('_');
    }
    name.truncate(max);
    name
}

fn fold_to_ascii(value: &str) -> String {
    let mut folded = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            'À' | 'Á' | 'Â' | 'Ã' | 'Å' => folded.push('A'),
            'Ä' | 'Æ' => folded.push_str("Ae"),
            'Ç' => folded.push('C'),
            'È' | 'É' | 'Ê' | 'Ë' => folded.push('E'),
            'Ì' | 'Í' | 'Î' | 'Ï' => folded.push('I'),
            'Ð' => folded.push('D'),
            'Ñ' => folded.push('N'),
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ø' => folded.push('O'),
            'Ö' => folded.push_str("Oe"),
            'Ù' | 'Ú' | 'Û' => folded.push('U'),
            'Ü' => folded.push_str("Ue"),
            'Ý' => folded.push('Y'),
            'Þ' => folded.push_str("TH"),
            'ß' => folded.push_str("ss"),
            'à' | 'á' | 'â' | 'ã' | 'å' => folded.push('a'),
            'ä' | 'æ' => folded.push_str("ae"),
            'ç' => folded.push('c'),
            'è' | 'é' | 'ê' | 'ë' => folded.push('e'),
            'ì' | 'í' | 'î' | 'ï' => folded.push('i'),
            'ð' => folded.push('d'),
            'ñ' => folded.push('n'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ø' => folded.push('o'),
            'ö' => folded.push_str("oe"),
            'ù' | 'ú' | 'û' => folded.push('u'),
            'ü' => folded.push_str("ue"),
            'ý' | 'ÿ' => folded.push('y'),
            'þ' => folded.push_str("th"),
            other => folded.push(other),
        }
    }
    folded
}
