//! English inflection and case conversion helpers.
//!
//! # Responsibility
//! - Convert between `snake_case`, `CamelCase` and namespaced forms
//!   (`admin/user` <-> `Admin.User`).
//! - Pluralize and singularize model names.
//!
//! # Invariants
//! - Every helper is a pure function of its input.
//! - Rules are tried in priority order; the first matching rule wins.
//! - Already-plural input passes through `pluralize` unchanged.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static CAMELIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(_|(/))([a-z\d]*)").expect("valid camelize regex"));
static UNDERSCORE_ACRONYM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z\d]+)([A-Z][a-z])").expect("valid acronym regex"));
static UNDERSCORE_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z\d])([A-Z])").expect("valid word boundary regex"));
static TITLEIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b('?[a-z])").expect("valid titleize regex"));

static PLURAL_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    compile_rules(&[
        (r"(?i)(quiz)$", "${1}zes"),
        (r"(?i)^(oxen)$", "${1}"),
        (r"(?i)^(ox)$", "${1}en"),
        (r"(?i)^(m|l)ice$", "${1}ice"),
        (r"(?i)^(m|l)ouse$", "${1}ice"),
        (r"(?i)(matr|vert|ind)(?:ix|ex)$", "${1}ices"),
        (r"(?i)(x|ch|ss|sh)$", "${1}es"),
        (r"(?i)([^aeiouy]|qu)y$", "${1}ies"),
        (r"(?i)(hive)$", "${1}s"),
        (r"(?i)(?:([^f])fe|([lr])f)$", "${1}${2}ves"),
        (r"(?i)sis$", "ses"),
        (r"(?i)([ti])a$", "${1}a"),
        (r"(?i)([ti])um$", "${1}a"),
        (r"(?i)(buffal|tomat)o$", "${1}oes"),
        (r"(?i)(bu)s$", "${1}ses"),
        (r"(?i)(alias|status)$", "${1}es"),
        (r"(?i)(octop|vir)i$", "${1}i"),
        (r"(?i)(octop|vir)us$", "${1}i"),
        (r"(?i)^(ax|test)is$", "${1}es"),
        (r"(?i)s$", "s"),
        (r"$", "s"),
    ])
});

static SINGULAR_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    compile_rules(&[
        (r"(?i)(database)s$", "${1}"),
        (r"(?i)(quiz)zes$", "${1}"),
        (r"(?i)(matr)ices$", "${1}ix"),
        (r"(?i)(vert|ind)ices$", "${1}ex"),
        (r"(?i)^(ox)en", "${1}"),
        (r"(?i)(alias|status)(es)?$", "${1}"),
        (r"(?i)(octop|vir)(us|i)$", "${1}us"),
        (r"(?i)^(a)x[ie]s$", "${1}xis"),
        (r"(?i)(cris|test)(is|es)$", "${1}is"),
        (r"(?i)(shoe)s$", "${1}"),
        (r"(?i)(o)es$", "${1}"),
        (r"(?i)(bus)(es)?$", "${1}"),
        (r"(?i)^(m|l)ice$", "${1}ouse"),
        (r"(?i)(x|ch|ss|sh)es$", "${1}"),
        (r"(?i)(m)ovies$", "${1}ovie"),
        (r"(?i)(s)eries$", "${1}eries"),
        (r"(?i)([^aeiouy]|qu)ies$", "${1}y"),
        (r"(?i)([lr])ves$", "${1}f"),
        (r"(?i)(tive)s$", "${1}"),
        (r"(?i)(hive)s$", "${1}"),
        (r"(?i)([^f])ves$", "${1}fe"),
        (r"(?i)(^analy)(sis|ses)$", "${1}sis"),
        (
            r"(?i)((a)naly|(b)a|(d)iagno|(p)arenthe|(p)rogno|(s)ynop|(t)he)(sis|ses)$",
            "${1}sis",
        ),
        (r"(?i)([ti])a$", "${1}um"),
        (r"(?i)(n)ews$", "${1}ews"),
        (r"(?i)(ss)$", "${1}"),
        (r"(?i)s$", ""),
    ])
});

/// `(singular, plural)` pairs that no suffix rule covers.
const IRREGULARS: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
    ("zombie", "zombies"),
];

const UNCOUNTABLES: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
];

fn compile_rules(rules: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    rules
        .iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("valid inflection rule"),
                *replacement,
            )
        })
        .collect()
}

/// Uppercases the first character.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercases the first character.
pub fn anticapitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Converts `snake_case` paths to `CamelCase` namespaces.
///
/// `active_model/errors` becomes `ActiveModel.Errors`, or
/// `activeModel.Errors` when `upper_first` is false.
pub fn camelize(word: &str, upper_first: bool) -> String {
    let head = if upper_first {
        capitalize(word)
    } else {
        anticapitalize(word)
    };
    let joined = CAMELIZE_RE.replace_all(&head, |caps: &Captures<'_>| {
        let slash = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        format!("{slash}{}", capitalize(&caps[3]))
    });
    joined.replace('/', ".")
}

/// Converts `CamelCase` namespaces to `snake_case` paths.
///
/// `ActiveModel.Errors` becomes `active_model/errors`.
pub fn underscore(word: &str) -> String {
    let pathed = word.replace('.', "/");
    let split_acronyms = UNDERSCORE_ACRONYM_RE.replace_all(&pathed, "${1}_${2}");
    let split_words = UNDERSCORE_WORD_RE.replace_all(&split_acronyms, "${1}_${2}");
    split_words.replace('-', "_").to_lowercase()
}

/// Lowercases, strips a trailing `_id`, turns underscores into spaces and
/// capitalizes the first word.
pub fn humanize(word: &str) -> String {
    let lowered = word.to_lowercase();
    let stripped = lowered.strip_suffix("_id").unwrap_or(&lowered);
    capitalize(&stripped.replace('_', " "))
}

/// Capitalizes every word of the humanized, underscored form.
pub fn titleize(word: &str) -> String {
    let humanized = humanize(&underscore(word));
    TITLEIZE_RE
        .replace_all(&humanized, |caps: &Captures<'_>| caps[1].to_uppercase())
        .into_owned()
}

/// Removes the namespace part: `Admin.User` becomes `User`.
pub fn demodulize(word: &str) -> String {
    match word.rfind('.') {
        Some(index) => word[index + 1..].to_string(),
        None => word.to_string(),
    }
}

/// Returns the plural form of `word`.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || is_uncountable(word) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULARS {
        if ends_with_word(word, plural) {
            return word.to_string();
        }
        if ends_with_word(word, singular) {
            return replace_suffix(word, singular.len(), plural);
        }
    }
    apply_rules(&PLURAL_RULES, word)
}

/// Returns the singular form of `word`.
pub fn singularize(word: &str) -> String {
    if word.is_empty() || is_uncountable(word) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULARS {
        if ends_with_word(word, singular) {
            return word.to_string();
        }
        if ends_with_word(word, plural) {
            return replace_suffix(word, plural.len(), singular);
        }
    }
    apply_rules(&SINGULAR_RULES, word)
}

fn apply_rules(rules: &[(Regex, &'static str)], word: &str) -> String {
    for (rule, replacement) in rules {
        if rule.is_match(word) {
            return rule.replace(word, *replacement).into_owned();
        }
    }
    word.to_string()
}

fn is_uncountable(word: &str) -> bool {
    let lowered = word.to_lowercase();
    UNCOUNTABLES
        .iter()
        .any(|uncountable| ends_with_word(&lowered, uncountable))
}

/// True when `word` is `suffix` or ends with `_suffix`, ignoring case.
fn ends_with_word(word: &str, suffix: &str) -> bool {
    let lowered = word.to_lowercase();
    if lowered == suffix {
        return true;
    }
    lowered.ends_with(suffix) && lowered[..lowered.len() - suffix.len()].ends_with('_')
}

fn replace_suffix(word: &str, suffix_len: usize, replacement: &str) -> String {
    let split = word.len() - suffix_len;
    let (prefix, old) = word.split_at(split);
    let starts_upper = old.chars().next().is_some_and(char::is_uppercase);
    if starts_upper {
        format!("{prefix}{}", capitalize(replacement))
    } else {
        format!("{prefix}{replacement}")
    }
}
