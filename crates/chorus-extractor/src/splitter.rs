//! Structural splitting of provider text
//!
//! A text splits into blocks on blank lines; within a block, list items are
//! one unit each and prose runs split at sentence terminators. Terminators
//! inside decimals, known abbreviations, and ellipses do not split.

/// Split a provider answer into blocks of statement-sized units.
///
/// Each inner vector corresponds to one source block and becomes one
/// paragraph; each unit becomes one statement.
pub fn split_blocks(text: &str) -> Vec<Vec<String>> {
    let mut blocks = Vec::new();
    for raw_block in text.split("\n\n") {
        let units = split_block(raw_block);
        if !units.is_empty() {
            blocks.push(units);
        }
    }
    blocks
}

fn split_block(block: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut prose = String::new();

    for line in block.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(item) = list_item_text(line) {
            flush_prose(&mut prose, &mut units);
            let item = strip_inline_markup(item);
            if !item.is_empty() {
                units.push(item);
            }
        } else {
            let line = strip_heading(line);
            if !prose.is_empty() {
                prose.push(' ');
            }
            prose.push_str(line);
        }
    }
    flush_prose(&mut prose, &mut units);
    units
}

fn flush_prose(prose: &mut String, units: &mut Vec<String>) {
    if !prose.is_empty() {
        for sentence in split_sentences(prose) {
            let sentence = strip_inline_markup(&sentence);
            if !sentence.is_empty() {
                units.push(sentence);
            }
        }
        prose.clear();
    }
}

/// The content of a list item line, if the line is one.
fn list_item_text(line: &str) -> Option<&str> {
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    // Numbered items: "1. text" or "2) text".
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(rest.trim());
        }
    }
    None
}

fn strip_heading(line: &str) -> &str {
    let stripped = line.trim_start_matches('#');
    if stripped.len() < line.len() {
        stripped.trim_start()
    } else {
        line
    }
}

fn strip_inline_markup(text: &str) -> String {
    text.replace("**", "").replace('`', "").trim().to_string()
}

const ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "etc", "vs", "cf", "al", "dr", "mr", "mrs", "ms", "prof", "approx",
];

/// Split a prose run at sentence terminators.
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '.' || c == '!' || c == '?' {
            // Swallow terminator runs ("?!", "...").
            let mut end = i + 1;
            while end < chars.len() && matches!(chars[end], '.' | '!' | '?') {
                end += 1;
            }
            let run_len = end - i;

            let at_end = end >= chars.len();
            let followed_by_space = !at_end && chars[end].is_whitespace();
            let is_ellipsis = c == '.' && run_len > 1;
            let boundary = (at_end || followed_by_space)
                && !is_ellipsis
                && !(c == '.' && ends_with_abbreviation(&chars[start..i]));

            if boundary {
                let sentence: String = chars[start..end].iter().collect();
                let sentence = sentence.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = end;
            }
            i = end;
        } else {
            i += 1;
        }
    }

    let tail: String = chars[start..].iter().collect();
    let tail = tail.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Whether the text immediately before a period ends in a known abbreviation.
fn ends_with_abbreviation(before: &[char]) -> bool {
    let word: String = before
        .iter()
        .rev()
        .take_while(|c| c.is_alphanumeric() || **c == '.')
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let word = word.trim_end_matches('.').to_lowercase();
    ABBREVIATIONS.contains(&word.as_str())
}
