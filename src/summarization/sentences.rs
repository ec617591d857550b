//! Punctuation-driven sentence segmentation.

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "vs", "etc", "lt", "col", "gen",
    "sgt", "capt", "cmdr", "rev", "inc", "ltd", "u.s", "u.k", "e.g", "i.e",
];

/// Split `text` into trimmed, non-empty sentences.
///
/// A sentence ends at a run of `.`, `!` or `?` (optionally followed by closing quotes or
/// brackets) that is followed by whitespace or the end of the text. A lone period after a
/// known abbreviation or a single-letter initial does not end a sentence.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if !is_terminal(ch) {
            continue;
        }

        let mut end = idx + ch.len_utf8();
        let mut run_len = 1;
        while let Some(&(next_idx, next)) = chars.peek() {
            if is_terminal(next) {
                run_len += 1;
            } else if !is_closing(next) {
                break;
            }
            end = next_idx + next.len_utf8();
            chars.next();
        }

        let at_boundary = chars.peek().is_none_or(|&(_, next)| next.is_whitespace());
        if !at_boundary {
            continue;
        }
        if ch == '.' && run_len == 1 && ends_with_abbreviation(&text[start..idx]) {
            continue;
        }

        push_trimmed(&mut sentences, &text[start..end]);
        start = end;
    }

    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

/// Count whitespace-separated words.
pub(crate) fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

fn is_closing(ch: char) -> bool {
    matches!(ch, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}')
}

fn ends_with_abbreviation(preceding: &str) -> bool {
    let Some(word) = preceding.split_whitespace().last() else {
        return false;
    };
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    let mut letters = word.chars();
    if let (Some(first), None) = (letters.next(), letters.next())
        && first.is_alphabetic()
    {
        return true;
    }
    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }
}
