/// Lowercased alphanumeric runs of `text`, in order.
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether `phrase` (already tokenized) occurs in `tokens` as a contiguous
/// run. The last word of the phrase also matches with a trailing plural `s`.
pub fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    let Some((last, head)) = phrase.split_last() else {
        return false;
    };
    if tokens.len() < phrase.len() {
        return false;
    }
    tokens.windows(phrase.len()).any(|w| {
        let (w_last, w_head) = (&w[w.len() - 1], &w[..w.len() - 1]);
        w_head == head && (w_last == last || w_last.strip_suffix('s') == Some(last.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_punctuation_and_lowercases() {
        assert_eq!(tokens("Explain Ohm's law!"), vec!["explain", "ohm", "s", "law"]);
        assert!(tokens(" -- ").is_empty());
    }

    #[test]
    fn phrases_match_whole_tokens_and_plurals() {
        let q = tokens("Explain Ohm's law and transistors");
        assert!(contains_phrase(&q, &tokens("ohm")));
        assert!(contains_phrase(&q, &tokens("ohm's law")));
        assert!(contains_phrase(&q, &tokens("transistor")));
        assert!(!contains_phrase(&q, &tokens("law ohm")));
        assert!(!contains_phrase(&tokens("phone"), &tokens("ph")));
        assert!(!contains_phrase(&q, &[]));
    }
}
