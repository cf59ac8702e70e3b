/// Replaces characters that would break out of a single path component.
pub fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .map(|ch| if is_disallowed_char(ch) { '_' } else { ch })
        .collect()
}

fn is_disallowed_char(ch: char) -> bool {
    matches!(ch, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
        || ch == '\0'
        || ch.is_control()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_separators_and_reserved_chars() {
        assert_eq!(sanitize_component("cam/../a"), "cam_.._a");
        assert_eq!(sanitize_component("A:B*C?"), "A_B_C_");
        assert_eq!(sanitize_component("tab\there"), "tab_here");
    }

    #[test]
    fn sanitize_keeps_ordinary_tokens() {
        assert_eq!(sanitize_component("ASR5"), "ASR5");
        assert_eq!(sanitize_component("0.016667"), "0.016667");
        assert_eq!(sanitize_component("-3"), "-3");
    }
}
