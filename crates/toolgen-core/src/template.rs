use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::inputs::InputValues;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder regex is valid"))
}

/// Replace every `{{identifier}}` token with its value.
///
/// Tokens without a matching value are left verbatim. An empty value counts as
/// missing, so its token is kept too.
pub fn render(template: &str, values: &InputValues) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) if !value.is_empty() => value.clone(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> InputValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_known_key() {
        let rendered = render("Write about {{topic}}", &values(&[("topic", "cats")]));
        assert_eq!(rendered, "Write about cats");
    }

    #[test]
    fn test_render_leaves_unknown_key() {
        let v = values(&[("topic", "cats")]);
        let first = render("{{topic}} and {{unknownKey}}", &v);
        let second = render("{{topic}} and {{unknownKey}}", &v);
        assert_eq!(first, "cats and {{unknownKey}}");
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_repeated_key_is_consistent() {
        let rendered = render("{{a}}-{{a}}-{{a}}", &values(&[("a", "x")]));
        assert_eq!(rendered, "x-x-x");
    }

    #[test]
    fn test_render_empty_value_keeps_token() {
        let rendered = render("Hello {{name}}", &values(&[("name", "")]));
        assert_eq!(rendered, "Hello {{name}}");
    }

    #[test]
    fn test_render_ignores_non_identifier_tokens() {
        let v = values(&[("a b", "x")]);
        assert_eq!(render("{{a b}} {{}} {a}", &v), "{{a b}} {{}} {a}");
    }

    #[test]
    fn test_render_value_containing_braces_is_not_rescanned() {
        let v = values(&[("a", "{{b}}"), ("b", "nope")]);
        assert_eq!(render("{{a}}", &v), "{{b}}");
    }
}
