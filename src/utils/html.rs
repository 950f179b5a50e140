// src/utils/html.rs

/// Sanitises author- and student-supplied text with `ammonia`.
///
/// Question text, options and short answers are rendered to graders and
/// students, so tags like <script> are dropped together with their content
/// while harmless formatting (<b>, <p>) survives.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_but_keeps_formatting() {
        assert_eq!(clean_html("<b>bold</b><script>x()</script>"), "<b>bold</b>");
    }

    #[test]
    fn drops_event_handlers() {
        assert_eq!(clean_html(r#"<p onclick="steal()">hi</p>"#), "<p>hi</p>");
    }
}
