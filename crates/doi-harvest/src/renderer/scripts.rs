//! JavaScript snippets evaluated inside page frames.
//!
//! ## Security: JS encoding
//!
//! Selector strings and labels are sanitized before injection and only ever
//! placed inside string literals, never into code positions.

use crate::retrieval::affordance::{Affordance, VIEWER_SELECTORS};

/// Visibility test: a non-empty box that is not hidden by style.
const IS_VISIBLE: &str = r#"const isVisible = (el) => {
        const r = el.getBoundingClientRect();
        if (r.width <= 0 || r.height <= 0) return false;
        const s = window.getComputedStyle(el);
        return s.visibility !== 'hidden' && s.display !== 'none';
    };"#;

/// JS expression evaluating to an array of candidate elements.
fn candidates_expr(affordance: &Affordance) -> String {
    match affordance {
        Affordance::Css(selector) => format!(
            "Array.from(document.querySelectorAll('{}'))",
            sanitize_js_string(selector)
        ),
        Affordance::HasText { tag, text } => format!(
            "Array.from(document.querySelectorAll('{}')).filter((el) => \
             (el.innerText || el.textContent || '').toLowerCase().includes('{}'))",
            sanitize_js_string(tag),
            sanitize_js_string(&text.to_lowercase())
        ),
    }
}

/// Click the first visible element matching `affordance`; evaluates to
/// `true` when something was clicked. Invalid selectors evaluate to `false`.
pub fn click_first_visible_script(affordance: &Affordance) -> String {
    format!(
        r#"(() => {{
    {IS_VISIBLE}
    try {{
        const el = {}.find(isVisible);
        if (!el) return false;
        el.click();
        return true;
    }} catch (e) {{
        return false;
    }}
}})()"#,
        candidates_expr(affordance)
    )
}

/// Try each consent control in order and click the first visible one.
/// Evaluates to the index of the clicked control, or -1.
pub fn consent_pass_script(controls: &[Affordance]) -> String {
    let finders = controls
        .iter()
        .map(|c| format!("() => {}", candidates_expr(c)))
        .collect::<Vec<_>>()
        .join(",\n        ");
    format!(
        r#"(() => {{
    {IS_VISIBLE}
    const finders = [
        {finders}
    ];
    for (let i = 0; i < finders.length; i++) {{
        try {{
            const el = finders[i]().find(isVisible);
            if (el) {{ el.click(); return i; }}
        }} catch (e) {{}}
    }}
    return -1;
}})()"#
    )
}

/// Evaluates to the absolute `src`/`data` URLs of embedded PDF viewers.
pub fn viewer_sources_script() -> String {
    let selector = VIEWER_SELECTORS
        .iter()
        .map(|s| sanitize_js_string(s))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"(() => {{
    const out = [];
    for (const el of document.querySelectorAll('{selector}')) {{
        const raw = el.getAttribute('src') || el.getAttribute('data');
        if (!raw) continue;
        try {{ out.push(new URL(raw, document.baseURI).href); }} catch (e) {{}}
    }}
    return out;
}})()"#
    )
}

/// Sanitize a string for safe injection into a JavaScript string literal.
///
/// Escapes backslashes, quotes, backticks and line breaks, strips null
/// bytes, and hex-escapes angle brackets.
pub fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_js_string() {
        assert_eq!(sanitize_js_string(r#"a[href$=".pdf"]"#), r#"a[href$=\".pdf\"]"#);
        assert_eq!(sanitize_js_string("it's"), "it\\'s");
        assert_eq!(sanitize_js_string("</script>"), "\\x3c/script\\x3e");
    }

    #[test]
    fn test_has_text_script_lowercases_label() {
        let js = click_first_visible_script(&Affordance::has_text("a", "Download PDF"));
        assert!(js.contains("querySelectorAll('a')"));
        assert!(js.contains(".includes('download pdf')"));
        assert!(js.contains("el.click()"));
    }

    #[test]
    fn test_consent_script_keeps_order() {
        let controls = vec![
            Affordance::css("#onetrust-accept-btn-handler"),
            Affordance::has_text("button", "Accept"),
        ];
        let js = consent_pass_script(&controls);
        let first = js.find("onetrust").unwrap();
        let second = js.find("includes('accept')").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_viewer_script_covers_selectors() {
        let js = viewer_sources_script();
        assert!(js.contains(r#"embed[type=\"application/pdf\"]"#));
        assert!(js.contains("document.baseURI"));
    }
}
