// src/utils/html.rs

/// Sanitizes admin-entered exam text (titles, descriptions, question and
/// option text) with ammonia's whitelist.
///
/// Harmless formatting tags such as `<b>` survive; `<script>` elements are
/// dropped together with their content, as are event-handler attributes.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
