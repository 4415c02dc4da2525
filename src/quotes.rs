//! Quoting of `#error` directive messages.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_ERROR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#\s*error\s*(.+?)\s*$").unwrap());

/// Fixed line text when an `#error` message is missing quotes.
///
/// A leading and a trailing quote are added independently, so a message
/// missing only one side gains only that side. `None` when the line is not
/// an `#error` directive or is already fully quoted.
pub fn quote_error_directive(text: &str) -> Option<String> {
    let caps = RE_ERROR.captures(text)?;
    let message = caps.get(1)?;
    let mut fixed = message.as_str().to_string();
    if !fixed.starts_with('"') {
        fixed.insert(0, '"');
    }
    if !fixed.ends_with('"') {
        fixed.push('"');
    }
    if fixed == message.as_str() {
        return None;
    }
    Some(format!(
        "{}{}{}",
        &text[..message.start()],
        fixed,
        &text[message.end()..]
    ))
}
