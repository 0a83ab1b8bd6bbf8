//! Named keys and their WebDriver code points.
//!
//! Recorded key events carry names such as `CTRL` or `ENTER`; typed text may
//! embed the same names in braces (`"abc{ENTER}"`).

pub fn key_code(name: &str) -> Option<char> {
    let code = match name.to_ascii_uppercase().as_str() {
        "NULL" => '\u{E000}',
        "CANCEL" => '\u{E001}',
        "HELP" => '\u{E002}',
        "BACK_SPACE" | "BACKSPACE" => '\u{E003}',
        "TAB" => '\u{E004}',
        "CLEAR" => '\u{E005}',
        "RETURN" => '\u{E006}',
        "ENTER" => '\u{E007}',
        "SHIFT" => '\u{E008}',
        "CTRL" | "CONTROL" => '\u{E009}',
        "ALT" => '\u{E00A}',
        "PAUSE" => '\u{E00B}',
        "ESC" | "ESCAPE" => '\u{E00C}',
        "SPACE" => '\u{E00D}',
        "PAGE_UP" | "PAGEUP" => '\u{E00E}',
        "PAGE_DOWN" | "PAGEDOWN" => '\u{E00F}',
        "END" => '\u{E010}',
        "HOME" => '\u{E011}',
        "LEFT" => '\u{E012}',
        "UP" => '\u{E013}',
        "RIGHT" => '\u{E014}',
        "DOWN" => '\u{E015}',
        "INSERT" => '\u{E016}',
        "DELETE" => '\u{E017}',
        "F1" => '\u{E031}',
        "F2" => '\u{E032}',
        "F3" => '\u{E033}',
        "F4" => '\u{E034}',
        "F5" => '\u{E035}',
        "F6" => '\u{E036}',
        "F7" => '\u{E037}',
        "F8" => '\u{E038}',
        "F9" => '\u{E039}',
        "F10" => '\u{E03A}',
        "F11" => '\u{E03B}',
        "F12" => '\u{E03C}',
        "META" | "CMD" | "COMMAND" => '\u{E03D}',
        _ => return None,
    };
    Some(code)
}

/// Code point for a key-event name; a single character stands for itself.
pub fn resolve_key(name: &str) -> Option<char> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => key_code(name),
    }
}

/// Replace `{NAME}` tokens with key code points. Unknown tokens stay literal.
pub fn expand_keys(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}').and_then(|close| Some((close, key_code(&after[..close])?))) {
            Some((close, code)) => {
                output.push(code);
                rest = &after[close + 1..];
            }
            None => {
                output.push('{');
                rest = after;
            }
        }
    }

    output.push_str(rest);
    output
}
