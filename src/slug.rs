const FALLBACK: &str = "untitled";
const MAX_LEN: usize = 120;

/// Turns a display name into a single filesystem-safe path segment.
///
/// Alphanumeric characters are lowercased and kept; every other run of
/// characters collapses into one `-`. The result never starts or ends with
/// `-`, never contains separators or dots, and is never empty.
///
/// Slugifying a slug returns it unchanged.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if out.len() >= MAX_LEN {
            break;
        }

        // Lowercasing may yield combining marks (`İ` -> `i\u{307}`); drop them.
        let mut lowered = ch.to_lowercase().filter(|c| c.is_alphanumeric()).peekable();
        if lowered.peek().is_none() {
            pending_dash = true;
            continue;
        }

        if pending_dash && !out.is_empty() {
            out.push('-');
        }
        pending_dash = false;
        out.extend(lowered);
    }

    if out.is_empty() {
        return FALLBACK.to_owned();
    }
    out
}
