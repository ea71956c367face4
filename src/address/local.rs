/// atext (RFC 5322 §3.2.3), UTF-8 autorisé (RFC 6532).
pub(crate) fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || (!c.is_ascii() && !c.is_control())
        || matches!(
            c,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '/'
                | '='
                | '?'
                | '^'
                | '_'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
}

/// dot-atom-text: atext + '.' non initial/terminal, pas de ".."
pub(crate) fn is_dot_atom(s: &str) -> bool {
    if s.is_empty() || s.starts_with('.') || s.ends_with('.') || s.contains("..") {
        return false;
    }
    s.chars().all(|c| c == '.' || is_atext(c))
}

/// Forme canonique d'une partie locale: telle quelle si dot-atom,
/// sinon quoted-string avec échappement de `\` et `"`.
pub(crate) fn canonical_local(local: &str) -> String {
    if is_dot_atom(local) {
        return local.to_string();
    }
    let mut out = String::with_capacity(local.len() + 2);
    out.push('"');
    for c in local.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
