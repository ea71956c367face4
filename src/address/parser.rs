use super::ParseError;
use super::local::{is_atext, is_dot_atom};

/// Raw pieces of a parsed mailbox, before canonicalisation.
#[derive(Debug)]
pub(crate) struct Mailbox {
    pub display_name: Option<String>,
    pub local: String,
    pub domain: String,
}

/// Parses `name-addr / addr-spec` (RFC 5322 §3.4).
///
/// The bare `addr-spec` form is tried first; when it does not consume the
/// whole input the parser backs up and reads a display name followed by
/// `<addr-spec>`.
pub(crate) fn parse_mailbox(input: &str) -> Result<Mailbox, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut cursor = Cursor::new(input);
    cursor.skip_cfws()?;
    let start = cursor.pos;

    let mut first_err = None;
    if cursor.peek() != Some('<') {
        match cursor.addr_spec() {
            Ok((local, domain)) => {
                cursor.skip_cfws()?;
                if cursor.is_empty() {
                    return Ok(Mailbox {
                        display_name: None,
                        local,
                        domain,
                    });
                }
                first_err = Some(ParseError::trailing(cursor.rest()));
            }
            Err(err) => first_err = Some(err),
        }
        cursor.pos = start;
    }

    let display_name = cursor.phrase()?;
    cursor.skip_cfws()?;
    if !cursor.eat('<') {
        return Err(match (first_err, cursor.peek()) {
            (Some(err), _) => err,
            (None, Some(ch)) => ParseError::UnexpectedChar {
                ch,
                position: cursor.pos,
            },
            (None, None) => ParseError::MissingAt,
        });
    }

    let (local, domain) = cursor.addr_spec()?;
    cursor.skip_cfws()?;
    if !cursor.eat('>') {
        return Err(ParseError::UnclosedAngle);
    }
    cursor.skip_cfws()?;
    if !cursor.is_empty() {
        return Err(ParseError::trailing(cursor.rest()));
    }

    Ok(Mailbox {
        display_name,
        local,
        domain,
    })
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    /// Skips folding white space and (nested) comments.
    fn skip_cfws(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(c) if is_wsp(c) => {
                    self.bump();
                }
                Some('(') => self.skip_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            match self.bump() {
                Some('(') => depth += 1,
                Some(')') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some('\\') => {
                    self.bump().ok_or(ParseError::UnterminatedComment)?;
                }
                Some(_) => {}
                None => return Err(ParseError::UnterminatedComment),
            }
        }
    }

    /// Reads atext and dots; validation is left to the caller.
    fn dot_atom_text(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '.' || is_atext(c) {
                self.bump();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Reads a quoted-string and returns its unescaped content.
    ///
    /// Folding (CRLF followed by WSP) is unfolded; any other control
    /// character, escaped or not, is refused so it can never reach an SMTP
    /// command line.
    fn quoted_string(&mut self) -> Result<String, ParseError> {
        debug_assert_eq!(self.peek(), Some('"'));
        self.bump();
        let mut out = String::new();
        loop {
            let position = self.pos;
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => {
                    let position = self.pos;
                    let c = self.bump().ok_or(ParseError::UnterminatedQuote)?;
                    if is_forbidden_control(c) {
                        return Err(ParseError::UnexpectedChar { ch: c, position });
                    }
                    out.push(c);
                }
                Some('\r') if self.rest().starts_with('\n') && self.folds_after(1) => {
                    self.bump();
                }
                Some(c) if is_forbidden_control(c) => {
                    return Err(ParseError::UnexpectedChar { ch: c, position });
                }
                Some(c) => out.push(c),
                None => return Err(ParseError::UnterminatedQuote),
            }
        }
    }

    /// Whether the character `offset` bytes ahead is WSP (end of a fold).
    fn folds_after(&self, offset: usize) -> bool {
        matches!(self.rest()[offset..].chars().next(), Some(' ' | '\t'))
    }

    fn addr_spec(&mut self) -> Result<(String, String), ParseError> {
        self.skip_cfws()?;
        let local = if self.peek() == Some('"') {
            let quoted = self.quoted_string()?;
            if quoted.is_empty() {
                return Err(ParseError::EmptyLocalPart);
            }
            quoted
        } else {
            let text = self.dot_atom_text();
            if text.is_empty() {
                return Err(if self.peek() == Some('@') {
                    ParseError::EmptyLocalPart
                } else {
                    ParseError::MissingAt
                });
            }
            if !is_dot_atom(text) {
                return Err(ParseError::invalid_local(text));
            }
            text.to_string()
        };
        self.skip_cfws()?;

        if !self.eat('@') {
            return Err(ParseError::MissingAt);
        }

        self.skip_cfws()?;
        let domain = match self.peek() {
            Some('[') => self.domain_literal()?,
            _ => {
                let text = self.dot_atom_text();
                if text.is_empty() {
                    return Err(ParseError::EmptyDomain);
                }
                if !is_dot_atom(text) {
                    return Err(ParseError::invalid_domain(text));
                }
                text.to_string()
            }
        };
        Ok((local, domain))
    }

    fn domain_literal(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.bump();
        loop {
            match self.bump() {
                Some(']') => break,
                Some('[' | '\\') | None => {
                    return Err(ParseError::invalid_domain(&self.input[start..self.pos]));
                }
                Some(c) if c.is_control() || is_wsp(c) => {
                    return Err(ParseError::UnexpectedChar {
                        ch: c,
                        position: self.pos - c.len_utf8(),
                    });
                }
                Some(_) => {}
            }
        }
        let literal = &self.input[start..self.pos];
        if literal.len() <= 2 {
            return Err(ParseError::EmptyDomain);
        }
        Ok(literal.to_string())
    }

    /// Display name: words (atoms or quoted strings, obs-phrase dots
    /// allowed) separated by CFWS. Returns `None` when no word is present.
    fn phrase(&mut self) -> Result<Option<String>, ParseError> {
        let mut words = Vec::new();
        loop {
            self.skip_cfws()?;
            match self.peek() {
                Some('"') => words.push(self.quoted_string()?),
                Some(c) if c == '.' || is_atext(c) => words.push(self.dot_atom_text().to_string()),
                _ => break,
            }
        }
        if words.is_empty() {
            Ok(None)
        } else {
            Ok(Some(words.join(" ")))
        }
    }
}

fn is_wsp(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Control characters other than horizontal tab.
fn is_forbidden_control(c: char) -> bool {
    c.is_control() && c != '\t'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_skipped() {
        let m = parse_mailbox("(hi) foo@bar.com (there)").unwrap();
        assert_eq!(m.local, "foo");
        assert_eq!(m.domain, "bar.com");
    }

    #[test]
    fn nested_comment_unterminated() {
        let err = parse_mailbox("foo@bar.com (a (b)").unwrap_err();
        assert_eq!(err, ParseError::UnterminatedComment);
    }

    #[test]
    fn quoted_display_name() {
        let m = parse_mailbox("\"Bar, Foo\" <foo@bar.com>").unwrap();
        assert_eq!(m.display_name.as_deref(), Some("Bar, Foo"));
    }

    #[test]
    fn domain_literal() {
        let m = parse_mailbox("postmaster@[192.0.2.1]").unwrap();
        assert_eq!(m.domain, "[192.0.2.1]");
    }

    #[test]
    fn unclosed_angle() {
        let err = parse_mailbox("Foo <foo@bar.com").unwrap_err();
        assert_eq!(err, ParseError::UnclosedAngle);
    }

    #[test]
    fn unterminated_quote() {
        let err = parse_mailbox("\"foo@bar.com").unwrap_err();
        assert_eq!(err, ParseError::UnterminatedQuote);
    }

    #[test]
    fn stray_character_in_name() {
        let err = parse_mailbox("foo, bar <a@b.com>").unwrap_err();
        assert!(matches!(err, ParseError::MissingAt), "{err:?}");
    }
}
