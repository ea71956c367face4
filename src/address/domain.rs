use super::ParseError;

pub(crate) fn is_domain_literal(domain: &str) -> bool {
    domain.starts_with('[') && domain.ends_with(']')
}

/// Conversion IDNA du domaine; un domain-literal est conservé tel quel.
pub(crate) fn ascii_domain(domain: &str) -> Result<String, ParseError> {
    if is_domain_literal(domain) {
        return Ok(domain.to_string());
    }
    let ascii = idna::domain_to_ascii(domain).map_err(|_| ParseError::invalid_domain(domain))?;
    if ascii.is_empty() {
        return Err(ParseError::invalid_domain(domain));
    }
    for label in ascii.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(ParseError::invalid_domain(domain));
        }
    }
    Ok(ascii)
}
