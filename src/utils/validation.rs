use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("static regex")
});

static DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9.\-]+\.[a-z]{2,}$").expect("static regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Lowercased domain part of a well-formed address.
pub fn email_domain(email: &str) -> Option<String> {
    if !is_valid_email(email) {
        return None;
    }
    email.rsplit_once('@').map(|(_, d)| d.to_lowercase())
}

/// Lowercases and checks the shape of a bare domain, e.g. `aau.edu.et`.
pub fn normalize_domain(domain: &str) -> Option<String> {
    let domain = domain.trim().to_lowercase();
    DOMAIN_RE.is_match(&domain).then_some(domain)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("abebe.kebede@gmail.com"));
        assert!(is_valid_email("a+tag@aau.edu.et"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@gmail.com"));
    }

    #[test]
    fn domain_extraction_is_lowercase() {
        assert_eq!(email_domain("Ada@GMail.COM").as_deref(), Some("gmail.com"));
        assert_eq!(email_domain("broken"), None);
    }

    #[test]
    fn domain_normalization() {
        assert_eq!(normalize_domain("  HU.edu.ET ").as_deref(), Some("hu.edu.et"));
        assert_eq!(normalize_domain("localhost"), None);
        assert_eq!(normalize_domain("bad domain.com"), None);
    }
}
