//! Case reference extraction from unstructured email text

use crate::models::{Email, ReferenceToken};
use once_cell::sync::Lazy;
use regex::Regex;

/// Two to four letters, a four-digit year segment and a three or four digit
/// sequence, e.g. `SCC-2025-001`. Digits are ASCII only.
pub const REFERENCE_PATTERN: &str = r"[A-Za-z]{2,4}-[0-9]{4}-[0-9]{3,4}";

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(REFERENCE_PATTERN).unwrap());

/// Return the first case reference in `text`, with its original casing
pub fn extract(text: &str) -> Option<ReferenceToken> {
    REFERENCE_RE
        .find(text)
        .map(|m| ReferenceToken::new(m.as_str()))
}

/// Extract from an email's subject and body, joined by a single space
pub fn extract_from_email(email: &Email) -> Option<ReferenceToken> {
    extract(&email.searchable_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn email(subject: &str, body: &str) -> Email {
        Email {
            id: "m1".to_string(),
            sender: "counsel@example.com".to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_extract_from_subject() {
        let token = extract_from_email(&email("Re: SCC-2025-001 update", "")).unwrap();
        assert_eq!(token.as_str(), "SCC-2025-001");
    }

    #[test]
    fn test_extract_preserves_case() {
        let token = extract("see scc-2025-001 attached").unwrap();
        assert_eq!(token.as_str(), "scc-2025-001");
    }

    #[test]
    fn test_extract_from_body_when_subject_has_none() {
        let token = extract_from_email(&email(
            "Procedural order",
            "In the matter ICC-2024-0107 the tribunal orders...",
        ))
        .unwrap();
        assert_eq!(token.as_str(), "ICC-2024-0107");
    }

    #[test]
    fn test_first_match_wins() {
        let token = extract("AB-2024-111 and CD-2025-222").unwrap();
        assert_eq!(token.as_str(), "AB-2024-111");
    }

    #[test]
    fn test_subject_comes_before_body() {
        let token = extract_from_email(&email("XY-2023-001", "ZZ-2024-002")).unwrap();
        assert_eq!(token.as_str(), "XY-2023-001");
    }

    #[test]
    fn test_no_reference() {
        assert_eq!(extract_from_email(&email("Project delay", "The delivery is late.")), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn test_partial_tokens_rejected() {
        assert_eq!(extract("SCC-2025"), None);
        assert_eq!(extract("SCC-2025-01"), None);
        assert_eq!(extract("S-2025-001"), None);
        assert_eq!(extract("SCC-25-001"), None);
        // Legacy formats are not case references
        assert_eq!(extract("AB-001/26"), None);
        assert_eq!(extract("ICC/2024/001"), None);
    }

    #[test]
    fn test_longest_sequence_segment() {
        assert_eq!(extract("SCC-2025-00123").unwrap().as_str(), "SCC-2025-0012");
    }

    #[test]
    fn test_non_ascii_digits_rejected() {
        assert_eq!(extract("SCC-٢٠٢٥-001"), None);
    }

    #[test]
    fn test_joined_text_spans_subject_and_body() {
        // The joining space never completes a token across the boundary
        assert_eq!(extract_from_email(&email("SCC-2025", "-001")), None);
    }
}
