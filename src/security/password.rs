//! Password Strength Validation
//!
//! Pure, deterministic scoring of candidate passwords against a configurable
//! policy. Nothing here hashes or stores passwords; the hosted auth provider
//! owns credentials.

use crate::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Points available from the six core rules plus the length bonus
pub const MAX_SCORE: u8 = 7;

const COMMON_PATTERNS: &str = r"(?i)(password|passw0rd|qwerty|asdf|zxcv|letmein|welcome|admin|iloveyou|monkey|dragon|trustno1|abc123|abcdef|123456|654321|111111|000000)";

/// Password policy parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_length: usize,
    /// Length that earns the bonus point
    pub strong_length: usize,
    pub max_length: usize,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_digit: bool,
    pub require_symbol: bool,
    pub reject_common_patterns: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            strong_length: 12,
            max_length: 128,
            require_lowercase: true,
            require_uppercase: true,
            require_digit: true,
            require_symbol: true,
            reject_common_patterns: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    /// Band a score into a strength
    pub fn from_score(score: u8) -> Self {
        match score {
            6.. => PasswordStrength::Strong,
            4..=5 => PasswordStrength::Medium,
            _ => PasswordStrength::Weak,
        }
    }
}

/// Result of validating one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub strength: PasswordStrength,
    pub score: u8,
}

/// Validates passwords against a [`PasswordPolicy`]
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    policy: PasswordPolicy,
    common_patterns: Regex,
}

impl PasswordValidator {
    pub fn new(policy: PasswordPolicy) -> Result<Self> {
        Ok(Self {
            policy,
            common_patterns: Regex::new(COMMON_PATTERNS)?,
        })
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    fn has_weak_pattern(&self, candidate: &str) -> bool {
        self.common_patterns.is_match(candidate) || has_repeated_run(candidate, 3)
    }

    /// Score `candidate` and collect every failed rule
    pub fn validate_password(&self, candidate: &str) -> PasswordReport {
        let policy = &self.policy;
        let length = candidate.chars().count();
        let mut errors = Vec::new();
        let mut score = 0u8;

        let mut rule = |satisfied: bool, required: bool, message: String| {
            if satisfied {
                score += 1;
            } else if required {
                errors.push(message);
            }
        };

        rule(
            length >= policy.min_length,
            true,
            format!(
                "Password must be at least {} characters long",
                policy.min_length
            ),
        );
        rule(
            candidate.chars().any(char::is_lowercase),
            policy.require_lowercase,
            "Password must contain at least one lowercase letter".to_string(),
        );
        rule(
            candidate.chars().any(char::is_uppercase),
            policy.require_uppercase,
            "Password must contain at least one uppercase letter".to_string(),
        );
        rule(
            candidate.chars().any(|c| c.is_ascii_digit()),
            policy.require_digit,
            "Password must contain at least one number".to_string(),
        );
        rule(
            candidate
                .chars()
                .any(|c| !c.is_alphanumeric() && !c.is_whitespace()),
            policy.require_symbol,
            "Password must contain at least one special character".to_string(),
        );
        rule(
            !candidate.is_empty() && !self.has_weak_pattern(candidate),
            policy.reject_common_patterns && !candidate.is_empty(),
            "Password contains a common or easily guessed pattern".to_string(),
        );

        if length > policy.max_length {
            errors.push(format!(
                "Password must be at most {} characters long",
                policy.max_length
            ));
        }

        if length >= policy.strong_length {
            score += 1;
        }

        PasswordReport {
            is_valid: errors.is_empty(),
            errors,
            strength: PasswordStrength::from_score(score),
            score,
        }
    }
}

/// Whether any character repeats `run` or more times in a row
fn has_repeated_run(candidate: &str, run: usize) -> bool {
    let mut previous = None;
    let mut count = 0;
    for c in candidate.chars() {
        if Some(c) == previous {
            count += 1;
        } else {
            previous = Some(c);
            count = 1;
        }
        if count >= run {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> PasswordValidator {
        PasswordValidator::new(PasswordPolicy::default()).unwrap()
    }

    #[test]
    fn test_strong_password() {
        let report = validator().validate_password("Tr1cky-Kitsune");
        assert!(report.is_valid, "{:?}", report.errors);
        assert_eq!(report.score, MAX_SCORE);
        assert_eq!(report.strength, PasswordStrength::Strong);
    }

    #[test]
    fn test_all_rules_at_minimum_length_is_strong() {
        let report = validator().validate_password("Ab3$efgh");
        assert!(report.is_valid, "{:?}", report.errors);
        assert_eq!(report.score, 6);
        assert_eq!(report.strength, PasswordStrength::Strong);
    }

    #[test]
    fn test_empty_password() {
        let report = validator().validate_password("");
        assert!(!report.is_valid);
        assert!(!report.errors.is_empty());
        assert_eq!(report.score, 0);
        assert_eq!(report.strength, PasswordStrength::Weak);
    }

    #[test]
    fn test_short_lowercase_password() {
        let report = validator().validate_password("naruto");
        assert!(!report.is_valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("at least 8 characters")));
        assert_eq!(report.strength, PasswordStrength::Weak);
    }

    #[test]
    fn test_common_pattern_rejected() {
        let report = validator().validate_password("MyPassword1!");
        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec!["Password contains a common or easily guessed pattern".to_string()]
        );
        assert_eq!(report.strength, PasswordStrength::Strong);
    }

    #[test]
    fn test_repeated_characters_rejected() {
        let report = validator().validate_password("Zaaa9!xyz");
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_max_length_enforced() {
        let long = "Ab3$".repeat(40);
        let report = validator().validate_password(&long);
        assert!(!report.is_valid);
        assert!(report.errors[0].contains("at most 128"));
    }

    #[test]
    fn test_optional_rules_do_not_error() {
        let policy = PasswordPolicy {
            require_symbol: false,
            ..PasswordPolicy::default()
        };
        let report = PasswordValidator::new(policy)
            .unwrap()
            .validate_password("Shinobi42x");
        assert!(report.is_valid, "{:?}", report.errors);
        assert_eq!(report.score, 5);
        assert_eq!(report.strength, PasswordStrength::Medium);
    }

    #[test]
    fn test_score_is_deterministic() {
        let v = validator();
        assert_eq!(v.validate_password("Ab3$efgh"), v.validate_password("Ab3$efgh"));
    }

    #[test]
    fn test_strength_bands() {
        assert_eq!(PasswordStrength::from_score(0), PasswordStrength::Weak);
        assert_eq!(PasswordStrength::from_score(3), PasswordStrength::Weak);
        assert_eq!(PasswordStrength::from_score(4), PasswordStrength::Medium);
        assert_eq!(PasswordStrength::from_score(6), PasswordStrength::Strong);
        assert_eq!(PasswordStrength::from_score(MAX_SCORE), PasswordStrength::Strong);
    }
}
