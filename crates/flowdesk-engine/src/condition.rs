use serde::{Deserialize, Serialize};

/// Comparison operator of a condition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
        };
        f.write_str(s)
    }
}

/// Parse a finite number, tolerating surrounding whitespace.
fn as_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Compare a variable value against a literal.
///
/// Both sides are compared numerically when both parse as numbers, otherwise
/// as strings. Ordering operators on non-numeric operands are always false.
pub fn matches(value: &str, op: Operator, literal: &str) -> bool {
    match (as_number(value), as_number(literal)) {
        (Some(a), Some(b)) => match op {
            Operator::Eq => a == b,
            Operator::Ne => a != b,
            Operator::Gt => a > b,
            Operator::Lt => a < b,
        },
        _ => match op {
            Operator::Eq => value == literal,
            Operator::Ne => value != literal,
            Operator::Gt | Operator::Lt => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_ordering() {
        assert!(matches("10", Operator::Gt, "5"));
        assert!(!matches("10", Operator::Lt, "5"));
        assert!(matches("2.5", Operator::Lt, "3"));
        assert!(matches(" 7 ", Operator::Gt, "6"));
    }

    #[test]
    fn test_non_numeric_ordering_is_false() {
        assert!(!matches("abc", Operator::Gt, "5"));
        assert!(!matches("abc", Operator::Lt, "5"));
        assert!(!matches("b", Operator::Gt, "a"));
    }

    #[test]
    fn test_string_equality() {
        assert!(matches("VIP", Operator::Eq, "VIP"));
        assert!(!matches("vip", Operator::Eq, "VIP"));
        assert!(matches("outro", Operator::Ne, "VIP"));
    }

    #[test]
    fn test_numeric_equality_ignores_formatting() {
        assert!(matches("1.0", Operator::Eq, "1"));
        assert!(!matches("1.0", Operator::Ne, "1"));
        // mixed: one side numeric, other not -> string semantics
        assert!(matches("1", Operator::Ne, "one"));
    }

    #[test]
    fn test_non_finite_is_not_numeric() {
        assert!(!matches("inf", Operator::Gt, "5"));
        assert!(matches("NaN", Operator::Eq, "NaN"));
    }

    #[test]
    fn test_operator_serde() {
        let op: Operator = serde_json::from_str("\"!=\"").unwrap();
        assert_eq!(op, Operator::Ne);
        assert_eq!(serde_json::to_string(&Operator::Gt).unwrap(), "\">\"");
        assert!(serde_json::from_str::<Operator>("\">=\"").is_err());
    }
}
