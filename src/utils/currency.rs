/// Currency helpers for rupee amounts.
///
/// Every amount in the database is a whole number of rupees, so formatting
/// never has to deal with fractions.

/// Format rupees the way the app shows them: `₹1,500`, `₹1,00,000`.
pub fn format_inr(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let grouped = group_indian(&digits);

    if amount < 0 {
        format!("-₹{}", grouped)
    } else {
        format!("₹{}", grouped)
    }
}

// Lakh/crore grouping: the last three digits, then pairs.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_inr() {
        assert_eq!(format_inr(0), "₹0");
        assert_eq!(format_inr(500), "₹500");
        assert_eq!(format_inr(1500), "₹1,500");
        assert_eq!(format_inr(100000), "₹1,00,000");
        assert_eq!(format_inr(12345678), "₹1,23,45,678");
        assert_eq!(format_inr(-2500), "-₹2,500");
    }
}
