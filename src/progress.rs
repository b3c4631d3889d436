/// Fraction of a transfer completed, when the total size is known
pub fn fraction(done: u64, total: Option<u64>) -> Option<f32> {
    match total {
        Some(total) if total > 0 => Some((done as f64 / total as f64).min(1.0) as f32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_total() {
        assert_eq!(fraction(50, Some(200)), Some(0.25));
        assert_eq!(fraction(300, Some(200)), Some(1.0));
    }

    #[test]
    fn unknown_total() {
        assert_eq!(fraction(50, None), None);
        assert_eq!(fraction(50, Some(0)), None);
    }
}
