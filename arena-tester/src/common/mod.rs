pub mod scenario;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_drops_blank_entries() {
        assert_eq!(
            split_csv(" arena-season,, coin-flip-fairness ,"),
            vec!["arena-season".to_string(), "coin-flip-fairness".to_string()]
        );
        assert!(split_csv("").is_empty());
    }
}
