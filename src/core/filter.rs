use crate::domain::model::Record;

/// Premium or verified, either through the boolean flags or the badge list.
pub fn is_qualified(record: &Record) -> bool {
    record.flag("isPremium")
        || record.flag("isVerified")
        || record
            .badges()
            .iter()
            .any(|badge| *badge == "premium" || *badge == "verified")
}

/// Stable filter: keeps qualified records in their original order.
pub fn filter_qualified(records: Vec<Record>) -> Vec<Record> {
    records.into_iter().filter(is_qualified).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member(value: serde_json::Value) -> Record {
        Record::from_json(value).unwrap()
    }

    #[test]
    fn test_flags_qualify() {
        assert!(is_qualified(&member(json!({"profileId": "a", "isPremium": true}))));
        assert!(is_qualified(&member(json!({"profileId": "b", "isVerified": true}))));
    }

    #[test]
    fn test_badges_qualify() {
        assert!(is_qualified(&member(json!({"profileId": "a", "badges": ["premium"]}))));
        assert!(is_qualified(&member(json!({"profileId": "b", "badges": ["creator", "verified"]}))));
    }

    #[test]
    fn test_unqualified_records() {
        assert!(!is_qualified(&member(json!({"profileId": "a"}))));
        assert!(!is_qualified(&member(json!({
            "profileId": "b",
            "isPremium": false,
            "isVerified": false,
            "badges": ["creator"]
        }))));
        // Only a literal `true` counts.
        assert!(!is_qualified(&member(json!({"profileId": "c", "isPremium": "true"}))));
        assert!(!is_qualified(&member(json!({"profileId": "d", "badges": ["Premium"]}))));
    }

    #[test]
    fn test_filter_preserves_order() {
        let records = vec![
            member(json!({"profileId": "C", "isVerified": true})),
            member(json!({"profileId": "B"})),
            member(json!({"profileId": "A", "isPremium": true})),
            member(json!({"profileId": "D", "badges": ["premium"]})),
        ];

        let ids: Vec<String> = filter_qualified(records)
            .iter()
            .filter_map(Record::profile_id)
            .collect();

        assert_eq!(ids, vec!["C", "A", "D"]);
    }

    #[test]
    fn test_filter_is_deterministic() {
        let records = vec![
            member(json!({"profileId": "A", "isPremium": true})),
            member(json!({"profileId": "B"})),
        ];
        assert_eq!(filter_qualified(records.clone()), filter_qualified(records));
    }
}
