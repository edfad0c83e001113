#[cfg(test)]
mod tests {
    use crate::record::Record;

    #[test]
    fn test_round_trip_is_stable() {
        let mut record = Record::new("myDB");
        record.set_simple_field("STATE_MODEL_DEF", "MasterSlave");
        record.set_int_field("BUCKET_SIZE", 4);
        record.set_bool_field("BATCH_MESSAGE_MODE", false);
        record.set_list_field(
            "STATE_PRIORITY_LIST",
            vec!["MASTER".into(), "SLAVE".into(), "OFFLINE".into()],
        );
        record.set_map_field("myDB_0", "CURRENT_STATE", "SLAVE");
        record.set_map_field("myDB_0", "INFO", "");
        record.set_map_field("myDB_1", "CURRENT_STATE", "MASTER");

        let bytes = record.to_bytes().expect("encode");
        let decoded = Record::from_bytes(&bytes).expect("decode");
        assert_eq!(decoded, record);

        // canonical: encoding the decoded copy yields identical bytes
        assert_eq!(decoded.to_bytes().expect("encode"), bytes);
    }

    #[test]
    fn test_scalars_encode_as_strings() {
        let mut record = Record::new("r");
        record.set_int_field("BUCKET_SIZE", 16);
        record.set_bool_field("HELIX_ENABLED", true);

        let json: serde_json::Value =
            serde_json::from_slice(&record.to_bytes().expect("encode")).expect("json");
        assert_eq!(json["simpleFields"]["BUCKET_SIZE"], "16");
        assert_eq!(json["simpleFields"]["HELIX_ENABLED"], "true");

        assert_eq!(record.get_int_field("BUCKET_SIZE", 0), 16);
        assert!(record.get_bool_field("HELIX_ENABLED", false));
    }

    #[test]
    fn test_decode_tolerates_unknown_fields_and_missing_sections() {
        let payload = br#"{
            "id": "h_1000",
            "simpleFields": { "HELIX_HOST": "h" },
            "futureField": { "anything": true }
        }"#;

        let record = Record::from_bytes(payload).expect("decode");
        assert_eq!(record.id, "h_1000");
        assert_eq!(record.get_simple_field("HELIX_HOST"), Some("h"));
        assert!(record.list_fields.is_empty());
        assert!(record.map_fields.is_empty());
    }

    #[test]
    fn test_map_field_update_leaves_other_entries_untouched() {
        let mut record = Record::new("myDB");
        record.set_map_field("myDB_0", "CURRENT_STATE", "OFFLINE");
        record.set_map_field("myDB_1", "CURRENT_STATE", "OFFLINE");

        record.set_map_field("myDB_0", "CURRENT_STATE", "SLAVE");
        assert_eq!(record.get_map_field("myDB_0", "CURRENT_STATE"), Some("SLAVE"));
        assert_eq!(record.get_map_field("myDB_1", "CURRENT_STATE"), Some("OFFLINE"));

        record.remove_map_field("myDB_0");
        assert_eq!(record.get_map_field("myDB_0", "CURRENT_STATE"), None);
        assert_eq!(record.get_map_field("myDB_1", "CURRENT_STATE"), Some("OFFLINE"));
    }

    #[test]
    fn test_require_simple_field() {
        let record = Record::new("m1");
        let err = record.require_simple_field("MSG_TYPE").unwrap_err();
        assert!(err.to_string().contains("MSG_TYPE"));
    }

    #[test]
    fn test_int_field_fallback_on_garbage() {
        let mut record = Record::new("r");
        record.set_simple_field("BUCKET_SIZE", "not-a-number");
        assert_eq!(record.get_int_field("BUCKET_SIZE", 7), 7);
    }
}
