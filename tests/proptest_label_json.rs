//! Property tests for the label JSON codec.

mod proptest_helpers;

use proptest::prelude::*;
use proptest_helpers::{label_file_strategy, proptest_config};
use rslabel::label::io_label_json::{
    from_label_str, read_label_file, to_label_string, write_label_file, GEO_TRANSFORM_KEY,
};

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn label_files_survive_disk(label in label_file_strategy()) {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("scene.json");
        write_label_file(&path, &label).unwrap();
        prop_assert_eq!(read_label_file(&path).unwrap(), label);
    }

    #[test]
    fn geo_transform_key_follows_the_label(label in label_file_strategy()) {
        let json = to_label_string(&label).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(value.get(GEO_TRANSFORM_KEY).is_some(), label.geo_transform.is_some());
        prop_assert_eq!(value["shapes"].as_array().map(Vec::len), Some(label.shapes.len()));

        let reparsed = from_label_str(&json).unwrap();
        prop_assert_eq!(reparsed.other_data, label.other_data);
    }
}
