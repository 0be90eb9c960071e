#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use rslabel::geo::GeoTransform;
use rslabel::label::{LabelFile, Shape, ShapeKind};
use serde_json::{Map as JsonMap, Value};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn shape_kind_strategy() -> BoxedStrategy<ShapeKind> {
    prop_oneof![
        Just(ShapeKind::Rectangle),
        Just(ShapeKind::Polygon),
        Just(ShapeKind::SlantRectangle),
        Just(ShapeKind::Line),
        Just(ShapeKind::Linestrip),
        Just(ShapeKind::Circle),
        Just(ShapeKind::Point),
        Just(ShapeKind::Other("ellipse".to_string())),
    ]
    .boxed()
}

fn label_strategy() -> BoxedStrategy<String> {
    proptest::string::string_regex("[a-z]{1,8}(_[a-z]{1,8}){0,2}")
        .expect("valid label regex")
        .boxed()
}

fn color_strategy() -> BoxedStrategy<Option<[u8; 4]>> {
    proptest::option::of(any::<[u8; 4]>()).boxed()
}

fn extra_strategy() -> BoxedStrategy<JsonMap<String, Value>> {
    proptest::collection::vec(
        (
            proptest::string::string_regex("x_[a-z]{1,6}").expect("valid key regex"),
            prop_oneof![
                any::<i64>().prop_map(Value::from),
                any::<bool>().prop_map(Value::from),
                "[a-z ]{0,10}".prop_map(Value::from),
            ],
        ),
        0..3,
    )
    .prop_map(|pairs| pairs.into_iter().collect())
    .boxed()
}

/// Shapes with points in `[0, width] × [0, height]`.
pub fn shape_within(width: f64, height: f64) -> BoxedStrategy<Shape> {
    (
        label_strategy(),
        shape_kind_strategy(),
        proptest::collection::vec((0.0..=width, 0.0..=height), 1..8),
        color_strategy(),
        proptest::option::of(0u8..=10),
        extra_strategy(),
    )
        .prop_map(|(label, kind, points, line_color, probability, extra)| {
            let points = if kind == ShapeKind::Rectangle {
                let first = points[0];
                let second = points.get(1).copied().unwrap_or((first.0 + 1.0, first.1 + 1.0));
                vec![first, second]
            } else {
                points
            };
            let mut shape = Shape::new(label, kind, points);
            shape.line_color = line_color;
            shape.probability = probability;
            shape.extra = extra;
            shape
        })
        .boxed()
}

pub fn label_file_strategy() -> BoxedStrategy<LabelFile> {
    (
        (1u32..=4096, 1u32..=4096),
        proptest::option::of(Just(GeoTransform::new([
            500000.0, 0.5, 0.0, 4200000.0, 0.0, -0.5,
        ]))),
        proptest::collection::vec(shape_within(1000.0, 1000.0), 0..6),
        proptest::collection::btree_map("[a-z]{1,6}", any::<bool>(), 0..3),
        extra_strategy(),
        color_strategy(),
    )
        .prop_map(|((w, h), gt, shapes, flags, other, fill)| {
            let mut label = LabelFile::new("scene.tif", w, h).with_shapes(shapes);
            label.geo_transform = gt;
            label.flags = flags;
            label.other_data = other;
            label.fill_color = fill;
            label
        })
        .boxed()
}
