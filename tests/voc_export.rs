//! Pascal VOC export, through `run_export` and the per-directory exporter.

mod common;

use std::fs;

use common::{tree, write_pair, RecordingBackend};
use rslabel::export::io_voc_xml::{export_voc, label_color, write_labels_txt};
use rslabel::export::run_export;
use rslabel::label::{LabelFile, Shape, ShapeKind};
use rslabel::report::{RunIssueCode, RunReport};
use rslabel::{ExportConfig, ExportFormat};

fn square(label: &str, size: f64, height: f64) -> Shape {
    Shape::new(
        label,
        ShapeKind::Polygon,
        [
            (0.0, height),
            (size, height),
            (size, height - size),
            (0.0, height - size),
        ],
    )
}

fn xml_text(xml: &str, tag: &str) -> Vec<String> {
    let doc = roxmltree::Document::parse(xml).unwrap();
    doc.descendants()
        .filter(|n| n.has_tag_name(tag))
        .filter_map(|n| n.text().map(str::to_string))
        .collect()
}

#[test]
fn untiled_export_writes_boxes_and_readme() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("in");
    let out = temp.path().join("out");
    let mut house = square("house", 50.0, 100.0);
    house.probability = Some(7);
    let label = LabelFile::new("scene.tif", 100, 100).with_shapes(vec![
        house,
        Shape::new("road", ShapeKind::Linestrip, [(0.0, 0.0), (10.0, 10.0)]),
    ]);
    write_pair(&input, "scene", &label);

    let mut config = ExportConfig::new(&input, &out);
    config.format = ExportFormat::Voc;
    let backend = RecordingBackend::new(100, 100, 3);
    let report = run_export(&config, &backend).unwrap();

    assert_eq!(
        tree(&out),
        vec![
            "Annotations/scene.xml",
            "AnnotationsVisualization/readme.txt",
            "JPEGImages/scene.tif",
            "class_names.txt",
            "labels.txt",
        ]
    );
    assert_eq!(
        fs::read_to_string(out.join("class_names.txt")).unwrap(),
        "_background_\nhouse\nroad"
    );
    assert_eq!(report.issues_with(RunIssueCode::UnsupportedShapeKind).count(), 1);
    assert!(backend.rendered.borrow().is_empty());

    let xml = fs::read_to_string(out.join("Annotations/scene.xml")).unwrap();
    assert_eq!(xml_text(&xml, "name"), vec!["house"]);
    assert_eq!(xml_text(&xml, "probability"), vec!["7"]);
    assert_eq!(xml_text(&xml, "xmin"), vec!["0"]);
    assert_eq!(xml_text(&xml, "ymin"), vec!["0"]);
    assert_eq!(xml_text(&xml, "xmax"), vec!["50"]);
    assert_eq!(xml_text(&xml, "ymax"), vec!["50"]);
    assert_eq!(xml_text(&xml, "depth"), vec!["3"]);
}

#[test]
fn unknown_class_drops_only_that_rasters_xml() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("in");
    let out = temp.path().join("out");
    write_pair(
        &input,
        "known",
        &LabelFile::new("known.tif", 100, 100).with_shapes(vec![square("house", 10.0, 100.0)]),
    );
    write_pair(
        &input,
        "unknown",
        &LabelFile::new("unknown.tif", 100, 100).with_shapes(vec![square("lake", 10.0, 100.0)]),
    );

    let mut config = ExportConfig::new(&input, &out);
    config.format = ExportFormat::Voc;
    write_labels_txt(&config.class_list_path(), &["house".to_string()]).unwrap();

    let mut report = RunReport::new("voc");
    export_voc(
        &input,
        &config,
        false,
        &RecordingBackend::new(100, 100, 1),
        &mut report,
    )
    .unwrap();

    assert!(out.join("Annotations/known.xml").is_file());
    assert!(!out.join("Annotations/unknown.xml").exists());
    // The raster is copied before the class check.
    assert!(out.join("JPEGImages/unknown.tif").is_file());
    assert_eq!(report.issues_with(RunIssueCode::UnknownClass).count(), 1);
    assert_eq!(report.counts.images, 1);
    assert_eq!(report.counts.skipped_label_files, 1);
}

#[test]
fn tiled_export_renders_colored_overlays() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("in");
    let out = temp.path().join("out");
    let label = LabelFile::new("scene.tif", 20, 10).with_shapes(vec![
        square("house", 4.0, 10.0),
        Shape::new(
            "road",
            ShapeKind::Rectangle,
            [(12.0, 8.0), (16.0, 2.0)],
        ),
    ]);
    write_pair(&input, "scene", &label);

    let mut config = ExportConfig::new(&input, &out);
    config.format = ExportFormat::Voc;
    config.tiled = true;
    config.tile_size = 10;
    let backend = RecordingBackend::new(20, 10, 3);
    let report = run_export(&config, &backend).unwrap();
    assert_eq!(report.counts.tiles_written, 2);

    // The recording backend cuts no rasters, so the tile XMLs are skipped.
    assert_eq!(report.issues_with(RunIssueCode::MissingRaster).count(), 2);
    assert!(backend.rendered.borrow().is_empty());
    assert!(!out.join("AnnotationsVisualization/readme.txt").exists());

    // With placeholder tile rasters in place the overlays are requested.
    let group = config.tiles_dir().join("scene");
    for tile in ["scene_0_0", "scene_0_1"] {
        fs::write(group.join(format!("{tile}.tif")), b"").unwrap();
    }
    let mut report = RunReport::new("voc");
    export_voc(&config.tiles_dir(), &config, true, &backend, &mut report).unwrap();

    let rendered = backend.rendered.borrow();
    assert_eq!(rendered.len(), 2);
    assert_eq!(
        rendered[0].out,
        out.join("AnnotationsVisualization/scene_0_0.tif")
    );
    assert_eq!(rendered[0].captions, vec!["house"]);
    assert_eq!(rendered[0].colors, vec![label_color(1)]);
    assert_eq!(rendered[1].captions, vec!["road"]);
    assert_eq!(rendered[1].colors, vec![label_color(2)]);
    let road = rendered[1].boxes[0];
    assert_eq!(
        (road.xmin(), road.ymin(), road.xmax(), road.ymax()),
        (2.0, 2.0, 6.0, 8.0)
    );
    assert!(out.join("Annotations/scene_0_1.xml").is_file());
}

#[test]
fn stray_json_is_skipped_and_the_rest_exported() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("in");
    let out = temp.path().join("out");
    write_pair(
        &input,
        "scene",
        &LabelFile::new("scene.tif", 100, 100).with_shapes(vec![square("house", 10.0, 100.0)]),
    );
    fs::write(input.join("notes.json"), r#"{"author": "survey team"}"#).unwrap();

    let mut config = ExportConfig::new(&input, &out);
    config.format = ExportFormat::Voc;
    let report = run_export(&config, &RecordingBackend::new(100, 100, 3)).unwrap();

    assert!(out.join("Annotations/scene.xml").is_file());
    assert!(!out.join("Annotations/notes.xml").exists());
    assert_eq!(report.issues_with(RunIssueCode::InvalidLabelFile).count(), 1);
    assert_eq!(report.counts.skipped_label_files, 1);
    assert_eq!(report.counts.images, 1);
}

#[test]
fn rectangle_without_two_points_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("in");
    let out = temp.path().join("out");
    let label = LabelFile::new("scene.tif", 100, 100).with_shapes(vec![
        Shape::new("house", ShapeKind::Rectangle, [(5.0, 95.0)]),
        square("road", 10.0, 100.0),
    ]);
    write_pair(&input, "scene", &label);

    let mut config = ExportConfig::new(&input, &out);
    config.format = ExportFormat::Voc;
    let report = run_export(&config, &RecordingBackend::new(100, 100, 3)).unwrap();

    let notes: Vec<_> = report
        .issues_with(RunIssueCode::UnsupportedShapeKind)
        .map(|i| i.message.clone())
        .collect();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].contains("'house'"));
    assert_eq!(report.counts.annotations, 1);

    let xml = fs::read_to_string(out.join("Annotations/scene.xml")).unwrap();
    assert_eq!(xml_text(&xml, "name"), vec!["road"]);
}

#[test]
fn tiled_export_without_shapes_writes_an_empty_dataset() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("in");
    let out = temp.path().join("out");
    write_pair(&input, "scene", &LabelFile::new("scene.tif", 20, 10));

    let mut config = ExportConfig::new(&input, &out);
    config.format = ExportFormat::Voc;
    config.tiled = true;
    config.tile_size = 10;
    let report = run_export(&config, &RecordingBackend::new(20, 10, 3)).unwrap();

    assert_eq!(report.counts.tiles_written, 0);
    assert_eq!(report.counts.images, 0);
    assert!(config.tiles_dir().is_dir());
    assert_eq!(
        fs::read_to_string(out.join("class_names.txt")).unwrap(),
        "_background_"
    );
}
