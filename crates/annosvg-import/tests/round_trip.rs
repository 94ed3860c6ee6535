#![allow(clippy::unwrap_used, clippy::panic)]

use annosvg_core::color::Rgba;
use annosvg_core::document::{Color, ImageMask, ShapeType};
use annosvg_core::{CodecConfig, CodecError, Document, Item, Point};
use annosvg_export::{encode, to_svg};
use annosvg_import::{Decoded, decode};

fn document(json: &str) -> Document {
    serde_json::from_str(json).unwrap()
}

fn decode_str(svg: &str) -> Decoded {
    decode(svg, &CodecConfig::default()).unwrap()
}

fn round_trip(json: &str) -> Decoded {
    decode_str(&to_svg(&document(json)))
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

const MIXED: &str = r##"{
  "metadata": { "width": 800, "height": 600, "title": "Board" },
  "history": [
    { "tool": "pen", "id": "a", "pts": [{"x": 10, "y": 10}, {"x": 50.5, "y": 20.25}, {"x": 90, "y": 70}],
      "color": "#ff0000", "size": 3 },
    { "tool": "highlighter", "id": "b", "pts": [{"x": 0, "y": 100}, {"x": 200, "y": 100}],
      "color": "#ffff00", "size": 20, "opacity": 0.4 },
    { "tool": "shape", "id": "c", "shapeType": "rectangle", "x": 100, "y": 100, "width": 120, "height": 80,
      "fillColor": "#00ff00", "borderColor": "#000000", "borderSize": 2 },
    { "tool": "shape", "id": "d", "shapeType": "hexagon", "x": 300, "y": 300, "width": 100, "height": 100,
      "fillColor": "#ffffff", "borderColor": "#333333", "borderSize": 4 },
    { "tool": "text", "id": "e", "x": 10, "y": 20, "size": 16, "color": "#0000ff", "text": "Hello" },
    { "tool": "image", "id": "f", "x": 500, "y": 50, "w": 64, "h": 48, "src": "photo.png", "opacity": 0.5 },
    { "tool": "pen", "id": "gone", "deleted": true, "pts": [{"x": 0, "y": 0}, {"x": 1, "y": 1}] }
  ]
}"##;

#[test]
fn mixed_document_keeps_order_tools_and_paint() {
    let decoded = round_trip(MIXED);
    assert!(decoded.warnings.is_empty(), "{:?}", decoded.warnings);

    let meta = &decoded.document.metadata;
    assert_eq!((meta.width, meta.height), (800.0, 600.0));
    assert_eq!(meta.title.as_deref(), Some("Board"));
    assert_eq!(meta.source_type.as_deref(), Some("svg"));

    let tools: Vec<&str> = decoded.document.history.iter().map(Item::tool).collect();
    assert_eq!(tools, ["pen", "highlighter", "shape", "shape", "text", "image"]);
    let ids: Vec<&str> = decoded.document.history.iter().map(Item::id).collect();
    assert_eq!(ids, ["svg-1", "svg-2", "svg-3", "svg-4", "svg-5", "svg-6"]);

    let [
        Item::Pen(pen),
        Item::Highlighter(highlighter),
        Item::Shape(rect),
        Item::Shape(hexagon),
        Item::Text(text),
        Item::Image(image),
    ] = decoded.document.history.as_slice()
    else {
        panic!("unexpected history {:?}", decoded.document.history);
    };

    assert_eq!(pen.color.as_ref().unwrap().to_svg(), "#ff0000");
    assert!(close(pen.size.unwrap(), 3.0, 1e-9));
    assert_eq!(pen.pts.len(), 3);
    assert!(pen.pts[1].approx_eq(Point::new(50.5, 20.25), 0.01));

    assert!(close(highlighter.common.opacity.unwrap(), 0.4, 1e-6));
    assert!(close(highlighter.size.unwrap(), 20.0, 1e-9));

    assert_eq!(rect.shape_type, ShapeType::Rectangle);
    assert!(close(rect.x, 100.0, 1e-6) && close(rect.width.unwrap(), 120.0, 1e-6));
    assert_eq!(rect.fill_color.as_ref().unwrap().to_svg(), "#00ff00");
    assert_eq!(rect.border_color.as_ref().unwrap().to_svg(), "#000000");

    assert_eq!(hexagon.shape_type, ShapeType::Hexagon);
    assert!(close(hexagon.x, 300.0, 0.05) && close(hexagon.y, 300.0, 0.05));
    assert!(close(hexagon.width.unwrap(), 100.0, 0.1));
    assert!(close(hexagon.border_size.unwrap(), 4.0, 1e-9));

    assert_eq!(text.text, "Hello");
    assert!(close(text.x, 10.0, 1e-6) && close(text.y, 20.0, 1e-6));
    assert!(close(text.size.unwrap(), 16.0, 1e-9));
    assert_eq!(text.color.as_ref().unwrap().to_svg(), "#0000ff");

    assert_eq!(image.src, "photo.png");
    assert!(close(image.common.opacity.unwrap(), 0.5, 1e-6));
    assert!(close(image.w.unwrap(), 64.0, 1e-9) && close(image.h.unwrap(), 48.0, 1e-9));
    assert!(!image.is_background);
}

#[test]
fn decoded_document_serializes_as_annotation_json() {
    let decoded = round_trip(MIXED);
    let json = serde_json::to_value(&decoded.document).unwrap();
    assert_eq!(json["metadata"]["sourceType"], "svg");
    assert_eq!(json["history"][0]["tool"], "pen");
    assert_eq!(json["history"][2]["shapeType"], "rectangle");
    assert_eq!(json["history"][5]["src"], "photo.png");
}

#[test]
fn encoded_pen_markup_is_exact() {
    let doc = document(
        r##"{ "metadata": {"width": 100, "height": 100},
              "history": [{ "tool": "pen", "id": "p", "pts": [{"x": 1, "y": 2}, {"x": 3.456, "y": 4}],
                            "color": "#123456", "size": 5 }] }"##,
    );
    let svg = to_svg(&doc);
    assert!(svg.contains(
        r##"<path d="M 1.00 2.00 L 3.46 4.00" stroke="#123456" stroke-width="5" fill="none" stroke-linecap="round" stroke-linejoin="round"/>"##
    ));
}

#[test]
fn thin_translucent_pen_stays_a_pen() {
    let decoded = round_trip(
        r##"{ "metadata": {"width": 100, "height": 100},
              "history": [{ "tool": "pen", "id": "p", "pts": [{"x": 0, "y": 0}, {"x": 40, "y": 10}],
                            "color": "#336699", "size": 2, "opacity": 0.5 }] }"##,
    );
    let [Item::Pen(pen)] = decoded.document.history.as_slice() else {
        panic!("expected a pen, got {:?}", decoded.document.history);
    };
    assert!(close(pen.common.opacity.unwrap(), 0.5, 1e-9));
    assert!(close(pen.size.unwrap(), 2.0, 1e-9));
}

#[test]
fn colour_alpha_and_item_opacity_both_survive() {
    let decoded = round_trip(
        r#"{ "metadata": {"width": 100, "height": 100},
             "history": [{ "tool": "pen", "id": "p", "pts": [{"x": 0, "y": 0}, {"x": 40, "y": 10}],
                           "color": {"r": 255, "g": 0, "b": 0, "a": 0.5}, "opacity": 0.8 }] }"#,
    );
    let [Item::Pen(pen)] = decoded.document.history.as_slice() else {
        panic!("expected a pen, got {:?}", decoded.document.history);
    };
    assert_eq!(pen.color, Some(Color::Rgba(Rgba::new(255, 0, 0, 0.5))));
    assert!(close(pen.common.opacity.unwrap(), 0.8, 1e-9));

    let json = serde_json::to_value(&decoded.document).unwrap();
    assert_eq!(json["history"][0]["color"]["a"], 0.5);
}

#[test]
fn multi_line_text_survives_through_passthrough() {
    let decoded = round_trip(
        r##"{ "metadata": {"width": 400, "height": 300},
              "history": [{ "tool": "text", "id": "t", "x": 40, "y": 60, "size": 20,
                            "text": "first & foremost\nsecond" }] }"##,
    );
    let [Item::Text(text)] = decoded.document.history.as_slice() else {
        panic!("expected text, got {:?}", decoded.document.history);
    };
    assert_eq!(text.text, "first & foremost\nsecond");
    assert!(close(text.x, 40.0, 1e-6) && close(text.y, 60.0, 1e-6));

    // Re-encoding the decoded text reproduces its tspans verbatim.
    let again = to_svg(&decoded.document);
    assert!(again.contains("<tspan>first &amp; foremost</tspan>"));
}

#[test]
fn rotated_shape_keeps_box_and_angle() {
    let decoded = round_trip(
        r##"{ "metadata": {"width": 400, "height": 300},
              "history": [{ "tool": "shape", "id": "r", "shapeType": "rectangle",
                            "x": 20, "y": 30, "width": 100, "height": 50, "rotation": 45,
                            "fillColor": "#ff0000", "borderColor": "#000000" }] }"##,
    );
    let [Item::Shape(shape)] = decoded.document.history.as_slice() else {
        panic!("expected a shape, got {:?}", decoded.document.history);
    };
    assert!(close(shape.common.rotation, 45.0, 1e-6));
    assert!(close(shape.x, 20.0, 1e-6) && close(shape.y, 30.0, 1e-6));
    assert!(close(shape.width.unwrap(), 100.0, 1e-6));
    assert!(close(shape.height.unwrap(), 50.0, 1e-6));
}

#[test]
fn masked_image_round_trips() {
    let decoded = round_trip(
        r##"{ "metadata": {"width": 400, "height": 300},
              "history": [{ "tool": "image", "id": "i", "x": 10, "y": 10, "w": 100, "h": 100,
                            "src": "photo.png",
                            "mask": { "id": "m1", "type": "alpha", "src": "mask.png" } }] }"##,
    );
    let [Item::Image(image)] = decoded.document.history.as_slice() else {
        panic!("expected an image, got {:?}", decoded.document.history);
    };
    assert_eq!(
        image.mask,
        Some(ImageMask {
            id: Some("m1".to_owned()),
            kind: Some("alpha".to_owned()),
            src: "mask.png".to_owned(),
        })
    );
}

#[test]
fn canvas_sized_image_is_a_background() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="800" height="600">
                   <image href="bg.png" x="0" y="0" width="800" height="600"/>
                   <image href="small.png" x="0" y="0" width="80" height="60"/>
                 </svg>"#;
    let decoded = decode_str(svg);
    let flags: Vec<bool> = decoded
        .document
        .history
        .iter()
        .map(|item| matches!(item, Item::Image(i) if i.is_background))
        .collect();
    assert_eq!(flags, [true, false]);

    let config = CodecConfig {
        detect_backgrounds: false,
        ..CodecConfig::default()
    };
    let decoded = decode(svg, &config).unwrap();
    assert!(
        decoded
            .document
            .history
            .iter()
            .all(|item| matches!(item, Item::Image(i) if !i.is_background))
    );
}

#[test]
fn group_transform_is_baked_into_points() {
    let decoded = decode_str(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
             <g transform="translate(10,10) rotate(90)">
               <path d="M0 0 L10 0" stroke="red" fill="none"/>
             </g>
           </svg>"#,
    );
    let [Item::Pen(pen)] = decoded.document.history.as_slice() else {
        panic!("expected a pen, got {:?}", decoded.document.history);
    };
    assert!(pen.pts[0].approx_eq(Point::new(10.0, 10.0), 1e-9));
    assert!(pen.pts[1].approx_eq(Point::new(10.0, 20.0), 1e-9));
}

#[test]
fn fill_and_stroke_twins_merge_into_one_shape() {
    let decoded = decode_str(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200">
              <path d="M10 10 L110 10 L110 60 L10 60 Z" fill="#00f"/>
              <path d="M10 10 L110 10 L110 60 L10 60 Z" fill="none" stroke="#000" stroke-width="2"/>
            </svg>"##,
    );
    let [Item::Shape(shape)] = decoded.document.history.as_slice() else {
        panic!("expected one shape, got {:?}", decoded.document.history);
    };
    assert_eq!(shape.fill_color.as_ref().unwrap().to_svg(), "#00f");
    assert_eq!(shape.border_color.as_ref().unwrap().to_svg(), "#000");
    assert!(close(shape.border_size.unwrap(), 2.0, 1e-9));
}

#[test]
fn problem_elements_become_warnings() {
    let decoded = decode_str(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
             <foreignObject/>
             <image width="10" height="10"/>
             <image href="a.png" width="0" height="10"/>
             <rect width="10" height="10" fill="red"/>
           </svg>"#,
    );
    assert_eq!(decoded.document.history.len(), 1);
    let elements: Vec<&str> = decoded.warnings.iter().map(|w| w.element.as_str()).collect();
    assert_eq!(elements, ["foreignObject", "image", "image"]);
    assert_eq!(decoded.warnings[2].message, "zero-size image skipped");
}

#[test]
fn encoder_warnings_are_reported_alongside_markup() {
    let doc = document(
        r#"{ "history": [
              { "tool": "image", "id": "blank", "src": "" },
              { "tool": "laser", "id": "z" }
            ] }"#,
    );
    let encoded = encode(&doc, &CodecConfig::default());
    assert_eq!(encoded.warnings.len(), 2);
    assert!(encoded.svg.ends_with("</svg>\n"));
}

#[test]
fn unreadable_input_is_an_error() {
    let config = CodecConfig::default();
    assert!(matches!(
        decode("not xml at all", &config),
        Err(CodecError::Xml(_))
    ));
    assert!(matches!(
        decode(r#"<html xmlns="http://www.w3.org/1999/xhtml"/>"#, &config),
        Err(CodecError::MissingSvgRoot)
    ));
}
