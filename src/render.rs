#[cfg(feature = "png")]
use crate::config::RenderConfig;
use crate::ir::{LabelInput, MarkType, SceneItem, SceneMark, SymbolShape};
use crate::layout::{Align, Baseline, LabelLayout};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Fill opacity of filled shapes in the inside-placement occupancy drawing.
pub(crate) const INSIDE_FILL_OPACITY: f32 = 0.0625;
const DEFAULT_PAINT: &str = "#000";

/// How scene items are painted.
#[derive(Debug, Clone, Copy)]
pub enum MarkStyle<'a> {
    /// Item colors; unstyled items in black.
    Occupancy,
    /// Faint fills with solid two-pixel outlines, so interiors and borders
    /// can be told apart by alpha alone.
    Inside,
    /// Item colors; unstyled items in theme colors.
    Preview(&'a Theme),
}

/// Standalone SVG document of `marks`, drawn without anti-aliasing.
pub fn marks_svg(marks: &[SceneMark], width: f32, height: f32, style: MarkStyle<'_>) -> String {
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str("<g shape-rendering=\"crispEdges\">");
    push_marks(&mut svg, marks, style);
    svg.push_str("</g></svg>");
    svg
}

/// Preview of the scene with every visible label drawn at its computed anchor.
pub fn render_svg(
    labels: &[LabelInput],
    layout: &LabelLayout,
    marks: &[SceneMark],
    size: (f32, f32),
    theme: &Theme,
) -> String {
    let (width, height) = size;
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<g>");
    push_marks(&mut svg, marks, MarkStyle::Preview(theme));
    svg.push_str("</g>");

    for (label, output) in labels.iter().zip(&layout.labels) {
        if !output.is_visible() {
            continue;
        }
        let anchor = match output.align {
            Align::Left => "start",
            Align::Center => "middle",
            Align::Right => "end",
        };
        let baseline = match output.baseline {
            Baseline::Top => "text-before-edge",
            Baseline::Middle => "central",
            Baseline::Bottom => "text-after-edge",
        };
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"{anchor}\" dominant-baseline=\"{baseline}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\" fill-opacity=\"{}\">{}</text>",
            output.x,
            output.y,
            escape_xml(&font_stack(&label.font, &theme.font_family)),
            label.font_size,
            theme.text_color,
            output.opacity,
            escape_xml(&label.text)
        ));
    }

    svg.push_str("</svg>");
    svg
}

/// The label's family list with the theme family as fallback.
fn font_stack(label_font: &str, theme_font: &str) -> String {
    let label_font = label_font.trim();
    let theme_font = theme_font.trim();
    if label_font.is_empty() {
        theme_font.to_string()
    } else if theme_font.is_empty() || label_font == theme_font {
        label_font.to_string()
    } else {
        format!("{label_font}, {theme_font}")
    }
}

fn push_marks(svg: &mut String, marks: &[SceneMark], style: MarkStyle<'_>) {
    for mark in marks {
        match mark.marktype {
            // Children are drawn in the same coordinate space as the group.
            MarkType::Group => {
                for item in &mark.items {
                    push_marks(svg, &item.items, style);
                }
            }
            MarkType::Line => {
                let Some(first) = mark.items.first() else {
                    continue;
                };
                let points: Vec<(f32, f32)> = mark.items.iter().map(|i| (i.x, i.y)).collect();
                svg.push_str(&format!(
                    "<path d=\"{}\" {}/>",
                    points_to_path(&points, false),
                    paint_attrs(first, mark.marktype, style)
                ));
            }
            MarkType::Area => {
                let Some(first) = mark.items.first() else {
                    continue;
                };
                let mut points: Vec<(f32, f32)> = mark.items.iter().map(|i| (i.x, i.y)).collect();
                points.extend(
                    mark.items
                        .iter()
                        .rev()
                        .map(|i| (i.x2.unwrap_or(i.x), i.y2.unwrap_or(i.y))),
                );
                svg.push_str(&format!(
                    "<path d=\"{}\" {}/>",
                    points_to_path(&points, true),
                    paint_attrs(first, mark.marktype, style)
                ));
            }
            marktype => {
                for item in &mark.items {
                    svg.push_str(&item_svg(item, marktype, style));
                }
            }
        }
    }
}

fn item_svg(item: &SceneItem, marktype: MarkType, style: MarkStyle<'_>) -> String {
    let paint = paint_attrs(item, marktype, style);
    match marktype {
        MarkType::Symbol => {
            let size = item.size.unwrap_or(64.0).max(0.0);
            match item.shape {
                SymbolShape::Circle => format!(
                    "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" {paint}/>",
                    item.x,
                    item.y,
                    item.symbol_radius()
                ),
                SymbolShape::Square => {
                    let side = size.sqrt();
                    format!(
                        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{side:.2}\" height=\"{side:.2}\" {paint}/>",
                        item.x - side / 2.0,
                        item.y - side / 2.0
                    )
                }
                SymbolShape::Diamond => {
                    let r = item.symbol_radius();
                    let points = [
                        (item.x, item.y - r),
                        (item.x + r, item.y),
                        (item.x, item.y + r),
                        (item.x - r, item.y),
                    ];
                    format!("<path d=\"{}\" {paint}/>", points_to_path(&points, true))
                }
            }
        }
        MarkType::Rule => format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" {paint}/>",
            item.x,
            item.y,
            item.x2.unwrap_or(item.x),
            item.y2.unwrap_or(item.y)
        ),
        MarkType::Path => match item.path.as_deref() {
            Some(d) => format!(
                "<path transform=\"translate({:.2} {:.2})\" d=\"{}\" {paint}/>",
                item.x,
                item.y,
                escape_xml(d)
            ),
            None => String::new(),
        },
        _ => {
            let b = item.bounds_for(marktype);
            if b.width() <= 0.0 || b.height() <= 0.0 {
                return String::new();
            }
            format!(
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" {paint}/>",
                b.x1,
                b.y1,
                b.width(),
                b.height()
            )
        }
    }
}

fn paint(color: Option<&String>) -> Option<&str> {
    color
        .map(String::as_str)
        .filter(|c| !c.is_empty() && *c != "none" && *c != "transparent")
}

fn paint_attrs(item: &SceneItem, marktype: MarkType, style: MarkStyle<'_>) -> String {
    let stroked_only = matches!(marktype, MarkType::Line | MarkType::Rule);
    let (default_fill, default_stroke) = match style {
        MarkStyle::Preview(theme) => (theme.mark_color.as_str(), theme.mark_stroke.as_str()),
        _ => (DEFAULT_PAINT, DEFAULT_PAINT),
    };

    let mut fill = if stroked_only { None } else { paint(item.fill.as_ref()) };
    let mut stroke = paint(item.stroke.as_ref());
    // Unstyled items still occupy space.
    if fill.is_none() && stroke.is_none() {
        if stroked_only {
            stroke = Some(default_stroke);
        } else {
            fill = Some(default_fill);
        }
    }

    let mut fill_opacity = item.fill_opacity.unwrap_or(1.0);
    let mut stroke_opacity = item.stroke_opacity.unwrap_or(1.0);
    let mut stroke_width = item.stroke_width.unwrap_or(1.0);
    if let MarkStyle::Inside = style {
        if stroke.is_some() {
            stroke_opacity = 1.0;
        }
        if fill.is_some() {
            fill_opacity = INSIDE_FILL_OPACITY;
            stroke = Some(DEFAULT_PAINT);
            stroke_opacity = 1.0;
            stroke_width = 2.0;
        }
    }

    let mut attrs = match fill {
        Some(fill) => format!("fill=\"{}\" fill-opacity=\"{fill_opacity}\"", escape_xml(fill)),
        None => "fill=\"none\"".to_string(),
    };
    if let Some(stroke) = stroke {
        attrs.push_str(&format!(
            " stroke=\"{}\" stroke-width=\"{stroke_width}\" stroke-opacity=\"{stroke_opacity}\"",
            escape_xml(stroke)
        ));
    }
    if let Some(opacity) = item.opacity {
        attrs.push_str(&format!(" opacity=\"{opacity}\""));
    }
    attrs
}

fn points_to_path(points: &[(f32, f32)], closed: bool) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].0, points[0].1));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    if closed {
        d.push_str(" Z");
    }
    d
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
