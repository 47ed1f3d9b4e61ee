//! Minimal table-based HTML scene report.

use std::path::Path;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::scene::Scene;

/// Controls whether/how per-scene thumbnails are embedded in the report.
#[derive(Debug, Clone)]
pub struct HtmlReportOptions {
    /// Base64-encoded JPEG/PNG bytes, one per scene, in scene order.
    /// `None` omits the thumbnail column entirely.
    pub thumbnails: Option<Vec<ThumbnailRef>>,
    pub title: String,
}

impl Default for HtmlReportOptions {
    fn default() -> Self {
        Self { thumbnails: None, title: "Scene Detection Report".to_string() }
    }
}

/// A single thumbnail, either embedded inline as a data URI or referenced
/// by a relative file path on disk.
#[derive(Debug, Clone)]
pub enum ThumbnailRef {
    Embedded { base64_data: String, mime: &'static str },
    File(String),
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Render and write a self-contained HTML report of the scene list.
#[instrument(skip(scenes, options, path), fields(path = %path.as_ref().display()))]
pub fn write_html_report(scenes: &[Scene], options: &HtmlReportOptions, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(&options.title)));
    html.push_str("<style>table{border-collapse:collapse;}td,th{border:1px solid #ccc;padding:4px 8px;}</style>\n");
    html.push_str("</head><body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(&options.title)));
    html.push_str("<table>\n<tr><th>Scene</th><th>Start</th><th>End</th><th>Length</th>");
    if options.thumbnails.is_some() {
        html.push_str("<th>Thumbnail</th>");
    }
    html.push_str("</tr>\n");

    for (i, scene) in scenes.iter().enumerate() {
        html.push_str("<tr>");
        html.push_str(&format!("<td>{}</td>", i + 1));
        html.push_str(&format!("<td>{}</td>", scene.start.to_string_timecode()));
        html.push_str(&format!("<td>{}</td>", scene.end.to_string_timecode()));
        html.push_str(&format!("<td>{:.3}s</td>", scene.length_seconds()));
        if let Some(thumbnails) = &options.thumbnails {
            match thumbnails.get(i) {
                Some(ThumbnailRef::Embedded { base64_data, mime }) => {
                    html.push_str(&format!("<td><img src=\"data:{mime};base64,{base64_data}\"></td>"));
                }
                Some(ThumbnailRef::File(rel_path)) => {
                    html.push_str(&format!("<td><img src=\"{}\"></td>", escape_html(rel_path)));
                }
                None => html.push_str("<td></td>"),
            }
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</table>\n</body></html>\n");

    std::fs::write(path, html)?;
    debug!("Wrote HTML report for {} scenes to {}", scenes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::{Framerate, Timecode};

    fn scene(start: u32, end: u32) -> Scene {
        let fps = Framerate::new(25, 1);
        Scene { start: Timecode::from_frames(start, fps), end: Timecode::from_frames(end, fps) }
    }

    #[test]
    fn test_write_html_report_without_thumbnails() {
        let dir = std::env::temp_dir().join(format!("html_report_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.html");

        write_html_report(&[scene(1, 51)], &HtmlReportOptions::default(), &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("<table>"));
        assert!(!contents.contains("Thumbnail"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_write_html_report_with_embedded_thumbnail() {
        let dir = std::env::temp_dir().join(format!("html_report_thumb_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.html");

        let options = HtmlReportOptions {
            thumbnails: Some(vec![ThumbnailRef::Embedded { base64_data: "AA==".to_string(), mime: "image/jpeg" }]),
            title: "Test".to_string(),
        };
        write_html_report(&[scene(1, 51)], &options, &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("data:image/jpeg;base64,AA=="));

        std::fs::remove_dir_all(&dir).ok();
    }
}
