use plotters::coord::{CoordTranslate, Shift};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::path::{Path, PathBuf};

use super::color::{plasma, Rgb};
use super::error::RenderError;
use super::event::RenderMode;
use super::projector::ChartLayout;
use super::scene::{Camera, MarkerShape, Scene};

const COLORBAR_WIDTH: u32 = 110;
const CHART_MARGIN_PX: u32 = 20;
const LABEL_AREA_PX: u32 = 50;
const CAPTION_PX: u32 = 30;
const RING_SEGMENTS: usize = 90;
const N_WALL_LINES: usize = 12;
const N_DASHES: usize = 24;

/// Anything that can show a scene: an image file, a window, a test recorder
pub trait Renderer {
    fn render(&mut self, scene: &Scene) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }

    /// Infer the format of an output file from its extension
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        ext.parse()
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = RenderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            _ => Err(RenderError::UnsupportedFormat(s.to_string())),
        }
    }
}

fn rgb(color: Rgb) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

/// Widen one of the chart ranges so that one cm has the same length on both axes
fn equal_aspect_ranges(layout: &ChartLayout, area: (u32, u32)) -> ((f64, f64), (f64, f64)) {
    let plot_w = area
        .0
        .saturating_sub(2 * CHART_MARGIN_PX + LABEL_AREA_PX)
        .max(1) as f64;
    let plot_h = area
        .1
        .saturating_sub(2 * CHART_MARGIN_PX + LABEL_AREA_PX + CAPTION_PX)
        .max(1) as f64;
    let (mut x, mut y) = (layout.x_range, layout.y_range);
    let (dx, dy) = (x.1 - x.0, y.1 - y.0);
    if dx / dy > plot_w / plot_h {
        let pad = (dx * plot_h / plot_w - dy) / 2.0;
        y = (y.0 - pad, y.1 + pad);
    } else {
        let pad = (dy * plot_w / plot_h - dx) / 2.0;
        x = (x.0 - pad, x.1 + pad);
    }
    (x, y)
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    scene: &Scene,
) -> Result<(), RenderError> {
    let (_, height) = area.dim_in_pixel();
    let top = 80;
    let bottom = (height as i32 - 80).max(top + 1);
    let (x0, x1) = (10, 35);
    let span = (bottom - top) as f64;
    let steps = 100;
    for i in 0..steps {
        let t0 = i as f64 / steps as f64;
        let t1 = (i + 1) as f64 / steps as f64;
        let y0 = bottom - (t0 * span).round() as i32;
        let y1 = bottom - (t1 * span).round() as i32;
        area.draw(&Rectangle::new(
            [(x0, y1), (x1, y0)],
            rgb(plasma((t0 + t1) / 2.0)).filled(),
        ))?;
    }
    area.draw(&Text::new(
        scene.channel.to_string(),
        (x0, top - 30),
        ("sans-serif", 16).into_font().color(&BLACK),
    ))?;
    for (t, value) in scene.colorbar.iter() {
        let y = bottom - (t * span).round() as i32;
        area.draw(&Text::new(
            format!("{value:.1}"),
            (x1 + 6, y - 7),
            ("sans-serif", 14).into_font().color(&BLACK),
        ))?;
    }
    Ok(())
}

/// Draw one hit marker at a chart coordinate
fn draw_marker<DB: DrawingBackend, CT: CoordTranslate>(
    area: &DrawingArea<DB, CT>,
    at: CT::From,
    shape: MarkerShape,
    size: i32,
    color: RGBColor,
) -> Result<(), RenderError> {
    match shape {
        MarkerShape::Circle => area.draw(&Circle::new(at, size, color.filled()))?,
        MarkerShape::Square => {
            let square = Rectangle::new([(-size, -size), (size, size)], color.filled());
            area.draw(&(EmptyElement::at(at) + square))?
        }
        MarkerShape::Triangle => area.draw(&TriangleMarker::new(at, size + 1, color.filled()))?,
        MarkerShape::Ring => area.draw(&Circle::new(at, size, color.stroke_width(1)))?,
    }
    Ok(())
}

/// Split a polyline into the pieces of a dashed line, each segment in `N_DASHES` parts
fn dashes(points: &[[f64; 3]]) -> Vec<[[f64; 3]; 2]> {
    let lerp = |a: &[f64; 3], b: &[f64; 3], t: f64| {
        let mut p = [0.0; 3];
        for (i, v) in p.iter_mut().enumerate() {
            *v = a[i] + t * (b[i] - a[i]);
        }
        p
    };
    points
        .windows(2)
        .flat_map(|w| {
            (0..N_DASHES).step_by(2).map(move |k| {
                let t0 = k as f64 / N_DASHES as f64;
                let t1 = (k + 1) as f64 / N_DASHES as f64;
                [lerp(&w[0], &w[1], t0), lerp(&w[0], &w[1], t1)]
            })
        })
        .collect()
}

fn draw_unrolled<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    scene: &Scene,
) -> Result<(), RenderError> {
    let (width, _) = area.dim_in_pixel();
    let (main, bar) = area.split_horizontally(width.saturating_sub(COLORBAR_WIDTH));
    let layout = &scene.layout;
    let (x_range, y_range) = equal_aspect_ranges(layout, main.dim_in_pixel());

    let mut chart = ChartBuilder::on(&main)
        .caption(&scene.subtitle, ("sans-serif", 16))
        .margin(CHART_MARGIN_PX)
        .x_label_area_size(LABEL_AREA_PX)
        .y_label_area_size(LABEL_AREA_PX)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("x (cm)")
        .y_desc("z (cm)")
        .draw()?;

    let silhouette = RGBColor(25, 25, 25);
    let (plot_w, _) = chart.plotting_area().dim_in_pixel();
    let px_per_cm = plot_w as f64 / (x_range.1 - x_range.0);
    let cap_px = (layout.cap_radius * px_per_cm).round() as i32;
    let marker_px = ((scene.marker_radius * px_per_cm).round() as i32).max(1);

    chart.draw_series(std::iter::once(Rectangle::new(
        [layout.barrel_min, layout.barrel_max],
        silhouette.filled(),
    )))?;
    chart.draw_series(
        [layout.top_cap_center, layout.bottom_cap_center]
            .into_iter()
            .map(|center| Circle::new(center, cap_px, silhouette.filled())),
    )?;
    let plot = chart.plotting_area();
    for m in scene.markers.iter() {
        draw_marker(plot, m.chart, m.shape(), marker_px, rgb(m.color))?;
    }

    draw_colorbar(&bar, scene)
}

/// Detector frame (z up) to plotters 3D frame (y up)
fn to_chart_3d(p: [f64; 3]) -> (f64, f64, f64) {
    (p[0], p[2], p[1])
}

fn draw_volume<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    scene: &Scene,
    camera: &Camera,
) -> Result<(), RenderError> {
    let (width, _) = area.dim_in_pixel();
    let (main, bar) = area.split_horizontally(width.saturating_sub(COLORBAR_WIDTH));
    let r = scene.radius * 1.1;
    let h = scene.half_height * 1.1;
    let extent = r.max(h);

    let mut chart = ChartBuilder::on(&main)
        .caption(&scene.subtitle, ("sans-serif", 16))
        .margin(CHART_MARGIN_PX)
        .build_cartesian_3d(-extent..extent, -extent..extent, -extent..extent)?;
    chart.with_projection(|mut pb| {
        pb.yaw = camera.yaw;
        pb.pitch = camera.pitch;
        pb.scale = 0.8;
        pb.into_matrix()
    });
    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.1))
        .max_light_lines(3)
        .draw()?;

    let wall = RGBColor(90, 90, 90);
    let radius = scene.radius;
    let half_height = scene.half_height;
    for y in [half_height, -half_height] {
        chart.draw_series(LineSeries::new(
            (0..=RING_SEGMENTS).map(|i| {
                let a = TAU * i as f64 / RING_SEGMENTS as f64;
                (radius * a.cos(), y, radius * a.sin())
            }),
            &wall,
        ))?;
    }
    for i in 0..N_WALL_LINES {
        let a = TAU * i as f64 / N_WALL_LINES as f64;
        let (x, z) = (radius * a.cos(), radius * a.sin());
        chart.draw_series(LineSeries::new(
            [(x, -half_height, z), (x, half_height, z)],
            wall.mix(0.4).stroke_width(1),
        ))?;
    }

    for m in scene.markers.iter() {
        draw_marker(
            chart.plotting_area(),
            to_chart_3d(m.world),
            m.shape(),
            2,
            rgb(m.color),
        )?;
    }

    for track in scene.tracks.iter() {
        let style = rgb(track.style.color)
            .mix(track.style.opacity)
            .stroke_width(track.style.width.ceil().max(1.0) as u32);
        if track.style.dashed {
            for [a, b] in dashes(&track.points) {
                chart.draw_series(LineSeries::new([to_chart_3d(a), to_chart_3d(b)], style))?;
            }
        } else {
            chart.draw_series(LineSeries::new(
                track.points.iter().map(|p| to_chart_3d(*p)),
                style,
            ))?;
        }
    }

    draw_colorbar(&bar, scene)
}

/// Draw a scene onto any plotters backend
pub fn draw_scene<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    scene: &Scene,
    camera: &Camera,
) -> Result<(), RenderError> {
    root.fill(&WHITE)?;
    let area = root.titled(&scene.title, ("sans-serif", 26))?;
    match scene.mode {
        RenderMode::Unrolled => draw_unrolled(&area, scene)?,
        RenderMode::Volume => draw_volume(&area, scene, camera)?,
    }
    root.present()?;
    Ok(())
}

/// Saves every rendered scene to `<directory>/<stem>_<event index>.<format>`
#[derive(Debug, Clone)]
pub struct ImageRenderer {
    directory: PathBuf,
    file_stem: String,
    format: ImageFormat,
    size: (u32, u32),
    camera: Camera,
    written: Vec<PathBuf>,
}

impl ImageRenderer {
    pub fn new(directory: &Path, file_stem: &str, format: ImageFormat, size: (u32, u32)) -> Self {
        Self {
            directory: directory.to_path_buf(),
            file_stem: file_stem.to_string(),
            format,
            size,
            camera: Camera::default(),
            written: Vec::new(),
        }
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    pub fn output_path(&self, event_index: usize) -> PathBuf {
        self.directory.join(format!(
            "{}_{}.{}",
            self.file_stem,
            event_index,
            self.format.extension()
        ))
    }

    /// Every file written so far, in render order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl Renderer for ImageRenderer {
    fn render(&mut self, scene: &Scene) -> Result<(), RenderError> {
        std::fs::create_dir_all(&self.directory)?;
        let path = self.output_path(scene.event_index);
        match self.format {
            ImageFormat::Png => draw_scene(
                BitMapBackend::new(&path, self.size).into_drawing_area(),
                scene,
                &self.camera,
            )?,
            ImageFormat::Svg => draw_scene(
                SVGBackend::new(&path, self.size).into_drawing_area(),
                scene,
                &self.camera,
            )?,
        }
        log::info!("Saved event {} to {}", scene.event_index, path.display());
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ColorChannel, Event, Hit, Track};
    use crate::geometry::ProfileRegistry;
    use crate::projector::project_event;
    use crate::scene::{DisplayOptions, ViewState};

    #[test]
    fn test_format_parsing() {
        assert_eq!("SVG".parse::<ImageFormat>().unwrap(), ImageFormat::Svg);
        assert_eq!(
            ImageFormat::from_path(Path::new("out/display.png")).unwrap(),
            ImageFormat::Png
        );
        assert!(matches!(
            "pdf".parse::<ImageFormat>(),
            Err(RenderError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_equal_aspect() {
        let registry = ProfileRegistry::new().unwrap();
        let layout = ChartLayout::new(registry.get("HK").unwrap());
        let area = (900, 1000);
        let (x, y) = equal_aspect_ranges(&layout, area);
        assert!(x.0 <= layout.x_range.0 && y.0 <= layout.y_range.0);
        let plot_w = (area.0 - 2 * CHART_MARGIN_PX - LABEL_AREA_PX) as f64;
        let plot_h = (area.1 - 2 * CHART_MARGIN_PX - LABEL_AREA_PX - CAPTION_PX) as f64;
        let ratio = ((x.1 - x.0) / plot_w) / ((y.1 - y.0) / plot_h);
        assert!((ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dashes_follow_polyline() {
        let pieces = dashes(&[[0.0; 3], [24.0, 0.0, 0.0], [24.0, 48.0, 0.0]]);
        assert_eq!(pieces.len(), N_DASHES);
        assert_eq!(pieces[0], [[0.0; 3], [1.0, 0.0, 0.0]]);
        assert_eq!(pieces[N_DASHES / 2], [[24.0, 0.0, 0.0], [24.0, 2.0, 0.0]]);
    }

    #[test]
    fn test_output_path() {
        let renderer = ImageRenderer::new(Path::new("plots"), "run_0001", ImageFormat::Svg, (800, 800));
        assert_eq!(
            renderer.output_path(17),
            PathBuf::from("plots").join("run_0001_17.svg")
        );
    }

    #[test]
    fn test_render_svg() {
        let registry = ProfileRegistry::new().unwrap();
        let profile = registry.get("WCTE").unwrap();
        let event = Event {
            index: 3,
            hits: vec![
                Hit::new([profile.radius, 0.0, 10.0], 2.0, 1.0),
                Hit::new([0.0, 0.0, profile.half_height()], 5.0, 3.0),
                Hit::new([0.0, 20.0, -profile.half_height()], 1.0, 4.0),
                Hit::new([0.0, 0.0, 0.0], 3.0, 2.0),
            ],
            annotations: vec![],
            tracks: vec![
                Track {
                    track_id: 1,
                    parent_id: 0,
                    pid: 11,
                    start: [0.0; 3],
                    stop: [100.0, 0.0, 0.0],
                },
                Track {
                    track_id: 2,
                    parent_id: 1,
                    pid: 22,
                    start: [50.0, 0.0, 0.0],
                    stop: [50.0, 80.0, 0.0],
                },
            ],
        };
        let projected = project_event(event, profile);
        let dir = tempfile::tempdir().unwrap();
        let mut written = Vec::new();
        for (stem, mode) in [("unrolled", RenderMode::Unrolled), ("volume", RenderMode::Volume)] {
            let mut renderer = ImageRenderer::new(dir.path(), stem, ImageFormat::Svg, (600, 600));
            let options = DisplayOptions {
                channel: ColorChannel::Time,
                mode,
                show_photon_tracks: true,
            };
            let view = ViewState::new(0, &projected, options);
            let scene = Scene::build(&projected, profile, &view);
            renderer.render(&scene).unwrap();
            written.extend_from_slice(renderer.written());
        }
        assert_eq!(written.len(), 2);
        assert!(std::fs::read_to_string(&written[1]).unwrap().contains("<svg"));
        let svg = std::fs::read_to_string(&written[0]).unwrap();
        // bottom cap hits are the only triangles of the unrolled view
        assert!(svg.contains("<polygon"));
    }
}
