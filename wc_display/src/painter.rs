use eframe::egui::{
    pos2, vec2, Align2, Color32, FontId, Pos2, Rect, Response, Sense, Shape, Stroke, Ui,
};
use std::f64::consts::TAU;

use libwc_display::color::{plasma, Rgb};
use libwc_display::event::RenderMode;
use libwc_display::scene::{Camera, MarkerShape, Scene};

const COLORBAR_WIDTH: f32 = 90.0;
const PADDING: f32 = 10.0;
const RING_SEGMENTS: usize = 90;
const N_WALL_LINES: usize = 12;

fn color32(color: Rgb) -> Color32 {
    Color32::from_rgb(color.0, color.1, color.2)
}

fn faded(color: Rgb, opacity: f64) -> Color32 {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgba_unmultiplied(color.0, color.1, color.2, alpha)
}

fn marker(shape: MarkerShape, center: Pos2, radius: f32, color: Color32) -> Shape {
    match shape {
        MarkerShape::Circle => Shape::circle_filled(center, radius, color),
        MarkerShape::Square => Shape::rect_filled(
            Rect::from_center_size(center, vec2(2.0 * radius, 2.0 * radius)),
            0.0,
            color,
        ),
        MarkerShape::Triangle => {
            let r = radius * 1.2;
            Shape::convex_polygon(
                vec![
                    center + vec2(0.0, -r),
                    center + vec2(0.87 * r, 0.5 * r),
                    center + vec2(-0.87 * r, 0.5 * r),
                ],
                color,
                Stroke::NONE,
            )
        }
        MarkerShape::Ring => Shape::circle_stroke(center, radius, Stroke::new(1.0, color)),
    }
}

/// Paint a scene over the available space. Dragging in 3D rotates the camera
pub fn paint_scene(ui: &mut Ui, scene: &Scene, camera: &mut Camera) -> Response {
    let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::drag());
    let rect = response.rect;
    let plot = Rect::from_min_max(
        rect.min + vec2(PADDING, PADDING),
        pos2(rect.max.x - COLORBAR_WIDTH, rect.max.y - PADDING),
    );
    let bar = Rect::from_min_max(pos2(plot.max.x + PADDING, rect.min.y), rect.max);

    let shapes = match scene.mode {
        RenderMode::Unrolled => unrolled_shapes(scene, plot),
        RenderMode::Volume => {
            if response.dragged() {
                let delta = response.drag_delta();
                camera.rotate(delta.x as f64 * 0.01, delta.y as f64 * 0.01);
            }
            volume_shapes(scene, camera, plot)
        }
    };
    painter.extend(shapes);
    painter.extend(colorbar_shapes(ui, scene, bar));
    response
}

fn unrolled_shapes(scene: &Scene, plot: Rect) -> Vec<Shape> {
    let layout = &scene.layout;
    let (x0, x1) = layout.x_range;
    let (y0, y1) = layout.y_range;
    let scale = (plot.width() as f64 / (x1 - x0)).min(plot.height() as f64 / (y1 - y0));
    let (xc, yc) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
    let center = plot.center();
    let to_screen = |(x, y): (f64, f64)| {
        pos2(
            center.x + ((x - xc) * scale) as f32,
            center.y - ((y - yc) * scale) as f32,
        )
    };

    let silhouette = Color32::from_gray(45);
    let cap_radius = (layout.cap_radius * scale) as f32;
    let marker_radius = ((scene.marker_radius * scale) as f32).max(1.0);
    let mut shapes = vec![
        Shape::rect_filled(
            Rect::from_two_pos(to_screen(layout.barrel_min), to_screen(layout.barrel_max)),
            0.0,
            silhouette,
        ),
        Shape::circle_filled(to_screen(layout.top_cap_center), cap_radius, silhouette),
        Shape::circle_filled(to_screen(layout.bottom_cap_center), cap_radius, silhouette),
    ];
    shapes.extend(
        scene
            .markers
            .iter()
            .map(|m| marker(m.shape(), to_screen(m.chart), marker_radius, color32(m.color))),
    );
    shapes
}

fn volume_shapes(scene: &Scene, camera: &Camera, plot: Rect) -> Vec<Shape> {
    let extent = scene.radius.max(scene.half_height) * 1.2;
    let scale = plot.width().min(plot.height()) as f64 / (2.0 * extent);
    let center = plot.center();
    let to_screen = |p: [f64; 3]| -> Pos2 {
        let (right, up, _) = camera.project(p);
        pos2(
            center.x + (right * scale) as f32,
            center.y - (up * scale) as f32,
        )
    };

    let wall = Stroke::new(1.0, Color32::from_gray(110));
    let mut shapes = Vec::new();
    let (r, h) = (scene.radius, scene.half_height);
    for z in [h, -h] {
        let ring: Vec<Pos2> = (0..=RING_SEGMENTS)
            .map(|i| {
                let a = TAU * i as f64 / RING_SEGMENTS as f64;
                to_screen([r * a.cos(), r * a.sin(), z])
            })
            .collect();
        shapes.push(Shape::line(ring, wall));
    }
    for i in 0..N_WALL_LINES {
        let a = TAU * i as f64 / N_WALL_LINES as f64;
        let (x, y) = (r * a.cos(), r * a.sin());
        shapes.push(Shape::line_segment(
            [to_screen([x, y, -h]), to_screen([x, y, h])],
            Stroke::new(0.5, Color32::from_gray(70)),
        ));
    }

    // Far hits first
    let mut markers: Vec<(f64, Shape)> = scene
        .markers
        .iter()
        .map(|m| {
            let shape = marker(m.shape(), to_screen(m.world), 2.0, color32(m.color));
            (camera.project(m.world).2, shape)
        })
        .collect();
    markers.sort_by(|a, b| a.0.total_cmp(&b.0));
    shapes.extend(markers.into_iter().map(|(_, shape)| shape));

    for track in scene.tracks.iter() {
        let stroke = Stroke::new(
            track.style.width as f32,
            faded(track.style.color, track.style.opacity),
        );
        let points: Vec<Pos2> = track.points.iter().map(|p| to_screen(*p)).collect();
        if track.style.dashed {
            shapes.extend(Shape::dashed_line(&points, stroke, 6.0, 4.0));
        } else {
            shapes.push(Shape::line(points, stroke));
        }
    }
    shapes
}

fn colorbar_shapes(ui: &Ui, scene: &Scene, bar: Rect) -> Vec<Shape> {
    let top = bar.min.y + 40.0;
    let bottom = (bar.max.y - 40.0).max(top + 1.0);
    let (x0, x1) = (bar.min.x, bar.min.x + 20.0);
    let span = bottom - top;
    let steps = 100;
    let mut shapes: Vec<Shape> = (0..steps)
        .map(|i| {
            let t0 = i as f32 / steps as f32;
            let t1 = (i + 1) as f32 / steps as f32;
            Shape::rect_filled(
                Rect::from_min_max(pos2(x0, bottom - t1 * span), pos2(x1, bottom - t0 * span)),
                0.0,
                color32(plasma(((t0 + t1) / 2.0) as f64)),
            )
        })
        .collect();

    let text_color = ui.visuals().text_color();
    ui.fonts(|fonts| {
        shapes.push(Shape::text(
            fonts,
            pos2(x0, top - 20.0),
            Align2::LEFT_CENTER,
            scene.channel.to_string(),
            FontId::proportional(14.0),
            text_color,
        ));
        for (t, value) in scene.colorbar.iter() {
            shapes.push(Shape::text(
                fonts,
                pos2(x1 + 4.0, bottom - *t as f32 * span),
                Align2::LEFT_CENTER,
                format!("{value:.1}"),
                FontId::proportional(12.0),
                text_color,
            ));
        }
    });
    shapes
}
