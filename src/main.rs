use eframe::egui;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::PathBuf;

mod calibration;
mod crop;
mod font;
mod render;

use calibration::{CALIBRATIONS, CUSTOM_KEY};
use font::{FontRegistry, FONT_CHOICES};
use render::ScaleBarSpec;

// ── Defaults ────────────────────────────────────────────────────────────────

const DEFAULT_BAR_LENGTH_UM: f64 = 100.0;
const DEFAULT_BAR_THICKNESS: u32 = 5;
const DEFAULT_FONT_SIZE: u32 = 20;

/// Initial bar anchor: near the bottom-right corner, clamped for small images.
fn default_bar_position(width: u32, height: u32) -> (i32, i32) {
    ((width as i32 - 200).max(0), (height as i32 - 50).max(0))
}

// ── App ─────────────────────────────────────────────────────────────────────

struct OverlayApp {
    fonts: FontRegistry,

    source_path: Option<PathBuf>,
    /// Pristine decode of the opened file; crop and render never touch it.
    source: Option<RgbaImage>,
    /// Source with the current crop applied (or a plain copy).
    working: Option<RgbaImage>,
    rendered: Option<RgbaImage>,
    texture: Option<egui::TextureHandle>,

    /// Index into `CALIBRATIONS`; one past the end selects "Custom".
    selected: usize,
    custom_um_per_px: String,

    crop_enabled: bool,
    crop_offset: i32,

    bar_length_um: f64,
    bar_thickness: u32,
    bar_color: [u8; 3],
    label: String,
    font_name: &'static str,
    font_size: u32,
    label_x_offset: i32,
    bar_x: i32,
    bar_y: i32,

    /// Non-fatal notes from the last render (font fallback, label skipped).
    render_notes: Vec<String>,
    /// Terminal error for the last action.
    error: Option<String>,
    info: Option<String>,

    // pan & zoom
    pan: egui::Vec2,
    zoom: f32,
}

impl OverlayApp {
    fn new(initial_image: Option<PathBuf>) -> Self {
        let mut app = Self {
            fonts: FontRegistry::new(),
            source_path: None,
            source: None,
            working: None,
            rendered: None,
            texture: None,
            selected: 0,
            custom_um_per_px: String::new(),
            crop_enabled: false,
            crop_offset: 0,
            bar_length_um: DEFAULT_BAR_LENGTH_UM,
            bar_thickness: DEFAULT_BAR_THICKNESS,
            bar_color: [255, 255, 255],
            label: "100 µm".to_string(),
            font_name: FONT_CHOICES[0],
            font_size: DEFAULT_FONT_SIZE,
            label_x_offset: 0,
            bar_x: 0,
            bar_y: 0,
            render_notes: Vec::new(),
            error: None,
            info: None,
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
        };
        if let Some(path) = initial_image {
            app.load_image(path);
        }
        app
    }

    fn selected_key(&self) -> &'static str {
        if self.selected < CALIBRATIONS.len() {
            CALIBRATIONS[self.selected].0
        } else {
            CUSTOM_KEY
        }
    }

    fn load_image(&mut self, path: PathBuf) {
        match image::open(&path) {
            Ok(decoded) => {
                let rgba = decoded.to_rgba8();
                log::info!(
                    "opened {} ({}x{})",
                    path.display(),
                    rgba.width(),
                    rgba.height()
                );
                (self.bar_x, self.bar_y) = default_bar_position(rgba.width(), rgba.height());
                self.source = Some(rgba);
                self.source_path = Some(path);
                self.crop_offset = 0;
                self.pan = egui::Vec2::ZERO;
                self.zoom = 1.0;
                self.error = None;
                self.info = None;
                self.rebuild_working();
            }
            Err(e) => {
                log::error!("failed to open {}: {e}", path.display());
                self.error = Some(format!("Could not open {}: {e}", path.display()));
            }
        }
    }

    /// Re-derive the working image from the pristine source. Any previous
    /// render is based on stale pixels afterwards, so it is dropped.
    fn rebuild_working(&mut self) {
        let Some(source) = &self.source else {
            return;
        };
        self.working = if self.crop_enabled {
            let max = crop::max_offset(source.width(), source.height()) as i32;
            self.crop_offset = self.crop_offset.clamp(-max, max);
            match crop::crop_to_square(source, self.crop_offset) {
                Ok(cropped) => Some(cropped),
                Err(e) => {
                    self.error = Some(e.to_string());
                    Some(source.clone())
                }
            }
        } else {
            Some(source.clone())
        };
        self.rendered = None;
        self.texture = None;
    }

    fn invalidate_render(&mut self) {
        if self.rendered.take().is_some() {
            self.texture = None;
        }
    }

    /// Resolution encoded in the selected key vs. the opened image.
    fn mismatch_warning(&self) -> Option<String> {
        let key = self.selected_key();
        if key == CUSTOM_KEY {
            return None;
        }
        let expected = calibration::extract_resolution(key)?;
        let source = self.source.as_ref()?;
        let actual = (source.width(), source.height());
        if actual == expected {
            return None;
        }
        Some(format!(
            "Image is {}x{} but the selected objective expects {}x{}.",
            actual.0, actual.1, expected.0, expected.1
        ))
    }

    fn add_scale_bar(&mut self) {
        self.render_notes.clear();
        self.info = None;

        let Some(working) = self.working.clone() else {
            self.error = Some("Open an image first.".to_string());
            return;
        };

        let um_per_pixel =
            match calibration::resolve(self.selected_key(), &self.custom_um_per_px) {
                Ok(um) => um,
                Err(e) => {
                    log::warn!("calibration rejected: {e}");
                    self.error = Some(e.to_string());
                    return;
                }
            };

        let resolved = self.fonts.resolve(self.font_name);
        match &resolved {
            Some(f) if !f.exact => {
                let note =
                    format!("Font \"{}\" not available; using a fallback.", self.font_name);
                log::warn!("{note}");
                self.render_notes.push(note);
            }
            None => {
                let note = format!(
                    "No usable font found for \"{}\"; drawing the bar without a label.",
                    self.font_name
                );
                log::warn!("{note}");
                self.render_notes.push(note);
            }
            _ => {}
        }

        let [r, g, b] = self.bar_color;
        let spec = ScaleBarSpec {
            bar_length_um: self.bar_length_um,
            position: (self.bar_x, self.bar_y),
            thickness_px: self.bar_thickness,
            color: Rgba([r, g, b, 255]),
            label: self.label.clone(),
            font_size: self.font_size as f32,
            label_x_offset: self.label_x_offset,
        };

        match render::render_scale_bar(
            &working,
            um_per_pixel,
            &spec,
            resolved.as_ref().map(|f| &f.font),
        ) {
            Ok(out) => {
                log::info!(
                    "rendered {} µm bar at ({}, {}) with {} µm/px",
                    spec.bar_length_um,
                    spec.position.0,
                    spec.position.1,
                    um_per_pixel
                );
                self.rendered = Some(out);
                self.texture = None;
                self.error = None;
            }
            Err(e) => {
                self.error = Some(e.to_string());
            }
        }
    }

    fn save_rendered(&mut self) {
        let Some(rendered) = &self.rendered else {
            self.error = Some("Nothing rendered yet; add a scale bar first.".to_string());
            return;
        };

        let suggested = self
            .source_path
            .as_deref()
            .map(|p| render::download_file_name(p, self.bar_length_um))
            .unwrap_or_else(|| format!("image_scalebar_{}um.tiff", self.bar_length_um));

        let Some(target) = rfd::FileDialog::new()
            .add_filter("TIFF image", &["tiff", "tif"])
            .set_file_name(&suggested)
            .save_file()
        else {
            return;
        };

        let mut bytes = Vec::new();
        let written = rendered
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Tiff)
            .map_err(|e| e.to_string())
            .and_then(|_| std::fs::write(&target, &bytes).map_err(|e| e.to_string()));

        match written {
            Ok(()) => {
                log::info!("saved {}", target.display());
                self.info = Some(format!("Saved {}", target.display()));
                self.error = None;
            }
            Err(e) => {
                log::error!("failed to save {}: {e}", target.display());
                self.error = Some(format!("Could not save {}: {e}", target.display()));
            }
        }
    }

    fn open_image_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["jpg", "jpeg", "png", "tif", "tiff"])
            .pick_file()
        {
            self.load_image(path);
        }
    }

    fn display_image(&self) -> Option<&RgbaImage> {
        self.rendered.as_ref().or(self.working.as_ref())
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        let Some(img) = self.rendered.as_ref().or(self.working.as_ref()) else {
            return;
        };
        let size = [img.width() as usize, img.height() as usize];
        let pixels = img.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        self.texture = Some(ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR));
    }

    fn image_rect_on_screen(&self, canvas_rect: egui::Rect, size: (f32, f32)) -> egui::Rect {
        let center = canvas_rect.center() + self.pan;
        let half = egui::vec2(size.0, size.1) * self.zoom * 0.5;
        egui::Rect::from_min_max(center - half, center + half)
    }

    // ── Form panel ──────────────────────────────────────────────────────────

    fn controls_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Scalebar Overlay");
        ui.add_space(4.0);

        let mut dirty = false;

        egui::ComboBox::from_label("Microscope / objective")
            .selected_text(self.selected_key())
            .width(260.0)
            .show_ui(ui, |ui| {
                for (i, (key, _)) in CALIBRATIONS.iter().enumerate() {
                    if ui.selectable_value(&mut self.selected, i, *key).changed() {
                        dirty = true;
                    }
                }
                if ui
                    .selectable_value(&mut self.selected, CALIBRATIONS.len(), CUSTOM_KEY)
                    .changed()
                {
                    dirty = true;
                }
            });

        if self.selected_key() == CUSTOM_KEY {
            ui.horizontal(|ui| {
                ui.label("µm per pixel:");
                if ui.text_edit_singleline(&mut self.custom_um_per_px).changed() {
                    dirty = true;
                }
            });
        }

        ui.separator();

        ui.horizontal(|ui| {
            if ui.button("Open image…").clicked() {
                self.open_image_dialog();
            }
            if let Some(path) = &self.source_path {
                ui.label(
                    path.file_name()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .to_string(),
                );
            }
        });
        if let Some(source) = &self.source {
            ui.label(format!("{} x {} px", source.width(), source.height()));
        }

        if let Some(warning) = self.mismatch_warning() {
            ui.colored_label(egui::Color32::YELLOW, warning);
        }

        ui.separator();

        if ui
            .checkbox(&mut self.crop_enabled, "Crop to square (horizontal pixels)")
            .changed()
        {
            self.rebuild_working();
        }
        if self.crop_enabled {
            if let Some(source) = &self.source {
                let max = crop::max_offset(source.width(), source.height()) as i32;
                if ui
                    .add(egui::Slider::new(&mut self.crop_offset, -max..=max).text("Crop offset"))
                    .changed()
                {
                    self.rebuild_working();
                }
            }
        }

        ui.separator();

        ui.horizontal(|ui| {
            ui.label("Bar length:");
            if ui
                .add(
                    egui::DragValue::new(&mut self.bar_length_um)
                        .speed(1.0)
                        .range(0.0..=1_000_000.0)
                        .suffix(" µm"),
                )
                .changed()
            {
                dirty = true;
            }
        });
        if ui
            .add(egui::Slider::new(&mut self.bar_thickness, 1..=20).text("Bar thickness (px)"))
            .changed()
        {
            dirty = true;
        }
        ui.horizontal(|ui| {
            ui.label("Bar color:");
            if ui.color_edit_button_srgb(&mut self.bar_color).changed() {
                dirty = true;
            }
        });

        ui.horizontal(|ui| {
            ui.label("Label:");
            if ui.text_edit_singleline(&mut self.label).changed() {
                dirty = true;
            }
        });
        egui::ComboBox::from_label("Label font")
            .selected_text(self.font_name)
            .show_ui(ui, |ui| {
                for name in FONT_CHOICES {
                    if ui
                        .selectable_value(&mut self.font_name, *name, *name)
                        .changed()
                    {
                        dirty = true;
                    }
                }
            });
        if ui
            .add(egui::Slider::new(&mut self.font_size, 10..=500).text("Font size"))
            .changed()
        {
            dirty = true;
        }
        if ui
            .add(egui::Slider::new(&mut self.label_x_offset, -100..=100).text("Label x offset"))
            .changed()
        {
            dirty = true;
        }

        ui.horizontal(|ui| {
            ui.label("Bar position:");
            if ui
                .add(
                    egui::DragValue::new(&mut self.bar_x)
                        .range(0..=99_999)
                        .prefix("x "),
                )
                .changed()
            {
                dirty = true;
            }
            if ui
                .add(
                    egui::DragValue::new(&mut self.bar_y)
                        .range(0..=99_999)
                        .prefix("y "),
                )
                .changed()
            {
                dirty = true;
            }
        });

        ui.separator();

        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.working.is_some(), egui::Button::new("Add scale bar"))
                .clicked()
            {
                self.add_scale_bar();
            }
            if ui
                .add_enabled(self.rendered.is_some(), egui::Button::new("Save as TIFF…"))
                .clicked()
            {
                self.save_rendered();
            }
        });

        for note in &self.render_notes {
            ui.colored_label(egui::Color32::YELLOW, note);
        }
        if let Some(error) = &self.error {
            ui.colored_label(egui::Color32::LIGHT_RED, error);
        }
        if let Some(info) = &self.info {
            ui.label(info);
        }

        if dirty {
            self.invalidate_render();
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::S)) {
            if self.rendered.is_some() {
                self.save_rendered();
            }
        }
        if ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::O)) {
            self.open_image_dialog();
        }

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.controls_ui(ui);
                });
            });

        // The panel may have invalidated the texture; rebuild before drawing.
        self.ensure_texture(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;

            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

            let display_size = self
                .display_image()
                .map(|img| (img.width() as f32, img.height() as f32));
            if let (Some(tex), Some(size)) = (&self.texture, display_size) {
                let img_rect = self.image_rect_on_screen(canvas_rect, size);
                painter.image(
                    tex.id(),
                    img_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            } else {
                painter.text(
                    canvas_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Open an image to begin",
                    egui::FontId::proportional(18.0),
                    egui::Color32::GRAY,
                );
            }

            // Pan (middle mouse button)
            if ctx.input(|i| i.pointer.middle_down()) {
                self.pan += ctx.input(|i| i.pointer.delta());
            }

            // Zoom (scroll wheel), anchored at the cursor
            let scroll_delta = ctx.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 && response.hovered() {
                let zoom_factor = 1.0 + scroll_delta * 0.002;
                let new_zoom = (self.zoom * zoom_factor).clamp(0.1, 10.0);
                if let Some(cursor) = response.hover_pos() {
                    let center = canvas_rect.center();
                    let cursor_rel = cursor - center - self.pan;
                    self.pan -= cursor_rel * (new_zoom / self.zoom - 1.0);
                }
                self.zoom = new_zoom;
            }
        });
    }
}

// ── Main ────────────────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let image_path = std::env::args().nth(1).map(PathBuf::from);
    if let Some(path) = &image_path {
        if !path.exists() {
            eprintln!("File not found: {}", path.display());
            std::process::exit(1);
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_title("scalebar-overlay"),
        ..Default::default()
    };

    eframe::run_native(
        "scalebar-overlay",
        options,
        Box::new(move |_cc| Ok(Box::new(OverlayApp::new(image_path)))),
    )
    .expect("Failed to run eframe");
}
