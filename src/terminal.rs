// SPDX-License-Identifier: GPL-3.0-only

//! Terminal kiosk
//!
//! Full-screen flow: start → weapon → land → companion → name → camera.
//! Pictures (preview frames, choice images, the captured photo) are drawn
//! with Unicode half-block characters for double vertical resolution.
//!
//! The loop waits on three sources at once: terminal input, the capture
//! coordinator's next timer or camera event, and a redraw tick that keeps
//! live preview frames flowing.

use crate::app::{CaptureCoordinator, CaptureState, ChoiceCatalog, ChoiceCategory, CoordinatorUpdate};
use crate::backends::camera::{CameraSelector, PreviewContent, PreviewSurface, PreviewTone};
use crate::config::Config;
use crate::constants::timing::UI_FRAME_INTERVAL;
use crate::errors::CoordinatorError;

use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use image::RgbaImage;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};
use std::io::{self, stdout};
use tracing::{debug, info, warn};

/// Run the kiosk until the user exits
pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Single-threaded scheduler: camera events, timers and input share it
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = runtime.block_on(run_app(&mut terminal, &config));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

enum Wake {
    Input(Option<io::Result<Event>>),
    Update(CoordinatorUpdate),
    Redraw,
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kiosk = Kiosk::new(config);
    let mut input = EventStream::new();
    let mut redraw = tokio::time::interval(UI_FRAME_INTERVAL);

    loop {
        terminal.draw(|f| kiosk.render(f))?;
        if kiosk.quit {
            break;
        }

        let wake = tokio::select! {
            event = input.next() => Wake::Input(event),
            update = kiosk.coordinator.next_update() => Wake::Update(update),
            _ = redraw.tick() => Wake::Redraw,
        };

        match wake {
            Wake::Input(Some(Ok(Event::Key(key)))) if key.kind == KeyEventKind::Press => {
                kiosk.handle_key(key);
            }
            Wake::Input(Some(Err(e))) => return Err(e.into()),
            Wake::Input(None) => break,
            Wake::Input(_) | Wake::Redraw => {}
            Wake::Update(update) => kiosk.apply_update(update),
        }
    }

    kiosk.coordinator.close().await;
    info!("Kiosk closed");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Start,
    Choice(ChoiceCategory),
    Name,
    Camera,
}

struct Kiosk {
    screen: Screen,
    coordinator: CaptureCoordinator,
    catalog: ChoiceCatalog,
    preview: Option<PreviewSurface>,
    backend_label: String,
    cursor: usize,
    name_input: String,
    status: String,
    quit: bool,
}

impl Kiosk {
    fn new(config: &Config) -> Self {
        let selector = CameraSelector::new(config.photo_store());
        let coordinator = CaptureCoordinator::open(&selector, config.backend)
            .with_countdown(config.countdown_seconds);

        let catalog = match &config.catalog_dir {
            Some(dir) => ChoiceCatalog::load(dir),
            None => ChoiceCatalog::empty(),
        };

        let backend_label = match coordinator.camera_kind() {
            Some(kind) => CameraSelector::describe(kind).to_string(),
            None => "No camera".to_string(),
        };
        info!(camera = %backend_label, photos = %selector.store().dir().display(), "Kiosk ready");

        Self {
            screen: Screen::Start,
            preview: coordinator.preview_surface(),
            coordinator,
            catalog,
            backend_label,
            cursor: 0,
            name_input: String::new(),
            status: String::new(),
            quit: false,
        }
    }

    fn go_to(&mut self, screen: Screen) {
        debug!(from = ?self.screen, to = ?screen, "Screen change");
        self.screen = screen;
        self.cursor = 0;
    }

    fn back_to_start(&mut self) {
        self.coordinator.cancel();
        self.name_input.clear();
        self.go_to(Screen::Start);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return;
        }

        match self.screen {
            Screen::Start => match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => {
                    self.coordinator.new_session();
                    self.status.clear();
                    self.go_to(Screen::Choice(ChoiceCategory::Weapon));
                }
                KeyCode::Esc | KeyCode::Char('q') => self.quit = true,
                _ => {}
            },
            Screen::Choice(category) => self.handle_choice_key(category, key.code),
            Screen::Name => self.handle_name_key(key.code),
            Screen::Camera => self.handle_camera_key(key.code),
        }
    }

    fn handle_choice_key(&mut self, category: ChoiceCategory, code: KeyCode) {
        let ids = category.ids();
        match code {
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(ids.len().saturating_sub(1)),
            KeyCode::Char(c @ '1'..='9') => {
                let index = (c as usize) - ('1' as usize);
                if index < ids.len() {
                    self.cursor = index;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let Some(id) = ids.get(self.cursor) else {
                    return;
                };
                match self.coordinator.choose(category, id) {
                    Ok(()) => {
                        info!(category = %category, id = %id, "Choice made");
                        let next = match category {
                            ChoiceCategory::Weapon => Screen::Choice(ChoiceCategory::Land),
                            ChoiceCategory::Land => Screen::Choice(ChoiceCategory::Companion),
                            ChoiceCategory::Companion => Screen::Name,
                        };
                        self.go_to(next);
                    }
                    Err(e) => self.status = e.to_string(),
                }
            }
            KeyCode::Esc => self.back_to_start(),
            _ => {}
        }
    }

    fn handle_name_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) if !c.is_control() && self.name_input.chars().count() < 32 => {
                self.name_input.push(c);
            }
            KeyCode::Backspace => {
                self.name_input.pop();
            }
            KeyCode::Enter => {
                self.coordinator.set_user_name(&self.name_input);
                match self.coordinator.begin() {
                    Ok(()) => {
                        self.status = "Ready to take photo!".to_string();
                        self.go_to(Screen::Camera);
                    }
                    Err(e) => {
                        warn!(error = %e, "Camera screen unavailable");
                        self.back_to_start();
                        self.status = e.to_string();
                    }
                }
            }
            KeyCode::Esc => self.back_to_start(),
            _ => {}
        }
    }

    fn handle_camera_key(&mut self, code: KeyCode) {
        let result: Result<(), CoordinatorError> = match code {
            KeyCode::Char(' ') | KeyCode::Char('p') => self.coordinator.request_capture(),
            KeyCode::Char('r') => self.coordinator.retake(),
            KeyCode::Enter => {
                let result = self.coordinator.finish();
                if result.is_ok() {
                    self.name_input.clear();
                    self.status = "Thanks for visiting!".to_string();
                    self.go_to(Screen::Start);
                }
                result
            }
            KeyCode::Esc => {
                self.back_to_start();
                Ok(())
            }
            _ => Ok(()),
        };

        if let Err(e) = result {
            debug!(error = %e, "Key ignored");
        }
    }

    fn apply_update(&mut self, update: CoordinatorUpdate) {
        match update {
            CoordinatorUpdate::PhotoReady(asset) => {
                self.status = format!("Saved: {}", asset.path.display());
            }
            CoordinatorUpdate::CaptureFailed(message) => self.status = message,
            CoordinatorUpdate::Recovered => self.status = "Ready to take photo!".to_string(),
            CoordinatorUpdate::CaptureStarted => self.status = "Capturing...".to_string(),
            CoordinatorUpdate::Countdown(_)
            | CoordinatorUpdate::CaptureIndicator
            | CoordinatorUpdate::PreviewStarted
            | CoordinatorUpdate::PreviewStopped => {}
        }
    }

    fn render(&self, f: &mut Frame) {
        let [body, status_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(f.area());

        match self.screen {
            Screen::Start => self.render_start(f, body),
            Screen::Choice(category) => self.render_choice(f, body, category),
            Screen::Name => self.render_name(f, body),
            Screen::Camera => self.render_camera(f, body),
        }

        let message = if self.status.is_empty() {
            self.hint()
        } else {
            format!("{} | {}", self.status, self.hint())
        };
        f.render_widget(StatusBar { message: &message }, status_area);
    }

    fn hint(&self) -> String {
        match self.screen {
            Screen::Start => "Enter: start | q: exit".to_string(),
            Screen::Choice(_) => "←/→ or 1-4: select | Enter: choose | Esc: back".to_string(),
            Screen::Name => "Type your name | Enter: continue | Esc: back".to_string(),
            Screen::Camera => {
                let state = self.coordinator.state();
                if state.shows_review_actions() {
                    "r: Retake | Enter: Continue | Esc: cancel".to_string()
                } else if state.accepts_capture() {
                    "Space: Take Photo | Esc: cancel".to_string()
                } else {
                    "Esc: cancel".to_string()
                }
            }
        }
    }

    fn render_start(&self, f: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from("📷 Photo Booth").style(Style::default().add_modifier(Modifier::BOLD)),
            Line::from(""),
            Line::from("Press Enter to start"),
            Line::from(""),
            Line::from(format!("Camera: {}", self.backend_label))
                .style(Style::default().fg(Color::DarkGray)),
        ];
        let height = lines.len() as u16;
        let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
        f.render_widget(paragraph, centered_rows(area, height));
    }

    fn render_choice(&self, f: &mut Frame, area: Rect, category: ChoiceCategory) {
        let [title_area, grid_area] =
            Layout::vertical([Constraint::Length(2), Constraint::Min(1)]).areas(area);
        f.render_widget(
            Paragraph::new(category.title())
                .alignment(Alignment::Center)
                .style(Style::default().add_modifier(Modifier::BOLD)),
            title_area,
        );

        let ids = category.ids();
        let columns = Layout::horizontal(vec![Constraint::Ratio(1, ids.len() as u32); ids.len()])
            .split(grid_area);

        for (index, (id, cell)) in ids.iter().zip(columns.iter()).enumerate() {
            let selected = index == self.cursor;
            let border_style = if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(format!(" {} ", index + 1));
            let inner = block.inner(*cell);
            f.render_widget(block, *cell);

            match self.catalog.image(id) {
                Some(image) => f.render_widget(ImageWidget { image }, inner),
                None => f.render_widget(
                    Paragraph::new(id.as_str()).alignment(Alignment::Center),
                    centered_rows(inner, 1),
                ),
            }
        }
    }

    fn render_name(&self, f: &mut Frame, area: Rect) {
        let input = format!("{}_", self.name_input);
        let lines = vec![
            Line::from("What is your name?").style(Style::default().add_modifier(Modifier::BOLD)),
            Line::from(""),
            Line::from(input).style(Style::default().fg(Color::Yellow)),
        ];
        f.render_widget(
            Paragraph::new(lines).alignment(Alignment::Center),
            centered_rows(area, 3),
        );
    }

    fn render_camera(&self, f: &mut Frame, area: Rect) {
        let state = self.coordinator.state();

        match state.photo() {
            Some(photo) => f.render_widget(ImageWidget { image: &photo.image }, area),
            None => match self.preview.as_ref().map(PreviewSurface::peek) {
                Some(PreviewContent::Frame(frame)) => {
                    f.render_widget(ImageWidget { image: &frame }, area)
                }
                Some(PreviewContent::Placeholder {
                    title,
                    detail,
                    tone,
                }) => f.render_widget(
                    Placeholder {
                        title: &title,
                        detail: &detail,
                        tone,
                    },
                    area,
                ),
                None => f.render_widget(
                    Placeholder {
                        title: "No camera",
                        detail: "",
                        tone: PreviewTone::Idle,
                    },
                    area,
                ),
            },
        }

        if let Some(text) = state.overlay_text() {
            let detail = match state {
                CaptureState::Errored { message } => message.clone(),
                _ => String::new(),
            };
            let width = (detail.chars().count().max(10) as u16 + 4).min(area.width);
            let height = if detail.is_empty() { 3 } else { 4 };
            let overlay = centered_rect(area, width, height);

            let mut lines = vec![Line::from(text).style(Style::default().add_modifier(Modifier::BOLD))];
            if !detail.is_empty() {
                lines.push(Line::from(detail));
            }

            f.render_widget(Clear, overlay);
            f.render_widget(
                Paragraph::new(lines)
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL)),
                overlay,
            );
        }
    }
}

fn centered_rows(area: Rect, height: u16) -> Rect {
    let height = height.min(area.height);
    Rect {
        x: area.x,
        y: area.y + (area.height - height) / 2,
        width: area.width,
        height,
    }
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Renders an image using half-block characters
struct ImageWidget<'a> {
    image: &'a RgbaImage,
}

impl Widget for ImageWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 || area.width == 0 || area.height == 0 {
            return;
        }

        // Each terminal cell displays 2 vertical pixels
        let frame_aspect = width as f64 / height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = width as f64 / display_width as f64;
        let y_scale = height as f64 / (display_height * 2) as f64;

        // Upper half (▀) takes the fg colour, lower half the bg colour
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let top = sample_pixel(self.image, src_x, src_y_top);
                let bottom = sample_pixel(self.image, src_x, src_y_bottom);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(top);
                    cell.set_bg(bottom);
                }
            }
        }
    }
}

fn sample_pixel(image: &RgbaImage, x: u32, y: u32) -> Color {
    let x = x.min(image.width() - 1);
    let y = y.min(image.height() - 1);
    let [r, g, b, _] = image.get_pixel(x, y).0;
    Color::Rgb(r, g, b)
}

/// Text-only preview
struct Placeholder<'a> {
    title: &'a str,
    detail: &'a str,
    tone: PreviewTone,
}

impl Widget for Placeholder<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let accent = match self.tone {
            PreviewTone::Idle => Color::Gray,
            PreviewTone::Live => Color::Green,
            PreviewTone::Capturing => Color::Yellow,
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent));
        let inner = block.inner(area);
        block.render(area, buf);

        let lines = vec![
            Line::from(self.title).style(Style::default().fg(accent).add_modifier(Modifier::BOLD)),
            Line::from(""),
            Line::from(self.detail),
        ];
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(centered_rows(inner, 3), buf);
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_widget_fills_cells_with_half_blocks() {
        let image = RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        ImageWidget { image: &image }.render(area, &mut buf);

        let cell = &buf[(0, 0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
    }

    #[test]
    fn status_bar_truncates() {
        let area = Rect::new(0, 0, 5, 1);
        let mut buf = Buffer::empty(area);
        StatusBar {
            message: "abcdefgh",
        }
        .render(area, &mut buf);
        assert_eq!(buf[(4, 0)].symbol(), "e");
    }

    #[test]
    fn centered_rect_stays_inside() {
        let area = Rect::new(2, 2, 10, 4);
        let rect = centered_rect(area, 20, 3);
        assert_eq!(rect.width, 10);
        assert!(rect.y >= area.y && rect.bottom() <= area.bottom());
    }
}
