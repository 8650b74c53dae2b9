use super::{Tool, ToolBinding, ToolCtx, ToolKind, ToolOutput};
use crate::drawable::DrawableKind;
use crate::geometry::{TEXT_HEIGHT_ESTIMATE, TEXT_WIDTH_ESTIMATE};
use crate::raster;
use ab_glyph::FontArc;
use egui::{Pos2, Rect};

/// Keyboard events the text session reacts to. Everything else goes
/// through [`TextTool::input_char`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKey {
    Enter { shift: bool },
    Escape,
}

/// Text width measurement used by the word-wrap. Abstracted so wrapping
/// stays deterministic in tests that run without a loaded font.
pub trait TextMeasure {
    fn width(&self, text: &str, font_size: f32) -> f32;
}

/// Fallback measure when no font is available: a flat per-character
/// estimate.
pub struct EstimateMeasure;

impl TextMeasure for EstimateMeasure {
    fn width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * TEXT_WIDTH_ESTIMATE
    }
}

/// Glyph-accurate measure backed by the loaded UI font.
pub struct GlyphMeasure<'a> {
    font: &'a FontArc,
}

impl<'a> GlyphMeasure<'a> {
    pub fn new(font: &'a FontArc) -> Self {
        Self { font }
    }
}

impl TextMeasure for GlyphMeasure<'_> {
    fn width(&self, text: &str, font_size: f32) -> f32 {
        raster::measure_line(self.font, text, font_size)
    }
}

fn break_word(word: &str, available: f32, font_size: f32, measure: &dyn TextMeasure) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut chunk = String::new();
    for ch in word.chars() {
        let mut candidate = chunk.clone();
        candidate.push(ch);
        if !chunk.is_empty() && measure.width(&candidate, font_size) > available {
            chunks.push(std::mem::take(&mut chunk));
            chunk.push(ch);
        } else {
            chunk = candidate;
        }
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}

/// Word-wrap `content` into lines no wider than `available`. Paragraphs
/// split on `'\n'` first; a word wider than the whole line is broken at
/// character granularity so it still makes progress.
pub fn wrap_text(
    content: &str,
    available: f32,
    font_size: f32,
    measure: &dyn TextMeasure,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in content.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if measure.width(word, font_size) > available {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let mut chunks = break_word(word, available, font_size, measure);
                if let Some(last) = chunks.pop() {
                    lines.append(&mut chunks);
                    line = last;
                }
                continue;
            }
            let candidate = if line.is_empty() {
                word.to_owned()
            } else {
                format!("{line} {word}")
            };
            if !line.is_empty() && measure.width(&candidate, font_size) > available {
                lines.push(std::mem::take(&mut line));
                line = word.to_owned();
            } else {
                line = candidate;
            }
        }
        lines.push(line);
    }
    // A trailing empty paragraph renders as an empty line, which is what
    // the overlay editor shows, so keep it.
    lines
}

/// An open in-place editing session.
pub struct TextSession {
    pub anchor: Pos2,
    pub buffer: String,
    pub available_width: f32,
    pub available_height: f32,
    /// Wrapped content no longer fits the space below the anchor
    pub out_of_bounds: bool,
}

/// Click-to-place text entry. A click opens an overlay session anchored at
/// the clicked point; typing edits a buffer, Enter commits, Shift+Enter
/// inserts a newline, Escape cancels. Clicking elsewhere while a session
/// is open commits it and opens a new one at the new anchor.
pub struct TextTool {
    binding: ToolBinding,
    session: Option<TextSession>,
    pending: Option<Pos2>,
}

impl TextTool {
    pub fn new(binding: ToolBinding) -> Self {
        Self {
            binding,
            session: None,
            pending: None,
        }
    }

    pub fn session(&self) -> Option<&TextSession> {
        self.session.as_ref()
    }

    pub fn input_char(&mut self, ch: char) {
        if let Some(session) = &mut self.session {
            if ch == '\n' || !ch.is_control() {
                session.buffer.push(ch);
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(session) = &mut self.session {
            session.buffer.pop();
        }
    }

    /// Clamp the session anchor into the canvas and recompute how much
    /// room the session has before it runs off the right/bottom edge.
    pub fn sync_bounds(&mut self, canvas: Rect, font: Option<&FontArc>) {
        let font_size = self.binding.style.font_size;
        let Some(session) = &mut self.session else {
            return;
        };
        session.anchor = canvas.clamp(session.anchor);
        session.available_width = (canvas.max.x - session.anchor.x).max(0.0);
        session.available_height = (canvas.max.y - session.anchor.y).max(0.0);
        let lines = match font {
            Some(font) => wrap_text(
                &session.buffer,
                session.available_width,
                font_size,
                &GlyphMeasure::new(font),
            ),
            None => wrap_text(
                &session.buffer,
                session.available_width,
                font_size,
                &EstimateMeasure,
            ),
        };
        let height = lines.len() as f32 * font_size * TEXT_HEIGHT_ESTIMATE;
        session.out_of_bounds = height > session.available_height;
    }

    pub fn handle_key(&mut self, key: TextKey, font: Option<&FontArc>) -> Option<ToolOutput> {
        match key {
            TextKey::Enter { shift: true } => {
                self.input_char('\n');
                None
            }
            TextKey::Enter { shift: false } => self.finish(font),
            TextKey::Escape => {
                self.session = None;
                None
            }
        }
    }

    fn open_session(&mut self, anchor: Pos2, canvas: Rect) {
        let anchor = canvas.clamp(anchor);
        self.session = Some(TextSession {
            anchor,
            buffer: String::new(),
            available_width: (canvas.max.x - anchor.x).max(0.0),
            available_height: (canvas.max.y - anchor.y).max(0.0),
            out_of_bounds: false,
        });
    }

    /// Close the session and turn a non-empty buffer into a committed text
    /// drawable with its wrapped line layout baked in.
    fn finish(&mut self, font: Option<&FontArc>) -> Option<ToolOutput> {
        let session = self.session.take()?;
        if session.buffer.trim().is_empty() {
            return None;
        }
        let font_size = self.binding.style.font_size;
        let lines = match font {
            Some(font) => wrap_text(
                &session.buffer,
                session.available_width,
                font_size,
                &GlyphMeasure::new(font),
            ),
            None => wrap_text(
                &session.buffer,
                session.available_width,
                font_size,
                &EstimateMeasure,
            ),
        };
        let width = lines
            .iter()
            .map(|line| match font {
                Some(font) => GlyphMeasure::new(font).width(line, font_size),
                None => EstimateMeasure.width(line, font_size),
            })
            .fold(0.0_f32, f32::max);
        let height = lines.len() as f32 * font_size * TEXT_HEIGHT_ESTIMATE;
        Some(ToolOutput::Commit {
            kind: DrawableKind::Text {
                pos: session.anchor,
                content: session.buffer,
                lines,
                width,
                height,
            },
            style: self.binding.style,
        })
    }
}

impl Tool for TextTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Text
    }

    fn begin(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) {
        if !ctx.registry.contains(self.binding.surface) {
            return;
        }
        self.pending = Some(self.binding.to_canvas(pos));
    }

    fn update(&mut self, _ctx: &mut ToolCtx<'_>, _pos: Pos2) -> Option<ToolOutput> {
        None
    }

    fn commit(&mut self, ctx: &mut ToolCtx<'_>, _pos: Pos2) -> Option<ToolOutput> {
        let anchor = self.pending.take()?;
        let surface = ctx.registry.get(self.binding.surface)?;
        let (width, height) = surface.logical_size();
        let canvas = Rect::from_min_size(Pos2::ZERO, egui::vec2(width as f32, height as f32));
        // A click while a session is open commits it, then re-anchors.
        let out = self.finish(ctx.font);
        self.open_session(anchor, canvas);
        out
    }

    fn teardown(&mut self, _ctx: &mut ToolCtx<'_>) {
        // Switching tools abandons the session without committing.
        self.session = None;
        self.pending = None;
    }
}
