//! Layout and drawing: board, tray, dragged piece, hover preview, sidebar, score bursts, overlays.

use crate::animation::CLEAR_FLASH;
use crate::game::{Anchor, Cell, GameState, TRAY_SIZE};
use crate::interaction::{ClearFlash, Interaction, Mode};
use crate::pieces::{MAX_SIDE, Shape};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

const SIDEBAR_WIDTH: u16 = 26;
/// Stats block + gap + button + gap + keys block.
const SIDEBAR_HEIGHT: u16 = 18;
const NEW_GAME_ROW: u16 = 6;
const NEW_GAME_LABEL: &str = "[ New Game ]";
const KEYS_ROW: u16 = 8;
/// Board cell size in terminal cells, largest first.
const CELL_SIZES: [(u16, u16); 2] = [(4, 2), (2, 1)];
const TRAY_CELL: (u16, u16) = (2, 1);

/// Screen placement of every interactive element. Shared by drawing and pointer hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub board_frame: Rect,
    /// Cell grid inside the board border.
    pub board: Rect,
    pub tray_frame: Rect,
    /// One 3x3 tray-cell box per slot.
    pub slots: [Rect; TRAY_SIZE],
    pub sidebar: Rect,
    pub new_game: Rect,
    pub cell_w: u16,
    pub cell_h: u16,
    pub tray_cell_w: u16,
    pub tray_cell_h: u16,
}

impl Geometry {
    /// Center board, tray and sidebar in `area`, using the biggest cells that fit.
    pub fn compute(area: Rect, rows: usize, cols: usize) -> Self {
        let (rows, cols) = (rows as u16, cols as u16);
        let (tray_cell_w, tray_cell_h) = TRAY_CELL;
        let slot_w = MAX_SIDE as u16 * tray_cell_w;
        let slot_h = MAX_SIDE as u16 * tray_cell_h;
        let tray_h = slot_h + 2;
        let tray_min_w = TRAY_SIZE as u16 * (slot_w + 2) + 2;

        let outer = |(cw, ch): (u16, u16)| {
            let board_w = cols * cw + 2;
            let board_h = rows * ch + 2;
            let left_w = board_w.max(tray_min_w);
            (board_w, board_h, left_w)
        };
        let (cell_w, cell_h) = CELL_SIZES
            .into_iter()
            .find(|&size| {
                let (_, board_h, left_w) = outer(size);
                left_w + SIDEBAR_WIDTH <= area.width && board_h + tray_h <= area.height
            })
            .unwrap_or(CELL_SIZES[CELL_SIZES.len() - 1]);
        let (board_w, board_h, left_w) = outer((cell_w, cell_h));

        let total_w = left_w + SIDEBAR_WIDTH;
        let total_h = (board_h + tray_h).max(SIDEBAR_HEIGHT);
        let x0 = area.x + area.width.saturating_sub(total_w) / 2;
        let y0 = area.y + area.height.saturating_sub(total_h) / 2;

        let board_frame = Rect::new(x0 + (left_w - board_w) / 2, y0, board_w, board_h);
        let tray_frame = Rect::new(x0, y0 + board_h, left_w, tray_h);
        let tray_inner = inner(tray_frame);
        let spacing = tray_inner.width / TRAY_SIZE as u16;
        let slots = std::array::from_fn(|i| {
            Rect::new(
                tray_inner.x + i as u16 * spacing + spacing.saturating_sub(slot_w) / 2,
                tray_inner.y,
                slot_w,
                slot_h,
            )
        });
        let sidebar = Rect::new(x0 + left_w, y0, SIDEBAR_WIDTH, total_h);
        let new_game = Rect::new(
            sidebar.x + 1,
            sidebar.y + NEW_GAME_ROW,
            NEW_GAME_LABEL.len() as u16,
            1,
        );

        Self {
            board_frame,
            board: inner(board_frame),
            tray_frame,
            slots,
            sidebar,
            new_game,
            cell_w,
            cell_h,
            tray_cell_w,
            tray_cell_h,
        }
    }

    /// Board cell (row, col) under a terminal position.
    pub fn board_cell_at(&self, column: u16, row: u16) -> Option<(usize, usize)> {
        if !self.board.contains(Position::new(column, row)) {
            return None;
        }
        Some((
            usize::from((row - self.board.y) / self.cell_h),
            usize::from((column - self.board.x) / self.cell_w),
        ))
    }

    /// Tray slot and sub-cell (i, j) under a terminal position.
    pub fn tray_hit(&self, column: u16, row: u16) -> Option<(usize, usize, usize)> {
        let pos = Position::new(column, row);
        self.slots.iter().enumerate().find_map(|(slot, r)| {
            r.contains(pos).then(|| {
                (
                    slot,
                    usize::from((row - r.y) / self.tray_cell_h),
                    usize::from((column - r.x) / self.tray_cell_w),
                )
            })
        })
    }

    pub fn hits_new_game(&self, column: u16, row: u16) -> bool {
        self.new_game.contains(Position::new(column, row))
    }

    /// Screen position of a board cell's top-left corner.
    pub fn cell_origin(&self, anchor: Anchor) -> (i32, i32) {
        (
            i32::from(self.board.x) + anchor.col as i32 * i32::from(self.cell_w),
            i32::from(self.board.y) + anchor.row as i32 * i32::from(self.cell_h),
        )
    }

    /// Roughly the middle of `shape` placed at `anchor`; where its score burst starts.
    pub fn shape_center(&self, anchor: Anchor, shape: &Shape) -> (i32, i32) {
        let (x, y) = self.cell_origin(anchor);
        (
            x + (shape.cols() as i32 * i32::from(self.cell_w)) / 2 - 1,
            y + (shape.rows() as i32 * i32::from(self.cell_h)) / 2,
        )
    }

    pub fn slot_origin(&self, slot: usize) -> (i32, i32) {
        self.slots
            .get(slot)
            .map_or((0, 0), |r| (i32::from(r.x), i32::from(r.y)))
    }
}

fn inner(r: Rect) -> Rect {
    Rect::new(
        r.x.saturating_add(1),
        r.y.saturating_add(1),
        r.width.saturating_sub(2),
        r.height.saturating_sub(2),
    )
}

/// Fade of the last line clear. Rebuilt whenever a new clear flash starts.
#[derive(Default)]
pub struct ClearFx {
    effect: Option<Effect>,
    last_process: Option<Instant>,
    flash_started: Option<Instant>,
}

impl ClearFx {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn render(&mut self, frame: &mut Frame, flash: &ClearFlash, geo: &Geometry, theme: &Theme, now: Instant) {
        if self.flash_started != Some(flash.started) {
            let positions = clearing_buffer_positions(geo, flash);
            let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
                positions.contains(&(pos.x, pos.y))
            }));
            let ms = CLEAR_FLASH.as_millis().min(u128::from(u32::MAX)) as u32;
            self.effect = Some(
                fx::fade_to(theme.empty, theme.bg, (ms, Interpolation::Linear))
                    .with_filter(filter)
                    .with_area(geo.board),
            );
            self.flash_started = Some(flash.started);
            self.last_process = None;
        }
        let delta = self
            .last_process
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default();
        self.last_process = Some(now);
        let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
        if let Some(effect) = self.effect.as_mut() {
            frame.render_effect(effect, geo.board.intersection(frame.area()), TfxDuration::from_millis(delta_ms));
        }
    }
}

/// Buffer positions covered by the cleared cells.
fn clearing_buffer_positions(geo: &Geometry, flash: &ClearFlash) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &(r, c, _) in &flash.cells {
        let x0 = geo.board.x + c as u16 * geo.cell_w;
        let y0 = geo.board.y + r as u16 * geo.cell_h;
        for x in x0..x0 + geo.cell_w {
            for y in y0..y0 + geo.cell_h {
                set.insert((x, y));
            }
        }
    }
    set
}

/// Draw one frame.
pub fn draw(
    frame: &mut Frame,
    game: &GameState,
    ix: &Interaction,
    theme: &Theme,
    geo: &Geometry,
    clear_fx: &mut ClearFx,
    now: Instant,
) {
    let area = frame.area();
    frame
        .buffer_mut()
        .set_style(area, Style::default().bg(theme.bg));

    draw_board(frame.buffer_mut(), game, ix, theme, geo);
    draw_tray(frame.buffer_mut(), game, ix, theme, geo);
    draw_sidebar(frame.buffer_mut(), game, theme, geo);

    match ix.flash() {
        Some(flash) => clear_fx.render(frame, flash, geo, theme, now),
        None => clear_fx.reset(),
    }

    draw_lifted(frame.buffer_mut(), game, ix, theme, geo, now);
    draw_bursts(frame.buffer_mut(), ix, theme, now);

    match ix.mode() {
        Mode::GameOver => draw_game_over(frame.buffer_mut(), game, theme, area),
        Mode::ConfirmReset { .. } => draw_confirm_reset(frame.buffer_mut(), theme, area),
        _ => {}
    }
}

fn framed(title: &str, theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.grid).bg(theme.bg))
        .title(Span::styled(format!(" {title} "), Style::default().fg(theme.title)))
}

/// Write `symbol` at a signed position if it is on screen.
fn put(buf: &mut Buffer, x: i32, y: i32, symbol: &str, style: Style) {
    let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) else {
        return;
    };
    if let Some(cell) = buf.cell_mut(Position::new(x, y)) {
        cell.set_symbol(symbol).set_style(style);
    }
}

/// Solid block of `w` x `h` terminal cells; wide cells keep a one-column gap on the right.
fn paint_block(buf: &mut Buffer, x: i32, y: i32, (w, h): (u16, u16), symbol: &str, style: Style) {
    let filled = if w >= 4 { w - 1 } else { w };
    for dy in 0..i32::from(h) {
        for dx in 0..i32::from(filled) {
            put(buf, x + dx, y + dy, symbol, style);
        }
    }
}

fn draw_shape(buf: &mut Buffer, shape: &Shape, origin: (i32, i32), size: (u16, u16), symbol: &str, style: Style) {
    for (i, j) in shape.cells() {
        paint_block(
            buf,
            origin.0 + j as i32 * i32::from(size.0),
            origin.1 + i as i32 * i32::from(size.1),
            size,
            symbol,
            style,
        );
    }
}

fn draw_board(buf: &mut Buffer, game: &GameState, ix: &Interaction, theme: &Theme, geo: &Geometry) {
    framed("blocktui", theme).render(geo.board_frame.intersection(buf.area), buf);

    let board = game.board();
    let size = (geo.cell_w, geo.cell_h);
    for r in 0..board.rows() {
        for c in 0..board.cols() {
            let (x, y) = geo.cell_origin(Anchor::new(r as isize, c as isize));
            match board.get(r, c) {
                Some(Cell::Filled(tag)) => {
                    paint_block(buf, x, y, size, "█", Style::default().fg(theme.block(tag)).bg(theme.bg));
                }
                _ => put(buf, x, y, "·", Style::default().fg(theme.empty).bg(theme.bg)),
            }
        }
    }

    // Cleared cells keep their colour until the fade has run.
    if let Some(flash) = ix.flash() {
        for &(r, c, tag) in &flash.cells {
            let (x, y) = geo.cell_origin(Anchor::new(r as isize, c as isize));
            paint_block(buf, x, y, size, "█", Style::default().fg(theme.block(tag)).bg(theme.bg));
        }
    }

    let preview = match *ix.mode() {
        Mode::Dragging(d) => d.hover.map(|a| (d.piece, a, d.legal)),
        Mode::Aiming(a) => Some((a.piece, a.anchor, a.legal)),
        _ => None,
    };
    if let Some((id, anchor, legal)) = preview {
        if let Some(piece) = game.piece(id) {
            let color = if legal { theme.accept } else { theme.reject };
            for (i, j) in piece.shape.cells() {
                let (r, c) = (anchor.row + i as isize, anchor.col + j as isize);
                if r < 0 || c < 0 || r as usize >= board.rows() || c as usize >= board.cols() {
                    continue;
                }
                let (x, y) = geo.cell_origin(Anchor::new(r, c));
                paint_block(buf, x, y, size, "█", Style::default().fg(color).bg(theme.bg));
            }
        }
    }
}

fn draw_tray(buf: &mut Buffer, game: &GameState, ix: &Interaction, theme: &Theme, geo: &Geometry) {
    framed("pieces", theme).render(geo.tray_frame.intersection(buf.area), buf);
    let lifted = ix.mode().lifted_slot();
    let aimed = match ix.mode() {
        Mode::Aiming(a) => Some(a.slot),
        _ => None,
    };
    for (slot, (rect, piece)) in geo.slots.iter().zip(game.tray().slots()).enumerate() {
        let label_style = if aimed == Some(slot) {
            Style::default().fg(theme.title).bold()
        } else {
            Style::default().fg(theme.inactive_fg)
        };
        put(buf, i32::from(rect.x) - 1, i32::from(rect.y), &(slot + 1).to_string(), label_style);
        if lifted == Some(slot) {
            continue;
        }
        if let Some(piece) = piece {
            let style = Style::default().fg(theme.block(piece.color)).bg(theme.bg);
            let origin = (i32::from(rect.x), i32::from(rect.y));
            draw_shape(buf, &piece.shape, origin, (geo.tray_cell_w, geo.tray_cell_h), "█", style);
        }
    }
}

/// The dragged piece follows the pointer; a placing piece eases to its cell.
fn draw_lifted(buf: &mut Buffer, game: &GameState, ix: &Interaction, theme: &Theme, geo: &Geometry, now: Instant) {
    let (id, origin, symbol) = match ix.mode() {
        Mode::Dragging(d) => (d.piece, d.ghost_origin(geo), "▒"),
        Mode::Placing(t) => (t.piece, t.position(now), "█"),
        _ => return,
    };
    let Some(piece) = game.piece(id) else {
        return;
    };
    let style = Style::default().fg(theme.block(piece.color));
    draw_shape(buf, &piece.shape, origin, (geo.cell_w, geo.cell_h), symbol, style);
}

fn draw_bursts(buf: &mut Buffer, ix: &Interaction, theme: &Theme, now: Instant) {
    for burst in ix.bursts() {
        let (x, y) = burst.position(now);
        let style = if burst.is_fading(now) {
            Style::default().fg(theme.inactive_fg)
        } else {
            Style::default().fg(theme.title).bold()
        };
        let label = format!("+{}", burst.amount);
        for (k, ch) in label.char_indices() {
            let mut tmp = [0u8; 4];
            put(buf, x + k as i32, y, ch.encode_utf8(&mut tmp), style);
        }
    }
}

fn draw_sidebar(buf: &mut Buffer, game: &GameState, theme: &Theme, geo: &Geometry) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim = Style::default().fg(theme.inactive_fg);
    let sb = geo.sidebar;

    let stats_rect = Rect::new(sb.x, sb.y, sb.width, NEW_GAME_ROW - 1);
    let mut best = vec![
        Span::styled("Best:  ", title_style),
        Span::styled(game.best().to_string(), fg_style),
    ];
    if !game.best_is_persistent() {
        best.push(Span::styled(" (session)", dim));
    }
    let status = if game.is_over() {
        Span::styled("no moves left", Style::default().fg(theme.reject))
    } else {
        Span::styled(format!("{} in tray", game.tray().len()), dim)
    };
    Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(game.score().to_string(), fg_style),
        ]),
        Line::from(best),
        Line::from(status),
    ])
    .block(framed("score", theme))
    .render(stats_rect.intersection(buf.area), buf);

    Paragraph::new(Line::from(Span::styled(
        NEW_GAME_LABEL,
        Style::default().fg(theme.bg).bg(theme.title).bold(),
    )))
    .render(geo.new_game.intersection(buf.area), buf);

    let keys = [
        ("mouse", "drag a piece"),
        ("1-3", "pick a piece"),
        ("hjkl/←↓↑→", "move it"),
        ("enter", "place"),
        ("esc", "put back"),
        ("r", "new game"),
        ("q", "quit"),
    ];
    let lines: Vec<Line> = keys
        .iter()
        .map(|(k, v)| {
            Line::from(vec![
                Span::styled(format!("{k:<10}"), fg_style),
                Span::styled(*v, dim),
            ])
        })
        .collect();
    let keys_rect = Rect::new(sb.x, sb.y + KEYS_ROW, sb.width, sb.height.saturating_sub(KEYS_ROW));
    Paragraph::new(lines)
        .block(framed("keys", theme))
        .render(keys_rect.intersection(buf.area), buf);
}

fn popup(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_popup(buf: &mut Buffer, theme: &Theme, area: Rect, title: &str, lines: Vec<Line<'static>>) {
    let rect = popup(area, 32, lines.len() as u16 + 2);
    buf.set_style(rect, Style::default().bg(theme.bg));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.title).bg(theme.bg))
                .title(Span::styled(format!(" {title} "), Style::default().fg(theme.title))),
        )
        .render(rect, buf);
}

fn draw_game_over(buf: &mut Buffer, game: &GameState, theme: &Theme, area: Rect) {
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " No piece fits ",
            Style::default().fg(Color::White).bg(theme.reject),
        )),
        Line::from(""),
        Line::from(Span::styled(format!("Score: {}", game.score()), fg)),
        Line::from(Span::styled(format!("Best: {}", game.best()), fg)),
    ];
    if game.score() > 0 && game.score() == game.best() {
        lines.push(Line::from(Span::styled(
            "New record!",
            Style::default().fg(theme.title).bold(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("R  New game    Q  Quit", fg)));
    draw_popup(buf, theme, area, "Game Over", lines);
}

fn draw_confirm_reset(buf: &mut Buffer, theme: &Theme, area: Rect) {
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("Start a new game?", fg)),
        Line::from(Span::styled("Your score will be lost.", Style::default().fg(theme.inactive_fg))),
        Line::from(""),
        Line::from(Span::styled("Y  Yes    N  No", Style::default().fg(theme.title).bold())),
    ];
    draw_popup(buf, theme, area, "New Game", lines);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_terminal_gets_wide_cells() {
        let geo = Geometry::compute(Rect::new(0, 0, 120, 50), 10, 10);
        assert_eq!((geo.cell_w, geo.cell_h), (4, 2));
        assert_eq!(geo.board.width, 40);
        assert_eq!(geo.board.height, 20);
        assert!(geo.board_frame.x + geo.board_frame.width <= geo.sidebar.x);
        assert_eq!(geo.tray_frame.y, geo.board_frame.y + geo.board_frame.height);
    }

    #[test]
    fn small_terminal_falls_back_to_narrow_cells() {
        let geo = Geometry::compute(Rect::new(0, 0, 80, 24), 10, 10);
        assert_eq!((geo.cell_w, geo.cell_h), (2, 1));
        assert!(geo.tray_frame.y + geo.tray_frame.height <= 24);
        assert!(geo.sidebar.x + geo.sidebar.width <= 80);
    }

    #[test]
    fn board_hit_test_maps_to_cells() {
        let geo = Geometry::compute(Rect::new(0, 0, 120, 50), 8, 8);
        let b = geo.board;
        assert_eq!(geo.board_cell_at(b.x, b.y), Some((0, 0)));
        assert_eq!(geo.board_cell_at(b.x + 3, b.y + 1), Some((0, 0)));
        assert_eq!(geo.board_cell_at(b.x + 4, b.y + 2), Some((1, 1)));
        assert_eq!(geo.board_cell_at(b.x + b.width - 1, b.y + b.height - 1), Some((7, 7)));
        assert_eq!(geo.board_cell_at(b.x + b.width, b.y), None);
        assert_eq!(geo.board_cell_at(b.x - 1, b.y), None);
        assert_eq!(geo.cell_origin(Anchor::new(1, 2)), (i32::from(b.x) + 8, i32::from(b.y) + 2));
    }

    #[test]
    fn tray_hit_test_maps_to_slot_sub_cells() {
        let geo = Geometry::compute(Rect::new(0, 0, 120, 50), 8, 8);
        for (slot, r) in geo.slots.iter().enumerate() {
            assert_eq!(geo.tray_hit(r.x, r.y), Some((slot, 0, 0)));
            assert_eq!(geo.tray_hit(r.x + 5, r.y + 2), Some((slot, 2, 2)));
            assert_eq!(geo.tray_hit(r.x + 2, r.y + 1), Some((slot, 1, 1)));
        }
        let first = geo.slots[0];
        assert_eq!(geo.tray_hit(first.x + first.width, first.y), None);
        assert!(geo.slots[0].x + geo.slots[0].width <= geo.slots[1].x);
    }

    #[test]
    fn new_game_button_does_not_overlap_play_area() {
        let geo = Geometry::compute(Rect::new(0, 0, 120, 50), 10, 10);
        let b = geo.new_game;
        assert!(geo.hits_new_game(b.x, b.y));
        assert!(geo.hits_new_game(b.x + b.width - 1, b.y));
        assert!(!geo.hits_new_game(b.x + b.width, b.y));
        assert!(geo.board_cell_at(b.x, b.y).is_none());
        assert!(geo.tray_hit(b.x, b.y).is_none());
    }

    #[test]
    fn cleared_cells_cover_their_full_footprint() {
        let geo = Geometry::compute(Rect::new(0, 0, 120, 50), 8, 8);
        let flash = ClearFlash {
            cells: vec![(0, 0, crate::pieces::ColorTag::new(1).unwrap())],
            started: Instant::now(),
        };
        let set = clearing_buffer_positions(&geo, &flash);
        assert_eq!(set.len(), usize::from(geo.cell_w * geo.cell_h));
        assert!(set.contains(&(geo.board.x, geo.board.y)));
    }
}
