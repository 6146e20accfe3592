//! Pointer/keyboard interaction: drag and drop, keyboard aiming, placement tween, reset confirmation.
//!
//! Transitions:
//! `Idle` -> `Dragging` (pointer down on an occupied tray sub-cell) -> `Placing` (released over a legal
//! anchor) -> `Idle` or `GameOver` once the tween ends and the placement is committed.
//! Releasing anywhere else returns to `Idle` untouched. `Aiming` is the keyboard counterpart of
//! `Dragging`. `ConfirmReset` gates the reset command from `Idle`, `Aiming`, `Dragging` and `GameOver`.

use crate::animation::{self, CLEAR_FLASH, PLACE_TWEEN, ScoreBurst};
use crate::game::{Anchor, GameState};
use crate::pieces::{ColorTag, PieceId, Shape};
use crate::ui::Geometry;
use log::{debug, warn};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    /// Motion with the button held.
    Move,
    Up,
    /// Motion with no button held.
    Hover,
}

/// Pointer event in terminal cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub column: u16,
    pub row: u16,
}

impl PointerEvent {
    pub const fn new(kind: PointerKind, column: u16, row: u16) -> Self {
        Self { kind, column, row }
    }
}

/// A tray piece following the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drag {
    pub piece: PieceId,
    pub slot: usize,
    /// Sub-cell (i, j) of the shape that was grabbed.
    pub grab: (usize, usize),
    pub pointer: (u16, u16),
    /// Anchor under the pointer, if the pointer is over the board.
    pub hover: Option<Anchor>,
    pub legal: bool,
}

impl Drag {
    /// Screen position of the shape's top-left corner at board scale.
    pub fn ghost_origin(&self, geo: &Geometry) -> (i32, i32) {
        let (i, j) = self.grab;
        let cw = i32::from(geo.cell_w);
        let ch = i32::from(geo.cell_h);
        (
            i32::from(self.pointer.0) - j as i32 * cw - cw / 2,
            i32::from(self.pointer.1) - i as i32 * ch - ch / 2,
        )
    }
}

/// Keyboard-driven counterpart of a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aim {
    pub piece: PieceId,
    pub slot: usize,
    pub anchor: Anchor,
    pub legal: bool,
}

/// Piece easing from where it was dropped to its target cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tween {
    pub piece: PieceId,
    pub slot: usize,
    pub anchor: Anchor,
    pub from: (i32, i32),
    pub to: (i32, i32),
    pub started: Instant,
}

impl Tween {
    pub fn position(&self, now: Instant) -> (i32, i32) {
        let t = animation::ease_out_cubic(animation::progress(self.started, now, PLACE_TWEEN));
        animation::lerp_point(self.from, self.to, t)
    }

    pub fn is_done(&self, now: Instant) -> bool {
        animation::progress(self.started, now, PLACE_TWEEN) >= 1.0
    }
}

/// Cells emptied by the last line clear, faded out over `CLEAR_FLASH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearFlash {
    pub cells: Vec<(usize, usize, ColorTag)>,
    pub started: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Dragging(Drag),
    Aiming(Aim),
    Placing(Tween),
    ConfirmReset { resume_game_over: bool },
    GameOver,
}

impl Mode {
    /// Piece currently lifted out of the tray (drawn elsewhere, slot shown empty).
    pub fn lifted_slot(&self) -> Option<usize> {
        match self {
            Self::Dragging(d) => Some(d.slot),
            Self::Placing(t) => Some(t.slot),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Interaction {
    mode: Mode,
    animate: bool,
    bursts: Vec<ScoreBurst>,
    flash: Option<ClearFlash>,
}

impl Interaction {
    pub fn new(animate: bool, game: &GameState) -> Self {
        Self {
            mode: if game.is_over() {
                Mode::GameOver
            } else {
                Mode::Idle
            },
            animate,
            bursts: Vec::new(),
            flash: None,
        }
    }

    #[inline]
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn bursts(&self) -> &[ScoreBurst] {
        &self.bursts
    }

    pub fn flash(&self) -> Option<&ClearFlash> {
        self.flash.as_ref()
    }

    /// Something is moving or fading: the app should keep drawing frames.
    pub fn is_active(&self) -> bool {
        matches!(self.mode, Mode::Dragging(_) | Mode::Placing(_))
            || !self.bursts.is_empty()
            || self.flash.is_some()
    }

    pub fn pointer(&mut self, ev: PointerEvent, geo: &Geometry, game: &mut GameState, now: Instant) {
        match ev.kind {
            PointerKind::Down => self.pointer_down(ev, geo, game),
            PointerKind::Move => {
                if let Mode::Dragging(mut drag) = self.mode {
                    drag.pointer = (ev.column, ev.row);
                    self.update_hover(&mut drag, geo, game);
                    self.mode = Mode::Dragging(drag);
                }
            }
            PointerKind::Up => {
                if let Mode::Dragging(mut drag) = self.mode {
                    drag.pointer = (ev.column, ev.row);
                    self.update_hover(&mut drag, geo, game);
                    self.drop_piece(drag, geo, game, now);
                }
            }
            PointerKind::Hover => self.drop_lost_drag(),
        }
    }

    /// The release of the current drag never arrived; put the piece back.
    fn drop_lost_drag(&mut self) {
        if let Mode::Dragging(drag) = self.mode {
            debug!("drag of {} lost its release", drag.piece);
            self.mode = Mode::Idle;
        }
    }

    fn pointer_down(&mut self, ev: PointerEvent, geo: &Geometry, game: &GameState) {
        if matches!(self.mode, Mode::Dragging(_)) {
            self.drop_lost_drag();
            return;
        }
        if !matches!(self.mode, Mode::Idle | Mode::Aiming(_) | Mode::GameOver) {
            return;
        }
        if geo.hits_new_game(ev.column, ev.row) {
            self.request_reset();
            return;
        }
        if self.mode == Mode::GameOver {
            return;
        }
        let Some((slot, i, j)) = geo.tray_hit(ev.column, ev.row) else {
            return;
        };
        let Some(piece) = game.tray().get(slot) else {
            return;
        };
        if !piece.shape.is_filled(i, j) {
            return;
        }
        let mut drag = Drag {
            piece: piece.id,
            slot,
            grab: (i, j),
            pointer: (ev.column, ev.row),
            hover: None,
            legal: false,
        };
        self.update_hover(&mut drag, geo, game);
        debug!("drag {} from slot {slot}", drag.piece);
        self.mode = Mode::Dragging(drag);
    }

    fn update_hover(&self, drag: &mut Drag, geo: &Geometry, game: &GameState) {
        drag.hover = geo.board_cell_at(drag.pointer.0, drag.pointer.1).map(|(r, c)| {
            Anchor::new(
                r as isize - drag.grab.0 as isize,
                c as isize - drag.grab.1 as isize,
            )
        });
        drag.legal = drag
            .hover
            .is_some_and(|anchor| game.can_place(drag.piece, anchor));
    }

    fn drop_piece(&mut self, drag: Drag, geo: &Geometry, game: &mut GameState, now: Instant) {
        match drag.hover {
            Some(anchor) if drag.legal => {
                let from = drag.ghost_origin(geo);
                self.begin_place(drag.piece, drag.slot, anchor, from, geo, game, now);
            }
            _ => {
                debug!("drag of {} cancelled", drag.piece);
                self.mode = Mode::Idle;
            }
        }
    }

    fn begin_place(
        &mut self,
        piece: PieceId,
        slot: usize,
        anchor: Anchor,
        from: (i32, i32),
        geo: &Geometry,
        game: &mut GameState,
        now: Instant,
    ) {
        if !self.animate {
            self.commit(piece, anchor, geo, game, now);
            return;
        }
        self.mode = Mode::Placing(Tween {
            piece,
            slot,
            anchor,
            from,
            to: geo.cell_origin(anchor),
            started: now,
        });
    }

    /// Apply the placement to the game and record its feedback.
    fn commit(
        &mut self,
        piece: PieceId,
        anchor: Anchor,
        geo: &Geometry,
        game: &mut GameState,
        now: Instant,
    ) {
        match game.place_piece(piece, anchor) {
            Ok(placement) => {
                debug!(
                    "slot {} at ({}, {}): +{}, {} lines, refilled {}, new best {}, over {}",
                    placement.slot,
                    placement.anchor.row,
                    placement.anchor.col,
                    placement.points(),
                    placement.clear.lines(),
                    placement.refilled,
                    placement.new_best,
                    placement.game_over
                );
                self.bursts.push(ScoreBurst {
                    amount: placement.points(),
                    origin: geo.shape_center(anchor, &placement.piece.shape),
                    started: now,
                });
                if self.animate && !placement.clear.is_empty() {
                    self.flash = Some(ClearFlash {
                        cells: placement.clear.cells,
                        started: now,
                    });
                }
            }
            Err(e) => warn!("placement of {piece} rejected: {e}"),
        }
        self.mode = if game.is_over() {
            Mode::GameOver
        } else {
            Mode::Idle
        };
    }

    /// Advance time: finish a due tween, expire bursts and the clear flash.
    pub fn tick(&mut self, geo: &Geometry, game: &mut GameState, now: Instant) {
        if let Mode::Placing(tween) = self.mode {
            if tween.is_done(now) {
                self.commit(tween.piece, tween.anchor, geo, game, now);
            }
        }
        self.bursts.retain(|b| !b.is_done(now));
        if self
            .flash
            .as_ref()
            .is_some_and(|f| animation::progress(f.started, now, CLEAR_FLASH) >= 1.0)
        {
            self.flash = None;
        }
    }

    /// Keyboard: pick up the piece in `slot` and aim it at the board centre.
    pub fn select(&mut self, slot: usize, game: &GameState) {
        if !matches!(self.mode, Mode::Idle | Mode::Aiming(_)) {
            return;
        }
        let Some(piece) = game.tray().get(slot) else {
            return;
        };
        let board = game.board();
        let anchor = Anchor::new(
            (board.rows().saturating_sub(piece.shape.rows()) / 2) as isize,
            (board.cols().saturating_sub(piece.shape.cols()) / 2) as isize,
        );
        self.mode = Mode::Aiming(Aim {
            piece: piece.id,
            slot,
            anchor,
            legal: game.can_place(piece.id, anchor),
        });
    }

    /// Keyboard: move the aimed piece, keeping its bounding box on the board.
    pub fn nudge(&mut self, d_row: isize, d_col: isize, game: &GameState) {
        let Mode::Aiming(mut aim) = self.mode else {
            return;
        };
        let Some(shape) = game.piece(aim.piece).map(|p| p.shape) else {
            self.mode = Mode::Idle;
            return;
        };
        let (max_row, max_col) = max_anchor(game, &shape);
        aim.anchor = Anchor::new(
            (aim.anchor.row + d_row).clamp(0, max_row),
            (aim.anchor.col + d_col).clamp(0, max_col),
        );
        aim.legal = game.can_place(aim.piece, aim.anchor);
        self.mode = Mode::Aiming(aim);
    }

    /// Keyboard: place the aimed piece if legal. The tween starts at its tray slot.
    pub fn place_aimed(&mut self, geo: &Geometry, game: &mut GameState, now: Instant) {
        let Mode::Aiming(aim) = self.mode else {
            return;
        };
        if !game.can_place(aim.piece, aim.anchor) {
            return;
        }
        let from = geo.slot_origin(aim.slot);
        self.begin_place(aim.piece, aim.slot, aim.anchor, from, geo, game, now);
    }

    /// Drop whatever is held without touching the board.
    pub fn cancel(&mut self) {
        if matches!(self.mode, Mode::Aiming(_) | Mode::Dragging(_)) {
            self.mode = Mode::Idle;
        }
    }

    pub fn request_reset(&mut self) {
        self.mode = match self.mode {
            Mode::Idle | Mode::Aiming(_) | Mode::Dragging(_) => Mode::ConfirmReset {
                resume_game_over: false,
            },
            Mode::GameOver => Mode::ConfirmReset {
                resume_game_over: true,
            },
            other => other,
        };
    }

    pub fn confirm_reset(&mut self, game: &mut GameState) {
        if let Mode::ConfirmReset { .. } = self.mode {
            game.reset();
            self.bursts.clear();
            self.flash = None;
            self.mode = Mode::Idle;
        }
    }

    pub fn cancel_reset(&mut self) {
        if let Mode::ConfirmReset { resume_game_over } = self.mode {
            self.mode = if resume_game_over {
                Mode::GameOver
            } else {
                Mode::Idle
            };
        }
    }
}

/// Largest anchor that keeps `shape`'s bounding box on the board.
fn max_anchor(game: &GameState, shape: &Shape) -> (isize, isize) {
    let board = game.board();
    (
        board.rows().saturating_sub(shape.rows()) as isize,
        board.cols().saturating_sub(shape.cols()) as isize,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RefillPolicy;
    use crate::game::Cell;
    use crate::game::tests::{piece, session, tag};
    use crate::pieces::Piece;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use ratatui::layout::Rect;
    use std::time::Duration;

    fn geo() -> Geometry {
        Geometry::compute(Rect::new(0, 0, 120, 50), 8, 8)
    }

    /// Session whose tray is a dot, a hook with a hole at (1, 1), and a 2x2 square.
    fn setup() -> (GameState, [Piece; 3]) {
        let (mut game, _) = session(8, RefillPolicy::WhenEmpty);
        let mut rng = StdRng::seed_from_u64(21);
        let dot = piece(&mut rng, &[&[1]], 1);
        let hook = piece(&mut rng, &[&[1, 1], &[1, 0]], 2);
        let square = piece(&mut rng, &[&[1, 1], &[1, 1]], 3);
        game.set_tray(vec![dot, hook, square]);
        (game, [dot, hook, square])
    }

    /// Screen cell inside tray sub-cell (i, j) of `slot`.
    fn tray_point(geo: &Geometry, slot: usize, i: usize, j: usize) -> (u16, u16) {
        let s = geo.slots[slot];
        (
            s.x + j as u16 * geo.tray_cell_w,
            s.y + i as u16 * geo.tray_cell_h,
        )
    }

    /// Screen cell inside board cell (row, col).
    fn board_point(geo: &Geometry, row: usize, col: usize) -> (u16, u16) {
        (
            geo.board.x + col as u16 * geo.cell_w + geo.cell_w / 2,
            geo.board.y + row as u16 * geo.cell_h,
        )
    }

    fn press(
        ix: &mut Interaction,
        geo: &Geometry,
        game: &mut GameState,
        kind: PointerKind,
        at: (u16, u16),
        now: Instant,
    ) {
        ix.pointer(PointerEvent::new(kind, at.0, at.1), geo, game, now);
    }

    #[test]
    fn drag_and_drop_places_after_tween() {
        let geo = geo();
        let (mut game, [dot, ..]) = setup();
        let mut ix = Interaction::new(true, &game);
        let t0 = Instant::now();

        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 0, 0, 0), t0);
        assert!(matches!(ix.mode(), Mode::Dragging(d) if d.piece == dot.id && d.hover.is_none()));
        assert!(ix.is_active());

        press(&mut ix, &geo, &mut game, PointerKind::Move, board_point(&geo, 2, 3), t0);
        let Mode::Dragging(drag) = *ix.mode() else {
            panic!("expected drag, got {:?}", ix.mode());
        };
        assert_eq!(drag.hover, Some(Anchor::new(2, 3)));
        assert!(drag.legal);

        press(&mut ix, &geo, &mut game, PointerKind::Up, board_point(&geo, 2, 3), t0);
        assert!(matches!(ix.mode(), Mode::Placing(t) if t.anchor == Anchor::new(2, 3)));
        assert_eq!(ix.mode().lifted_slot(), Some(0));
        assert!(game.board().is_empty());

        ix.tick(&geo, &mut game, t0 + PLACE_TWEEN / 2);
        assert!(matches!(ix.mode(), Mode::Placing(_)));
        assert!(game.board().is_empty());

        ix.tick(&geo, &mut game, t0 + PLACE_TWEEN);
        assert_eq!(*ix.mode(), Mode::Idle);
        assert_eq!(game.board().get(2, 3), Some(Cell::Filled(tag(1))));
        assert_eq!(game.score(), 1);
        assert_eq!(ix.bursts().len(), 1);
        assert_eq!(ix.bursts()[0].amount, 1);

        ix.tick(&geo, &mut game, t0 + PLACE_TWEEN + animation::BURST);
        assert!(ix.bursts().is_empty());
        assert!(!ix.is_active());
    }

    #[test]
    fn grab_offset_keeps_grabbed_cell_under_pointer() {
        let geo = geo();
        let (mut game, [_, hook, _]) = setup();
        let mut ix = Interaction::new(false, &game);
        let now = Instant::now();
        // Grab the hook by its bottom-left cell and drop that cell on (5, 5).
        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 1, 1, 0), now);
        press(&mut ix, &geo, &mut game, PointerKind::Up, board_point(&geo, 5, 5), now);
        assert_eq!(*ix.mode(), Mode::Idle);
        assert!(game.piece(hook.id).is_none());
        assert_eq!(game.board().get(4, 5), Some(Cell::Filled(tag(2))));
        assert_eq!(game.board().get(4, 6), Some(Cell::Filled(tag(2))));
        assert_eq!(game.board().get(5, 5), Some(Cell::Filled(tag(2))));
        assert_eq!(game.board().get(5, 6), Some(Cell::Empty));
    }

    #[test]
    fn pressing_a_hole_in_a_piece_does_not_drag() {
        let geo = geo();
        let (mut game, _) = setup();
        let mut ix = Interaction::new(true, &game);
        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 1, 1, 1), Instant::now());
        assert_eq!(*ix.mode(), Mode::Idle);
        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 0, 2, 2), Instant::now());
        assert_eq!(*ix.mode(), Mode::Idle);
    }

    #[test]
    fn release_off_board_cancels() {
        let geo = geo();
        let (mut game, _) = setup();
        let mut ix = Interaction::new(true, &game);
        let now = Instant::now();
        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 2, 0, 0), now);
        press(&mut ix, &geo, &mut game, PointerKind::Up, (0, 0), now);
        assert_eq!(*ix.mode(), Mode::Idle);
        assert!(game.board().is_empty());
        assert_eq!(game.tray().len(), 3);
    }

    #[test]
    fn release_on_illegal_anchor_cancels() {
        let geo = geo();
        let (mut game, [_, _, square]) = setup();
        game.board_mut().set(4, 4, Cell::Filled(tag(5)));
        let before = game.board().clone();
        let mut ix = Interaction::new(true, &game);
        let now = Instant::now();
        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 2, 0, 0), now);
        press(&mut ix, &geo, &mut game, PointerKind::Move, board_point(&geo, 3, 3), now);
        assert!(matches!(ix.mode(), Mode::Dragging(d) if d.hover == Some(Anchor::new(3, 3)) && !d.legal));
        // Hanging off the right edge is rejected the same way.
        press(&mut ix, &geo, &mut game, PointerKind::Move, board_point(&geo, 0, 7), now);
        assert!(matches!(ix.mode(), Mode::Dragging(d) if !d.legal));
        press(&mut ix, &geo, &mut game, PointerKind::Up, board_point(&geo, 0, 7), now);
        assert_eq!(*ix.mode(), Mode::Idle);
        assert_eq!(game.board(), &before);
        assert!(game.piece(square.id).is_some());
    }

    #[test]
    fn missed_release_cancels_the_drag() {
        let geo = geo();
        let (mut game, [dot, ..]) = setup();
        let mut ix = Interaction::new(false, &game);
        let now = Instant::now();

        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 0, 0, 0), now);
        press(&mut ix, &geo, &mut game, PointerKind::Move, board_point(&geo, 2, 2), now);
        // Next click on the board arrives without an Up in between.
        press(&mut ix, &geo, &mut game, PointerKind::Down, board_point(&geo, 2, 2), now);
        assert_eq!(*ix.mode(), Mode::Idle);
        press(&mut ix, &geo, &mut game, PointerKind::Up, board_point(&geo, 2, 2), now);
        assert_eq!(*ix.mode(), Mode::Idle);
        assert!(game.board().is_empty());
        assert!(game.piece(dot.id).is_some());

        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 0, 0, 0), now);
        assert!(matches!(ix.mode(), Mode::Dragging(_)));
        press(&mut ix, &geo, &mut game, PointerKind::Hover, board_point(&geo, 3, 3), now);
        assert_eq!(*ix.mode(), Mode::Idle);
        press(&mut ix, &geo, &mut game, PointerKind::Up, board_point(&geo, 3, 3), now);
        assert!(game.board().is_empty());
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn new_drags_are_ignored_while_placing() {
        let geo = geo();
        let (mut game, _) = setup();
        let mut ix = Interaction::new(true, &game);
        let t0 = Instant::now();
        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 0, 0, 0), t0);
        press(&mut ix, &geo, &mut game, PointerKind::Up, board_point(&geo, 0, 0), t0);
        let placing = *ix.mode();
        assert!(matches!(placing, Mode::Placing(_)));
        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 2, 0, 0), t0);
        assert_eq!(*ix.mode(), placing);
        ix.request_reset();
        assert_eq!(*ix.mode(), placing);
    }

    #[test]
    fn tween_moves_from_drop_point_to_target() {
        let geo = geo();
        let (mut game, _) = setup();
        let mut ix = Interaction::new(true, &game);
        let t0 = Instant::now();
        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 0, 0, 0), t0);
        press(&mut ix, &geo, &mut game, PointerKind::Up, board_point(&geo, 6, 1), t0);
        let Mode::Placing(tween) = *ix.mode() else {
            panic!("expected tween");
        };
        assert_eq!(tween.position(t0), tween.from);
        assert_eq!(tween.position(t0 + PLACE_TWEEN), tween.to);
        assert_eq!(tween.to, geo.cell_origin(Anchor::new(6, 1)));
    }

    #[test]
    fn line_clear_starts_flash_and_expires() {
        let geo = geo();
        let (mut game, [dot, ..]) = setup();
        for c in 1..8 {
            game.board_mut().set(0, c, Cell::Filled(tag(3)));
        }
        let mut ix = Interaction::new(true, &game);
        let t0 = Instant::now();
        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 0, 0, 0), t0);
        press(&mut ix, &geo, &mut game, PointerKind::Up, board_point(&geo, 0, 0), t0);
        ix.tick(&geo, &mut game, t0 + PLACE_TWEEN);
        assert!(game.piece(dot.id).is_none());
        assert_eq!(game.score(), 9);
        assert_eq!(ix.bursts()[0].amount, 9);
        assert_eq!(ix.flash().map(|f| f.cells.len()), Some(8));
        ix.tick(&geo, &mut game, t0 + PLACE_TWEEN + CLEAR_FLASH);
        assert!(ix.flash().is_none());
    }

    #[test]
    fn keyboard_aim_clamps_and_places() {
        let geo = geo();
        let (mut game, [_, _, square]) = setup();
        let mut ix = Interaction::new(false, &game);
        let now = Instant::now();

        ix.select(2, &game);
        assert!(matches!(ix.mode(), Mode::Aiming(a) if a.anchor == Anchor::new(3, 3) && a.legal));
        ix.nudge(-10, 10, &game);
        assert!(matches!(ix.mode(), Mode::Aiming(a) if a.anchor == Anchor::new(0, 6)));

        game.board_mut().set(0, 7, Cell::Filled(tag(1)));
        ix.nudge(0, 0, &game);
        assert!(matches!(ix.mode(), Mode::Aiming(a) if !a.legal));
        ix.place_aimed(&geo, &mut game, now);
        assert!(matches!(ix.mode(), Mode::Aiming(_)));

        ix.nudge(1, -1, &game);
        ix.place_aimed(&geo, &mut game, now);
        assert_eq!(*ix.mode(), Mode::Idle);
        assert!(game.piece(square.id).is_none());
        assert_eq!(game.board().get(1, 5), Some(Cell::Filled(tag(3))));
        assert_eq!(game.board().get(2, 6), Some(Cell::Filled(tag(3))));
    }

    #[test]
    fn selecting_an_empty_slot_does_nothing() {
        let (mut game, [dot, hook, _]) = setup();
        game.set_tray(vec![dot, hook]);
        let mut ix = Interaction::new(true, &game);
        ix.select(2, &game);
        assert_eq!(*ix.mode(), Mode::Idle);
        ix.select(1, &game);
        assert!(matches!(ix.mode(), Mode::Aiming(a) if a.piece == hook.id));
        ix.cancel();
        assert_eq!(*ix.mode(), Mode::Idle);
    }

    #[test]
    fn reset_needs_confirmation() {
        let geo = geo();
        let (mut game, _) = setup();
        let mut ix = Interaction::new(false, &game);
        let now = Instant::now();
        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 0, 0, 0), now);
        press(&mut ix, &geo, &mut game, PointerKind::Up, board_point(&geo, 1, 1), now);
        assert_eq!(game.score(), 1);

        ix.request_reset();
        assert_eq!(*ix.mode(), Mode::ConfirmReset { resume_game_over: false });
        ix.cancel_reset();
        assert_eq!(*ix.mode(), Mode::Idle);
        assert_eq!(game.score(), 1);

        let before: Vec<_> = game.tray().pieces().map(|p| p.id).collect();
        let button = geo.new_game;
        press(&mut ix, &geo, &mut game, PointerKind::Down, (button.x, button.y), now);
        assert!(matches!(ix.mode(), Mode::ConfirmReset { .. }));
        ix.confirm_reset(&mut game);
        assert_eq!(*ix.mode(), Mode::Idle);
        assert_eq!(game.score(), 0);
        assert!(game.board().is_empty());
        assert_eq!(game.tray().len(), 3);
        assert!(game.tray().pieces().all(|p| !before.contains(&p.id)));
        assert!(ix.bursts().is_empty());
    }

    #[test]
    fn game_over_is_terminal_until_reset() {
        let geo = geo();
        let (mut game, _) = session(8, RefillPolicy::WhenEmpty);
        let mut rng = StdRng::seed_from_u64(4);
        for r in 0..8 {
            for c in 0..8 {
                if (r + c) % 2 == 0 {
                    game.board_mut().set(r, c, Cell::Filled(tag(1)));
                }
            }
        }
        let dot = piece(&mut rng, &[&[1]], 2);
        let bar = piece(&mut rng, &[&[1, 1]], 3);
        game.set_tray(vec![dot, bar]);
        let mut ix = Interaction::new(false, &game);
        let now = Instant::now();

        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 0, 0, 0), now);
        press(&mut ix, &geo, &mut game, PointerKind::Up, board_point(&geo, 0, 1), now);
        assert_eq!(*ix.mode(), Mode::GameOver);

        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 1, 0, 0), now);
        assert_eq!(*ix.mode(), Mode::GameOver);
        ix.select(1, &game);
        assert_eq!(*ix.mode(), Mode::GameOver);

        ix.request_reset();
        assert_eq!(*ix.mode(), Mode::ConfirmReset { resume_game_over: true });
        ix.cancel_reset();
        assert_eq!(*ix.mode(), Mode::GameOver);
        ix.request_reset();
        ix.confirm_reset(&mut game);
        assert_eq!(*ix.mode(), Mode::Idle);
        assert!(!game.is_over());
    }

    #[test]
    fn stale_tween_after_board_change_is_rejected() {
        let geo = geo();
        let (mut game, [dot, ..]) = setup();
        let mut ix = Interaction::new(true, &game);
        let t0 = Instant::now();
        press(&mut ix, &geo, &mut game, PointerKind::Down, tray_point(&geo, 0, 0, 0), t0);
        press(&mut ix, &geo, &mut game, PointerKind::Up, board_point(&geo, 2, 2), t0);
        game.board_mut().set(2, 2, Cell::Filled(tag(4)));
        ix.tick(&geo, &mut game, t0 + PLACE_TWEEN + Duration::from_millis(1));
        assert_eq!(*ix.mode(), Mode::Idle);
        assert!(game.piece(dot.id).is_some());
        assert_eq!(game.score(), 0);
        assert!(ix.bursts().is_empty());
    }
}
