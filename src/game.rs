//! Game state: board, placement rules, line clear and scoring, tray, game-over detection.

use crate::audio::{AudioSink, Cue};
use crate::highscores::BestScore;
use crate::pieces::{self, ColorTag, Piece, PieceId, Shape};
use crate::{GameConfig, RefillPolicy};
use log::{debug, info};
use rand::rngs::StdRng;
use thiserror::Error;

/// Pieces offered at once.
pub const TRAY_SIZE: usize = 3;

/// Single board cell: empty or filled with a colour tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Filled(ColorTag),
}

impl Cell {
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

/// Board position of a shape's top-left sub-cell. Signed so off-board anchors can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub row: isize,
    pub col: isize,
}

impl Anchor {
    pub const fn new(row: isize, col: isize) -> Self {
        Self { row, col }
    }

    #[inline]
    fn offset(self, i: usize, j: usize) -> (isize, isize) {
        (self.row + i as isize, self.col + j as isize)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("no piece {0} in the tray")]
    UnknownPiece(PieceId),
    #[error("piece does not fit at ({}, {})", .0.row, .0.col)]
    Blocked(Anchor),
    #[error("game is over")]
    GameOver,
}

/// Fixed-size grid. rows x cols, row-major; row 0 is the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Board {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::Empty; rows * cols],
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn index(&self, row: isize, col: isize) -> Option<usize> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col).copied()
    }

    #[cfg(test)]
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if row < self.rows && col < self.cols {
            self.cells[row * self.cols + col] = cell;
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    /// True iff every occupied sub-cell of `shape` lands on an in-bounds, empty cell.
    pub fn can_place(&self, shape: &Shape, anchor: Anchor) -> bool {
        shape.cells().all(|(i, j)| {
            let (r, c) = anchor.offset(i, j);
            self.index(r, c)
                .is_some_and(|idx| self.cells[idx].is_empty())
        })
    }

    /// Write the piece's colour into its cells. Re-checks legality; on failure the board is untouched.
    /// Returns the number of cells written.
    pub fn place(&mut self, piece: &Piece, anchor: Anchor) -> Result<usize, PlacementError> {
        if !self.can_place(&piece.shape, anchor) {
            return Err(PlacementError::Blocked(anchor));
        }
        let mut written = 0;
        for (i, j) in piece.shape.cells() {
            let (r, c) = anchor.offset(i, j);
            if let Some(idx) = self.index(r, c) {
                self.cells[idx] = Cell::Filled(piece.color);
                written += 1;
            }
        }
        Ok(written)
    }

    fn row_complete(&self, row: usize) -> bool {
        (0..self.cols).all(|c| self.cells[row * self.cols + c] != Cell::Empty)
    }

    fn col_complete(&self, col: usize) -> bool {
        (0..self.rows).all(|r| self.cells[r * self.cols + col] != Cell::Empty)
    }

    /// Empty every complete row and column. Both sets are found before anything is cleared,
    /// and intersections are cleared (and scored) once.
    pub fn clear_lines(&mut self) -> LineClear {
        let rows: Vec<usize> = (0..self.rows).filter(|&r| self.row_complete(r)).collect();
        let cols: Vec<usize> = (0..self.cols).filter(|&c| self.col_complete(c)).collect();
        if rows.is_empty() && cols.is_empty() {
            return LineClear::default();
        }

        let mut cells = Vec::new();
        for r in 0..self.rows {
            for c in 0..self.cols {
                if !rows.contains(&r) && !cols.contains(&c) {
                    continue;
                }
                let idx = r * self.cols + c;
                if let Cell::Filled(tag) = self.cells[idx] {
                    cells.push((r, c, tag));
                }
                self.cells[idx] = Cell::Empty;
            }
        }
        let points = clear_points(rows.len(), cols.len(), self.rows, self.cols);
        LineClear {
            rows,
            cols,
            cells,
            points,
        }
    }

    /// True if `shape` fits at some anchor.
    pub fn fits_anywhere(&self, shape: &Shape) -> bool {
        if shape.rows() > self.rows || shape.cols() > self.cols {
            return false;
        }
        (0..=self.rows - shape.rows()).any(|r| {
            (0..=self.cols - shape.cols())
                .any(|c| self.can_place(shape, Anchor::new(r as isize, c as isize)))
        })
    }
}

/// Cells removed by clearing `nr` rows and `nc` columns of an R x C board.
pub fn clear_points(nr: usize, nc: usize, board_rows: usize, board_cols: usize) -> u32 {
    (nr * board_cols + nc * board_rows - nr * nc) as u32
}

/// Result of one line-clear pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineClear {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    /// Cleared cells with the colour they had, for the clear flash.
    pub cells: Vec<(usize, usize, ColorTag)>,
    pub points: u32,
}

impl LineClear {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.cols.is_empty()
    }

    pub fn lines(&self) -> usize {
        self.rows.len() + self.cols.len()
    }
}

/// True if no piece fits anywhere on the board.
pub fn is_game_over<'a>(board: &Board, pieces: impl IntoIterator<Item = &'a Piece>) -> bool {
    !pieces.into_iter().any(|p| board.fits_anywhere(&p.shape))
}

/// Selectable pieces. Slots keep their position when a neighbour is placed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tray {
    slots: [Option<Piece>; TRAY_SIZE],
}

impl Tray {
    pub fn slots(&self) -> &[Option<Piece>; TRAY_SIZE] {
        &self.slots
    }

    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.pieces().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn get(&self, slot: usize) -> Option<&Piece> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Slot index and piece for `id`.
    pub fn find(&self, id: PieceId) -> Option<(usize, &Piece)> {
        self.slots
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.as_ref().filter(|p| p.id == id).map(|p| (i, p)))
    }

    fn ids(&self) -> Vec<PieceId> {
        self.pieces().map(|p| p.id).collect()
    }

    fn take(&mut self, slot: usize) -> Option<Piece> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    /// Fill every empty slot from one generated batch.
    fn fill_empty(&mut self, rng: &mut StdRng) {
        let empty = self.slots.iter().filter(|s| s.is_none()).count();
        if empty == 0 {
            return;
        }
        let mut fresh = pieces::generate(rng, empty, &self.ids()).into_iter();
        for slot in self.slots.iter_mut().filter(|s| s.is_none()) {
            *slot = fresh.next();
        }
    }
}

/// What one successful placement did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub piece: Piece,
    pub anchor: Anchor,
    pub slot: usize,
    /// Cells written (placement score component).
    pub placed: u32,
    pub clear: LineClear,
    pub refilled: bool,
    pub new_best: bool,
    pub game_over: bool,
}

impl Placement {
    /// Total points awarded for this placement.
    pub fn points(&self) -> u32 {
        self.placed + self.clear.points
    }
}

/// One game session: owns board, tray, score and the collaborators they report to.
pub struct GameState {
    board: Board,
    tray: Tray,
    score: u32,
    best: BestScore,
    game_over: bool,
    refill: RefillPolicy,
    rng: StdRng,
    audio: Box<dyn AudioSink>,
    /// New-high-score cue already played this game.
    high_score_announced: bool,
}

impl std::fmt::Debug for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameState")
            .field("board", &self.board)
            .field("tray", &self.tray)
            .field("score", &self.score)
            .field("best", &self.best)
            .field("game_over", &self.game_over)
            .field("refill", &self.refill)
            .finish_non_exhaustive()
    }
}

impl GameState {
    pub fn new(
        config: &GameConfig,
        best: BestScore,
        audio: Box<dyn AudioSink>,
        rng: StdRng,
    ) -> Self {
        let size = config.board_size as usize;
        let mut state = Self {
            board: Board::new(size, size),
            tray: Tray::default(),
            score: 0,
            best,
            game_over: false,
            refill: config.refill,
            rng,
            audio,
            high_score_announced: false,
        };
        state.tray.fill_empty(&mut state.rng);
        info!(
            "new game on {size}x{size} board, best score {}",
            state.best.get()
        );
        state
    }

    /// Empty board, zero score, fresh tray. Best score is kept.
    pub fn reset(&mut self) {
        self.board = Board::new(self.board.rows(), self.board.cols());
        self.tray = Tray::default();
        self.tray.fill_empty(&mut self.rng);
        self.score = 0;
        self.game_over = false;
        self.high_score_announced = false;
        info!("game reset, best score {}", self.best.get());
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn tray(&self) -> &Tray {
        &self.tray
    }

    #[inline]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[inline]
    pub fn best(&self) -> u32 {
        self.best.get()
    }

    pub fn best_is_persistent(&self) -> bool {
        self.best.is_persistent()
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        self.game_over
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.tray.find(id).map(|(_, p)| p)
    }

    /// Advisory legality check for a tray piece (hover preview).
    pub fn can_place(&self, id: PieceId, anchor: Anchor) -> bool {
        self.piece(id)
            .is_some_and(|p| self.board.can_place(&p.shape, anchor))
    }

    /// Place a tray piece: write it, score it, clear lines, refill the tray, check for game over.
    /// Nothing changes on error.
    pub fn place_piece(&mut self, id: PieceId, anchor: Anchor) -> Result<Placement, PlacementError> {
        if self.game_over {
            return Err(PlacementError::GameOver);
        }
        let (slot, piece) = self
            .tray
            .find(id)
            .map(|(slot, p)| (slot, *p))
            .ok_or(PlacementError::UnknownPiece(id))?;
        let placed = self.board.place(&piece, anchor)? as u32;
        self.tray.take(slot);
        self.audio.play(Cue::PiecePlaced);
        self.score += placed;

        let clear = self.board.clear_lines();
        if !clear.is_empty() {
            self.audio.play(Cue::LineCleared);
            self.audio.play(Cue::Encouragement);
            self.score += clear.points;
            debug!(
                "cleared rows {:?} cols {:?} for {} points",
                clear.rows, clear.cols, clear.points
            );
        }

        let new_best = self.best.offer(self.score);
        if new_best && !self.high_score_announced {
            self.audio.play(Cue::NewHighScore);
            self.high_score_announced = true;
        }

        let refilled = match self.refill {
            RefillPolicy::WhenEmpty => self.tray.is_empty(),
            RefillPolicy::Each => true,
        };
        if refilled {
            self.tray.fill_empty(&mut self.rng);
        }

        self.game_over = is_game_over(&self.board, self.tray.pieces());
        debug!(
            "placed {} at ({}, {}), score {}",
            piece.id, anchor.row, anchor.col, self.score
        );
        if self.game_over {
            info!("game over, final score {} (best {})", self.score, self.best.get());
        }

        Ok(Placement {
            piece,
            anchor,
            slot,
            placed,
            clear,
            refilled,
            new_best,
            game_over: self.game_over,
        })
    }

    #[cfg(test)]
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    #[cfg(test)]
    pub(crate) fn set_tray(&mut self, pieces: Vec<Piece>) {
        let mut it = pieces.into_iter();
        for slot in &mut self.tray.slots {
            *slot = it.next();
        }
    }
}
