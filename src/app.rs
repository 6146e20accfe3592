//! App: terminal init, main loop, key and mouse dispatch.

use crate::game::GameState;
use crate::input::{Action, key_to_action, mouse_to_pointer};
use crate::interaction::{Interaction, Mode};
use crate::theme::Theme;
use crate::ui::{self, ClearFx, Geometry};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use log::debug;
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};

pub struct App {
    game: GameState,
    ix: Interaction,
    theme: Theme,
    /// Recomputed on every draw; pointer events are hit-tested against the last frame.
    geometry: Geometry,
    clear_fx: ClearFx,
    frame_interval: Duration,
    quit: bool,
}

impl App {
    pub fn new(game: GameState, theme: Theme, animate: bool, frame_rate: f64) -> Self {
        let ix = Interaction::new(animate, &game);
        let geometry = Geometry::compute(
            Rect::new(0, 0, 80, 24),
            game.board().rows(),
            game.board().cols(),
        );
        Self {
            game,
            ix,
            theme,
            geometry,
            clear_fx: ClearFx::default(),
            frame_interval: Duration::from_secs_f64(1.0 / frame_rate.max(1.0)),
            quit: false,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let (cols, rows) = size()?;
        self.geometry = Geometry::compute(
            Rect::new(0, 0, cols, rows),
            self.game.board().rows(),
            self.game.board().cols(),
        );

        let result = self.run_loop(&mut terminal);

        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    /// Blocks on input while nothing moves; polls at the frame rate during drags and animations.
    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let (rows, cols) = (self.game.board().rows(), self.game.board().cols());
        while !self.quit {
            let now = Instant::now();
            self.ix.tick(&self.geometry, &mut self.game, now);

            terminal.draw(|f| {
                self.geometry = Geometry::compute(f.area(), rows, cols);
                ui::draw(
                    f,
                    &self.game,
                    &self.ix,
                    &self.theme,
                    &self.geometry,
                    &mut self.clear_fx,
                    now,
                );
            })?;

            let ready = if self.ix.is_active() {
                event::poll(self.frame_interval.saturating_sub(now.elapsed()))?
            } else {
                true
            };
            if ready {
                self.handle_event(event::read()?);
                while event::poll(Duration::ZERO)? {
                    self.handle_event(event::read()?);
                }
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        let now = Instant::now();
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                self.apply_action(key_to_action(key), now);
            }
            Event::Mouse(mouse) => {
                if let Some(pointer) = mouse_to_pointer(mouse) {
                    self.ix
                        .pointer(pointer, &self.geometry, &mut self.game, now);
                }
            }
            // Hit-test rects are stale until the next draw.
            Event::Resize(..) => self.ix.cancel(),
            _ => {}
        }
    }

    fn apply_action(&mut self, action: Action, now: Instant) {
        if action == Action::Quit {
            debug!("quit at score {}", self.game.score());
            self.quit = true;
            return;
        }
        if let Mode::ConfirmReset { .. } = self.ix.mode() {
            match action {
                Action::Yes | Action::Place => {
                    self.ix.confirm_reset(&mut self.game);
                    self.clear_fx.reset();
                }
                Action::No | Action::Cancel => self.ix.cancel_reset(),
                _ => {}
            }
            return;
        }
        match action {
            Action::Select(slot) => self.ix.select(slot, &self.game),
            Action::Left => self.ix.nudge(0, -1, &self.game),
            Action::Right => self.ix.nudge(0, 1, &self.game),
            Action::Up => self.ix.nudge(-1, 0, &self.game),
            Action::Down => self.ix.nudge(1, 0, &self.game),
            Action::Place => self.ix.place_aimed(&self.geometry, &mut self.game, now),
            Action::Cancel => self.ix.cancel(),
            Action::Reset => self.ix.request_reset(),
            Action::Yes | Action::No | Action::Quit | Action::None => {}
        }
    }
}
