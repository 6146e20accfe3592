//! Sound cues. The game only fires them; sinks decide what (if anything) to play.

use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    PiecePlaced,
    LineCleared,
    Encouragement,
    NewHighScore,
}

/// Fire-and-forget cue output.
pub trait AudioSink {
    fn play(&mut self, cue: Cue);
}

/// No sound (`--mute`).
#[derive(Debug, Default)]
pub struct Silent;

impl AudioSink for Silent {
    fn play(&mut self, _cue: Cue) {}
}

/// Rings the terminal bell for the cues worth interrupting for.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl AudioSink for TerminalBell {
    fn play(&mut self, cue: Cue) {
        if matches!(cue, Cue::LineCleared | Cue::NewHighScore) {
            let mut out = std::io::stdout();
            // Bell failures are not worth surfacing.
            let _ = out.write_all(b"\x07").and_then(|()| out.flush());
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::{AudioSink, Cue};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records cues so tests can assert on them after handing the sink to a session.
    #[derive(Debug, Default, Clone)]
    pub struct Recorder(pub Rc<RefCell<Vec<Cue>>>);

    impl Recorder {
        pub fn cues(&self) -> Vec<Cue> {
            self.0.borrow().clone()
        }

        pub fn clear(&self) {
            self.0.borrow_mut().clear();
        }
    }

    impl AudioSink for Recorder {
        fn play(&mut self, cue: Cue) {
            self.0.borrow_mut().push(cue);
        }
    }
}
