//! Live countdown: redraws the current code, a depleting bar and the seconds left, in place.

use std::convert::Infallible;
use std::io::{self, IsTerminal, Write};
use std::time::{Duration, SystemTime};

use tracing::{debug, trace};

use crate::window::WindowState;
use crate::{derive_code, Secret};

/// Refresh period of the live block.
pub const TICK: Duration = Duration::from_millis(250);

/// Cells in the progress bar.
pub const BAR_WIDTH: usize = 6;

/// Text lines in one frame: the code, then bar and annotation.
const BLOCK_HEIGHT: usize = 2;

/// Cursor up one line, clear that line.
const ERASE_LINE: &str = "\x1b[1A\x1b[2K";

const FULL: char = '█';
const EMPTY: char = '░';
/// Glyphs lighting 1 to 7 eighths of a cell.
const PARTIAL: [char; 7] = ['▏', '▎', '▍', '▌', '▋', '▊', '▉'];

/// Render the bar for `fill` in `[0, 1]`, filled from the left with 1/8 cell resolution.
///
/// ```rust
/// assert_eq!(dotp::progress_bar(0.5, 6), "███░░░");
/// assert_eq!(dotp::progress_bar(0.25, 6), "█▌░░░░");
/// ```
pub fn progress_bar(fill: f64, width: usize) -> String {
    let fill = if fill.is_nan() { 0.0 } else { fill.clamp(0.0, 1.0) };
    let eighths = ((fill * (width * 8) as f64) as usize).min(width * 8);
    let full = eighths / 8;
    let partial = eighths % 8;

    (0..width)
        .map(|cell| {
            if cell < full {
                FULL
            } else if cell == full && partial > 0 {
                PARTIAL[partial - 1]
            } else {
                EMPTY
            }
        })
        .collect()
}

/// How close the current code is to expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    /// 10 seconds or less left.
    Warning,
    /// 5 seconds or less left.
    Urgent,
}

impl Urgency {
    pub fn from_remaining(remaining_seconds: u64) -> Self {
        if remaining_seconds <= 5 {
            Urgency::Urgent
        } else if remaining_seconds <= 10 {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }
}

/// Escape sequences used by the renderer. Plain output uses empty strings throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub valid: &'static str,
    pub warning: &'static str,
    pub urgent: &'static str,
    pub neutral: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub const fn ansi() -> Self {
        Palette {
            valid: "\x1b[1;92m",
            warning: "\x1b[1;93m",
            urgent: "\x1b[1;91m",
            neutral: "\x1b[0;97m",
            reset: "\x1b[0;39m",
        }
    }

    pub const fn plain() -> Self {
        Palette {
            valid: "",
            warning: "",
            urgent: "",
            neutral: "",
            reset: "",
        }
    }

    /// ANSI colours on a terminal, plain text when piped or when `NO_COLOR` is set.
    pub fn detect() -> Self {
        if std::env::var_os("NO_COLOR").is_some() || !io::stdout().is_terminal() {
            Palette::plain()
        } else {
            Palette::ansi()
        }
    }

    /// The code only turns red in the last 5 seconds.
    fn code(&self, urgency: Urgency) -> &'static str {
        match urgency {
            Urgency::Urgent => self.urgent,
            Urgency::Warning | Urgency::Normal => self.valid,
        }
    }

    fn bar(&self, urgency: Urgency) -> &'static str {
        match urgency {
            Urgency::Urgent => self.urgent,
            Urgency::Warning => self.warning,
            Urgency::Normal => self.reset,
        }
    }
}

/// Time source and scheduler of the render loop.
pub trait Clock {
    fn now(&self) -> SystemTime;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> SystemTime {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Wall clock and `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing drawn yet.
    Idle,
    /// A full block is on screen above the cursor.
    Running,
}

/// Owns the display region below the cursor and redraws it every [`TICK`].
pub struct Renderer<'a, C, W> {
    secret: &'a Secret,
    clock: C,
    out: W,
    palette: Palette,
    state: State,
}

impl<'a, C: Clock, W: Write> Renderer<'a, C, W> {
    pub fn new(secret: &'a Secret, clock: C, out: W, palette: Palette) -> Self {
        Renderer {
            secret,
            clock,
            out,
            palette,
            state: State::Idle,
        }
    }

    /// Lines currently drawn by this renderer.
    pub fn drawn_lines(&self) -> usize {
        match self.state {
            State::Idle => 0,
            State::Running => BLOCK_HEIGHT,
        }
    }

    /// Build one frame for `instant`, without the erase prefix.
    pub fn frame(&self, instant: SystemTime) -> String {
        let code = derive_code(self.secret.as_bytes(), instant);
        let window = WindowState::at(instant);
        let urgency = Urgency::from_remaining(window.remaining_seconds);
        let p = &self.palette;

        format!(
            "{}{}{}\n{}{}{}  {}({}s){}\n",
            p.code(urgency),
            code,
            p.reset,
            p.bar(urgency),
            progress_bar(1.0 - window.progress, BAR_WIDTH),
            p.reset,
            p.neutral,
            window.remaining_seconds,
            p.reset,
        )
    }

    /// Erase the previous block and draw the current one in a single write.
    pub fn tick(&mut self) -> io::Result<()> {
        let now = self.clock.now();
        let mut output = ERASE_LINE.repeat(self.drawn_lines());
        output.push_str(&self.frame(now));

        self.out.write_all(output.as_bytes())?;
        self.out.flush()?;

        if self.state == State::Idle {
            debug!("live renderer started");
        }
        self.state = State::Running;
        trace!(bytes = output.len(), "frame drawn");
        Ok(())
    }

    /// Redraw forever. Only returns when writing to the terminal fails; stopping is left to
    /// the process signal handling.
    pub fn run(mut self) -> io::Result<Infallible> {
        loop {
            self.tick()?;
            self.clock.sleep(TICK);
        }
    }
}

/// Blocking entry point: live render `secret` on stdout until the process is interrupted.
pub fn watch(secret: &Secret) -> io::Result<Infallible> {
    let stdout = io::stdout();
    Renderer::new(secret, SystemClock, stdout.lock(), Palette::detect()).run()
}
