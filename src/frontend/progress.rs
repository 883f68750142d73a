//! Live per-program status lines and the final tally

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::catalog::Program;
use crate::install::{InstallState, ProgressEvent};

/// Status text shown next to a program's name
pub fn status_line(ev: &ProgressEvent) -> String {
    let version = ev.version.as_deref().unwrap_or("");
    match ev.state {
        InstallState::Done => format!("✓ {version}"),
        InstallState::Skipped => format!("- {version} (already up to date)"),
        InstallState::Error => {
            let Some(err) = &ev.error else {
                return "✗ failed".to_string();
            };
            match err.hint() {
                Some(hint) => format!("✗ {err}  ({hint})"),
                None => format!("✗ {err}"),
            }
        }
        state if version.is_empty() => state.label().to_string(),
        state => format!("{} {version}", state.label()),
    }
}

/// Count of programs per terminal outcome
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub installed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Tally {
    pub fn record(&mut self, state: InstallState) {
        match state {
            InstallState::Done => self.installed += 1,
            InstallState::Skipped => self.skipped += 1,
            InstallState::Error => self.failed += 1,
            _ => {}
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Print `N installed, N skipped, N failed`
    pub fn print(&self) {
        let mut stdout = StandardStream::stdout(ColorChoice::Auto);
        let _ = writeln!(stdout);

        let parts = [
            (self.installed, "installed", Color::Green),
            (self.skipped, "skipped", Color::Yellow),
            (self.failed, "failed", Color::Red),
        ];
        for (i, (count, label, color)) in parts.into_iter().enumerate() {
            if i > 0 {
                let _ = write!(stdout, ", ");
            }
            if count > 0 {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
            }
            let _ = write!(stdout, "{count} {label}");
            let _ = stdout.reset();
        }
        let _ = writeln!(stdout);
    }
}

/// One spinner line per program, in catalog order
pub struct ProgressBoard {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
    finished: ProgressStyle,
    tally: Tally,
}

impl ProgressBoard {
    pub fn new(programs: &[Program]) -> Result<Self> {
        let multi = MultiProgress::new();
        let active = ProgressStyle::with_template("{spinner:.cyan} {prefix:<20.bold} {msg}")
            .context("Invalid progress bar template")?;
        let finished =
            ProgressStyle::with_template("  {prefix:<20.bold} {msg}").context("Invalid progress bar template")?;

        let mut bars = HashMap::with_capacity(programs.len());
        for program in programs {
            let bar = multi.add(ProgressBar::new_spinner());
            bar.set_style(active.clone());
            bar.set_prefix(program.name.clone());
            bar.set_message(InstallState::Pending.label());
            bar.enable_steady_tick(Duration::from_millis(100));
            bars.insert(program.name.clone(), bar);
        }

        Ok(Self {
            multi,
            bars,
            finished,
            tally: Tally::default(),
        })
    }

    pub fn apply(&mut self, ev: &ProgressEvent) {
        let Some(bar) = self.bars.get(&ev.program) else {
            return;
        };
        let line = status_line(ev);
        if ev.state.is_terminal() {
            self.tally.record(ev.state);
            bar.set_style(self.finished.clone());
            bar.finish_with_message(line);
        } else {
            bar.set_message(line);
        }
    }

    /// Handle for hiding the board while a prompt owns the terminal
    pub fn multi(&self) -> MultiProgress {
        self.multi.clone()
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Stop any spinner still running (interrupted runs)
    pub fn finish(&self) {
        for bar in self.bars.values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}
