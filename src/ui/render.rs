use crate::runtime::QueryObserver;
use crate::state::QueryState;
use crate::types::{EventStatus, ProgressEvent};
use crossterm::style::Stylize;
use std::io::{self, Write};

pub const STARTING_MESSAGE: &str = "Starting process...";

/// Line-oriented renderer for a running query.
///
/// Prints only what changed since the previous notification, so it can be
/// attached to a session as an observer and write straight to stdout.
pub struct ProgressPrinter<W: Write> {
    out: W,
    colors_enabled: bool,
    generation: u64,
    printed_steps: usize,
    announced_start: bool,
    printed_result: bool,
}

impl<W: Write> ProgressPrinter<W> {
    pub fn new(out: W, colors_enabled: bool) -> Self {
        Self {
            out,
            colors_enabled,
            generation: 0,
            printed_steps: 0,
            announced_start: false,
            printed_result: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, state: &QueryState) -> io::Result<()> {
        if state.generation != self.generation {
            self.generation = state.generation;
            self.printed_steps = 0;
            self.announced_start = false;
            self.printed_result = false;
        }

        if state.loading && state.progress.is_empty() && !self.announced_start {
            writeln!(self.out, "{STARTING_MESSAGE}")?;
            self.announced_start = true;
        }

        for (index, event) in state.progress.iter().enumerate().skip(self.printed_steps) {
            writeln!(
                self.out,
                "{}",
                format_step_line(index, event, self.colors_enabled)
            )?;
        }
        self.printed_steps = state.progress.len();

        if !state.loading && !self.printed_result {
            if let Some(error) = &state.error {
                let label = paint("Error:", Some(&EventStatus::Error), self.colors_enabled);
                writeln!(self.out, "{label} {error}")?;
            }
            if let Some(summary) = state.summary.as_deref().filter(|s| !s.is_empty()) {
                writeln!(self.out, "\nSummary:\n{summary}")?;
            }
            self.printed_result = true;
        }

        self.out.flush()
    }
}

impl<W: Write> QueryObserver for ProgressPrinter<W> {
    fn on_update(&mut self, state: &QueryState) {
        if let Err(error) = self.render(state) {
            tracing::warn!(%error, "failed to write progress output");
        }
    }
}

/// `Step N: <step>`, numbered from one. Events with no step text, such as
/// `complete`, print the bare `Step N:`.
pub fn format_step_line(index: usize, event: &ProgressEvent, colors_enabled: bool) -> String {
    let number = paint(
        &format!("Step {}:", index + 1),
        event.status.as_ref(),
        colors_enabled,
    );
    match event.step.as_deref().filter(|step| !step.is_empty()) {
        Some(step) => format!("{number} {step}"),
        None => number,
    }
}

fn paint(text: &str, status: Option<&EventStatus>, colors_enabled: bool) -> String {
    if !colors_enabled {
        return text.to_string();
    }
    match status {
        Some(EventStatus::Step) => text.cyan().to_string(),
        Some(EventStatus::Complete) => text.green().bold().to_string(),
        Some(EventStatus::Error) => text.red().bold().to_string(),
        _ => text.dark_grey().to_string(),
    }
}
