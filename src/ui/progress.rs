use crate::ui::{Icons, theme};
use indicatif::{HumanDuration, ProgressBar};
use owo_colors::OwoColorize;
use std::time::{Duration, Instant};

/// Spinner shown while waiting on the provider or the database
pub struct Spinner {
    pb: ProgressBar,
    started: Instant,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if console::Term::stdout().is_term() {
            let pb = ProgressBar::new_spinner();
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        Self {
            pb,
            started: Instant::now(),
        }
    }

    /// Clear the spinner and print a success line with the elapsed time
    pub fn succeed(&self, msg: &str) {
        self.pb.finish_and_clear();
        println!(
            "{} {} {}",
            Icons::CHECK.style(theme().success.clone()),
            msg.style(theme().success.clone()),
            format!("({})", HumanDuration(self.started.elapsed())).style(theme().muted.clone())
        );
    }

    /// Remove the spinner after a failed step; the caller reports the error
    pub fn fail(&self) {
        self.pb.finish_and_clear();
    }

    /// Remove the spinner after a successful step that prints no line of its own
    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_finishes_spinner() {
        let spinner = Spinner::new("working");
        spinner.clear();
        assert!(spinner.pb.is_finished());
    }
}
