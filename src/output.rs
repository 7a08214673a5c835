use colored::*;
use std::io::{self, Write};
use toolgen_core::{GenerationOutcome, GenerationSession, Phase};

/// Print a session's cycle as it progresses until it settles.
///
/// With `animate` off the reveal is skipped and the text printed in one go.
pub async fn follow(session: &GenerationSession, animate: bool) -> io::Result<Option<GenerationOutcome>> {
    let mut rx = session.subscribe();
    let mut stdout = io::stdout();
    let mut printed = 0usize;
    let mut announced = false;

    loop {
        let phase = rx.borrow_and_update().clone();
        match phase {
            Phase::Generating if !announced => {
                announced = true;
                eprintln!("{}", "🤖 Generating...".dimmed());
            }
            Phase::Revealing { .. } if !animate => {
                session.skip_reveal();
            }
            Phase::Revealing { displayed, .. } => {
                write!(stdout, "{}", &displayed[printed..])?;
                stdout.flush()?;
                printed = displayed.len();
            }
            Phase::Settled(outcome) => {
                print_outcome(&mut stdout, &outcome, printed)?;
                return Ok(Some(outcome));
            }
            Phase::Idle => return Ok(None),
            _ => {}
        }

        if rx.changed().await.is_err() {
            return Ok(None);
        }
    }
}

/// Finish printing `outcome`; `printed` bytes of a success were already shown
fn print_outcome(out: &mut impl Write, outcome: &GenerationOutcome, printed: usize) -> io::Result<()> {
    match outcome {
        GenerationOutcome::Success { text } => {
            writeln!(out, "{}", text.get(printed..).unwrap_or(text))?;
        }
        GenerationOutcome::Failure { .. } => {
            writeln!(out, "{}", outcome.display_text().red())?;
        }
    }
    out.flush()
}
