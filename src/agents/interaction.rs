use crate::error::{DockupError, Result};
use crate::repository::Update;
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Answer to a single update prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Apply,
    Skip,
    ApplyAll,
    Quit,
}

impl Decision {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "" | "y" | "yes" => Some(Self::Apply),
            "n" | "no" => Some(Self::Skip),
            "a" | "all" => Some(Self::ApplyAll),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Asks before each update is written when interactive mode is on.
pub struct UpdateInteraction {
    enabled: bool,
    apply_all: bool,
}

impl UpdateInteraction {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            apply_all: false,
        }
    }

    pub fn confirm(&mut self, update: &Update) -> Result<bool> {
        let stdin = io::stdin();
        self.confirm_with(update, &mut stdin.lock())
    }

    fn confirm_with(&mut self, update: &Update, input: &mut impl BufRead) -> Result<bool> {
        if !self.enabled {
            return Ok(true);
        }

        println!(
            "\n{} {} {} {} to {}",
            "[Update]".cyan().bold(),
            update.path.white().bold(),
            "from".dimmed(),
            update.previous.red(),
            update.next.green().bold()
        );

        if self.apply_all {
            println!("{}", "Auto-applying (previously selected 'all').".dimmed());
            return Ok(true);
        }

        loop {
            print!("{}", "Apply this update? [Y/n/a/q]: ".bold());
            io::stdout().flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Err(DockupError::UserCancelled);
            }

            match Decision::parse(&line) {
                Some(Decision::Apply) => return Ok(true),
                Some(Decision::Skip) => {
                    println!("{}", "Skipping this update.".dimmed());
                    return Ok(false);
                }
                Some(Decision::ApplyAll) => {
                    println!("{}", "Applying this and all remaining updates.".green().bold());
                    self.apply_all = true;
                    return Ok(true);
                }
                Some(Decision::Quit) => {
                    println!("{}", "Stopping update process at user request.".yellow());
                    return Err(DockupError::UserCancelled);
                }
                None => {
                    println!("{}", "Please answer with y(es), n(o), a(ll), or q(quit).".red());
                }
            }
        }
    }
}
