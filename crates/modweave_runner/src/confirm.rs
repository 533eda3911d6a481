//! Operator confirmation for destructive operations.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use parking_lot::Mutex;

/// Asks the operator before apply and destroy.
pub trait Confirmer: Send + Sync {
    /// Ask a yes/no question. Returns true when the operator agreed.
    fn confirm(&self, prompt: &str) -> bool;

    /// Ask the operator to type `phrase` exactly.
    fn confirm_phrase(&self, prompt: &str, phrase: &str) -> bool;
}

/// Accept `y` or `yes`, case-insensitive.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Prompts on stderr and reads answers from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirmer;

impl StdinConfirmer {
    fn ask(&self, prompt: &str) -> Option<String> {
        let mut stderr = io::stderr();
        let _ = write!(stderr, "{} ", prompt);
        let _ = stderr.flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(answer),
        }
    }
}

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        self.ask(&format!("{} [y/N]:", prompt))
            .map(|a| is_affirmative(&a))
            .unwrap_or(false)
    }

    fn confirm_phrase(&self, prompt: &str, phrase: &str) -> bool {
        self.ask(&format!("{} Type '{}' to continue:", prompt, phrase))
            .map(|a| a.trim() == phrase)
            .unwrap_or(false)
    }
}

/// Approves everything. Backs `--auto-approve`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }

    fn confirm_phrase(&self, _prompt: &str, _phrase: &str) -> bool {
        true
    }
}

/// Replays canned answers in order and records the prompts it saw.
///
/// Runs out of answers as a refusal.
#[derive(Debug, Default)]
pub struct ScriptedConfirmer {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts seen so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn next(&self, prompt: &str) -> Option<String> {
        self.prompts.lock().push(prompt.to_string());
        self.answers.lock().pop_front()
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        self.next(prompt).map(|a| is_affirmative(&a)).unwrap_or(false)
    }

    fn confirm_phrase(&self, prompt: &str, phrase: &str) -> bool {
        self.next(prompt).map(|a| a.trim() == phrase).unwrap_or(false)
    }
}
