//! The eight-entry action menu and line-based prompting.

use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use crate::error::PkiError;

/// Actions selectable by number, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    CreateCa = 1,
    ListCas = 2,
    DeployCa = 3,
    InstallCaRemote = 4,
    InstallCaLocal = 5,
    CreateCertificate = 6,
    DeployCertificate = 7,
    CopyPublicKey = 8,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 8] = [
        MenuChoice::CreateCa,
        MenuChoice::ListCas,
        MenuChoice::DeployCa,
        MenuChoice::InstallCaRemote,
        MenuChoice::InstallCaLocal,
        MenuChoice::CreateCertificate,
        MenuChoice::DeployCertificate,
        MenuChoice::CopyPublicKey,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::CreateCa => "Create CA and intermediate certificate",
            MenuChoice::ListCas => "List trusted CAs",
            MenuChoice::DeployCa => "Deploy CA bundle to remote host",
            MenuChoice::InstallCaRemote => "Install CA on remote host",
            MenuChoice::InstallCaLocal => "Install CA on this host",
            MenuChoice::CreateCertificate => "Create server certificate",
            MenuChoice::DeployCertificate => "Deploy server certificate to remote host",
            MenuChoice::CopyPublicKey => "Copy SSH public key to remote host",
        }
    }
}

impl TryFrom<u8> for MenuChoice {
    type Error = PkiError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        MenuChoice::ALL
            .into_iter()
            .find(|c| c.number() == value)
            .ok_or_else(|| PkiError::InvalidChoice(value.to_string()))
    }
}

impl FromStr for MenuChoice {
    type Err = PkiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number: u8 = trimmed
            .parse()
            .map_err(|_| PkiError::InvalidChoice(trimmed.to_string()))?;
        MenuChoice::try_from(number)
    }
}

impl fmt::Display for MenuChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.label())
    }
}

/// Reads answers line by line and writes prompts.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask a question; an empty answer takes `default` when one is given.
    pub fn ask(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(d) if !d.is_empty() => write!(self.output, "{} [{}]: ", question, d)?,
            _ => write!(self.output, "{}: ", question)?,
        }
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        if read == 0 {
            return Err(anyhow!("Input closed while waiting for: {}", question));
        }

        let answer = line.trim();
        match (answer.is_empty(), default) {
            (true, Some(d)) => Ok(d.to_string()),
            _ => Ok(answer.to_string()),
        }
    }

    /// Like [`ask`](Self::ask) but rejects an empty result.
    pub fn ask_required(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        let answer = self.ask(question, default)?;
        if answer.is_empty() {
            return Err(anyhow!("{} is required", question));
        }
        Ok(answer)
    }

    /// Print the menu and read one choice.
    pub fn choose(&mut self) -> Result<MenuChoice> {
        writeln!(self.output, "\n=== PKI Deploy Menu ===")?;
        for choice in MenuChoice::ALL {
            writeln!(self.output, "{}", choice)?;
        }
        let answer = self.ask("\nSelect an option", None)?;
        Ok(answer.parse::<MenuChoice>()?)
    }
}
