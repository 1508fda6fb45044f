// UI layer: the text menu and the command loop that dispatches demo codes.
//
// The loop talks to the terminal through the `Console` trait so it can be
// driven by a script in tests; `TerminalConsole` is the interactive version
// built on `dialoguer` and `crossterm`.

use std::collections::BTreeMap;
use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType};
use dialoguer::Input;
use tracing::{debug, warn};

/// Code that ends the command loop.
pub const QUIT: &str = "Q";

/// A demo routine: runs against a client and writes its report to `out`.
pub type DemoFn<C> = Box<dyn Fn(&C, &mut dyn Write) -> Result<()>>;

/// Menu group a demo is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Sdk,
    ServerSide,
    Maintenance,
}

impl Section {
    fn heading(&self) -> Option<&'static str> {
        match self {
            Section::Sdk => Some("Cosmos DB SQL API demos"),
            Section::ServerSide => Some("Cosmos DB SQL API Server-Side Programming demos"),
            Section::Maintenance => None,
        }
    }
}

struct Entry<C> {
    title: &'static str,
    section: Section,
    order: usize,
    run: DemoFn<C>,
}

/// Terminal abstraction used by the command loop.
pub trait Console {
    /// Prompt and read one line without its line terminator. `None` at end
    /// of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Stream that menu text and demo reports are written to.
    fn out(&mut self) -> &mut dyn Write;

    /// Wait for the user to acknowledge a finished demo.
    fn pause(&mut self, message: &str) -> io::Result<()>;

    fn clear(&mut self) -> io::Result<()>;
}

/// Code → demo table plus the loop that drives it.
pub struct Menu<C> {
    demos: BTreeMap<&'static str, Entry<C>>,
}

impl<C> Default for Menu<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Menu<C> {
    pub fn new() -> Self {
        Self {
            demos: BTreeMap::new(),
        }
    }

    /// Register a demo under an uppercase `code`.
    pub fn with_demo<F>(mut self, code: &'static str, title: &'static str, section: Section, run: F) -> Self
    where
        F: Fn(&C, &mut dyn Write) -> Result<()> + 'static,
    {
        debug_assert_eq!(code, code.to_uppercase());
        let order = self.demos.len();
        self.demos.insert(
            code,
            Entry {
                title,
                section,
                order,
                run: Box::new(run),
            },
        );
        self
    }

    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.demos.keys().copied()
    }

    /// Menu text, grouped by section in registration order.
    pub fn render(&self) -> String {
        let mut entries: Vec<_> = self.demos.iter().collect();
        entries.sort_by_key(|(_, entry)| (entry.section, entry.order));

        let mut text = String::new();
        let mut current = None;
        for (code, entry) in entries {
            if current != Some(entry.section) {
                if current.is_some() {
                    text.push('\n');
                }
                if let Some(heading) = entry.section.heading() {
                    text.push_str(heading);
                    text.push('\n');
                    text.push_str(&"=".repeat(47));
                    text.push('\n');
                }
                current = Some(entry.section);
            }
            text.push_str(&format!("{code:<2} {}\n", entry.title));
        }
        text.push_str(&format!("\n{QUIT:<2} Quit\n"));
        text
    }

    /// Run the command loop until quit or end of input. `connect` builds a
    /// fresh client for every demo invocation; the client is dropped as soon
    /// as the demo returns.
    pub fn run<F>(&self, console: &mut dyn Console, mut connect: F) -> Result<()>
    where
        F: FnMut() -> Result<C>,
    {
        self.show(console)?;
        loop {
            let Some(input) = console.read_line("Selection")? else {
                debug!("end of input");
                break;
            };
            let code = input.trim().to_uppercase();
            if let Some(entry) = self.demos.get(code.as_str()) {
                debug!(%code, demo = entry.title, "running demo");
                self.run_demo(entry, console, &mut connect)?;
            } else if code == QUIT {
                break;
            } else {
                writeln!(console.out(), "?{input}")?;
            }
        }
        Ok(())
    }

    fn run_demo<F>(&self, entry: &Entry<C>, console: &mut dyn Console, connect: &mut F) -> Result<()>
    where
        F: FnMut() -> Result<C>,
    {
        let outcome = connect().and_then(|client| (entry.run)(&client, console.out()));
        if let Err(err) = outcome {
            warn!(demo = entry.title, error = %err, "demo failed");
            writeln!(console.out(), "Error: {}", error_chain(&err))?;
        }
        writeln!(console.out())?;
        console.pause("Done. Press any key to continue...")?;
        console.clear()?;
        self.show(console)
    }

    fn show(&self, console: &mut dyn Console) -> Result<()> {
        write!(console.out(), "{}", self.render())?;
        console.out().flush()?;
        Ok(())
    }
}

/// Message of an error and each of its causes, outermost first, one per
/// line.
pub fn error_chain(err: &anyhow::Error) -> String {
    err.chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Interactive console on stdin/stdout. Falls back to plain line reads and
/// skips screen control when stdin is not a terminal.
pub struct TerminalConsole {
    stdout: io::Stdout,
    interactive: bool,
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            interactive: io::stdin().is_terminal() && io::stdout().is_terminal(),
        }
    }
}

impl Console for TerminalConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if self.interactive {
            // `Input::interact_text()` prompts the user and returns the line.
            let line: String = Input::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()?;
            return Ok(Some(line));
        }

        write!(self.stdout, "{prompt}: ")?;
        self.stdout.flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    fn out(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }

    fn pause(&mut self, message: &str) -> io::Result<()> {
        if !self.interactive {
            return Ok(());
        }
        write!(self.stdout, "{message}")?;
        self.stdout.flush()?;

        // Any key press, without echoing it.
        terminal::enable_raw_mode()?;
        let key = loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(()),
                Ok(_) => continue,
                Err(err) => break Err(err),
            }
        };
        terminal::disable_raw_mode()?;
        writeln!(self.stdout)?;
        key
    }

    fn clear(&mut self) -> io::Result<()> {
        if !self.interactive {
            return Ok(());
        }
        execute!(self.stdout, Clear(ClearType::All), MoveTo(0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_sections_in_registration_order() {
        let menu: Menu<()> = Menu::new()
            .with_demo("DB", "Databases", Section::Sdk, |_, _| Ok(()))
            .with_demo("SP", "Stored procedures", Section::ServerSide, |_, _| Ok(()))
            .with_demo("CO", "Collections", Section::Sdk, |_, _| Ok(()))
            .with_demo("C", "Cleanup", Section::Maintenance, |_, _| Ok(()));

        let expected = "\
Cosmos DB SQL API demos
===============================================
DB Databases
CO Collections

Cosmos DB SQL API Server-Side Programming demos
===============================================
SP Stored procedures

C  Cleanup

Q  Quit
";
        assert_eq!(menu.render(), expected);
    }

    #[test]
    fn error_chain_lists_causes_outermost_first() {
        let err = anyhow::anyhow!("connection refused")
            .context("request GET dbs could not be sent")
            .context("listing databases");

        assert_eq!(
            error_chain(&err),
            "listing databases\nrequest GET dbs could not be sent\nconnection refused"
        );
    }
}
