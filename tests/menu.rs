//! Command loop behavior, driven by a scripted console and a fake client.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;

use anyhow::anyhow;
use cosmos_demos::ui::{Console, Menu, Section};
use pretty_assertions::assert_eq;

type Log = Rc<RefCell<Vec<String>>>;

/// Console fed from a fixed list of lines. Pauses and clears are recorded in
/// the shared log so they can be ordered against demo events.
struct ScriptedConsole {
    input: VecDeque<String>,
    output: Vec<u8>,
    log: Log,
}

impl ScriptedConsole {
    fn new(lines: &[&str], log: &Log) -> Self {
        Self {
            input: lines.iter().map(|l| l.to_string()).collect(),
            output: Vec::new(),
            log: log.clone(),
        }
    }

    fn text(&self) -> String {
        String::from_utf8(self.output.clone()).unwrap()
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.input.pop_front())
    }

    fn out(&mut self) -> &mut dyn Write {
        &mut self.output
    }

    fn pause(&mut self, _message: &str) -> io::Result<()> {
        self.log.borrow_mut().push("pause".into());
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.log.borrow_mut().push("clear".into());
        Ok(())
    }
}

/// Stand-in for the service client; records when it is dropped.
struct FakeClient {
    log: Log,
}

impl Drop for FakeClient {
    fn drop(&mut self) {
        self.log.borrow_mut().push("drop".into());
    }
}

fn recording(code: &'static str) -> impl Fn(&FakeClient, &mut dyn Write) -> anyhow::Result<()> {
    move |client: &FakeClient, out: &mut dyn Write| {
        client.log.borrow_mut().push(format!("run {code}"));
        writeln!(out, "ran {code}")?;
        Ok(())
    }
}

fn menu() -> Menu<FakeClient> {
    Menu::new()
        .with_demo("DB", "Databases", Section::Sdk, recording("DB"))
        .with_demo("CO", "Collections", Section::Sdk, recording("CO"))
        .with_demo("C", "Cleanup", Section::Maintenance, recording("C"))
        .with_demo("ER", "Failing", Section::Maintenance, |_: &FakeClient, _: &mut dyn Write| {
            Err(anyhow!("connection reset by peer")
                .context("request GET dbs could not be sent")
                .context("listing databases"))
        })
}

fn run(lines: &[&str]) -> (String, Vec<String>) {
    let log: Log = Rc::default();
    let mut console = ScriptedConsole::new(lines, &log);
    let connect_log = log.clone();
    menu()
        .run(&mut console, move || {
            connect_log.borrow_mut().push("connect".into());
            Ok(FakeClient {
                log: connect_log.clone(),
            })
        })
        .unwrap();
    let events = log.borrow().clone();
    (console.text(), events)
}

fn events(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn unknown_input_is_echoed_and_loop_continues() {
    let (output, log) = run(&["xx", "db", "q"]);

    assert!(output.contains("?xx\n"));
    assert_eq!(log, events(&["connect", "run DB", "drop", "pause", "clear"]));
}

#[test]
fn unknown_input_does_not_redraw_menu() {
    let (output, _) = run(&["xx", "  nope ", "q"]);

    assert_eq!(output.matches("Q  Quit").count(), 1);
    assert!(output.contains("?  nope \n"));
}

#[test]
fn quit_ends_loop_without_running_anything() {
    for quit in ["q", "Q", "  Q  ", "\tq"] {
        let (output, log) = run(&[quit, "db"]);
        assert!(log.is_empty(), "{quit:?} ran {log:?}");
        assert!(!output.contains('?'));
    }
}

#[test]
fn end_of_input_ends_loop() {
    let (_, log) = run(&["db"]);
    assert_eq!(log, events(&["connect", "run DB", "drop", "pause", "clear"]));
}

#[test]
fn each_code_runs_its_routine_once_per_entry() {
    let (output, log) = run(&["db", " co ", "Db", "c", "q"]);

    let runs: Vec<_> = log.iter().filter(|e| e.starts_with("run")).cloned().collect();
    assert_eq!(runs, events(&["run DB", "run CO", "run DB", "run C"]));
    assert_eq!(log.iter().filter(|e| *e == "connect").count(), 4);
    // Initial menu plus one redraw per demo.
    assert_eq!(output.matches("Q  Quit").count(), 5);
}

#[test]
fn client_is_dropped_before_the_pause_even_on_failure() {
    let (_, log) = run(&["er", "q"]);
    assert_eq!(log, events(&["connect", "drop", "pause", "clear"]));
}

#[test]
fn error_chain_is_printed_one_cause_per_line() {
    let (output, _) = run(&["er", "q"]);

    assert!(output.contains(
        "Error: listing databases\nrequest GET dbs could not be sent\nconnection reset by peer\n\n"
    ));
}

#[test]
fn failed_connection_prints_single_line_and_redraws_menu() {
    let log: Log = Rc::default();
    let mut console = ScriptedConsole::new(&["co", "q"], &log);

    menu()
        .run(&mut console, || -> anyhow::Result<FakeClient> {
            Err(anyhow!("No connection could be made to the account endpoint"))
        })
        .unwrap();

    let output = console.text();
    assert!(output.contains("Error: No connection could be made to the account endpoint\n\n"));
    assert_eq!(output.matches("Q  Quit").count(), 2);
    assert_eq!(log.borrow().clone(), events(&["pause", "clear"]));
}

#[test]
fn routine_output_goes_to_the_console() {
    let (output, _) = run(&["co", "q"]);
    assert!(output.contains("ran CO\n"));
}

#[test]
fn menu_lists_codes_and_quit() {
    let (output, _) = run(&["q"]);
    assert!(output.contains("DB Databases\n"));
    assert!(output.contains("CO Collections\n"));
    assert!(output.contains("C  Cleanup\n"));
    assert!(output.ends_with("Q  Quit\n"));
}
