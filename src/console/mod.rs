/// Embedded interactive shell.
///
/// Lines are either commands (`help`, `ls`, `del <alias>`, `clear`) or
/// array expressions over open resources. `name = expr` stores the result as
/// a new derived resource.
pub mod expr;

use crate::error::ConsoleError;
use crate::resource::{NumericArray, Resource, ResourceRegistry};
use expr::{Env, Value};

/// Name bound to the source data by [`transform`].
pub const DATA_VAR: &str = "_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Input,
    Output,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleLine {
    pub kind: LineKind,
    pub text: String,
}

/// Scrollback, input buffer and history of the console dock.
#[derive(Debug, Default)]
pub struct Console {
    pub lines: Vec<ConsoleLine>,
    pub input: String,
    history: Vec<String>,
    history_pos: Option<usize>,
}

impl Console {
    pub fn new(banner: &str) -> Self {
        let mut console = Self::default();
        if !banner.is_empty() {
            console.print(LineKind::Output, banner);
        }
        console
    }

    pub fn print(&mut self, kind: LineKind, text: impl Into<String>) {
        let text = text.into();
        for line in text.lines() {
            self.lines.push(ConsoleLine {
                kind,
                text: line.to_string(),
            });
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Run the current input buffer.
    pub fn submit(&mut self, registry: &mut ResourceRegistry) {
        let line = std::mem::take(&mut self.input);
        self.execute(&line, registry);
    }

    /// Run one line, echoing it and its result into the scrollback.
    pub fn execute(&mut self, line: &str, registry: &mut ResourceRegistry) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        self.print(LineKind::Input, format!(">>> {line}"));
        if self.history.last().map(String::as_str) != Some(line) {
            self.history.push(line.to_string());
        }
        self.history_pos = None;

        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("help"), None) => self.print(LineKind::Output, help_text()),
            (Some("clear"), None) => self.clear(),
            (Some("ls"), None) => {
                if registry.is_empty() {
                    self.print(LineKind::Output, "(no resources)");
                }
                let listing: Vec<String> = registry
                    .iter()
                    .map(|r| format!("{:<20} {:<6} {}", r.alias, r.type_name(), r.summary()))
                    .collect();
                for l in listing {
                    self.print(LineKind::Output, l);
                }
            }
            (Some("del"), Some(_)) => {
                let alias = line["del".len()..].trim().trim_matches('`');
                match registry.remove(alias) {
                    Ok(r) => self.print(LineKind::Output, format!("deleted {r}")),
                    Err(e) => self.print(LineKind::Error, e.to_string()),
                }
            }
            _ => match run_statement(line, registry) {
                Ok(text) => self.print(LineKind::Output, text),
                Err(e) => {
                    log::debug!("console error: {e}");
                    self.print(LineKind::Error, e.to_string());
                }
            },
        }
    }

    /// Step back through history into the input buffer.
    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let pos = match self.history_pos {
            None => self.history.len() - 1,
            Some(p) => p.saturating_sub(1),
        };
        self.history_pos = Some(pos);
        self.input = self.history[pos].clone();
    }

    /// Step forward through history; past the newest entry clears the input.
    pub fn history_next(&mut self) {
        match self.history_pos {
            Some(p) if p + 1 < self.history.len() => {
                self.history_pos = Some(p + 1);
                self.input = self.history[p + 1].clone();
            }
            Some(_) => {
                self.history_pos = None;
                self.input.clear();
            }
            None => {}
        }
    }
}

fn help_text() -> String {
    format!(
        "Commands: help, ls, del <alias>, clear\n\
         Expressions: + - * / ^, parentheses, resource aliases (`quoted` if needed)\n\
         Assign with  name = expr  to create a new resource\n\
         Constants: pi, e, nan, inf (an open resource of the same name wins)\n\
         Functions: {}",
        expr::FUNCTIONS.join(", ")
    )
}

fn run_statement(line: &str, registry: &mut ResourceRegistry) -> Result<String, ConsoleError> {
    let stmt = expr::parse(line)?;
    let value = Env::new(registry).eval(&stmt.expr)?;
    match stmt.target {
        Some(target) => {
            let alias = registry.add_array(&target, value.into_array());
            Ok(format!("stored as '{alias}'"))
        }
        None => Ok(value.to_string()),
    }
}

/// Apply `code` to a resource's numeric view bound as `_data`.
///
/// `code` is either an expression (its value is the result) or an assignment
/// to `_data`. The source's sample rate carries over to the result.
pub fn transform(
    resource: &Resource,
    code: &str,
    registry: &ResourceRegistry,
) -> Result<NumericArray, ConsoleError> {
    let stmt = expr::parse(code)?;
    if let Some(target) = stmt.target.as_deref() {
        if target != DATA_VAR {
            return Err(ConsoleError::Type("an expression or an assignment to _data"));
        }
    }
    let mut env = Env::new(registry);
    env.bind(DATA_VAR, Value::Array(resource.to_array()));
    let mut out = env.eval(&stmt.expr)?.into_array();
    if out.sample_rate.is_none() {
        out.sample_rate = resource.sample_rate();
    }
    Ok(out)
}
