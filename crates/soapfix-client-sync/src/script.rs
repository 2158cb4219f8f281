//! Line based fixture scripts.
//!
//! One step per line, cells separated by `|`. Blank lines and lines starting
//! with `#` are skipped. Cells are trimmed. Cells that hold XML or XPath
//! absorb any further `|`, so `show | //a | //b` prints the union `//a | //b`.
//!
//! Value cells (header values, `set` values, `check` expectations) wrapped in
//! double quotes keep their inner text verbatim: `check | //ns:Code | " 42 "`
//! expects the value ` 42 `. A quoted value cannot contain `|`.
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use soapfix_core::{SoapError, SoapSession, Transport};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Namespace { prefix: String, uri: String },
    ResetNamespaces,
    SetHeader { name: String, value: String },
    AddHeader { name: String, value: String },
    ResetHeaders,
    Body(String),
    BodyFile(PathBuf),
    Set { xpath: String, value: String },
    Send(String),
    SendFails(String),
    Check { xpath: String, expected: String },
    Fault,
    NoFault,
    ShowRequest,
    ShowResponse,
    ShowHeaders,
    Show(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub number: usize,
    pub text: String,
    pub step: Step,
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("line {line}: unknown step '{keyword}'")]
    UnknownStep { line: usize, keyword: String },

    #[error("line {line}: '{keyword}' expects {expected}")]
    MissingCells {
        line: usize,
        keyword: String,
        expected: &'static str,
    },
}

/// Parses every step of a script.
pub fn parse_script(text: &str) -> Result<Vec<ScriptLine>, ScriptError> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            Ok(ScriptLine {
                number,
                text: line.to_owned(),
                step: parse_step(number, line)?,
            })
        })
        .collect()
}

fn parse_step(line: usize, text: &str) -> Result<Step, ScriptError> {
    let cells: Vec<&str> = text.split('|').map(str::trim).collect();
    let keyword = cells[0].to_ascii_lowercase();
    let keyword = keyword.split_whitespace().collect::<Vec<_>>().join(" ");
    let args = &cells[1..];

    let missing = |expected: &'static str| ScriptError::MissingCells {
        line,
        keyword: keyword.clone(),
        expected,
    };
    // All remaining cells as one value, for XML and XPath.
    let rest = |from: usize| -> Option<String> {
        (args.len() > from).then(|| args[from..].join(" | "))
    };
    // Middle cells joined, last cell separate.
    let split_last = || -> Option<(String, String)> {
        let (last, middle) = args.split_last()?;
        (!middle.is_empty()).then(|| (middle.join(" | "), unquote(last)))
    };

    let step = match keyword.as_str() {
        "namespace" => {
            let [prefix, uri] = args else {
                return Err(missing("a prefix and a URI"));
            };
            Step::Namespace {
                prefix: (*prefix).to_owned(),
                uri: (*uri).to_owned(),
            }
        }
        "reset namespaces" => Step::ResetNamespaces,
        "set header" | "add header" => {
            let [name, value] = args else {
                return Err(missing("a header name and a value"));
            };
            let (name, value) = ((*name).to_owned(), unquote(value));
            if keyword == "set header" {
                Step::SetHeader { name, value }
            } else {
                Step::AddHeader { name, value }
            }
        }
        "reset headers" => Step::ResetHeaders,
        "body" => Step::Body(rest(0).ok_or_else(|| missing("an XML fragment"))?),
        "body file" => Step::BodyFile(PathBuf::from(
            rest(0).ok_or_else(|| missing("a file path"))?,
        )),
        "set" => {
            let (xpath, value) = split_last().ok_or_else(|| missing("an XPath and a value"))?;
            Step::Set { xpath, value }
        }
        "check" => {
            let (xpath, expected) =
                split_last().ok_or_else(|| missing("an XPath and an expected value"))?;
            Step::Check { xpath, expected }
        }
        "send" => Step::Send(rest(0).ok_or_else(|| missing("an endpoint URL"))?),
        "send fails" => Step::SendFails(rest(0).ok_or_else(|| missing("an endpoint URL"))?),
        "fault" => Step::Fault,
        "no fault" => Step::NoFault,
        "show request" => Step::ShowRequest,
        "show response" => Step::ShowResponse,
        "show headers" => Step::ShowHeaders,
        "show" => Step::Show(rest(0).ok_or_else(|| missing("an XPath"))?),
        _ => {
            return Err(ScriptError::UnknownStep {
                line,
                keyword: cells[0].to_owned(),
            })
        }
    };
    Ok(step)
}

/// Strips one pair of surrounding double quotes.
fn unquote(cell: &str) -> String {
    cell.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(cell)
        .to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Passed,
    /// The step ran and its expectation did not hold.
    Failed(String),
    /// The step could not run.
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub line: usize,
    pub text: String,
    pub result: StepResult,
}

#[derive(Debug, Default)]
pub struct Report {
    pub outcomes: Vec<Outcome>,
}

impl Report {
    pub fn passed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result == StepResult::Passed)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result != StepResult::Passed)
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in self.failures() {
            let (kind, message) = match &outcome.result {
                StepResult::Failed(message) => ("FAILED", message.as_str()),
                StepResult::Error(message) => ("ERROR", message.as_str()),
                StepResult::Passed => continue,
            };
            writeln!(f, "{kind} line {}: {} ({message})", outcome.line, outcome.text)?;
        }
        write!(
            f,
            "{} steps, {} passed, {} failed",
            self.outcomes.len(),
            self.passed(),
            self.outcomes.len() - self.passed()
        )
    }
}

#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error(transparent)]
    Soap(#[from] SoapError),
    #[error("{path}: {source}")]
    File { path: PathBuf, source: io::Error },
    #[error("output: {0}")]
    Output(#[from] io::Error),
}

/// Drives a session through script steps, printing `show` output to `out`.
pub struct ScriptRunner<T, W> {
    session: SoapSession<T>,
    out: W,
    base_dir: PathBuf,
}

impl<T: Transport, W: Write> ScriptRunner<T, W> {
    /// `base_dir` anchors relative `body file` paths.
    pub fn new(session: SoapSession<T>, out: W, base_dir: impl Into<PathBuf>) -> Self {
        ScriptRunner {
            session,
            out,
            base_dir: base_dir.into(),
        }
    }

    pub fn session(&self) -> &SoapSession<T> {
        &self.session
    }

    pub fn into_parts(self) -> (SoapSession<T>, W) {
        (self.session, self.out)
    }

    /// Runs every step; failures are recorded and the run continues.
    #[instrument(name = "script.run", level = "info", skip_all, fields(steps = script.len()))]
    pub fn run(&mut self, script: &[ScriptLine]) -> Report {
        let mut report = Report::default();
        for line in script {
            let result = match self.execute(&line.step) {
                Ok(result) => result,
                Err(error) => StepResult::Error(error.to_string()),
            };
            match &result {
                StepResult::Passed => info!(line = line.number, step = %line.text, "step passed"),
                StepResult::Failed(reason) | StepResult::Error(reason) => {
                    warn!(line = line.number, step = %line.text, %reason, "step failed");
                }
            }
            report.outcomes.push(Outcome {
                line: line.number,
                text: line.text.clone(),
                result,
            });
        }
        report
    }

    fn execute(&mut self, step: &Step) -> Result<StepResult, StepError> {
        let session = &mut self.session;
        let result = match step {
            Step::Namespace { prefix, uri } => {
                session.add_namespace(prefix, uri)?;
                StepResult::Passed
            }
            Step::ResetNamespaces => {
                session.reset_namespaces();
                StepResult::Passed
            }
            Step::SetHeader { name, value } => {
                session.set_header(name, value);
                StepResult::Passed
            }
            Step::AddHeader { name, value } => {
                session.add_header(name, value);
                StepResult::Passed
            }
            Step::ResetHeaders => {
                session.reset_headers();
                StepResult::Passed
            }
            Step::Body(xml) => {
                session.set_request_body(xml)?;
                StepResult::Passed
            }
            Step::BodyFile(path) => {
                let path = resolve_path(&self.base_dir, path);
                let xml = std::fs::read_to_string(&path)
                    .map_err(|source| StepError::File { path, source })?;
                session.set_request_body(&xml)?;
                StepResult::Passed
            }
            Step::Set { xpath, value } => {
                session.set_xpath_value(xpath, value)?;
                StepResult::Passed
            }
            Step::Send(endpoint) => verdict(
                session.send(endpoint),
                || format!("no response from {endpoint}"),
            ),
            Step::SendFails(endpoint) => verdict(
                !session.send(endpoint),
                || format!("{endpoint} answered"),
            ),
            Step::Check { xpath, expected } => {
                if session.value_at_xpath_equals(xpath, expected)? {
                    StepResult::Passed
                } else {
                    let actual = session.get_xpath_value(xpath)?;
                    StepResult::Failed(match actual {
                        Some(actual) => format!("expected '{expected}', found '{actual}'"),
                        None => format!("expected '{expected}', found no value"),
                    })
                }
            }
            Step::Fault => verdict(session.has_fault(), || "response carries no fault".to_owned()),
            Step::NoFault => verdict(!session.has_fault(), || {
                if session.response().is_some() {
                    "response carries a fault".to_owned()
                } else {
                    "no response".to_owned()
                }
            }),
            Step::ShowRequest => {
                let text = session.request_as_text()?.unwrap_or_default();
                writeln!(self.out, "{text}")?;
                StepResult::Passed
            }
            Step::ShowResponse => {
                match session.response_as_text()? {
                    Some(text) => writeln!(self.out, "{text}")?,
                    None => writeln!(self.out, "(no response)")?,
                }
                StepResult::Passed
            }
            Step::ShowHeaders => {
                writeln!(self.out, "{}", session.headers_as_text())?;
                StepResult::Passed
            }
            Step::Show(xpath) => {
                match session.get_xpath_value(xpath)? {
                    Some(value) => writeln!(self.out, "{xpath} = {value}")?,
                    None => writeln!(self.out, "{xpath} = (no value)")?,
                }
                StepResult::Passed
            }
        };
        Ok(result)
    }
}

fn verdict(holds: bool, reason: impl FnOnce() -> String) -> StepResult {
    if holds {
        StepResult::Passed
    } else {
        StepResult::Failed(reason())
    }
}

fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        base_dir.join(path)
    }
}
