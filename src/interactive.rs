//! Emulates a Python interactive session for blocks written as transcripts.
//!
//! The block is cut into statement groups, either at `>>> ` prompts (with
//! `... ` continuation lines attached) or, for prompt-less sources, at blank
//! lines. Unprompted lines in a transcript are stale output and are
//! dropped. All groups of one block run in a single interpreter process, so
//! names bound by one group are visible to the next, and the captured output
//! is woven back under the prompt lines of the group that produced it.

use crate::executor::{ExecRequest, Executor, Invocation};
use std::path::PathBuf;

pub const PROMPT: &str = ">>> ";
pub const CONTINUATION: &str = "... ";

/// Separates groups on the driver's stdin and in its output.
const GROUP_SEPARATOR: char = '\0';

/// Reads NUL-separated groups from stdin and runs them like the REPL does:
/// expression statements echo their repr, errors print a traceback and the
/// session carries on. A NUL line follows each group's output.
const DRIVER: &str = r#"import ast, code, sys
sys.stderr = sys.stdout
console = code.InteractiveInterpreter()
for chunk in sys.stdin.read().split('\0'):
    try:
        tree = ast.parse(chunk + '\n', '<stdin>', 'exec')
    except SyntaxError:
        console.showsyntaxerror('<stdin>')
    else:
        for stmt in tree.body:
            if isinstance(stmt, ast.Expr):
                node, mode = ast.Interactive(body=[stmt]), 'single'
            else:
                node, mode = ast.Module(body=[stmt]), 'exec'
                node.type_ignores = []
            console.runcode(compile(node, '<stdin>', mode))
    sys.stdout.write('\0\n')
    sys.stdout.flush()
"#;

/// Whether `source` is written as a prompt transcript.
pub fn has_prompts(source: &str) -> bool {
    source.starts_with(PROMPT)
}

/// Splits a transcript (or plain source) into statement groups with the
/// prompt markers removed.
pub fn split_groups(source: &str) -> Vec<Vec<String>> {
    if has_prompts(source) {
        split_at_prompts(source)
    } else {
        split_at_blank_lines(source)
    }
}

fn split_at_prompts(source: &str) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = Vec::new();
    for line in source.lines() {
        if let Some(statement) = strip_marker(line, PROMPT) {
            groups.push(vec![statement.to_string()]);
        } else if let Some(continued) = strip_marker(line, CONTINUATION) {
            if let Some(group) = groups.last_mut() {
                group.push(continued.to_string());
            }
        } else {
            log::debug!("Dropping unprompted transcript line: {line}");
        }
    }
    for group in &mut groups {
        while group.len() > 1 && group.last().is_some_and(|l| l.trim().is_empty()) {
            group.pop();
        }
    }
    groups
}

/// Accepts the marker with or without its trailing space (`>>>` alone on a line).
fn strip_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.strip_prefix(marker)
        .or_else(|| (line == marker.trim_end()).then_some(""))
}

fn split_at_blank_lines(source: &str) -> Vec<Vec<String>> {
    let mut groups = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for line in source.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.to_string());
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Renders groups back as prompt lines.
fn prompt_lines(group: &[String]) -> impl Iterator<Item = String> + '_ {
    group.iter().enumerate().map(|(i, line)| {
        let marker = if i == 0 { PROMPT } else { CONTINUATION };
        format!("{marker}{line}").trim_end().to_string()
    })
}

/// Runs an interactive block through a Python interpreter.
pub struct InteractiveSession<'a> {
    executor: &'a Executor,
    interpreter: String,
    working_dir: Option<PathBuf>,
}

impl<'a> InteractiveSession<'a> {
    /// `command` is the block's resolved interpreter command; only its
    /// program is used, the driver supplies its own arguments.
    pub fn new(executor: &'a Executor, command: &str, working_dir: Option<PathBuf>) -> Self {
        let interpreter = Invocation::parse(command)
            .map(|invocation| invocation.program)
            .unwrap_or_else(|_| "python3".to_string());
        Self {
            executor,
            interpreter,
            working_dir,
        }
    }

    /// Executes every group and returns the woven transcript.
    pub fn run(&self, source: &str) -> String {
        let groups = split_groups(source);
        if groups.is_empty() {
            return String::new();
        }

        let stdin = groups
            .iter()
            .map(|group| group.join("\n"))
            .collect::<Vec<_>>()
            .join(&GROUP_SEPARATOR.to_string());
        let request = ExecRequest {
            program: self.interpreter.clone(),
            args: vec!["-c".to_string(), DRIVER.to_string()],
            stdin: Some(stdin),
            working_dir: self.working_dir.clone(),
        };
        let result = self.executor.run(&request);

        let outputs = split_outputs(&result.output);
        let mut transcript: Vec<String> = Vec::new();
        for (index, group) in groups.iter().enumerate() {
            transcript.extend(prompt_lines(group));
            if let Some(output) = outputs.get(index) {
                transcript.extend(output.lines().map(str::to_string));
            }
        }
        // Output the driver produced outside any group, e.g. a failed start.
        if let Some(rest) = outputs.get(groups.len()) {
            transcript.extend(rest.lines().map(str::to_string));
        }
        transcript.join("\n")
    }
}

/// Splits driver output into per-group chunks. The final chunk holds
/// anything printed after the last separator.
fn split_outputs(output: &str) -> Vec<String> {
    let separator = format!("{GROUP_SEPARATOR}\n");
    let mut chunks: Vec<String> = output.split(separator.as_str()).map(|c| c.trim_end().to_string()).collect();
    while chunks.last().is_some_and(|c| c.is_empty()) {
        chunks.pop();
    }
    chunks
}
