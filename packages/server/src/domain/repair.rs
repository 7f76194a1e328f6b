//! Best-effort structural repair of generated sketches before they are run.

use std::fmt;

use thiserror::Error;

use super::code::{SKETCH_WRAPPER, collapse_nested_wrapper, count_braces};

/// Runs in place of a sketch that could not be repaired.
pub const ERROR_SKETCH: &str = r#"return function(p) {
  p.setup = function() {
    p.createCanvas(400, 400);
  };
  p.draw = function() {
    p.background(220);
    p.fill(200, 0, 0);
    p.textSize(16);
    p.textAlign(p.CENTER, p.CENTER);
    p.text("This game could not be loaded.", p.width / 2, p.height / 2 - 12);
    p.text("Ask for a fix in the chat.", p.width / 2, p.height / 2 + 12);
  };
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairAction {
    CollapsedNestedWrapper,
    WrappedBareSketch,
    AppendedClosingBraces(usize),
    TrimmedTrailingBraces(usize),
    AppendedFinalBrace,
}

impl fmt::Display for RepairAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairAction::CollapsedNestedWrapper => f.write_str("collapsed nested wrapper"),
            RepairAction::WrappedBareSketch => f.write_str("wrapped bare setup/draw"),
            RepairAction::AppendedClosingBraces(n) => write!(f, "appended {} closing brace(s)", n),
            RepairAction::TrimmedTrailingBraces(n) => write!(f, "trimmed {} trailing brace(s)", n),
            RepairAction::AppendedFinalBrace => f.write_str("appended final brace"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedCode {
    pub code: String,
    pub actions: Vec<RepairAction>,
}

impl RepairedCode {
    pub fn was_modified(&self) -> bool {
        !self.actions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unrepairable {
    #[error("sketch is empty")]
    Empty,
    #[error("sketch has no `return function(p)` wrapper and no setup/draw pair to wrap")]
    MissingWrapper,
}

/// Repair common structural defects in a generated sketch.
///
/// Steps run in order: collapse a doubled wrapper, wrap a bare setup/draw
/// pair, append missing closing braces, trim surplus trailing braces, and
/// finally make sure the sketch ends with `}`.
pub fn repair(code: &str) -> Result<RepairedCode, Unrepairable> {
    if code.trim().is_empty() {
        return Err(Unrepairable::Empty);
    }

    let mut actions = Vec::new();

    let mut code = {
        let collapsed = collapse_nested_wrapper(code);
        if collapsed != code {
            actions.push(RepairAction::CollapsedNestedWrapper);
        }
        collapsed
    };

    if !code.contains(SKETCH_WRAPPER) {
        if !has_setup_and_draw(&code) {
            return Err(Unrepairable::MissingWrapper);
        }
        code = wrap(&code);
        actions.push(RepairAction::WrappedBareSketch);
    }

    let (open, close) = count_braces(&code);
    if open > close {
        let missing = open - close;
        code = code.trim_end().to_string();
        for i in 0..missing {
            code.push('\n');
            code.push_str(&"  ".repeat(missing - i - 1));
            code.push('}');
        }
        actions.push(RepairAction::AppendedClosingBraces(missing));
    } else if close > open {
        let extra = close - open;
        let mut removed = 0;
        while removed < extra {
            let trimmed_len = code.trim_end().len();
            if !code[..trimmed_len].ends_with('}') {
                break;
            }
            code.truncate(trimmed_len - 1);
            removed += 1;
        }
        if removed > 0 {
            code = code.trim_end().to_string();
            actions.push(RepairAction::TrimmedTrailingBraces(removed));
        }
    }

    if !code.trim_end().ends_with('}') {
        code = format!("{}\n}}", code.trim_end());
        actions.push(RepairAction::AppendedFinalBrace);
    }

    Ok(RepairedCode { code, actions })
}

fn has_setup_and_draw(code: &str) -> bool {
    let setup = code.contains("function setup") || code.contains("p.setup");
    let draw = code.contains("function draw") || code.contains("p.draw");
    setup && draw
}

fn wrap(code: &str) -> String {
    let body = code
        .trim()
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("  {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{} {{\n{}\n}}", SKETCH_WRAPPER, body)
}

/// A sketch ready to hand to the runtime, or the error sketch in its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSketch {
    pub code: String,
    pub actions: Vec<RepairAction>,
    pub fallback: Option<Unrepairable>,
}

pub fn prepare_sketch(code: &str) -> PreparedSketch {
    match repair(code) {
        Ok(repaired) => PreparedSketch {
            code: repaired.code,
            actions: repaired.actions,
            fallback: None,
        },
        Err(reason) => {
            tracing::warn!("Falling back to error sketch: {}", reason);
            PreparedSketch {
                code: ERROR_SKETCH.to_string(),
                actions: Vec::new(),
                fallback: Some(reason),
            }
        }
    }
}
