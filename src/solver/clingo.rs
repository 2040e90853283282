//! Subprocess interface to the combinatorial optimization oracle (`clingo`).
//!
//! Programs are assembled as text, written to a scoped temporary file and
//! solved in one invocation. The oracle's exit status encodes satisfiability
//! (`10` satisfiable, `20` unsatisfiable, `30` satisfiable and exhausted);
//! any other status is a tool-execution failure.

use crate::Fact;
use std::io::Write;
use std::process::Command;

/// One answer set returned by the oracle: its atoms as parsed facts, plus
/// the optimization vector (empty when optimization is off or ignored).
#[derive(Clone, Debug)]
pub struct AnswerSet {
    pub facts: Vec<Fact>,
    pub optimization: Vec<i64>,
}

/// The outcome of one oracle invocation.
#[derive(Clone, Debug)]
pub struct SolveResult {
    /// Answer sets in discovery order. Under optimization, intermediate
    /// improving answers are included and the last one is the best found.
    pub answers: Vec<AnswerSet>,
    /// The search space was exhausted (all models enumerated, optimum
    /// proved, or unsatisfiability established).
    pub exhausted: bool,
}

impl SolveResult {
    /// The last (best, under optimization) answer.
    pub fn best(&self) -> Option<&AnswerSet> {
        self.answers.last()
    }
}

/// Solving mode of one invocation.
#[derive(Clone, Debug)]
pub struct SolveConfig {
    /// Requested model count. `None` leaves the oracle's default, which
    /// under optimization means "search for the optimum"; `Some(0)` asks
    /// for every model.
    pub models: Option<usize>,
    /// Drop optimization statements (plain enumeration).
    pub ignore_optimization: bool,
    /// Project answers onto the shown atoms.
    pub project: bool,
    /// Restrict enumeration to subset-minimal answers via domain-heuristic
    /// preference search.
    pub subset_minimal: bool,
    /// Forwarded opaquely as the oracle's `--parallel-mode`.
    pub parallel: Option<String>,
}

impl Default for SolveConfig {
    fn default() -> SolveConfig {
        SolveConfig {
            models: None,
            ignore_optimization: false,
            project: false,
            subset_minimal: false,
            parallel: None,
        }
    }
}

/// Location of the oracle executable.
#[derive(Clone, Debug)]
pub struct ClingoRunner {
    pub command: String,
}

impl Default for ClingoRunner {
    fn default() -> ClingoRunner {
        ClingoRunner {
            command: "clingo".to_string(),
        }
    }
}

impl ClingoRunner {
    /// Solve `program` under `config`.
    ///
    /// The program is written to a temporary `.lp` file which is removed on
    /// every exit path.
    pub fn solve(&self, program: &str, config: &SolveConfig) -> Result<SolveResult, String> {
        let mut file = tempfile::Builder::new()
            .prefix("identify-")
            .suffix(".lp")
            .tempfile()
            .map_err(|e| format!("Cannot create temporary `.lp` file: {}", e))?;
        file.write_all(program.as_bytes())
            .map_err(|e| format!("Cannot write temporary `.lp` file: {}", e))?;

        let mut command = Command::new(&self.command);
        command.arg(file.path());
        command.arg("--opt-strategy=usc");
        if let Some(models) = config.models {
            command.arg(format!("--models={}", models));
        }
        if config.ignore_optimization {
            command.arg("--opt-mode=ignore");
        }
        if config.project {
            command.arg("--project");
        }
        if config.subset_minimal {
            command.args(["--enum-mode=domRec", "--heuristic=Domain", "--dom-mod=5,16"]);
        }
        if let Some(parallel) = &config.parallel {
            command.arg(format!("--parallel-mode={}", parallel));
        }

        let output = command
            .output()
            .map_err(|e| format!("Cannot run solver `{}`: {}", self.command, e))?;
        let status = output
            .status
            .code()
            .ok_or(format!("Solver `{}` was terminated by a signal.", self.command))?;
        // Exit codes follow the clasp convention; everything outside of the
        // three expected values means the solve itself failed.
        let exhausted = match status {
            10 => false,
            20 | 30 => true,
            _ => {
                return Err(format!(
                    "Solver `{}` failed (exit code {}): {}",
                    self.command,
                    status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let answers = parse_answers(&stdout)?;
        if status != 20 && answers.is_empty() {
            return Err(format!(
                "Solver `{}` reported satisfiable but printed no answer.",
                self.command
            ));
        }
        Ok(SolveResult { answers, exhausted })
    }
}

/// **(internal)** Parse the textual oracle output: every `Answer: N` line is
/// followed by one line of atoms; `Optimization:` lines attach to the answer
/// preceding them.
fn parse_answers(stdout: &str) -> Result<Vec<AnswerSet>, String> {
    let mut answers: Vec<AnswerSet> = Vec::new();
    let mut lines = stdout.lines();
    while let Some(line) = lines.next() {
        if line.starts_with("Answer:") {
            let atoms = lines
                .next()
                .ok_or("Truncated solver output: `Answer:` without atoms.".to_string())?;
            answers.push(AnswerSet {
                facts: Fact::parse_all(atoms)?,
                optimization: Vec::new(),
            });
        } else if let Some(rest) = line.strip_prefix("Optimization:") {
            let values = rest
                .split_whitespace()
                .map(|v| {
                    v.parse::<i64>()
                        .map_err(|_| format!("Invalid optimization value `{}`.", v))
                })
                .collect::<Result<Vec<i64>, String>>()?;
            if let Some(answer) = answers.last_mut() {
                answer.optimization = values;
            }
        }
    }
    Ok(answers)
}
