// TalentScore - GPL-3.0-or-later
// This file is part of TalentScore.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// TalentScore is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// TalentScore is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with TalentScore.  If not, see <https://www.gnu.org/licenses/>.

//! Coding assessment grading.
//!
//! Candidate code is untrusted. This module never runs it: a [`Sandbox`]
//! implementation backed by an isolated execution service does, and the
//! grader only compares what comes back against the expected outputs.

pub mod ledger;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub use ledger::{ExamLedger, ExamRecord};

/// Name of the function every submission must define
pub const ENTRY_POINT: &str = "solve";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    #[error("Function '{0}' not found.")]
    MissingEntryPoint(String),
    #[error("Syntax/Runtime Error: {0}")]
    Compile(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
    #[error("Execution timed out")]
    Timeout,
}

/// Isolated executor for candidate code.
pub trait Sandbox {
    /// Load a submission and resolve its entry point.
    fn prepare(&self, code: &str) -> Result<Box<dyn Solution>, SandboxError>;
}

/// A loaded submission that can be called with test arguments
pub trait Solution {
    fn call(&self, args: &[Value]) -> Result<Value, SandboxError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub args: Vec<Value>,
    pub expected: Value,
}

impl TestCase {
    #[must_use]
    pub const fn new(args: Vec<Value>, expected: Value) -> Self {
        Self { args, expected }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub title: String,
    pub description: String,
    /// Starter code shown to the candidate
    pub template: String,
    pub test_cases: Vec<TestCase>,
}

/// The fixed three-question screening exam.
#[must_use]
pub fn default_questions() -> Vec<Question> {
    vec![
        Question {
            id: 1,
            title: "Sum of Two Numbers".to_string(),
            description: "Write a function `solve(a, b)` that returns the sum of a and b."
                .to_string(),
            template: "def solve(a, b):\n    return 0".to_string(),
            test_cases: vec![
                TestCase::new(vec![json!(1), json!(2)], json!(3)),
                TestCase::new(vec![json!(10), json!(-2)], json!(8)),
                TestCase::new(vec![json!(0), json!(0)], json!(0)),
            ],
        },
        Question {
            id: 2,
            title: "Return Square".to_string(),
            description: "Write a function `solve(n)` that returns the square of n.".to_string(),
            template: "def solve(n):\n    return 0".to_string(),
            test_cases: vec![
                TestCase::new(vec![json!(2)], json!(4)),
                TestCase::new(vec![json!(5)], json!(25)),
                TestCase::new(vec![json!(-3)], json!(9)),
            ],
        },
        Question {
            id: 3,
            title: "String Length".to_string(),
            description: "Write a function `solve(s)` that returns the length of string s."
                .to_string(),
            template: "def solve(s):\n    return 0".to_string(),
            test_cases: vec![
                TestCase::new(vec![json!("hello")], json!(5)),
                TestCase::new(vec![json!("")], json!(0)),
                TestCase::new(vec![json!("a")], json!(1)),
            ],
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: u32,
    pub passed: usize,
    pub total: usize,
    /// Share of passed test cases, 0-100
    pub percent: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub questions: Vec<QuestionResult>,
    /// Average of the question percentages, rounded to two decimals
    pub exam_score: f64,
}

/// Grade one answer. A case passes only when the call succeeds and returns
/// exactly the expected value; failing cases just do not count.
#[must_use]
pub fn grade_question(sandbox: &dyn Sandbox, question: &Question, code: &str) -> QuestionResult {
    let total = question.test_cases.len();
    let solution = match sandbox.prepare(code) {
        Ok(solution) => solution,
        Err(e) => {
            tracing::debug!("Question {} failed to load: {e}", question.id);
            return QuestionResult {
                question_id: question.id,
                passed: 0,
                total,
                percent: 0.0,
                message: e.to_string(),
            };
        }
    };

    let passed = question
        .test_cases
        .iter()
        .filter(|case| matches!(solution.call(&case.args), Ok(ref v) if *v == case.expected))
        .count();

    let percent = if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    };

    QuestionResult {
        question_id: question.id,
        passed,
        total,
        percent,
        message: format!("Passed {passed}/{total} test cases."),
    }
}

/// Grade a full submission. `answers` pairs with `questions` by position;
/// a missing answer grades as the empty program.
#[must_use]
pub fn grade_submission(
    sandbox: &dyn Sandbox,
    questions: &[Question],
    answers: &[String],
) -> SubmissionResult {
    let results: Vec<QuestionResult> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| grade_question(sandbox, q, answers.get(i).map_or("", String::as_str)))
        .collect();

    let exam_score = if results.is_empty() {
        0.0
    } else {
        let mean = results.iter().map(|r| r.percent).sum::<f64>() / results.len() as f64;
        (mean * 100.0).round() / 100.0
    };

    SubmissionResult {
        questions: results,
        exam_score,
    }
}
