//! Parsers for the DQDIMACS formula format and the model/witness format.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use miette::Diagnostic;
use thiserror::Error;

use crate::formula::{CandidateModel, Clause, DqbfFormula, Lit, Var};

/// Fatal format errors.
///
/// These abort a certification run entirely; they are never part of a
/// certification verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ParseError {
    #[error("missing `p cnf` header line")]
    #[diagnostic(code(dqcert::parse::missing_header))]
    MissingHeader,

    #[error("expected exactly one `p cnf` header line, found {count}")]
    #[diagnostic(code(dqcert::parse::duplicate_header))]
    DuplicateHeader { count: usize },

    #[error("line {line_no}: malformed header `{line}`")]
    #[diagnostic(
        code(dqcert::parse::malformed_header),
        help("the header must read `p cnf <variables> <clauses>`")
    )]
    MalformedHeader { line_no: usize, line: String },

    #[error("line {line_no}: missing terminating `0` in `{line}`")]
    #[diagnostic(code(dqcert::parse::missing_terminator))]
    MissingTerminator { line_no: usize, line: String },

    #[error("line {line_no}: `{token}` is not a valid literal")]
    #[diagnostic(code(dqcert::parse::bad_literal))]
    BadLiteral { line_no: usize, token: String },

    #[error("line {line_no}: variable {var} out of range, the header declares {num_vars} variables")]
    #[diagnostic(code(dqcert::parse::var_out_of_range))]
    VarOutOfRange {
        line_no: usize,
        var: Var,
        num_vars: u32,
    },

    #[error("line {line_no}: dependency line `{line}` names no existential variable")]
    #[diagnostic(code(dqcert::parse::empty_dependency_line))]
    EmptyDependencyLine { line_no: usize, line: String },
}

/// Locate and decode the unique `p cnf <vars> <clauses>` header.
///
/// The clause count is validated as a number but deliberately not enforced
/// against the actual number of clause lines.
fn parse_header<'a, I>(lines: I) -> Result<u32, ParseError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let headers: Vec<(usize, &str)> = lines.filter(|(_, l)| l.starts_with('p')).collect();
    let (line_no, header) = match headers.as_slice() {
        [] => return Err(ParseError::MissingHeader),
        [single] => *single,
        many => {
            return Err(ParseError::DuplicateHeader { count: many.len() });
        }
    };
    let malformed = || ParseError::MalformedHeader {
        line_no,
        line: header.to_string(),
    };
    let tokens: Vec<&str> = header.split_whitespace().collect();
    match tokens.as_slice() {
        ["p", "cnf", vars, clauses] => {
            let num_vars: u32 = vars.parse().map_err(|_| malformed())?;
            let _hint: usize = clauses.parse().map_err(|_| malformed())?;
            Ok(num_vars)
        }
        _ => Err(malformed()),
    }
}

/// Split a directive or clause line into its literal tokens, checking the
/// terminating `0`.
fn literal_tokens<'a>(
    line_no: usize,
    line: &'a str,
    skip: usize,
) -> Result<Vec<&'a str>, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.last() != Some(&"0") {
        return Err(ParseError::MissingTerminator {
            line_no,
            line: line.to_string(),
        });
    }
    Ok(tokens[skip..tokens.len() - 1].to_vec())
}

fn parse_var(line_no: usize, token: &str, num_vars: u32) -> Result<Var, ParseError> {
    let var: Var = token.parse().map_err(|_| ParseError::BadLiteral {
        line_no,
        token: token.to_string(),
    })?;
    if var == 0 {
        return Err(ParseError::BadLiteral {
            line_no,
            token: token.to_string(),
        });
    }
    if var > num_vars {
        return Err(ParseError::VarOutOfRange {
            line_no,
            var,
            num_vars,
        });
    }
    Ok(var)
}

fn parse_lit(line_no: usize, token: &str, num_vars: u32) -> Result<Lit, ParseError> {
    let lit: Lit = token.parse().map_err(|_| ParseError::BadLiteral {
        line_no,
        token: token.to_string(),
    })?;
    if lit == 0 {
        return Err(ParseError::BadLiteral {
            line_no,
            token: token.to_string(),
        });
    }
    if lit.unsigned_abs() > num_vars {
        return Err(ParseError::VarOutOfRange {
            line_no,
            var: lit.unsigned_abs(),
            num_vars,
        });
    }
    Ok(lit)
}

/// Parse DQDIMACS text into a [`DqbfFormula`].
///
/// Comment lines (`c`) are ignored. `a`/`e` quantifier lines are processed in
/// file order: an `a` line extends the running universal block, an `e` line
/// assigns each named variable the universal set accumulated so far. All
/// explicit `d` dependency lines are applied afterwards, so a `d` line
/// overrides the implicit dependency set no matter where it appears in the
/// file; a `d` line for a variable never named on an `e` line still
/// introduces it as existential. Every remaining non-empty line is a clause.
pub fn parse_dqdimacs(input: &str) -> Result<DqbfFormula, ParseError> {
    let lines: Vec<(usize, &str)> = input
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.starts_with('c'))
        .collect();

    let num_vars = parse_header(lines.iter().copied())?;

    let mut universals: BTreeSet<Var> = BTreeSet::new();
    let mut dependencies: BTreeMap<Var, BTreeSet<Var>> = BTreeMap::new();

    // Quantifier prefix pass: `a` and `e` lines only.
    for &(line_no, line) in &lines {
        if !(line.starts_with('a') || line.starts_with('e')) {
            continue;
        }
        let tokens = literal_tokens(line_no, line, 1)?;
        if line.starts_with('a') {
            for token in tokens {
                universals.insert(parse_var(line_no, token, num_vars)?);
            }
        } else {
            for token in tokens {
                let e = parse_var(line_no, token, num_vars)?;
                dependencies.insert(e, universals.clone());
            }
        }
    }

    // Explicit dependency pass: `d` lines override the implicit sets.
    for &(line_no, line) in &lines {
        if !line.starts_with('d') {
            continue;
        }
        let tokens = literal_tokens(line_no, line, 1)?;
        let Some((head, rest)) = tokens.split_first() else {
            return Err(ParseError::EmptyDependencyLine {
                line_no,
                line: line.to_string(),
            });
        };
        let e = parse_var(line_no, head, num_vars)?;
        let mut deps = BTreeSet::new();
        for token in rest {
            deps.insert(parse_var(line_no, token, num_vars)?);
        }
        dependencies.insert(e, deps);
    }

    // Everything else is a clause line.
    let mut matrix: Vec<Clause> = Vec::new();
    for &(line_no, line) in &lines {
        if line.starts_with('p')
            || line.starts_with('a')
            || line.starts_with('e')
            || line.starts_with('d')
        {
            continue;
        }
        if line.split_whitespace().next().is_none() {
            continue;
        }
        let tokens = literal_tokens(line_no, line, 0)?;
        let mut clause = Clause::with_capacity(tokens.len());
        for token in tokens {
            clause.push(parse_lit(line_no, token, num_vars)?);
        }
        matrix.push(clause);
    }

    Ok(DqbfFormula {
        num_vars,
        universals,
        dependencies,
        matrix,
    })
}

const MODEL_MARKER: &str = "c Model for variable ";

/// Extract the variable id from a `c Model for variable <id>.` marker.
fn model_marker(line: &str) -> Option<Var> {
    let rest = &line[line.find(MODEL_MARKER)? + MODEL_MARKER.len()..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Parse a model/witness file into a [`CandidateModel`].
///
/// The file must carry exactly one `p cnf` header (its position is not
/// significant). A marker comment opens the clause block of a variable;
/// subsequent clause lines are attributed to the most recently opened block.
///
/// Legacy quirk, preserved deliberately: any line that is neither a header
/// nor a comment encountered while no block is open — including a blank
/// line — terminates parsing and returns whatever has been collected so far.
/// In particular a file without markers parses to an empty model.
pub fn parse_model(input: &str) -> Result<CandidateModel, ParseError> {
    let num_vars = parse_header(input.lines().enumerate().map(|(i, l)| (i + 1, l)))?;

    let mut per_variable: IndexMap<Var, Vec<Clause>> = IndexMap::new();
    let mut clauses: Vec<Clause> = Vec::new();
    let mut current: Option<Var> = None;

    for (line_no, line) in input.lines().enumerate().map(|(i, l)| (i + 1, l)) {
        if line.starts_with('p') {
            continue;
        }
        if line.starts_with('c') {
            if let Some(var) = model_marker(line) {
                per_variable.entry(var).or_default();
                current = Some(var);
            }
            continue;
        }
        let Some(var) = current else {
            return Ok(CandidateModel {
                per_variable,
                clauses,
            });
        };
        if line.split_whitespace().next().is_none() {
            continue;
        }
        let tokens = literal_tokens(line_no, line, 0)?;
        let mut clause = Clause::with_capacity(tokens.len());
        for token in tokens {
            clause.push(parse_lit(line_no, token, num_vars)?);
        }
        per_variable
            .entry(var)
            .or_default()
            .push(clause.clone());
        clauses.push(clause);
    }

    Ok(CandidateModel {
        per_variable,
        clauses,
    })
}
