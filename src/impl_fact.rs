use crate::{Fact, Sign};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::{Display, Error, Formatter};

lazy_static! {
    /// Matches one `predicate(arg,...)` term.
    static ref FACT_REGEX: Regex = Regex::new(r"(\w+)\(([^)]*)\)").unwrap();
}

/// **(internal)** One parsed argument of a fact: either an integer or a
/// quoted symbol.
enum Arg {
    Int(i64),
    Sym(String),
}

impl Arg {
    fn parse(token: &str) -> Result<Arg, String> {
        let token = token.trim();
        if let Some(stripped) = token.strip_prefix('"') {
            let name = stripped
                .strip_suffix('"')
                .ok_or(format!("Unterminated quoted symbol `{}`.", token))?;
            return Ok(Arg::Sym(name.to_string()));
        }
        if let Ok(value) = token.parse::<i64>() {
            return Ok(Arg::Int(value));
        }
        // Unquoted symbols appear when the oracle echoes constant terms.
        Ok(Arg::Sym(token.to_string()))
    }

    fn int(&self) -> Result<i64, String> {
        match self {
            Arg::Int(value) => Ok(*value),
            Arg::Sym(name) => Err(format!("Expected integer, found symbol `{}`.", name)),
        }
    }

    fn index(&self) -> Result<usize, String> {
        let value = self.int()?;
        usize::try_from(value).map_err(|_| format!("Expected index, found `{}`.", value))
    }

    /// A small non-negative integer: a time point, a scaled observation
    /// value or a discretization factor.
    fn uint(&self) -> Result<u32, String> {
        let value = self.int()?;
        u32::try_from(value)
            .map_err(|_| format!("Expected non-negative integer, found `{}`.", value))
    }

    fn sym(&self) -> Result<String, String> {
        match self {
            Arg::Int(value) => Err(format!("Expected symbol, found integer `{}`.", value)),
            Arg::Sym(name) => Ok(name.clone()),
        }
    }

    fn sign(&self) -> Result<Sign, String> {
        Sign::try_from_i32(self.int()? as i32)
    }
}

impl Fact {
    /// Parse one `predicate(args)` term.
    ///
    /// Unknown predicate tags are a fatal error: the fact language is a
    /// closed set.
    pub fn try_from_term(predicate: &str, args: &str) -> Result<Fact, String> {
        let args = if args.trim().is_empty() {
            Vec::new()
        } else {
            args.split(',')
                .map(Arg::parse)
                .collect::<Result<Vec<_>, _>>()?
        };
        let expect = |n: usize| -> Result<(), String> {
            if args.len() == n {
                Ok(())
            } else {
                Err(format!(
                    "Predicate `{}` expects {} argument(s), found {}.",
                    predicate,
                    n,
                    args.len()
                ))
            }
        };
        match predicate {
            "node" => {
                expect(2)?;
                Ok(Fact::Node(args[0].sym()?, args[1].index()?))
            }
            "edge" => {
                expect(3)?;
                Ok(Fact::Edge(args[0].index()?, args[1].sym()?, args[2].sign()?))
            }
            "hyper" => {
                expect(3)?;
                Ok(Fact::Hyper(
                    args[0].index()?,
                    args[1].index()?,
                    args[2].index()?,
                ))
            }
            "formula" => {
                expect(2)?;
                Ok(Fact::Formula(args[0].sym()?, args[1].index()?))
            }
            "dnf" => {
                expect(2)?;
                Ok(Fact::Dnf(args[0].index()?, args[1].index()?))
            }
            "clause" => {
                expect(3)?;
                Ok(Fact::Clause(
                    args[0].index()?,
                    args[1].sym()?,
                    args[2].sign()?,
                ))
            }
            "exp" => {
                expect(1)?;
                Ok(Fact::Exp(args[0].index()?))
            }
            "clamped" => {
                expect(3)?;
                Ok(Fact::Clamped(
                    args[0].index()?,
                    args[1].sym()?,
                    args[2].sign()?,
                ))
            }
            "obs" => {
                expect(4)?;
                Ok(Fact::Obs(
                    args[0].index()?,
                    args[1].uint()?,
                    args[2].sym()?,
                    args[3].uint()?,
                ))
            }
            "dfactor" => {
                expect(1)?;
                Ok(Fact::Dfactor(args[0].uint()?))
            }
            "model" => {
                expect(1)?;
                Ok(Fact::Model(args[0].index()?))
            }
            "stimulus" => {
                expect(1)?;
                Ok(Fact::Stimulus(args[0].sym()?))
            }
            "inhibitor" => {
                expect(1)?;
                Ok(Fact::Inhibitor(args[0].sym()?))
            }
            "readout" => {
                expect(1)?;
                Ok(Fact::Readout(args[0].sym()?))
            }
            "control" => {
                expect(1)?;
                Ok(Fact::Control(args[0].sym()?))
            }
            "measured" => {
                expect(4)?;
                Ok(Fact::Measured(
                    args[0].index()?,
                    args[1].uint()?,
                    args[2].sym()?,
                    args[3].uint()?,
                ))
            }
            "guessed" => {
                expect(4)?;
                Ok(Fact::Guessed(
                    args[0].index()?,
                    args[1].uint()?,
                    args[2].sym()?,
                    args[3].uint()?,
                ))
            }
            "toGuess" => {
                expect(3)?;
                Ok(Fact::ToGuess(
                    args[0].index()?,
                    args[1].uint()?,
                    args[2].sym()?,
                ))
            }
            _ => Err(format!("Unknown predicate `{}`.", predicate)),
        }
    }

    /// Parse every `predicate(args)` term found in `text`.
    ///
    /// This accepts both the `.lp` fact file layout (terms terminated with
    /// `.`) and the one-answer-per-line layout of the oracle output.
    pub fn parse_all(text: &str) -> Result<Vec<Fact>, String> {
        let mut facts = Vec::new();
        for capture in FACT_REGEX.captures_iter(text) {
            facts.push(Fact::try_from_term(&capture[1], &capture[2])?);
        }
        Ok(facts)
    }

    /// The predicate tag of this fact.
    pub fn predicate(&self) -> &'static str {
        match self {
            Fact::Node(..) => "node",
            Fact::Edge(..) => "edge",
            Fact::Hyper(..) => "hyper",
            Fact::Formula(..) => "formula",
            Fact::Dnf(..) => "dnf",
            Fact::Clause(..) => "clause",
            Fact::Exp(..) => "exp",
            Fact::Clamped(..) => "clamped",
            Fact::Obs(..) => "obs",
            Fact::Dfactor(..) => "dfactor",
            Fact::Model(..) => "model",
            Fact::Stimulus(..) => "stimulus",
            Fact::Inhibitor(..) => "inhibitor",
            Fact::Readout(..) => "readout",
            Fact::Control(..) => "control",
            Fact::Measured(..) => "measured",
            Fact::Guessed(..) => "guessed",
            Fact::ToGuess(..) => "toGuess",
        }
    }
}

impl Display for Fact {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            Fact::Node(name, id) => write!(f, "node(\"{}\",{})", name, id),
            Fact::Edge(hyperedge, node, sign) => {
                write!(f, "edge({},\"{}\",{})", hyperedge, node, sign.to_i32())
            }
            Fact::Hyper(formula, hyperedge, size) => {
                write!(f, "hyper({},{},{})", formula, hyperedge, size)
            }
            Fact::Formula(name, id) => write!(f, "formula(\"{}\",{})", name, id),
            Fact::Dnf(formula, hyperedge) => write!(f, "dnf({},{})", formula, hyperedge),
            Fact::Clause(hyperedge, node, sign) => {
                write!(f, "clause({},\"{}\",{})", hyperedge, node, sign.to_i32())
            }
            Fact::Exp(id) => write!(f, "exp({})", id),
            Fact::Clamped(exp, node, sign) => {
                write!(f, "clamped({},\"{}\",{})", exp, node, sign.to_i32())
            }
            Fact::Obs(exp, time, node, value) => {
                write!(f, "obs({},{},\"{}\",{})", exp, time, node, value)
            }
            Fact::Dfactor(factor) => write!(f, "dfactor({})", factor),
            Fact::Model(id) => write!(f, "model({})", id),
            Fact::Stimulus(node) => write!(f, "stimulus(\"{}\")", node),
            Fact::Inhibitor(node) => write!(f, "inhibitor(\"{}\")", node),
            Fact::Readout(node) => write!(f, "readout(\"{}\")", node),
            Fact::Control(node) => write!(f, "control(\"{}\")", node),
            Fact::Measured(exp, time, node, value) => {
                write!(f, "measured({},{},\"{}\",{})", exp, time, node, value)
            }
            Fact::Guessed(exp, time, node, value) => {
                write!(f, "guessed({},{},\"{}\",{})", exp, time, node, value)
            }
            Fact::ToGuess(exp, time, node) => {
                write!(f, "toGuess({},{},\"{}\")", exp, time, node)
            }
        }
    }
}

/// Render a list of facts as a logic program (one `fact.` per line).
pub fn facts_to_lp(facts: &[Fact]) -> String {
    let mut out = String::new();
    for fact in facts {
        out.push_str(&fact.to_string());
        out.push_str(".\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::facts_to_lp;
    use crate::{Fact, Sign};
    use pretty_assertions::assert_eq;

    #[test]
    fn fact_round_trip() {
        let facts = vec![
            Fact::Node("raf".to_string(), 0),
            Fact::Edge(3, "erk".to_string(), Sign::Negative),
            Fact::Hyper(0, 3, 2),
            Fact::Formula("raf".to_string(), 0),
            Fact::Dnf(0, 3),
            Fact::Clause(3, "erk".to_string(), Sign::Negative),
            Fact::Exp(1),
            Fact::Clamped(1, "tnfa".to_string(), Sign::Positive),
            Fact::Obs(1, 10, "erk".to_string(), 73),
            Fact::Dfactor(100),
            Fact::Model(4),
            Fact::Stimulus("tnfa".to_string()),
            Fact::Measured(1, 10, "erk".to_string(), 1),
            Fact::Guessed(1, 10, "erk".to_string(), 0),
            Fact::ToGuess(1, 10, "erk".to_string()),
        ];
        let lp = facts_to_lp(&facts);
        assert_eq!(facts, Fact::parse_all(&lp).unwrap());
    }

    #[test]
    fn answer_line_parsing() {
        let line = "formula(\"b\",1) dnf(1,0) clause(0,\"a\",1) guessed(0,10,\"b\",1)";
        let facts = Fact::parse_all(line).unwrap();
        assert_eq!(4, facts.len());
        assert_eq!("formula", facts[0].predicate());
    }

    #[test]
    fn unknown_predicate_is_fatal() {
        assert!(Fact::parse_all("mystery(1,2).").is_err());
    }

    #[test]
    fn malformed_sign_is_fatal() {
        assert!(Fact::parse_all("clamped(0,\"a\",2).").is_err());
    }

    #[test]
    fn negative_value_is_fatal() {
        assert!(Fact::parse_all("obs(0,10,\"b\",-5).").is_err());
        assert!(Fact::parse_all("dfactor(-100).").is_err());
    }
}
