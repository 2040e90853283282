use crate::{Clause, DnfFormula, Literal, Sign};
use std::fmt::{Display, Error, Formatter};

impl Literal {
    pub fn new(node: &str, sign: Sign) -> Literal {
        Literal {
            node: node.to_string(),
            sign,
        }
    }

    pub fn positive(node: &str) -> Literal {
        Literal::new(node, Sign::Positive)
    }

    pub fn negative(node: &str) -> Literal {
        Literal::new(node, Sign::Negative)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self.sign {
            Sign::Positive => write!(f, "{}", self.node),
            Sign::Negative => write!(f, "!{}", self.node),
        }
    }
}

impl Clause {
    /// Create a new `Clause`, normalizing the literals into a sorted,
    /// de-duplicated set.
    pub fn new(literals: Vec<Literal>) -> Clause {
        let mut literals = literals;
        literals.sort();
        literals.dedup();
        Clause { literals }
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// True if every literal of this clause also appears in `other`.
    pub fn is_subset_of(&self, other: &Clause) -> bool {
        self.literals.iter().all(|l| other.literals.contains(l))
    }

    /// Parse the `A+!B` textual form (whitespace between tokens is ignored).
    pub fn try_from_str(value: &str) -> Result<Clause, String> {
        let mut literals = Vec::new();
        for token in value.split('+') {
            let token = token.trim();
            if token.is_empty() {
                return Err(format!("Invalid clause `{}`: empty literal.", value));
            }
            if let Some(name) = token.strip_prefix('!') {
                literals.push(Literal::negative(name.trim()));
            } else {
                literals.push(Literal::positive(token));
            }
        }
        Ok(Clause::new(literals))
    }
}

impl Display for Clause {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        for (i, literal) in self.literals.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{}", literal)?;
        }
        Ok(())
    }
}

impl DnfFormula {
    pub fn new(clauses: Vec<Clause>) -> DnfFormula {
        DnfFormula { clauses }
    }

    /// The constant `false` formula.
    pub fn constant_false() -> DnfFormula {
        DnfFormula { clauses: Vec::new() }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_constant_false(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Total number of literals across the clauses (the cardinality
    /// contribution of this formula).
    pub fn size(&self) -> usize {
        self.clauses.iter().map(|c| c.len()).sum()
    }
}

impl Display for DnfFormula {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        if self.clauses.is_empty() {
            return write!(f, "FALSE");
        }
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Clause, DnfFormula, Literal, Sign};
    use pretty_assertions::assert_eq;

    #[test]
    fn clause_normalization() {
        let c1 = Clause::new(vec![Literal::negative("b"), Literal::positive("a")]);
        let c2 = Clause::new(vec![
            Literal::positive("a"),
            Literal::negative("b"),
            Literal::positive("a"),
        ]);
        assert_eq!(c1, c2);
        assert_eq!(2, c1.len());
        assert_eq!("a+!b", c1.to_string());
    }

    #[test]
    fn conflicting_literals_are_a_valid_clause() {
        // `a & !a` is unsatisfiable but not an error.
        let c = Clause::new(vec![Literal::positive("a"), Literal::negative("a")]);
        assert_eq!(2, c.len());
    }

    #[test]
    fn clause_round_trip() {
        let c = Clause::try_from_str("raf + !erk").unwrap();
        assert_eq!(c, Clause::try_from_str(&c.to_string()).unwrap());
        assert_eq!(
            c,
            Clause::new(vec![
                Literal::new("raf", Sign::Positive),
                Literal::new("erk", Sign::Negative),
            ])
        );
    }

    #[test]
    fn subset_check() {
        let small = Clause::try_from_str("a").unwrap();
        let big = Clause::try_from_str("a+!b").unwrap();
        assert!(small.is_subset_of(&big));
        assert!(!big.is_subset_of(&small));
    }

    #[test]
    fn empty_formula_is_false() {
        let f = DnfFormula::constant_false();
        assert!(f.is_constant_false());
        assert_eq!("FALSE", f.to_string());
        assert_eq!(0, f.size());
    }
}
