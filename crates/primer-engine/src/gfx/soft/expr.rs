//! Integer constant expressions, shared by `#if` and array sizes.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Term {
    Num(i64),
    Op(&'static str),
}

/// Longest spellings first so `<<` wins over `<`.
const OPERATORS: [&str; 22] = [
    "||", "&&", "==", "!=", "<=", ">=", "<<", ">>", "(", ")", "!", "~", "+", "-", "*", "/", "%",
    "<", ">", "&", "|", "^",
];

impl Term {
    /// Single-character operator, as the lexer hands out punctuation.
    pub(crate) fn op(c: char) -> Option<Self> {
        OPERATORS
            .iter()
            .copied()
            .find(|op| op.len() == 1 && op.starts_with(c))
            .map(Term::Op)
    }

    /// Operator at the start of `text`.
    pub(crate) fn leading_op(text: &str) -> Option<Self> {
        OPERATORS.iter().copied().find(|op| text.starts_with(*op)).map(Term::Op)
    }
}

/// Evaluates a complete expression. `None` if it is malformed or divides by zero.
pub(crate) fn evaluate(terms: &[Term]) -> Option<i64> {
    let mut eval = Eval { terms, pos: 0 };
    let value = eval.binary(1)?;
    (eval.pos == terms.len()).then_some(value)
}

fn precedence(op: &str) -> Option<u8> {
    Some(match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | ">" | "<=" | ">=" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    })
}

fn apply(op: &str, lhs: i64, rhs: i64) -> Option<i64> {
    let shift = || u32::try_from(rhs).ok();
    Some(match op {
        "||" => i64::from(lhs != 0 || rhs != 0),
        "&&" => i64::from(lhs != 0 && rhs != 0),
        "|" => lhs | rhs,
        "^" => lhs ^ rhs,
        "&" => lhs & rhs,
        "==" => i64::from(lhs == rhs),
        "!=" => i64::from(lhs != rhs),
        "<" => i64::from(lhs < rhs),
        ">" => i64::from(lhs > rhs),
        "<=" => i64::from(lhs <= rhs),
        ">=" => i64::from(lhs >= rhs),
        "<<" => lhs.checked_shl(shift()?)?,
        ">>" => lhs.checked_shr(shift()?)?,
        "+" => lhs.wrapping_add(rhs),
        "-" => lhs.wrapping_sub(rhs),
        "*" => lhs.wrapping_mul(rhs),
        "/" => lhs.checked_div(rhs)?,
        "%" => lhs.checked_rem(rhs)?,
        _ => return None,
    })
}

struct Eval<'t> {
    terms: &'t [Term],
    pos: usize,
}

impl Eval<'_> {
    fn next(&mut self) -> Option<Term> {
        let term = self.terms.get(self.pos).copied();
        self.pos += 1;
        term
    }

    // Precedence climbing; every binary operator is left-associative.
    fn binary(&mut self, min: u8) -> Option<i64> {
        let mut lhs = self.unary()?;
        while let Some(Term::Op(op)) = self.terms.get(self.pos).copied() {
            let Some(prec) = precedence(op).filter(|&p| p >= min) else {
                break;
            };
            self.pos += 1;
            let rhs = self.binary(prec + 1)?;
            lhs = apply(op, lhs, rhs)?;
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<i64> {
        match self.next()? {
            Term::Num(n) => Some(n),
            Term::Op("(") => {
                let value = self.binary(1)?;
                (self.next()? == Term::Op(")")).then_some(value)
            }
            Term::Op("!") => Some(i64::from(self.unary()? == 0)),
            Term::Op("~") => Some(!self.unary()?),
            Term::Op("-") => Some(self.unary()?.wrapping_neg()),
            Term::Op("+") => self.unary(),
            Term::Op(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(text: &str) -> Vec<Term> {
        let mut out = Vec::new();
        let mut rest = text.trim_start();
        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits > 0 {
                out.push(Term::Num(rest[..digits].parse().unwrap()));
                rest = &rest[digits..];
            } else {
                let op = Term::leading_op(rest).unwrap();
                let Term::Op(s) = op else { unreachable!() };
                out.push(op);
                rest = &rest[s.len()..];
            }
            rest = rest.trim_start();
        }
        out
    }

    #[test]
    fn arithmetic_follows_c_precedence() {
        assert_eq!(evaluate(&terms("1 + 2 * 3")), Some(7));
        assert_eq!(evaluate(&terms("(1 + 2) * 3")), Some(9));
        assert_eq!(evaluate(&terms("10 - 4 - 3")), Some(3));
        assert_eq!(evaluate(&terms("1 << 4 >> 2")), Some(4));
    }

    #[test]
    fn logic_and_comparison() {
        assert_eq!(evaluate(&terms("2 > 1 && !0")), Some(1));
        assert_eq!(evaluate(&terms("3 == 4 || 0")), Some(0));
        assert_eq!(evaluate(&terms("-1 < 0")), Some(1));
    }

    #[test]
    fn malformed_input() {
        assert_eq!(evaluate(&terms("")), None);
        assert_eq!(evaluate(&terms("1 +")), None);
        assert_eq!(evaluate(&terms("(1")), None);
        assert_eq!(evaluate(&terms("1 2")), None);
        assert_eq!(evaluate(&terms("4 / 0")), None);
    }

    #[test]
    fn single_character_lookup_skips_longer_spellings() {
        assert_eq!(Term::op('<'), Some(Term::Op("<")));
        assert_eq!(Term::op('@'), None);
        assert_eq!(Term::leading_op("<= 3"), Some(Term::Op("<=")));
    }
}
