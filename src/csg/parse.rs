//! Tokenizer and recursive-descent parser for region expressions.
//!
//! Grammar:
//!
//! ```text
//! union        := intersection (':' intersection)*
//! intersection := factor+
//! factor       := reference | '(' union ')' | ('#' | '-') '(' union ')'
//! reference    := ['+' | '-'] digits [base]
//! base         := 'M' | 'N'
//! ```
//!
//! A reference without a base suffix is offset by `offsets[0]`, `M` selects
//! `offsets[1]` and `N` selects `offsets[2]`.

use crate::error::ExpressionError;

use super::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Ref(i32),
    Union,
    Open,
    ComplementOpen,
    Close,
}

/// Parses `input`, shifting every reference by the base its suffix selects.
pub(crate) fn parse_rule(input: &str, offsets: &[i32]) -> Result<Rule, ExpressionError> {
    let tokens = tokenize(input, offsets)?;
    if tokens.is_empty() {
        return Err(ExpressionError::EmptyExpression);
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        input,
    };
    let rule = parser.union()?;
    if parser.pos != tokens.len() {
        return Err(parser.error("unbalanced `)`"));
    }
    Ok(rule)
}

fn parse_error(input: &str, message: impl Into<String>) -> ExpressionError {
    ExpressionError::Parse {
        input: input.to_owned(),
        message: message.into(),
    }
}

fn tokenize(input: &str, offsets: &[i32]) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            ':' => {
                tokens.push(Token::Union);
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '#' | '-' if chars.get(i + 1) == Some(&'(') => {
                tokens.push(Token::ComplementOpen);
                i += 2;
            }
            '#' => return Err(parse_error(input, "`#` must be followed by `(`")),
            '+' | '-' | '0'..='9' => {
                let negative = c == '-';
                if !c.is_ascii_digit() {
                    i += 1;
                }
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if start == i {
                    return Err(parse_error(input, format!("sign `{c}` without a number")));
                }
                let digits: String = chars[start..i].iter().collect();
                let value: i32 = digits
                    .parse()
                    .map_err(|_| parse_error(input, format!("`{digits}` is not a valid handle")))?;

                let base = match chars.get(i) {
                    Some('M') => 1,
                    Some('N') => 2,
                    Some(s) if s.is_alphabetic() => {
                        return Err(parse_error(input, format!("unknown base suffix `{s}`")));
                    }
                    _ => 0,
                };
                if base > 0 {
                    i += 1;
                }
                let offset = offsets.get(base).copied().ok_or_else(|| {
                    parse_error(input, format!("base {base} requested but only {} given", offsets.len()))
                })?;

                let handle = value
                    .checked_add(offset)
                    .filter(|&h| h > 0)
                    .ok_or_else(|| parse_error(input, format!("`{digits}` offset by {offset} is not a valid handle")))?;
                tokens.push(Token::Ref(if negative { -handle } else { handle }));
            }
            other => {
                return Err(parse_error(input, format!("unexpected character `{other}`")));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    input: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn error(&self, message: &str) -> ExpressionError {
        parse_error(self.input, message)
    }

    fn union(&mut self) -> Result<Rule, ExpressionError> {
        let mut terms = vec![self.intersection()?];
        while self.peek() == Some(Token::Union) {
            self.pos += 1;
            terms.push(self.intersection()?);
        }
        Ok(Rule::union(terms))
    }

    fn intersection(&mut self) -> Result<Rule, ExpressionError> {
        let mut factors = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Ref(handle)) => {
                    self.pos += 1;
                    factors.push(Rule::Surface(handle));
                }
                Some(Token::Open) => {
                    self.pos += 1;
                    let inner = self.union()?;
                    self.close()?;
                    factors.push(inner);
                }
                Some(Token::ComplementOpen) => {
                    self.pos += 1;
                    let inner = self.union()?;
                    self.close()?;
                    factors.push(Rule::Complement(Box::new(inner)));
                }
                _ => break,
            }
        }
        if factors.is_empty() {
            return Err(self.error("expected a surface or a group"));
        }
        Ok(Rule::intersection(factors))
    }

    fn close(&mut self) -> Result<(), ExpressionError> {
        if self.peek() == Some(Token::Close) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error("missing `)`"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn s(h: i32) -> Rule {
        Rule::Surface(h)
    }

    #[test]
    fn intersection_binds_tighter_than_union() {
        let rule = parse_rule("1 -2 : 3", &[0]).unwrap();
        assert_eq!(
            rule,
            Rule::Union(vec![Rule::Intersection(vec![s(1), s(-2)]), s(3)])
        );
    }

    #[test]
    fn groups_and_complements() {
        let rule = parse_rule("4 (1 : -2) #(5 6) -(7)", &[0]).unwrap();
        assert_eq!(
            rule,
            Rule::Intersection(vec![
                s(4),
                Rule::Union(vec![s(1), s(-2)]),
                Rule::Complement(Box::new(Rule::Intersection(vec![s(5), s(6)]))),
                Rule::Complement(Box::new(s(7))),
            ])
        );
    }

    #[test]
    fn base_suffixes_select_offsets() {
        let rule = parse_rule(" -7 5M -6M 3N ", &[120, 100, 2000]).unwrap();
        assert_eq!(
            rule,
            Rule::Intersection(vec![s(-127), s(105), s(-106), s(2003)])
        );
    }

    #[test]
    fn missing_base_is_an_error() {
        assert!(matches!(
            parse_rule("5M", &[0]),
            Err(ExpressionError::Parse { .. })
        ));
    }

    #[test]
    fn malformed_inputs() {
        assert!(matches!(parse_rule("   ", &[0]), Err(ExpressionError::EmptyExpression)));
        for bad in ["(1 2", "1 2)", "1 : : 2", "#1", "1 x", "- 3", "0"] {
            assert!(
                matches!(parse_rule(bad, &[0]), Err(ExpressionError::Parse { .. })),
                "`{bad}` should not parse"
            );
        }
    }
}
