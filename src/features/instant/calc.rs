//! Recursive-descent arithmetic evaluator.
//!
//! Grammar, in precedence order:
//!   expr    := term (('+' | '-') term)*
//!   term    := power (('*' | '/' | '%') power)*
//!   power   := unary ('^' power)?          // right-associative
//!   unary   := ('+' | '-')? primary
//!   primary := number | constant | func '(' args ')' | '(' expr ')'

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalcError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("unknown identifier '{0}'")]
    UnknownIdent(String),
    #[error("function '{0}' takes {1} argument(s)")]
    WrongArgCount(String, usize),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
}

fn lex(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| CalcError::UnexpectedToken)?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                tokens.push(Token::Ident(
                    chars[start..i].iter().collect::<String>().to_lowercase(),
                ));
            }
            other => return Err(CalcError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, token: Token) -> Result<(), CalcError> {
        match self.next() {
            Some(t) if t == token => Ok(()),
            Some(_) => Err(CalcError::UnexpectedToken),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.power()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.power()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.power()?;
                    if rhs == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value /= rhs;
                }
                Some(Token::Percent) => {
                    self.pos += 1;
                    let rhs = self.power()?;
                    if rhs == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value %= rhs;
                }
                _ => return Ok(value),
            }
        }
    }

    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.unary()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.pos += 1;
            let exponent = self.power()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.primary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.primary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, CalcError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => self.ident(name),
            Some(_) => Err(CalcError::UnexpectedToken),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn ident(&mut self, name: String) -> Result<f64, CalcError> {
        match name.as_str() {
            "pi" => return Ok(std::f64::consts::PI),
            "e" => return Ok(std::f64::consts::E),
            _ => {}
        }

        if !FUNCTIONS.contains(&name.as_str()) {
            return Err(CalcError::UnknownIdent(name));
        }

        self.expect(Token::LParen)?;
        let mut args = vec![self.expr()?];
        while matches!(self.peek(), Some(Token::Comma)) {
            self.pos += 1;
            args.push(self.expr()?);
        }
        self.expect(Token::RParen)?;
        apply_function(&name, &args)
    }
}

pub const FUNCTIONS: &[&str] = &[
    "sqrt", "sin", "cos", "tan", "log", "ln", "abs", "ceil", "floor", "round", "pow", "min", "max",
];

fn apply_function(name: &str, args: &[f64]) -> Result<f64, CalcError> {
    let unary = |expected: usize| -> Result<f64, CalcError> {
        if args.len() != expected {
            return Err(CalcError::WrongArgCount(name.to_string(), expected));
        }
        Ok(args[0])
    };

    match name {
        "sqrt" => Ok(unary(1)?.sqrt()),
        "sin" => Ok(unary(1)?.sin()),
        "cos" => Ok(unary(1)?.cos()),
        "tan" => Ok(unary(1)?.tan()),
        "log" => Ok(unary(1)?.log10()),
        "ln" => Ok(unary(1)?.ln()),
        "abs" => Ok(unary(1)?.abs()),
        "ceil" => Ok(unary(1)?.ceil()),
        "floor" => Ok(unary(1)?.floor()),
        "round" => Ok(unary(1)?.round()),
        "pow" => {
            if args.len() != 2 {
                return Err(CalcError::WrongArgCount("pow".to_string(), 2));
            }
            Ok(args[0].powf(args[1]))
        }
        "min" => {
            if args.is_empty() {
                return Err(CalcError::WrongArgCount("min".to_string(), 2));
            }
            Ok(args.iter().cloned().fold(f64::INFINITY, f64::min))
        }
        "max" => {
            if args.is_empty() {
                return Err(CalcError::WrongArgCount("max".to_string(), 2));
            }
            Ok(args.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
        }
        _ => Err(CalcError::UnknownIdent(name.to_string())),
    }
}

/// Cheap pre-filter: `digit op digit` near the start, or a known function
/// call. Anything else is left to the other widgets.
pub fn is_candidate(query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return false;
    }

    for f in FUNCTIONS {
        if let Some(rest) = q.strip_prefix(f) {
            if rest.trim_start().starts_with('(') {
                return true;
            }
        }
    }

    let re = regex::Regex::new(
        r"^\(*\s*-?\d+(?:\.\d+)?\s*[-+*/%^]\s*\(*\s*-?\s*[\d.(]",
    );
    re.map(|re| re.is_match(&q)).unwrap_or(false)
}

pub fn evaluate(input: &str) -> Result<f64, CalcError> {
    let tokens = lex(input.trim())?;
    if tokens.is_empty() {
        return Err(CalcError::UnexpectedEnd);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(CalcError::UnexpectedToken);
    }
    if !value.is_finite() {
        return Err(CalcError::NonFinite);
    }
    Ok(value)
}

/// Grouped decimal for everyday magnitudes, scientific for the extremes.
pub fn format_number(x: f64) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    let magnitude = x.abs();
    if magnitude >= 1e15 || magnitude < 1e-6 {
        return format!("{:e}", x);
    }

    let formatted = format!("{:.10}", x);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (trimmed, None),
    };

    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(d) => ("-", d),
        None => ("", int_part),
    };
    let mut grouped = String::new();
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(evaluate("2+3*4").unwrap(), 14.0);
        assert_eq!(evaluate("2^3^2").unwrap(), 512.0);
        assert_eq!(evaluate("10-4-3").unwrap(), 3.0);
        assert_eq!(evaluate("(2+3)*4").unwrap(), 20.0);
        assert_eq!(evaluate("-3^2").unwrap(), 9.0);
        assert_eq!(evaluate("100/10/2").unwrap(), 5.0);
    }

    #[test]
    fn functions_and_constants() {
        assert_eq!(evaluate("sqrt(16)").unwrap(), 4.0);
        assert!((evaluate("sin(0)").unwrap()).abs() < 1e-12);
        assert_eq!(evaluate("log(1000)").unwrap(), 3.0);
        assert_eq!(evaluate("pow(2,10)").unwrap(), 1024.0);
        assert_eq!(evaluate("min(3,1,2)").unwrap(), 1.0);
        assert_eq!(evaluate("max(3,1,2)").unwrap(), 3.0);
        assert!((evaluate("pi").unwrap() - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(evaluate("abs(-5)+ceil(0.2)").unwrap(), 6.0);
    }

    #[test]
    fn division_by_zero_is_rejected() {
        assert_eq!(evaluate("1/0").unwrap_err(), CalcError::DivisionByZero);
        assert_eq!(evaluate("5%0").unwrap_err(), CalcError::DivisionByZero);
    }

    #[test]
    fn malformed_expressions_fail_cleanly() {
        assert!(evaluate("2+").is_err());
        assert!(evaluate("(2+3").is_err());
        assert!(evaluate("2 banana 3").is_err());
        assert!(evaluate("pow(2)").is_err());
        assert!(evaluate("").is_err());
    }

    #[test]
    fn candidate_filter_accepts_math_only() {
        assert!(is_candidate("2+2"));
        assert!(is_candidate("3.5 * (2 - 1)"));
        assert!(is_candidate("sqrt(2)"));
        assert!(is_candidate("(2+3)*4") || is_candidate("2+3"));
        assert!(!is_candidate("10 km to mi"));
        assert!(!is_candidate("2-in-1 laptop"));
        assert!(!is_candidate("weather in Paris"));
        assert!(!is_candidate("covid-19"));
    }

    #[test]
    fn formatting_groups_and_goes_scientific() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(1234567.0), "1,234,567");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-1234.25), "-1,234.25");
        assert!(format_number(1e16).contains('e'));
        assert!(format_number(1e-7).contains('e'));
        // Float noise is rounded away.
        assert_eq!(format_number(0.1 + 0.2), "0.3");
    }
}
