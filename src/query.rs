//! Filter expression language
//!
//! Compiles a one-line filter expression into a [`FilterGroup`], for search
//! bars and API clients that would rather type than build a rule tree:
//!
//! - `status = 'Done'`
//! - `score > 30 AND owner = ME`
//! - ``(`Due Date` IS PAST_DUE OR priority = 'High') AND title CONTAINS 'launch'``
//! - `score BETWEEN 10 AND 20`
//! - `notes IS NOT EMPTY`
//! - `NOT tags CONTAINS 'archived'`
//!
//! Field references resolve against field ids first, then field names
//! (case-insensitive); names with spaces go in backticks. Values are quoted
//! strings, numbers, bare words, `ME`, `TRUE` or `FALSE`. `NOT` is pushed down
//! onto the comparisons beneath it and is only accepted where each of them
//! has an inverse operator.

use crate::error::ViewError;
use crate::field::{Field, FieldIndex};
use crate::filter::{FilterGroup, FilterOperator, FilterRule, LogicalOperator, CURRENT_USER_TOKEN};

/// Token types for lexing
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    /// Backtick-quoted field name
    QuotedIdent(String),
    Str(String),
    /// Numeric literal, kept as written
    Number(String),
    Bool(bool),
    Me,
    // Operators
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    Is,
    Empty,
    Contains,
    StartsWith,
    EndsWith,
    Between,
    Today,
    ThisWeek,
    ThisMonth,
    PastDue,
    Future,
    LParen,
    RParen,
    Eof,
}

/// Lexer for tokenizing expression strings
struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' || c == '-' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    fn read_number(&mut self) -> String {
        let mut num = String::new();
        if self.peek() == Some('-') {
            num.push('-');
            self.advance();
        }
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                num.push(c);
                self.advance();
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                num.push(c);
                self.advance();
            } else {
                break;
            }
        }
        num
    }

    fn read_delimited(&mut self, quote: char, start: usize) -> Result<String, ViewError> {
        self.advance(); // opening quote
        let mut s = String::new();
        while let Some(c) = self.advance() {
            if c == quote {
                return Ok(s);
            } else if c == '\\' {
                match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some(escaped) => s.push(escaped),
                    None => break,
                }
            } else {
                s.push(c);
            }
        }
        Err(ViewError::query(start, "unterminated quote"))
    }

    /// Next token and the character offset it starts at.
    fn next_token(&mut self) -> Result<(Token, usize), ViewError> {
        self.skip_whitespace();
        let start = self.pos;

        let Some(c) = self.peek() else {
            return Ok((Token::Eof, start));
        };

        let token = match c {
            '(' => {
                self.advance();
                Token::LParen
            }
            ')' => {
                self.advance();
                Token::RParen
            }
            '=' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                }
                Token::Eq
            }
            '!' => {
                self.advance();
                if self.advance() != Some('=') {
                    return Err(ViewError::query(start, "expected '=' after '!'"));
                }
                Token::Ne
            }
            '<' | '>' => {
                self.advance();
                let or_equal = self.peek() == Some('=');
                if or_equal {
                    self.advance();
                }
                match (c, or_equal) {
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::Le,
                    (_, false) => Token::Gt,
                    (_, true) => Token::Ge,
                }
            }
            '\'' | '"' => Token::Str(self.read_delimited(c, start)?),
            '`' => Token::QuotedIdent(self.read_delimited('`', start)?),
            '-' if self.input.get(self.pos + 1).map_or(false, |n| n.is_ascii_digit() || *n == '.') => {
                Token::Number(self.read_number())
            }
            // Unquoted dates such as 2024-06-01 read as bare words
            _ if c.is_ascii_digit() => {
                let word = self.read_word();
                if word.parse::<f64>().is_ok() {
                    Token::Number(word)
                } else {
                    Token::Ident(word)
                }
            }
            _ if c.is_alphabetic() || c == '_' => {
                let word = self.read_word();
                match word.to_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    "IS" => Token::Is,
                    "EMPTY" => Token::Empty,
                    "CONTAINS" => Token::Contains,
                    "STARTS_WITH" => Token::StartsWith,
                    "ENDS_WITH" => Token::EndsWith,
                    "BETWEEN" => Token::Between,
                    "TODAY" => Token::Today,
                    "THIS_WEEK" => Token::ThisWeek,
                    "THIS_MONTH" => Token::ThisMonth,
                    "PAST_DUE" => Token::PastDue,
                    "FUTURE" => Token::Future,
                    "ME" => Token::Me,
                    "TRUE" => Token::Bool(true),
                    "FALSE" => Token::Bool(false),
                    _ => Token::Ident(word),
                }
            }
            _ => return Err(ViewError::query(start, format!("unexpected character '{}'", c))),
        };
        Ok((token, start))
    }
}

/// Parsed expression before it is laid out as filter groups.
#[derive(Debug)]
enum Node {
    Rule(FilterRule),
    All(Vec<Node>),
    Any(Vec<Node>),
}

impl Node {
    /// Push a negation down to the comparisons (De Morgan).
    fn negate(self, position: usize) -> Result<Node, ViewError> {
        match self {
            Node::Rule(mut rule) => {
                rule.operator = rule.operator.negated().ok_or_else(|| {
                    ViewError::query(position, format!("NOT cannot be applied to {:?}", rule.operator))
                })?;
                Ok(Node::Rule(rule))
            }
            Node::All(nodes) => Ok(Node::Any(
                nodes.into_iter().map(|n| n.negate(position)).collect::<Result<_, _>>()?,
            )),
            Node::Any(nodes) => Ok(Node::All(
                nodes.into_iter().map(|n| n.negate(position)).collect::<Result<_, _>>()?,
            )),
        }
    }
}

/// Parser for building filter groups
struct Parser<'f> {
    lexer: Lexer,
    current: Token,
    position: usize,
    fields: FieldIndex<'f>,
    next_rule: usize,
    next_group: usize,
}

impl<'f> Parser<'f> {
    fn new(input: &str, fields: &'f [Field]) -> Result<Self, ViewError> {
        let mut lexer = Lexer::new(input);
        let (current, position) = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            position,
            fields: FieldIndex::new(fields),
            next_rule: 0,
            next_group: 0,
        })
    }

    fn advance(&mut self) -> Result<(), ViewError> {
        let (token, position) = self.lexer.next_token()?;
        self.current = token;
        self.position = position;
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ViewError {
        ViewError::query(self.position, message)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ViewError> {
        if self.current == expected {
            self.advance()
        } else {
            Err(self.error(format!("expected {:?}, got {:?}", expected, self.current)))
        }
    }

    /// Parse OR expressions (lowest precedence)
    fn parse_or(&mut self) -> Result<Node, ViewError> {
        let mut nodes = vec![self.parse_and()?];
        while self.current == Token::Or {
            self.advance()?;
            nodes.push(self.parse_and()?);
        }
        Ok(if nodes.len() == 1 { nodes.remove(0) } else { Node::Any(nodes) })
    }

    fn parse_and(&mut self) -> Result<Node, ViewError> {
        let mut nodes = vec![self.parse_not()?];
        while self.current == Token::And {
            self.advance()?;
            nodes.push(self.parse_not()?);
        }
        Ok(if nodes.len() == 1 { nodes.remove(0) } else { Node::All(nodes) })
    }

    fn parse_not(&mut self) -> Result<Node, ViewError> {
        if self.current == Token::Not {
            let position = self.position;
            self.advance()?;
            self.parse_not()?.negate(position)
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Node, ViewError> {
        if self.current == Token::LParen {
            self.advance()?;
            let node = self.parse_or()?;
            self.expect(Token::RParen)?;
            return Ok(node);
        }
        self.parse_comparison().map(Node::Rule)
    }

    fn parse_comparison(&mut self) -> Result<FilterRule, ViewError> {
        let field_id = self.parse_field()?;
        self.advance()?;

        let operator = match self.current.clone() {
            Token::Eq => FilterOperator::Equals,
            Token::Ne => FilterOperator::NotEquals,
            Token::Gt => FilterOperator::IsGreaterThan,
            Token::Lt => FilterOperator::IsLessThan,
            Token::Contains => FilterOperator::Contains,
            Token::StartsWith => FilterOperator::StartsWith,
            Token::EndsWith => FilterOperator::EndsWith,
            Token::Ge | Token::Le => {
                return Err(self.error("'>=' and '<=' are not supported, use BETWEEN"));
            }
            Token::Between => {
                self.advance()?;
                let low = self.parse_value()?;
                self.expect(Token::And)?;
                let high = self.parse_value()?;
                return Ok(FilterRule::between(self.rule_id(), field_id, low, high));
            }
            Token::Is => {
                self.advance()?;
                let negated = self.current == Token::Not;
                if negated {
                    self.advance()?;
                }
                let operator = match (&self.current, negated) {
                    (Token::Empty, false) => FilterOperator::IsEmpty,
                    (Token::Empty, true) => FilterOperator::IsNotEmpty,
                    (Token::Today, false) => FilterOperator::IsToday,
                    (Token::ThisWeek, false) => FilterOperator::IsThisWeek,
                    (Token::ThisMonth, false) => FilterOperator::IsThisMonth,
                    (Token::PastDue, false) => FilterOperator::IsPastDue,
                    (Token::Future, false) => FilterOperator::IsFuture,
                    _ => {
                        return Err(self.error(format!("unexpected {:?} after IS", self.current)));
                    }
                };
                self.advance()?;
                return Ok(FilterRule::new(self.rule_id(), field_id, operator, ""));
            }
            other => return Err(self.error(format!("expected comparison operator, got {:?}", other))),
        };
        self.advance()?;
        let value = self.parse_value()?;
        Ok(FilterRule::new(self.rule_id(), field_id, operator, value))
    }

    /// Resolve the current token as a field reference.
    fn parse_field(&self) -> Result<String, ViewError> {
        let name = match &self.current {
            Token::Ident(name) | Token::QuotedIdent(name) => name,
            other => return Err(self.error(format!("expected field, got {:?}", other))),
        };
        self.fields
            .get(name)
            .or_else(|| self.fields.find_by_name(name))
            .map(|field| field.id.clone())
            .ok_or_else(|| self.error(format!("unknown field '{}'", name)))
    }

    fn parse_value(&mut self) -> Result<String, ViewError> {
        let value = match &self.current {
            Token::Str(s) | Token::Number(s) | Token::Ident(s) => s.clone(),
            Token::Bool(b) => b.to_string(),
            Token::Me => CURRENT_USER_TOKEN.to_string(),
            other => return Err(self.error(format!("expected value, got {:?}", other))),
        };
        self.advance()?;
        Ok(value)
    }

    fn rule_id(&mut self) -> String {
        self.next_rule += 1;
        format!("r{}", self.next_rule)
    }

    fn group_id(&mut self) -> String {
        self.next_group += 1;
        format!("g{}", self.next_group)
    }

    /// Lay a parsed node out as a filter group; comparisons become rules and
    /// nested connectives become subgroups.
    fn into_group(&mut self, node: Node) -> FilterGroup {
        let (operator, members) = match node {
            Node::Rule(rule) => (LogicalOperator::And, vec![Node::Rule(rule)]),
            Node::All(nodes) => (LogicalOperator::And, nodes),
            Node::Any(nodes) => (LogicalOperator::Or, nodes),
        };
        let mut group = FilterGroup::new(self.group_id(), operator);
        for member in members {
            match member {
                Node::Rule(rule) => group.rules.push(rule),
                nested => {
                    let child = self.into_group(nested);
                    group.groups.push(child);
                }
            }
        }
        group
    }
}

/// Compile a filter expression. An empty or blank expression yields an empty
/// group, which passes every row.
pub fn parse_filter(input: &str, fields: &[Field]) -> Result<FilterGroup, ViewError> {
    if input.trim().is_empty() {
        return Ok(FilterGroup::and("g1"));
    }

    let mut parser = Parser::new(input, fields)?;
    let node = parser.parse_or()?;
    if parser.current != Token::Eof {
        return Err(parser.error(format!("unexpected {:?} after expression", parser.current)));
    }
    Ok(parser.into_group(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use crate::filter::{apply_filters, EvalContext};
    use crate::row::Row;
    use chrono::NaiveDate;

    fn fields() -> Vec<Field> {
        vec![
            Field::new("status", "Status", FieldType::Status),
            Field::new("score", "Score", FieldType::Number),
            Field::new("due", "Due Date", FieldType::Date),
            Field::new("owner", "Owner", FieldType::Person),
            Field::new("notes", "Notes", FieldType::Text),
        ]
    }

    fn parse(input: &str) -> FilterGroup {
        parse_filter(input, &fields()).unwrap()
    }

    #[test]
    fn test_simple_comparison() {
        let group = parse("status = 'Done'");
        assert_eq!(group.operator, LogicalOperator::And);
        assert_eq!(group.rules.len(), 1);
        let rule = &group.rules[0];
        assert_eq!(rule.field_id, "status");
        assert_eq!(rule.operator, FilterOperator::Equals);
        assert_eq!(rule.value, "Done");
    }

    #[test]
    fn test_operators() {
        assert_eq!(parse("score > 3").rules[0].operator, FilterOperator::IsGreaterThan);
        assert_eq!(parse("score < -1.5").rules[0].value, "-1.5");
        assert_eq!(parse("status != Done").rules[0].operator, FilterOperator::NotEquals);
        assert_eq!(parse("notes contains 'x'").rules[0].operator, FilterOperator::Contains);
        assert_eq!(parse("notes STARTS_WITH 'a'").rules[0].operator, FilterOperator::StartsWith);
        assert_eq!(parse("notes ENDS_WITH 'z'").rules[0].operator, FilterOperator::EndsWith);
        assert_eq!(parse("notes IS EMPTY").rules[0].operator, FilterOperator::IsEmpty);
        assert_eq!(parse("notes IS NOT EMPTY").rules[0].operator, FilterOperator::IsNotEmpty);
        assert_eq!(parse("due IS PAST_DUE").rules[0].operator, FilterOperator::IsPastDue);
        assert_eq!(parse("due is this_week").rules[0].operator, FilterOperator::IsThisWeek);
        assert_eq!(parse("owner = ME").rules[0].value, CURRENT_USER_TOKEN);
    }

    #[test]
    fn test_between() {
        let group = parse("score BETWEEN 10 AND 20 AND status = 'Done'");
        assert_eq!(group.rules.len(), 2);
        let between = &group.rules[0];
        assert_eq!(between.operator, FilterOperator::IsBetween);
        assert_eq!(between.value, "10");
        assert_eq!(between.value2.as_deref(), Some("20"));

        let dates = parse("due BETWEEN 2024-06-01 AND 2024-06-30");
        assert_eq!(dates.rules[0].value, "2024-06-01");
        assert_eq!(dates.rules[0].value2.as_deref(), Some("2024-06-30"));
    }

    #[test]
    fn test_precedence_and_nesting() {
        let group = parse("status = 'Done' OR score > 5 AND notes IS EMPTY");
        assert_eq!(group.operator, LogicalOperator::Or);
        assert_eq!(group.rules.len(), 1);
        assert_eq!(group.groups.len(), 1);
        assert_eq!(group.groups[0].operator, LogicalOperator::And);
        assert_eq!(group.groups[0].rules.len(), 2);

        let grouped = parse("(status = 'Done' OR score > 5) AND notes IS EMPTY");
        assert_eq!(grouped.operator, LogicalOperator::And);
        assert_eq!(grouped.groups[0].operator, LogicalOperator::Or);
        assert_eq!(grouped.rule_count(), 3);
    }

    #[test]
    fn test_field_names_resolve() {
        let group = parse("`Due Date` IS TODAY AND Score > 1");
        assert_eq!(group.rules[0].field_id, "due");
        assert_eq!(group.rules[1].field_id, "score");
        assert_eq!(parse("title CONTAINS 'x'").rules[0].field_id, "title");
    }

    #[test]
    fn test_not_pushes_down() {
        let group = parse("NOT status = 'Done'");
        assert_eq!(group.rules[0].operator, FilterOperator::NotEquals);

        let group = parse("NOT (status = 'Done' OR notes IS EMPTY)");
        assert_eq!(group.operator, LogicalOperator::And);
        let ops: Vec<FilterOperator> = group.rules.iter().map(|r| r.operator).collect();
        assert_eq!(ops, vec![FilterOperator::NotEquals, FilterOperator::IsNotEmpty]);

        assert!(parse_filter("NOT score > 3", &fields()).is_err());
    }

    #[test]
    fn test_ids_are_unique() {
        let group = parse("(status = 'a' OR status = 'b') AND (score > 1 OR score < -1)");
        let mut ids: Vec<String> = group.groups.iter().flat_map(|g| g.rules.iter().map(|r| r.id.clone())).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert_ne!(group.groups[0].id, group.groups[1].id);
        assert_ne!(group.id, group.groups[0].id);
    }

    #[test]
    fn test_errors_report_position() {
        match parse_filter("status = 'Done' AND bogus > 1", &fields()) {
            Err(ViewError::Query { position, message }) => {
                assert_eq!(position, 20);
                assert!(message.contains("bogus"));
            }
            other => panic!("expected query error, got {:?}", other),
        }
        assert!(parse_filter("status = 'Done", &fields()).is_err());
        assert!(parse_filter("score >= 3", &fields()).is_err());
        assert!(parse_filter("status = 'a' status", &fields()).is_err());
        assert!(parse_filter("(status = 'a'", &fields()).is_err());
        assert!(parse_filter("status ~ 'a'", &fields()).is_err());
        assert!(parse_filter("due IS NOT TODAY", &fields()).is_err());
    }

    #[test]
    fn test_blank_expression_is_empty_group() {
        assert!(parse("   ").is_empty());
    }

    #[test]
    fn test_compiled_filter_evaluates() {
        let rows = vec![
            Row::new("1", "").with("status", "Done").with("score", "9"),
            Row::new("2", "").with("status", "Todo").with("score", "50"),
            Row::new("3", "").with("status", "Todo").with("score", "1"),
        ];
        let group = parse("status = 'Done' OR score > 10");
        let ctx = EvalContext::on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let ids: Vec<&str> = apply_filters(&rows, &group, &fields(), &ctx)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
