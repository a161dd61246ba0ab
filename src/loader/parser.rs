//! Line parser for the textual IR.

use crate::ir::{BinaryOperator, UnaryOperator};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, hex_digit1, space0},
    combinator::{all_consuming, map, map_res, not, opt, recognize, verify},
    error::ErrorKind,
    multi::{many0, separated_list, separated_nonempty_list},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    Err, IResult,
};
use std::str::FromStr;

const KEYWORDS: &[&str] = &[
    "block", "branch", "call", "function", "if", "phi", "Phi", "return",
];

type Operators = &'static [(&'static str, BinaryOperator)];

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    Register(String),
    Deref(Box<Node>),
    Constant(u64),
    Unary(UnaryOperator, Box<Node>),
    Binary(BinaryOperator, Box<Node>, Box<Node>),
    Phi(Vec<Node>),
    Call(Box<Node>, Vec<Node>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StatementNode {
    Assign(Node, Node),
    Branch {
        target: Node,
        condition: Option<Node>,
    },
    Return(Option<Node>),
    Expression(Node),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Line {
    Empty,
    Function {
        address: u64,
        name: Option<String>,
    },
    Block {
        address: u64,
        successors: Vec<u64>,
    },
    Statement {
        address: u64,
        expressions: Vec<StatementNode>,
    },
}

fn ws<'a, O, F>(inner: F) -> impl Fn(&'a str) -> IResult<&'a str, O>
where
    F: Fn(&'a str) -> IResult<&'a str, O>,
{
    delimited(space0, inner, space0)
}

fn keyword<'a>(word: &'static str) -> impl Fn(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(alt((alphanumeric1, tag("_")))))
}

fn hexadecimal(input: &str) -> IResult<&str, u64> {
    map_res(
        preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
        |digits: &str| u64::from_str_radix(digits, 16),
    )(input)
}

fn decimal(input: &str) -> IResult<&str, u64> {
    map_res(digit1, FromStr::from_str)(input)
}

fn number(input: &str) -> IResult<&str, u64> {
    alt((hexadecimal, decimal))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    verify(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        |name: &str| !KEYWORDS.contains(&name),
    )(input)
}

fn constant(input: &str) -> IResult<&str, Node> {
    map(number, Node::Constant)(input)
}

fn register(input: &str) -> IResult<&str, Node> {
    map(identifier, |name| Node::Register(name.to_owned()))(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<Node>> {
    delimited(
        ws(char('(')),
        separated_list(ws(char(',')), expression),
        ws(char(')')),
    )(input)
}

fn call(input: &str) -> IResult<&str, Node> {
    map(
        preceded(
            ws(keyword("call")),
            pair(ws(alt((constant, register))), arguments),
        ),
        |(target, arguments)| Node::Call(Box::new(target), arguments),
    )(input)
}

fn phi(input: &str) -> IResult<&str, Node> {
    map(
        preceded(alt((keyword("phi"), keyword("Phi"))), arguments),
        Node::Phi,
    )(input)
}

fn parenthesized(input: &str) -> IResult<&str, Node> {
    delimited(ws(char('(')), expression, ws(char(')')))(input)
}

fn primary(input: &str) -> IResult<&str, Node> {
    ws(alt((call, phi, constant, register, parenthesized)))(input)
}

fn unary(input: &str) -> IResult<&str, Node> {
    ws(alt((
        map(preceded(char('-'), unary), |operand| {
            Node::Unary(UnaryOperator::Neg, Box::new(operand))
        }),
        map(preceded(char('~'), unary), |operand| {
            Node::Unary(UnaryOperator::Not, Box::new(operand))
        }),
        map(preceded(char('*'), parenthesized), |address| {
            Node::Deref(Box::new(address))
        }),
        primary,
    )))(input)
}

fn binary_operator<'a>(
    operators: Operators,
) -> impl Fn(&'a str) -> IResult<&'a str, BinaryOperator> {
    move |input: &'a str| {
        for (symbol, operator) in operators {
            let result: IResult<&'a str, &'a str> = ws(tag(*symbol))(input);
            if let Ok((rest, _)) = result {
                return Ok((rest, *operator));
            }
        }
        Err(Err::Error((input, ErrorKind::Tag)))
    }
}

/// Left-associative chain of `operand`s joined by one of `operators`.
fn binary_level<'a, F>(
    operand: F,
    operators: Operators,
) -> impl Fn(&'a str) -> IResult<&'a str, Node>
where
    F: Fn(&'a str) -> IResult<&'a str, Node> + Copy,
{
    move |input: &'a str| {
        let (input, first) = operand(input)?;
        let (input, rest) = many0(pair(binary_operator(operators), operand))(input)?;
        let node = rest.into_iter().fold(first, |lhs, (operator, rhs)| {
            Node::Binary(operator, Box::new(lhs), Box::new(rhs))
        });
        Ok((input, node))
    }
}

fn multiplicative(input: &str) -> IResult<&str, Node> {
    binary_level(unary, &[("*", BinaryOperator::Mul)])(input)
}

fn additive(input: &str) -> IResult<&str, Node> {
    binary_level(
        multiplicative,
        &[("+", BinaryOperator::Add), ("-", BinaryOperator::Sub)],
    )(input)
}

fn shift(input: &str) -> IResult<&str, Node> {
    binary_level(
        additive,
        &[("<<", BinaryOperator::Shl), (">>", BinaryOperator::Shr)],
    )(input)
}

fn bitwise_and(input: &str) -> IResult<&str, Node> {
    binary_level(shift, &[("&", BinaryOperator::And)])(input)
}

fn bitwise_xor(input: &str) -> IResult<&str, Node> {
    binary_level(bitwise_and, &[("^", BinaryOperator::Xor)])(input)
}

pub fn expression(input: &str) -> IResult<&str, Node> {
    binary_level(bitwise_xor, &[("|", BinaryOperator::Or)])(input)
}

fn return_statement(input: &str) -> IResult<&str, StatementNode> {
    map(
        preceded(ws(keyword("return")), opt(expression)),
        StatementNode::Return,
    )(input)
}

fn branch_statement(input: &str) -> IResult<&str, StatementNode> {
    map(
        tuple((
            ws(keyword("branch")),
            expression,
            opt(preceded(ws(keyword("if")), expression)),
        )),
        |(_, target, condition)| StatementNode::Branch { target, condition },
    )(input)
}

fn assignment(input: &str) -> IResult<&str, StatementNode> {
    map(
        separated_pair(expression, ws(char('=')), expression),
        |(lhs, rhs)| StatementNode::Assign(lhs, rhs),
    )(input)
}

fn statement(input: &str) -> IResult<&str, StatementNode> {
    alt((
        return_statement,
        branch_statement,
        assignment,
        map(expression, StatementNode::Expression),
    ))(input)
}

fn function_line(input: &str) -> IResult<&str, Line> {
    map(
        tuple((ws(keyword("function")), ws(number), opt(ws(identifier)))),
        |(_, address, name)| Line::Function {
            address,
            name: name.map(str::to_owned),
        },
    )(input)
}

fn block_line(input: &str) -> IResult<&str, Line> {
    map(
        tuple((
            ws(keyword("block")),
            ws(number),
            opt(preceded(
                ws(tag("->")),
                separated_nonempty_list(ws(char(',')), ws(number)),
            )),
        )),
        |(_, address, successors)| Line::Block {
            address,
            successors: successors.unwrap_or_default(),
        },
    )(input)
}

fn statement_line(input: &str) -> IResult<&str, Line> {
    map(
        tuple((
            ws(number),
            ws(char(':')),
            separated_nonempty_list(ws(char(';')), statement),
        )),
        |(address, _, expressions)| Line::Statement {
            address,
            expressions,
        },
    )(input)
}

fn line(input: &str) -> IResult<&str, Line> {
    alt((
        function_line,
        block_line,
        statement_line,
        map(space0, |_| Line::Empty),
    ))(input)
}

/// Parses a single line, comments must have been stripped before.
pub fn parse_line(input: &str) -> Result<Line, String> {
    match all_consuming(line)(input) {
        Ok((_, line)) => Ok(line),
        Err(_) => Err(format!("cannot parse '{}'", input.trim())),
    }
}
