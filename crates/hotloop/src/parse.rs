//! The source-text loader: tokenizer, parser, and label resolution.
//!
//! Source programs are ASCII text: whitespace-separated mnemonics with `;`
//! line comments. The parser produces symbolic instructions whose branch
//! operands are still label names; resolution registers every `name:` at
//! index `i` as `name -> i + 1`, rewrites all JUMP/JZ/PUSH_LABEL operands to
//! those indices, and yields an executable [`Program`]. Label definitions
//! stay inline as no-op slots so the rewritten indices stay valid.

use std::collections::HashMap;

use crate::{
    error::LoadError,
    inst::{Inst, Program},
};

/// Instruction form produced by the parser, before label resolution.
///
/// Branch and push-label operands are symbolic names; label definitions keep
/// their trailing `:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawInst {
    Halt,
    Label(String),
    Jump(String),
    Jz(String),
    Ret,
    Dup(usize),
    Swap(usize),
    Drop(usize),
    PushInt(i64),
    PushLabel(String),
    Eq,
    Ge,
    Add,
}

/// Splits source text into tokens, dropping `;` comments.
pub(crate) fn tokenize(source: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for line in source.lines() {
        let code = line.split(';').next().unwrap_or("");
        tokens.extend(code.split_whitespace());
    }
    tokens
}

/// True when `token` is a signed integer literal: an optional leading `-`
/// followed by one or more ASCII digits.
fn is_int_literal(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Consumes the operand token following a mnemonic.
fn operand<'t>(tokens: &[&'t str], next: &mut usize, mnemonic: &'static str) -> Result<&'t str, LoadError> {
    let Some(token) = tokens.get(*next) else {
        return Err(LoadError::MissingOperand { mnemonic });
    };
    *next += 1;
    Ok(token)
}

/// Consumes a stack-offset operand.
fn count_operand(tokens: &[&str], next: &mut usize, mnemonic: &'static str) -> Result<usize, LoadError> {
    let token = operand(tokens, next, mnemonic)?;
    token.parse().map_err(|_| LoadError::BadOperand {
        mnemonic,
        token: token.to_owned(),
    })
}

/// Maps tokens to symbolic instructions.
pub(crate) fn parse(tokens: &[&str]) -> Result<Vec<RawInst>, LoadError> {
    let mut insts = Vec::new();

    let mut next = 0;
    while next < tokens.len() {
        let token = tokens[next];
        next += 1;
        let inst = match token {
            "halt" => RawInst::Halt,
            "ret" => RawInst::Ret,
            "eq" => RawInst::Eq,
            "ge" => RawInst::Ge,
            "add" => RawInst::Add,
            "jump" => RawInst::Jump(operand(tokens, &mut next, "jump")?.to_owned()),
            "jz" => RawInst::Jz(operand(tokens, &mut next, "jz")?.to_owned()),
            "dup" => RawInst::Dup(count_operand(tokens, &mut next, "dup")?),
            "swap" => RawInst::Swap(count_operand(tokens, &mut next, "swap")?),
            "drop" => RawInst::Drop(count_operand(tokens, &mut next, "drop")?),
            "push" => {
                let token = operand(tokens, &mut next, "push")?;
                if is_int_literal(token) {
                    RawInst::PushInt(token.parse().map_err(|_| LoadError::BadOperand {
                        mnemonic: "push",
                        token: token.to_owned(),
                    })?)
                } else {
                    RawInst::PushLabel(token.to_owned())
                }
            }
            name if name.ends_with(':') => RawInst::Label(name.to_owned()),
            other => {
                return Err(LoadError::UnknownMnemonic {
                    token: other.to_owned(),
                });
            }
        };
        insts.push(inst);
    }

    Ok(insts)
}

/// Rewrites symbolic operands to absolute program counters.
pub(crate) fn resolve(raw: &[RawInst]) -> Result<Program, LoadError> {
    let mut labels: HashMap<&str, usize> = HashMap::new();
    for (i, inst) in raw.iter().enumerate() {
        let RawInst::Label(name) = inst else {
            continue;
        };
        let Some(key) = name.strip_suffix(':') else {
            return Err(LoadError::MalformedLabel { name: name.clone() });
        };
        if labels.insert(key, i + 1).is_some() {
            return Err(LoadError::DuplicateLabel { name: key.to_owned() });
        }
    }

    let lookup = |name: &str| {
        labels
            .get(name)
            .copied()
            .ok_or_else(|| LoadError::UnresolvedLabel { name: name.to_owned() })
    };

    let mut insts = Vec::with_capacity(raw.len());
    for inst in raw {
        insts.push(match inst {
            RawInst::Halt => Inst::Halt,
            RawInst::Label(name) => Inst::Label(name.as_str().into()),
            RawInst::Jump(name) => Inst::Jump(lookup(name)?),
            RawInst::Jz(name) => Inst::Jz(lookup(name)?),
            RawInst::Ret => Inst::Ret,
            RawInst::Dup(offset) => Inst::Dup(*offset),
            RawInst::Swap(offset) => Inst::Swap(*offset),
            RawInst::Drop(count) => Inst::Drop(*count),
            RawInst::PushInt(value) => Inst::PushInt(*value),
            RawInst::PushLabel(name) => Inst::PushLabel(lookup(name)?),
            RawInst::Eq => Inst::Eq,
            RawInst::Ge => Inst::Ge,
            RawInst::Add => Inst::Add,
        });
    }

    Ok(Program::new(insts))
}

/// Loads source text into an executable program.
pub fn load(source: &str) -> Result<Program, LoadError> {
    let tokens = tokenize(source);
    let raw = parse(&tokens)?;
    resolve(&raw)
}
