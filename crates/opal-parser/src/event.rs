//! The flat parse event log.
//!
//! The parser's primary artifact is not a pointer tree but an
//! append-only vector of small events: Open/Close pairs carrying a node
//! kind, Token events carrying a token index, and StepEnter/StepExit
//! markers around executable statements. An in-order walk of the events
//! is a pre-order walk of the abstract tree, so consumers reconstruct
//! any view they need with a single index scan and zero per-node
//! allocation.

use serde::Serialize;

/// What an [`Event`] record means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum EventKind {
    /// Start of a node; `data` is the [`NodeKind`].
    Open = 0,
    /// End of a node; `data` repeats the matching Open's [`NodeKind`].
    Close = 1,
    /// A consumed token; `data` is the index into the token vector.
    Token = 2,
    /// Start of an executable step (var decl, decorator, or identifier
    /// statement). `data` is unused.
    StepEnter = 3,
    /// End of an executable step. `data` is unused.
    StepExit = 4,
}

/// One record in the event log: a kind byte plus a 32-bit payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub data: u32,
}

impl Event {
    pub fn open(kind: NodeKind) -> Self {
        Self {
            kind: EventKind::Open,
            data: kind as u32,
        }
    }

    pub fn close(kind: NodeKind) -> Self {
        Self {
            kind: EventKind::Close,
            data: kind as u32,
        }
    }

    pub fn token(index: u32) -> Self {
        Self {
            kind: EventKind::Token,
            data: index,
        }
    }

    pub fn step_enter() -> Self {
        Self {
            kind: EventKind::StepEnter,
            data: 0,
        }
    }

    pub fn step_exit() -> Self {
        Self {
            kind: EventKind::StepExit,
            data: 0,
        }
    }

    /// The node kind of an Open/Close event.
    pub fn node_kind(&self) -> Option<NodeKind> {
        match self.kind {
            EventKind::Open | EventKind::Close => NodeKind::from_u32(self.data),
            _ => None,
        }
    }
}

/// Every kind of node in the Opal syntax tree.
///
/// The numeric values are a stable public surface: new kinds are only
/// ever appended, existing values never shift. Golden fixtures and
/// downstream tooling depend on this numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum NodeKind {
    Source = 0,
    Function = 1,
    ParamList = 2,
    Block = 3,
    Param = 4,
    TypeAnnotation = 5,
    DefaultValue = 6,
    VarDecl = 7,
    ShellCommand = 8,
    ShellArg = 9,
    If = 10,
    Else = 11,
    For = 12,
    Literal = 13,
    Identifier = 14,
    BinaryExpr = 15,
    InterpolatedString = 16,
    StringPart = 17,
    Decorator = 18,
    Try = 19,
    Catch = 20,
    Finally = 21,
    When = 22,
    WhenArm = 23,
    PatternLiteral = 24,
    PatternElse = 25,
    PatternRegex = 26,
    PatternRange = 27,
    Range = 28,
    PatternOr = 29,
    UnaryExpr = 30,
    PrefixExpr = 31,
    PostfixExpr = 32,
    Assignment = 33,
    Redirect = 34,
    RedirectTarget = 35,
    ObjectLiteral = 36,
    ObjectField = 37,
    ArrayLiteral = 38,
    FunctionCall = 39,
    TypeCast = 40,
    StructDecl = 41,
    StructField = 42,
    EnumDecl = 43,
    EnumMember = 44,
    QualifiedRef = 45,
}

impl NodeKind {
    /// Recover a kind from its stable numeric value.
    pub fn from_u32(value: u32) -> Option<NodeKind> {
        Some(match value {
            0 => NodeKind::Source,
            1 => NodeKind::Function,
            2 => NodeKind::ParamList,
            3 => NodeKind::Block,
            4 => NodeKind::Param,
            5 => NodeKind::TypeAnnotation,
            6 => NodeKind::DefaultValue,
            7 => NodeKind::VarDecl,
            8 => NodeKind::ShellCommand,
            9 => NodeKind::ShellArg,
            10 => NodeKind::If,
            11 => NodeKind::Else,
            12 => NodeKind::For,
            13 => NodeKind::Literal,
            14 => NodeKind::Identifier,
            15 => NodeKind::BinaryExpr,
            16 => NodeKind::InterpolatedString,
            17 => NodeKind::StringPart,
            18 => NodeKind::Decorator,
            19 => NodeKind::Try,
            20 => NodeKind::Catch,
            21 => NodeKind::Finally,
            22 => NodeKind::When,
            23 => NodeKind::WhenArm,
            24 => NodeKind::PatternLiteral,
            25 => NodeKind::PatternElse,
            26 => NodeKind::PatternRegex,
            27 => NodeKind::PatternRange,
            28 => NodeKind::Range,
            29 => NodeKind::PatternOr,
            30 => NodeKind::UnaryExpr,
            31 => NodeKind::PrefixExpr,
            32 => NodeKind::PostfixExpr,
            33 => NodeKind::Assignment,
            34 => NodeKind::Redirect,
            35 => NodeKind::RedirectTarget,
            36 => NodeKind::ObjectLiteral,
            37 => NodeKind::ObjectField,
            38 => NodeKind::ArrayLiteral,
            39 => NodeKind::FunctionCall,
            40 => NodeKind::TypeCast,
            41 => NodeKind::StructDecl,
            42 => NodeKind::StructField,
            43 => NodeKind::EnumDecl,
            44 => NodeKind::EnumMember,
            45 => NodeKind::QualifiedRef,
            _ => return None,
        })
    }

    /// Display name used by the debug tree renderer.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Source => "Source",
            NodeKind::Function => "Function",
            NodeKind::ParamList => "ParamList",
            NodeKind::Block => "Block",
            NodeKind::Param => "Param",
            NodeKind::TypeAnnotation => "TypeAnnotation",
            NodeKind::DefaultValue => "DefaultValue",
            NodeKind::VarDecl => "VarDecl",
            NodeKind::ShellCommand => "ShellCommand",
            NodeKind::ShellArg => "ShellArg",
            NodeKind::If => "If",
            NodeKind::Else => "Else",
            NodeKind::For => "For",
            NodeKind::Literal => "Literal",
            NodeKind::Identifier => "Identifier",
            NodeKind::BinaryExpr => "BinaryExpr",
            NodeKind::InterpolatedString => "InterpolatedString",
            NodeKind::StringPart => "StringPart",
            NodeKind::Decorator => "Decorator",
            NodeKind::Try => "Try",
            NodeKind::Catch => "Catch",
            NodeKind::Finally => "Finally",
            NodeKind::When => "When",
            NodeKind::WhenArm => "WhenArm",
            NodeKind::PatternLiteral => "PatternLiteral",
            NodeKind::PatternElse => "PatternElse",
            NodeKind::PatternRegex => "PatternRegex",
            NodeKind::PatternRange => "PatternRange",
            NodeKind::Range => "Range",
            NodeKind::PatternOr => "PatternOr",
            NodeKind::UnaryExpr => "UnaryExpr",
            NodeKind::PrefixExpr => "PrefixExpr",
            NodeKind::PostfixExpr => "PostfixExpr",
            NodeKind::Assignment => "Assignment",
            NodeKind::Redirect => "Redirect",
            NodeKind::RedirectTarget => "RedirectTarget",
            NodeKind::ObjectLiteral => "ObjectLiteral",
            NodeKind::ObjectField => "ObjectField",
            NodeKind::ArrayLiteral => "ArrayLiteral",
            NodeKind::FunctionCall => "FunctionCall",
            NodeKind::TypeCast => "TypeCast",
            NodeKind::StructDecl => "StructDecl",
            NodeKind::StructField => "StructField",
            NodeKind::EnumDecl => "EnumDecl",
            NodeKind::EnumMember => "EnumMember",
            NodeKind::QualifiedRef => "QualifiedRef",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_values_are_pinned() {
        // These numeric values are a stable public surface.
        assert_eq!(NodeKind::Source as u32, 0);
        assert_eq!(NodeKind::VarDecl as u32, 7);
        assert_eq!(NodeKind::ShellCommand as u32, 8);
        assert_eq!(NodeKind::Literal as u32, 13);
        assert_eq!(NodeKind::Decorator as u32, 18);
        assert_eq!(NodeKind::Assignment as u32, 33);
        assert_eq!(NodeKind::QualifiedRef as u32, 45);
    }

    #[test]
    fn from_u32_round_trips_every_kind() {
        for raw in 0..=45u32 {
            let kind = NodeKind::from_u32(raw).expect("kind must exist");
            assert_eq!(kind as u32, raw);
        }
        assert_eq!(NodeKind::from_u32(46), None);
    }

    #[test]
    fn event_constructors() {
        let open = Event::open(NodeKind::VarDecl);
        assert_eq!(open.kind, EventKind::Open);
        assert_eq!(open.node_kind(), Some(NodeKind::VarDecl));

        let tok = Event::token(3);
        assert_eq!(tok.kind, EventKind::Token);
        assert_eq!(tok.data, 3);
        assert_eq!(tok.node_kind(), None);

        assert_eq!(Event::step_enter().kind, EventKind::StepEnter);
        assert_eq!(Event::step_exit().kind, EventKind::StepExit);
    }
}
