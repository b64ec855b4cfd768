// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! AST subsystem: parsed statements, condition expressions and privileges

pub mod duration;
pub mod expr;
pub mod privilege;
pub mod statement;

pub use duration::{format_duration, format_duration_literal, format_std_duration_literal};
pub use expr::{
    condition_expr, has_time_expr, reduce_now, BinaryOp, ConditionError, Expr, RegexLiteral,
    TimeRange,
};
pub use privilege::Privilege;
pub use statement::*;

/// Quote an identifier unless it is a bare word
pub fn quote_ident(ident: &str) -> String {
    let mut chars = ident.chars();
    let bare = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if bare {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// Quote a string literal with single quotes
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}
