// This file is part of marsh, an extended POSIX shell.
// Copyright (C) 2024 WATANABE Yuki
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Implementations of [std::fmt::Display] for the shell language syntax
//! types
//!
//! The `Display` implementations always produce single-line source code with
//! here-document contents omitted. Re-parsing the produced string yields an
//! equivalent AST.

use super::*;
use itertools::Itertools;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Write;

impl Display for SpecialParam {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.as_char().fmt(f)
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}

impl Display for SwitchType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use SwitchType::*;
        let c = match self {
            Alter => '+',
            Default => '-',
            Assign => '=',
            Error => '?',
        };
        c.fmt(f)
    }
}

impl Display for SwitchCondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SwitchCondition::Unset => Ok(()),
            SwitchCondition::UnsetOrEmpty => ':'.fmt(f),
        }
    }
}

impl Display for Switch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.condition, self.r#type, self.word)
    }
}

impl Display for TrimSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use TrimSide::*;
        let c = match self {
            Prefix => '#',
            Suffix => '%',
        };
        c.fmt(f)
    }
}

impl Display for Trim {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.side.fmt(f)?;
        match self.length {
            TrimLength::Shortest => (),
            TrimLength::Longest => self.side.fmt(f)?,
        }
        self.pattern.fmt(f)
    }
}

impl Display for BracedParam {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("${")?;
        if self.modifier == Modifier::Length {
            f.write_char('#')?;
        }
        self.param.fmt(f)?;
        if let Some(index) = &self.index {
            write!(f, "[{index}]")?;
        }
        match &self.modifier {
            Modifier::None | Modifier::Length => (),
            Modifier::Switch(switch) => switch.fmt(f)?,
            Modifier::Trim(trim) => trim.fmt(f)?,
        }
        f.write_char('}')
    }
}

impl Display for BackquoteUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BackquoteUnit::Literal(c) => c.fmt(f),
            BackquoteUnit::Backslashed(c) => write!(f, "\\{c}"),
        }
    }
}

impl Display for TextUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal(c) => c.fmt(f),
            Backslashed(c) => write!(f, "\\{c}"),
            RawParam { param, .. } => write!(f, "${param}"),
            BracedParam(param) => param.fmt(f),
            CommandSubst { content, .. } => write!(f, "$({content})"),
            Backquote { content, .. } => {
                f.write_char('`')?;
                content.iter().try_for_each(|unit| unit.fmt(f))?;
                f.write_char('`')
            }
            Arith { content, .. } => write!(f, "$(({content}))"),
            ProcSubst { content, read, .. } => {
                let direction = if *read { '<' } else { '>' };
                write!(f, "{direction}({content})")
            }
        }
    }
}

impl Display for Text {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|unit| unit.fmt(f))
    }
}

impl Display for EscapeUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use EscapeUnit::*;
        match self {
            Literal(c) => c.fmt(f),
            DoubleQuote => f.write_str("\\\""),
            SingleQuote => f.write_str("\\'"),
            Backslash => f.write_str("\\\\"),
            Question => f.write_str("\\?"),
            Alert => f.write_str("\\a"),
            Backspace => f.write_str("\\b"),
            Escape => f.write_str("\\e"),
            FormFeed => f.write_str("\\f"),
            Newline => f.write_str("\\n"),
            CarriageReturn => f.write_str("\\r"),
            Tab => f.write_str("\\t"),
            VerticalTab => f.write_str("\\v"),
            Control(b) => write!(f, "\\c{}", (b ^ 0x40) as char),
            Octal(b) => write!(f, "\\{b:03o}"),
            Hex(b) => write!(f, "\\x{b:02X}"),
            Unicode(c) if (*c as u32) <= 0xFFFF => write!(f, "\\u{:04X}", *c as u32),
            Unicode(c) => write!(f, "\\U{:08X}", *c as u32),
        }
    }
}

impl Display for EscapedString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|unit| unit.fmt(f))
    }
}

impl Display for WordUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Unquoted(unit) => unit.fmt(f),
            SingleQuote(s) => write!(f, "'{s}'"),
            DoubleQuote(text) => write!(f, "\"{text}\""),
            DollarSingleQuote(escaped) => write!(f, "$'{escaped}'"),
            DollarDoubleQuote(text) => write!(f, "$\"{text}\""),
            Tilde(name) => write!(f, "~{name}"),
        }
    }
}

impl Display for Word {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.units.iter().try_for_each(|unit| unit.fmt(f))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Scalar(word) => word.fmt(f),
            Array(words) => write!(f, "({})", words.iter().format(" ")),
        }
    }
}

impl Display for Assign {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.name.fmt(f)?;
        if let Some(index) = &self.index {
            write!(f, "[{index}]")?;
        }
        if self.append {
            f.write_char('+')?;
        }
        write!(f, "={}", self.value)
    }
}

impl Display for RedirOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use RedirOp::*;
        let s = match self {
            FileIn => "<",
            FileInOut => "<>",
            FileOut => ">",
            FileAppend => ">>",
            FileClobber => ">|",
            FdIn => "<&",
            FdOut => ">&",
            HereString => "<<<",
            ErrAndOut => "&>",
            ErrAndOutAppend => "&>>",
        };
        f.write_str(s)
    }
}

impl Display for Redir {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(fd) = self.fd {
            fd.fmt(f)?;
        }
        match &self.body {
            RedirBody::Normal { operator, operand } => write!(f, "{operator}{operand}"),
            RedirBody::HereDoc(here_doc) => {
                let operator = if here_doc.remove_tabs { "<<-" } else { "<<" };
                write!(f, "{operator}{}", here_doc.delimiter)
            }
        }
    }
}

impl Display for SimpleCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let i1 = self.assigns.iter().map(|x| x as &dyn Display);
        let i2 = self.words.iter().map(|x| x as &dyn Display);
        let i3 = self.redirs.iter().map(|x| x as &dyn Display);
        write!(f, "{}", i1.chain(i2).chain(i3).format(" "))
    }
}

impl Display for CaseContinuation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use CaseContinuation::*;
        let s = match self {
            Break => ";;",
            FallThrough => ";&",
            Continue => ";;&",
        };
        f.write_str(s)
    }
}

impl Display for CaseItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.patterns.iter().format(" | "))?;
        if self.body.0.is_empty() {
            f.write_char(' ')?;
        } else {
            write!(f, " {}", self.body)?;
            if ends_async(&self.body) {
                f.write_char(' ')?;
            }
        }
        self.continuation.fmt(f)
    }
}

impl Display for CondExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fn child(f: &mut Formatter<'_>, expr: &CondExpr, parenthesize_or: bool) -> fmt::Result {
            match expr {
                CondExpr::Or(..) if parenthesize_or => write!(f, "( {expr} )"),
                _ => expr.fmt(f),
            }
        }

        match self {
            CondExpr::And(lhs, rhs) => {
                child(f, lhs, true)?;
                f.write_str(" && ")?;
                child(f, rhs, true)
            }
            CondExpr::Or(lhs, rhs) => {
                lhs.fmt(f)?;
                f.write_str(" || ")?;
                rhs.fmt(f)
            }
            CondExpr::Not(operand) => match **operand {
                CondExpr::And(..) | CondExpr::Or(..) => write!(f, "! ( {operand} )"),
                _ => write!(f, "! {operand}"),
            },
            CondExpr::Unary { op, operand } => write!(f, "-{} {operand}", op.as_char()),
            CondExpr::Binary { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.as_str()),
            CondExpr::Word(word) => word.fmt(f),
        }
    }
}

/// Tests whether the last item of the list is asynchronous.
fn ends_async(list: &List) -> bool {
    list.0.last().is_some_and(|item| item.async_flag.is_some())
}

/// Writes the list followed by `; ` or `&` as appropriate, then the keyword.
fn fmt_list_then(f: &mut Formatter<'_>, list: &List, keyword: &str) -> fmt::Result {
    if ends_async(list) {
        write!(f, "{list} {keyword}")
    } else {
        write!(f, "{list}; {keyword}")
    }
}

impl Display for CompoundCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use CompoundCommand::*;
        match self {
            Grouping(list) => {
                f.write_str("{ ")?;
                fmt_list_then(f, list, "}")
            }
            Subshell { body, .. } => write!(f, "({body})"),
            For { name, values, body } => {
                write!(f, "for {name}")?;
                if let Some(values) = values {
                    f.write_str(" in")?;
                    values.iter().try_for_each(|value| write!(f, " {value}"))?;
                    f.write_char(';')?;
                }
                f.write_str(" do ")?;
                fmt_list_then(f, body, "done")
            }
            ArithFor {
                init,
                condition,
                step,
                body,
                ..
            } => {
                write!(f, "for (({init}; {condition}; {step})) do ")?;
                fmt_list_then(f, body, "done")
            }
            Select { name, values, body } => {
                write!(f, "select {name}")?;
                if let Some(values) = values {
                    f.write_str(" in")?;
                    values.iter().try_for_each(|value| write!(f, " {value}"))?;
                    f.write_char(';')?;
                }
                f.write_str(" do ")?;
                fmt_list_then(f, body, "done")
            }
            While { condition, body } => {
                f.write_str("while ")?;
                fmt_list_then(f, condition, "do ")?;
                fmt_list_then(f, body, "done")
            }
            Until { condition, body } => {
                f.write_str("until ")?;
                fmt_list_then(f, condition, "do ")?;
                fmt_list_then(f, body, "done")
            }
            If {
                condition,
                body,
                elifs,
                r#else,
            } => {
                f.write_str("if ")?;
                fmt_list_then(f, condition, "then ")?;
                fmt_list_then(f, body, "")?;
                for elif in elifs {
                    f.write_str("elif ")?;
                    fmt_list_then(f, &elif.condition, "then ")?;
                    fmt_list_then(f, &elif.body, "")?;
                }
                if let Some(r#else) = r#else {
                    f.write_str("else ")?;
                    fmt_list_then(f, r#else, "")?;
                }
                f.write_str("fi")
            }
            Case { subject, items } => {
                write!(f, "case {subject} in")?;
                items.iter().try_for_each(|item| write!(f, " {item}"))?;
                f.write_str(" esac")
            }
            DoubleBracket { expression, .. } => write!(f, "[[ {expression} ]]"),
            Arithmetic { expression, .. } => write!(f, "(({expression}))"),
        }
    }
}

impl Display for FullCompoundCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        self.redirs.iter().try_for_each(|redir| write!(f, " {redir}"))
    }
}

impl Display for FunctionDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.has_keyword {
            f.write_str("function ")?;
        }
        write!(f, "{}() {}", self.name, self.body)
    }
}

impl Display for CoprocCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("coproc ")?;
        if let Some(name) = &self.name {
            write!(f, "{name} ")?;
        }
        self.body.fmt(f)
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use Command::*;
        match self {
            Simple(c) => c.fmt(f),
            Compound(c) => c.fmt(f),
            Function(c) => c.fmt(f),
            Coproc(c) => c.fmt(f),
        }
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.time {
            None => (),
            Some(TimeFormat::Default) => f.write_str("time ")?,
            Some(TimeFormat::Posix) => f.write_str("time -p ")?,
        }
        if self.negation {
            f.write_str("! ")?;
        }
        write!(f, "{}", self.commands.iter().format(" | "))
    }
}

impl Display for AndOr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AndOr::AndThen => f.write_str("&&"),
            AndOr::OrElse => f.write_str("||"),
        }
    }
}

impl Display for AndOrList {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.first.fmt(f)?;
        self.rest
            .iter()
            .try_for_each(|(c, p)| write!(f, " {c} {p}"))
    }
}

impl Display for List {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                if self.0[i - 1].async_flag.is_some() {
                    f.write_char(' ')?;
                } else {
                    f.write_str("; ")?;
                }
            }
            item.and_or.fmt(f)?;
            if item.async_flag.is_some() {
                f.write_char('&')?;
            }
        }
        Ok(())
    }
}

#[allow(clippy::bool_assert_comparison)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn assert_round_trip(script: &str) {
        let list = List::from_str(script).unwrap();
        assert_eq!(list.to_string(), script);
    }

    #[test]
    fn simple_commands() {
        assert_round_trip("echo hello world");
        assert_round_trip("a=1 b=2 env");
        assert_round_trip("v=");
    }

    #[test]
    fn redirections() {
        assert_round_trip("echo x >file");
        assert_round_trip("cat <input >output 2>&1");
        assert_round_trip("exec 3<>rw");
        assert_round_trip("make &>log");
    }

    #[test]
    fn lists_and_pipelines() {
        assert_round_trip("a | b | c");
        assert_round_trip("! grep x f");
        assert_round_trip("a && b || c");
        assert_round_trip("a; b");
        assert_round_trip("a& b");
        assert_round_trip("a&");
    }

    #[test]
    fn compound_commands() {
        assert_round_trip("{ a; b; }");
        assert_round_trip("(a; b)");
        assert_round_trip("if a; then b; fi");
        assert_round_trip("if a; then b; elif c; then d; else e; fi");
        assert_round_trip("while a; do b; done");
        assert_round_trip("until a; do b; done");
        assert_round_trip("for i in 1 2 3; do echo $i; done");
        assert_round_trip("for i do echo $i; done");
        assert_round_trip("case $x in (a) y;; (b | c) z;; esac");
    }

    #[test]
    fn expansions() {
        assert_round_trip("echo $foo ${bar} ${#baz}");
        assert_round_trip("echo ${v:-default} ${v+set} ${v:?message}");
        assert_round_trip("echo ${v#prefix} ${v%%suffix}");
        assert_round_trip("echo $(date) `uname`");
        assert_round_trip("echo $((1 + 2))");
        assert_round_trip("echo 'single' \"double $x\"");
    }

    #[test]
    fn function_definitions() {
        assert_round_trip("f() { a; }");
        assert_round_trip("function f() { a; }");
    }

    #[test]
    fn time_and_negation() {
        assert_round_trip("time a | b");
        assert_round_trip("time -p a");
        assert_round_trip("time ! a");
    }
}
