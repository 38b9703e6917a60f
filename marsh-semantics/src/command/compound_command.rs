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

//! Implementation of compound command semantics

use super::handle_loop_divert;
use super::Command;
use crate::expansion::eval_arith;
use crate::expansion::expand_word;
use crate::expansion::expand_words;
use crate::pattern::word_to_pattern;
use crate::redir::RedirGuard;
use crate::Handle;
use marsh_env::job::ProcessState;
use marsh_env::semantics::ExitStatus;
use marsh_env::stack::Frame;
use marsh_env::system::Fd;
use marsh_env::system::System;
use marsh_env::system::SystemEx;
use marsh_env::variable;
use marsh_env::variable::Scope;
use marsh_env::Env;
use marsh_syntax::source::Location;
use marsh_syntax::syntax;
use marsh_syntax::syntax::CaseContinuation;
use marsh_syntax::syntax::List;
use marsh_syntax::syntax::Word;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

mod cond;

/// Executes the compound command, with redirections.
impl Command for syntax::FullCompoundCommand {
    fn execute(&self, env: &mut Env) -> crate::Result {
        let mut env = RedirGuard::new(env);
        match env.perform_redirs(&self.redirs) {
            Ok(_) => self.command.execute(&mut env),
            Err(error) => {
                error.handle(&mut env)?;
                Continue(())
            }
        }
    }
}

/// Executes the condition of an if/while/until command.
fn evaluate_condition(env: &mut Env, condition: &List) -> crate::Result<bool> {
    let mut env = env.push_frame(Frame::Condition);
    condition.execute(&mut env)?;
    Continue(env.exit_status.is_successful())
}

impl Command for syntax::CompoundCommand {
    fn execute(&self, env: &mut Env) -> crate::Result {
        use syntax::CompoundCommand::*;
        match self {
            Grouping(list) => list.execute(env),
            Subshell { body, location } => execute_subshell(env, Rc::clone(body), location),
            For { name, values, body } => execute_for(env, name, values.as_deref(), body),
            ArithFor {
                init,
                condition,
                step,
                body,
                location,
            } => execute_arith_for(env, init, condition, step, body, location),
            Select { name, values, body } => execute_select(env, name, values.as_deref(), body),
            While { condition, body } => execute_while(env, condition, body),
            Until { condition, body } => execute_until(env, condition, body),
            If {
                condition,
                body,
                elifs,
                r#else,
            } => execute_if(env, condition, body, elifs, r#else.as_ref()),
            Case { subject, items } => execute_case(env, subject, items),
            DoubleBracket {
                expression,
                location,
            } => cond::execute(env, expression, location),
            Arithmetic {
                expression,
                location,
            } => execute_arithmetic(env, expression, location),
        }
    }
}

/// Executes the body of a subshell in a forked child.
fn execute_subshell(env: &mut Env, body: Rc<List>, location: &Location) -> crate::Result {
    let result = env.start_subshell(move |env| body.execute(env), false);
    match result {
        Ok(pid) => match env.wait_for_subshell(pid) {
            Ok(ProcessState::Stopped(signal)) => {
                env.exit_status = ExitStatus::from(signal);
                Continue(())
            }
            Ok(state) => {
                env.exit_status = state.to_exit_status();
                Continue(())
            }
            Err(errno) => {
                env.print_error(&format!("cannot wait for the subshell: {errno}"));
                env.exit_status = ExitStatus::NOEXEC;
                Continue(())
            }
        },
        Err(errno) => {
            let _ = location;
            env.print_error(&format!("cannot start the subshell: {errno}"));
            env.exit_status = ExitStatus::NOEXEC;
            Continue(())
        }
    }
}

/// Assigns the iteration variable of a for or select loop.
fn assign_loop_variable(env: &mut Env, name: &Word, value: String) -> crate::Result {
    let Some(name) = name.to_string_if_literal() else {
        env.print_error("invalid loop variable name");
        env.exit_status = ExitStatus::ERROR;
        return Continue(());
    };
    let location = Location::dummy(value.clone());
    let mut variable = env.get_or_create_variable(name.clone(), Scope::Global);
    if variable.assign(value, location).is_err() {
        drop(variable);
        env.print_error(&format!("cannot assign to read-only variable `{name}`"));
        env.exit_status = ExitStatus::ERROR;
        return Break(marsh_env::semantics::Divert::Interrupt(None));
    }
    drop(variable);
    env.notify_assignment(&name);
    Continue(())
}

/// Expands the value words of a for or select loop.
///
/// Without `in`, the loop iterates over the positional parameters.
fn loop_values(env: &mut Env, values: Option<&[Word]>) -> crate::Result<Vec<String>> {
    match values {
        Some(words) => match expand_words(env, words) {
            Ok((fields, _)) => Continue(fields.into_iter().map(|field| field.value).collect()),
            Err(error) => {
                error.handle(env)?;
                Break(marsh_env::semantics::Divert::Interrupt(None))
            }
        },
        None => Continue(env.variables.positional_params().values.clone()),
    }
}

fn execute_for(
    env: &mut Env,
    name: &Word,
    values: Option<&[Word]>,
    body: &List,
) -> crate::Result {
    let values = match loop_values(env, values) {
        Continue(values) => values,
        Break(divert) => return Break(divert),
    };

    let mut env = env.push_frame(Frame::Loop);
    if values.is_empty() {
        env.exit_status = ExitStatus::SUCCESS;
    }
    for value in values {
        assign_loop_variable(&mut env, name, value)?;
        if let Some(flow) = handle_loop_divert(body.execute(&mut env)) {
            return flow;
        }
    }
    Continue(())
}

fn execute_while(env: &mut Env, condition: &List, body: &List) -> crate::Result {
    let mut env = env.push_frame(Frame::Loop);
    let mut exit_status = ExitStatus::SUCCESS;
    loop {
        let result = evaluate_condition(&mut env, condition);
        let running = match result {
            Continue(running) => running,
            Break(divert) => match handle_loop_divert(Break(divert)) {
                Some(flow) => return flow,
                None => continue,
            },
        };
        if !running {
            env.exit_status = exit_status;
            return Continue(());
        }
        match handle_loop_divert(body.execute(&mut env)) {
            Some(flow) => return flow,
            None => exit_status = env.exit_status,
        }
    }
}

fn execute_until(env: &mut Env, condition: &List, body: &List) -> crate::Result {
    let mut env = env.push_frame(Frame::Loop);
    let mut exit_status = ExitStatus::SUCCESS;
    loop {
        let result = evaluate_condition(&mut env, condition);
        let running = match result {
            Continue(running) => !running,
            Break(divert) => match handle_loop_divert(Break(divert)) {
                Some(flow) => return flow,
                None => continue,
            },
        };
        if !running {
            env.exit_status = exit_status;
            return Continue(());
        }
        match handle_loop_divert(body.execute(&mut env)) {
            Some(flow) => return flow,
            None => exit_status = env.exit_status,
        }
    }
}

fn execute_if(
    env: &mut Env,
    condition: &List,
    body: &List,
    elifs: &[syntax::ElifThen],
    r#else: Option<&List>,
) -> crate::Result {
    if evaluate_condition(env, condition)? {
        return body.execute(env);
    }
    for elif in elifs {
        if evaluate_condition(env, &elif.condition)? {
            return elif.body.execute(env);
        }
    }
    match r#else {
        Some(r#else) => r#else.execute(env),
        None => {
            env.exit_status = ExitStatus::SUCCESS;
            Continue(())
        }
    }
}

fn execute_case(env: &mut Env, subject: &Word, items: &[syntax::CaseItem]) -> crate::Result {
    let subject = match expand_word(env, subject) {
        Ok((field, _)) => field.value,
        Err(error) => {
            error.handle(env)?;
            return Continue(());
        }
    };

    let mut exit_status = ExitStatus::SUCCESS;
    let mut fall_through = false;
    for item in items {
        let mut matched = fall_through;
        if !matched {
            for pattern in &item.patterns {
                let pattern = match word_to_pattern(env, pattern) {
                    Ok(pattern) => pattern,
                    Err(error) => {
                        error.handle(env)?;
                        return Continue(());
                    }
                };
                if pattern.is_match(&subject) {
                    matched = true;
                    break;
                }
            }
        }
        if !matched {
            continue;
        }

        if !item.body.0.is_empty() {
            item.body.execute(env)?;
            exit_status = env.exit_status;
        }

        match item.continuation {
            CaseContinuation::Break => {
                env.exit_status = exit_status;
                return Continue(());
            }
            CaseContinuation::FallThrough => {
                fall_through = true;
            }
            CaseContinuation::Continue => {
                fall_through = false;
            }
        }
    }

    env.exit_status = exit_status;
    Continue(())
}

/// Expands and evaluates an arithmetic expression string.
///
/// The raw text of `(( ... ))` undergoes parameter expansion, command
/// substitution, and arithmetic expansion before evaluation.
fn expand_arith_text(env: &mut Env, text: &str, location: &Location) -> crate::Result<String> {
    use marsh_syntax::parser::lex::Lexer;
    use marsh_syntax::source::Source;

    let mut lexer = Lexer::from_memory(text, Source::Arith {
        original: location.clone(),
    });
    let parsed = lexer.text(|_| false, |c| matches!(c, '$' | '`' | '\\' | '"' | '\''));
    let text = match parsed {
        Ok(text) => text,
        Err(error) => {
            env.print_message(&error);
            env.exit_status = ExitStatus::ERROR;
            return Break(marsh_env::semantics::Divert::Interrupt(None));
        }
    };
    match crate::expansion::expand_text(env, &text) {
        Ok((expanded, _)) => Continue(expanded),
        Err(error) => {
            error.handle(env)?;
            Break(marsh_env::semantics::Divert::Interrupt(None))
        }
    }
}

fn execute_arithmetic(env: &mut Env, expression: &str, location: &Location) -> crate::Result {
    let expanded = match expand_arith_text(env, expression, location) {
        Continue(expanded) => expanded,
        Break(divert) => return Break(divert),
    };
    match eval_arith(env, &expanded, location) {
        Ok(value) => {
            env.exit_status = if value != 0 {
                ExitStatus::SUCCESS
            } else {
                ExitStatus::FAILURE
            };
            Continue(())
        }
        Err(error) => error.handle(env),
    }
}

fn execute_arith_for(
    env: &mut Env,
    init: &str,
    condition: &str,
    step: &str,
    body: &List,
    location: &Location,
) -> crate::Result {
    let mut eval = |env: &mut Env, text: &str| -> crate::Result<Option<i64>> {
        if text.trim().is_empty() {
            return Continue(None);
        }
        let expanded = match expand_arith_text(env, text, location) {
            Continue(expanded) => expanded,
            Break(divert) => return Break(divert),
        };
        match eval_arith(env, &expanded, location) {
            Ok(value) => Continue(Some(value)),
            Err(error) => {
                error.handle(env)?;
                Break(marsh_env::semantics::Divert::Interrupt(None))
            }
        }
    };

    eval(env, init)?;

    let mut env_guard = env.push_frame(Frame::Loop);
    let env = &mut *env_guard;
    loop {
        match eval(env, condition)? {
            Some(0) => break,
            Some(_) | None => (),
        }

        if let Some(flow) = handle_loop_divert(body.execute(env)) {
            return flow;
        }

        eval(env, step)?;
    }
    env.exit_status = ExitStatus::SUCCESS;
    Continue(())
}

/// Executes a select loop.
///
/// The menu of choices is printed to the standard error, a line is read
/// from the standard input into `REPLY`, and the loop variable is set to
/// the chosen value (or empty for an out-of-range reply). The loop repeats
/// until `break` or end of input.
fn execute_select(
    env: &mut Env,
    name: &Word,
    values: Option<&[Word]>,
    body: &List,
) -> crate::Result {
    let values = match loop_values(env, values) {
        Continue(values) => values,
        Break(divert) => return Break(divert),
    };
    if values.is_empty() {
        env.exit_status = ExitStatus::SUCCESS;
        return Continue(());
    }

    let mut env = env.push_frame(Frame::Loop);
    loop {
        print_select_menu(&mut env, &values);

        let Some(line) = read_select_reply(&mut env) else {
            // End of input exits the loop.
            return Continue(());
        };
        let line = line.trim().to_owned();
        if line.is_empty() {
            continue;
        }

        _ = env
            .variables
            .get_or_new(variable::REPLY, Scope::Global)
            .assign(line.clone(), None);

        let choice = match line.parse::<usize>() {
            Ok(number) if (1..=values.len()).contains(&number) => values[number - 1].clone(),
            _ => String::new(),
        };
        assign_loop_variable(&mut env, name, choice)?;

        if let Some(flow) = handle_loop_divert(body.execute(&mut env)) {
            return flow;
        }
    }
}

fn print_select_menu(env: &mut Env, values: &[String]) {
    let mut menu = String::new();
    for (i, value) in values.iter().enumerate() {
        menu.push_str(&format!("{}) {}\n", i + 1, value));
    }
    let prompt = env
        .variables
        .get_scalar("PS3")
        .unwrap_or("#? ")
        .to_owned();
    menu.push_str(&prompt);
    _ = env.system.write_all(Fd::STDERR, menu.as_bytes());
}

/// Reads one line from the standard input, or `None` at end of input.
fn read_select_reply(env: &mut Env) -> Option<String> {
    let mut line = Vec::new();
    loop {
        let mut byte = [0; 1];
        match env.system.read(Fd::STDIN, &mut byte) {
            Ok(0) => {
                if line.is_empty() {
                    return None;
                }
                break;
            }
            Ok(_) => {
                if byte[0] == b'\n' {
                    break;
                }
                line.push(byte[0]);
            }
            Err(marsh_env::system::Errno::EINTR) => continue,
            Err(_) => return None,
        }
    }
    Some(String::from_utf8_lossy(&line).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command as _;
    use crate::tests::echo_builtin;
    use crate::tests::return_builtin;
    use marsh_env::system::VirtualSystem;

    fn run(env: &mut Env, code: &str) -> crate::Result {
        let list: List = code.parse().unwrap();
        list.execute(env)
    }

    fn test_env() -> (Env, VirtualSystem) {
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("return", return_builtin());
        env.builtins.insert("break", crate::tests::break_builtin());
        env.builtins
            .insert("continue", crate::tests::continue_builtin());
        (env, system)
    }

    #[test]
    fn if_command() {
        let (mut env, system) = test_env();
        run(&mut env, "if return -n 0; then echo then; else echo else; fi").unwrap();
        assert_eq!(system.stdout_content(), b"then\n");

        run(&mut env, "if return -n 1; then echo then; else echo else; fi").unwrap();
        assert_eq!(system.stdout_content(), b"then\nelse\n");
    }

    #[test]
    fn if_without_else_succeeds() {
        let (mut env, _) = test_env();
        env.exit_status = ExitStatus(9);
        run(&mut env, "if return -n 1; then echo x; fi").unwrap();
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
    }

    #[test]
    fn elif_chain() {
        let (mut env, system) = test_env();
        run(
            &mut env,
            "if return -n 1; then echo a; elif return -n 0; then echo b; else echo c; fi",
        )
        .unwrap();
        assert_eq!(system.stdout_content(), b"b\n");
    }

    #[test]
    fn for_loop_iterates() {
        let (mut env, system) = test_env();
        run(&mut env, "for i in 1 2 3; do echo $i; done").unwrap();
        assert_eq!(system.stdout_content(), b"1\n2\n3\n");
    }

    #[test]
    fn for_loop_over_positional_params() {
        let (mut env, system) = test_env();
        env.variables.positional_params_mut().values = vec!["a".to_owned(), "b".to_owned()];
        run(&mut env, "for x do echo $x; done").unwrap();
        assert_eq!(system.stdout_content(), b"a\nb\n");
    }

    #[test]
    fn for_loop_with_break_and_continue() {
        let (mut env, system) = test_env();
        run(
            &mut env,
            "for i in 1 2 3 4; do case $i in (2) continue;; (4) break;; esac; echo $i; done",
        )
        .unwrap();
        assert_eq!(system.stdout_content(), b"1\n3\n");
    }

    #[test]
    fn while_loop_with_break() {
        let (mut env, system) = test_env();
        run(&mut env, "while return -n 0; do echo once; break; done").unwrap();
        assert_eq!(system.stdout_content(), b"once\n");
    }

    #[test]
    fn while_loop_condition_false() {
        let (mut env, system) = test_env();
        run(&mut env, "while return -n 1; do echo never; done").unwrap();
        assert_eq!(system.stdout_content(), b"");
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
    }

    #[test]
    fn until_loop() {
        let (mut env, system) = test_env();
        run(&mut env, "until return -n 0; do echo never; done").unwrap();
        assert_eq!(system.stdout_content(), b"");
    }

    #[test]
    fn nested_break_counts() {
        let (mut env, system) = test_env();
        run(
            &mut env,
            "for i in 1 2; do for j in a b; do echo $i$j; break 2; done; done",
        )
        .unwrap();
        assert_eq!(system.stdout_content(), b"1a\n");
    }

    #[test]
    fn case_matching() {
        let (mut env, system) = test_env();
        run(
            &mut env,
            "case hello in (h*) echo starts-with-h;; (*) echo other;; esac",
        )
        .unwrap();
        assert_eq!(system.stdout_content(), b"starts-with-h\n");
    }

    #[test]
    fn case_no_match_succeeds() {
        let (mut env, _) = test_env();
        env.exit_status = ExitStatus(9);
        run(&mut env, "case x in (y) echo y;; esac").unwrap();
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
    }

    #[test]
    fn case_fall_through() {
        let (mut env, system) = test_env();
        run(
            &mut env,
            "case a in (a) echo one;& (b) echo two;; (c) echo three;; esac",
        )
        .unwrap();
        assert_eq!(system.stdout_content(), b"one\ntwo\n");
    }

    #[test]
    fn case_continue_retests() {
        let (mut env, system) = test_env();
        run(
            &mut env,
            "case ab in (a*) echo first;;& (*b) echo second;; (x) echo no;; esac",
        )
        .unwrap();
        assert_eq!(system.stdout_content(), b"first\nsecond\n");
    }

    #[test]
    fn arithmetic_command_exit_status() {
        let (mut env, _) = test_env();
        run(&mut env, "((1 + 1))").unwrap();
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);

        run(&mut env, "((0))").unwrap();
        assert_eq!(env.exit_status, ExitStatus::FAILURE);
    }

    #[test]
    fn arithmetic_command_assigns() {
        let (mut env, _) = test_env();
        run(&mut env, "((x = 6 * 7))").unwrap();
        assert_eq!(env.variables.get_scalar("x"), Some("42"));
    }

    #[test]
    fn arithmetic_command_with_dollar_expansion() {
        let (mut env, _) = test_env();
        env.variables
            .get_or_new("n", Scope::Global)
            .assign("10", None)
            .unwrap();
        run(&mut env, "((sum = $n + 5))").unwrap();
        assert_eq!(env.variables.get_scalar("sum"), Some("15"));
    }

    #[test]
    fn arith_for_loop() {
        let (mut env, system) = test_env();
        run(&mut env, "for ((i = 0; i < 3; i++)) do echo $i; done").unwrap();
        assert_eq!(system.stdout_content(), b"0\n1\n2\n");
    }

    #[test]
    fn arith_for_with_empty_parts() {
        let (mut env, system) = test_env();
        run(&mut env, "for ((;;)) do break; done").unwrap();
        assert_eq!(system.stdout_content(), b"");
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
    }

    #[test]
    fn grouping_runs_in_current_environment() {
        let (mut env, _) = test_env();
        run(&mut env, "{ x=1; }").unwrap();
        assert_eq!(env.variables.get_scalar("x"), Some("1"));
    }
}
