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

//! Initial expansion
//!
//! The initial expansion resolves tilde expansions, parameter expansions,
//! command substitutions, and arithmetic expansions, producing a
//! [`Phrase`] of [attributed characters](AttrChar). See the
//! [module documentation](super) for the overall picture.

use super::attr::extend_hard;
use super::attr::extend_soft;
use super::attr::AttrChar;
use super::attr::AttrField;
use super::attr::Origin;
use super::attr::Phrase;
use super::eval_arith;
use super::quote_removal;
use super::Error;
use super::ErrorCause;
use super::Result;
use marsh_env::option;
use marsh_env::semantics::ExitStatus;
use marsh_env::system::Errno;
use marsh_env::system::Fd;
use marsh_env::system::System;
use marsh_env::system::SystemEx;
use marsh_env::variable;
use marsh_env::variable::NamerefResolution;
use marsh_env::variable::Scope;
use marsh_env::variable::Value;
use marsh_env::Env;
use marsh_fnmatch::Pattern;
use marsh_fnmatch::PatternChar;
use marsh_syntax::source::Location;
use marsh_syntax::source::Source;
use marsh_syntax::syntax::BracedParam;
use marsh_syntax::syntax::Modifier;
use marsh_syntax::syntax::Param;
use marsh_syntax::syntax::ParamType;
use marsh_syntax::syntax::SpecialParam;
use marsh_syntax::syntax::Switch;
use marsh_syntax::syntax::SwitchCondition;
use marsh_syntax::syntax::SwitchType;
use marsh_syntax::syntax::Text;
use marsh_syntax::syntax::TextUnit;
use marsh_syntax::syntax::Trim;
use marsh_syntax::syntax::TrimLength;
use marsh_syntax::syntax::TrimSide;
use marsh_syntax::syntax::Word;
use marsh_syntax::syntax::WordUnit;
use std::rc::Rc;

/// Value of a parameter before modifiers are applied
#[derive(Clone, Debug)]
enum ParamValue {
    /// The parameter is unset.
    Unset,
    /// Single string value
    Scalar(String),
    /// Multiple fields, as for `$@`
    Fields(Vec<String>),
}

impl ParamValue {
    fn is_vacant(&self, condition: SwitchCondition) -> bool {
        match condition {
            SwitchCondition::Unset => matches!(self, ParamValue::Unset),
            SwitchCondition::UnsetOrEmpty => match self {
                ParamValue::Unset => true,
                ParamValue::Scalar(value) => value.is_empty(),
                ParamValue::Fields(fields) => {
                    fields.is_empty() || (fields.len() == 1 && fields[0].is_empty())
                }
            },
        }
    }
}

/// State of the initial expansion
pub struct Expander<'a> {
    env: &'a mut Env,
    last_command_subst_exit_status: Option<ExitStatus>,
}

impl<'a> Expander<'a> {
    pub fn new(env: &'a mut Env) -> Self {
        Expander {
            env,
            last_command_subst_exit_status: None,
        }
    }

    /// Returns and clears the exit status of the last command substitution.
    pub fn take_last_command_subst_exit_status(&mut self) -> Option<ExitStatus> {
        self.last_command_subst_exit_status.take()
    }

    /// Expands a word to a phrase.
    pub fn expand_word(&mut self, word: &Word) -> Result<Phrase> {
        let mut phrase = vec![AttrField::new()];
        for unit in &word.units {
            self.expand_word_unit(unit, &mut phrase)?;
        }
        Ok(phrase)
    }

    fn expand_word_unit(&mut self, unit: &WordUnit, phrase: &mut Phrase) -> Result<()> {
        match unit {
            WordUnit::Unquoted(text_unit) => self.expand_text_unit(text_unit, false, phrase),
            WordUnit::SingleQuote(value) => {
                let field = phrase.last_mut().unwrap();
                push_quoting(field, '\'');
                field.extend(value.chars().map(|value| AttrChar {
                    value,
                    origin: Origin::Literal,
                    is_quoted: true,
                    is_quoting: false,
                }));
                push_quoting(field, '\'');
                Ok(())
            }
            WordUnit::DollarSingleQuote(escaped) => {
                let field = phrase.last_mut().unwrap();
                push_quoting(field, '\'');
                field.extend(escaped.to_decoded().chars().map(|value| AttrChar {
                    value,
                    origin: Origin::Literal,
                    is_quoted: true,
                    is_quoting: false,
                }));
                push_quoting(field, '\'');
                Ok(())
            }
            WordUnit::DoubleQuote(text) | WordUnit::DollarDoubleQuote(text) => {
                push_quoting(phrase.last_mut().unwrap(), '"');
                for text_unit in &text.0 {
                    self.expand_text_unit(text_unit, true, phrase)?;
                }
                push_quoting(phrase.last_mut().unwrap(), '"');
                Ok(())
            }
            WordUnit::Tilde(name) => {
                let value = self.tilde(name);
                extend_hard(phrase.last_mut().unwrap(), &value);
                Ok(())
            }
        }
    }

    /// Expands a text into a single field, joining multi-field parameter
    /// values with spaces.
    ///
    /// This entry point is used for here-document contents.
    pub fn expand_text(
        &mut self,
        text: &Text,
        quoted: bool,
        field: &mut AttrField,
    ) -> Result<()> {
        let mut phrase = vec![AttrField::new()];
        for unit in &text.0 {
            self.expand_text_unit(unit, quoted, &mut phrase)?;
        }
        for (i, mut inner) in phrase.into_iter().enumerate() {
            if i > 0 {
                field.push(AttrChar {
                    value: ' ',
                    origin: Origin::SoftExpansion,
                    is_quoted: quoted,
                    is_quoting: false,
                });
            }
            field.append(&mut inner);
        }
        Ok(())
    }

    fn expand_text_unit(
        &mut self,
        unit: &TextUnit,
        quoted: bool,
        phrase: &mut Phrase,
    ) -> Result<()> {
        match unit {
            TextUnit::Literal(value) => {
                phrase.last_mut().unwrap().push(AttrChar {
                    value: *value,
                    origin: Origin::Literal,
                    is_quoted: quoted,
                    is_quoting: false,
                });
                Ok(())
            }
            TextUnit::Backslashed(value) => {
                let field = phrase.last_mut().unwrap();
                field.push(AttrChar {
                    value: '\\',
                    origin: Origin::Literal,
                    is_quoted: quoted,
                    is_quoting: true,
                });
                field.push(AttrChar {
                    value: *value,
                    origin: Origin::Literal,
                    is_quoted: true,
                    is_quoting: false,
                });
                Ok(())
            }
            TextUnit::RawParam { param, location } => {
                self.expand_param(param, None, &Modifier::None, location, quoted, phrase)
            }
            TextUnit::BracedParam(BracedParam {
                param,
                index,
                modifier,
                location,
            }) => self.expand_param(param, index.as_ref(), modifier, location, quoted, phrase),
            TextUnit::CommandSubst { content, location } => {
                let output = self.command_substitution(content, location)?;
                extend_soft(phrase.last_mut().unwrap(), &output, quoted);
                Ok(())
            }
            TextUnit::Backquote { content, location } => {
                let content: String = content
                    .iter()
                    .map(|unit| match unit {
                        marsh_syntax::syntax::BackquoteUnit::Literal(c) => *c,
                        marsh_syntax::syntax::BackquoteUnit::Backslashed(c) => *c,
                    })
                    .collect();
                let content = Rc::from(content.as_str());
                let output = self.command_substitution(&content, location)?;
                extend_soft(phrase.last_mut().unwrap(), &output, quoted);
                Ok(())
            }
            TextUnit::Arith { content, location } => {
                let mut expression = AttrField::new();
                self.expand_text(content, false, &mut expression)?;
                let expression: String = expression.iter().map(|c| c.value).collect();
                let value = eval_arith(self.env, &expression, location)?;
                extend_soft(phrase.last_mut().unwrap(), &value.to_string(), quoted);
                Ok(())
            }
            TextUnit::ProcSubst {
                content,
                read,
                location,
            } => {
                let path = self.process_substitution(content, *read, location)?;
                extend_hard(phrase.last_mut().unwrap(), &path);
                Ok(())
            }
        }
    }

    /// Performs tilde expansion.
    fn tilde(&mut self, name: &str) -> String {
        if name.is_empty() {
            match self.env.variables.get_scalar(variable::HOME) {
                Some(home) => home.to_owned(),
                None => "~".to_owned(),
            }
        } else {
            match self.env.system.home_dir_of_user(name) {
                Some(path) => path.to_string_lossy().into_owned(),
                None => format!("~{name}"),
            }
        }
    }

    /// Computes the base value of a parameter.
    fn param_value(
        &mut self,
        param: &Param,
        index: Option<&Text>,
        location: &Location,
        quoted: bool,
    ) -> Result<ParamValue> {
        match param.r#type {
            ParamType::Special(special) => self.special_param_value(special, quoted),
            ParamType::Positional(index) => {
                let params = &self.env.variables.positional_params().values;
                match index.checked_sub(1).and_then(|i| params.get(i)) {
                    Some(value) => Ok(ParamValue::Scalar(value.clone())),
                    None => Ok(ParamValue::Unset),
                }
            }
            ParamType::Variable => {
                let name = self.resolve_name(&param.id);
                self.variable_value(&name, index, location, quoted)
            }
        }
    }

    /// Resolves namerefs in a variable name.
    fn resolve_name(&mut self, name: &str) -> String {
        match self.env.variables.resolve_nameref(name) {
            NamerefResolution::Resolved(name) => name.into_owned(),
            NamerefResolution::OverBound(name) => {
                let name = name.into_owned();
                self.env.print_error(&format!(
                    "warning: {name}: circular name reference",
                ));
                name
            }
        }
    }

    fn variable_value(
        &mut self,
        name: &str,
        index: Option<&Text>,
        location: &Location,
        quoted: bool,
    ) -> Result<ParamValue> {
        let index_string = match index {
            None => None,
            Some(text) => {
                let mut field = AttrField::new();
                self.expand_text(text, false, &mut field)?;
                Some(quote_removal::strip(&field))
            }
        };

        let Some(variable) = self.env.variables.get(name) else {
            return Ok(ParamValue::Unset);
        };

        // Apply any quirk to compute the effective value.
        let context = self.env.quirk_context();
        let expansion = variable.expand(location, &context);
        let value = match expansion {
            variable::Expansion::Unset => return Ok(ParamValue::Unset),
            variable::Expansion::Scalar(value) => Value::Scalar(value.into_owned()),
            variable::Expansion::Array(_) => match &variable.value {
                Some(value) => value.clone(),
                None => return Ok(ParamValue::Unset),
            },
        };

        match (&value, index_string.as_deref()) {
            (Value::Scalar(value), None | Some("0")) => Ok(ParamValue::Scalar(value.clone())),
            (Value::Scalar(_), Some(_)) => Ok(ParamValue::Unset),
            (value, Some("@")) => Ok(ParamValue::Fields(
                value.iter_values().map(str::to_owned).collect(),
            )),
            (value, Some("*")) => {
                if quoted {
                    let separator = self.ifs_separator();
                    Ok(ParamValue::Scalar(
                        value
                            .iter_values()
                            .collect::<Vec<_>>()
                            .join(&separator),
                    ))
                } else {
                    Ok(ParamValue::Fields(
                        value.iter_values().map(str::to_owned).collect(),
                    ))
                }
            }
            (Value::Indexed(values), None) => match values.get(&0) {
                Some(value) => Ok(ParamValue::Scalar(value.clone())),
                None => Ok(ParamValue::Unset),
            },
            (Value::Indexed(values), Some(index)) => {
                let index = eval_arith(self.env, index, location).map_err(|_| Error {
                    cause: ErrorCause::InvalidIndex,
                    location: location.clone(),
                })?;
                let index = u64::try_from(index).map_err(|_| Error {
                    cause: ErrorCause::InvalidIndex,
                    location: location.clone(),
                })?;
                match values.get(&index) {
                    Some(value) => Ok(ParamValue::Scalar(value.clone())),
                    None => Ok(ParamValue::Unset),
                }
            }
            (Value::Assoc(values), None) => match values.get("0") {
                Some(value) => Ok(ParamValue::Scalar(value.clone())),
                None => Ok(ParamValue::Unset),
            },
            (Value::Assoc(values), Some(key)) => match values.get(key) {
                Some(value) => Ok(ParamValue::Scalar(value.clone())),
                None => Ok(ParamValue::Unset),
            },
        }
    }

    /// Returns the separator used when joining `$*`.
    fn ifs_separator(&self) -> String {
        self.env
            .variables
            .get_scalar(variable::IFS)
            .unwrap_or(variable::IFS_INITIAL_VALUE)
            .chars()
            .next()
            .map(|c| c.to_string())
            .unwrap_or_default()
    }

    fn special_param_value(
        &mut self,
        special: SpecialParam,
        quoted: bool,
    ) -> Result<ParamValue> {
        use SpecialParam::*;
        match special {
            At => Ok(ParamValue::Fields(
                self.env.variables.positional_params().values.clone(),
            )),
            Asterisk => {
                let values = &self.env.variables.positional_params().values;
                if quoted {
                    let separator = self.ifs_separator();
                    Ok(ParamValue::Scalar(values.join(&separator)))
                } else {
                    Ok(ParamValue::Fields(values.clone()))
                }
            }
            Number => Ok(ParamValue::Scalar(
                self.env.variables.positional_params().values.len().to_string(),
            )),
            Question => Ok(ParamValue::Scalar(self.env.exit_status.to_string())),
            Hyphen => {
                let mut letters = String::new();
                for (option, state) in self.env.options.iter() {
                    if let Some((letter, on_state)) = option.short_name() {
                        if state == on_state && letter.is_ascii_lowercase() {
                            letters.push(letter);
                        }
                    }
                }
                Ok(ParamValue::Scalar(letters))
            }
            Dollar => Ok(ParamValue::Scalar(self.env.main_pid.to_string())),
            Exclamation => match self.env.jobs.last_async_pid() {
                Some(pid) => Ok(ParamValue::Scalar(pid.to_string())),
                None => Ok(ParamValue::Unset),
            },
            Zero => Ok(ParamValue::Scalar(self.env.arg0.clone())),
        }
    }

    /// Expands a parameter with its modifier into the phrase.
    fn expand_param(
        &mut self,
        param: &Param,
        index: Option<&Text>,
        modifier: &Modifier,
        location: &Location,
        quoted: bool,
        phrase: &mut Phrase,
    ) -> Result<()> {
        let value = self.param_value(param, index, location, quoted)?;

        let value = match modifier {
            Modifier::None => self.check_set(param, value, location)?,
            Modifier::Length => {
                let value = self.check_set(param, value, location)?;
                match value {
                    ParamValue::Unset => ParamValue::Scalar("0".to_owned()),
                    ParamValue::Scalar(value) => {
                        ParamValue::Scalar(value.chars().count().to_string())
                    }
                    ParamValue::Fields(fields) => ParamValue::Scalar(fields.len().to_string()),
                }
            }
            Modifier::Switch(switch) => {
                match self.apply_switch(param, value, switch, location)? {
                    SwitchResult::Value(value) => value,
                    SwitchResult::Substituted(word) => {
                        return self.substitute_switch_word(&word, quoted, phrase);
                    }
                }
            }
            Modifier::Trim(trim) => {
                let value = self.check_set(param, value, location)?;
                self.apply_trim(value, trim, location)?
            }
        };

        match value {
            ParamValue::Unset => Ok(()),
            ParamValue::Scalar(value) => {
                extend_soft(phrase.last_mut().unwrap(), &value, quoted);
                Ok(())
            }
            ParamValue::Fields(fields) => {
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        phrase.push(AttrField::new());
                    }
                    extend_soft(phrase.last_mut().unwrap(), field, quoted);
                }
                Ok(())
            }
        }
    }

    /// Enforces the `Unset` option on unset parameters.
    fn check_set(
        &mut self,
        param: &Param,
        value: ParamValue,
        location: &Location,
    ) -> Result<ParamValue> {
        if matches!(value, ParamValue::Unset)
            && self.env.options.get(option::Unset) == option::State::Off
        {
            return Err(Error {
                cause: ErrorCause::UnsetParameter {
                    name: param.id.clone(),
                },
                location: location.clone(),
            });
        }
        Ok(value)
    }

    fn apply_switch(
        &mut self,
        param: &Param,
        value: ParamValue,
        switch: &Switch,
        location: &Location,
    ) -> Result<SwitchResult> {
        let vacant = value.is_vacant(switch.condition);
        match switch.r#type {
            SwitchType::Alter => {
                if vacant {
                    Ok(SwitchResult::Value(ParamValue::Scalar(String::new())))
                } else {
                    Ok(SwitchResult::Substituted(switch.word.clone()))
                }
            }
            SwitchType::Default => {
                if vacant {
                    Ok(SwitchResult::Substituted(switch.word.clone()))
                } else {
                    Ok(SwitchResult::Value(value))
                }
            }
            SwitchType::Assign => {
                if !vacant {
                    return Ok(SwitchResult::Value(value));
                }
                if param.r#type != ParamType::Variable {
                    return Err(Error {
                        cause: ErrorCause::NonassignableParameter {
                            name: param.id.clone(),
                        },
                        location: location.clone(),
                    });
                }
                let phrase = self.expand_word(&switch.word)?;
                let new_value = phrase
                    .iter()
                    .map(|field| quote_removal::strip(field))
                    .collect::<Vec<_>>()
                    .join(" ");
                let name = self.resolve_name(&param.id);
                let mut variable = self.env.get_or_create_variable(name.clone(), Scope::Global);
                match variable.assign(new_value.clone(), location.clone()) {
                    Ok(_) => {
                        self.env.notify_assignment(&name);
                        Ok(SwitchResult::Value(ParamValue::Scalar(new_value)))
                    }
                    Err(_) => Err(Error {
                        cause: ErrorCause::ReadOnlyVariable { name },
                        location: location.clone(),
                    }),
                }
            }
            SwitchType::Error => {
                if !vacant {
                    return Ok(SwitchResult::Value(value));
                }
                let message = if switch.word.units.is_empty() {
                    "parameter not set".to_owned()
                } else {
                    let phrase = self.expand_word(&switch.word)?;
                    phrase
                        .iter()
                        .map(|field| quote_removal::strip(field))
                        .collect::<Vec<_>>()
                        .join(" ")
                };
                Err(Error {
                    cause: ErrorCause::VacantExpansion {
                        name: param.id.clone(),
                        message,
                    },
                    location: location.clone(),
                })
            }
        }
    }

    /// Splices the expansion of a switch word into the phrase.
    ///
    /// The characters keep their own quotation, but their origin becomes
    /// [`Origin::SoftExpansion`] because the whole parameter expansion is
    /// subject to field splitting.
    fn substitute_switch_word(
        &mut self,
        word: &Word,
        _quoted: bool,
        phrase: &mut Phrase,
    ) -> Result<()> {
        let inner = self.expand_word(word)?;
        for (i, field) in inner.into_iter().enumerate() {
            if i > 0 {
                phrase.push(AttrField::new());
            }
            let target = phrase.last_mut().unwrap();
            target.extend(field.into_iter().map(|mut c| {
                if c.origin == Origin::Literal {
                    c.origin = Origin::SoftExpansion;
                }
                c
            }));
        }
        Ok(())
    }

    fn apply_trim(
        &mut self,
        value: ParamValue,
        trim: &Trim,
        location: &Location,
    ) -> Result<ParamValue> {
        let pattern_chars = self.expand_pattern_word(&trim.pattern)?;
        let pattern = Pattern::parse(pattern_chars.iter().copied()).map_err(|_| Error {
            cause: ErrorCause::InvalidPattern,
            location: location.clone(),
        })?;

        let trim_one = |value: &str| -> String {
            match (trim.side, trim.length) {
                (TrimSide::Prefix, TrimLength::Shortest) => match pattern.shortest_prefix(value) {
                    Some(end) => value[end..].to_owned(),
                    None => value.to_owned(),
                },
                (TrimSide::Prefix, TrimLength::Longest) => match pattern.longest_prefix(value) {
                    Some(end) => value[end..].to_owned(),
                    None => value.to_owned(),
                },
                (TrimSide::Suffix, TrimLength::Shortest) => match pattern.shortest_suffix(value) {
                    Some(start) => value[..start].to_owned(),
                    None => value.to_owned(),
                },
                (TrimSide::Suffix, TrimLength::Longest) => match pattern.longest_suffix(value) {
                    Some(start) => value[..start].to_owned(),
                    None => value.to_owned(),
                },
            }
        };

        Ok(match value {
            ParamValue::Unset => ParamValue::Unset,
            ParamValue::Scalar(value) => ParamValue::Scalar(trim_one(&value)),
            ParamValue::Fields(fields) => {
                ParamValue::Fields(fields.iter().map(|field| trim_one(field)).collect())
            }
        })
    }

    /// Expands a word to pattern characters, with quoted characters matching
    /// literally.
    pub fn expand_pattern_word(&mut self, word: &Word) -> Result<Vec<PatternChar>> {
        let phrase = self.expand_word(word)?;
        let mut chars = Vec::new();
        for (i, field) in phrase.iter().enumerate() {
            if i > 0 {
                chars.push(PatternChar::Literal(' '));
            }
            for c in field {
                if c.is_quoting {
                    continue;
                }
                if c.is_quoted {
                    chars.push(PatternChar::Literal(c.value));
                } else {
                    chars.push(PatternChar::Normal(c.value));
                }
            }
        }
        Ok(chars)
    }

    /// Performs a command substitution and returns its output.
    fn command_substitution(&mut self, content: &Rc<str>, location: &Location) -> Result<String> {
        let error = |errno: Errno, location: &Location| Error {
            cause: ErrorCause::CommandSubst(errno),
            location: location.clone(),
        };

        let (reader, writer) = self
            .env
            .system
            .pipe()
            .map_err(|errno| error(errno, location))?;

        let content_for_child = Rc::clone(content);
        let source = Rc::new(Source::CommandSubst {
            original: location.clone(),
        });
        let pid = self
            .env
            .start_subshell(
                move |env| {
                    _ = env.system.dup2(writer, Fd::STDOUT);
                    _ = env.system.close(writer);
                    _ = env.system.close(reader);
                    crate::runner::run_command_string(env, &content_for_child, source)
                },
                false,
            )
            .map_err(|errno| {
                _ = self.env.system.close(reader);
                _ = self.env.system.close(writer);
                error(errno, location)
            })?;

        _ = self.env.system.close(writer);

        let mut output = Vec::new();
        let mut buffer = [0; 4096];
        loop {
            match self.env.system.read(reader, &mut buffer) {
                Ok(0) => break,
                Ok(count) => output.extend_from_slice(&buffer[..count]),
                Err(Errno::EINTR) => continue,
                Err(_) => break,
            }
        }
        _ = self.env.system.close(reader);

        let state = self
            .env
            .wait_for_subshell(pid)
            .map_err(|errno| error(errno, location))?;
        self.last_command_subst_exit_status = Some(state.to_exit_status());

        let mut output = String::from_utf8_lossy(&output).into_owned();
        while output.ends_with('\n') {
            output.pop();
        }
        Ok(output)
    }

    /// Performs a process substitution and returns the `/dev/fd/N` path.
    fn process_substitution(
        &mut self,
        content: &Rc<str>,
        read: bool,
        location: &Location,
    ) -> Result<String> {
        let error = |errno: Errno| Error {
            cause: ErrorCause::CommandSubst(errno),
            location: location.clone(),
        };

        let (reader, writer) = self.env.system.pipe().map_err(error)?;
        let content_for_child = Rc::clone(content);
        let source = Rc::new(Source::CommandSubst {
            original: location.clone(),
        });
        let _pid = self
            .env
            .start_subshell(
                move |env| {
                    if read {
                        _ = env.system.dup2(writer, Fd::STDOUT);
                    } else {
                        _ = env.system.dup2(reader, Fd::STDIN);
                    }
                    _ = env.system.close(writer);
                    _ = env.system.close(reader);
                    crate::runner::run_command_string(env, &content_for_child, source)
                },
                false,
            )
            .map_err(error)?;

        let kept = if read {
            _ = self.env.system.close(writer);
            reader
        } else {
            _ = self.env.system.close(reader);
            writer
        };
        Ok(format!("/dev/fd/{kept}"))
    }

    pub(super) fn env(&mut self) -> &mut Env {
        self.env
    }
}

enum SwitchResult {
    Value(ParamValue),
    Substituted(Word),
}

fn push_quoting(field: &mut AttrField, value: char) {
    field.push(AttrChar {
        value,
        origin: Origin::Literal,
        is_quoted: false,
        is_quoting: true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Word {
        s.parse().unwrap()
    }

    fn expand_to_string(env: &mut Env, s: &str) -> String {
        let mut expander = Expander::new(env);
        let phrase = expander.expand_word(&word(s)).unwrap();
        phrase
            .iter()
            .map(|field| quote_removal::strip(field))
            .collect::<Vec<_>>()
            .join("|")
    }

    #[test]
    fn special_parameters() {
        let mut env = Env::new_virtual();
        env.exit_status = ExitStatus(42);
        env.variables.positional_params_mut().values =
            vec!["one".to_owned(), "two".to_owned()];

        assert_eq!(expand_to_string(&mut env, "$?"), "42");
        assert_eq!(expand_to_string(&mut env, "$#"), "2");
        assert_eq!(expand_to_string(&mut env, "$1"), "one");
        assert_eq!(expand_to_string(&mut env, "$3"), "");
        assert_eq!(expand_to_string(&mut env, "\"$@\""), "one|two");
        assert_eq!(expand_to_string(&mut env, "\"$*\""), "one two");
    }

    #[test]
    fn switch_modifiers() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("set", Scope::Global)
            .assign("value", None)
            .unwrap();
        env.variables
            .get_or_new("empty", Scope::Global)
            .assign("", None)
            .unwrap();

        assert_eq!(expand_to_string(&mut env, "${set:-default}"), "value");
        assert_eq!(expand_to_string(&mut env, "${unset:-default}"), "default");
        assert_eq!(expand_to_string(&mut env, "${empty:-default}"), "default");
        assert_eq!(expand_to_string(&mut env, "${empty-default}"), "");
        assert_eq!(expand_to_string(&mut env, "${set:+alt}"), "alt");
        assert_eq!(expand_to_string(&mut env, "${unset:+alt}"), "");
    }

    #[test]
    fn assign_switch_sets_variable() {
        let mut env = Env::new_virtual();
        assert_eq!(expand_to_string(&mut env, "${var:=assigned}"), "assigned");
        assert_eq!(
            env.variables.get_scalar("var"),
            Some("assigned")
        );
    }

    #[test]
    fn assign_switch_rejects_positional() {
        let mut env = Env::new_virtual();
        let mut expander = Expander::new(&mut env);
        let error = expander.expand_word(&word("${1:=x}")).unwrap_err();
        assert_eq!(
            error.cause,
            ErrorCause::NonassignableParameter {
                name: "1".to_owned()
            }
        );
    }

    #[test]
    fn error_switch() {
        let mut env = Env::new_virtual();
        let mut expander = Expander::new(&mut env);
        let error = expander.expand_word(&word("${unset:?message}")).unwrap_err();
        assert_eq!(
            error.cause,
            ErrorCause::VacantExpansion {
                name: "unset".to_owned(),
                message: "message".to_owned(),
            }
        );
    }

    #[test]
    fn length_modifier() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("x", Scope::Global)
            .assign("hello", None)
            .unwrap();
        assert_eq!(expand_to_string(&mut env, "${#x}"), "5");
    }

    #[test]
    fn trim_modifiers() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("path", Scope::Global)
            .assign("a/b/c.txt", None)
            .unwrap();
        assert_eq!(expand_to_string(&mut env, "${path#*/}"), "b/c.txt");
        assert_eq!(expand_to_string(&mut env, "${path##*/}"), "c.txt");
        assert_eq!(expand_to_string(&mut env, "${path%.*}"), "a/b/c");
        assert_eq!(expand_to_string(&mut env, "${path%/*}"), "a/b");
        assert_eq!(expand_to_string(&mut env, "${path%%/*}"), "a");
    }

    #[test]
    fn array_subscripts() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("a", Scope::Global)
            .assign(Value::array(["x", "y", "z"]), None)
            .unwrap();
        assert_eq!(expand_to_string(&mut env, "${a[0]}"), "x");
        assert_eq!(expand_to_string(&mut env, "${a[2]}"), "z");
        assert_eq!(expand_to_string(&mut env, "${a[5]}"), "");
        assert_eq!(expand_to_string(&mut env, "$a"), "x");
        assert_eq!(expand_to_string(&mut env, "\"${a[@]}\""), "x|y|z");
        assert_eq!(expand_to_string(&mut env, "${#a[@]}"), "3");
    }

    #[test]
    fn nameref_resolution_in_expansion() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("v", Scope::Global)
            .assign("hi", None)
            .unwrap();
        let mut r = env.variables.get_or_new("r", Scope::Global);
        r.assign("v", None).unwrap();
        r.set_nameref(true);

        assert_eq!(expand_to_string(&mut env, "$r"), "hi");
        assert_eq!(expand_to_string(&mut env, "${r}"), "hi");
    }

    #[test]
    fn dynamic_variable_expansion() {
        let mut env = Env::new_virtual();
        env.variables.init(7);
        let first = expand_to_string(&mut env, "$RANDOM");
        let value: u32 = first.parse().unwrap();
        assert!(value < 0x8000);
    }

    #[test]
    fn tilde_expansion() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new(variable::HOME, Scope::Global)
            .assign("/home/user", None)
            .unwrap();
        assert_eq!(expand_to_string(&mut env, "~"), "/home/user");
        assert_eq!(expand_to_string(&mut env, "~/docs"), "/home/user/docs");
        // An unknown user name leaves the tilde intact.
        assert_eq!(expand_to_string(&mut env, "~nosuch"), "~nosuch");
    }
}
