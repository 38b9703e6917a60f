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

//! Pathname expansion
//!
//! Unquoted pattern characters in a field are matched against the file
//! system. Each slash-separated pattern component is matched against the
//! entries of the directory selected by the preceding components. If the
//! pattern matches no pathname, the field is left as-is after quote
//! removal, as POSIX requires.

use super::attr::AttrChar;
use super::attr::AttrField;
use super::quote_removal;
use marsh_env::semantics::Field;
use marsh_env::system::System;
use marsh_env::Env;
use marsh_fnmatch::Pattern;
use marsh_fnmatch::PatternChar;
use marsh_syntax::source::Location;
use std::ffi::CString;

/// Converts a field to pattern characters for matching.
fn to_pattern_chars(field: &AttrField) -> Vec<PatternChar> {
    field
        .iter()
        .filter(|c| !c.is_quoting)
        .map(|c| {
            if c.is_quoted {
                PatternChar::Literal(c.value)
            } else {
                PatternChar::Normal(c.value)
            }
        })
        .collect()
}

/// Tests whether the pattern characters contain an unquoted special.
fn has_specials(chars: &[PatternChar]) -> bool {
    let mut bracket = false;
    for c in chars {
        if let PatternChar::Normal(value) = c {
            match value {
                '*' | '?' => return true,
                '[' => bracket = true,
                ']' if bracket => return true,
                _ => (),
            }
        }
    }
    false
}

/// Performs pathname expansion on a field.
///
/// Returns the matched pathnames in sorted order, or the field itself
/// (after quote removal) if nothing matched or the field has no unquoted
/// pattern characters.
pub fn glob_field(env: &mut Env, field: AttrField, origin: Location) -> Vec<Field> {
    let chars = to_pattern_chars(&field);
    if !has_specials(&chars) {
        return vec![Field {
            value: quote_removal::strip(&field),
            origin,
        }];
    }

    // Split the pattern into slash-separated components.
    let mut components: Vec<Vec<PatternChar>> = vec![Vec::new()];
    for c in &chars {
        if matches!(c, PatternChar::Normal('/') | PatternChar::Literal('/')) {
            components.push(Vec::new());
        } else {
            components.last_mut().unwrap().push(*c);
        }
    }
    let absolute = matches!(
        chars.first(),
        Some(PatternChar::Normal('/') | PatternChar::Literal('/'))
    );

    let mut candidates: Vec<String> = vec![if absolute {
        "/".to_owned()
    } else {
        String::new()
    }];
    if absolute {
        components.remove(0);
    }

    for component in &components {
        if component.is_empty() {
            // Adjacent slashes
            for candidate in &mut candidates {
                if !candidate.ends_with('/') && !candidate.is_empty() {
                    candidate.push('/');
                }
            }
            continue;
        }

        let literal: Option<String> = component
            .iter()
            .map(|c| match c {
                PatternChar::Literal(value) => Some(*value),
                PatternChar::Normal(value) if !matches!(value, '*' | '?' | '[') => Some(*value),
                _ => None,
            })
            .collect();

        let mut next = Vec::new();
        for candidate in &candidates {
            let dir = if candidate.is_empty() {
                ".".to_owned()
            } else {
                candidate.clone()
            };

            if let Some(literal) = &literal {
                // No pattern characters: probe the file directly.
                let path = join(candidate, literal);
                if let Ok(c_path) = CString::new(path.clone()) {
                    if env.system.file_exists(&c_path) || env.system.is_directory(&c_path) {
                        next.push(path);
                    }
                }
                continue;
            }

            let Ok(pattern) = Pattern::parse(component.iter().copied()) else {
                continue;
            };
            let Ok(c_dir) = CString::new(dir) else {
                continue;
            };
            let Ok(entries) = env.system.read_dir(&c_dir) else {
                continue;
            };
            for entry in entries {
                // An initial period is only matched by a literal period.
                if entry.starts_with('.')
                    && !matches!(
                        component.first(),
                        Some(PatternChar::Literal('.') | PatternChar::Normal('.'))
                    )
                {
                    continue;
                }
                if pattern.is_match(&entry) {
                    next.push(join(candidate, &entry));
                }
            }
        }
        candidates = next;
        if candidates.is_empty() {
            break;
        }
    }

    candidates.sort();
    if candidates.is_empty() {
        vec![Field {
            value: quote_removal::strip(&field),
            origin,
        }]
    } else {
        candidates
            .into_iter()
            .map(|value| Field {
                value,
                origin: origin.clone(),
            })
            .collect()
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_owned()
    } else if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::system::VirtualSystem;
    use marsh_syntax::source::Location;

    fn field_of(s: &str) -> AttrField {
        s.chars().map(AttrChar::plain).collect()
    }

    fn env_with_files(files: &[&str]) -> Env {
        let system = VirtualSystem::new();
        {
            let mut state = system.state.borrow_mut();
            for file in files {
                state.file_system.insert(
                    std::path::PathBuf::from(file),
                    std::rc::Rc::new(std::cell::RefCell::new(
                        marsh_env::system::r#virtual::INode::default(),
                    )),
                );
            }
        }
        Env::with_system(Box::new(system))
    }

    fn glob_values(env: &mut Env, pattern: &str) -> Vec<String> {
        glob_field(env, field_of(pattern), Location::dummy(pattern))
            .into_iter()
            .map(|field| field.value)
            .collect()
    }

    #[test]
    fn no_specials_passes_through() {
        let mut env = env_with_files(&[]);
        assert_eq!(glob_values(&mut env, "plain"), ["plain"]);
    }

    #[test]
    fn matching_files_in_a_directory() {
        let mut env = env_with_files(&["/dir/a.txt", "/dir/b.txt", "/dir/c.log"]);
        assert_eq!(
            glob_values(&mut env, "/dir/*.txt"),
            ["/dir/a.txt", "/dir/b.txt"]
        );
    }

    #[test]
    fn no_match_leaves_pattern() {
        let mut env = env_with_files(&["/dir/a.txt"]);
        assert_eq!(glob_values(&mut env, "/dir/*.rs"), ["/dir/*.rs"]);
    }

    #[test]
    fn hidden_files_need_literal_period() {
        let mut env = env_with_files(&["/dir/.hidden", "/dir/shown"]);
        assert_eq!(glob_values(&mut env, "/dir/*"), ["/dir/shown"]);
        assert_eq!(glob_values(&mut env, "/dir/.*"), ["/dir/.hidden"]);
    }

    #[test]
    fn quoted_specials_do_not_glob() {
        let mut env = env_with_files(&["/dir/a.txt"]);
        let field: AttrField = "/dir/*"
            .chars()
            .map(|value| AttrChar {
                value,
                origin: super::super::attr::Origin::Literal,
                is_quoted: true,
                is_quoting: false,
            })
            .collect();
        let fields = glob_field(&mut env, field, Location::dummy("q"));
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].value, "/dir/*");
    }

    #[test]
    fn multi_component_patterns() {
        let mut env = env_with_files(&["/a/x/f", "/b/x/f", "/a/y/f"]);
        assert_eq!(glob_values(&mut env, "/*/x"), ["/a/x", "/b/x"]);
    }
}
