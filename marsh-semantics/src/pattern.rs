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

//! Helpers for pattern matching in `case` and `[[ ... ]]`
//!
//! Words used as patterns are expanded without field splitting or pathname
//! expansion; quoted parts of the word match literally while unquoted
//! expansion results keep their pattern characters special.

use crate::expansion;
use marsh_env::Env;
use marsh_fnmatch::Pattern;
use marsh_syntax::syntax::Word;

/// Expands a word and compiles it as a pattern.
pub fn word_to_pattern(env: &mut Env, word: &Word) -> expansion::Result<Pattern> {
    let mut expander = crate::expansion::attr_expander(env);
    let chars = expander.expand_pattern_word(word)?;
    Pattern::parse(chars.into_iter()).map_err(|_| expansion::Error {
        cause: expansion::ErrorCause::InvalidPattern,
        location: word.location.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::variable::Scope;

    fn word(s: &str) -> Word {
        s.parse().unwrap()
    }

    #[test]
    fn literal_pattern() {
        let mut env = Env::new_virtual();
        let pattern = word_to_pattern(&mut env, &word("abc")).unwrap();
        assert!(pattern.is_match("abc"));
        assert!(!pattern.is_match("abd"));
    }

    #[test]
    fn unquoted_specials_are_special() {
        let mut env = Env::new_virtual();
        let pattern = word_to_pattern(&mut env, &word("a*")).unwrap();
        assert!(pattern.is_match("abc"));
    }

    #[test]
    fn quoted_specials_are_literal() {
        let mut env = Env::new_virtual();
        let pattern = word_to_pattern(&mut env, &word("'a*'")).unwrap();
        assert!(pattern.is_match("a*"));
        assert!(!pattern.is_match("abc"));
    }

    #[test]
    fn expansions_in_patterns_stay_special() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("p", Scope::Global)
            .assign("x*", None)
            .unwrap();
        let pattern = word_to_pattern(&mut env, &word("$p")).unwrap();
        assert!(pattern.is_match("xyz"));

        let pattern = word_to_pattern(&mut env, &word("\"$p\"")).unwrap();
        assert!(pattern.is_match("x*"));
        assert!(!pattern.is_match("xyz"));
    }
}
