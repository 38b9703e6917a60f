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

//! Behavioral tests running the real shell binary
//!
//! Each test runs the compiled shell with `-c` and examines the output and
//! exit status. These cover the multi-process behaviors (pipelines,
//! subshells, command substitutions, traps) that the in-memory unit tests
//! cannot.

use std::process::Command;
use std::process::Output;

fn run(script: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_marsh"))
        .arg("-c")
        .arg(script)
        .output()
        .expect("cannot run the shell")
}

fn stdout_of(script: &str) -> String {
    let output = run(script);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn status_of(script: &str) -> i32 {
    run(script).status.code().expect("no exit status")
}

#[test]
fn echo_and_quoting() {
    assert_eq!(stdout_of("echo hello world"), "hello world\n");
    assert_eq!(stdout_of("echo 'a  b' \"c  d\""), "a  b c  d\n");
    assert_eq!(stdout_of(r"echo a\ b"), "a b\n");
}

#[test]
fn variables_and_expansion() {
    assert_eq!(stdout_of("x=1; echo $x ${x} ${x:-d}"), "1 1 1\n");
    assert_eq!(stdout_of("echo ${unset:-default}"), "default\n");
    assert_eq!(stdout_of("x='a b  c'; echo $x"), "a b c\n");
    assert_eq!(stdout_of("x='a b  c'; echo \"$x\""), "a b  c\n");
}

#[test]
fn arithmetic() {
    assert_eq!(stdout_of("echo $((6 * 7))"), "42\n");
    assert_eq!(stdout_of("x=5; echo $((x + 1))"), "6\n");
    assert_eq!(status_of("((0))"), 1);
    assert_eq!(status_of("((1))"), 0);
    assert_eq!(stdout_of("for ((i=0;i<3;i++)) do echo $i; done"), "0\n1\n2\n");
}

#[test]
fn subshell_isolation() {
    // Scenario: a=1; (a=2; echo $a); echo $a
    assert_eq!(stdout_of("a=1; (a=2; echo $a); echo $a"), "2\n1\n");
}

#[test]
fn pipelines() {
    assert_eq!(stdout_of("echo foo | cat"), "foo\n");
    assert_eq!(stdout_of("echo one | cat | cat"), "one\n");
}

#[test]
fn pipe_status_and_pipefail() {
    // Scenario: set -o pipefail; false | true; echo $?
    assert_eq!(stdout_of("false | true; echo $?"), "0\n");
    assert_eq!(
        stdout_of("set -o pipefail; false | true; echo $?"),
        "1\n"
    );
    assert_eq!(
        stdout_of("true | false | true; echo ${PIPESTATUS[0]} ${PIPESTATUS[1]} ${PIPESTATUS[2]}"),
        "0 1 0\n"
    );
}

#[test]
fn dynamic_scoping_of_locals() {
    // Scenario: f() { local x=1; g; echo $x; }; g() { x=2; }; x=0; f; echo $x
    assert_eq!(
        stdout_of("f() { local x=1; g; echo $x; }; g() { x=2; }; x=0; f; echo $x"),
        "2\n0\n"
    );
}

#[test]
fn namerefs() {
    // Scenario: declare -n r=v; v=hi; echo $r; r=bye; echo $v
    assert_eq!(
        stdout_of("declare -n r=v; v=hi; echo $r; r=bye; echo $v"),
        "hi\nbye\n"
    );
}

#[test]
fn here_documents() {
    assert_eq!(stdout_of("cat <<END\ndata\nEND"), "data\n");
    // Scenario: <<- strips leading tabs from the body and the delimiter.
    assert_eq!(stdout_of("cat <<-END\n\tdata\n\tEND"), "data\n");
    assert_eq!(
        stdout_of("x=sub; cat <<END\nvalue: $x\nEND"),
        "value: sub\n"
    );
    assert_eq!(
        stdout_of("x=sub; cat <<'END'\nvalue: $x\nEND"),
        "value: $x\n"
    );
}

#[test]
fn traps_run_at_safe_points() {
    // Scenario: the USR1 trap runs exactly once at a safe point.
    let output = stdout_of("trap 'echo caught' USR1; kill -USR1 $$; echo after");
    assert_eq!(output, "caught\nafter\n");
}

#[test]
fn exit_trap() {
    assert_eq!(stdout_of("trap 'echo bye' EXIT; echo hi"), "hi\nbye\n");
    assert_eq!(stdout_of("trap 'echo bye' EXIT; exit 3"), "bye\n");
    assert_eq!(status_of("trap 'echo bye' EXIT; exit 3"), 3);
}

#[test]
fn command_substitution() {
    assert_eq!(stdout_of("echo $(echo inner)"), "inner\n");
    assert_eq!(stdout_of("echo `echo backquoted`"), "backquoted\n");
    assert_eq!(stdout_of("x=$(echo a; echo b); echo \"$x\""), "a\nb\n");
    assert_eq!(stdout_of("echo $(echo one)$(echo two)"), "onetwo\n");
}

#[test]
fn command_substitution_exit_status() {
    assert_eq!(stdout_of("x=$(exit 5); echo $?"), "5\n");
}

#[test]
fn control_flow() {
    assert_eq!(
        stdout_of("for i in 1 2 3; do echo $i; done"),
        "1\n2\n3\n"
    );
    assert_eq!(
        stdout_of("i=0; while [[ $i -lt 3 ]]; do echo $i; i=$((i+1)); done"),
        "0\n1\n2\n"
    );
    assert_eq!(
        stdout_of("for i in 1 2 3 4; do case $i in (2) continue;; (4) break;; esac; echo $i; done"),
        "1\n3\n"
    );
}

#[test]
fn break_propagation_stops_at_function_boundary() {
    // `break` in a function does not break the caller's loop; the function
    // reports an error and the loop continues.
    let output = stdout_of("f() { break; }; for i in 1 2; do f; echo $i; done 2>/dev/null");
    assert_eq!(output, "1\n2\n");
}

#[test]
fn case_patterns() {
    assert_eq!(
        stdout_of("case hello in (h*) echo match;; (*) echo no;; esac"),
        "match\n"
    );
    assert_eq!(
        stdout_of("case x in (a|x|b) echo alt;; esac"),
        "alt\n"
    );
}

#[test]
fn conditional_expressions() {
    assert_eq!(status_of("[[ abc == a* ]]"), 0);
    assert_eq!(status_of("[[ abc == 'a*' ]]"), 1);
    assert_eq!(status_of("[[ abc =~ ^a.c$ ]]"), 0);
    assert_eq!(status_of("[[ 2 -gt 10 ]]"), 1);
    assert_eq!(status_of("[[ -n x && -z '' ]]"), 0);
}

#[test]
fn nonempty_file_test_checks_size() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty");
    let full = dir.path().join("full");
    std::fs::write(&empty, "").unwrap();
    std::fs::write(&full, "content").unwrap();

    // An existing empty file fails the -s test; a non-empty one passes.
    assert_eq!(status_of(&format!("[[ -s {} ]]", empty.display())), 1);
    assert_eq!(status_of(&format!("[[ -s {} ]]", full.display())), 0);
}

#[test]
fn functions_and_return() {
    assert_eq!(
        stdout_of("f() { echo $1; return 7; echo never; }; f arg; echo $?"),
        "arg\n7\n"
    );
}

#[test]
fn call_stack_arrays_during_function_call() {
    // FUNCNAME, BASH_SOURCE, and BASH_LINENO are synchronized stacks.
    assert_eq!(
        stdout_of(
            "f() { echo ${FUNCNAME[0]} ${#FUNCNAME[@]} ${#BASH_SOURCE[@]} ${#BASH_LINENO[@]}; }; f"
        ),
        "f 1 1 1\n"
    );
    // The frames are popped when the function returns.
    assert_eq!(
        stdout_of("f() { :; }; f; echo [${FUNCNAME[0]}]"),
        "[]\n"
    );
    // Nested calls stack up.
    assert_eq!(
        stdout_of("g() { echo ${FUNCNAME[0]}:${FUNCNAME[1]}; }; f() { g; }; f"),
        "g:f\n"
    );
}

#[test]
fn untraced_functions_do_not_inherit_debug_trap() {
    // The DEBUG trap fires for simple commands outside the function, but
    // not inside an untraced function body.
    assert_eq!(
        stdout_of("trap 'echo dbg' DEBUG; f() { :; }; f; echo after"),
        "dbg\ndbg\nafter\n"
    );
    // With the functrace option on, the trap is inherited.
    assert_eq!(
        stdout_of("set -T; trap 'echo dbg' DEBUG; f() { :; }; f; echo after"),
        "dbg\ndbg\ndbg\nafter\n"
    );
}

#[test]
fn exit_status_constants() {
    assert_eq!(status_of("exit 42"), 42);
    assert_eq!(status_of("nosuchcommandxyz"), 127);
    assert_eq!(status_of("true"), 0);
    assert_eq!(status_of("false"), 1);
    // A syntax error exits with status 2.
    assert_eq!(status_of("if"), 2);
}

#[test]
fn async_commands_and_wait() {
    assert_eq!(status_of("true & wait $!"), 0);
    assert_eq!(stdout_of("(exit 9) & wait $!; echo $?"), "9\n");
}

#[test]
fn redirections() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("out");
    let file = file.to_str().unwrap();

    assert_eq!(stdout_of(&format!("echo x >{file}; cat {file}")), "x\n");
    assert_eq!(
        stdout_of(&format!("echo 1 >{file}; echo 2 >>{file}; cat {file}")),
        "1\n2\n"
    );
    // The redirection is undone after the command.
    assert_eq!(
        stdout_of(&format!("echo a >{file}; echo visible")),
        "visible\n"
    );
}

#[test]
fn redirection_errors() {
    let output = run("echo x < /nonexistent_file_for_marsh_tests; echo $?");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "1\n");
}

#[test]
fn exported_variables_reach_children() {
    assert_eq!(
        stdout_of("export GREETING=hello; sh -c 'echo $GREETING'"),
        "hello\n"
    );
    // Temporary assignments are exported to the command only.
    assert_eq!(
        stdout_of("V=temp sh -c 'echo $V'; echo \"[$V]\""),
        "temp\n[]\n"
    );
}

#[test]
fn ifs_field_splitting() {
    assert_eq!(
        stdout_of("IFS=:; x=a:b:c; set -- $x; echo $#"),
        "3\n"
    );
}

#[test]
fn aliases_are_not_expanded_in_scripts_quotes() {
    // Aliases apply at command position only.
    assert_eq!(
        stdout_of("alias greet='echo hi'; eval greet"),
        "hi\n"
    );
}

#[test]
fn select_reads_reply() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_marsh"))
        .arg("-c")
        .arg("select x in a b; do echo chose $x; break; done")
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .unwrap();
    use std::io::Write;
    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(b"2\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout), "chose b\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1) a"), "{stderr:?}");
    assert!(stderr.contains("2) b"), "{stderr:?}");
}

#[test]
fn eval_builtin() {
    assert_eq!(stdout_of("eval 'echo evaluated'"), "evaluated\n");
}

#[test]
fn dot_builtin_runs_in_current_shell() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("lib.sh");
    std::fs::write(&script, "sourced_var=yes\n").unwrap();
    let script = script.to_str().unwrap();
    assert_eq!(
        stdout_of(&format!(". {script}; echo $sourced_var")),
        "yes\n"
    );
}

#[test]
fn tilde_expansion() {
    let output = stdout_of("HOME=/home/test; echo ~/file");
    assert_eq!(output, "/home/test/file\n");
}

#[test]
fn errexit_option() {
    assert_eq!(status_of("set -e; false; echo unreachable"), 1);
    assert_eq!(stdout_of("set -e; false || true; echo reached"), "reached\n");
    assert_eq!(
        stdout_of("set -e; if false; then :; fi; echo reached"),
        "reached\n"
    );
}

#[test]
fn stderr_pipe_operator() {
    assert_eq!(
        stdout_of("sh -c 'echo err >&2' |& cat"),
        "err\n"
    );
}

#[test]
fn positional_parameters() {
    let output = Command::new(env!("CARGO_BIN_EXE_marsh"))
        .args(["-c", "echo $0: $1 $2 $#", "name", "a", "b"])
        .output()
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout), "name: a b 2\n");
}

#[test]
fn script_file_execution() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("script.sh");
    std::fs::write(&script, "echo from script $1\n").unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_marsh"))
        .args([script.to_str().unwrap(), "arg"])
        .output()
        .unwrap();
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "from script arg\n"
    );
}

#[test]
fn shift_builtin() {
    let output = Command::new(env!("CARGO_BIN_EXE_marsh"))
        .args(["-c", "shift; echo $1", "x", "a", "b"])
        .output()
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout), "b\n");
}

#[test]
fn parameter_trims() {
    assert_eq!(stdout_of("x=a/b/c.txt; echo ${x##*/}"), "c.txt\n");
    assert_eq!(stdout_of("x=a/b/c.txt; echo ${x%/*}"), "a/b\n");
}

#[test]
fn declare_attributes() {
    assert_eq!(stdout_of("declare -i n=2+3; echo $n"), "5\n");
    assert_eq!(stdout_of("declare -u up=abc; echo $up"), "ABC\n");
    assert_eq!(stdout_of("a=(x y z); echo ${a[1]} ${#a[@]}"), "y 3\n");
}

#[test]
fn readonly_rejects_assignment() {
    let output = run("readonly r=1; r=2; echo $r");
    let stdout = String::from_utf8_lossy(&output.stdout);
    // The shell reports the error; the variable keeps its value.
    assert!(stdout.ends_with("1\n") || stdout.is_empty(), "{stdout:?}");
}

#[test]
fn coproc_round_trip() {
    let output = stdout_of("coproc cat; echo ping >&${COPROC[1]}; read -r reply <&${COPROC[0]}; echo got $reply");
    assert_eq!(output, "got ping\n");
}
