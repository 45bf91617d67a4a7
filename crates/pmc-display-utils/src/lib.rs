//! Small helpers shared by the `Display` implementations of models, PRISM
//! programs and formulas.

use std::fmt::Display;

/// Number of spaces used for one level of indentation
pub const TAB_SIZE: usize = 4;

/// Join the displayed items of an iterator with `sep`
///
/// The separator is only placed between items, never at the end.
///
/// # Example
///
/// ```
/// use pmc_display_utils::join_iterator;
///
/// let states = vec![0, 7, 12];
/// assert_eq!(join_iterator(states.iter(), ", "), "0, 7, 12");
/// ```
pub fn join_iterator<T: Display, U: Iterator<Item = T>, S: AsRef<str>>(list: U, sep: S) -> String {
    list.map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(sep.as_ref())
}

/// Join the displayed items of an iterator, wrapping each one in double quotes
///
/// Labels and reward model names are written quoted in PRISM programs and in
/// formulas, this helper renders a collection of them.
///
/// # Example
///
/// ```
/// use pmc_display_utils::join_quoted;
///
/// let labels = vec!["init", "done"];
/// assert_eq!(join_quoted(labels.iter(), " "), "\"init\" \"done\"");
/// ```
pub fn join_quoted<T: Display, U: Iterator<Item = T>, S: AsRef<str>>(list: U, sep: S) -> String {
    join_iterator(list.map(|x| format!("\"{x}\"")), sep)
}

/// Indent every non-empty line of `input` by [`TAB_SIZE`] spaces
///
/// A trailing newline of the input is preserved.
///
/// # Example
///
/// ```
/// use pmc_display_utils::indent_all;
///
/// let input = "s : [0..7] init 0;\nd : [0..6] init 0;";
/// assert_eq!(indent_all(input), "    s : [0..7] init 0;\n    d : [0..6] init 0;");
/// ```
pub fn indent_all<S>(input: S) -> String
where
    S: Into<String>,
{
    let tab = " ".repeat(TAB_SIZE);
    let input: String = input.into();

    let mut output = input
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{tab}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    if input.ends_with('\n') {
        output.push('\n');
    }

    output
}
