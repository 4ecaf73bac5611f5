/*!
A small regular expression engine built on fully compiled DFAs.

A pattern string is parsed into a syntax tree, compiled into an NFA by
Thompson construction, determinized by subset construction, minimized by
partition refinement and finally equipped with a failure-link table. The
resulting [`Pattern`] supports four operations, none of which backtrack:

* [`Pattern::match_`] returns the longest accepted prefix of the text.
* [`Pattern::search`] returns the leftmost match anywhere in the text.
* [`Pattern::replace`] substitutes every match with a replacement string.
* [`Pattern::matches`] returns every non-overlapping match in order.

Free functions of the same names compile and run a pattern in one call.

# Example

```
use cre::Pattern;

let pat = Pattern::new("lo+ng");
assert_eq!(pat.search("a loooong word"), "loooong");
assert_eq!(pat.replace("long loong", "-"), "- -");
assert_eq!(pat.matches("long loong"), vec!["long", "loong"]);
```

# Syntax

Patterns operate over the 7-bit ASCII alphabet; bytes outside it never
match anything.

* Literals, concatenation, alternation with `|` and grouping with `(...)`.
* `.` matches any byte except a line feed.
* Bracket expressions with ranges and negation: `[a-z0]`, `[^abc]`.
* Quantifiers `*`, `+`, `?`, `{n}`, `{n,}` and `{n,m}` with single-digit
  bounds.
* Escapes `\0 \a \b \t \n \v \f \r \e`, caret notation `\cX`, the class
  escapes `\s \S \d \D \l \L \u \U \w \W`, and `\` before any other
  character for that literal character.
* `^` at the very start anchors the pattern to the beginning of the text,
  `$` at the very end anchors it to the end.
* `(?:<name>...)` names a group and `(?:<name>)` reuses it. Reuse shares
  the group's *grammar*, not the text it matched, so this is not a
  backreference: `(?:<x>a|b)(?:<x>)` matches `ab` and `ba` just as well
  as `aa`. A name must be defined before it is referenced.

# Fail-soft compilation

Compiling a pattern never fails. Syntax problems are reported as
[`Diagnostic`] values by [`Pattern::compile`] and the parser recovers with
a best-effort interpretation, so a pattern with problems still produces a
working matcher. Matching operations likewise have no error path: "no
match" is an empty string or an empty vector.

```
use cre::{DiagnosticKind, Pattern};

let (pat, diagnostics) = Pattern::compile("a(bc");
assert_eq!(*diagnostics[0].kind(), DiagnosticKind::UnclosedGroup);
// The unclosed group is treated as if it were closed.
assert_eq!(pat.search("xabcx"), "abc");
```

# Thread safety

A `Pattern` is immutable after construction and internally
reference-counted, so it is `Send` and `Sync`: clone it cheaply and match
from as many threads as you like.

# Crate features

* `logging` enables trace-level output about compilation via the `log`
  crate. Disabled by default.
*/

#![deny(missing_docs)]

#[macro_use]
mod macros;

mod classes;
mod determinize;
mod dfa;
mod error;
mod minimize;
mod nfa;
mod parser;
mod pattern;

pub use crate::error::{Diagnostic, DiagnosticKind};
pub use crate::pattern::{
    match_, matches, replace, search, Pattern, PatternBuilder,
};
