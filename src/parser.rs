// SPDX-License-Identifier: GPL-2.0

//! Command-line parsing: pipelines, stages and redirections.
//!
//! No quoting, escaping or expansion; tokens are split on runs of spaces
//! and tabs. Only the first `<` and the rightmost `>>` (or, without one,
//! the first `>`) of a stage are honoured.

/// Maximum number of stages in a pipeline
pub const MAX_STAGES: usize = 10;
/// Maximum number of argv tokens per stage
pub const MAX_ARGS: usize = 63;

/// One command of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
	pub argv: Vec<String>,
	/// Volume path fed into standard input
	pub input_file: Option<String>,
	/// Volume path receiving standard output
	pub output_file: Option<String>,
	/// Output redirection appends instead of replacing
	pub append: bool,
}

/// Splits a line on `|` into at most [`MAX_STAGES`] stages. Stages left
/// with no tokens after redirection stripping are discarded.
pub fn parse_pipeline(line: &str) -> Vec<Stage> {
	let mut stages = Vec::new();
	for piece in line.split('|') {
		if stages.len() == MAX_STAGES {
			break;
		}
		if let Some(stage) = parse_stage(piece) {
			stages.push(stage);
		}
	}
	stages
}

fn parse_stage(text: &str) -> Option<Stage> {
	let mut spans: Vec<(usize, usize)> = Vec::new();
	let mut input_file = None;
	let mut output_file = None;
	let mut append = false;

	// `>>` is matched before `>` so the plain scan never splits an
	// append marker.
	if let Some(pos) = text.rfind(">>") {
		let (token, end) = token_after(text, pos + 2);
		output_file = token;
		append = true;
		spans.push((pos, end));
	} else if let Some(pos) = text.find('>') {
		let (token, end) = token_after(text, pos + 1);
		output_file = token;
		spans.push((pos, end));
	}

	if let Some(pos) = text.find('<') {
		let (token, end) = token_after(text, pos + 1);
		input_file = token;
		spans.push((pos, end));
	}

	let remainder = strip_spans(text, &spans);
	let argv: Vec<String> = remainder
		.split_whitespace()
		.take(MAX_ARGS)
		.map(str::to_string)
		.collect();
	if argv.is_empty() {
		return None;
	}

	Some(Stage {
		argv,
		input_file,
		output_file,
		append,
	})
}

/// Extracts the whitespace-delimited token following a redirection marker,
/// returning it together with the end of the stripped span.
fn token_after(text: &str, from: usize) -> (Option<String>, usize) {
	let bytes = text.as_bytes();
	let mut start = from;
	while start < bytes.len() && (bytes[start] == b' ' || bytes[start] == b'\t') {
		start += 1;
	}
	let mut end = start;
	while end < bytes.len() && bytes[end] != b' ' && bytes[end] != b'\t' {
		end += 1;
	}
	if start == end {
		(None, from)
	} else {
		(Some(text[start..end].to_string()), end)
	}
}

fn strip_spans(text: &str, spans: &[(usize, usize)]) -> String {
	let mut keep = String::with_capacity(text.len());
	'outer: for (idx, ch) in text.char_indices() {
		for &(start, end) in spans {
			if idx >= start && idx < end {
				continue 'outer;
			}
		}
		keep.push(ch);
	}
	keep
}

#[cfg(test)]
mod tests {
	use super::*;

	fn args(stage: &Stage) -> Vec<&str> {
		stage.argv.iter().map(String::as_str).collect()
	}

	#[test]
	fn single_command_tokenises_on_whitespace() {
		let stages = parse_pipeline("ls   -l\t/d");
		assert_eq!(stages.len(), 1);
		assert_eq!(args(&stages[0]), vec!["ls", "-l", "/d"]);
		assert_eq!(stages[0].input_file, None);
		assert_eq!(stages[0].output_file, None);
	}

	#[test]
	fn pipeline_splits_on_pipe() {
		let stages = parse_pipeline("cat /readme.txt | grep virtual | head -n 1");
		assert_eq!(stages.len(), 3);
		assert_eq!(args(&stages[0]), vec!["cat", "/readme.txt"]);
		assert_eq!(args(&stages[1]), vec!["grep", "virtual"]);
		assert_eq!(args(&stages[2]), vec!["head", "-n", "1"]);
	}

	#[test]
	fn input_redirection_is_extracted() {
		let stages = parse_pipeline("grep foo < /readme.txt");
		assert_eq!(stages.len(), 1);
		assert_eq!(args(&stages[0]), vec!["grep", "foo"]);
		assert_eq!(stages[0].input_file.as_deref(), Some("/readme.txt"));
	}

	#[test]
	fn output_redirection_and_append() {
		let stages = parse_pipeline("echo hello > /greet");
		assert_eq!(stages[0].output_file.as_deref(), Some("/greet"));
		assert!(!stages[0].append);

		let stages = parse_pipeline("echo world >> /greet");
		assert_eq!(args(&stages[0]), vec!["echo", "world"]);
		assert_eq!(stages[0].output_file.as_deref(), Some("/greet"));
		assert!(stages[0].append);
	}

	#[test]
	fn both_redirections_on_one_stage() {
		let stages = parse_pipeline("grep foo < /in.txt > /out.txt");
		assert_eq!(args(&stages[0]), vec!["grep", "foo"]);
		assert_eq!(stages[0].input_file.as_deref(), Some("/in.txt"));
		assert_eq!(stages[0].output_file.as_deref(), Some("/out.txt"));
	}

	#[test]
	fn tokens_after_a_redirection_survive() {
		let stages = parse_pipeline("head < /in.txt -n 2");
		assert_eq!(args(&stages[0]), vec!["head", "-n", "2"]);
		assert_eq!(stages[0].input_file.as_deref(), Some("/in.txt"));
	}

	#[test]
	fn empty_stages_are_discarded() {
		assert!(parse_pipeline("").is_empty());
		assert!(parse_pipeline("   \t ").is_empty());
		assert!(parse_pipeline("> /out").is_empty());

		let stages = parse_pipeline("ls | | cat");
		assert_eq!(stages.len(), 2);
	}

	#[test]
	fn stage_count_is_capped() {
		let line = vec!["x"; MAX_STAGES + 5].join(" | ");
		assert_eq!(parse_pipeline(&line).len(), MAX_STAGES);
	}

	#[test]
	fn argv_count_is_capped() {
		let line = vec!["t"; MAX_ARGS + 10].join(" ");
		assert_eq!(parse_pipeline(&line)[0].argv.len(), MAX_ARGS);
	}

	#[test]
	fn trailing_marker_without_token() {
		let stages = parse_pipeline("ls >");
		assert_eq!(args(&stages[0]), vec!["ls"]);
		assert_eq!(stages[0].output_file, None);
	}
}
