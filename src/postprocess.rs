//! Tolerant cleanup of model output.
//!
//! The model is asked for exact formats but does not always comply, so each
//! parser here accepts sloppy input and falls back to a safe default instead
//! of failing the request.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{GradeReport, QUIZ_QUESTIONS};

static DAY_PREFIX_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)^День\s*\d+\s*:\s*").expect("valid day prefix regex"));
static HEADING_LINE_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^\s*#+\s*").expect("valid heading regex"));
static BOLD_LINE_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^\*\*.*\*\*$").expect("valid bold line regex"));
static BLOCK_SPLIT_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid block split regex"));
static QUESTION_HEAD_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?s)^(\d+)\.\s*(.*)").expect("valid question head regex"));
static CORRECT_COUNT_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"Количество правильных:\s*(\d+)\s*из\s*15").expect("valid count regex"));
static RECOMMENDATION_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?s)Рекомендации:\s*(.*)").expect("valid recommendation regex"));

/// Default recommendation when the model omits the section.
pub const NO_RECOMMENDATION: &str = "Нет рекомендаций";

/// Drop a leading "День N:" header the material prompt forbids but the
/// model sometimes adds anyway. Case-insensitive, start of text only.
pub fn strip_day_prefix(material: &str) -> String {
  DAY_PREFIX_RE.replace(material, "").into_owned()
}

/// Normalize raw quiz text into numbered question blocks.
///
/// Markdown headings and whole-line bold decorations are dropped, then the
/// text is split on blank lines. A block survives only if it starts with
/// `N.`; blocks numbered over ten (the coding tasks) are reduced to their
/// first line. Anything unnumbered disappears.
pub fn clean_quiz_text(raw: &str) -> String {
  let kept: Vec<&str> = raw
    .lines()
    .filter(|line| !HEADING_LINE_RE.is_match(line))
    .filter(|line| !BOLD_LINE_RE.is_match(line.trim()))
    .collect();
  let cleaned = kept.join("\n");
  let cleaned = cleaned.trim();

  let mut blocks: Vec<String> = Vec::new();
  for block in BLOCK_SPLIT_RE.split(cleaned) {
    let block = block.trim();
    if block.is_empty() {
      continue;
    }
    let Some(caps) = QUESTION_HEAD_RE.captures(block) else {
      continue;
    };
    let number: u64 = match caps[1].parse() {
      Ok(n) => n,
      Err(_) => continue,
    };
    if number <= 10 {
      blocks.push(block.to_string());
    } else {
      // coding tasks keep only the task line, not stray model chatter
      let first_line = block.lines().next().unwrap_or_default().trim();
      blocks.push(first_line.to_string());
    }
  }
  blocks.join("\n\n")
}

/// First line of every question block, in block order. Used to pair stored
/// quiz text with submitted answers.
pub fn question_titles(questions: &str) -> Vec<String> {
  BLOCK_SPLIT_RE
    .split(questions.trim())
    .filter_map(|block| block.lines().next())
    .map(|line| line.trim().to_string())
    .collect()
}

/// Parse the grading reply. A missing count reads as zero, a count over the
/// quiz size clamps to it, and a missing recommendation section becomes
/// [`NO_RECOMMENDATION`].
pub fn parse_grade(reply: &str) -> GradeReport {
  let correct_count = CORRECT_COUNT_RE
    .captures(reply)
    .and_then(|caps| caps.get(1))
    .and_then(|m| m.as_str().parse::<u32>().ok())
    .unwrap_or(0)
    .min(QUIZ_QUESTIONS);

  let recommendation = RECOMMENDATION_RE
    .captures(reply)
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str().trim().to_string())
    .filter(|s| !s.is_empty())
    .unwrap_or_else(|| NO_RECOMMENDATION.to_string());

  GradeReport { correct_count, recommendation }
}
