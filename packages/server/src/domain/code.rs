//! Code extraction and completeness checks for streamed model output.
//!
//! These are pure functions over the accumulated response text. They never
//! fail: malformed output degrades to "no code yet" or "still streaming".

use std::sync::LazyLock;

use regex::Regex;

/// Shown in the transcript in place of an extracted code block.
pub const CODE_PLACEHOLDER: &str = "[Code has been added to the editor]";

/// Shown in the transcript while a code block is still arriving.
pub const WRITING_CODE_PLACEHOLDER: &str = "[Writing code...]";

/// The top-level wrapper every generated sketch must use.
pub const SKETCH_WRAPPER: &str = "return function(p)";

pub const FENCE: &str = "```";

static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(js|javascript)[ \t]*\r?\n(.*?)```").expect("code block pattern is valid")
});

static LEADING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\A```([a-z]+)?[ \t]*(\r?\n|\z)").expect("leading fence pattern is valid")
});

static NESTED_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"return function\(p\)\s*\{\s*return function\(p\)\s*\{")
        .expect("nested wrapper pattern is valid")
});

/// Result of scanning the accumulated response text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Transcript text with code replaced by placeholders
    pub display: String,
    /// Body of the first closed js/javascript block
    pub code: Option<String>,
    /// Language tag of that block
    pub language: Option<String>,
    /// Raw text of an unterminated trailing block, starting at its fence
    pub partial: Option<String>,
}

/// Split streamed text into what the transcript shows and what the editor gets.
pub fn extract_code(text: &str) -> Extraction {
    let (code, language) = match CODE_BLOCK.captures(text) {
        Some(captures) => (
            captures.get(2).map(|m| m.as_str().to_string()),
            captures.get(1).map(|m| m.as_str().to_lowercase()),
        ),
        None => (None, None),
    };

    let mut display = CODE_BLOCK.replace_all(text, CODE_PLACEHOLDER).into_owned();

    let mut partial = None;
    if display.matches(FENCE).count() % 2 == 1 {
        if let Some(pos) = display.rfind(FENCE) {
            display.truncate(pos);
            display.push_str(WRITING_CODE_PLACEHOLDER);
        }
        if let Some(pos) = text.rfind(FENCE) {
            let fragment = &text[pos..];
            if is_script_fence(fragment) {
                partial = Some(fragment.to_string());
            }
        }
    }

    Extraction {
        display,
        code,
        language,
        partial,
    }
}

/// Whether an (possibly still arriving) fence header announces script code.
fn is_script_fence(fragment: &str) -> bool {
    let header = fragment.trim_start_matches(FENCE);
    match header.find('\n') {
        Some(end) => {
            let tag = header[..end].trim().to_lowercase();
            tag.is_empty() || tag == "js" || tag == "javascript"
        }
        // Tag not finished yet: "```", "```j", "```java..."
        None => {
            let tag = header.trim().to_lowercase();
            "javascript".starts_with(&tag)
        }
    }
}

/// Language tag of the first fence in `text`, lowercased.
pub fn fence_language(text: &str) -> Option<String> {
    let start = text.find(FENCE)?;
    LEADING_FENCE
        .captures(&text[start..])
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Collapse a doubled `return function(p) {` header into one.
pub fn collapse_nested_wrapper(code: &str) -> String {
    NESTED_WRAPPER
        .replace(code, "return function(p) {")
        .into_owned()
}

/// Count `{` and `}` in `code`.
///
/// Braces inside strings and comments are counted too.
pub fn count_braces(code: &str) -> (usize, usize) {
    code.chars().fold((0, 0), |(open, close), c| match c {
        '{' => (open + 1, close),
        '}' => (open, close + 1),
        _ => (open, close),
    })
}

/// Whether the fenced code in `content` has fully arrived.
///
/// All four must hold: an even (non-zero) number of fence markers, the sketch
/// wrapper inside the first js block, balanced braces in that block, and a
/// block body ending with `}`.
pub fn is_code_block_complete(content: &str) -> bool {
    let fences = content.matches(FENCE).count();
    if fences < 2 || fences % 2 != 0 {
        return false;
    }

    let Some(body) = CODE_BLOCK
        .captures(content)
        .and_then(|captures| captures.get(2))
        .map(|m| m.as_str())
    else {
        return false;
    };

    let (open, close) = count_braces(body);
    body.contains(SKETCH_WRAPPER) && open == close && body.trim_end().ends_with('}')
}

/// Strip fence markers from an editor-bound fragment.
///
/// The leading fence and language tag are always removed. The trailing fence
/// is removed only once the fragment is complete, so a partial fragment is
/// never cut short mid-stream.
pub fn clean_fragment(raw: &str, is_complete: bool) -> String {
    let mut cleaned = LEADING_FENCE.replace(raw, "").into_owned();

    if is_complete {
        let trimmed_len = cleaned.trim_end().len();
        if cleaned[..trimmed_len].ends_with(FENCE) {
            cleaned.truncate(trimmed_len - FENCE.len());
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    const PONG: &str = "return function(p) {\n  p.setup = function() {\n    p.createCanvas(400, 400);\n  };\n  p.draw = function() {\n    p.background(0);\n  };\n}";

    fn fenced(body: &str) -> String {
        format!("```js\n{}\n```", body)
    }

    #[test]
    fn test_extract_code_replaces_block_with_placeholder() {
        // テスト項目: 完結したコードブロックは抽出され、表示テキストではプレースホルダーに置換される
        // given (前提条件):
        let text = format!("Here is pong:\n{}\nHave fun!", fenced(PONG));

        // when (操作):
        let extraction = extract_code(&text);

        // then (期待する結果):
        assert_eq!(extraction.code.as_deref(), Some(format!("{}\n", PONG).as_str()));
        assert_eq!(extraction.language.as_deref(), Some("js"));
        assert_eq!(
            extraction.display,
            format!("Here is pong:\n{}\nHave fun!", CODE_PLACEHOLDER)
        );
        assert!(!extraction.display.contains(FENCE));
        assert!(extraction.partial.is_none());
    }

    #[test]
    fn test_extract_code_takes_first_block_only() {
        // テスト項目: 複数ブロックがある場合、コードは最初のブロックのみ、表示は全て置換される
        // given (前提条件):
        let text = format!("{}\nand\n```javascript\nlet x = 1;\n```", fenced("first()"));

        // when (操作):
        let extraction = extract_code(&text);

        // then (期待する結果):
        assert_eq!(extraction.code.as_deref(), Some("first()\n"));
        assert_eq!(
            extraction.display,
            format!("{}\nand\n{}", CODE_PLACEHOLDER, CODE_PLACEHOLDER)
        );
    }

    #[test]
    fn test_extract_code_hides_unterminated_fence() {
        // テスト項目: 閉じていないフェンスは表示から隠され、部分コードとして返される
        // given (前提条件):
        let text = "Sure!\n```js\nreturn function(p) {\n  p.setup";

        // when (操作):
        let extraction = extract_code(text);

        // then (期待する結果):
        assert_eq!(extraction.display, format!("Sure!\n{}", WRITING_CODE_PLACEHOLDER));
        assert!(extraction.code.is_none());
        assert_eq!(
            extraction.partial.as_deref(),
            Some("```js\nreturn function(p) {\n  p.setup")
        );
    }

    #[test]
    fn test_extract_code_ignores_partial_non_script_fence() {
        // テスト項目: スクリプト以外の言語の未完ブロックはエディタ向けコードにならない
        // given (前提条件):
        let text = "Output:\n```text\nscore: 10";

        // when (操作):
        let extraction = extract_code(text);

        // then (期待する結果):
        assert!(extraction.partial.is_none());
        assert_eq!(extraction.display, format!("Output:\n{}", WRITING_CODE_PLACEHOLDER));
    }

    #[test]
    fn test_extract_code_without_fences_is_passthrough() {
        // テスト項目: フェンスがないテキストはそのまま表示される
        // given (前提条件):
        let text = "Let's make the paddles faster.";

        // when (操作):
        let extraction = extract_code(text);

        // then (期待する結果):
        assert_eq!(extraction.display, text);
        assert!(extraction.code.is_none());
        assert!(extraction.partial.is_none());
    }

    #[test]
    fn test_collapse_nested_wrapper() {
        // テスト項目: 二重になった return function(p) { が一つにまとめられる
        // given (前提条件):
        let code = "return function(p) {\n  return function(p) {\n    p.setup = function() {};\n  }\n}";

        // when (操作):
        let result = collapse_nested_wrapper(code);

        // then (期待する結果):
        assert_eq!(result.matches(SKETCH_WRAPPER).count(), 1);
        assert!(result.starts_with("return function(p) {\n    p.setup"));
    }

    #[test]
    fn test_completeness_flips_with_trailing_brace() {
        // テスト項目: 末尾の } が欠けていれば未完、追加すれば完了と判定される
        // given (前提条件):
        let missing = fenced("return function(p) {\n  p.setup = function() {};");
        let with_brace = fenced("return function(p) {\n  p.setup = function() {};\n}");

        // when (操作):
        let missing_result = is_code_block_complete(&missing);
        let with_brace_result = is_code_block_complete(&with_brace);

        // then (期待する結果):
        assert!(!missing_result);
        assert!(with_brace_result);
    }

    #[test]
    fn test_completeness_depends_on_fence_parity() {
        // テスト項目: フェンスの組を追加しても偶奇が変わらなければ判定は変わらず、奇数になると未完になる
        // given (前提条件):
        let complete = fenced(PONG);
        let extra_pair = format!("{}\nOutput:\n```\nok\n```", complete);
        let odd = format!("{}\n```", complete);

        // when (操作):
        let base = is_code_block_complete(&complete);
        let with_pair = is_code_block_complete(&extra_pair);
        let with_odd = is_code_block_complete(&odd);

        // then (期待する結果):
        assert!(base);
        assert!(with_pair);
        assert!(!with_odd);
    }

    #[test]
    fn test_completeness_requires_wrapper_and_balance() {
        // テスト項目: ラッパー欠如やブレース不均衡は未完と判定される
        // given (前提条件):
        let no_wrapper = fenced("function setup() {\n  createCanvas(400, 400);\n}");
        let unbalanced = fenced("return function(p) {\n  p.draw = function() {\n}");

        // when (操作):
        let no_wrapper_result = is_code_block_complete(&no_wrapper);
        let unbalanced_result = is_code_block_complete(&unbalanced);

        // then (期待する結果):
        assert!(!no_wrapper_result);
        assert!(!unbalanced_result);
    }

    #[test]
    fn test_clean_fragment_keeps_trailing_fence_until_complete() {
        // テスト項目: 未完のときは末尾フェンスを残し、完了時のみ除去する
        // given (前提条件):
        let raw = "```js\nreturn function(p) {\n}\n```";

        // when (操作):
        let streaming = clean_fragment(raw, false);
        let complete = clean_fragment(raw, true);

        // then (期待する結果):
        assert_eq!(streaming, "return function(p) {\n}\n```");
        assert_eq!(complete, "return function(p) {\n}\n");
    }

    #[test]
    fn test_clean_fragment_is_idempotent() {
        // テスト項目: 同じ入力を繰り返し処理しても結果は同じで、二重に除去されない
        // given (前提条件):
        let raw = "```javascript\nreturn function(p) {\n  p.draw = function() {};\n}\n```\n";

        // when (操作):
        let first = clean_fragment(raw, true);
        let second = clean_fragment(raw, true);
        let cleaned_again = clean_fragment(&first, true);

        // then (期待する結果):
        assert_eq!(first, second);
        assert_eq!(first, cleaned_again);
        assert!(!first.contains(FENCE));
    }

    #[test]
    fn test_fence_language() {
        // テスト項目: 最初のフェンスの言語タグが取得できる
        // given (前提条件):
        let text = "intro\n```JavaScript\nlet a;";

        // when (操作):
        let language = fence_language(text);

        // then (期待する結果):
        assert_eq!(language.as_deref(), Some("javascript"));
    }
}
