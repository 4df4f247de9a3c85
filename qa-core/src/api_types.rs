//! Public API types re-used by external crates (e.g., the HTTP API layer).

/// Final answer together with the sources credited for it.
///
/// # Example
/// ```
/// use qa_core::QaAnswer;
/// let qa = QaAnswer {
///     answer: "West Bengal and Uttar Pradesh lead rice output.".into(),
///     sources: vec!["Google Gemini 2.5 Flash".into()],
/// };
/// assert!(!qa.answer.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct QaAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}
