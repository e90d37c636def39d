//! Gemma chat-turn templating.
//!
//! Samples are rendered as `<start_of_turn>{role}\n{content}<end_of_turn>`
//! turns, optionally preceded by a system turn. The system prompt is a
//! caller decision; when training adds it globally, samples carry only the
//! user and model turns.

pub const TURN_START: &str = "<start_of_turn>";
pub const TURN_END: &str = "<end_of_turn>";

fn turn(role: &str, content: &str) -> String {
    format!("{TURN_START}{role}\n{content}{TURN_END}")
}

/// Render a user/model exchange, with a leading system turn when a prompt is
/// given.
pub fn render(system_prompt: Option<&str>, question: &str, answer: &str) -> String {
    let user = turn("user", question);
    let model = turn("model", answer);
    match system_prompt {
        Some(prompt) => format!("{}\n{user}\n{model}", turn("system", prompt)),
        None => format!("{user}\n{model}"),
    }
}

/// Pull the model-turn body back out of a rendered sample. `None` when the
/// text carries no complete model turn.
pub fn extract_answer(text: &str) -> Option<&str> {
    let open = format!("{TURN_START}model\n");
    let start = text.find(&open)? + open.len();
    let end = text[start..].find(TURN_END)? + start;
    Some(&text[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_without_system_prompt() {
        let text = render(None, "How do I enrol?", "Through the portal.");
        assert_eq!(
            text,
            "<start_of_turn>user\nHow do I enrol?<end_of_turn>\n\
             <start_of_turn>model\nThrough the portal.<end_of_turn>"
        );
    }

    #[test]
    fn render_with_system_prompt_prepends_system_turn() {
        let text = render(Some("Be concise."), "q", "a");
        assert!(text.starts_with("<start_of_turn>system\nBe concise.<end_of_turn>\n"));
        assert!(text.contains("<start_of_turn>user\nq<end_of_turn>"));
        assert!(text.ends_with("<start_of_turn>model\na<end_of_turn>"));
    }

    #[test]
    fn question_and_answer_appear_verbatim_between_markers() {
        let q = "Kapan pendaftaran dibuka?";
        let a = "Pendaftaran dibuka mulai bulan Januari.";
        let text = render(None, q, a);
        assert!(text.contains(&format!("{TURN_START}user\n{q}{TURN_END}")));
        assert!(text.contains(&format!("{TURN_START}model\n{a}{TURN_END}")));
    }

    #[test]
    fn extract_answer_round_trips() {
        let text = render(Some("sys"), "q", "the answer body");
        assert_eq!(extract_answer(&text), Some("the answer body"));
    }

    #[test]
    fn extract_answer_handles_missing_turn() {
        assert_eq!(extract_answer("no turns here"), None);
        assert_eq!(extract_answer("<start_of_turn>model\nunclosed"), None);
    }
}
