use crate::models::{ItemDetail, ItemReference, NormalizedTranscript, UpdateDecision};

/// The model's only way to say "nothing to add". Matched exactly and case-sensitively.
pub const NO_NEW_INFO: &str = "NO NEW INFO";

/// Three-part conversation sent to the language model for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    /// What the item already says and what we are looking for
    pub context: String,
    /// Scripted assistant turn that fixes the output contract
    pub acknowledgement: String,
    /// The transcript and the final instructions
    pub prompt: String,
}

/// Build the request that asks whether the stand-up added anything new about `reference`
pub fn build_update_request(
    reference: &ItemReference,
    detail: &ItemDetail,
    transcript: &NormalizedTranscript,
) -> ModelRequest {
    let mut context = String::new();
    context.push_str(&format!(
        "You are helping keep the issue tracker item {} up to date.\n",
        reference
    ));
    context.push_str(&format!("Summary: {}\n", or_none(&detail.summary)));
    context.push_str(&format!("Description: {}\n", or_none(&detail.description)));
    context.push_str(&format!("Existing comments:\n{}\n", format_comments(&detail.comments)));
    context.push_str(
        "A stand-up meeting took place recently where this item might have been discussed. \
         Your goal is to find out whether the meeting surfaced any new information about it. \
         The transcript will be provided next.",
    );

    let acknowledgement = format!(
        "Understood. I will look for new information about {reference} in the stand-up transcript. \
         If I find any, I will reply with a concise note that can be added as a comment on the item. \
         If there is no new information, I will reply with exactly '{NO_NEW_INFO}'."
    );

    let mut prompt = String::new();
    prompt.push_str("Here is the stand-up meeting transcript:\n\n");
    prompt.push_str(transcript.as_str());
    prompt.push_str("\n\n");
    prompt.push_str(&format!(
        "The transcript may mention other items as well; ignore everything that is not about {reference}. "
    ));
    prompt.push_str(
        "If there is significant new information, reply with it in concise form. \
         Do not repeat anything already present in the item's summary, description or comments. ",
    );
    prompt.push_str(&format!(
        "If there is no significant new information, reply with exactly '{NO_NEW_INFO}'."
    ));

    ModelRequest {
        context,
        acknowledgement,
        prompt,
    }
}

/// Interpret the model's reply.
///
/// Returns `None` for a blank reply: it is neither a proposal nor the
/// sentinel, so the caller must apply its ambiguity policy.
pub fn interpret_response(response: &str) -> Option<UpdateDecision> {
    if response == NO_NEW_INFO {
        Some(UpdateDecision::NoUpdate)
    } else if response.trim().is_empty() {
        None
    } else {
        Some(UpdateDecision::Proposed(response.to_string()))
    }
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() { "(none)" } else { text }
}

fn format_comments(comments: &[String]) -> String {
    if comments.is_empty() {
        return "(none)".to_string();
    }

    comments
        .iter()
        .enumerate()
        .map(|(i, body)| format!("{}. {}", i + 1, body))
        .collect::<Vec<_>>()
        .join("\n")
}
