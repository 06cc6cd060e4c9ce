//! [`Response`] → Block Kit rendering.

use serde::Serialize;

use courier_core::{ActionStyle, Response};

/// Hard platform limit is 3000 characters per section; stay under it.
const MAX_SECTION_LEN: usize = 2900;

/// A Block Kit text object.
#[derive(Debug, Clone, Serialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<bool>,
}

impl TextObject {
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            kind: "mrkdwn",
            text: text.into(),
            emoji: None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: "plain_text",
            text: text.into(),
            emoji: Some(true),
        }
    }
}

/// A button element inside an actions block.
#[derive(Debug, Clone, Serialize)]
pub struct ButtonElement {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: TextObject,
    pub action_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// The Block Kit blocks this adapter emits.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { text: TextObject },
    Divider,
    Actions { elements: Vec<ButtonElement> },
    Context { elements: Vec<TextObject> },
}

/// Converts a channel-agnostic response into Block Kit blocks.
///
/// Content is split into section blocks at the platform limit, a divider
/// precedes any action row, buttons carry their declared styles, and
/// attachments plus selected metadata (`plan_date`) render as trailing
/// context blocks.
pub fn response_to_blocks(response: &Response) -> Vec<Block> {
    let mut blocks = Vec::new();

    for chunk in split_content(&response.content, MAX_SECTION_LEN) {
        blocks.push(Block::Section {
            text: TextObject::mrkdwn(chunk),
        });
    }

    if !response.actions.is_empty() {
        blocks.push(Block::Divider);

        let elements = response
            .actions
            .iter()
            .map(|action| ButtonElement {
                kind: "button",
                text: TextObject::plain(action.text.clone()),
                action_id: action.action_id.clone(),
                style: action.style.map(|s| match s {
                    ActionStyle::Primary => "primary",
                    ActionStyle::Danger => "danger",
                }),
                value: action.value.clone(),
            })
            .collect();

        blocks.push(Block::Actions { elements });
    }

    for attachment in &response.attachments {
        blocks.push(Block::Context {
            elements: vec![TextObject::mrkdwn(attachment.text.clone())],
        });
    }

    if let Some(plan_date) = response.metadata_str("plan_date") {
        blocks.push(Block::Context {
            elements: vec![TextObject::mrkdwn(format!("_plan_date: {plan_date}_"))],
        });
    }

    blocks
}

/// Splits content into chunks of at most `max` characters, respecting
/// char boundaries.
fn split_content(content: &str, max: usize) -> Vec<String> {
    if content.chars().count() <= max {
        return vec![content.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in content.chars() {
        current.push(ch);
        count += 1;
        if count == max {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Attachment, ResponseAction};

    #[test]
    fn plain_message_is_one_section() {
        let blocks = response_to_blocks(&Response::message("hello"));
        assert_eq!(blocks.len(), 1);
        assert!(matches!(&blocks[0], Block::Section { text } if text.text == "hello"));
    }

    #[test]
    fn long_content_splits_under_the_platform_limit() {
        let response = Response::message("x".repeat(6000));
        let blocks = response_to_blocks(&response);

        let sections: Vec<&TextObject> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Section { text } => Some(text),
                _ => None,
            })
            .collect();

        assert_eq!(sections.len(), 3);
        assert!(sections.iter().all(|t| t.text.chars().count() <= MAX_SECTION_LEN));
        let total: usize = sections.iter().map(|t| t.text.chars().count()).sum();
        assert_eq!(total, 6000);
    }

    #[test]
    fn actions_get_a_divider_and_styles() {
        let response = Response::message("plan ready")
            .with_action(ResponseAction::new("Approve", "approve_plan").with_style(ActionStyle::Primary))
            .with_action(ResponseAction::new("Reject", "reject_plan").with_style(ActionStyle::Danger));

        let blocks = response_to_blocks(&response);
        assert!(matches!(blocks[1], Block::Divider));

        let Block::Actions { elements } = &blocks[2] else {
            panic!("expected actions block");
        };
        assert_eq!(elements[0].action_id, "approve_plan");
        assert_eq!(elements[0].style, Some("primary"));
        assert_eq!(elements[1].action_id, "reject_plan");
        assert_eq!(elements[1].style, Some("danger"));
    }

    #[test]
    fn attachments_and_plan_date_become_context_blocks() {
        let mut response = Response::message("done");
        response.attachments.push(Attachment {
            text: "see dashboard".to_string(),
        });
        let response = response.with_metadata("plan_date", "2026-03-02");

        let blocks = response_to_blocks(&response);
        let contexts: Vec<&Vec<TextObject>> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Context { elements } => Some(elements),
                _ => None,
            })
            .collect();

        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0][0].text, "see dashboard");
        assert_eq!(contexts[1][0].text, "_plan_date: 2026-03-02_");
    }

    #[test]
    fn serialised_block_shape_matches_block_kit() {
        let block = Block::Section {
            text: TextObject::mrkdwn("hi"),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "section");
        assert_eq!(json["text"]["type"], "mrkdwn");
    }
}
