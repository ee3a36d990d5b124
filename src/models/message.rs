//! Platform-neutral outbound message

/// Visual weight of a button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

/// A button carrying an opaque payload back to the bot when pressed
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub label: String,
    pub payload: String,
    pub style: ButtonStyle,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl ToString) -> Self {
        Button {
            label: label.into(),
            payload: payload.to_string(),
            style: ButtonStyle::Secondary,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }
}

/// Text with an optional image and rows of buttons
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    pub text: String,
    pub image_url: Option<String>,
    pub buttons: Vec<Vec<Button>>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        OutboundMessage {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn image(mut self, url: Option<String>) -> Self {
        self.image_url = url;
        self
    }

    pub fn row(mut self, row: Vec<Button>) -> Self {
        if !row.is_empty() {
            self.buttons.push(row);
        }
        self
    }

    /// Every payload on the message, row by row
    pub fn payloads(&self) -> Vec<&str> {
        self.buttons
            .iter()
            .flat_map(|row| row.iter().map(|b| b.payload.as_str()))
            .collect()
    }
}
