//! Minimal TwiML document builder.
//!
//! Only the verbs this service renders: `Say`, `Gather` (speech input),
//! `Redirect`, `Hangup`. Text is XML-escaped; attribute values here are
//! service-controlled constants and URLs we build ourselves.

/// Voice used for every spoken prompt.
const VOICE: &str = "alice";
const LANGUAGE: &str = "en-US";

/// A TwiML `<Response>` under construction.
#[derive(Debug, Default)]
pub struct VoiceResponse {
    verbs: Vec<String>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak `text` to the caller.
    pub fn say(mut self, text: &str) -> Self {
        self.verbs.push(format!(
            r#"<Say voice="{VOICE}" language="{LANGUAGE}">{}</Say>"#,
            escape_xml(text)
        ));
        self
    }

    /// Gather a speech utterance and POST it to `action`.
    pub fn gather_speech(mut self, action: &str) -> Self {
        self.verbs.push(format!(
            r#"<Gather input="speech" action="{}" method="POST" speechTimeout="auto" language="{LANGUAGE}"/>"#,
            escape_xml(action)
        ));
        self
    }

    /// Continue the call at another webhook.
    pub fn redirect(mut self, url: &str) -> Self {
        self.verbs.push(format!(
            r#"<Redirect method="POST">{}</Redirect>"#,
            escape_xml(url)
        ));
        self
    }

    /// Terminate the call.
    pub fn hangup(mut self) -> Self {
        self.verbs.push("<Hangup/>".to_string());
        self
    }

    /// Render the complete document.
    pub fn build(self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>");
        for verb in &self.verbs {
            xml.push_str(verb);
        }
        xml.push_str("</Response>");
        xml
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
