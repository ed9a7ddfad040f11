//! Keyword intent classification.
//!
//! A pure function of `(mode, utterance)`. Each mode carries an ordered list
//! of fixed keyword sets; the first set that matches wins, and anything
//! unmatched falls through to the mode's default (re-offer the menu while
//! reading, the generative fallback elsewhere). Matching is case-insensitive
//! substring containment, so inflected forms ("emailing", "ready") count;
//! there is no scoring.

use std::sync::LazyLock;

use regex::Regex;

use crate::convo::session::Mode;

/// What the caller is asking for, scoped to the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Start the inbox triage + reading flow.
    StartEmailReading,
    /// Read the full body of the current email.
    ReadFullEmail,
    /// Move the cursor to the next email.
    Advance,
    /// Begin dictating a reply to the current email.
    BeginReply,
    /// Leave the reading flow.
    EndReading,
    /// Unrecognized while reading: re-offer the menu.
    PromptChoices,
    /// The utterance is the reply body, verbatim.
    ReplyBody,
    /// Calendar lookahead.
    ShowCalendar,
    /// Ask what task to create.
    PromptTask,
    /// Caller is saying goodbye.
    EndCall,
    /// Open conversation; handled by the generative fallback.
    GeneralChat,
}

/// A fixed keyword set compiled into one case-insensitive alternation.
struct KeywordSet {
    regex: Regex,
}

impl KeywordSet {
    fn new(pattern: &str) -> Self {
        Self {
            // Patterns are compile-time constants below; a typo is a bug,
            // caught by the compile_all test.
            regex: Regex::new(pattern).expect("invalid keyword pattern"),
        }
    }

    fn matches(&self, utterance: &str) -> bool {
        self.regex.is_match(utterance)
    }
}

static EMAIL: LazyLock<KeywordSet> =
    LazyLock::new(|| KeywordSet::new(r"(?i)(email|inbox|mail)"));

static READ_CONFIRM: LazyLock<KeywordSet> =
    LazyLock::new(|| KeywordSet::new(r"(?i)(read|yes|hear|open)"));

static NEXT_SKIP: LazyLock<KeywordSet> =
    LazyLock::new(|| KeywordSet::new(r"(?i)(next|skip|continue)"));

static REPLY: LazyLock<KeywordSet> =
    LazyLock::new(|| KeywordSet::new(r"(?i)(respond|reply|answer)"));

static STOP_DONE: LazyLock<KeywordSet> =
    LazyLock::new(|| KeywordSet::new(r"(?i)(stop|done|enough|finish)"));

static CALENDAR: LazyLock<KeywordSet> =
    LazyLock::new(|| KeywordSet::new(r"(?i)(calendar|schedule|appointment)"));

static TASK: LazyLock<KeywordSet> =
    LazyLock::new(|| KeywordSet::new(r"(?i)(task|todo|to-do)"));

static FAREWELL: LazyLock<KeywordSet> =
    LazyLock::new(|| KeywordSet::new(r"(?i)(goodbye|bye|thank you|thanks|that's all)"));

/// Classify one utterance in the given mode. Rule order matters.
pub fn classify(mode: Mode, utterance: &str) -> Intent {
    match mode {
        Mode::Greeting => {
            if EMAIL.matches(utterance) {
                Intent::StartEmailReading
            } else {
                Intent::GeneralChat
            }
        }
        Mode::EmailReading => {
            if READ_CONFIRM.matches(utterance) {
                Intent::ReadFullEmail
            } else if NEXT_SKIP.matches(utterance) {
                Intent::Advance
            } else if REPLY.matches(utterance) {
                Intent::BeginReply
            } else if STOP_DONE.matches(utterance) {
                Intent::EndReading
            } else {
                Intent::PromptChoices
            }
        }
        // Whatever the caller says is the reply body.
        Mode::Responding => Intent::ReplyBody,
        Mode::General => {
            if EMAIL.matches(utterance) {
                Intent::StartEmailReading
            } else if CALENDAR.matches(utterance) {
                Intent::ShowCalendar
            } else if TASK.matches(utterance) {
                Intent::PromptTask
            } else if FAREWELL.matches(utterance) {
                Intent::EndCall
            } else {
                Intent::GeneralChat
            }
        }
    }
}
