//! Compatibility codec for the persona `system_prompt` string.
//!
//! The backend stores traits, interests and writing style in one string using
//! sentinel markers and no escaping:
//!
//! ```text
//! Traits: <traits> endTraits,Interests: <interests> endInterests,Writing Style: <style> endWriting
//! ```
//!
//! In memory the client works with [`PersonaTraits`]; this module is the only
//! place that knows the string layout.

use serde::{ Deserialize, Serialize };

const TRAITS_START: &str = "Traits: ";
const TRAITS_END: &str = " endTraits";
const INTERESTS_START: &str = "Interests: ";
/// Spelling the backend's own create path writes.
const INTERESTS_START_LEGACY: &str = "Interets: ";
const INTERESTS_END: &str = " endInterests";
const STYLE_START: &str = "Writing Style: ";
const STYLE_END: &str = " endWriting";

const MARKERS: [&str; 7] = [
    TRAITS_START,
    TRAITS_END,
    INTERESTS_START,
    INTERESTS_START_LEGACY,
    INTERESTS_END,
    STYLE_START,
    STYLE_END,
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaTraits {
    pub traits: String,
    pub interests: String,
    pub writing_style: String,
}

impl PersonaTraits {
    pub fn new(
        traits: impl Into<String>,
        interests: impl Into<String>,
        writing_style: impl Into<String>
    ) -> Self {
        Self {
            traits: traits.into(),
            interests: interests.into(),
            writing_style: writing_style.into(),
        }
    }

    /// Returns the first marker found inside any field. Such a value would not
    /// survive an encode/decode round trip.
    pub fn marker_collision(&self) -> Option<&'static str> {
        [&self.traits, &self.interests, &self.writing_style]
            .iter()
            .find_map(|value| MARKERS.iter().copied().find(|m| value.contains(m.trim())))
    }

    pub fn encode(&self) -> String {
        encode(self)
    }
}

pub fn encode(fields: &PersonaTraits) -> String {
    format!(
        "{}{}{},{}{}{},{}{}{}",
        TRAITS_START,
        fields.traits,
        TRAITS_END,
        INTERESTS_START,
        fields.interests,
        INTERESTS_END,
        STYLE_START,
        fields.writing_style,
        STYLE_END
    )
}

pub fn decode(system_prompt: &str) -> PersonaTraits {
    let interests = extract(system_prompt, INTERESTS_START, INTERESTS_END);
    let interests = if interests.is_empty() {
        extract(system_prompt, INTERESTS_START_LEGACY, INTERESTS_END)
    } else {
        interests
    };
    PersonaTraits {
        traits: extract(system_prompt, TRAITS_START, TRAITS_END),
        interests,
        writing_style: extract(system_prompt, STYLE_START, STYLE_END),
    }
}

/// Text after the first `start`, cut at the next `start` and then at `end`.
fn extract(source: &str, start: &str, end: &str) -> String {
    let Some(pos) = source.find(start) else {
        return String::new();
    };
    let rest = &source[pos + start.len()..];
    let rest = rest.find(start).map_or(rest, |next| &rest[..next]);
    let value = rest.find(end).map_or(rest, |stop| &rest[..stop]);
    value.to_string()
}
