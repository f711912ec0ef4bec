use log::warn;
use serde::de::{ self, Deserializer };
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;

use super::chat::MessageId;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Coaching annotation for one past user message, as the backend returns it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub message_index: usize,
    #[serde(default)]
    pub user_message: String,
    #[serde(default)]
    pub assistant_response: String,
    /// LLM-produced upstream: integers, floats and numeric strings all occur.
    #[serde(deserialize_with = "lenient_rating")]
    pub rating: u8,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub next_move: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RatingTone {
    Positive,
    Neutral,
    Negative,
}

impl Recommendation {
    pub fn tone(&self) -> RatingTone {
        match self.rating {
            r if r >= 4 => RatingTone::Positive,
            3 => RatingTone::Neutral,
            _ => RatingTone::Negative,
        }
    }

    pub fn badge(&self) -> String {
        let face = match self.tone() {
            RatingTone::Positive => "😊",
            RatingTone::Neutral => "😐",
            RatingTone::Negative => "😔",
        };
        format!("{} {}/{}", face, self.rating.min(MAX_RATING), MAX_RATING)
    }
}

fn lenient_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = JsonValue::deserialize(deserializer)?;
    let rating = match &value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match rating {
        Some(r) if r.is_finite() => Ok(r.round().clamp(MIN_RATING as f64, MAX_RATING as f64) as u8),
        _ => Err(de::Error::custom(format!("invalid rating {}", value))),
    }
}

/// Decodes entries one by one so a single malformed entry only drops itself.
fn skip_invalid<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Recommendation>, D::Error> {
    let entries = Option::<Vec<JsonValue>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(
        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(rec) => Some(rec),
                Err(e) => {
                    warn!("Skipping malformed recommendation: {}", e);
                    None
                }
            })
            .collect()
    )
}

/// A recommendation bound to the message it was produced for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundRecommendation {
    pub message_id: MessageId,
    pub recommendation: Recommendation,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionResponse {
    #[serde(default, deserialize_with = "skip_invalid")]
    pub recommendations: Vec<Recommendation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(rating: u8) -> Recommendation {
        Recommendation {
            message_index: 1,
            user_message: "hey".into(),
            assistant_response: "yo".into(),
            rating,
            suggestion: "ask about the gig".into(),
            next_move: "invite them".into(),
        }
    }

    #[test]
    fn test_tone_thresholds() {
        assert_eq!(rec(5).tone(), RatingTone::Positive);
        assert_eq!(rec(4).tone(), RatingTone::Positive);
        assert_eq!(rec(3).tone(), RatingTone::Neutral);
        assert_eq!(rec(2).tone(), RatingTone::Negative);
        assert_eq!(rec(1).badge(), "😔 1/5");
    }

    #[test]
    fn test_mixed_rating_encodings() {
        let resp: SuggestionResponse = serde_json::from_str(
            r#"{"recommendations":[
                {"message_index":0,"rating":4,"suggestion":"a"},
                {"message_index":2,"rating":4.0,"suggestion":"b"},
                {"message_index":4,"rating":" 3 ","suggestion":"c"},
                {"message_index":6,"rating":9,"suggestion":"d"},
                {"message_index":8,"rating":"great","suggestion":"e"},
                {"message_index":10,"suggestion":"f"}
            ]}"#
        ).unwrap();
        let ratings: Vec<(usize, u8)> = resp.recommendations
            .iter()
            .map(|r| (r.message_index, r.rating))
            .collect();
        assert_eq!(ratings, vec![(0, 4), (2, 4), (4, 3), (6, 5)]);
        assert_eq!(resp.recommendations[3].badge(), "😊 5/5");
    }

    #[test]
    fn test_null_recommendations() {
        let resp: SuggestionResponse = serde_json::from_str(r#"{"recommendations":null}"#).unwrap();
        assert!(resp.recommendations.is_empty());
    }

    #[test]
    fn test_response_without_recommendations() {
        let resp: SuggestionResponse = serde_json::from_str(r#"{"error":"No chat history found."}"#).unwrap();
        assert!(resp.recommendations.is_empty());
    }
}
