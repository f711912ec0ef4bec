use serde::{ Deserialize, Serialize };

/// Per-identity profile, independent of personas.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub goals: String,
    #[serde(default)]
    pub interests: String,
    #[serde(default, rename = "communicationStyle")]
    pub communication_style: String,
}

impl Profile {
    /// A form for a user the backend knows nothing about yet.
    pub fn seeded_with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Profile::default()
    }
}
