//! Conversation personas.
//!
//! A persona is a named behavioral profile. Each one maps to a fixed system
//! instruction that scopes a whole conversation session.

use serde::{Deserialize, Serialize};

use crate::config::PromptSettings;

/// Selectable conversation persona
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// Rational, pragmatic veteran engineer
    #[default]
    Senior,
    /// Empathetic counsellor
    Mentor,
    /// Down-to-earth friend
    Friend,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Senior, Persona::Mentor, Persona::Friend];

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Senior => "senior",
            Persona::Mentor => "mentor",
            Persona::Friend => "friend",
        }
    }

    /// Name shown to the user
    pub fn display_name(&self) -> &'static str {
        match self {
            Persona::Senior => "Rational Senior",
            Persona::Mentor => "Mindful Mentor",
            Persona::Friend => "Warm Friend",
        }
    }

    /// Built-in system instruction
    pub fn default_instruction(&self) -> &'static str {
        match self {
            Persona::Senior => {
                "You are a veteran rail transit signalling engineer. You speak rationally, \
                 pragmatically and rigorously, and you care about logic and professional standards."
            }
            Persona::Mentor => {
                "You are a psychological mentor with deep empathy. You are good at guided \
                 conversation and help the user work through workplace anxiety."
            }
            Persona::Friend => {
                "You are a down-to-earth, warm-hearted friend. Your tone is relaxed and humorous; \
                 you vent together with the user and offer emotional support."
            }
        }
    }

    /// System instruction, honouring `[prompts.personas]` overrides.
    pub fn instruction(&self, prompts: &PromptSettings) -> String {
        prompts
            .personas
            .get(self.as_str())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .unwrap_or(self.default_instruction())
            .to_string()
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "senior" => Ok(Persona::Senior),
            "mentor" => Ok(Persona::Mentor),
            "friend" => Ok(Persona::Friend),
            _ => Err(format!("Unknown persona: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        for persona in Persona::ALL {
            assert_eq!(persona.as_str().parse::<Persona>().unwrap(), persona);
        }
        assert!("therapist".parse::<Persona>().is_err());
        assert_eq!(" Mentor ".parse::<Persona>().unwrap(), Persona::Mentor);
    }

    #[test]
    fn test_instruction_override() {
        let mut prompts = PromptSettings::default();
        assert_eq!(
            Persona::Friend.instruction(&prompts),
            Persona::Friend.default_instruction()
        );

        prompts
            .personas
            .insert("friend".to_string(), "Talk like a pirate.".to_string());
        assert_eq!(Persona::Friend.instruction(&prompts), "Talk like a pirate.");
        assert_eq!(
            Persona::Senior.instruction(&prompts),
            Persona::Senior.default_instruction()
        );
    }

    #[test]
    fn test_blank_override_ignored() {
        let mut prompts = PromptSettings::default();
        prompts
            .personas
            .insert("mentor".to_string(), "  ".to_string());
        assert_eq!(
            Persona::Mentor.instruction(&prompts),
            Persona::Mentor.default_instruction()
        );
    }

    #[test]
    fn test_serde_uses_lowercase_ids() {
        let json = serde_json::to_string(&Persona::Mentor).unwrap();
        assert_eq!(json, "\"mentor\"");
    }
}
