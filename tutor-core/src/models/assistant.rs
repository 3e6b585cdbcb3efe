use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tone of voice an educator picks for an assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Personality {
    Friendly,
    Formal,
    Socratic,
    Creative,
}

impl Personality {
    /// Returns `None` for values outside the four known tones. Such values are
    /// still stored on the assistant; they just contribute no tone guidance.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "friendly" => Some(Self::Friendly),
            "formal" => Some(Self::Formal),
            "socratic" => Some(Self::Socratic),
            "creative" => Some(Self::Creative),
            _ => None,
        }
    }
}

/// The `guardrails` JSON blob stored on an assistant row. The same shape is
/// accepted per request as `assistantSettings`, where present fields win.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guardrails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creativity_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anti_cheat_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency_mode: Option<bool>,
}

impl Guardrails {
    /// Field-by-field merge: values set on `other` replace ours.
    pub fn overridden_by(&self, other: &Guardrails) -> Guardrails {
        Guardrails {
            creativity_level: other.creativity_level.or(self.creativity_level),
            citation_mode: other.citation_mode.or(self.citation_mode),
            anti_cheat_mode: other.anti_cheat_mode.or(self.anti_cheat_mode),
            transparency_mode: other.transparency_mode.or(self.transparency_mode),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    /// Raw stored value; see [`Personality::parse`].
    pub personality: String,
    /// 0..=100
    pub creativity_level: u8,
    pub citation_mode: bool,
    pub anti_cheat_mode: bool,
    pub transparency_mode: bool,
    pub instructions: String,
}

impl AssistantConfig {
    /// Build the effective config from stored columns and the guardrails blob.
    /// Fractional levels round up so `level <= 30` style tier checks keep
    /// their meaning on the integer scale.
    pub fn from_parts(
        id: Uuid,
        name: String,
        subject: String,
        personality: String,
        instructions: String,
        guardrails: &Guardrails,
        default_creativity_level: u8,
    ) -> Self {
        let creativity_level = guardrails
            .creativity_level
            .map(|level| level.clamp(0.0, 100.0).ceil() as u8)
            .unwrap_or(default_creativity_level.min(100));

        Self {
            id,
            name,
            subject,
            personality,
            creativity_level,
            citation_mode: guardrails.citation_mode.unwrap_or(false),
            anti_cheat_mode: guardrails.anti_cheat_mode.unwrap_or(false),
            transparency_mode: guardrails.transparency_mode.unwrap_or(false),
            instructions,
        }
    }

    pub fn guardrails(&self) -> Guardrails {
        Guardrails {
            creativity_level: Some(self.creativity_level as f64),
            citation_mode: Some(self.citation_mode),
            anti_cheat_mode: Some(self.anti_cheat_mode),
            transparency_mode: Some(self.transparency_mode),
        }
    }

    /// Apply per-request settings on top of the stored configuration.
    pub fn with_settings(&self, settings: &Guardrails) -> Self {
        let merged = self.guardrails().overridden_by(settings);
        Self::from_parts(
            self.id,
            self.name.clone(),
            self.subject.clone(),
            self.personality.clone(),
            self.instructions.clone(),
            &merged,
            self.creativity_level,
        )
    }

    pub fn personality_kind(&self) -> Option<Personality> {
        Personality::parse(&self.personality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AssistantConfig {
        AssistantConfig::from_parts(
            Uuid::new_v4(),
            "Prof. Ana".to_string(),
            "Biologia".to_string(),
            "friendly".to_string(),
            String::new(),
            &Guardrails {
                creativity_level: Some(20.0),
                citation_mode: Some(true),
                anti_cheat_mode: None,
                transparency_mode: Some(false),
            },
            50,
        )
    }

    #[test]
    fn test_personality_parse_known_and_unknown() {
        assert_eq!(Personality::parse("socratic"), Some(Personality::Socratic));
        assert_eq!(Personality::parse(" Formal "), Some(Personality::Formal));
        assert_eq!(Personality::parse("sarcastic"), None);
        assert_eq!(Personality::parse(""), None);
    }

    #[test]
    fn test_from_parts_defaults_missing_flags() {
        let config = base_config();
        assert_eq!(config.creativity_level, 20);
        assert!(config.citation_mode);
        assert!(!config.anti_cheat_mode);
        assert!(!config.transparency_mode);
    }

    #[test]
    fn test_from_parts_clamps_creativity() {
        let config = AssistantConfig::from_parts(
            Uuid::new_v4(),
            "A".into(),
            "S".into(),
            "formal".into(),
            String::new(),
            &Guardrails {
                creativity_level: Some(250.0),
                ..Default::default()
            },
            50,
        );
        assert_eq!(config.creativity_level, 100);

        let config = AssistantConfig::from_parts(
            Uuid::new_v4(),
            "A".into(),
            "S".into(),
            "formal".into(),
            String::new(),
            &Guardrails::default(),
            50,
        );
        assert_eq!(config.creativity_level, 50);
    }

    #[test]
    fn test_fractional_creativity_rounds_up() {
        let config = AssistantConfig::from_parts(
            Uuid::new_v4(),
            "A".into(),
            "S".into(),
            "formal".into(),
            String::new(),
            &Guardrails {
                creativity_level: Some(30.2),
                ..Default::default()
            },
            50,
        );
        assert_eq!(config.creativity_level, 31);
    }

    #[test]
    fn test_request_settings_override_stored_guardrails() {
        let config = base_config();
        let merged = config.with_settings(&Guardrails {
            creativity_level: Some(85.0),
            citation_mode: None,
            anti_cheat_mode: Some(true),
            transparency_mode: None,
        });

        assert_eq!(merged.creativity_level, 85);
        assert!(merged.citation_mode, "unset request field keeps stored value");
        assert!(merged.anti_cheat_mode);
        assert!(!merged.transparency_mode);
    }

    #[test]
    fn test_guardrails_deserialize_camel_case() {
        let g: Guardrails = serde_json::from_value(serde_json::json!({
            "creativityLevel": 40,
            "transparencyMode": true
        }))
        .unwrap();
        assert_eq!(g.creativity_level, Some(40.0));
        assert_eq!(g.transparency_mode, Some(true));
        assert_eq!(g.citation_mode, None);
    }
}
