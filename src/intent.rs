//! Action intents: why a stroke was made, and which intents suit each phase.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;

/// The artistic purpose of a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Quick, loose strokes for initial layout
    Gesture,
    /// Form-defining strokes for anatomy/structure
    Contour,
    /// Fine detail work
    Detail,
    /// Construction lines and guidelines
    Construction,
    /// Shading and tonal work
    Shading,
    /// Cleaning up and erasing construction lines
    Cleanup,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::Gesture,
        Intent::Contour,
        Intent::Detail,
        Intent::Construction,
        Intent::Shading,
        Intent::Cleanup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Gesture => "gesture",
            Intent::Contour => "contour",
            Intent::Detail => "detail",
            Intent::Construction => "construction",
            Intent::Shading => "shading",
            Intent::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Intent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Intent::ALL
            .into_iter()
            .find(|intent| intent.as_str() == s.to_lowercase())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid intent '{}'. Valid values: gesture, contour, detail, construction, shading, cleanup",
                    s
                )
            })
    }
}

/// Intents appropriate for a phase. `Complete` expects no actions.
pub fn recommended_intents(phase: Phase) -> &'static [Intent] {
    use Intent::*;
    match phase {
        Phase::Sketch => &[Gesture, Construction],
        Phase::Refinement => &[Contour, Construction, Gesture],
        Phase::Stylization => &[Contour, Detail, Cleanup],
        Phase::Rendering => &[Detail, Shading, Cleanup],
        Phase::Complete => &[],
    }
}

/// The default intent for actions in a phase.
pub fn primary_intent(phase: Phase) -> Option<Intent> {
    match phase {
        Phase::Sketch => Some(Intent::Gesture),
        Phase::Refinement | Phase::Stylization => Some(Intent::Contour),
        Phase::Rendering => Some(Intent::Detail),
        Phase::Complete => None,
    }
}

/// `primary_intent`, falling back to `Gesture` for phases without one.
pub fn default_intent(phase: Phase) -> Intent {
    primary_intent(phase).unwrap_or(Intent::Gesture)
}

pub fn is_appropriate(phase: Phase, intent: Intent) -> bool {
    recommended_intents(phase).contains(&intent)
}

/// Suggest an intent for a planner task kind (e.g. "fix_pose").
///
/// Unknown task kinds, and kinds whose intent does not suit `phase`,
/// fall back to the phase's default intent.
pub fn suggest_intent(phase: Phase, task_kind: &str) -> Intent {
    let suggested = match task_kind.trim().to_lowercase().as_str() {
        "fix_pose" => Some(Intent::Gesture),
        "fix_proportions" => Some(Intent::Construction),
        "refine_anatomy" | "improve_symmetry" | "enhance_silhouette" => Some(Intent::Contour),
        "add_detail" => Some(Intent::Detail),
        _ => None,
    };

    match suggested {
        Some(intent) if is_appropriate(phase, intent) => intent,
        _ => default_intent(phase),
    }
}

/// Workflow metadata attached to every executed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMetadata {
    pub intent: Intent,
    /// Phase current when the action was executed
    pub phase: Phase,
    #[serde(default)]
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directive_id: Option<String>,
    pub confidence: f64,
    /// Which iteration within the phase this action belongs to
    pub iteration: u32,
    /// Quality score after execution (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_score: Option<f64>,
}

impl ActionMetadata {
    pub fn new(intent: Intent, phase: Phase) -> Self {
        Self {
            intent,
            phase,
            purpose: String::new(),
            task_id: None,
            directive_id: None,
            confidence: 1.0,
            iteration: 0,
            evaluation_score: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommended_intents_table() {
        use Intent::*;
        assert_eq!(recommended_intents(Phase::Sketch), &[Gesture, Construction]);
        assert_eq!(
            recommended_intents(Phase::Refinement),
            &[Contour, Construction, Gesture]
        );
        assert_eq!(
            recommended_intents(Phase::Stylization),
            &[Contour, Detail, Cleanup]
        );
        assert_eq!(
            recommended_intents(Phase::Rendering),
            &[Detail, Shading, Cleanup]
        );
        assert!(recommended_intents(Phase::Complete).is_empty());
    }

    #[test]
    fn test_primary_intent_is_recommended() {
        for phase in Phase::ALL {
            match primary_intent(phase) {
                Some(intent) => assert!(is_appropriate(phase, intent), "{phase}"),
                None => assert_eq!(phase, Phase::Complete),
            }
        }
        assert_eq!(default_intent(Phase::Complete), Intent::Gesture);
    }

    #[test]
    fn test_is_appropriate() {
        assert!(is_appropriate(Phase::Rendering, Intent::Shading));
        assert!(!is_appropriate(Phase::Sketch, Intent::Shading));
        assert!(!is_appropriate(Phase::Complete, Intent::Detail));
    }

    #[test]
    fn test_suggest_intent_known_task() {
        assert_eq!(suggest_intent(Phase::Sketch, "fix_pose"), Intent::Gesture);
        assert_eq!(suggest_intent(Phase::Rendering, "add_detail"), Intent::Detail);
        assert_eq!(
            suggest_intent(Phase::Refinement, "FIX_PROPORTIONS"),
            Intent::Construction
        );
    }

    #[test]
    fn test_suggest_intent_inappropriate_falls_back_to_primary() {
        // add_detail maps to Detail, which does not suit Sketch
        assert_eq!(suggest_intent(Phase::Sketch, "add_detail"), Intent::Gesture);
        assert_eq!(suggest_intent(Phase::Rendering, "fix_pose"), Intent::Detail);
    }

    #[test]
    fn test_suggest_intent_unknown_task() {
        assert_eq!(suggest_intent(Phase::Stylization, "teleport"), Intent::Contour);
        assert_eq!(suggest_intent(Phase::Complete, ""), Intent::Gesture);
    }

    #[test]
    fn test_intent_parse() {
        for intent in Intent::ALL {
            assert_eq!(intent.to_string().parse::<Intent>().unwrap(), intent);
        }
        assert!("scribble".parse::<Intent>().is_err());
    }

    #[test]
    fn test_action_metadata_skips_empty_ids() {
        let meta = ActionMetadata::new(Intent::Contour, Phase::Refinement);
        let value = serde_json::to_value(&meta).unwrap();
        assert!(value.get("task_id").is_none());
        assert_eq!(value["intent"], "contour");
        assert_eq!(value["phase"], "refinement");
    }
}
