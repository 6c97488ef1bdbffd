use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

const UNIT_MARKER: &str = "[unit]";
const MESSAGE_MARKER: &str = "[message]";
const GOAL_MARKER: &str = "[goal]";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LessonReport {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub tutor_id: Uuid,
    pub student_id: Option<Uuid>,
    pub unit_content: String,
    pub message_content: String,
    pub goal_content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LessonReport {
    pub fn sections(&self) -> ReportSections {
        ReportSections {
            unit: self.unit_content.clone(),
            message: self.message_content.clone(),
            goal: self.goal_content.clone(),
        }
    }

    pub fn apply(&mut self, sections: &ReportSections, now: DateTime<Utc>) {
        self.unit_content = sections.unit.clone();
        self.message_content = sections.message.clone();
        self.goal_content = sections.goal.clone();
        self.updated_at = now;
    }
}

/// The three logical parts of a lesson report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSections {
    pub unit: String,
    pub message: String,
    pub goal: String,
}

impl ReportSections {
    pub fn is_empty(&self) -> bool {
        self.unit.trim().is_empty() && self.message.trim().is_empty() && self.goal.trim().is_empty()
    }

    /// Returns the first field that contains a line the composite format reserves.
    pub fn reserved_marker_in(&self) -> Option<&'static str> {
        [
            ("unit", &self.unit),
            ("message", &self.message),
            ("goal", &self.goal),
        ]
        .into_iter()
        .find(|(_, text)| text.split('\n').any(is_marker))
        .map(|(field, _)| field)
    }

    /// Composite text stored on the booking row for older dashboards.
    pub fn to_composite(&self) -> String {
        format!(
            "{UNIT_MARKER}\n{}\n{MESSAGE_MARKER}\n{}\n{GOAL_MARKER}\n{}",
            self.unit, self.message, self.goal
        )
    }

    /// Reads composite text. Marker-delimited text is split on the markers; anything else
    /// is legacy free text where the first three lines are unit, message and goal.
    pub fn from_composite(text: &str) -> Self {
        if text.split('\n').any(is_marker) {
            Self::from_marked(text)
        } else {
            Self::from_legacy_lines(text)
        }
    }

    fn from_marked(text: &str) -> Self {
        let mut parts: [Vec<&str>; 3] = Default::default();
        let mut current: Option<usize> = None;

        for line in text.split('\n') {
            match line.trim_end_matches('\r') {
                UNIT_MARKER => current = Some(0),
                MESSAGE_MARKER => current = Some(1),
                GOAL_MARKER => current = Some(2),
                _ => {
                    // Text ahead of the first marker belongs to no section.
                    if let Some(index) = current {
                        parts[index].push(line);
                    }
                }
            }
        }

        let [unit, message, goal] = parts.map(|lines| lines.join("\n"));
        ReportSections {
            unit,
            message,
            goal,
        }
    }

    fn from_legacy_lines(text: &str) -> Self {
        let mut lines = text.lines();
        let unit = lines.next().unwrap_or_default().to_string();
        let message = lines.next().unwrap_or_default().to_string();
        let goal = lines.collect::<Vec<_>>().join("\n");
        ReportSections {
            unit,
            message,
            goal,
        }
    }
}

fn is_marker(line: &str) -> bool {
    matches!(
        line.trim_end_matches('\r'),
        UNIT_MARKER | MESSAGE_MARKER | GOAL_MARKER
    )
}
