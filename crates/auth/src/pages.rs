//! Navigation targets of the tracker's shell.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use capstone_core::DomainError;

/// A page the shell can navigate to.
///
/// Wire names match the client's route keys (`admin-tasks`, `quiz_add`, ...).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Page {
    #[serde(rename = "dashboard")]
    Dashboard,
    #[serde(rename = "phases")]
    Phases,
    #[serde(rename = "task-details")]
    TaskDetails,
    #[serde(rename = "reports")]
    Reports,
    #[serde(rename = "teams-progress")]
    TeamsProgress,
    #[serde(rename = "view-tasks")]
    ViewTasks,
    #[serde(rename = "admin-tasks")]
    AdminTasks,
    #[serde(rename = "quiz_add")]
    QuizAdd,
    #[serde(rename = "quiz_see")]
    QuizSee,
    #[serde(rename = "expo")]
    Expo,
    #[serde(rename = "panel")]
    Panel,
    #[serde(rename = "super-admin")]
    SuperAdmin,
}

impl Page {
    pub const ALL: [Page; 12] = [
        Page::Dashboard,
        Page::Phases,
        Page::TaskDetails,
        Page::Reports,
        Page::TeamsProgress,
        Page::ViewTasks,
        Page::AdminTasks,
        Page::QuizAdd,
        Page::QuizSee,
        Page::Expo,
        Page::Panel,
        Page::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Dashboard => "dashboard",
            Page::Phases => "phases",
            Page::TaskDetails => "task-details",
            Page::Reports => "reports",
            Page::TeamsProgress => "teams-progress",
            Page::ViewTasks => "view-tasks",
            Page::AdminTasks => "admin-tasks",
            Page::QuizAdd => "quiz_add",
            Page::QuizSee => "quiz_see",
            Page::Expo => "expo",
            Page::Panel => "panel",
            Page::SuperAdmin => "super-admin",
        }
    }

    /// Sidebar label.
    pub fn title(&self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Phases => "Phases",
            Page::TaskDetails => "Task Details",
            Page::Reports => "Reports",
            Page::TeamsProgress => "Teams Progress",
            Page::ViewTasks => "View Tasks",
            Page::AdminTasks => "Manage Tasks",
            Page::QuizAdd => "Add Quiz",
            Page::QuizSee => "Quizzes",
            Page::Expo => "Expo",
            Page::Panel => "Panel Review",
            Page::SuperAdmin => "Administration",
        }
    }
}

impl core::fmt::Display for Page {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Page::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| DomainError::unknown("page", s))
    }
}
