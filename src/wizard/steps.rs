use serde::{Deserialize, Serialize};

/// One stage of the listing workflow, in navigation order.
///
/// `BasicInfo`/`Location` and `Pricing`/`Details` are separate validation
/// units rendered as one visual step each, so they share a display ordinal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    #[default]
    BasicInfo,
    Location,
    Pricing,
    Details,
    Features,
    Images,
    Description,
    AiSummary,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 9] = [
        WizardStep::BasicInfo,
        WizardStep::Location,
        WizardStep::Pricing,
        WizardStep::Details,
        WizardStep::Features,
        WizardStep::Images,
        WizardStep::Description,
        WizardStep::AiSummary,
        WizardStep::Review,
    ];

    pub fn first() -> Self {
        Self::ALL[0]
    }

    pub fn last() -> Self {
        Self::ALL[Self::ALL.len() - 1]
    }

    /// Position in the navigation order.
    pub fn index(self) -> usize {
        match self {
            WizardStep::BasicInfo => 0,
            WizardStep::Location => 1,
            WizardStep::Pricing => 2,
            WizardStep::Details => 3,
            WizardStep::Features => 4,
            WizardStep::Images => 5,
            WizardStep::Description => 6,
            WizardStep::AiSummary => 7,
            WizardStep::Review => 8,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// 1-based ordinal shown in the progress indicator.
    pub fn display_ordinal(self) -> usize {
        match self {
            WizardStep::BasicInfo | WizardStep::Location => 1,
            WizardStep::Pricing | WizardStep::Details => 2,
            WizardStep::Features => 3,
            WizardStep::Images => 4,
            WizardStep::Description => 5,
            WizardStep::AiSummary => 6,
            WizardStep::Review => 7,
        }
    }

    pub fn display_total() -> usize {
        Self::last().display_ordinal()
    }

    pub fn label(self) -> &'static str {
        match self {
            WizardStep::BasicInfo => "Basic Info",
            WizardStep::Location => "Location",
            WizardStep::Pricing => "Pricing",
            WizardStep::Details => "Details",
            WizardStep::Features => "Features",
            WizardStep::Images => "Images",
            WizardStep::Description => "Description",
            WizardStep::AiSummary => "AI Summary",
            WizardStep::Review => "Review",
        }
    }
}
