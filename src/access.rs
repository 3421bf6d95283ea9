/*!
 * Feature entitlement checks.
 *
 * The host application decides who may change captions. The workspace asks
 * the gate before every mutating call and performs nothing on a denial.
 */

use std::fmt;

/// Operations that need permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatedAction {
    CreateCaption,
    EditCaption,
    DeleteCaption,
    SaveCaptions,
    ResolveOverlaps,
    UseLoop,
}

impl fmt::Display for GatedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GatedAction::CreateCaption => "create captions",
            GatedAction::EditCaption => "edit captions",
            GatedAction::DeleteCaption => "delete captions",
            GatedAction::SaveCaptions => "save captions",
            GatedAction::ResolveOverlaps => "resolve overlaps",
            GatedAction::UseLoop => "use the loop",
        };
        write!(f, "{}", name)
    }
}

/// Answer from an access gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied(String),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }
}

/// Entitlement check consulted before mutations
pub trait AccessGate: Send + Sync + fmt::Debug {
    fn check(&self, action: GatedAction) -> AccessDecision;
}

/// Gate that permits everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessGate for AllowAll {
    fn check(&self, _action: GatedAction) -> AccessDecision {
        AccessDecision::Granted
    }
}

/// Gate that refuses a fixed set of actions with one reason
#[derive(Debug, Clone, Default)]
pub struct DenyList {
    denied: Vec<GatedAction>,
    reason: String,
}

impl DenyList {
    pub fn new(denied: impl IntoIterator<Item = GatedAction>, reason: impl Into<String>) -> Self {
        Self {
            denied: denied.into_iter().collect(),
            reason: reason.into(),
        }
    }

    /// Refuse every caption change but allow looping, e.g. for a viewer
    pub fn read_only(reason: impl Into<String>) -> Self {
        Self::new(
            [
                GatedAction::CreateCaption,
                GatedAction::EditCaption,
                GatedAction::DeleteCaption,
                GatedAction::SaveCaptions,
                GatedAction::ResolveOverlaps,
            ],
            reason,
        )
    }
}

impl AccessGate for DenyList {
    fn check(&self, action: GatedAction) -> AccessDecision {
        if self.denied.contains(&action) {
            AccessDecision::Denied(format!("Not allowed to {}: {}", action, self.reason))
        } else {
            AccessDecision::Granted
        }
    }
}
