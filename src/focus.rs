use crate::ir::{Module, authoritative_modules};
use std::collections::BTreeSet;

/// One-hop neighborhood of `focused`: itself, its direct dependencies and its
/// direct dependents. `None` means no dimming (nothing focused, or the
/// focused module does not exist).
pub fn focus_neighborhood(focused: Option<&str>, modules: &[Module]) -> Option<BTreeSet<String>> {
    let focused = focused?;
    let modules = authoritative_modules(modules);
    let module = modules.iter().find(|m| m.filename == focused)?;

    let mut set: BTreeSet<String> = BTreeSet::new();
    set.insert(focused.to_string());
    set.extend(module.dependencies.iter().cloned());
    for other in &modules {
        if other.dependencies.iter().any(|d| d == focused) {
            set.insert(other.filename.clone());
        }
    }
    Some(set)
}

/// Focus owned by the host across recomputations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusState {
    focused: Option<String>,
}

impl FocusState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&mut self, filename: &str) {
        self.focused = Some(filename.to_string());
    }

    pub fn clear(&mut self) {
        self.focused = None;
    }

    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Drops the focus when the focused module is gone or hidden inside a
    /// collapsed group. Returns `true` when the focus was cleared.
    pub fn sync_visibility(&mut self, modules: &[Module], expanded_groups: &BTreeSet<String>) -> bool {
        let Some(focused) = self.focused.as_deref() else {
            return false;
        };
        let visible = authoritative_modules(modules)
            .into_iter()
            .find(|m| m.filename == focused)
            .is_some_and(|m| match m.group.as_deref() {
                Some(group) => expanded_groups.contains(group),
                None => true,
            });
        if !visible {
            tracing::debug!(module = focused, "focused module hidden; clearing focus");
            self.focused = None;
        }
        !visible
    }

    pub fn neighborhood(&self, modules: &[Module]) -> Option<BTreeSet<String>> {
        focus_neighborhood(self.focused(), modules)
    }
}
